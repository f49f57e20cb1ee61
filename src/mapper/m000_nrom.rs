//! `NROM` (Mapper 000).
//!
//! <https://wiki.nesdev.com/w/index.php/NROM>

use crate::{
    cart::Cart,
    common::{Clock, Reset},
    mapper::{Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem,
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Nrom {
    pub mirroring: Mirroring,
    /// NROM-128 mirrors its single 16K PRG-ROM bank at $C000.
    pub prg_mask: u16,
    pub chr_ram: bool,
}

impl Nrom {
    const PRG_RAM_SIZE: usize = 8 * 1024;
    const CHR_RAM_SIZE: usize = 8 * 1024;

    pub fn load(cart: &mut Cart) -> Result<Mapper, mem::Error> {
        if !cart.has_chr_rom() && cart.chr_ram.is_empty() {
            cart.add_chr_ram(Self::CHR_RAM_SIZE);
        }
        if !cart.has_prg_ram() {
            cart.add_prg_ram(Self::PRG_RAM_SIZE);
        }
        let nrom = Self {
            mirroring: cart.mirroring(),
            prg_mask: if cart.prg_rom.len() > 0x4000 {
                0x7FFF
            } else {
                0x3FFF
            },
            chr_ram: !cart.has_chr_rom(),
        };
        Ok(nrom.into())
    }
}

impl MemMap for Nrom {
    // PPU $0000..=$1FFF 8K Fixed CHR-ROM/CHR-RAM Bank
    // CPU $6000..=$7FFF 8K PRG-RAM
    // CPU $8000..=$FFFF 16K or 32K PRG-ROM, 16K mirrored for NROM-128

    fn map_peek(&self, addr: u16) -> MappedRead {
        match addr {
            0x0000..=0x1FFF => MappedRead::Chr(addr.into()),
            0x6000..=0x7FFF => MappedRead::PrgRam((addr & 0x1FFF).into()),
            0x8000..=0xFFFF => MappedRead::PrgRom((addr & self.prg_mask).into()),
            _ => MappedRead::Bus,
        }
    }

    fn map_write(&mut self, addr: u16, val: u8) -> MappedWrite {
        match addr {
            0x0000..=0x1FFF if self.chr_ram => MappedWrite::ChrRam(addr.into(), val),
            // CHR-ROM and PRG-ROM are read-only
            0x0000..=0x1FFF | 0x8000..=0xFFFF => MappedWrite::None,
            0x6000..=0x7FFF => MappedWrite::PrgRam((addr & 0x1FFF).into(), val),
            _ => MappedWrite::Bus,
        }
    }
}

impl Mapped for Nrom {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }
}

impl Clock for Nrom {}
impl Reset for Nrom {}
