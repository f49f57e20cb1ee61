//! `MMC3`/`TxROM` (Mapper 004).
//!
//! <https://wiki.nesdev.com/w/index.php/MMC3>

use crate::{
    cart::Cart,
    common::{Clock, Reset, ResetKind},
    mapper::{Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::{self, Banks},
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// `MMC3` registers.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Regs {
    pub bank_select: u8,
    pub bank_values: [u8; 8],
    pub irq_latch: u8,
    pub irq_counter: u8,
    pub irq_enabled: bool,
    pub irq_reload: bool,
    pub irq_pending: bool,
}

/// `MMC3`/`TxROM` (Mapper 004).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Mmc3 {
    pub regs: Regs,
    pub mirroring: Mirroring,
    pub chr_ram: bool,
    pub chr_banks: Banks,
    pub prg_rom_banks: Banks,
}

impl Mmc3 {
    const PRG_WINDOW: usize = 8 * 1024;
    const CHR_WINDOW: usize = 1024;
    const PRG_RAM_SIZE: usize = 8 * 1024;
    const CHR_RAM_SIZE: usize = 8 * 1024;

    const PRG_MODE_MASK: u8 = 0x40; // Bit 6 of bank select
    const CHR_INVERSION_MASK: u8 = 0x80; // Bit 7 of bank select

    pub fn load(cart: &mut Cart) -> Result<Mapper, mem::Error> {
        if !cart.has_prg_ram() {
            cart.add_prg_ram(Self::PRG_RAM_SIZE);
        }
        let chr_len = if cart.has_chr_rom() {
            cart.chr_rom.len()
        } else {
            if cart.chr_ram.is_empty() {
                cart.add_chr_ram(Self::CHR_RAM_SIZE);
            }
            cart.chr_ram.len()
        };
        let mut mmc3 = Self {
            regs: Regs::default(),
            mirroring: cart.mirroring(),
            chr_ram: !cart.has_chr_rom(),
            chr_banks: Banks::new(0x0000, 0x1FFF, chr_len, Self::CHR_WINDOW)?,
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_WINDOW)?,
        };
        mmc3.update_banks();
        Ok(mmc3.into())
    }

    fn update_prg_banks(&mut self) {
        let prg_last = self.prg_rom_banks.last();
        let prg_lo = self.regs.bank_values[6] as usize;
        let prg_hi = self.regs.bank_values[7] as usize;
        if self.regs.bank_select & Self::PRG_MODE_MASK == Self::PRG_MODE_MASK {
            // $8000 fixed to second-to-last bank, $C000 switchable
            self.prg_rom_banks.set(0, prg_last - 1);
            self.prg_rom_banks.set(1, prg_hi);
            self.prg_rom_banks.set(2, prg_lo);
        } else {
            // $8000 switchable, $C000 fixed to second-to-last bank
            self.prg_rom_banks.set(0, prg_lo);
            self.prg_rom_banks.set(1, prg_hi);
            self.prg_rom_banks.set(2, prg_last - 1);
        }
        self.prg_rom_banks.set(3, prg_last);
    }

    fn update_chr_banks(&mut self) {
        // CHR inversion swaps which half holds the 2K banks:
        // 0: two 2K banks at $0000-$0FFF, four 1K banks at $1000-$1FFF
        // 1: two 2K banks at $1000-$1FFF, four 1K banks at $0000-$0FFF
        let chr = self.regs.bank_values;
        if self.regs.bank_select & Self::CHR_INVERSION_MASK == Self::CHR_INVERSION_MASK {
            self.chr_banks.set(0, chr[2] as usize);
            self.chr_banks.set(1, chr[3] as usize);
            self.chr_banks.set(2, chr[4] as usize);
            self.chr_banks.set(3, chr[5] as usize);
            self.chr_banks.set_range(4, 5, (chr[0] & 0xFE) as usize);
            self.chr_banks.set_range(6, 7, (chr[1] & 0xFE) as usize);
        } else {
            self.chr_banks.set_range(0, 1, (chr[0] & 0xFE) as usize);
            self.chr_banks.set_range(2, 3, (chr[1] & 0xFE) as usize);
            self.chr_banks.set(4, chr[2] as usize);
            self.chr_banks.set(5, chr[3] as usize);
            self.chr_banks.set(6, chr[4] as usize);
            self.chr_banks.set(7, chr[5] as usize);
        }
    }

    fn update_banks(&mut self) {
        self.update_prg_banks();
        self.update_chr_banks();
    }
}

impl MemMap for Mmc3 {
    // PPU $0000..=$07FF (or $1000..=$17FF) 2K CHR Bank 1 Switchable
    // PPU $0800..=$0FFF (or $1800..=$1FFF) 2K CHR Bank 2 Switchable
    // PPU $1000..=$1FFF (or $0000..=$0FFF) Four 1K CHR Banks Switchable
    // CPU $6000..=$7FFF 8K PRG-RAM Bank
    // CPU $8000..=$9FFF (or $C000..=$DFFF) 8K PRG-ROM Bank Switchable
    // CPU $A000..=$BFFF 8K PRG-ROM Bank Switchable
    // CPU $C000..=$DFFF (or $8000..=$9FFF) 8K PRG-ROM fixed to second-to-last
    // CPU $E000..=$FFFF 8K PRG-ROM fixed to last

    fn map_peek(&self, addr: u16) -> MappedRead {
        match addr {
            0x0000..=0x1FFF => MappedRead::Chr(self.chr_banks.translate(addr)),
            0x6000..=0x7FFF => MappedRead::PrgRam((addr & 0x1FFF).into()),
            0x8000..=0xFFFF => MappedRead::PrgRom(self.prg_rom_banks.translate(addr)),
            _ => MappedRead::Bus,
        }
    }

    fn map_write(&mut self, addr: u16, val: u8) -> MappedWrite {
        match addr {
            0x0000..=0x1FFF if self.chr_ram => {
                MappedWrite::ChrRam(self.chr_banks.translate(addr), val)
            }
            0x0000..=0x1FFF => MappedWrite::None, // CHR-ROM is read-only
            0x6000..=0x7FFF => MappedWrite::PrgRam((addr & 0x1FFF).into(), val),
            // Match only $8000/1, $A000/1, $C000/1, and $E000/1
            0x8000..=0xFFFF => {
                match addr & 0xE001 {
                    0x8000 => {
                        // 7654 3210
                        // CPxx xRRR
                        // ||    +++- Bank register to update on next $8001 write
                        // |+-------- PRG-ROM bank mode
                        // +--------- CHR A12 inversion
                        self.regs.bank_select = val;
                        self.update_banks();
                    }
                    0x8001 => {
                        let bank = self.regs.bank_select & 0x07;
                        self.regs.bank_values[bank as usize] = val;
                        self.update_banks();
                    }
                    0xA000 => {
                        if self.mirroring != Mirroring::FourScreen {
                            self.mirroring = match val & 0x01 {
                                0 => Mirroring::Vertical,
                                1 => Mirroring::Horizontal,
                                _ => unreachable!("impossible mirroring"),
                            };
                        }
                    }
                    0xA001 => (), // PRG-RAM protect, not emulated
                    0xC000 => self.regs.irq_latch = val,
                    0xC001 => self.regs.irq_reload = true,
                    0xE000 => {
                        self.regs.irq_enabled = false;
                        self.regs.irq_pending = false;
                    }
                    0xE001 => self.regs.irq_enabled = true,
                    _ => unreachable!("impossible address"),
                }
                MappedWrite::Bus
            }
            _ => MappedWrite::Bus,
        }
    }
}

impl Mapped for Mmc3 {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }

    fn on_scanline(&mut self) {
        if self.regs.irq_counter == 0 || self.regs.irq_reload {
            self.regs.irq_counter = self.regs.irq_latch;
            self.regs.irq_reload = false;
        } else {
            self.regs.irq_counter -= 1;
        }
        if self.regs.irq_counter == 0 && self.regs.irq_enabled {
            trace!("MMC3 IRQ");
            self.regs.irq_pending = true;
        }
    }

    fn irq_pending(&self) -> bool {
        self.regs.irq_pending
    }
}

impl Clock for Mmc3 {}

impl Reset for Mmc3 {
    fn reset(&mut self, _kind: ResetKind) {
        self.regs = Regs::default();
        self.update_banks();
    }
}
