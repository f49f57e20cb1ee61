//! `MMC1`/`SxROM` (Mapper 001).
//!
//! <https://wiki.nesdev.org/w/index.php/MMC1>

use crate::{
    cart::Cart,
    common::{Clock, Reset, ResetKind},
    mapper::{Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::{self, Banks},
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};

/// `MMC1` registers, collected five serial bits at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Regs {
    write_just_occurred: u8,
    shift: u8,       // $8000-$FFFF - 5 bit serial shift register
    shift_count: u8, // how many bits have been shifted in
    control: u8,     // $8000-$9FFF
    chr0: u8,        // $A000-$BFFF
    chr1: u8,        // $C000-$DFFF
    prg: u8,         // $E000-$FFFF bits 0-3, bit 4 disables PRG-RAM
}

/// `MMC1`/`SxROM` (Mapper 001).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Mmc1 {
    pub regs: Regs,
    pub mirroring: Mirroring,
    pub chr_ram: bool,
    pub chr_banks: Banks,
    pub prg_rom_banks: Banks,
}

impl Mmc1 {
    const PRG_ROM_WINDOW: usize = 16 * 1024;
    const CHR_WINDOW: usize = 4 * 1024;
    const PRG_RAM_SIZE: usize = 8 * 1024;
    const CHR_RAM_SIZE: usize = 8 * 1024;

    const SHIFT_RESET: u8 = 0x80; // Bit 7 of any write resets the shift register
    const MIRRORING_MASK: u8 = 0x03;
    const PRG_MODE_MASK: u8 = 0x0C;
    const CHR_MODE_MASK: u8 = 0x10;
    const CHR_BANK_MASK: u8 = 0x1F;
    const PRG_BANK_MASK: u8 = 0x0F;

    // Control OR'd in on shift reset: mode 3, fix last bank at $C000
    const DEFAULT_PRG_MODE: u8 = 0x0C;

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
        let mut mmc1 = Self {
            regs: Regs {
                write_just_occurred: 0x00,
                shift: 0x00,
                shift_count: 0,
                control: Self::DEFAULT_PRG_MODE,
                chr0: 0x00,
                chr1: 0x00,
                prg: 0x00,
            },
            mirroring: Mirroring::SingleScreenA,
            chr_ram: !cart.has_chr_rom(),
            chr_banks: Banks::new(0x0000, 0x1FFF, chr_len, Self::CHR_WINDOW)?,
            prg_rom_banks: Banks::new(0x8000, 0xFFFF, cart.prg_rom.len(), Self::PRG_ROM_WINDOW)?,
        };
        mmc1.update_banks();
        Ok(mmc1.into())
    }

    /// The current PRG bank register value (bits 0-3).
    #[must_use]
    pub const fn prg_bank(&self) -> u8 {
        self.regs.prg & Self::PRG_BANK_MASK
    }

    /// The current control register value.
    #[must_use]
    pub const fn control(&self) -> u8 {
        self.regs.control
    }

    const fn reset_shift(&mut self) {
        self.regs.shift = 0x00;
        self.regs.shift_count = 0;
    }

    const fn prg_ram_enabled(&self) -> bool {
        self.regs.prg & 0x10 == 0x00
    }

    /// Latch five collected bits into the register selected by address range.
    fn update_register(&mut self, addr: u16, val: u8) {
        match addr & 0xE000 {
            0x8000 => {
                self.regs.control = val;
                self.mirroring = match val & Self::MIRRORING_MASK {
                    0 => Mirroring::SingleScreenA,
                    1 => Mirroring::SingleScreenB,
                    2 => Mirroring::Vertical,
                    3 => Mirroring::Horizontal,
                    _ => unreachable!("impossible mirroring mode"),
                };
            }
            0xA000 => self.regs.chr0 = val & Self::CHR_BANK_MASK,
            0xC000 => self.regs.chr1 = val & Self::CHR_BANK_MASK,
            0xE000 => self.regs.prg = val & 0x1F,
            _ => unreachable!("impossible mmc1 register"),
        }
        self.update_banks();
    }

    fn update_banks(&mut self) {
        let prg = usize::from(self.prg_bank());
        match (self.regs.control & Self::PRG_MODE_MASK) >> 2 {
            // Switch 32K at $8000, ignoring low bit of bank number
            0 | 1 => self.prg_rom_banks.set_range(0, 1, prg & 0x0E),
            // Fix first bank at $8000, switch 16K bank at $C000
            2 => {
                self.prg_rom_banks.set(0, 0);
                self.prg_rom_banks.set(1, prg);
            }
            // Fix last bank at $C000, switch 16K bank at $8000
            3 => {
                self.prg_rom_banks.set(0, prg);
                self.prg_rom_banks.set(1, self.prg_rom_banks.last());
            }
            _ => unreachable!("impossible prg mode"),
        }

        if self.regs.control & Self::CHR_MODE_MASK == Self::CHR_MODE_MASK {
            // Two switchable 4K banks
            self.chr_banks.set(0, self.regs.chr0.into());
            self.chr_banks.set(1, self.regs.chr1.into());
        } else {
            // One 8K bank, low bit ignored
            self.chr_banks.set(0, (self.regs.chr0 & 0x1E).into());
            self.chr_banks.set(1, ((self.regs.chr0 & 0x1E) + 1).into());
        }
    }
}

impl MemMap for Mmc1 {
    // PPU $0000..=$1FFF 4K CHR-ROM/RAM Bank Switchable
    // CPU $6000..=$7FFF 8K PRG-RAM Bank (optional)
    // CPU $8000..=$BFFF 16K PRG-ROM Bank Switchable or Fixed to First Bank
    // CPU $C000..=$FFFF 16K PRG-ROM Bank Fixed to Last Bank or Switchable

    fn map_peek(&self, addr: u16) -> MappedRead {
        match addr {
            0x0000..=0x1FFF => MappedRead::Chr(self.chr_banks.translate(addr)),
            0x6000..=0x7FFF if self.prg_ram_enabled() => {
                MappedRead::PrgRam((addr & 0x1FFF).into())
            }
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
            0x6000..=0x7FFF if self.prg_ram_enabled() => {
                MappedWrite::PrgRam((addr & 0x1FFF).into(), val)
            }
            0x6000..=0x7FFF => MappedWrite::None, // PRG-RAM disabled
            0x8000..=0xFFFF => {
                // Load register $8000-$FFFF
                // 7654 3210
                // Rxxx xxxD
                // |       +- Data bit shifted into the shift register, LSB first
                // +--------- 1: Reset shift register and write Control with
                //               (Control OR $0C), locking PRG-ROM at
                //               $C000-$FFFF to the last bank

                // Consecutive-cycle writes are ignored (RMW instructions
                // write twice, only the first write counts)
                if self.regs.write_just_occurred > 0 {
                    return MappedWrite::Bus;
                }
                self.regs.write_just_occurred = 2;

                if val & Self::SHIFT_RESET == Self::SHIFT_RESET {
                    self.reset_shift();
                    self.regs.control |= Self::DEFAULT_PRG_MODE;
                    self.update_banks();
                } else {
                    self.regs.shift >>= 1;
                    self.regs.shift |= (val & 0x01) << 4;
                    self.regs.shift_count += 1;
                    if self.regs.shift_count == 5 {
                        let collected = self.regs.shift;
                        self.update_register(addr, collected);
                        self.reset_shift();
                    }
                }
                MappedWrite::Bus
            }
            _ => MappedWrite::Bus,
        }
    }
}

impl Mapped for Mmc1 {
    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }
}

impl Clock for Mmc1 {
    fn clock(&mut self) -> usize {
        if self.regs.write_just_occurred > 0 {
            self.regs.write_just_occurred -= 1;
        }
        1
    }
}

impl Reset for Mmc1 {
    fn reset(&mut self, kind: ResetKind) {
        self.reset_shift();
        self.regs.control |= Self::DEFAULT_PRG_MODE;
        self.update_banks();
        if kind == ResetKind::Hard {
            self.regs.write_just_occurred = 0;
        }
    }
}
