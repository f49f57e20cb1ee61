//! PPU memory/data bus.

use crate::{
    mapper::{Mapped, MappedRead, MappedWrite, Mapper, MemMap},
    mem::{Memory, RamState},
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// PPU-side address decoder: pattern tables (through the mapper), nametable
/// RAM with mapper-directed mirroring, and palette RAM.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Bus {
    pub mapper: Mapper,
    #[serde(skip)]
    pub chr: Memory,
    pub chr_ram: bool,
    pub ciram: Memory,
    pub palette: Memory,
    pub open_bus: u8,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(RamState::default())
    }
}

impl Bus {
    pub const CIRAM_SIZE: usize = 0x0800; // Two 1K nametables
    pub const PALETTE_SIZE: usize = 32;

    const NT_SIZE: u16 = 0x0400;

    pub fn new(ram_state: RamState) -> Self {
        Self {
            mapper: Mapper::none(),
            chr: Memory::new(),
            chr_ram: false,
            ciram: Memory::ram(ram_state, Self::CIRAM_SIZE),
            palette: Memory::ram(ram_state, Self::PALETTE_SIZE),
            open_bus: 0x00,
        }
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }

    pub fn load_chr(&mut self, chr: Memory, chr_ram: bool) {
        self.chr = chr;
        self.chr_ram = chr_ram;
    }

    // Maps addresses to nametable pages based on mirroring mode:
    //
    // Vram:            [ A ] [ B ]
    //
    // Horizontal:      [ A ] [ a ]
    //                  [ B ] [ b ]
    //
    // Vertical:        [ A ] [ B ]
    //                  [ a ] [ b ]
    //
    // Single Screen A: [ A ] [ a ]
    //                  [ a ] [ a ]
    //
    // Single Screen B: [ b ] [ B ]
    //                  [ b ] [ b ]
    //
    // FourScreen relies on mapper-provided RAM for the extra two tables and
    // falls back to Vertical over internal ciram here.
    pub const fn ciram_mirror(addr: u16, mirroring: Mirroring) -> usize {
        let shift = match mirroring {
            Mirroring::Vertical | Mirroring::FourScreen => 0,
            Mirroring::Horizontal => 1,
            Mirroring::SingleScreenA => 2,
            Mirroring::SingleScreenB => 3,
        };
        let nametable = (addr >> shift) & Self::NT_SIZE;
        (nametable | (!nametable & addr & 0x03FF)) as usize
    }

    const fn palette_mirror(addr: u16) -> usize {
        // $3F10/$3F14/$3F18/$3F1C mirror $3F00/$3F04/$3F08/$3F0C
        let addr = addr & 0x001F;
        if addr >= 16 && addr.trailing_zeros() >= 2 {
            (addr - 16) as usize
        } else {
            addr as usize
        }
    }

    pub fn read_ciram(&mut self, addr: u16) -> u8 {
        match self.mapper.map_read(addr) {
            MappedRead::Chr(addr) => self.chr[addr],
            MappedRead::Data(data) => data,
            _ => self.ciram[Self::ciram_mirror(addr, self.mirroring())],
        }
    }

    pub fn peek_ciram(&self, addr: u16) -> u8 {
        match self.mapper.map_peek(addr) {
            MappedRead::Chr(addr) => self.chr[addr],
            MappedRead::Data(data) => data,
            _ => self.ciram[Self::ciram_mirror(addr, self.mirroring())],
        }
    }

    pub fn read_chr(&mut self, addr: u16) -> u8 {
        let addr = if let MappedRead::Chr(addr) = self.mapper.map_read(addr) {
            addr
        } else {
            addr.into()
        };
        self.chr.get(addr).copied().unwrap_or(0x00)
    }

    pub fn peek_chr(&self, addr: u16) -> u8 {
        let addr = if let MappedRead::Chr(addr) = self.mapper.map_peek(addr) {
            addr
        } else {
            addr.into()
        };
        self.chr.get(addr).copied().unwrap_or(0x00)
    }

    #[inline]
    #[must_use]
    pub fn peek_palette(&self, addr: u16) -> u8 {
        self.palette[Self::palette_mirror(addr)]
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        let val = match addr {
            0x0000..=0x1FFF => self.read_chr(addr),
            0x2000..=0x3EFF => self.read_ciram(addr),
            0x3F00..=0x3FFF => self.peek_palette(addr),
            _ => {
                error!("unexpected PPU memory access at ${addr:04X}");
                0x00
            }
        };
        self.open_bus = val;
        val
    }

    pub fn peek(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.peek_chr(addr),
            0x2000..=0x3EFF => self.peek_ciram(addr),
            0x3F00..=0x3FFF => self.peek_palette(addr),
            _ => {
                error!("unexpected PPU memory access at ${addr:04X}");
                0x00
            }
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x3EFF => match self.mapper.map_write(addr, val) {
                MappedWrite::ChrRam(addr, val) => {
                    if self.chr_ram {
                        self.chr[addr] = val;
                    }
                }
                MappedWrite::Bus => {
                    if addr >= 0x2000 {
                        let addr = Self::ciram_mirror(addr, self.mirroring());
                        self.ciram[addr] = val;
                    }
                }
                _ => (),
            },
            0x3F00..=0x3FFF => {
                let addr = Self::palette_mirror(addr);
                self.palette[addr] = val;
            }
            _ => error!("unexpected PPU memory access at ${addr:04X}"),
        }
        self.open_bus = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ciram_mirror_horizontal() {
        assert_eq!(Bus::ciram_mirror(0x2000, Mirroring::Horizontal), 0x0000);
        assert_eq!(Bus::ciram_mirror(0x23FF, Mirroring::Horizontal), 0x03FF);
        assert_eq!(Bus::ciram_mirror(0x2400, Mirroring::Horizontal), 0x0000);
        assert_eq!(Bus::ciram_mirror(0x2800, Mirroring::Horizontal), 0x0400);
        assert_eq!(Bus::ciram_mirror(0x2C05, Mirroring::Horizontal), 0x0405);
    }

    #[test]
    fn ciram_mirror_vertical() {
        assert_eq!(Bus::ciram_mirror(0x2000, Mirroring::Vertical), 0x0000);
        assert_eq!(Bus::ciram_mirror(0x2400, Mirroring::Vertical), 0x0400);
        assert_eq!(Bus::ciram_mirror(0x2800, Mirroring::Vertical), 0x0000);
        assert_eq!(Bus::ciram_mirror(0x2C05, Mirroring::Vertical), 0x0405);
    }

    #[test]
    fn ciram_mirror_single_screen() {
        assert_eq!(Bus::ciram_mirror(0x2C05, Mirroring::SingleScreenA), 0x0005);
        assert_eq!(Bus::ciram_mirror(0x2005, Mirroring::SingleScreenB), 0x0405);
    }

    #[test]
    fn palette_mirroring() {
        let mut bus = Bus::default();
        bus.write(0x3F10, 0x2A);
        assert_eq!(bus.peek_palette(0x3F00), 0x2A);
        bus.write(0x3F04, 0x17);
        assert_eq!(bus.peek_palette(0x3F04), 0x17);
        assert_eq!(bus.peek_palette(0x3F24), 0x17, "palette mirrors every $20");
    }
}
