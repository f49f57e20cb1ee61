//! NES memory/data bus implementation.
//!
//! <http://wiki.nesdev.com/w/index.php/CPU_memory_map>

use crate::{
    apu::{Apu, Channel},
    cart::Cart,
    common::{Clock, Reset, ResetKind},
    input::{Input, Player},
    mapper::{Mapper, MappedRead, MappedWrite, MemMap},
    mem::{Memory, RamState},
    ppu::Ppu,
};
use serde::{Deserialize, Serialize};

/// NES CPU bus.
///
/// <http://wiki.nesdev.com/w/index.php/CPU_memory_map>
///
/// |-----------------| $FFFF |-----------------|
/// | PRG-ROM         |       |                 |
/// |-----------------| $8000 |-----------------|
/// | PRG-RAM or SRAM |       | PRG-RAM or SRAM |
/// |-----------------| $6000 |-----------------|
/// | Expansion       |       | Expansion       |
/// | Modules         |       | Modules         |
/// |-----------------| $4020 |-----------------|
/// | APU/Input       |       |                 |
/// | Registers       |       |                 |
/// |- - - - - - - - -| $4000 |                 |
/// | PPU Mirrors     |       | I/O Registers   |
/// | $2000-$2007     |       |                 |
/// |- - - - - - - - -| $2008 |                 |
/// | PPU Registers   |       |                 |
/// |-----------------| $2000 |-----------------|
/// | WRAM Mirrors    |       | 2K Internal     |
/// | $0000-$07FF     |       | Work RAM        |
/// |-----------------| $0000 |-----------------|
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Bus {
    pub apu: Apu,
    pub input: Input,
    pub ppu: Ppu,
    pub wram: Memory,
    pub prg_ram: Memory,
    #[serde(skip)]
    pub prg_rom: Memory,
    pub ram_state: RamState,
    pub open_bus: u8,
    /// Page latched by a $4014 write, consumed by the CPU's DMA stall.
    pub oam_dma: Option<u16>,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(RamState::default(), Apu::DEFAULT_SAMPLE_RATE)
    }
}

impl Bus {
    const WRAM_SIZE: usize = 0x0800; // 2K NES Work RAM available to the CPU

    pub fn new(ram_state: RamState, sample_rate: u32) -> Self {
        Self {
            apu: Apu::new(sample_rate),
            input: Input::new(),
            ppu: Ppu::new(ram_state),
            wram: Memory::ram(ram_state, Self::WRAM_SIZE),
            prg_ram: Memory::new(),
            prg_rom: Memory::new(),
            ram_state,
            open_bus: 0x00,
            oam_dma: None,
        }
    }

    /// Attach a cartridge: PRG on this bus, CHR and the mapper on the PPU bus.
    pub fn load_cart(&mut self, cart: Cart) {
        self.prg_rom = cart.prg_rom;
        self.prg_ram = cart.prg_ram;
        if cart.chr_rom.is_empty() {
            self.ppu.bus.load_chr(cart.chr_ram, true);
        } else {
            self.ppu.bus.load_chr(cart.chr_rom, false);
        }
        self.ppu.bus.mapper = cart.mapper;
    }

    pub fn unload_cart(&mut self) {
        self.prg_rom = Memory::new();
        self.prg_ram = Memory::new();
        self.ppu.bus.load_chr(Memory::new(), false);
        self.ppu.bus.mapper = Mapper::none();
    }

    #[must_use]
    pub fn wram(&self) -> &[u8] {
        &self.wram
    }

    /// Battery-backed Save RAM view.
    #[must_use]
    pub fn sram(&self) -> &[u8] {
        &self.prg_ram
    }

    pub fn load_sram(&mut self, sram: &[u8]) {
        let len = self.prg_ram.len().min(sram.len());
        self.prg_ram[..len].copy_from_slice(&sram[..len]);
    }

    #[must_use]
    pub fn audio_samples(&self) -> &[f32] {
        &self.apu.samples
    }

    pub fn clear_audio_samples(&mut self) {
        self.apu.samples.clear();
    }

    /// A contiguous 256-byte view for OAM DMA, when the source region doesn't
    /// cross a bank seam or land in a register window.
    #[must_use]
    pub fn dma_slice(&self, addr: u16) -> Option<&[u8]> {
        match addr {
            0x0000..=0x1FFF => {
                let start = (addr & 0x07FF) as usize;
                self.wram.get(start..start + 256)
            }
            0x4020..=0xFFFF => {
                let start = self.ppu.bus.mapper.map_peek(addr);
                let end = self.ppu.bus.mapper.map_peek(addr.checked_add(255)?);
                match (start, end) {
                    (MappedRead::PrgRom(lo), MappedRead::PrgRom(hi)) if hi == lo + 255 => {
                        self.prg_rom.get(lo..lo + 256)
                    }
                    (MappedRead::PrgRam(lo), MappedRead::PrgRam(hi)) if hi == lo + 255 => {
                        self.prg_ram.get(lo..lo + 256)
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Advance every clocked device for `cycles` CPU cycles: the APU once and
    /// the PPU three times per cycle.
    pub fn tick(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.apu.clock();
            self.ppu.clock();
            self.ppu.clock();
            self.ppu.clock();
            self.ppu.bus.mapper.clock();
        }
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        let val = match addr {
            0x0000..=0x1FFF => self.wram[(addr & 0x07FF) as usize],
            0x2000..=0x3FFF => match addr & 0x2007 {
                0x2002 => self.ppu.read_status(),
                0x2004 => self.ppu.read_oamdata(),
                0x2007 => self.ppu.read_data(),
                _ => self.ppu.open_bus,
            },
            0x4015 => self.apu.read_status(),
            0x4016 => self.input.read(Player::One),
            0x4017 => self.input.read(Player::Two),
            0x4000..=0x401F => self.open_bus,
            0x4020..=0xFFFF => match self.ppu.bus.mapper.map_read(addr) {
                MappedRead::Data(val) => val,
                MappedRead::PrgRam(addr) => self.prg_ram.get(addr).copied().unwrap_or(0x00),
                MappedRead::PrgRom(addr) => self.prg_rom.get(addr).copied().unwrap_or(0x00),
                _ => self.open_bus,
            },
        };
        self.open_bus = val;
        val
    }

    /// Non-mutating read used for disassembly, traces, and tests.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.wram[(addr & 0x07FF) as usize],
            0x2000..=0x3FFF => match addr & 0x2007 {
                0x2002 => self.ppu.peek_status(),
                0x2004 => self.ppu.peek_oamdata(),
                0x2007 => self.ppu.peek_data(),
                _ => self.ppu.open_bus,
            },
            0x4015 => self.apu.peek_status(),
            0x4016 => self.input.peek(Player::One),
            0x4017 => self.input.peek(Player::Two),
            0x4000..=0x401F => self.open_bus,
            0x4020..=0xFFFF => match self.ppu.bus.mapper.map_peek(addr) {
                MappedRead::Data(val) => val,
                MappedRead::PrgRam(addr) => self.prg_ram.get(addr).copied().unwrap_or(0x00),
                MappedRead::PrgRom(addr) => self.prg_rom.get(addr).copied().unwrap_or(0x00),
                _ => self.open_bus,
            },
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x1FFF => self.wram[(addr & 0x07FF) as usize] = val,
            0x2000..=0x3FFF => match addr & 0x2007 {
                0x2000 => self.ppu.write_ctrl(val),
                0x2001 => self.ppu.write_mask(val),
                0x2002 => self.ppu.open_bus = val,
                0x2003 => self.ppu.write_oamaddr(val),
                0x2004 => self.ppu.write_oamdata(val),
                0x2005 => self.ppu.write_scroll(val),
                0x2006 => self.ppu.write_addr(val),
                _ => self.ppu.write_data(val),
            },
            0x4000 => self.apu.write_ctrl(Channel::Pulse1, val),
            0x4001 => self.apu.write_sweep(Channel::Pulse1, val),
            0x4002 => self.apu.write_timer_lo(Channel::Pulse1, val),
            0x4003 => self.apu.write_timer_hi(Channel::Pulse1, val),
            0x4004 => self.apu.write_ctrl(Channel::Pulse2, val),
            0x4005 => self.apu.write_sweep(Channel::Pulse2, val),
            0x4006 => self.apu.write_timer_lo(Channel::Pulse2, val),
            0x4007 => self.apu.write_timer_hi(Channel::Pulse2, val),
            0x4008 => self.apu.write_linear_counter(val),
            0x400A => self.apu.write_timer_lo(Channel::Triangle, val),
            0x400B => self.apu.write_timer_hi(Channel::Triangle, val),
            0x400C => self.apu.write_ctrl(Channel::Noise, val),
            0x400E => self.apu.write_timer_lo(Channel::Noise, val),
            0x400F => self.apu.write_length(Channel::Noise, val),
            0x4010 => self.apu.write_timer_lo(Channel::Dmc, val),
            0x4011 => self.apu.write_dmc_output(val),
            0x4012 => self.apu.write_dmc_addr(val),
            0x4013 => self.apu.write_length(Channel::Dmc, val),
            0x4014 => self.oam_dma = Some(u16::from(val) << 8),
            0x4015 => self.apu.write_status(val),
            0x4016 => self.input.write(val),
            0x4017 => self.apu.write_frame_counter(val),
            0x4009 | 0x400D | 0x4018..=0x401F => (),
            0x4020..=0xFFFF => {
                if let MappedWrite::PrgRam(addr, val) = self.ppu.bus.mapper.map_write(addr, val) {
                    if let Some(dst) = self.prg_ram.get_mut(addr) {
                        *dst = val;
                    }
                }
            }
        }
        self.open_bus = val;
    }

    /// Read a 16-bit little-endian word.
    pub fn read_u16(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr);
        let hi = self.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Peek a 16-bit little-endian word.
    #[must_use]
    pub fn peek_u16(&self, addr: u16) -> u16 {
        let lo = self.peek(addr);
        let hi = self.peek(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }
}

impl Clock for Bus {
    fn clock(&mut self) -> usize {
        self.tick(1);
        1
    }
}

impl Reset for Bus {
    fn reset(&mut self, kind: ResetKind) {
        if kind == ResetKind::Hard {
            self.wram.fill_ram(self.ram_state);
        }
        self.open_bus = 0x00;
        self.oam_dma = None;
        self.ppu.reset(kind);
        self.apu.reset(kind);
        self.input.reset(kind);
        self.ppu.bus.mapper.reset(kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_ram_mirrors() {
        let mut bus = Bus::default();

        bus.write(0x0001, 0x66);
        assert_eq!(bus.peek(0x0001), 0x66, "peek ram");
        assert_eq!(bus.read(0x0001), 0x66, "read ram");
        assert_eq!(bus.read(0x0801), 0x66, "read mirror 1");
        assert_eq!(bus.read(0x1001), 0x66, "read mirror 2");
        assert_eq!(bus.read(0x1801), 0x66, "read mirror 3");

        bus.write(0x0802, 0x77);
        assert_eq!(bus.read(0x0002), 0x77, "write mirror 1");
        bus.write(0x1002, 0x88);
        assert_eq!(bus.read(0x0002), 0x88, "write mirror 2");
        bus.write(0x1802, 0x99);
        assert_eq!(bus.read(0x0002), 0x99, "write mirror 3");
    }

    #[test]
    fn ppu_register_mirrors() {
        let mut bus = Bus::default();
        bus.load_cart(Cart::empty());

        // $2006 is mirrored every 8 bytes through $3FFF
        bus.write(0x2006, 0x21);
        bus.write(0x3FFE, 0x08);
        assert_eq!(bus.ppu.scroll.addr(), 0x2108);
    }

    #[test]
    fn prg_rom_reads_via_mapper() {
        let mut bus = Bus::default();
        let mut cart = Cart::empty();
        cart.prg_rom[0] = 0xA9;
        cart.prg_rom[0x3FFF] = 0x60;
        bus.load_cart(cart);

        assert_eq!(bus.read(0x8000), 0xA9);
        // NROM-128 mirrors its 16K bank at $C000
        assert_eq!(bus.read(0xC000), 0xA9);
        assert_eq!(bus.read(0xFFFF), 0x60);
    }

    #[test]
    fn dma_slice_contiguous_ram() {
        let mut bus = Bus::default();
        bus.write(0x0200, 0xAB);
        let slice = bus.dma_slice(0x0200).expect("contiguous wram");
        assert_eq!(slice.len(), 256);
        assert_eq!(slice[0], 0xAB);
        assert!(bus.dma_slice(0x0780).is_none(), "crosses the wram boundary");
        assert!(bus.dma_slice(0x2002).is_none(), "register window");
    }

    #[test]
    fn controller_ports() {
        use crate::input::JoypadBtn;
        let mut bus = Bus::default();
        bus.input.joypad_mut(Player::One).set_button(JoypadBtn::A, true);
        bus.write(0x4016, 0x01);
        bus.write(0x4016, 0x00);
        assert_eq!(bus.read(0x4016) & 0x01, 0x01, "A pressed");
        assert_eq!(bus.read(0x4016) & 0x01, 0x00, "B not pressed");
    }
}
