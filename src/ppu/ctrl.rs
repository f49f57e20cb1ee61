//! PPUCTRL register implementation.
//!
//! See: <https://wiki.nesdev.com/w/index.php/PPU_registers#PPUCTRL>

use crate::common::{Reset, ResetKind};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// PPUCTRL register.
///
/// See: <https://wiki.nesdev.com/w/index.php/PPU_registers#PPUCTRL>
#[derive(Default, Serialize, Deserialize, Debug, Copy, Clone)]
#[must_use]
pub struct Ctrl {
    pub spr_select: u16,
    pub bg_select: u16,
    pub spr_height: u32,
    pub nmi_enabled: bool,
    pub vram_increment: u16,
    bits: Bits,
}

bitflags! {
    // $2000 PPUCTRL
    //
    // http://wiki.nesdev.com/w/index.php/PPU_registers#PPUCTRL
    // VPHB SINN
    // |||| ||++- Nametable Select: 0b00 = $2000; 0b01 = $2400;
    // |||| ||                      0b10 = $2800; 0b11 = $2C00
    // |||| |+--- VRAM Increment Mode: 0 = add 1, going across; 1 = add 32, going down
    // |||| +---- Sprite Pattern Select for 8x8: 0 = $0000, 1 = $1000
    // |||+------ Background Pattern Select: 0 = $0000, 1 = $1000
    // ||+------- Sprite Height: 0 = 8x8, 1 = 8x16
    // |+-------- PPU Master/Slave: 0 = read from EXT, 1 = write to EXT
    // +--------- NMI Enable: NMI at next vblank: 0 = off, 1: on
    #[derive(Default, Serialize, Deserialize, Debug, Copy, Clone)]
    #[must_use]
    pub struct Bits: u8 {
        const NAMETABLE1 = 0x01;
        const NAMETABLE2 = 0x02;
        const VRAM_INCREMENT = 0x04;
        const SPR_SELECT = 0x08;
        const BG_SELECT = 0x10;
        const SPR_HEIGHT = 0x20;
        const MASTER_SLAVE = 0x40;
        const NMI_ENABLE = 0x80;
    }
}

impl Ctrl {
    pub fn new() -> Self {
        let mut ctrl = Self::default();
        ctrl.write(0);
        ctrl
    }

    pub fn write(&mut self, val: u8) {
        self.bits = Bits::from_bits_truncate(val);
        // 0x1000 or 0x0000
        self.spr_select = self.bits.contains(Bits::SPR_SELECT) as u16 * 0x1000;
        // 0x1000 or 0x0000
        self.bg_select = self.bits.contains(Bits::BG_SELECT) as u16 * 0x1000;
        // 16 or 8
        self.spr_height = self.bits.contains(Bits::SPR_HEIGHT) as u32 * 8 + 8;
        self.nmi_enabled = self.bits.contains(Bits::NMI_ENABLE);
        // 32 or 1
        self.vram_increment = self.bits.contains(Bits::VRAM_INCREMENT) as u16 * 31 + 1;
    }
}

impl Reset for Ctrl {
    // https://www.nesdev.org/wiki/PPU_power_up_state
    fn reset(&mut self, _kind: ResetKind) {
        self.write(0);
    }
}
