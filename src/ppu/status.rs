//! PPUSTATUS register implementation.
//!
//! See: <https://wiki.nesdev.com/w/index.php/PPU_registers#PPUSTATUS>

use crate::common::{Reset, ResetKind};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// PPUSTATUS register.
///
/// Only the upper 3 bits are driven; the low 5 read back as PPU open bus.
#[derive(Default, Serialize, Deserialize, Debug, Copy, Clone)]
#[must_use]
pub struct Status {
    pub spr_overflow: bool,
    pub spr_zero_hit: bool,
    pub in_vblank: bool,
}

bitflags! {
    // $2002 PPUSTATUS
    //
    // http://wiki.nesdev.com/w/index.php/PPU_registers#PPUSTATUS
    // VSO. ....
    // |||+-++++- PPU open bus. Returns stale PPU bus contents.
    // ||+------- Sprite overflow. Set during sprite evaluation when more than
    // ||         eight sprites land on a scanline; cleared at dot 1 of the
    // ||         pre-render line.
    // |+-------- Sprite 0 Hit. Set when a nonzero pixel of sprite 0 overlaps
    // |          a nonzero background pixel; cleared at dot 1 of the
    // |          pre-render line. Used for raster timing.
    // +--------- Vertical blank has started. Set at dot 1 of line 241;
    //            cleared after reading $2002 and at dot 1 of the pre-render
    //            line.
    #[derive(Default, Serialize, Deserialize, Debug, Copy, Clone)]
    #[must_use]
    pub struct Bits: u8 {
        const SPR_OVERFLOW = 0x20;
        const SPR_ZERO_HIT = 0x40;
        const VBLANK_STARTED = 0x80;
    }
}

impl Status {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn read(&self) -> u8 {
        let mut bits = 0x00;
        if self.spr_overflow {
            bits |= Bits::SPR_OVERFLOW.bits();
        }
        if self.spr_zero_hit {
            bits |= Bits::SPR_ZERO_HIT.bits();
        }
        if self.in_vblank {
            bits |= Bits::VBLANK_STARTED.bits();
        }
        bits
    }

    pub fn set_spr_overflow(&mut self, val: bool) {
        self.spr_overflow = val;
    }

    pub fn set_spr_zero_hit(&mut self, val: bool) {
        self.spr_zero_hit = val;
    }

    pub fn set_in_vblank(&mut self, val: bool) {
        self.in_vblank = val;
    }

    pub fn reset_in_vblank(&mut self) {
        self.in_vblank = false;
    }
}

impl Reset for Status {
    // https://www.nesdev.org/wiki/PPU_power_up_state
    fn reset(&mut self, kind: ResetKind) {
        if kind == ResetKind::Hard {
            self.in_vblank = false;
            self.spr_zero_hit = false;
            self.spr_overflow = false;
        }
    }
}
