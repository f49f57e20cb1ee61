//! PPUMASK register implementation.
//!
//! See: <https://wiki.nesdev.org/w/index.php/PPU_registers#PPUMASK>

use crate::common::{Reset, ResetKind};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// PPUMASK register.
///
/// See: <https://wiki.nesdev.org/w/index.php/PPU_registers#PPUMASK>
#[derive(Default, Serialize, Deserialize, Debug, Copy, Clone)]
#[must_use]
pub struct Mask {
    pub bits: Bits,
    /// Cached as it's checked every dot.
    pub rendering_enabled: bool,
}

bitflags! {
    // $2001 PPUMASK
    //
    // https://wiki.nesdev.org/w/index.php/PPU_registers#PPUMASK
    // BGRs bMmG
    // |||| |||+- Grayscale (0: normal color, 1: produce a grayscale display)
    // |||| ||+-- 1: Show background in leftmost 8 pixels of screen, 0: Hide
    // |||| |+--- 1: Show sprites in leftmost 8 pixels of screen, 0: Hide
    // |||| +---- 1: Show background
    // |||+------ 1: Show sprites
    // ||+------- Emphasize red
    // |+-------- Emphasize green
    // +--------- Emphasize blue
    #[derive(Default, Serialize, Deserialize, Debug, Copy, Clone)]
    #[must_use]
    pub struct Bits: u8 {
        const GRAYSCALE = 0x01;
        const SHOW_LEFT_BG = 0x02;
        const SHOW_LEFT_SPR = 0x04;
        const SHOW_BG = 0x08;
        const SHOW_SPR = 0x10;
        const EMPHASIZE_RED = 0x20;
        const EMPHASIZE_GREEN = 0x40;
        const EMPHASIZE_BLUE = 0x80;
    }
}

impl Mask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, val: u8) {
        self.bits = Bits::from_bits_truncate(val);
        self.rendering_enabled = self.show_bg() || self.show_spr();
    }

    /// Palette index mask applied to every output pixel.
    #[inline]
    #[must_use]
    pub const fn grayscale(&self) -> u8 {
        if self.bits.contains(Bits::GRAYSCALE) {
            0x30
        } else {
            0x3F
        }
    }

    #[inline]
    #[must_use]
    pub const fn show_left_bg(&self) -> bool {
        self.bits.contains(Bits::SHOW_LEFT_BG)
    }

    #[inline]
    #[must_use]
    pub const fn show_left_spr(&self) -> bool {
        self.bits.contains(Bits::SHOW_LEFT_SPR)
    }

    #[inline]
    #[must_use]
    pub const fn show_bg(&self) -> bool {
        self.bits.contains(Bits::SHOW_BG)
    }

    #[inline]
    #[must_use]
    pub const fn show_spr(&self) -> bool {
        self.bits.contains(Bits::SHOW_SPR)
    }
}

impl Reset for Mask {
    // https://www.nesdev.org/wiki/PPU_power_up_state
    fn reset(&mut self, _kind: ResetKind) {
        self.write(0);
    }
}
