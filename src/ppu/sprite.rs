//! PPU sprite unit state.

use serde::{Deserialize, Serialize};

/// One of the eight sprite units loaded for the current scanline.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Sprite {
    pub x: u32,
    pub y: u32,
    pub tile_lo: u8,
    pub tile_hi: u8,
    pub palette: u8,
    pub bg_priority: bool,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl Sprite {
    pub const fn new() -> Self {
        Self {
            x: 0,
            y: 0,
            tile_lo: 0x00,
            tile_hi: 0x00,
            palette: 0x10,
            bg_priority: false,
            flip_horizontal: false,
            flip_vertical: false,
        }
    }
}
