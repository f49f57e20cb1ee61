//! APU Length Counter implementation.
//!
//! See: <https://www.nesdev.org/wiki/APU_Length_Counter>

use crate::common::{Clock, Reset, ResetKind};
use serde::{Deserialize, Serialize};

/// APU Length Counter provides duration control for APU waveform channels.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct LengthCounter {
    pub enabled: bool,
    pub halt: bool,
    pub counter: u8,
}

impl LengthCounter {
    const LENGTH_TABLE: [u8; 32] = [
        10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96,
        22, 192, 24, 72, 26, 16, 28, 32, 30,
    ];

    pub const fn new() -> Self {
        Self {
            enabled: false,
            halt: false,
            counter: 0,
        }
    }

    /// Load the counter from the length table (D7..D3 of the timer-hi write).
    /// Ignored while the channel is disabled.
    #[inline]
    pub const fn write(&mut self, val: u8) {
        if self.enabled {
            self.counter = Self::LENGTH_TABLE[val as usize];
        }
    }

    #[inline]
    pub const fn write_ctrl(&mut self, halt: bool) {
        self.halt = halt;
    }

    /// $4015 channel enable. Disabling zeroes the counter.
    #[inline]
    pub const fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.counter = 0;
        }
        self.enabled = enabled;
    }
}

impl Clock for LengthCounter {
    fn clock(&mut self) -> usize {
        if self.counter > 0 && !self.halt {
            self.counter -= 1;
            1
        } else {
            0
        }
    }
}

impl Reset for LengthCounter {
    fn reset(&mut self, _kind: ResetKind) {
        self.enabled = false;
        self.halt = false;
        self.counter = 0;
    }
}
