//! APU Sweep implementation.
//!
//! See: <https://www.nesdev.org/wiki/APU_Sweep>

use crate::common::{Reset, ResetKind};
use serde::{Deserialize, Serialize};

/// APU Sweep provides pitch glides for the pulse channels.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Sweep {
    pub enabled: bool,
    pub negate: bool,
    pub reload: bool,
    pub shift: u8,
    pub period: u8,
    pub divider: u8,
}

impl Sweep {
    pub const fn new() -> Self {
        Self {
            enabled: false,
            negate: false,
            reload: false,
            shift: 0,
            period: 0,
            divider: 0,
        }
    }

    /// $4001/$4005 Sweep control.
    pub fn write(&mut self, val: u8) {
        self.enabled = (val & 0x80) == 0x80;
        self.period = ((val & 0x70) >> 4) + 1;
        self.negate = (val & 0x08) == 0x08;
        self.shift = val & 0x07;
        self.reload = true;
    }

    /// Step the sweep divider on a half-frame clock. Returns whether the
    /// channel period should be adjusted this clock.
    pub fn step(&mut self) -> bool {
        if self.reload || self.divider == 0 {
            let should_sweep = self.enabled && self.divider == 0;
            self.divider = self.period;
            self.reload = false;
            should_sweep
        } else {
            self.divider -= 1;
            false
        }
    }
}

impl Reset for Sweep {
    fn reset(&mut self, _kind: ResetKind) {
        *self = Self::new();
    }
}
