//! APU DMC Channel stub.
//!
//! Sample playback DMA is not emulated; the channel accepts its register
//! writes and contributes a constant 0 to the mixer.

use crate::common::{Reset, ResetKind, Sample};
use serde::{Deserialize, Serialize};

/// APU Delta Modulation Channel registers ($4010-$4013).
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Dmc {
    pub freq: u8,
    pub output_level: u8,
    pub sample_addr: u8,
    pub sample_length: u8,
    pub enabled: bool,
}

impl Dmc {
    pub const fn new() -> Self {
        Self {
            freq: 0,
            output_level: 0,
            sample_addr: 0,
            sample_length: 0,
            enabled: false,
        }
    }

    /// $4010 Flags and rate.
    pub const fn write_freq(&mut self, val: u8) {
        self.freq = val;
    }

    /// $4011 Direct output level.
    pub const fn write_output(&mut self, val: u8) {
        self.output_level = val & 0x7F;
    }

    /// $4012 Sample address.
    pub const fn write_addr(&mut self, val: u8) {
        self.sample_addr = val;
    }

    /// $4013 Sample length.
    pub const fn write_length(&mut self, val: u8) {
        self.sample_length = val;
    }

    pub const fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl Sample for Dmc {
    fn output(&self) -> f32 {
        0.0
    }
}

impl Reset for Dmc {
    fn reset(&mut self, _kind: ResetKind) {
        *self = Self::new();
    }
}
