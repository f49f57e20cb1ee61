//! APU Noise Channel implementation.
//!
//! See: <https://www.nesdev.org/wiki/APU_Noise>

use crate::{
    apu::{envelope::Envelope, length_counter::LengthCounter},
    common::{Clock, Reset, ResetKind, Sample},
};
use serde::{Deserialize, Serialize};

/// Noise shift mode, selecting the LFSR feedback tap.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum ShiftMode {
    /// Long sequence (XOR bits 0 and 1)
    #[default]
    Long,
    /// Short 93-step sequence (XOR bits 0 and 6)
    Short,
}

/// APU Noise Channel provides pseudo-random noise generation from a 15-bit
/// linear-feedback shift register.
///
/// See: <https://www.nesdev.org/wiki/APU_Noise>
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Noise {
    pub timer: u16,
    pub timer_period: u16,
    pub shift: u16, // 15-bit LFSR, seeded to 1 on power-up
    pub shift_mode: ShiftMode,
    pub length: LengthCounter,
    pub envelope: Envelope,
}

impl Default for Noise {
    fn default() -> Self {
        Self::new()
    }
}

impl Noise {
    const PERIOD_TABLE: [u16; 16] = [
        4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
    ];

    pub const fn new() -> Self {
        Self {
            timer: 0,
            timer_period: Self::PERIOD_TABLE[0],
            shift: 1,
            shift_mode: ShiftMode::Long,
            length: LengthCounter::new(),
            envelope: Envelope::new(),
        }
    }

    /// Muted whenever bit 0 of the shift register is set.
    #[inline]
    #[must_use]
    pub const fn is_muted(&self) -> bool {
        self.shift & 0x01 == 0x01
    }

    /// Advance the timer; clocked every other CPU cycle.
    pub const fn clock_timer(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
        } else {
            self.timer = self.timer_period;
            let tap = match self.shift_mode {
                ShiftMode::Long => 1,
                ShiftMode::Short => 6,
            };
            let feedback = (self.shift & 0x01) ^ ((self.shift >> tap) & 0x01);
            self.shift >>= 1;
            self.shift |= feedback << 14;
        }
    }

    pub fn clock_quarter_frame(&mut self) {
        self.envelope.clock();
    }

    pub fn clock_half_frame(&mut self) {
        self.length.clock();
    }

    /// $400C Noise control.
    pub fn write_ctrl(&mut self, val: u8) {
        self.length.write_ctrl((val & 0x20) == 0x20); // D5
        self.envelope.write_ctrl(val);
    }

    /// $400E Noise timer period and shift mode.
    pub const fn write_timer(&mut self, val: u8) {
        self.timer_period = Self::PERIOD_TABLE[(val & 0x0F) as usize];
        self.shift_mode = if (val & 0x80) == 0x80 {
            ShiftMode::Short
        } else {
            ShiftMode::Long
        };
    }

    /// $400F Length counter load.
    pub fn write_length(&mut self, val: u8) {
        self.length.write(val >> 3);
        self.envelope.restart();
    }

    pub const fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }
}

impl Sample for Noise {
    //    Timer --> Shift Register   Length Counter
    //                    |                |
    //                    v                v
    // Envelope -------> Gate ----------> Gate --> (to mixer)
    fn output(&self) -> f32 {
        if self.is_muted() || self.length.counter == 0 {
            0.0
        } else {
            f32::from(self.envelope.volume())
        }
    }
}

impl Reset for Noise {
    fn reset(&mut self, kind: ResetKind) {
        self.timer = 0;
        self.timer_period = Self::PERIOD_TABLE[0];
        self.shift = 1;
        self.shift_mode = ShiftMode::Long;
        self.length.reset(kind);
        self.envelope.reset(kind);
    }
}
