//! APU Triangle Channel implementation.
//!
//! See: <https://www.nesdev.org/wiki/APU_Triangle>

use crate::{
    apu::length_counter::LengthCounter,
    common::{Clock, Reset, ResetKind, Sample},
};
use serde::{Deserialize, Serialize};

/// APU Triangle Channel provides triangle wave generation.
///
/// See: <https://www.nesdev.org/wiki/APU_Triangle>
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Triangle {
    pub timer: u16,
    pub timer_period: u16, // 11 bits, clocked at CPU rate
    pub sequence: u8,
    pub length: LengthCounter,
    pub linear: LinearCounter,
}

impl Default for Triangle {
    fn default() -> Self {
        Self::new()
    }
}

impl Triangle {
    const SEQUENCE: [u8; 32] = [
        15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10,
        11, 12, 13, 14, 15,
    ];

    pub const fn new() -> Self {
        Self {
            timer: 0,
            timer_period: 0,
            sequence: 0,
            length: LengthCounter::new(),
            linear: LinearCounter::new(),
        }
    }

    /// Advance the timer; clocked every CPU cycle. The sequencer only steps
    /// while both gates are open.
    pub const fn clock_timer(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
        } else {
            self.timer = self.timer_period;
            if self.length.counter > 0 && self.linear.counter > 0 {
                self.sequence = (self.sequence + 1) & 0x1F;
            }
        }
    }

    pub fn clock_quarter_frame(&mut self) {
        self.linear.clock();
    }

    pub fn clock_half_frame(&mut self) {
        self.length.clock();
    }

    /// $4008 Linear counter control.
    pub const fn write_linear_counter(&mut self, val: u8) {
        self.linear.control = (val & 0x80) == 0x80; // D7
        self.linear.counter_reload = val & 0x7F; // D6..D0
        self.length.write_ctrl(self.linear.control);
    }

    /// $400A Triangle timer low byte.
    pub const fn write_timer_lo(&mut self, val: u8) {
        self.timer_period = (self.timer_period & 0x0700) | val as u16;
    }

    /// $400B Triangle timer high bits; reloads length and flags the linear
    /// counter for reload.
    pub fn write_timer_hi(&mut self, val: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | (u16::from(val & 0x07) << 8);
        self.length.write(val >> 3);
        self.linear.reload = true;
    }

    pub const fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }
}

impl Sample for Triangle {
    //       Linear Counter   Length Counter
    //             |                |
    //             v                v
    // Timer ---> Gate ----------> Gate ---> Sequencer ---> (to mixer)
    fn output(&self) -> f32 {
        if self.timer_period > 0 && self.length.counter > 0 && self.linear.counter > 0 {
            f32::from(Self::SEQUENCE[self.sequence as usize])
        } else {
            0.0
        }
    }
}

impl Reset for Triangle {
    fn reset(&mut self, kind: ResetKind) {
        self.timer = 0;
        self.timer_period = 0;
        self.sequence = 0;
        self.length.reset(kind);
        self.linear.reset(kind);
    }
}

/// APU Linear Counter provides fine duration control for the triangle.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct LinearCounter {
    pub reload: bool,
    pub control: bool,
    pub counter_reload: u8,
    pub counter: u8,
}

impl LinearCounter {
    pub const fn new() -> Self {
        Self {
            reload: false,
            control: false,
            counter_reload: 0,
            counter: 0,
        }
    }
}

impl Clock for LinearCounter {
    fn clock(&mut self) -> usize {
        if self.reload {
            self.counter = self.counter_reload;
        } else if self.counter > 0 {
            self.counter -= 1;
        }
        if !self.control {
            self.reload = false;
        }
        1
    }
}

impl Reset for LinearCounter {
    fn reset(&mut self, _kind: ResetKind) {
        *self = Self::new();
    }
}
