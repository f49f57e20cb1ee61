//! APU Pulse Channel implementation.
//!
//! See: <https://www.nesdev.org/wiki/APU_Pulse>

use crate::{
    apu::{envelope::Envelope, length_counter::LengthCounter, sweep::Sweep},
    common::{Clock, Reset, ResetKind, Sample},
};
use serde::{Deserialize, Serialize};

/// Pulse channel selection. The two channels negate their sweep differently.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum PulseChannel {
    One,
    Two,
}

/// APU Pulse Channel provides square wave generation.
///
/// See: <https://www.nesdev.org/wiki/APU_Pulse>
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Pulse {
    pub channel: PulseChannel,
    pub timer: u16,
    pub timer_period: u16, // 11 bits
    pub duty: u8,          // Select row in DUTY_TABLE
    pub duty_offset: u8,   // Select column in DUTY_TABLE
    pub length: LengthCounter,
    pub envelope: Envelope,
    pub sweep: Sweep,
}

impl Pulse {
    const DUTY_TABLE: [[u8; 8]; 4] = [
        [0, 1, 0, 0, 0, 0, 0, 0], // 12.5%
        [0, 1, 1, 0, 0, 0, 0, 0], // 25%
        [0, 1, 1, 1, 1, 0, 0, 0], // 50%
        [1, 0, 0, 1, 1, 1, 1, 1], // 25% negated
    ];

    pub const fn new(channel: PulseChannel) -> Self {
        Self {
            channel,
            timer: 0,
            timer_period: 0,
            duty: 0,
            duty_offset: 0,
            length: LengthCounter::new(),
            envelope: Envelope::new(),
            sweep: Sweep::new(),
        }
    }

    /// Silenced for out-of-range periods regardless of the duty phase.
    #[inline]
    #[must_use]
    pub const fn is_muted(&self) -> bool {
        self.timer_period < 8 || self.timer_period > 0x7FF
    }

    /// Advance the 11-bit timer; clocked every other CPU cycle.
    pub const fn clock_timer(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
        } else {
            self.timer = self.timer_period;
            self.duty_offset = (self.duty_offset + 1) & 0x07;
        }
    }

    pub fn clock_quarter_frame(&mut self) {
        self.envelope.clock();
    }

    pub fn clock_half_frame(&mut self) {
        self.length.clock();
        self.clock_sweep();
    }

    fn clock_sweep(&mut self) {
        if self.sweep.step() {
            let delta = self.timer_period >> self.sweep.shift;
            if self.sweep.negate {
                // Pulse 1 adds the one's complement (-delta - 1), pulse 2 the
                // two's complement (-delta)
                self.timer_period = self.timer_period.wrapping_sub(delta);
                if matches!(self.channel, PulseChannel::One) {
                    self.timer_period = self.timer_period.wrapping_sub(1);
                }
            } else {
                self.timer_period = self.timer_period.wrapping_add(delta);
            }
        }
    }

    /// $4000/$4004 Pulse control.
    pub fn write_ctrl(&mut self, val: u8) {
        self.duty = (val & 0xC0) >> 6;
        self.length.write_ctrl((val & 0x20) == 0x20); // D5
        self.envelope.write_ctrl(val);
    }

    /// $4001/$4005 Pulse sweep.
    pub fn write_sweep(&mut self, val: u8) {
        self.sweep.write(val);
    }

    /// $4002/$4006 Pulse timer low byte.
    pub const fn write_timer_lo(&mut self, val: u8) {
        self.timer_period = (self.timer_period & 0x0700) | val as u16;
    }

    /// $4003/$4007 Pulse timer high bits; reloads length and restarts the
    /// duty sequence.
    pub fn write_timer_hi(&mut self, val: u8) {
        self.timer_period = (self.timer_period & 0x00FF) | (u16::from(val & 0x07) << 8);
        self.length.write(val >> 3);
        self.envelope.restart();
        self.duty_offset = 0;
    }

    pub const fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }
}

impl Sample for Pulse {
    //                  Sweep -----> Timer
    //                    |            |
    //                    v            v
    //                   Gate      Sequencer   Length Counter
    //                                 |             |
    //                                 v             v
    // Envelope -------------------> Gate -------> Gate --->(to mixer)
    fn output(&self) -> f32 {
        let high = Self::DUTY_TABLE[self.duty as usize][self.duty_offset as usize] == 1;
        if self.is_muted() || self.length.counter == 0 || !high {
            0.0
        } else {
            f32::from(self.envelope.volume())
        }
    }
}

impl Reset for Pulse {
    fn reset(&mut self, kind: ResetKind) {
        self.timer = 0;
        self.timer_period = 0;
        self.duty = 0;
        self.duty_offset = 0;
        self.length.reset(kind);
        self.envelope.reset(kind);
        self.sweep.reset(kind);
    }
}
