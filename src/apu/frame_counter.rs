//! APU Frame Counter implementation.
//!
//! See: <https://www.nesdev.org/wiki/APU_Frame_Counter>

use crate::common::{Reset, ResetKind};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Which channel units a frame counter step clocks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum FrameType {
    None,
    /// Envelopes and the triangle linear counter.
    Quarter,
    /// Length counters and sweeps (quarter-frame units also clock).
    Half,
}

/// The APU frame counter: a fractional accumulator divides the CPU clock down
/// to the 240 Hz sequencer, which steps a 4- or 5-step sequence of
/// quarter/half frame clocks.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct FrameCounter {
    pub five_step: bool,
    pub irq_enabled: bool,
    pub irq_pending: bool,
    pub step: u8, // 1-based step in the current sequence
    accumulator: u32,
}

impl FrameCounter {
    /// NTSC CPU clock in Hz, used as the accumulator modulus.
    const CPU_FREQ: u32 = 1_789_773;
    /// The sequencer rate in Hz.
    const FRAME_COUNTER_FREQ: u32 = 240;

    pub const fn new() -> Self {
        Self {
            five_step: false,
            irq_enabled: true,
            irq_pending: false,
            step: 1,
            accumulator: 0,
        }
    }

    /// Advance one CPU cycle. The positive edges of the 240 Hz clock don't
    /// line up with CPU ticks, so the fractional remainder carries over.
    pub fn clock(&mut self) -> FrameType {
        self.accumulator += Self::FRAME_COUNTER_FREQ;
        if self.accumulator >= Self::CPU_FREQ {
            self.accumulator -= Self::CPU_FREQ;
            self.step_sequencer()
        } else {
            FrameType::None
        }
    }

    fn step_sequencer(&mut self) -> FrameType {
        let step = self.step;
        let last_step = if self.five_step { 5 } else { 4 };
        self.step = if step >= last_step { 1 } else { step + 1 };

        // Mode 0 (4-step):  1:quarter  2:half  3:quarter  4:half + IRQ
        // Mode 1 (5-step):  1:quarter  2:half  3:quarter  4:half  5:none
        match step {
            1 | 3 => FrameType::Quarter,
            2 => FrameType::Half,
            4 => {
                if !self.five_step && self.irq_enabled {
                    trace!("APU frame IRQ");
                    self.irq_pending = true;
                }
                FrameType::Half
            }
            _ => FrameType::None,
        }
    }

    /// $4017 write. Returns `FrameType::Half` when bit 7 requests an
    /// immediate quarter+half clock.
    pub fn write(&mut self, val: u8) -> FrameType {
        self.five_step = (val & 0x80) == 0x80;
        self.irq_enabled = (val & 0x40) == 0x00;
        if !self.irq_enabled {
            // Setting the inhibit flag clears the frame IRQ flag
            self.irq_pending = false;
        }
        self.step = 1;
        self.accumulator = 0;
        if self.five_step {
            FrameType::Half
        } else {
            FrameType::None
        }
    }
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reset for FrameCounter {
    fn reset(&mut self, _kind: ResetKind) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_step_sequence_produces_half_frames_and_irq() {
        let mut fc = FrameCounter::new();
        let mut quarters = 0;
        let mut halves = 0;
        // One second of CPU cycles = 240 sequencer steps = 60 full sequences
        for _ in 0..FrameCounter::CPU_FREQ {
            match fc.clock() {
                FrameType::Quarter => quarters += 1,
                FrameType::Half => halves += 1,
                FrameType::None => (),
            }
        }
        assert_eq!(quarters + halves, 240);
        assert_eq!(halves, 120);
        assert!(fc.irq_pending, "4-step mode raises the frame IRQ");
    }

    #[test]
    fn five_step_mode_never_raises_irq() {
        let mut fc = FrameCounter::new();
        let immediate = fc.write(0x80);
        assert_eq!(immediate, FrameType::Half, "bit 7 clocks immediately");
        for _ in 0..FrameCounter::CPU_FREQ {
            fc.clock();
        }
        assert!(!fc.irq_pending);
    }

    #[test]
    fn irq_inhibit_clears_pending() {
        let mut fc = FrameCounter::new();
        fc.irq_pending = true;
        fc.write(0x40);
        assert!(!fc.irq_pending);
        assert!(!fc.irq_enabled);
    }
}
