//! Common traits shared by every clocked unit in the console.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

/// Type of reset for types that behave differently on reset vs. power cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum ResetKind {
    Soft,
    Hard,
}

/// Trait for types that can be reset.
#[enum_dispatch(Mapper)]
pub trait Reset {
    fn reset(&mut self, _kind: ResetKind) {}
}

/// Trait for types that can clock a single cycle.
#[enum_dispatch(Mapper)]
pub trait Clock {
    fn clock(&mut self) -> usize {
        0
    }
}

/// Trait for types that produce an `f32` audio sample.
pub trait Sample {
    fn output(&self) -> f32;
}

/// NTSC CPU clock rate in Hz (21.477272 MHz master clock / 12).
pub const CPU_CLOCK_RATE: f32 = 21_477_272.0 / 12.0;
