//! NES APU (Audio Processing Unit) implementation.
//!
//! See: <https://www.nesdev.org/wiki/APU>

use crate::{
    apu::{
        dmc::Dmc,
        frame_counter::{FrameCounter, FrameType},
        noise::Noise,
        pulse::{Pulse, PulseChannel},
        triangle::Triangle,
    },
    common::{Clock, Reset, ResetKind, Sample},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

pub mod dmc;
pub mod envelope;
pub mod frame_counter;
pub mod length_counter;
pub mod noise;
pub mod pulse;
pub mod sweep;
pub mod triangle;

/// Error when parsing a `Channel` from a `usize`.
#[derive(Error, Debug)]
#[must_use]
#[error("failed to parse `Channel`")]
pub struct ParseChannelError;

/// [`Apu`] channel, used to dispatch shared register writes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum Channel {
    Pulse1,
    Pulse2,
    Triangle,
    Noise,
    Dmc,
}

impl TryFrom<usize> for Channel {
    type Error = ParseChannelError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pulse1),
            1 => Ok(Self::Pulse2),
            2 => Ok(Self::Triangle),
            3 => Ok(Self::Noise),
            4 => Ok(Self::Dmc),
            _ => Err(ParseChannelError),
        }
    }
}

/// NES APU (Audio Processing Unit).
///
/// Advances once per CPU cycle: pulse/noise timers tick every other cycle,
/// the triangle timer every cycle, and two fractional accumulators derive the
/// 240 Hz frame-counter edge and the output sample edge from the CPU clock.
///
/// See: <https://wiki.nesdev.com/w/index.php/APU>
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Apu {
    pub frame_counter: FrameCounter,
    pub pulse1: Pulse,
    pub pulse2: Pulse,
    pub triangle: Triangle,
    pub noise: Noise,
    pub dmc: Dmc,
    pub cycle: u64,
    pub sample_rate: u32,
    on_apu_cycle: bool,
    sample_accumulator: u32,
    /// Mono f32 samples accumulated since the last flush.
    #[serde(skip)]
    pub samples: Vec<f32>,
    #[serde(skip, default = "Apu::pulse_table")]
    pulse_table: [f32; 31],
    #[serde(skip, default = "Apu::tnd_table")]
    tnd_table: [f32; 203],
}

impl Apu {
    /// NTSC CPU clock in Hz, used as the accumulator modulus.
    const CPU_FREQ: u32 = 1_789_773;
    /// Default output sample rate in Hz.
    pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

    pub fn new(sample_rate: u32) -> Self {
        Self {
            frame_counter: FrameCounter::new(),
            pulse1: Pulse::new(PulseChannel::One),
            pulse2: Pulse::new(PulseChannel::Two),
            triangle: Triangle::new(),
            noise: Noise::new(),
            dmc: Dmc::new(),
            cycle: 0,
            sample_rate,
            on_apu_cycle: false,
            sample_accumulator: 0,
            samples: Vec::with_capacity((sample_rate / 60) as usize + 1),
            pulse_table: Self::pulse_table(),
            tnd_table: Self::tnd_table(),
        }
    }

    // https://www.nesdev.org/wiki/APU_Mixer
    //
    // pulse_table[n] = 95.52 / (8128 / n + 100)
    fn pulse_table() -> [f32; 31] {
        let mut table = [0.0; 31];
        for (n, val) in table.iter_mut().enumerate().skip(1) {
            *val = 95.52 / (8128.0 / n as f32 + 100.0);
        }
        table
    }

    // tnd_table[n] = 163.67 / (24329 / n + 100)
    fn tnd_table() -> [f32; 203] {
        let mut table = [0.0; 203];
        for (n, val) in table.iter_mut().enumerate().skip(1) {
            *val = 163.67 / (24_329.0 / n as f32 + 100.0);
        }
        table
    }

    /// Change the output sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.sample_accumulator = 0;
    }

    /// Whether the frame counter is asserting its IRQ line.
    #[inline]
    #[must_use]
    pub const fn irq_pending(&self) -> bool {
        self.frame_counter.irq_pending
    }

    /// Mix the current channel outputs through the non-linear lookup tables.
    #[must_use]
    pub fn mix(&self) -> f32 {
        let pulse_idx = (self.pulse1.output() + self.pulse2.output()) as usize;
        let tnd_idx =
            (3.0 * self.triangle.output() + 2.0 * self.noise.output() + self.dmc.output()) as usize;
        self.pulse_table[pulse_idx] + self.tnd_table[tnd_idx]
    }

    fn clock_quarter_frame(&mut self) {
        self.pulse1.clock_quarter_frame();
        self.pulse2.clock_quarter_frame();
        self.triangle.clock_quarter_frame();
        self.noise.clock_quarter_frame();
    }

    fn clock_half_frame(&mut self) {
        self.pulse1.clock_half_frame();
        self.pulse2.clock_half_frame();
        self.triangle.clock_half_frame();
        self.noise.clock_half_frame();
    }

    fn clock_frame_type(&mut self, ty: FrameType) {
        match ty {
            FrameType::Quarter => self.clock_quarter_frame(),
            FrameType::Half => {
                // Half-frame steps clock the quarter-frame units too
                self.clock_quarter_frame();
                self.clock_half_frame();
            }
            FrameType::None => (),
        }
    }

    // Register file ($4000-$4017)

    /// $4000 Pulse1, $4004 Pulse2, and $400C Noise control.
    pub fn write_ctrl(&mut self, channel: Channel, val: u8) {
        trace!("APU ctrl write {channel:?}: ${val:02X} - CYC:{}", self.cycle);
        match channel {
            Channel::Pulse1 => self.pulse1.write_ctrl(val),
            Channel::Pulse2 => self.pulse2.write_ctrl(val),
            Channel::Noise => self.noise.write_ctrl(val),
            _ => (),
        }
    }

    /// $4001 Pulse1 and $4005 Pulse2 sweep.
    pub fn write_sweep(&mut self, channel: Channel, val: u8) {
        match channel {
            Channel::Pulse1 => self.pulse1.write_sweep(val),
            Channel::Pulse2 => self.pulse2.write_sweep(val),
            _ => (),
        }
    }

    /// $4002 Pulse1, $4006 Pulse2, $400A Triangle, and $400E Noise timer low.
    pub fn write_timer_lo(&mut self, channel: Channel, val: u8) {
        match channel {
            Channel::Pulse1 => self.pulse1.write_timer_lo(val),
            Channel::Pulse2 => self.pulse2.write_timer_lo(val),
            Channel::Triangle => self.triangle.write_timer_lo(val),
            Channel::Noise => self.noise.write_timer(val),
            Channel::Dmc => self.dmc.write_freq(val),
        }
    }

    /// $4003 Pulse1, $4007 Pulse2, and $400B Triangle timer high.
    pub fn write_timer_hi(&mut self, channel: Channel, val: u8) {
        match channel {
            Channel::Pulse1 => self.pulse1.write_timer_hi(val),
            Channel::Pulse2 => self.pulse2.write_timer_hi(val),
            Channel::Triangle => self.triangle.write_timer_hi(val),
            _ => (),
        }
    }

    /// $4008 Triangle linear counter.
    pub fn write_linear_counter(&mut self, val: u8) {
        self.triangle.write_linear_counter(val);
    }

    /// $400F Noise and $4013 DMC length.
    pub fn write_length(&mut self, channel: Channel, val: u8) {
        match channel {
            Channel::Noise => self.noise.write_length(val),
            Channel::Dmc => self.dmc.write_length(val),
            _ => (),
        }
    }

    /// $4011 DMC direct output level.
    pub fn write_dmc_output(&mut self, val: u8) {
        self.dmc.write_output(val);
    }

    /// $4012 DMC sample address.
    pub fn write_dmc_addr(&mut self, val: u8) {
        self.dmc.write_addr(val);
    }

    /// $4015 APU status (read). Reading clears the frame IRQ flag.
    ///
    /// if-d nt21: DMC IRQ, frame IRQ, length counter statuses
    pub fn read_status(&mut self) -> u8 {
        let val = self.peek_status();
        self.frame_counter.irq_pending = false;
        val
    }

    /// $4015 APU status without side effects.
    #[must_use]
    pub fn peek_status(&self) -> u8 {
        let mut status = 0x00;
        if self.pulse1.length.counter > 0 {
            status |= 0x01;
        }
        if self.pulse2.length.counter > 0 {
            status |= 0x02;
        }
        if self.triangle.length.counter > 0 {
            status |= 0x04;
        }
        if self.noise.length.counter > 0 {
            status |= 0x08;
        }
        if self.frame_counter.irq_pending {
            status |= 0x40;
        }
        status
    }

    /// $4015 channel enable (write).
    ///
    /// ---d nt21: length counter enables for DMC, noise, triangle, pulse 2/1
    pub fn write_status(&mut self, val: u8) {
        trace!("APU $4015 write: ${val:02X} - CYC:{}", self.cycle);
        self.pulse1.set_enabled(val & 0x01 == 0x01);
        self.pulse2.set_enabled(val & 0x02 == 0x02);
        self.triangle.set_enabled(val & 0x04 == 0x04);
        self.noise.set_enabled(val & 0x08 == 0x08);
        self.dmc.set_enabled(val & 0x10 == 0x10);
    }

    /// $4017 APU frame counter mode.
    pub fn write_frame_counter(&mut self, val: u8) {
        trace!("APU $4017 write: ${val:02X} - CYC:{}", self.cycle);
        let immediate = self.frame_counter.write(val);
        // Bit 7 set clocks the quarter and half frame units immediately
        self.clock_frame_type(immediate);
    }
}

impl Clock for Apu {
    fn clock(&mut self) -> usize {
        // Pulse, noise, and DMC timers run at half the CPU clock; the
        // triangle timer runs at the full CPU clock
        if self.on_apu_cycle {
            self.pulse1.clock_timer();
            self.pulse2.clock_timer();
            self.noise.clock_timer();
        }
        self.triangle.clock_timer();
        self.on_apu_cycle = !self.on_apu_cycle;

        let ty = self.frame_counter.clock();
        self.clock_frame_type(ty);

        // Sample-rate edge: accumulate the fractional divisor of the CPU
        // clock and emit one mixed sample per positive edge
        self.sample_accumulator += self.sample_rate;
        if self.sample_accumulator >= Self::CPU_FREQ {
            self.sample_accumulator -= Self::CPU_FREQ;
            let sample = self.mix();
            self.samples.push(sample);
        }

        self.cycle = self.cycle.wrapping_add(1);
        1
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SAMPLE_RATE)
    }
}

impl Reset for Apu {
    fn reset(&mut self, kind: ResetKind) {
        self.cycle = 0;
        self.on_apu_cycle = false;
        self.sample_accumulator = 0;
        self.samples.clear();
        self.frame_counter.reset(kind);
        self.pulse1.reset(kind);
        self.pulse2.reset(kind);
        self.triangle.reset(kind);
        self.noise.reset(kind);
        self.dmc.reset(kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixer_index_zero_is_silent() {
        let apu = Apu::default();
        assert_eq!(apu.mix(), 0.0);
    }

    #[test]
    fn mixer_tables_match_reference_formula() {
        let apu = Apu::default();
        let pulse_15 = 95.52 / (8128.0 / 15.0 + 100.0);
        let tnd_100 = 163.67 / (24_329.0 / 100.0 + 100.0);
        assert!((apu.pulse_table[15] - pulse_15).abs() < 1e-6);
        assert!((apu.tnd_table[100] - tnd_100).abs() < 1e-6);
    }

    #[test]
    fn pulse_silenced_for_out_of_range_periods() {
        let mut apu = Apu::default();
        apu.write_status(0x01); // enable pulse 1
        apu.write_ctrl(Channel::Pulse1, 0b1011_1111); // 50% duty, constant max volume
        apu.write_timer_lo(Channel::Pulse1, 0x07); // period = 7 < 8
        apu.write_timer_hi(Channel::Pulse1, 0x08); // load length counter
        for _ in 0..64 {
            apu.pulse1.clock_timer();
            assert_eq!(apu.pulse1.output(), 0.0, "period < 8 is silent");
        }

        // Periods above $7FF are only reachable through the sweep unit
        apu.pulse1.timer_period = 0x800;
        for _ in 0..64 {
            apu.pulse1.clock_timer();
            assert_eq!(apu.pulse1.output(), 0.0, "period > $7FF is silent");
        }
    }

    #[test]
    fn sweep_adds_shifted_period() {
        let mut apu = Apu::default();
        apu.write_status(0x01);
        // period = $200
        apu.write_timer_lo(Channel::Pulse1, 0x00);
        apu.write_timer_hi(Channel::Pulse1, 0x02);
        // enabled, period = 1, negate = 0, shift = 1; write sets reload
        apu.write_sweep(Channel::Pulse1, 0x91);
        apu.pulse1.clock_half_frame();
        assert_eq!(
            apu.pulse1.timer_period, 0x300,
            "period becomes $200 + ($200 >> 1)"
        );
    }

    #[test]
    fn sweep_negate_differs_per_channel() {
        let mut apu = Apu::default();
        for (channel, expected) in [(Channel::Pulse1, 0x0FF), (Channel::Pulse2, 0x100)] {
            apu.write_timer_lo(channel, 0x00);
            apu.write_timer_hi(channel, 0x02);
            apu.write_sweep(channel, 0x99); // negate, shift = 1
            match channel {
                Channel::Pulse1 => {
                    apu.pulse1.clock_half_frame();
                    assert_eq!(apu.pulse1.timer_period, expected, "one's complement");
                }
                _ => {
                    apu.pulse2.clock_half_frame();
                    assert_eq!(apu.pulse2.timer_period, expected, "two's complement");
                }
            }
        }
    }

    #[test]
    fn noise_lfsr_advances() {
        let mut noise = Noise::new();
        noise.write_timer(0x00); // shortest period, long mode
        let initial = noise.shift;
        for _ in 0..32 {
            noise.clock_timer();
        }
        assert_ne!(noise.shift, initial);
        assert!(noise.shift <= 0x7FFF, "LFSR stays within 15 bits");
    }

    #[test]
    fn status_reports_length_counters() {
        let mut apu = Apu::default();
        apu.write_status(0x0F);
        apu.write_timer_hi(Channel::Pulse1, 0x08);
        apu.write_length(Channel::Noise, 0x08);
        let status = apu.read_status();
        assert_eq!(status & 0x01, 0x01, "pulse1 length active");
        assert_eq!(status & 0x08, 0x08, "noise length active");
        assert_eq!(status & 0x02, 0x00, "pulse2 length empty");
    }

    #[test]
    fn samples_produced_at_sample_rate() {
        let mut apu = Apu::new(48_000);
        for _ in 0..Apu::CPU_FREQ {
            apu.clock();
        }
        assert_eq!(apu.samples.len(), 48_000, "one second yields sample_rate samples");
    }
}
