//! Console implementation: the primary entry point for emulation.
//!
//! Owns the whole machine and drives the 1 CPU : 3 PPU : 1 APU-tick loop.

use crate::{
    apu::Apu,
    bus::Bus,
    cart::{self, Cart},
    common::{Reset, ResetKind},
    cpu::{Cpu, CpuTrace, Interrupt},
    input::{JoypadBtn, Player},
    mapper::{Mapped, Mapper},
    mem::RamState,
    ppu::Ppu,
};
use serde::{Deserialize, Serialize};
use std::io::Read;
use thiserror::Error;
use tracing::info;

/// Result returned from [`Console`] methods.
pub type Result<T> = std::result::Result<T, Error>;

/// Callback receiving batches of mono f32 audio samples.
pub type AudioSink = Box<dyn FnMut(&[f32])>;

/// Callback receiving a [`CpuTrace`] ahead of every executed instruction.
pub type TraceHook = Box<dyn FnMut(&CpuTrace)>;

/// Errors that [`Console`] can return.
#[derive(Error, Debug)]
#[must_use]
pub enum Error {
    /// [`Cart`] error when loading a ROM.
    #[error(transparent)]
    Cart(#[from] cart::Error),
    /// Operational error indicating a ROM must be loaded first.
    #[error("no rom is loaded")]
    RomNotLoaded,
    /// Save state (de)serialization error.
    #[error("save state error: {0}")]
    SaveState(String),
}

/// Console configuration settings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[must_use]
pub struct Config {
    /// RAM initialization state.
    pub ram_state: RamState,
    /// Audio output sample rate in Hz.
    pub sample_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ram_state: RamState::AllZeros,
            sample_rate: Apu::DEFAULT_SAMPLE_RATE,
        }
    }
}

/// An NES console. Encapsulates the entire emulation state.
#[must_use]
pub struct Console {
    /// Whether a ROM is loaded and emulation is running.
    running: bool,
    /// NES CPU, which owns the bus and every device on it.
    cpu: Cpu,
    audio_sink: Option<AudioSink>,
    trace_hook: Option<TraceHook>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    /// Create a `Console` with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a `Console` with a configuration.
    pub fn with_config(cfg: Config) -> Self {
        Self {
            running: false,
            cpu: Cpu::new(Bus::new(cfg.ram_state, cfg.sample_rate)),
            audio_sink: None,
            trace_hook: None,
        }
    }

    /// Load a ROM cartridge from iNES data.
    ///
    /// # Errors
    ///
    /// If the ROM data is malformed or uses an unimplemented mapper, then an
    /// error is returned.
    pub fn load_rom<S: ToString, F: Read>(&mut self, name: S, rom: &mut F) -> Result<()> {
        let cart = Cart::from_rom(name, rom, self.cpu.bus.ram_state)?;
        self.load_cart(cart);
        Ok(())
    }

    /// Load an already-constructed [`Cart`].
    pub fn load_cart(&mut self, cart: Cart) {
        info!("loading `{}`", cart.name());
        self.cpu.bus.load_cart(cart);
        self.reset(ResetKind::Hard);
        self.running = true;
    }

    /// Unload the current cartridge, stopping emulation.
    pub fn unload_rom(&mut self) {
        self.cpu.bus.unload_cart();
        self.running = false;
    }

    /// Returns whether the console is currently running.
    #[inline]
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Execute a single CPU instruction and advance the APU one tick and the
    /// PPU three ticks for every cycle it consumed.
    ///
    /// # Errors
    ///
    /// If no ROM is loaded, then an error is returned.
    pub fn step_instr(&mut self) -> Result<u64> {
        if !self.running {
            return Err(Error::RomNotLoaded);
        }

        // Transfer latched interrupts ahead of the instruction
        if self.cpu.bus.ppu.take_nmi() {
            self.cpu.raise(Interrupt::Nmi);
        }
        if self.cpu.bus.apu.irq_pending() || self.cpu.bus.ppu.bus.mapper.irq_pending() {
            self.cpu.raise(Interrupt::Irq);
        }

        if let Some(hook) = &mut self.trace_hook {
            hook(&self.cpu.trace_state());
        }

        let cycles = self.cpu.step();
        self.cpu.bus.tick(cycles);
        Ok(cycles)
    }

    /// Run until the PPU completes the current frame. Returns the CPU cycles
    /// consumed. Accumulated audio is flushed through the registered sink.
    ///
    /// # Errors
    ///
    /// If no ROM is loaded, then an error is returned.
    pub fn step_frame(&mut self) -> Result<u64> {
        let frame = self.frame_number();
        let mut total_cycles = 0;
        while frame == self.frame_number() {
            total_cycles += self.step_instr()?;
        }

        if let Some(sink) = &mut self.audio_sink {
            let samples = &self.cpu.bus.apu.samples;
            if !samples.is_empty() {
                sink(samples);
            }
            self.cpu.bus.apu.samples.clear();
        }

        Ok(total_cycles)
    }

    /// Run for a whole number of scanlines.
    ///
    /// # Errors
    ///
    /// If no ROM is loaded, then an error is returned.
    pub fn step_scanline(&mut self) -> Result<u64> {
        let scanline = self.cpu.bus.ppu.scanline;
        let mut total_cycles = 0;
        while scanline == self.cpu.bus.ppu.scanline {
            total_cycles += self.step_instr()?;
        }
        Ok(total_cycles)
    }

    /// The last completed frame: 256x240 `0x00RRGGBB` pixels, not currently
    /// being written by the PPU.
    #[inline]
    #[must_use]
    pub fn frame_buffer(&self) -> &[u32] {
        self.cpu.bus.ppu.frame_buffer()
    }

    /// The current frame number.
    #[inline]
    #[must_use]
    pub const fn frame_number(&self) -> u32 {
        self.cpu.bus.ppu.frame_number()
    }

    /// The emulated CPU clock rate in Hz, for host frame pacing.
    #[inline]
    #[must_use]
    pub const fn clock_rate(&self) -> f32 {
        crate::common::CPU_CLOCK_RATE
    }

    /// Update a controller button ahead of the next controller-read cycle.
    pub fn set_button(&mut self, player: Player, button: JoypadBtn, pressed: bool) {
        self.cpu
            .bus
            .input
            .joypad_mut(player)
            .set_button(button, pressed);
    }

    /// Register the audio sample sink, replacing any existing one.
    pub fn register_audio_sink(&mut self, sink: impl FnMut(&[f32]) + 'static) {
        self.audio_sink = Some(Box::new(sink));
    }

    /// Register a per-instruction trace hook, replacing any existing one.
    pub fn set_trace_hook(&mut self, hook: impl FnMut(&CpuTrace) + 'static) {
        self.trace_hook = Some(Box::new(hook));
    }

    /// Remove the trace hook.
    pub fn clear_trace_hook(&mut self) {
        self.trace_hook = None;
    }

    /// Audio samples accumulated since the last flush, for hosts that poll
    /// instead of registering a sink.
    #[inline]
    #[must_use]
    pub fn audio_samples(&self) -> &[f32] {
        self.cpu.bus.audio_samples()
    }

    /// Clear accumulated audio samples.
    #[inline]
    pub fn clear_audio_samples(&mut self) {
        self.cpu.bus.clear_audio_samples();
    }

    /// Change the audio output sample rate.
    #[inline]
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.cpu.bus.apu.set_sample_rate(sample_rate);
    }

    /// Battery-backed Save RAM view for host checkpointing. The layout is the
    /// raw PRG-RAM byte sequence.
    #[inline]
    #[must_use]
    pub fn sram(&self) -> &[u8] {
        self.cpu.bus.sram()
    }

    /// Restore battery-backed Save RAM from a host checkpoint.
    #[inline]
    pub fn load_sram(&mut self, sram: &[u8]) {
        self.cpu.bus.load_sram(sram);
    }

    /// Serialize the whole machine state (minus ROM data) into a blob.
    ///
    /// # Errors
    ///
    /// If no ROM is loaded or serialization fails, then an error is returned.
    pub fn save_state(&self) -> Result<Vec<u8>> {
        if !self.running {
            return Err(Error::RomNotLoaded);
        }
        bincode::serialize(&self.cpu).map_err(|err| Error::SaveState(err.to_string()))
    }

    /// Restore machine state from a [`Console::save_state`] blob. ROM data is
    /// re-attached from the currently loaded cartridge.
    ///
    /// # Errors
    ///
    /// If no ROM is loaded or deserialization fails, then an error is
    /// returned.
    pub fn load_state(&mut self, state: &[u8]) -> Result<()> {
        if !self.running {
            return Err(Error::RomNotLoaded);
        }
        let mut cpu =
            bincode::deserialize::<Cpu>(state).map_err(|err| Error::SaveState(err.to_string()))?;
        cpu.bus.input.clear();
        self.cpu.load(cpu);
        Ok(())
    }

    /// The current [`Cpu`] state.
    #[inline]
    pub const fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// A mutable reference to the current [`Cpu`] state.
    #[inline]
    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    /// The current [`Ppu`] state.
    #[inline]
    pub const fn ppu(&self) -> &Ppu {
        &self.cpu.bus.ppu
    }

    /// The current [`Apu`] state.
    #[inline]
    pub const fn apu(&self) -> &Apu {
        &self.cpu.bus.apu
    }

    /// The current [`Bus`] state.
    #[inline]
    pub const fn bus(&self) -> &Bus {
        &self.cpu.bus
    }

    /// A mutable reference to the current [`Bus`] state.
    #[inline]
    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.cpu.bus
    }

    /// The current [`Mapper`] state.
    #[inline]
    pub const fn mapper(&self) -> &Mapper {
        &self.cpu.bus.ppu.bus.mapper
    }
}

impl Reset for Console {
    fn reset(&mut self, kind: ResetKind) {
        self.cpu.reset(kind);
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("running", &self.running)
            .field("cpu", &self.cpu)
            .field("audio_sink", &self.audio_sink.is_some())
            .field("trace_hook", &self.trace_hook.is_some())
            .finish()
    }
}
