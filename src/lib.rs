#![doc = include_str!("../README.md")]

pub mod apu;
pub mod bus;
pub mod cart;
pub mod common;
pub mod console;
pub mod cpu;
pub mod input;
pub mod mapper;
pub mod mem;
pub mod ppu;

pub mod prelude {
    //! Re-exports of the common types used for basic emulation.

    pub use crate::{
        apu::{Apu, Channel},
        cart::Cart,
        common::{Clock, Reset, ResetKind, Sample},
        console::{Config, Console},
        cpu::Cpu,
        input::{JoypadBtn, Player},
        mapper::{Mapped, MappedRead, MappedWrite, Mapper, MemMap},
        mem::RamState,
        ppu::{Mirroring, Ppu},
    };
}
