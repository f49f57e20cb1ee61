//! Memory mappers for cartridges.
//!
//! <http://wiki.nesdev.com/w/index.php/Mapper>

use crate::{
    common::{Clock, Reset, ResetKind},
    ppu::Mirroring,
};
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

pub use m000_nrom::Nrom;
pub use m001_mmc1::Mmc1;
pub use m002_uxrom::Uxrom;
pub use m004_mmc3::Mmc3;

pub mod m000_nrom;
pub mod m001_mmc1;
pub mod m002_uxrom;
pub mod m004_mmc3;

/// Polymorphic cartridge mapper. One variant per supported board.
#[enum_dispatch]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(clippy::large_enum_variant)]
#[must_use]
pub enum Mapper {
    Empty,
    Nrom,
    Mmc1,
    Uxrom,
    Mmc3,
}

impl Mapper {
    pub fn none() -> Self {
        Empty.into()
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::none()
    }
}

/// Where a mapped read resolves to. The cartridge byte arrays live on the
/// buses, so mappers translate addresses instead of serving bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum MappedRead {
    /// Not mapped by the cartridge. The bus decides (nametable RAM, open bus).
    Bus,
    Chr(usize),
    PrgRom(usize),
    PrgRam(usize),
    /// The mapper itself produced the value.
    Data(u8),
}

/// Where a mapped write resolves to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum MappedWrite {
    /// Not mapped by the cartridge (or consumed by a mapper register).
    Bus,
    /// Dropped: the target window is read-only.
    None,
    ChrRam(usize, u8),
    PrgRam(usize, u8),
}

/// Address translation. `map_read` may mutate mapper state (bank registers
/// with read side effects); `map_peek` never does.
#[enum_dispatch(Mapper)]
pub trait MemMap {
    fn map_read(&mut self, addr: u16) -> MappedRead {
        self.map_peek(addr)
    }

    fn map_peek(&self, _addr: u16) -> MappedRead {
        MappedRead::Bus
    }

    fn map_write(&mut self, _addr: u16, _val: u8) -> MappedWrite {
        MappedWrite::Bus
    }
}

/// Mapper-controlled behavior beyond plain address translation: runtime
/// mirroring and the scanline IRQ counter.
#[enum_dispatch(Mapper)]
pub trait Mapped {
    fn mirroring(&self) -> Mirroring {
        Mirroring::Horizontal
    }

    fn set_mirroring(&mut self, _mirroring: Mirroring) {}

    /// Called by the PPU once per visible scanline while rendering is
    /// enabled. MMC3-style counters hang off of this.
    fn on_scanline(&mut self) {}

    /// Whether the mapper is asserting its IRQ line.
    fn irq_pending(&self) -> bool {
        false
    }
}

/// Placeholder mapper used before a cartridge is loaded.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Empty;

impl MemMap for Empty {}
impl Mapped for Empty {}
impl Clock for Empty {}
impl Reset for Empty {}
