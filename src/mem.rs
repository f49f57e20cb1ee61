//! Memory and bank-switching implementations.

use crate::common::{Reset, ResetKind};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    num::NonZeroUsize,
    ops::{Deref, DerefMut},
    str::FromStr,
};

/// ROM or RAM bytes, with a Debug implementation that avoids printing the
/// entire contents.
#[derive(Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct Memory(Vec<u8>);

impl Memory {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a `Memory` instance of a given size, zeroed out.
    pub fn with_size(size: usize) -> Self {
        Self(vec![0x00; size])
    }

    /// Create a RAM `Memory` instance of a given size, filled per [`RamState`].
    pub fn ram(state: RamState, size: usize) -> Self {
        let mut ram = Self::with_size(size);
        ram.fill_ram(state);
        ram
    }

    /// Fill contents based on [`RamState`].
    pub fn fill_ram(&mut self, state: RamState) {
        match state {
            RamState::AllZeros => self.0.fill(0x00),
            RamState::AllOnes => self.0.fill(0xFF),
            RamState::Random => {
                let mut rng = rand::thread_rng();
                for val in &mut self.0 {
                    *val = rng.gen();
                }
            }
        }
    }
}

impl From<Vec<u8>> for Memory {
    fn from(val: Vec<u8>) -> Self {
        Self(val)
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory").field("len", &self.0.len()).finish()
    }
}

impl Deref for Memory {
    type Target = Vec<u8>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Memory {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// RAM contents on power-up.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum RamState {
    #[default]
    AllZeros,
    AllOnes,
    Random,
}

impl RamState {
    pub const fn as_slice() -> &'static [Self] {
        &[Self::AllZeros, Self::AllOnes, Self::Random]
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AllZeros => "all-zeros",
            Self::AllOnes => "all-ones",
            Self::Random => "random",
        }
    }
}

impl AsRef<str> for RamState {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for RamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AllZeros => "All $00",
            Self::AllOnes => "All $FF",
            Self::Random => "Random",
        };
        write!(f, "{s}")
    }
}

impl FromStr for RamState {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all-zeros" => Ok(Self::AllZeros),
            "all-ones" => Ok(Self::AllOnes),
            "random" => Ok(Self::Random),
            _ => Err("invalid RamState value. valid options: `all-zeros`, `all-ones`, or `random`"),
        }
    }
}

/// Errors constructing [`Banks`].
#[derive(thiserror::Error, Debug)]
#[must_use]
pub enum Error {
    #[error("bank `{field}` must be non-zero.{context}")]
    Zero {
        field: &'static str,
        context: String,
    },
}

/// A set of switchable memory bank windows over a backing byte region.
///
/// Addresses inside `start..=end` are split into fixed-size windows; each
/// window holds a page offset into the backing region which `translate` folds
/// the address through.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct Banks {
    start: usize,
    end: NonZeroUsize,
    size: usize,
    window: NonZeroUsize,
    shift: usize,
    mask: usize,
    banks: Vec<usize>,
    page_count: usize,
}

impl Banks {
    pub fn new(
        start: usize,
        end: impl TryInto<NonZeroUsize>,
        capacity: usize,
        window: impl TryInto<NonZeroUsize>,
    ) -> Result<Self, Error> {
        let end = end.try_into().map_err(|_| Error::Zero {
            field: "end",
            context: format!(" bank start: ${start:04X}"),
        })?;
        let window = window.try_into().map_err(|_| Error::Zero {
            field: "window",
            context: format!(" bank range: ${start:04X}..=${end:04X} (capacity: ${capacity:04X})"),
        })?;
        let mut size = end.get() - start;
        if size > capacity {
            size = capacity;
        }
        let bank_count = (size + 1) / window;

        let mut banks = vec![0; bank_count];
        for (i, bank) in banks.iter_mut().enumerate() {
            *bank = (i * window.get()) % capacity.max(1);
        }
        let page_count = capacity / window.get();

        Ok(Self {
            start,
            end,
            size,
            window,
            shift: window.trailing_zeros() as usize,
            mask: page_count.saturating_sub(1),
            banks,
            page_count,
        })
    }

    /// Point the given window at a page, wrapping modulo the page count.
    pub fn set(&mut self, mut bank: usize, page: usize) {
        if self.banks.is_empty() {
            return;
        }
        if bank >= self.banks.len() {
            bank %= self.banks.len();
        }
        self.banks[bank] = (page & self.mask) << self.shift;
    }

    /// Point a run of windows at consecutive pages starting from `page`.
    pub fn set_range(&mut self, start: usize, end: usize, page: usize) {
        if self.banks.is_empty() {
            return;
        }
        let mut new_addr = (page & self.mask) << self.shift;
        for mut bank in start..=end {
            if bank >= self.banks.len() {
                bank %= self.banks.len();
            }
            self.banks[bank] = new_addr;
            new_addr += self.window.get();
        }
    }

    /// Index of the last page in the backing region.
    #[must_use]
    pub const fn last(&self) -> usize {
        self.page_count.saturating_sub(1)
    }

    /// The window an address falls in.
    #[must_use]
    pub const fn get(&self, addr: u16) -> usize {
        (addr as usize & self.size) >> self.shift
    }

    /// Translate a bus address into an offset in the backing region. A
    /// window past the end of the bank table (a cart smaller than the
    /// addressable range) resolves to the last bank, mirroring the data.
    #[must_use]
    pub fn translate(&self, addr: u16) -> usize {
        let slot = self.get(addr).min(self.banks.len().saturating_sub(1));
        let page_offset = self.banks.get(slot).copied().unwrap_or(0);
        page_offset | (addr as usize) & (self.window.get() - 1)
    }

    /// The page a window currently points at.
    #[must_use]
    pub fn page(&self, bank: usize) -> usize {
        self.banks[bank] >> self.shift
    }

    #[must_use]
    pub const fn page_count(&self) -> usize {
        self.page_count
    }
}

impl Reset for Memory {
    fn reset(&mut self, _kind: ResetKind) {}
}

impl std::fmt::Debug for Banks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Banks")
            .field("start", &format_args!("${:04X}", self.start))
            .field("end", &format_args!("${:04X}", self.end))
            .field("window", &format_args!("${:04X}", self.window))
            .field("banks", &self.banks)
            .field("page_count", &self.page_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_bank() {
        let banks = Banks::new(0x8000, 0xFFFF, 128 * 1024, 0x4000).unwrap();
        assert_eq!(banks.get(0x8000), 0);
        assert_eq!(banks.get(0xBFFF), 0);
        assert_eq!(banks.get(0xC000), 1);
        assert_eq!(banks.get(0xFFFF), 1);
    }

    #[test]
    fn bank_translate() {
        let mut banks = Banks::new(0x8000, 0xFFFF, 128 * 1024, 0x2000).unwrap();

        assert_eq!(banks.last(), 15, "page count");

        assert_eq!(banks.translate(0x8000), 0x0000);
        banks.set(0, 1);
        assert_eq!(banks.translate(0x8000), 0x2000);
        banks.set(0, 2);
        assert_eq!(banks.translate(0x8000), 0x4000);
        banks.set(0, 0);
        assert_eq!(banks.translate(0x8000), 0x0000);
        banks.set(0, banks.last());
        assert_eq!(banks.translate(0x8000), 0x1E000);
    }

    #[test]
    fn bank_set_wraps_page() {
        let mut banks = Banks::new(0x8000, 0xFFFF, 32 * 1024, 0x4000).unwrap();
        // Page beyond capacity wraps modulo the page count
        banks.set(0, 2);
        assert_eq!(banks.translate(0x8000), 0x0000);
        banks.set(0, 3);
        assert_eq!(banks.translate(0x8000), 0x4000);
    }

    #[test]
    fn ram_state_fill() {
        let mut mem = Memory::with_size(16);
        mem.fill_ram(RamState::AllOnes);
        assert!(mem.iter().all(|&b| b == 0xFF));
        mem.fill_ram(RamState::AllZeros);
        assert!(mem.iter().all(|&b| b == 0x00));
    }
}
