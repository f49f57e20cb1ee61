//! NES cartridge implementation.

use crate::{
    mapper::{Mapper, Mmc1, Mmc3, Nrom, Uxrom},
    mem::{Memory, RamState},
    ppu::Mirroring,
};
use serde::{Deserialize, Serialize};
use std::io::Read;
use thiserror::Error;
use tracing::{debug, info};

pub const PRG_ROM_BANK_SIZE: usize = 0x4000;
pub const CHR_BANK_SIZE: usize = 0x2000;
pub const PRG_RAM_SIZE: usize = 0x2000;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors constructing a [`Cart`].
#[derive(Error, Debug)]
#[must_use]
pub enum Error {
    /// Malformed header or ROM data that does not match the header.
    #[error("bad rom (found ${value:02X} at byte {byte}): {message}")]
    BadRom { byte: u8, value: u8, message: String },
    /// PRG/CHR sizes not aligned to their required bank multiples.
    #[error("unaligned rom: {0}")]
    UnalignedRom(String),
    /// Recognized header with an unimplemented mapper id.
    #[error("unsupported mapper `{0}`")]
    UnsupportedMapper(u16),
    #[error("{context}: {source:?}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// An NES cartridge: PRG-ROM, CHR-ROM or CHR-RAM, optional battery-backed
/// PRG-RAM, and the mapper that decodes addresses into them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Cart {
    pub(crate) name: String,
    pub(crate) ram_state: RamState,
    pub(crate) mirroring: Mirroring,
    pub(crate) battery_backed: bool,
    pub(crate) mapper: Mapper,
    pub(crate) mapper_num: u16,
    #[serde(skip)]
    pub(crate) prg_rom: Memory,
    #[serde(skip)]
    pub(crate) chr_rom: Memory,
    pub(crate) chr_ram: Memory,
    pub(crate) prg_ram: Memory,
}

impl Default for Cart {
    fn default() -> Self {
        Self::empty()
    }
}

impl Cart {
    /// An empty NROM cart, mostly useful for tests.
    pub fn empty() -> Self {
        let mut empty = Self {
            name: "Empty Cart".to_string(),
            ram_state: RamState::default(),
            mirroring: Mirroring::default(),
            battery_backed: false,
            mapper: Mapper::none(),
            mapper_num: 0,
            prg_rom: Memory::with_size(PRG_ROM_BANK_SIZE),
            chr_rom: Memory::new(),
            chr_ram: Memory::with_size(CHR_BANK_SIZE),
            prg_ram: Memory::new(),
        };
        empty.mapper = Nrom::load(&mut empty).expect("valid empty cart");
        empty
    }

    /// Load a `Cart` from iNES/NES 2.0 ROM data.
    ///
    /// # Errors
    ///
    /// If the header is invalid, the data does not match the header, or the
    /// mapper is unimplemented, then an error is returned.
    pub fn from_rom<S, F>(name: S, rom_data: &mut F, ram_state: RamState) -> Result<Self>
    where
        S: ToString,
        F: Read,
    {
        let name = name.to_string();
        let header = NesHeader::load(rom_data)?;

        let prg_rom_len = (header.prg_rom_banks as usize) * PRG_ROM_BANK_SIZE;
        let mut prg_rom = vec![0x00; prg_rom_len];
        rom_data.read_exact(&mut prg_rom).map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::BadRom {
                    byte: 4,
                    value: header.prg_rom_banks as u8,
                    message: format!(
                        "expected `{}` prg-rom banks ({prg_rom_len} total bytes)",
                        header.prg_rom_banks
                    ),
                }
            } else {
                Error::io(err, "failed to read prg-rom")
            }
        })?;

        let mut chr_rom = vec![0x00; (header.chr_rom_banks as usize) * CHR_BANK_SIZE];
        if header.chr_rom_banks > 0 {
            rom_data.read_exact(&mut chr_rom).map_err(|err| {
                if err.kind() == std::io::ErrorKind::UnexpectedEof {
                    Error::BadRom {
                        byte: 5,
                        value: header.chr_rom_banks as u8,
                        message: format!(
                            "expected `{}` chr-rom banks ({} total bytes)",
                            header.chr_rom_banks,
                            chr_rom.len(),
                        ),
                    }
                } else {
                    Error::io(err, "failed to read chr-rom")
                }
            })?;
        }

        let mirroring = header.mirroring();
        let battery_backed = header.flags & 0x02 == 0x02;
        let mut cart =
            Self::from_parts(prg_rom, chr_rom, mirroring, header.mapper_num, ram_state)?;
        cart.name = name;
        cart.battery_backed = battery_backed;

        info!("loaded ROM `{cart}`");
        debug!("{cart:?}");
        Ok(cart)
    }

    /// Build a `Cart` from already-separated PRG/CHR data and a mapper id.
    ///
    /// An empty `chr_rom` means the board provides 8 KiB of CHR-RAM instead.
    ///
    /// # Errors
    ///
    /// If PRG is not a 16 KiB multiple, CHR is not an 8 KiB multiple, or the
    /// mapper id is unimplemented, then an error is returned.
    pub fn from_parts(
        prg_rom: Vec<u8>,
        chr_rom: Vec<u8>,
        mirroring: Mirroring,
        mapper_num: u16,
        ram_state: RamState,
    ) -> Result<Self> {
        if prg_rom.is_empty() || prg_rom.len() % PRG_ROM_BANK_SIZE != 0 {
            return Err(Error::UnalignedRom(format!(
                "prg-rom must be a non-zero multiple of 16 KiB, got {} bytes",
                prg_rom.len()
            )));
        }
        if chr_rom.len() % CHR_BANK_SIZE != 0 {
            return Err(Error::UnalignedRom(format!(
                "chr-rom must be a multiple of 8 KiB, got {} bytes",
                chr_rom.len()
            )));
        }

        let mut cart = Self {
            name: String::new(),
            ram_state,
            mirroring,
            battery_backed: false,
            mapper: Mapper::none(),
            mapper_num,
            prg_rom: prg_rom.into(),
            chr_rom: chr_rom.into(),
            chr_ram: Memory::new(),
            prg_ram: Memory::new(),
        };
        cart.mapper = match mapper_num {
            0 => Nrom::load(&mut cart),
            1 => Mmc1::load(&mut cart),
            2 => Uxrom::load(&mut cart),
            4 => Mmc3::load(&mut cart),
            _ => return Err(Error::UnsupportedMapper(mapper_num)),
        }
        .map_err(|err| Error::UnalignedRom(err.to_string()))?;
        Ok(cart)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn prg_rom(&self) -> &[u8] {
        &self.prg_rom
    }

    #[must_use]
    pub fn prg_ram(&self) -> &[u8] {
        &self.prg_ram
    }

    #[must_use]
    pub fn has_chr_rom(&self) -> bool {
        !self.chr_rom.is_empty()
    }

    #[must_use]
    pub fn has_prg_ram(&self) -> bool {
        !self.prg_ram.is_empty()
    }

    /// Whether this cartridge has battery-backed Save RAM.
    #[must_use]
    pub const fn battery_backed(&self) -> bool {
        self.battery_backed
    }

    /// Hardware-configured nametable mirroring.
    pub const fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    /// The iNES mapper number for this cart.
    #[must_use]
    pub const fn mapper_num(&self) -> u16 {
        self.mapper_num
    }

    /// Allows mappers to add PRG-RAM.
    pub(crate) fn add_prg_ram(&mut self, capacity: usize) {
        self.prg_ram = Memory::ram(self.ram_state, capacity);
    }

    /// Allows mappers to add CHR-RAM.
    pub(crate) fn add_chr_ram(&mut self, capacity: usize) {
        self.chr_ram = Memory::ram(self.ram_state, capacity);
    }
}

impl std::fmt::Display for Cart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - Mapper {:03}, PRG-ROM: {}K, CHR-ROM: {}K, CHR-RAM: {}K, PRG-RAM: {}K, Mirroring: {:?}, Battery: {}",
            self.name,
            self.mapper_num,
            self.prg_rom.len() / 0x0400,
            self.chr_rom.len() / 0x0400,
            self.chr_ram.len() / 0x0400,
            self.prg_ram.len() / 0x0400,
            self.mirroring,
            self.battery_backed,
        )
    }
}

/// An `iNES` or `NES 2.0` formatted header describing the hardware in a
/// cartridge.
///
/// <http://wiki.nesdev.com/w/index.php/INES>
/// <http://wiki.nesdev.com/w/index.php/NES_2.0>
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[must_use]
pub struct NesHeader {
    pub mapper_num: u16,    // The primary mapper number
    pub submapper_num: u8,  // NES 2.0 submapper
    pub flags: u8,          // Mirroring, Battery, Trainer, FourScreen
    pub prg_rom_banks: u16, // Number of 16 KiB PRG-ROM banks
    pub chr_rom_banks: u16, // Number of 8 KiB CHR-ROM banks
}

impl NesHeader {
    /// Load a `NesHeader` from ROM data.
    ///
    /// # Errors
    ///
    /// If the header is invalid, then an error is returned.
    pub fn load<F: Read>(rom_data: &mut F) -> Result<Self> {
        let mut header = [0u8; 16];
        rom_data.read_exact(&mut header).map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::BadRom {
                    byte: 0,
                    value: 0,
                    message: "expected 16-byte header".to_string(),
                }
            } else {
                Error::io(err, "failed to read nes header")
            }
        })?;

        if header[0..4] != *b"NES\x1a" {
            return Err(Error::BadRom {
                byte: 0,
                value: header[0],
                message: "nes header signature not found".to_string(),
            });
        }

        let mut prg_rom_banks = u16::from(header[4]);
        let mut chr_rom_banks = u16::from(header[5]);
        // Upper 4 bits of flag 6 = D0..D3 of the mapper, flag 7 = D4..D7
        let mut mapper_num = u16::from(((header[6] & 0xF0) >> 4) | (header[7] & 0xF0));
        // Lower 4 bits of flag 6 = D0..D3, lower 4 bits of flag 7 = D4..D7
        let flags = (header[6] & 0x0F) | ((header[7] & 0x0F) << 4);

        let mut submapper_num = 0;
        if header[7] & 0x0C == 0x08 {
            // NES 2.0
            mapper_num |= u16::from(header[8] & 0x0F) << 8;
            submapper_num = (header[8] & 0xF0) >> 4;
            prg_rom_banks |= u16::from(header[9] & 0x0F) << 8;
            chr_rom_banks |= u16::from(header[9] & 0xF0) << 4;
        }

        // Trainer
        if flags & 0x04 == 0x04 {
            return Err(Error::BadRom {
                byte: 6,
                value: header[6],
                message: "trained roms are not supported".to_string(),
            });
        }
        if prg_rom_banks == 0 {
            return Err(Error::BadRom {
                byte: 4,
                value: 0,
                message: "rom must have at least one prg-rom bank".to_string(),
            });
        }

        Ok(Self {
            mapper_num,
            submapper_num,
            flags,
            prg_rom_banks,
            chr_rom_banks,
        })
    }

    /// Hardware-configured mirroring from the header flags.
    #[must_use]
    pub const fn mirroring(&self) -> Mirroring {
        if self.flags & 0x08 == 0x08 {
            Mirroring::FourScreen
        } else if self.flags & 0x01 == 0x01 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    const NROM_HEADER: [u8; 16] = [
        0x4E, 0x45, 0x53, 0x1A,
        0x02, 0x01, 0x01, 0x00,
        0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn header_mapper000_vertical() {
        let header = NesHeader::load(&mut NROM_HEADER.as_slice()).expect("valid header");
        assert_eq!(header.mapper_num, 0);
        assert_eq!(header.prg_rom_banks, 2);
        assert_eq!(header.chr_rom_banks, 1);
        assert_eq!(header.mirroring(), Mirroring::Vertical);
    }

    #[test]
    fn header_bad_signature() {
        let mut bad = NROM_HEADER;
        bad[0] = 0x4D;
        let err = NesHeader::load(&mut bad.as_slice()).unwrap_err();
        assert!(matches!(err, Error::BadRom { byte: 0, .. }));
    }

    #[test]
    fn rom_shorter_than_header_claims() {
        let mut rom = NROM_HEADER.to_vec();
        rom.extend_from_slice(&[0x00; 0x4000]); // only 1 of 2 claimed banks
        let err = Cart::from_rom("short", &mut rom.as_slice(), RamState::AllZeros).unwrap_err();
        assert!(matches!(err, Error::BadRom { byte: 4, .. }));
    }

    #[test]
    fn unaligned_prg() {
        let err = Cart::from_parts(
            vec![0x00; 0x1234],
            vec![],
            Mirroring::Horizontal,
            0,
            RamState::AllZeros,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnalignedRom(_)));
    }

    #[test]
    fn unsupported_mapper() {
        let err = Cart::from_parts(
            vec![0x00; 0x4000],
            vec![],
            Mirroring::Horizontal,
            5,
            RamState::AllZeros,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedMapper(5)));
    }
}
