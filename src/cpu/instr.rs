//! CPU addressing modes and operations.
//!
//! # References
//!
//! - <https://wiki.nesdev.org/w/index.php/6502_instructions>
//! - <http://archive.6502.org/datasheets/rockwell_r650x_r651x.pdf>

use crate::cpu::{Cpu, Status};
use serde::{Deserialize, Serialize};

/// List of all CPU official and unofficial operations.
#[rustfmt::skip]
#[allow(clippy::upper_case_acronyms)]
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum Instr {
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC, CLD, CLI, CLV, CMP, CPX,
    CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP, JSR, LDA, LDX, LDY, LSR, NOP, ORA, PHA, PHP, PLA,
    PLP, ROL, ROR, RTI, RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY, TSX, TXA, TXS, TYA,
    // "Unofficial" opcodes
    SLO, RLA, SRE, RRA, SAX, LAX, DCP, ISB,
    // Remaining illegals decode but execute as no-ops
    ANC, ALR, ARR, AXS, XAA, AHX, SHY, SHX, TAS, LAS,
    #[default] STP,
}

/// CPU addressing mode.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
#[rustfmt::skip]
#[must_use]
pub enum AddrMode {
    // Implied and Accumulator
    #[default] IMP, ACC,
    // Immediate and Relative
    IMM, REL,
    // Zero Page
    ZP0, ZPX, ZPY,
    // Absolute
    ABS, ABX, ABY,
    // Indirect
    IND, IDX, IDY,
}

impl AddrMode {
    /// Operand length in bytes following the opcode.
    #[must_use]
    pub const fn operand_len(&self) -> u16 {
        match self {
            Self::IMP | Self::ACC => 0,
            Self::IMM | Self::REL | Self::ZP0 | Self::ZPX | Self::ZPY | Self::IDX | Self::IDY => 1,
            Self::ABS | Self::ABX | Self::ABY | Self::IND => 2,
        }
    }
}

/// One decoded opcode: mnemonic, addressing mode, base cycle count, and
/// whether a page crossing on a read adds a cycle.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct InstrRef {
    pub opcode: u8,
    pub instr: Instr,
    pub addr_mode: AddrMode,
    pub cycles: u8,
    pub page_penalty: bool,
}

impl std::fmt::Display for InstrRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unofficial = match self.instr {
            Instr::STP
            | Instr::SLO
            | Instr::RLA
            | Instr::SRE
            | Instr::RRA
            | Instr::SAX
            | Instr::LAX
            | Instr::DCP
            | Instr::ISB
            | Instr::ANC
            | Instr::ALR
            | Instr::ARR
            | Instr::AXS
            | Instr::XAA
            | Instr::AHX
            | Instr::SHY
            | Instr::SHX
            | Instr::TAS
            | Instr::LAS => "*",
            Instr::NOP if self.opcode != 0xEA => "*", // $EA is the only official NOP
            Instr::SBC if self.opcode == 0xEB => "*",
            _ => "",
        };
        write!(f, "{unofficial:1}{:?}", self.instr)
    }
}

macro_rules! instr {
    ($opcode:expr, $instr:ident, $mode:ident, $cycles:expr) => {
        InstrRef {
            opcode: $opcode,
            instr: Instr::$instr,
            addr_mode: AddrMode::$mode,
            cycles: $cycles,
            page_penalty: false,
        }
    };
    ($opcode:expr, $instr:ident, $mode:ident, $cycles:expr, +) => {
        InstrRef {
            opcode: $opcode,
            instr: Instr::$instr,
            addr_mode: AddrMode::$mode,
            cycles: $cycles,
            page_penalty: true,
        }
    };
}

impl Cpu {
    /// 16x16 grid of 6502 opcodes. Matches the datasheet matrix for easy
    /// lookup. A trailing `+` marks reads that cost one extra cycle when the
    /// effective address crosses a page.
    #[rustfmt::skip]
    pub const INSTRS: [InstrRef; 256] = [
        instr!(0x00, BRK, IMP, 7), instr!(0x01, ORA, IDX, 6),    instr!(0x02, STP, IMP, 2), instr!(0x03, SLO, IDX, 8),    instr!(0x04, NOP, ZP0, 3), instr!(0x05, ORA, ZP0, 3), instr!(0x06, ASL, ZP0, 5), instr!(0x07, SLO, ZP0, 5), instr!(0x08, PHP, IMP, 3), instr!(0x09, ORA, IMM, 2),    instr!(0x0A, ASL, ACC, 2), instr!(0x0B, ANC, IMM, 2),    instr!(0x0C, NOP, ABS, 4),    instr!(0x0D, ORA, ABS, 4),    instr!(0x0E, ASL, ABS, 6),    instr!(0x0F, SLO, ABS, 6),
        instr!(0x10, BPL, REL, 2), instr!(0x11, ORA, IDY, 5, +), instr!(0x12, STP, IMP, 2), instr!(0x13, SLO, IDY, 8),    instr!(0x14, NOP, ZPX, 4), instr!(0x15, ORA, ZPX, 4), instr!(0x16, ASL, ZPX, 6), instr!(0x17, SLO, ZPX, 6), instr!(0x18, CLC, IMP, 2), instr!(0x19, ORA, ABY, 4, +), instr!(0x1A, NOP, IMP, 2), instr!(0x1B, SLO, ABY, 7),    instr!(0x1C, NOP, ABX, 4, +), instr!(0x1D, ORA, ABX, 4, +), instr!(0x1E, ASL, ABX, 7),    instr!(0x1F, SLO, ABX, 7),
        instr!(0x20, JSR, ABS, 6), instr!(0x21, AND, IDX, 6),    instr!(0x22, STP, IMP, 2), instr!(0x23, RLA, IDX, 8),    instr!(0x24, BIT, ZP0, 3), instr!(0x25, AND, ZP0, 3), instr!(0x26, ROL, ZP0, 5), instr!(0x27, RLA, ZP0, 5), instr!(0x28, PLP, IMP, 4), instr!(0x29, AND, IMM, 2),    instr!(0x2A, ROL, ACC, 2), instr!(0x2B, ANC, IMM, 2),    instr!(0x2C, BIT, ABS, 4),    instr!(0x2D, AND, ABS, 4),    instr!(0x2E, ROL, ABS, 6),    instr!(0x2F, RLA, ABS, 6),
        instr!(0x30, BMI, REL, 2), instr!(0x31, AND, IDY, 5, +), instr!(0x32, STP, IMP, 2), instr!(0x33, RLA, IDY, 8),    instr!(0x34, NOP, ZPX, 4), instr!(0x35, AND, ZPX, 4), instr!(0x36, ROL, ZPX, 6), instr!(0x37, RLA, ZPX, 6), instr!(0x38, SEC, IMP, 2), instr!(0x39, AND, ABY, 4, +), instr!(0x3A, NOP, IMP, 2), instr!(0x3B, RLA, ABY, 7),    instr!(0x3C, NOP, ABX, 4, +), instr!(0x3D, AND, ABX, 4, +), instr!(0x3E, ROL, ABX, 7),    instr!(0x3F, RLA, ABX, 7),
        instr!(0x40, RTI, IMP, 6), instr!(0x41, EOR, IDX, 6),    instr!(0x42, STP, IMP, 2), instr!(0x43, SRE, IDX, 8),    instr!(0x44, NOP, ZP0, 3), instr!(0x45, EOR, ZP0, 3), instr!(0x46, LSR, ZP0, 5), instr!(0x47, SRE, ZP0, 5), instr!(0x48, PHA, IMP, 3), instr!(0x49, EOR, IMM, 2),    instr!(0x4A, LSR, ACC, 2), instr!(0x4B, ALR, IMM, 2),    instr!(0x4C, JMP, ABS, 3),    instr!(0x4D, EOR, ABS, 4),    instr!(0x4E, LSR, ABS, 6),    instr!(0x4F, SRE, ABS, 6),
        instr!(0x50, BVC, REL, 2), instr!(0x51, EOR, IDY, 5, +), instr!(0x52, STP, IMP, 2), instr!(0x53, SRE, IDY, 8),    instr!(0x54, NOP, ZPX, 4), instr!(0x55, EOR, ZPX, 4), instr!(0x56, LSR, ZPX, 6), instr!(0x57, SRE, ZPX, 6), instr!(0x58, CLI, IMP, 2), instr!(0x59, EOR, ABY, 4, +), instr!(0x5A, NOP, IMP, 2), instr!(0x5B, SRE, ABY, 7),    instr!(0x5C, NOP, ABX, 4, +), instr!(0x5D, EOR, ABX, 4, +), instr!(0x5E, LSR, ABX, 7),    instr!(0x5F, SRE, ABX, 7),
        instr!(0x60, RTS, IMP, 6), instr!(0x61, ADC, IDX, 6),    instr!(0x62, STP, IMP, 2), instr!(0x63, RRA, IDX, 8),    instr!(0x64, NOP, ZP0, 3), instr!(0x65, ADC, ZP0, 3), instr!(0x66, ROR, ZP0, 5), instr!(0x67, RRA, ZP0, 5), instr!(0x68, PLA, IMP, 4), instr!(0x69, ADC, IMM, 2),    instr!(0x6A, ROR, ACC, 2), instr!(0x6B, ARR, IMM, 2),    instr!(0x6C, JMP, IND, 5),    instr!(0x6D, ADC, ABS, 4),    instr!(0x6E, ROR, ABS, 6),    instr!(0x6F, RRA, ABS, 6),
        instr!(0x70, BVS, REL, 2), instr!(0x71, ADC, IDY, 5, +), instr!(0x72, STP, IMP, 2), instr!(0x73, RRA, IDY, 8),    instr!(0x74, NOP, ZPX, 4), instr!(0x75, ADC, ZPX, 4), instr!(0x76, ROR, ZPX, 6), instr!(0x77, RRA, ZPX, 6), instr!(0x78, SEI, IMP, 2), instr!(0x79, ADC, ABY, 4, +), instr!(0x7A, NOP, IMP, 2), instr!(0x7B, RRA, ABY, 7),    instr!(0x7C, NOP, ABX, 4, +), instr!(0x7D, ADC, ABX, 4, +), instr!(0x7E, ROR, ABX, 7),    instr!(0x7F, RRA, ABX, 7),
        instr!(0x80, NOP, IMM, 2), instr!(0x81, STA, IDX, 6),    instr!(0x82, NOP, IMM, 2), instr!(0x83, SAX, IDX, 6),    instr!(0x84, STY, ZP0, 3), instr!(0x85, STA, ZP0, 3), instr!(0x86, STX, ZP0, 3), instr!(0x87, SAX, ZP0, 3), instr!(0x88, DEY, IMP, 2), instr!(0x89, NOP, IMM, 2),    instr!(0x8A, TXA, IMP, 2), instr!(0x8B, XAA, IMM, 2),    instr!(0x8C, STY, ABS, 4),    instr!(0x8D, STA, ABS, 4),    instr!(0x8E, STX, ABS, 4),    instr!(0x8F, SAX, ABS, 4),
        instr!(0x90, BCC, REL, 2), instr!(0x91, STA, IDY, 6),    instr!(0x92, STP, IMP, 2), instr!(0x93, AHX, IDY, 6),    instr!(0x94, STY, ZPX, 4), instr!(0x95, STA, ZPX, 4), instr!(0x96, STX, ZPY, 4), instr!(0x97, SAX, ZPY, 4), instr!(0x98, TYA, IMP, 2), instr!(0x99, STA, ABY, 5),    instr!(0x9A, TXS, IMP, 2), instr!(0x9B, TAS, ABY, 5),    instr!(0x9C, SHY, ABX, 5),    instr!(0x9D, STA, ABX, 5),    instr!(0x9E, SHX, ABY, 5),    instr!(0x9F, AHX, ABY, 5),
        instr!(0xA0, LDY, IMM, 2), instr!(0xA1, LDA, IDX, 6),    instr!(0xA2, LDX, IMM, 2), instr!(0xA3, LAX, IDX, 6),    instr!(0xA4, LDY, ZP0, 3), instr!(0xA5, LDA, ZP0, 3), instr!(0xA6, LDX, ZP0, 3), instr!(0xA7, LAX, ZP0, 3), instr!(0xA8, TAY, IMP, 2), instr!(0xA9, LDA, IMM, 2),    instr!(0xAA, TAX, IMP, 2), instr!(0xAB, LAX, IMM, 2),    instr!(0xAC, LDY, ABS, 4),    instr!(0xAD, LDA, ABS, 4),    instr!(0xAE, LDX, ABS, 4),    instr!(0xAF, LAX, ABS, 4),
        instr!(0xB0, BCS, REL, 2), instr!(0xB1, LDA, IDY, 5, +), instr!(0xB2, STP, IMP, 2), instr!(0xB3, LAX, IDY, 5, +), instr!(0xB4, LDY, ZPX, 4), instr!(0xB5, LDA, ZPX, 4), instr!(0xB6, LDX, ZPY, 4), instr!(0xB7, LAX, ZPY, 4), instr!(0xB8, CLV, IMP, 2), instr!(0xB9, LDA, ABY, 4, +), instr!(0xBA, TSX, IMP, 2), instr!(0xBB, LAS, ABY, 4, +), instr!(0xBC, LDY, ABX, 4, +), instr!(0xBD, LDA, ABX, 4, +), instr!(0xBE, LDX, ABY, 4, +), instr!(0xBF, LAX, ABY, 4, +),
        instr!(0xC0, CPY, IMM, 2), instr!(0xC1, CMP, IDX, 6),    instr!(0xC2, NOP, IMM, 2), instr!(0xC3, DCP, IDX, 8),    instr!(0xC4, CPY, ZP0, 3), instr!(0xC5, CMP, ZP0, 3), instr!(0xC6, DEC, ZP0, 5), instr!(0xC7, DCP, ZP0, 5), instr!(0xC8, INY, IMP, 2), instr!(0xC9, CMP, IMM, 2),    instr!(0xCA, DEX, IMP, 2), instr!(0xCB, AXS, IMM, 2),    instr!(0xCC, CPY, ABS, 4),    instr!(0xCD, CMP, ABS, 4),    instr!(0xCE, DEC, ABS, 6),    instr!(0xCF, DCP, ABS, 6),
        instr!(0xD0, BNE, REL, 2), instr!(0xD1, CMP, IDY, 5, +), instr!(0xD2, STP, IMP, 2), instr!(0xD3, DCP, IDY, 8),    instr!(0xD4, NOP, ZPX, 4), instr!(0xD5, CMP, ZPX, 4), instr!(0xD6, DEC, ZPX, 6), instr!(0xD7, DCP, ZPX, 6), instr!(0xD8, CLD, IMP, 2), instr!(0xD9, CMP, ABY, 4, +), instr!(0xDA, NOP, IMP, 2), instr!(0xDB, DCP, ABY, 7),    instr!(0xDC, NOP, ABX, 4, +), instr!(0xDD, CMP, ABX, 4, +), instr!(0xDE, DEC, ABX, 7),    instr!(0xDF, DCP, ABX, 7),
        instr!(0xE0, CPX, IMM, 2), instr!(0xE1, SBC, IDX, 6),    instr!(0xE2, NOP, IMM, 2), instr!(0xE3, ISB, IDX, 8),    instr!(0xE4, CPX, ZP0, 3), instr!(0xE5, SBC, ZP0, 3), instr!(0xE6, INC, ZP0, 5), instr!(0xE7, ISB, ZP0, 5), instr!(0xE8, INX, IMP, 2), instr!(0xE9, SBC, IMM, 2),    instr!(0xEA, NOP, IMP, 2), instr!(0xEB, SBC, IMM, 2),    instr!(0xEC, CPX, ABS, 4),    instr!(0xED, SBC, ABS, 4),    instr!(0xEE, INC, ABS, 6),    instr!(0xEF, ISB, ABS, 6),
        instr!(0xF0, BEQ, REL, 2), instr!(0xF1, SBC, IDY, 5, +), instr!(0xF2, STP, IMP, 2), instr!(0xF3, ISB, IDY, 8),    instr!(0xF4, NOP, ZPX, 4), instr!(0xF5, SBC, ZPX, 4), instr!(0xF6, INC, ZPX, 6), instr!(0xF7, ISB, ZPX, 6), instr!(0xF8, SED, IMP, 2), instr!(0xF9, SBC, ABY, 4, +), instr!(0xFA, NOP, IMP, 2), instr!(0xFB, ISB, ABY, 7),    instr!(0xFC, NOP, ABX, 4, +), instr!(0xFD, SBC, ABX, 4, +), instr!(0xFE, INC, ABX, 7),    instr!(0xFF, ISB, ABX, 7),
    ];

    /// Resolve the effective address for an addressing mode, advancing PC
    /// past the operand. Returns the address and whether a page boundary was
    /// crossed by indexing (or, for `REL`, by the branch target).
    pub(crate) fn operand_addr(&mut self, mode: AddrMode) -> (u16, bool) {
        match mode {
            AddrMode::IMP | AddrMode::ACC => (0x0000, false),
            AddrMode::IMM => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                (addr, false)
            }
            AddrMode::ZP0 => {
                let addr = u16::from(self.fetch_byte());
                (addr, false)
            }
            AddrMode::ZPX => {
                let addr = u16::from(self.fetch_byte().wrapping_add(self.x));
                (addr, false)
            }
            AddrMode::ZPY => {
                let addr = u16::from(self.fetch_byte().wrapping_add(self.y));
                (addr, false)
            }
            AddrMode::REL => {
                let offset = self.fetch_byte() as i8;
                let base = self.pc;
                let addr = base.wrapping_add(offset as u16);
                (addr, Self::pages_differ(base, addr))
            }
            AddrMode::ABS => {
                let addr = self.fetch_word();
                (addr, false)
            }
            AddrMode::ABX => {
                let base = self.fetch_word();
                let addr = base.wrapping_add(u16::from(self.x));
                (addr, Self::pages_differ(base, addr))
            }
            AddrMode::ABY => {
                let base = self.fetch_word();
                let addr = base.wrapping_add(u16::from(self.y));
                (addr, Self::pages_differ(base, addr))
            }
            AddrMode::IND => {
                // JMP ($xxFF) wraps within the page when reading the high byte
                let ptr = self.fetch_word();
                let lo = self.read(ptr);
                let hi = self.read((ptr & 0xFF00) | u16::from((ptr as u8).wrapping_add(1)));
                (u16::from_le_bytes([lo, hi]), false)
            }
            AddrMode::IDX => {
                let ptr = self.fetch_byte().wrapping_add(self.x);
                (self.read_zp_word(ptr), false)
            }
            AddrMode::IDY => {
                let ptr = self.fetch_byte();
                let base = self.read_zp_word(ptr);
                let addr = base.wrapping_add(u16::from(self.y));
                (addr, Self::pages_differ(base, addr))
            }
        }
    }

    /// Execute one decoded operation. Returns extra cycles from taken
    /// branches.
    pub(crate) fn execute(&mut self, instr: Instr, mode: AddrMode, addr: u16, crossed: bool) -> u8 {
        match instr {
            // Loads/stores
            Instr::LDA => {
                self.acc = self.read(addr);
                self.set_zn(self.acc);
            }
            Instr::LDX => {
                self.x = self.read(addr);
                self.set_zn(self.x);
            }
            Instr::LDY => {
                self.y = self.read(addr);
                self.set_zn(self.y);
            }
            Instr::STA => self.write(addr, self.acc),
            Instr::STX => self.write(addr, self.x),
            Instr::STY => self.write(addr, self.y),

            // Transfers
            Instr::TAX => {
                self.x = self.acc;
                self.set_zn(self.x);
            }
            Instr::TAY => {
                self.y = self.acc;
                self.set_zn(self.y);
            }
            Instr::TSX => {
                self.x = self.sp;
                self.set_zn(self.x);
            }
            Instr::TXA => {
                self.acc = self.x;
                self.set_zn(self.acc);
            }
            Instr::TXS => self.sp = self.x,
            Instr::TYA => {
                self.acc = self.y;
                self.set_zn(self.acc);
            }

            // Arithmetic
            Instr::ADC => {
                let val = self.read(addr);
                self.adc(val);
            }
            Instr::SBC => {
                // Defined as ADC with the inverted operand
                let val = self.read(addr);
                self.adc(!val);
            }
            Instr::CMP => {
                let val = self.read(addr);
                self.compare(self.acc, val);
            }
            Instr::CPX => {
                let val = self.read(addr);
                self.compare(self.x, val);
            }
            Instr::CPY => {
                let val = self.read(addr);
                self.compare(self.y, val);
            }

            // Logic
            Instr::AND => {
                self.acc &= self.read(addr);
                self.set_zn(self.acc);
            }
            Instr::EOR => {
                self.acc ^= self.read(addr);
                self.set_zn(self.acc);
            }
            Instr::ORA => {
                self.acc |= self.read(addr);
                self.set_zn(self.acc);
            }
            Instr::BIT => {
                let val = self.read(addr);
                self.status.set(Status::Z, self.acc & val == 0);
                self.status.set(Status::V, val & 0x40 == 0x40);
                self.status.set(Status::N, val & 0x80 == 0x80);
            }

            // Shifts and rotates
            Instr::ASL => {
                self.read_modify_write(mode, addr, Self::asl);
            }
            Instr::LSR => {
                self.read_modify_write(mode, addr, Self::lsr);
            }
            Instr::ROL => {
                self.read_modify_write(mode, addr, Self::rol);
            }
            Instr::ROR => {
                self.read_modify_write(mode, addr, Self::ror);
            }

            // Increments/decrements
            Instr::INC => {
                self.read_modify_write(mode, addr, Self::inc);
            }
            Instr::DEC => {
                self.read_modify_write(mode, addr, Self::dec);
            }
            Instr::INX => {
                self.x = self.x.wrapping_add(1);
                self.set_zn(self.x);
            }
            Instr::INY => {
                self.y = self.y.wrapping_add(1);
                self.set_zn(self.y);
            }
            Instr::DEX => {
                self.x = self.x.wrapping_sub(1);
                self.set_zn(self.x);
            }
            Instr::DEY => {
                self.y = self.y.wrapping_sub(1);
                self.set_zn(self.y);
            }

            // Flags
            Instr::CLC => self.status.remove(Status::C),
            Instr::CLD => self.status.remove(Status::D),
            Instr::CLI => self.status.remove(Status::I),
            Instr::CLV => self.status.remove(Status::V),
            Instr::SEC => self.status.insert(Status::C),
            Instr::SED => self.status.insert(Status::D),
            Instr::SEI => self.status.insert(Status::I),

            // Branches: taken adds 1 cycle, a taken cross-page target 1 more
            Instr::BCC => return self.branch(!self.status.contains(Status::C), addr, crossed),
            Instr::BCS => return self.branch(self.status.contains(Status::C), addr, crossed),
            Instr::BNE => return self.branch(!self.status.contains(Status::Z), addr, crossed),
            Instr::BEQ => return self.branch(self.status.contains(Status::Z), addr, crossed),
            Instr::BPL => return self.branch(!self.status.contains(Status::N), addr, crossed),
            Instr::BMI => return self.branch(self.status.contains(Status::N), addr, crossed),
            Instr::BVC => return self.branch(!self.status.contains(Status::V), addr, crossed),
            Instr::BVS => return self.branch(self.status.contains(Status::V), addr, crossed),

            // Jumps and subroutines
            Instr::JMP => self.pc = addr,
            Instr::JSR => {
                self.push_word(self.pc.wrapping_sub(1));
                self.pc = addr;
            }
            Instr::RTS => self.pc = self.pop_word().wrapping_add(1),
            Instr::RTI => {
                self.pop_status();
                self.pc = self.pop_word();
            }

            // Stack
            Instr::PHA => self.push_byte(self.acc),
            Instr::PHP => {
                // Pushes with B and U set
                self.push_byte((self.status | Status::B | Status::U).bits());
            }
            Instr::PLA => {
                self.acc = self.pop_byte();
                self.set_zn(self.acc);
            }
            Instr::PLP => self.pop_status(),

            Instr::BRK => {
                // Push PC past the padding byte, status with B set, then load
                // the IRQ vector. I is set after the push.
                self.push_word(self.pc.wrapping_add(1));
                self.push_byte((self.status | Status::B | Status::U).bits());
                self.status.insert(Status::I);
                self.pc = self.read_word(Self::IRQ_VECTOR);
            }

            Instr::NOP => {
                // Unofficial NOPs with a memory operand still perform the read
                if !matches!(mode, AddrMode::IMP | AddrMode::ACC) {
                    let _ = self.read(addr);
                }
            }

            // Documented unofficial combinations
            Instr::SLO => {
                let val = self.read_modify_write(mode, addr, Self::asl);
                self.acc |= val;
                self.set_zn(self.acc);
            }
            Instr::RLA => {
                let val = self.read_modify_write(mode, addr, Self::rol);
                self.acc &= val;
                self.set_zn(self.acc);
            }
            Instr::SRE => {
                let val = self.read_modify_write(mode, addr, Self::lsr);
                self.acc ^= val;
                self.set_zn(self.acc);
            }
            Instr::RRA => {
                let val = self.read_modify_write(mode, addr, Self::ror);
                self.adc(val);
            }
            Instr::SAX => self.write(addr, self.acc & self.x),
            Instr::LAX => {
                let val = self.read(addr);
                self.acc = val;
                self.x = val;
                self.set_zn(val);
            }
            Instr::DCP => {
                let val = self.read_modify_write(mode, addr, Self::dec);
                self.compare(self.acc, val);
            }
            Instr::ISB => {
                let val = self.read_modify_write(mode, addr, Self::inc);
                self.adc(!val);
            }

            // Remaining illegals execute as no-ops
            Instr::ANC
            | Instr::ALR
            | Instr::ARR
            | Instr::AXS
            | Instr::XAA
            | Instr::AHX
            | Instr::SHY
            | Instr::SHX
            | Instr::TAS
            | Instr::LAS => (),

            // Halt until reset
            Instr::STP => self.halted = true,
        }
        0
    }

    // Operation helpers

    fn asl(&mut self, val: u8) -> u8 {
        self.status.set(Status::C, val & 0x80 == 0x80);
        let result = val << 1;
        self.set_zn(result);
        result
    }

    fn lsr(&mut self, val: u8) -> u8 {
        self.status.set(Status::C, val & 0x01 == 0x01);
        let result = val >> 1;
        self.set_zn(result);
        result
    }

    fn rol(&mut self, val: u8) -> u8 {
        let carry = self.status.contains(Status::C) as u8;
        self.status.set(Status::C, val & 0x80 == 0x80);
        let result = (val << 1) | carry;
        self.set_zn(result);
        result
    }

    fn ror(&mut self, val: u8) -> u8 {
        let carry = self.status.contains(Status::C) as u8;
        self.status.set(Status::C, val & 0x01 == 0x01);
        let result = (val >> 1) | (carry << 7);
        self.set_zn(result);
        result
    }

    fn inc(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        self.set_zn(result);
        result
    }

    fn dec(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        self.set_zn(result);
        result
    }

    /// Add with carry, setting V from the signed-overflow rule. Decimal mode
    /// has no arithmetic effect on the NES.
    fn adc(&mut self, val: u8) {
        let a = self.acc;
        let carry = self.status.contains(Status::C) as u8;
        let (sum, overflow1) = a.overflowing_add(val);
        let (sum, overflow2) = sum.overflowing_add(carry);
        self.status.set(Status::C, overflow1 | overflow2);
        self.status
            .set(Status::V, (a ^ sum) & (val ^ sum) & 0x80 == 0x80);
        self.acc = sum;
        self.set_zn(sum);
    }

    fn compare(&mut self, reg: u8, val: u8) {
        let result = reg.wrapping_sub(val);
        self.status.set(Status::C, reg >= val);
        self.set_zn(result);
    }

    /// RMW access pattern: read, write back the original (dummy write), then
    /// write the modified value. Accumulator mode skips the bus entirely.
    fn read_modify_write(&mut self, mode: AddrMode, addr: u16, f: fn(&mut Self, u8) -> u8) -> u8 {
        if mode == AddrMode::ACC {
            let result = f(self, self.acc);
            self.acc = result;
            result
        } else {
            let val = self.read(addr);
            self.write(addr, val);
            let result = f(self, val);
            self.write(addr, result);
            result
        }
    }

    fn branch(&mut self, cond: bool, addr: u16, crossed: bool) -> u8 {
        if cond {
            self.pc = addr;
            1 + u8::from(crossed)
        } else {
            0
        }
    }
}
