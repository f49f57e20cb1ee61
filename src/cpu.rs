//! 6502 Central Processing Unit (CPU) implementation.
//!
//! <https://wiki.nesdev.org/w/index.php/CPU>

use crate::{
    bus::Bus,
    common::{Reset, ResetKind},
    cpu::instr::InstrRef,
};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub mod instr;

// Status Registers
// https://wiki.nesdev.org/w/index.php/Status_flags
// 7654 3210
// NVUB DIZC
// |||| ||||
// |||| |||+- Carry
// |||| ||+-- Zero
// |||| |+--- Interrupt Disable
// |||| +---- Decimal Mode - no arithmetic effect on the NES, but still a flag
// |||+------ Break - 1 when pushed from PHP/BRK, 0 from IRQ/NMI
// ||+------- Unused - always 1 when pushed to the stack
// |+-------- Overflow
// +--------- Negative
bitflags! {
    /// CPU status flags.
    #[derive(Default, Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
    #[must_use]
    pub struct Status: u8 {
        const C = 1;
        const Z = 1 << 1;
        const I = 1 << 2;
        const D = 1 << 3;
        const B = 1 << 4;
        const U = 1 << 5;
        const V = 1 << 6;
        const N = 1 << 7;
    }
}

/// Pending interrupt kinds. NMI always wins over IRQ within a single service
/// dispatch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum Interrupt {
    Irq,
    Nmi,
}

/// A per-instruction snapshot delivered to a registered trace hook.
#[derive(Debug, Copy, Clone)]
#[must_use]
pub struct CpuTrace {
    pub pc: u16,
    pub opcode: u8,
    pub acc: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub status: u8,
    pub cycle: u64,
}

/// The Central Processing Unit: registers, interrupt latch, and the data bus
/// it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Cpu {
    /// Accumulator register.
    pub acc: u8,
    /// X register.
    pub x: u8,
    /// Y register.
    pub y: u8,
    /// Stack pointer - stack is at $0100-$01FF.
    pub sp: u8,
    /// Program counter.
    pub pc: u16,
    /// Status flags.
    pub status: Status,
    /// Total cycles elapsed. Monotonically non-decreasing.
    pub cycle: u64,
    /// Pending interrupt slot. Raising is an idempotent latch; servicing
    /// clears it.
    pub pending: Option<Interrupt>,
    /// Set by STP: the CPU stops executing until reset, though it keeps
    /// reporting cycles so the rest of the machine advances.
    pub halted: bool,
    /// Data bus.
    pub bus: Bus,
}

impl Cpu {
    pub const NMI_VECTOR: u16 = 0xFFFA;
    pub const RESET_VECTOR: u16 = 0xFFFC;
    pub const IRQ_VECTOR: u16 = 0xFFFE;

    const POWER_ON_STATUS: Status = Status::U.union(Status::I);
    const POWER_ON_SP: u8 = 0xFD;
    const SP_BASE: u16 = 0x0100;
    const IRQ_CYCLES: u64 = 7;

    /// Create a new CPU with the given bus.
    pub fn new(bus: Bus) -> Self {
        Self {
            acc: 0x00,
            x: 0x00,
            y: 0x00,
            sp: Self::POWER_ON_SP,
            pc: 0x0000,
            status: Self::POWER_ON_STATUS,
            cycle: 0,
            pending: None,
            halted: false,
            bus,
        }
    }

    /// Load a previously-saved CPU state, re-attaching ROM data that isn't
    /// serialized.
    pub fn load(&mut self, mut cpu: Self) {
        if cpu.bus.prg_rom.is_empty() {
            cpu.bus.prg_rom = std::mem::take(&mut self.bus.prg_rom);
        }
        if cpu.bus.ppu.bus.chr.is_empty() {
            cpu.bus.ppu.bus.chr = std::mem::take(&mut self.bus.ppu.bus.chr);
        }
        *self = cpu;
    }

    /// Latch a pending interrupt. A second raise before service overwrites
    /// only same-or-weaker pending kinds.
    pub fn raise(&mut self, kind: Interrupt) {
        match (self.pending, kind) {
            (Some(Interrupt::Nmi), Interrupt::Irq) => (),
            _ => self.pending = Some(kind),
        }
    }

    /// Snapshot the CPU state ahead of the next instruction for tracing.
    #[must_use]
    pub fn trace_state(&self) -> CpuTrace {
        CpuTrace {
            pc: self.pc,
            opcode: self.peek(self.pc),
            acc: self.acc,
            x: self.x,
            y: self.y,
            sp: self.sp,
            status: self.status.bits(),
            cycle: self.cycle,
        }
    }

    /// Decode the instruction at PC without executing it.
    #[must_use]
    pub fn next_instr(&self) -> InstrRef {
        Self::INSTRS[usize::from(self.peek(self.pc))]
    }

    /// Execute one instruction (or service a pending interrupt) and return
    /// the number of cycles consumed.
    pub fn step(&mut self) -> u64 {
        if self.halted {
            // STP stops execution until reset; burn a cycle so the rest of
            // the machine keeps advancing
            self.cycle += 1;
            return 1;
        }

        // NMI is serviced unconditionally; IRQ only while I is clear
        match self.pending {
            Some(Interrupt::Nmi) => {
                self.pending = None;
                return self.service_interrupt(Self::NMI_VECTOR);
            }
            Some(Interrupt::Irq) if !self.status.contains(Status::I) => {
                self.pending = None;
                return self.service_interrupt(Self::IRQ_VECTOR);
            }
            _ => (),
        }

        let opcode = self.fetch_byte();
        let instr = Self::INSTRS[usize::from(opcode)];
        let (addr, crossed) = self.operand_addr(instr.addr_mode);

        let mut cycles = u64::from(instr.cycles);
        if instr.page_penalty && crossed {
            cycles += 1;
        }
        cycles += u64::from(self.execute(instr.instr, instr.addr_mode, addr, crossed));

        // A $4014 write stalls the CPU while it feeds OAM
        if let Some(page) = self.bus.oam_dma.take() {
            cycles += self.oam_dma(page, self.cycle + cycles);
        }

        self.cycle += cycles;
        cycles
    }

    /// Service an interrupt: push PC and status (B clear, U set), set I, and
    /// load the vector.
    fn service_interrupt(&mut self, vector: u16) -> u64 {
        self.push_word(self.pc);
        self.push_byte(((self.status | Status::U) & !Status::B).bits());
        self.status.insert(Status::I);
        self.pc = self.read_word(vector);
        trace!(
            "{} - CYC:{}",
            if vector == Self::NMI_VECTOR { "NMI" } else { "IRQ" },
            self.cycle
        );
        self.cycle += Self::IRQ_CYCLES;
        Self::IRQ_CYCLES
    }

    /// Copy 256 bytes from `page` into OAM. Costs 513 cycles from an even
    /// cycle, 514 from an odd one. Uses a single contiguous view when the
    /// source region allows it.
    fn oam_dma(&mut self, page: u16, start_cycle: u64) -> u64 {
        trace!("OAM DMA ${page:04X} - CYC:{start_cycle}");
        if let Some(slice) = self.bus.dma_slice(page) {
            let buf: [u8; 256] = slice.try_into().expect("256-byte dma slice");
            for val in buf {
                self.bus.ppu.write_dma(val);
            }
        } else {
            for offset in 0..256 {
                let val = self.bus.read(page.wrapping_add(offset));
                self.bus.ppu.write_dma(val);
            }
        }
        513 + (start_cycle & 0x01)
    }

    // Memory access

    #[inline]
    pub fn read(&mut self, addr: u16) -> u8 {
        self.bus.read(addr)
    }

    #[inline]
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        self.bus.peek(addr)
    }

    #[inline]
    pub fn write(&mut self, addr: u16, val: u8) {
        self.bus.write(addr, val);
    }

    #[inline]
    pub fn read_word(&mut self, addr: u16) -> u16 {
        self.bus.read_u16(addr)
    }

    /// Read a word from the zero page, wrapping the high byte within it.
    pub(crate) fn read_zp_word(&mut self, addr: u8) -> u16 {
        let lo = self.read(u16::from(addr));
        let hi = self.read(u16::from(addr.wrapping_add(1)));
        u16::from_le_bytes([lo, hi])
    }

    #[inline]
    pub(crate) fn fetch_byte(&mut self) -> u8 {
        let val = self.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        val
    }

    #[inline]
    pub(crate) fn fetch_word(&mut self) -> u16 {
        let val = self.read_word(self.pc);
        self.pc = self.pc.wrapping_add(2);
        val
    }

    // Stack

    pub(crate) fn push_byte(&mut self, val: u8) {
        self.write(Self::SP_BASE | u16::from(self.sp), val);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub(crate) fn pop_byte(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.read(Self::SP_BASE | u16::from(self.sp))
    }

    pub(crate) fn push_word(&mut self, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.push_byte(hi);
        self.push_byte(lo);
    }

    pub(crate) fn pop_word(&mut self) -> u16 {
        let lo = self.pop_byte();
        let hi = self.pop_byte();
        u16::from_le_bytes([lo, hi])
    }

    /// Pull status from the stack, forcing U set and B clear.
    pub(crate) fn pop_status(&mut self) {
        let bits = self.pop_byte();
        self.status = Status::from_bits_truncate(bits);
        self.status.insert(Status::U);
        self.status.remove(Status::B);
    }

    #[inline]
    pub(crate) fn set_zn(&mut self, val: u8) {
        self.status.set(Status::Z, val == 0);
        self.status.set(Status::N, val & 0x80 == 0x80);
    }

    #[inline]
    pub(crate) const fn pages_differ(a: u16, b: u16) -> bool {
        a & 0xFF00 != b & 0xFF00
    }
}

impl Reset for Cpu {
    fn reset(&mut self, kind: ResetKind) {
        self.bus.reset(kind);
        match kind {
            ResetKind::Soft => {
                self.status.insert(Status::I);
                self.sp = self.sp.wrapping_sub(3);
            }
            ResetKind::Hard => {
                self.acc = 0x00;
                self.x = 0x00;
                self.y = 0x00;
                self.status = Self::POWER_ON_STATUS;
                self.sp = Self::POWER_ON_SP;
                self.cycle = 0;
            }
        }
        self.pending = None;
        self.halted = false;
        self.pc = self.bus.read_u16(Self::RESET_VECTOR);
        trace!("{kind:?} reset - PC:${:04X}", self.pc);
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new(Bus::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cart::Cart, mem::RamState};

    /// A CPU wired to an NROM cart whose PRG starts with `prg` at $8000 and a
    /// reset vector pointing at it.
    pub(crate) fn cpu_with_prg(prg: &[u8]) -> Cpu {
        let mut prg_rom = vec![0x00; 0x8000];
        prg_rom[..prg.len()].copy_from_slice(prg);
        // Reset vector -> $8000
        prg_rom[0x7FFC] = 0x00;
        prg_rom[0x7FFD] = 0x80;
        let cart = Cart::from_parts(prg_rom, vec![], Default::default(), 0, RamState::AllZeros)
            .expect("valid cart");
        let mut bus = Bus::default();
        bus.load_cart(cart);
        let mut cpu = Cpu::new(bus);
        cpu.reset(ResetKind::Hard);
        cpu
    }

    #[test]
    fn power_on_state() {
        let cpu = cpu_with_prg(&[0xEA]);
        assert_eq!(cpu.sp, Cpu::POWER_ON_SP);
        assert_eq!(cpu.status, Status::U | Status::I);
        assert_eq!(cpu.pc, 0x8000);
    }

    #[test]
    fn cycle_counts_match_table() {
        // LDA #$01; STA $0200; LDA $0200; NOP
        let mut cpu = cpu_with_prg(&[0xA9, 0x01, 0x8D, 0x00, 0x02, 0xAD, 0x00, 0x02, 0xEA]);
        assert_eq!(cpu.step(), 2, "LDA immediate");
        assert_eq!(cpu.step(), 4, "STA absolute");
        assert_eq!(cpu.step(), 4, "LDA absolute");
        assert_eq!(cpu.step(), 2, "NOP");
        assert_eq!(cpu.cycle, 12);
    }

    #[test]
    fn page_cross_penalty() {
        // LDX #$01; LDA $80FF,X
        let mut cpu = cpu_with_prg(&[0xA2, 0x01, 0xBD, 0xFF, 0x80]);
        cpu.step();
        assert_eq!(cpu.step(), 5, "absolute,X read crossing a page adds 1");

        // LDX #$01; LDA $8000,X
        let mut cpu = cpu_with_prg(&[0xA2, 0x01, 0xBD, 0x00, 0x80]);
        cpu.step();
        assert_eq!(cpu.step(), 4, "no crossing, no penalty");
    }

    #[test]
    fn branch_cycles() {
        // CLC; BCC +0 (taken, same page)
        let mut cpu = cpu_with_prg(&[0x18, 0x90, 0x00, 0xEA]);
        cpu.step();
        assert_eq!(cpu.step(), 3, "taken branch adds 1");

        // SEC; BCC (not taken)
        let mut cpu = cpu_with_prg(&[0x38, 0x90, 0x10]);
        cpu.step();
        assert_eq!(cpu.step(), 2, "untaken branch has base cycles");
    }

    #[test]
    fn adc_overflow_flag() {
        // LDA #$50; ADC #$50 -> $A0, V set
        let mut cpu = cpu_with_prg(&[0xA9, 0x50, 0x69, 0x50]);
        cpu.step();
        cpu.step();
        assert_eq!(cpu.acc, 0xA0);
        assert!(cpu.status.contains(Status::V), "signed overflow sets V");
        assert!(cpu.status.contains(Status::N));
        assert!(!cpu.status.contains(Status::C));
    }

    #[test]
    fn sbc_is_adc_with_inverted_operand() {
        // SEC; LDA #$10; SBC #$08
        let mut cpu = cpu_with_prg(&[0x38, 0xA9, 0x10, 0xE9, 0x08]);
        cpu.step();
        cpu.step();
        cpu.step();
        assert_eq!(cpu.acc, 0x08);
        assert!(cpu.status.contains(Status::C), "no borrow leaves C set");
    }

    #[test]
    fn pha_pla_round_trip() {
        // LDA #$42; PHA; LDA #$00; PLA
        let mut cpu = cpu_with_prg(&[0xA9, 0x42, 0x48, 0xA9, 0x00, 0x68]);
        for _ in 0..4 {
            cpu.step();
        }
        assert_eq!(cpu.acc, 0x42);
    }

    #[test]
    fn php_plp_round_trip_masks_b() {
        // SEC; SED; PHP; CLC; CLD; PLP
        let mut cpu = cpu_with_prg(&[0x38, 0xF8, 0x08, 0x18, 0xD8, 0x28]);
        for _ in 0..6 {
            cpu.step();
        }
        assert!(cpu.status.contains(Status::C));
        assert!(cpu.status.contains(Status::D));
        assert!(cpu.status.contains(Status::U), "U forced on pull");
        assert!(!cpu.status.contains(Status::B), "B cleared on pull");
    }

    #[test]
    fn jsr_rts_round_trip() {
        // JSR $8005; NOP; NOP; RTS @ $8005
        let mut cpu = cpu_with_prg(&[0x20, 0x05, 0x80, 0xEA, 0xEA, 0x60]);
        assert_eq!(cpu.step(), 6, "JSR");
        assert_eq!(cpu.pc, 0x8005);
        assert_eq!(cpu.step(), 6, "RTS");
        assert_eq!(cpu.pc, 0x8003, "returns past the JSR operand");
    }

    #[test]
    fn brk_rti_round_trip() {
        // IRQ vector -> $8010 where RTI lives
        let mut prg = vec![0x00; 0x8000];
        prg[0] = 0x00; // BRK
        prg[0x10] = 0x40; // RTI
        prg[0x7FFC] = 0x00;
        prg[0x7FFD] = 0x80;
        prg[0x7FFE] = 0x10;
        prg[0x7FFF] = 0x80;
        let cart = Cart::from_parts(prg, vec![], Default::default(), 0, RamState::AllZeros)
            .expect("valid cart");
        let mut bus = Bus::default();
        bus.load_cart(cart);
        let mut cpu = Cpu::new(bus);
        cpu.reset(ResetKind::Hard);

        let status = cpu.status;
        assert_eq!(cpu.step(), 7, "BRK");
        assert_eq!(cpu.pc, 0x8010);
        assert!(cpu.status.contains(Status::I), "I set after BRK push");
        assert_eq!(cpu.step(), 6, "RTI");
        assert_eq!(cpu.pc, 0x8002, "BRK pushes PC past its padding byte");
        assert_eq!(cpu.status, status, "status round-trips (masked)");
    }

    #[test]
    fn jmp_indirect_page_wrap_bug() {
        // JMP ($02FF): low byte from $02FF, high byte from $0200 (not $0300)
        let mut cpu = cpu_with_prg(&[0x6C, 0xFF, 0x02]);
        cpu.bus.write(0x02FF, 0x34);
        cpu.bus.write(0x0200, 0x12);
        cpu.bus.write(0x0300, 0x56);
        assert_eq!(cpu.step(), 5, "JMP indirect");
        assert_eq!(cpu.pc, 0x1234);
    }

    #[test]
    fn rmw_performs_dummy_write() {
        // INC $0200: the original value is written back before the result
        let mut cpu = cpu_with_prg(&[0xEE, 0x00, 0x02]);
        cpu.bus.write(0x0200, 0x41);
        assert_eq!(cpu.step(), 6, "INC absolute");
        assert_eq!(cpu.bus.peek(0x0200), 0x42);
    }

    #[test]
    fn illegal_lax_loads_both_registers() {
        let mut cpu = cpu_with_prg(&[0xA7, 0x10]);
        cpu.bus.write(0x0010, 0x5A);
        assert_eq!(cpu.step(), 3, "*LAX zero page");
        assert_eq!(cpu.acc, 0x5A);
        assert_eq!(cpu.x, 0x5A);
    }

    #[test]
    fn undocumented_halts_stop_until_reset() {
        let mut cpu = cpu_with_prg(&[0x02, 0xEA]);
        cpu.step();
        assert!(cpu.halted, "STP halts the CPU");
        let pc = cpu.pc;
        assert_eq!(cpu.step(), 1, "halted CPU still reports cycles");
        assert_eq!(cpu.pc, pc, "no instruction fetch while halted");
        cpu.reset(ResetKind::Soft);
        assert!(!cpu.halted);
    }

    #[test]
    fn nmi_services_with_seven_cycles() {
        let mut prg = vec![0xEA; 0x8000];
        prg[0x7FFA] = 0x00; // NMI vector -> $9000
        prg[0x7FFB] = 0x90;
        prg[0x7FFC] = 0x00;
        prg[0x7FFD] = 0x80;
        let cart = Cart::from_parts(prg, vec![], Default::default(), 0, RamState::AllZeros)
            .expect("valid cart");
        let mut bus = Bus::default();
        bus.load_cart(cart);
        let mut cpu = Cpu::new(bus);
        cpu.reset(ResetKind::Hard);

        cpu.raise(Interrupt::Nmi);
        assert_eq!(cpu.step(), 7, "interrupt service consumes 7 cycles");
        assert_eq!(cpu.pc, 0x9000);
        assert!(cpu.pending.is_none(), "latch cleared when serviced");
    }

    #[test]
    fn irq_masked_by_i_flag() {
        let mut cpu = cpu_with_prg(&[0x58, 0xEA]); // CLI; NOP
        cpu.raise(Interrupt::Irq);
        let pc = cpu.pc;
        cpu.step(); // I still set from power-on: executes CLI instead
        assert_ne!(cpu.pc, pc, "IRQ not serviced while I is set");
        assert!(cpu.pending.is_some(), "IRQ stays latched");
        cpu.step();
        assert!(cpu.pending.is_none(), "serviced once I is clear");
    }

    #[test]
    fn nmi_wins_over_pending_irq() {
        let mut cpu = cpu_with_prg(&[0xEA]);
        cpu.raise(Interrupt::Nmi);
        cpu.raise(Interrupt::Irq);
        assert_eq!(cpu.pending, Some(Interrupt::Nmi), "IRQ can't overwrite NMI");
    }
}
