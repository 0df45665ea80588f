//! # Processor Harness
//!
//! [`Arm9`] owns everything a step needs: the register file, both status
//! words, the memory registry, and the breakpoint set. One [`Arm9::step`]
//! fetches, traces and executes exactly one instruction of whichever
//! encoding the CPSR's T bit selects.
//!
//! The trace is written straight to stdout; its line format is a stable
//! interface, so it never goes through the diagnostic logger.

use serde::Serialize;

use crate::bitwise::Bits;
use crate::cpu::alu;
use crate::cpu::arm::instructions::ArmModeOpcode;
use crate::cpu::arm::operations::SIZE_OF_INSTRUCTION as ARM_INSTRUCTION_SIZE;
use crate::cpu::psr::{CpuState, Psr};
use crate::cpu::registers::{Registers, REG_SP};
use crate::cpu::thumb::instruction::ThumbModeOpcode;
use crate::cpu::thumb::operations::SIZE_OF_INSTRUCTION as THUMB_INSTRUCTION_SIZE;
use crate::memory::Memory;

pub struct Arm9 {
    pub memory: Memory,

    pub cpsr: Psr,
    pub spsr: Psr,
    pub registers: Registers,

    breakpoints: Vec<u32>,
}

impl Default for Arm9 {
    fn default() -> Self {
        Self::new(Memory::default())
    }
}

impl Arm9 {
    pub fn new(memory: Memory) -> Self {
        Self {
            memory,
            cpsr: Psr::default(),
            spsr: Psr::default(),
            registers: Registers::default(),
            breakpoints: Vec::new(),
        }
    }

    /// Clears every register and both status words. Mapped memory is not
    /// touched; the registry has its own lifecycle.
    pub fn unload(&mut self) {
        self.registers.clear();
        self.cpsr = Psr::default();
        self.spsr = Psr::default();
    }

    /// Installs the entry point. The T bit is not inferred: loaded images
    /// always begin in ARM state.
    pub fn set_pc(&mut self, entry: u32) {
        self.registers.set_program_counter(entry);
    }

    /// Executes one instruction.
    ///
    /// Returns `false` when the (bit-0-stripped) PC sits on a breakpoint,
    /// without executing anything.
    pub fn step(&mut self) -> bool {
        // A residual Thumb tag from BX must not taint the fetch address.
        let pc = self.registers.program_counter() & !1;
        self.registers.set_program_counter(pc);

        if self.break_find(pc) {
            println!("BREAKPOINT! (0x{pc:X})");
            return false;
        }

        match self.cpsr.cpu_state() {
            CpuState::Thumb => self.parse_thumb(),
            CpuState::Arm => self.parse_arm(),
        }

        true
    }

    fn parse_arm(&mut self) {
        let pc = self.registers.program_counter();
        let raw = self.memory.read_word(pc);
        self.registers
            .set_program_counter(pc.wrapping_add(ARM_INSTRUCTION_SIZE));

        let op_code = ArmModeOpcode::from(raw);
        println!("{pc:08X} [A] {}", op_code.instruction.disassemble());

        self.execute_arm(op_code);
    }

    fn parse_thumb(&mut self) {
        let pc = self.registers.program_counter();
        let raw = self.memory.read_half_word(pc);
        self.registers
            .set_program_counter(pc.wrapping_add(THUMB_INSTRUCTION_SIZE));

        let op_code = ThumbModeOpcode::from(raw);
        println!("{pc:08X} [T] {}", op_code.instruction.disassemble());

        self.execute_thumb(op_code);
    }

    pub fn break_add(&mut self, address: u32) {
        if !self.break_find(address) {
            self.breakpoints.push(address);
        }
    }

    pub fn break_del(&mut self, address: u32) {
        self.breakpoints.retain(|&breakpoint| breakpoint != address);
    }

    #[must_use]
    pub fn break_find(&self, address: u32) -> bool {
        self.breakpoints.contains(&address)
    }

    /// Full-descending word push through SP.
    pub(crate) fn push(&mut self, value: u32) {
        let sp = self.registers.register_at(REG_SP).wrapping_sub(4);
        self.registers.set_register_at(REG_SP, sp);
        self.memory.write_word(sp, value);
    }

    /// Word pop through SP.
    pub(crate) fn pop(&mut self) -> u32 {
        let sp = self.registers.register_at(REG_SP);
        self.registers.set_register_at(REG_SP, sp.wrapping_add(4));
        self.memory.read_word(sp)
    }

    /// `a + b`, all four flags applied.
    pub(crate) fn addition(&mut self, a: u32, b: u32) -> u32 {
        let result = alu::addition(a, b);
        self.cpsr.set_flags(&result);
        result.result
    }

    /// `a - b`, all four flags applied (C is no-borrow).
    pub(crate) fn subtraction(&mut self, a: u32, b: u32) -> u32 {
        let result = alu::subtraction(a, b);
        self.cpsr.set_flags(&result);
        result.result
    }

    pub(crate) fn set_nz(&mut self, result: u32) {
        self.cpsr.set_zero_flag(result == 0);
        self.cpsr.set_sign_flag(result.get_bit(31));
    }

    /// Serializable view of the whole processor state.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot<'_> {
        StateSnapshot {
            registers: &self.registers,
            cpsr: self.cpsr.value(),
            spsr: self.spsr.value(),
        }
    }

    /// Prints all sixteen registers, then the decoded CPSR and the SPSR.
    pub fn dump_regs(&self) {
        println!("REGISTERS DUMP:");
        println!("===============");

        for i in (0..16).step_by(2) {
            println!(
                "r{:<2}: 0x{:08X}\t\tr{:<2}: 0x{:08X}",
                i,
                self.registers.register_at(i),
                i + 1,
                self.registers.register_at(i + 1)
            );
        }

        println!();
        println!(
            "cpsr: 0x{:08X} (z: {}, n: {}, c: {}, v: {}, I: {}, F: {}, t: {}, mode: {})",
            self.cpsr.value(),
            u8::from(self.cpsr.zero_flag()),
            u8::from(self.cpsr.sign_flag()),
            u8::from(self.cpsr.carry_flag()),
            u8::from(self.cpsr.overflow_flag()),
            u8::from(self.cpsr.irq_disable()),
            u8::from(self.cpsr.fiq_disable()),
            u8::from(self.cpsr.state_bit()),
            self.cpsr.mode_raw(),
        );
        println!("spsr: 0x{:08X}", self.spsr.value());
    }

    /// Prints `count` words at and above SP.
    pub fn dump_stack(&self, count: u32) {
        println!("STACK DUMP:");
        println!("===========");

        let sp = self.registers.register_at(REG_SP);
        for i in 0..count {
            let address = sp.wrapping_add(i << 2);
            println!("[{i:02}] 0x{:08X}", self.memory.read_word(address));
        }
    }
}

/// What `--state-json` writes: the register file and both status words.
#[derive(Serialize)]
pub struct StateSnapshot<'a> {
    pub registers: &'a Registers,
    pub cpsr: u32,
    pub spsr: u32,
}
