use crate::bitwise::Bits;
use crate::cpu::alu::{barrel_shift, ShiftKind};
use crate::cpu::arm::instructions::{
    ArmModeAluInstr, ArmModeInstruction, ArmModeOpcode, SingleDataTransferOffsetInfo,
};
use crate::cpu::arm9::Arm9;
use crate::cpu::flags::{Indexing, LoadStoreKind, Offsetting, OperandKind, ReadWriteKind};
use crate::cpu::registers::{REG_LR, REG_PC};

pub const SIZE_OF_INSTRUCTION: u32 = 4;

impl Arm9 {
    pub fn execute_arm(&mut self, op_code: ArmModeOpcode) {
        // A failed predicate skips the instruction with no flag updates,
        // barrel-shifter carry included.
        if !self.cpsr.can_execute(op_code.condition) {
            return;
        }

        match op_code.instruction {
            ArmModeInstruction::DataProcessing {
                alu_instruction,
                set_conditions,
                op_kind,
                rn,
                rd,
                ..
            } => self.data_processing(&op_code, alu_instruction, set_conditions, op_kind, rn, rd),
            ArmModeInstruction::BranchAndExchange { link, rm, .. } => {
                self.branch_and_exchange(link, rm);
            }
            ArmModeInstruction::SingleDataTransfer {
                kind,
                quantity,
                indexing,
                offsetting,
                write_back,
                rd,
                rn,
                offset_info,
                ..
            } => self.single_data_transfer(
                &op_code,
                kind,
                quantity,
                indexing,
                offsetting,
                write_back,
                rd,
                rn,
                offset_info,
            ),
            ArmModeInstruction::BlockDataTransfer {
                indexing,
                offsetting,
                write_back,
                load_store,
                rn,
                register_list,
                ..
            } => self.block_data_transfer(
                indexing,
                offsetting,
                write_back,
                load_store,
                rn,
                register_list,
            ),
            ArmModeInstruction::Branch { link, offset, .. } => self.branch(link, offset),
            // Recognized, printed by the trace, no architectural effect.
            ArmModeInstruction::SoftwareInterrupt { .. }
            | ArmModeInstruction::CoprocessorRegisterTransfer
            | ArmModeInstruction::Unknown { .. } => {}
        }
    }

    /// Operand-2 pipeline: bits 11..7 give the amount, bits 6..5 the kind.
    ///
    /// A zero amount passes the value through untouched. Otherwise, when the
    /// opcode's S bit is set, C receives the shifted-out bit, except for
    /// ROR, which never touches C on this path.
    pub(crate) fn shift_operand(&mut self, op_code: u32, value: u32) -> u32 {
        let amount = op_code.get_bits(7..=11);
        if amount == 0 {
            return value;
        }

        let kind = ShiftKind::from(op_code.get_bits(5..=6));
        let out = barrel_shift(kind, amount, value);
        if op_code.get_bit(20) && kind != ShiftKind::Ror {
            self.cpsr.set_carry_flag(out.carry);
        }

        out.result
    }

    #[allow(clippy::too_many_lines)]
    fn data_processing(
        &mut self,
        op_code: &ArmModeOpcode,
        alu_instruction: ArmModeAluInstr,
        set_conditions: bool,
        op_kind: OperandKind,
        rn: usize,
        rd: usize,
    ) {
        use ArmModeAluInstr::*;

        let imm8 = op_code.get_bits(0..=7);
        let rotation = op_code.get_bits(8..=11) * 2;
        let rm = op_code.get_bits(0..=3) as usize;
        let immediate = op_kind == OperandKind::Immediate;

        let rn_val = self.registers.register_at(rn);
        let op2 = match op_kind {
            OperandKind::Immediate => imm8.rotate_right(rotation),
            OperandKind::Register => {
                let rm_val = self.registers.register_at(rm);
                self.shift_operand(op_code.raw, rm_val)
            }
        };

        match alu_instruction {
            And => {
                let result = rn_val & op2;
                self.registers.set_register_at(rd, result);
                if set_conditions {
                    self.set_nz(result);
                }
            }
            Eor => {
                let result = rn_val ^ op2;
                self.registers.set_register_at(rd, result);
                if set_conditions {
                    self.set_nz(result);
                }
            }
            Sub => {
                self.registers.set_register_at(rd, rn_val.wrapping_sub(op2));
                if set_conditions {
                    // Flag formulas read the file after the write, exactly
                    // as this machine defines them.
                    let rn_now = self.registers.register_at(rn);
                    let rd_now = self.registers.register_at(rd);
                    let carry = if immediate {
                        rn_now >= imm8.rotate_right(rotation)
                    } else {
                        rn_now < rd_now
                    };
                    self.cpsr.set_carry_flag(carry);
                    self.cpsr
                        .set_overflow_flag(rn_now.get_bit(31) && !rd_now.get_bit(31));
                    self.set_nz(rd_now);
                }
            }
            Rsb => {
                self.registers.set_register_at(rd, op2.wrapping_sub(rn_val));
                if set_conditions {
                    let rn_now = self.registers.register_at(rn);
                    let rd_now = self.registers.register_at(rd);
                    // Both forms take the V sign term from the unrotated
                    // 8-bit immediate field, which can never carry bit 31,
                    // so RSB with S always clears V.
                    let (carry, second) = if immediate {
                        (rn_now > imm8, imm8)
                    } else {
                        let rm_now = self.registers.register_at(rm);
                        (rn_now > rm_now, rm_now)
                    };
                    let overflow =
                        imm8.get_bit(31) && !second.wrapping_sub(rn_now).get_bit(31);
                    self.cpsr.set_carry_flag(carry);
                    self.cpsr.set_overflow_flag(overflow);
                    self.set_nz(rd_now);
                }
            }
            Add => {
                let mut result = rn_val.wrapping_add(op2);
                // PC as first operand reads a further word ahead.
                if rn == REG_PC {
                    result = result.wrapping_add(4);
                }
                self.registers.set_register_at(rd, result);
                if set_conditions {
                    let rn_now = self.registers.register_at(rn);
                    let rd_now = self.registers.register_at(rd);
                    self.cpsr.set_carry_flag(rd_now < rn_now);
                    self.cpsr
                        .set_overflow_flag(rn_now.get_bit(31) && !rd_now.get_bit(31));
                    self.set_nz(rd_now);
                }
            }
            Adc => {
                let carry_in = u32::from(self.cpsr.carry_flag());
                let result = rn_val.wrapping_add(op2).wrapping_add(carry_in);
                self.registers.set_register_at(rd, result);
                if set_conditions {
                    self.set_nz(result);
                }
            }
            Sbc => {
                let borrow_in = u32::from(!self.cpsr.carry_flag());
                let result = rn_val.wrapping_sub(op2).wrapping_sub(borrow_in);
                self.registers.set_register_at(rd, result);
                if set_conditions {
                    let rn_now = self.registers.register_at(rn);
                    let rd_now = self.registers.register_at(rd);
                    self.cpsr.set_carry_flag(rd_now > rn_now);
                    self.cpsr
                        .set_overflow_flag(rn_now.get_bit(31) && !rd_now.get_bit(31));
                    self.set_nz(rd_now);
                }
            }
            Rsc => {
                let borrow_in = u32::from(!self.cpsr.carry_flag());
                let result = op2.wrapping_sub(rn_val).wrapping_sub(borrow_in);
                self.registers.set_register_at(rd, result);
                if set_conditions {
                    let rn_now = self.registers.register_at(rn);
                    let rd_now = self.registers.register_at(rd);
                    let (carry, overflow) = if immediate {
                        (
                            rd_now > imm8,
                            self.registers.register_at(rm).get_bit(31) && !rd_now.get_bit(31),
                        )
                    } else {
                        (
                            rd_now > self.registers.register_at(rm),
                            rn_now.get_bit(31) && !rd_now.get_bit(31),
                        )
                    };
                    self.cpsr.set_carry_flag(carry);
                    self.cpsr.set_overflow_flag(overflow);
                    self.set_nz(rd_now);
                }
            }
            Tst => {
                if set_conditions {
                    self.set_nz(rn_val & op2);
                } else {
                    // MRS: CPSR into Rd.
                    self.registers.set_register_at(rd, self.cpsr.value());
                }
            }
            Teq => {
                if set_conditions {
                    self.set_nz(rn_val ^ op2);
                } else {
                    // MSR: Rm with the I bit set, the raw 8-bit immediate
                    // with it clear.
                    let value = if immediate {
                        self.registers.register_at(rm)
                    } else {
                        imm8
                    };
                    self.cpsr = value.into();
                }
            }
            Cmp => {
                if set_conditions {
                    let value = if immediate {
                        imm8.rotate_right(rotation)
                    } else {
                        self.registers.register_at(rm)
                    };
                    self.subtraction(rn_val, value);
                }
                // S clear: MRS on SPSR, recognized only.
            }
            Cmn => {
                if set_conditions {
                    let a = self.registers.register_at(rd);
                    let b = self.registers.register_at(rm);
                    self.addition(a, b);
                }
                // S clear: MSR on SPSR, recognized only.
            }
            Orr => {
                let result = rn_val | op2;
                self.registers.set_register_at(rd, result);
                if set_conditions {
                    self.set_nz(result);
                }
            }
            Mov => {
                self.registers.set_register_at(rd, op2);
                if set_conditions {
                    self.set_nz(op2);
                }
            }
            Bic => {
                // Register form clears bits in Rd itself, not Rn.
                let base = if immediate {
                    rn_val
                } else {
                    self.registers.register_at(rd)
                };
                let result = base & !op2;
                self.registers.set_register_at(rd, result);
                if set_conditions {
                    self.set_nz(result);
                }
            }
            Mvn => {
                let result = !op2;
                self.registers.set_register_at(rd, result);
                if set_conditions {
                    self.set_nz(result);
                }
            }
        }
    }

    fn branch_and_exchange(&mut self, link: bool, rm: usize) {
        if link {
            let pc = self.registers.program_counter();
            self.registers.set_register_at(REG_LR, pc);
        }

        let target = self.registers.register_at(rm);
        self.cpsr.set_state_bit(target.get_bit(0));
        self.registers.set_program_counter(target & !1);
    }

    #[allow(clippy::too_many_arguments)]
    fn single_data_transfer(
        &mut self,
        op_code: &ArmModeOpcode,
        kind: LoadStoreKind,
        quantity: ReadWriteKind,
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        rd: usize,
        rn: usize,
        offset_info: SingleDataTransferOffsetInfo,
    ) {
        // Loads through R15 are PC-relative literals: base + imm12, one
        // further word ahead.
        if kind == LoadStoreKind::Load && rn == REG_PC {
            let offset = match offset_info {
                SingleDataTransferOffsetInfo::Immediate { offset } => offset,
                SingleDataTransferOffsetInfo::Register { .. } => unreachable!(),
            };
            let address = self
                .registers
                .program_counter()
                .wrapping_add(offset)
                .wrapping_add(4);
            let value = self.memory.read_word(address);
            self.registers.set_register_at(rd, value);
            return;
        }

        let offset = match offset_info {
            SingleDataTransferOffsetInfo::Immediate { offset } => offset,
            SingleDataTransferOffsetInfo::Register { register, .. } => {
                let rm_val = self.registers.register_at(register);
                self.shift_operand(op_code.raw, rm_val)
            }
        };

        let base = self.registers.register_at(rn);
        let indexed = match offsetting {
            Offsetting::Up => base.wrapping_add(offset),
            Offsetting::Down => base.wrapping_sub(offset),
        };

        if indexing == Indexing::Pre && write_back {
            self.registers.set_register_at(rn, indexed);
        }

        // The transfer goes through the base register as it stands now:
        // pre-indexed only reaches the offset address via the writeback.
        let address = self.registers.register_at(rn);
        match (kind, quantity) {
            (LoadStoreKind::Load, ReadWriteKind::Word) => {
                let value = self.memory.read_word(address);
                self.registers.set_register_at(rd, value);
            }
            (LoadStoreKind::Load, ReadWriteKind::Byte) => {
                let value = u32::from(self.memory.read_at(address));
                self.registers.set_register_at(rd, value);
            }
            (LoadStoreKind::Store, ReadWriteKind::Word) => {
                self.memory
                    .write_word(address, self.registers.register_at(rd));
            }
            (LoadStoreKind::Store, ReadWriteKind::Byte) => {
                self.memory
                    .write_at(address, self.registers.register_at(rd) as u8);
            }
        }

        // Post-indexed always writes the final address back.
        if indexing == Indexing::Post {
            self.registers.set_register_at(rn, indexed);
        }
    }

    fn block_data_transfer(
        &mut self,
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        load_store: LoadStoreKind,
        rn: usize,
        register_list: u32,
    ) {
        let span = register_list.count_ones() << 2;
        let base = self.registers.register_at(rn);

        let (start, end) = match (indexing, offsetting) {
            // Post-decrement
            (Indexing::Post, Offsetting::Down) => {
                let start = base.wrapping_sub(span).wrapping_add(4);
                (start, start.wrapping_sub(span))
            }
            // Post-increment
            (Indexing::Post, Offsetting::Up) => (base, base.wrapping_add(span)),
            // Pre-decrement
            (Indexing::Pre, Offsetting::Down) => {
                let start = base.wrapping_sub(span);
                (start, start)
            }
            // Pre-increment
            (Indexing::Pre, Offsetting::Up) => {
                let start = base.wrapping_add(4);
                (start, start.wrapping_add(span))
            }
        };

        let mut address = start;
        for i in 0..16 {
            if !register_list.get_bit(i) {
                continue;
            }

            match load_store {
                LoadStoreKind::Load => {
                    let value = self.memory.read_word(address);
                    self.registers.set_register_at(i as usize, value);
                }
                LoadStoreKind::Store => {
                    self.memory
                        .write_word(address, self.registers.register_at(i as usize));
                }
            }
            address = address.wrapping_add(4);
        }

        if write_back {
            self.registers.set_register_at(rn, end);
        }
    }

    fn branch(&mut self, link: bool, offset: u32) {
        let pc = self.registers.program_counter();
        if link {
            self.registers.set_register_at(REG_LR, pc);
        }

        self.registers.set_program_counter(pc.wrapping_add(offset));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn cpu_with_ram() -> Arm9 {
        let mut cpu = Arm9::default();
        cpu.memory.create(0, 0x4000);
        cpu
    }

    fn execute(cpu: &mut Arm9, raw: u32) {
        cpu.execute_arm(ArmModeOpcode::from(raw));
    }

    #[test]
    fn mov_immediate() {
        let mut cpu = Arm9::default();

        // mov r1, #0x64
        execute(&mut cpu, 0xE3A0_1064);

        assert_eq!(cpu.registers.register_at(1), 0x64);
        assert!(!cpu.cpsr.sign_flag());
        assert!(!cpu.cpsr.zero_flag());
    }

    #[test]
    fn movs_sets_nz() {
        let mut cpu = Arm9::default();

        // movs r0, #0
        execute(&mut cpu, 0xE3B0_0000);
        assert!(cpu.cpsr.zero_flag());

        // movs r0, #0xFF000000 (0xFF ror 8)
        execute(&mut cpu, 0xE3B0_04FF);
        assert_eq!(cpu.registers.register_at(0), 0xFF00_0000);
        assert!(cpu.cpsr.sign_flag());
        assert!(!cpu.cpsr.zero_flag());
    }

    #[test]
    fn adds_with_carry_out() {
        let mut cpu = Arm9::default();
        cpu.registers.set_register_at(0, 0xFFFF_FFFE);
        cpu.registers.set_register_at(1, 5);

        // adds r2, r0, r1
        execute(&mut cpu, 0xE090_2001);

        assert_eq!(cpu.registers.register_at(2), 3);
        assert!(cpu.cpsr.carry_flag());
        assert!(!cpu.cpsr.overflow_flag());
        assert!(!cpu.cpsr.zero_flag());
        assert!(!cpu.cpsr.sign_flag());
    }

    #[test]
    fn add_through_pc_reads_one_word_further() {
        let mut cpu = Arm9::default();
        cpu.registers.set_program_counter(0x1000);

        // add r0, pc, #0
        execute(&mut cpu, 0xE28F_0000);

        assert_eq!(cpu.registers.register_at(0), 0x1004);
    }

    #[test]
    fn cmp_equal_registers() {
        let mut cpu = Arm9::default();
        cpu.registers.set_register_at(3, 77);
        cpu.registers.set_register_at(4, 77);

        // cmp r3, r4
        execute(&mut cpu, 0xE153_0004);

        assert!(cpu.cpsr.zero_flag());
        assert!(!cpu.cpsr.sign_flag());
        assert!(cpu.cpsr.carry_flag());
        assert!(!cpu.cpsr.overflow_flag());
        // Register file untouched
        assert_eq!(cpu.registers.register_at(3), 77);
        assert_eq!(cpu.registers.register_at(4), 77);
    }

    #[test]
    fn condition_failure_skips_everything() {
        let mut cpu = Arm9::default();
        cpu.registers.set_register_at(1, 9);

        // moveq r1, #0x64 with Z clear
        execute(&mut cpu, 0x03A0_1064);

        assert_eq!(cpu.registers.register_at(1), 9);

        // subeqs r1, r1, #1 with Z clear: flags must stay put too
        execute(&mut cpu, 0x0251_1001);
        assert!(!cpu.cpsr.zero_flag());
        assert!(!cpu.cpsr.carry_flag());
        assert_eq!(cpu.registers.register_at(1), 9);
    }

    #[test]
    fn operand_shift_applies_and_sets_carry_when_s() {
        let mut cpu = Arm9::default();
        cpu.registers.set_register_at(2, 0x8000_0001);

        // movs r3, r2, lsl #1
        execute(&mut cpu, 0xE1B0_3082);

        assert_eq!(cpu.registers.register_at(3), 2);
        assert!(cpu.cpsr.carry_flag());

        // mov r3, r2, lsl #1 (no S): carry untouched
        cpu.cpsr.set_carry_flag(false);
        execute(&mut cpu, 0xE1A0_3082);
        assert_eq!(cpu.registers.register_at(3), 2);
        assert!(!cpu.cpsr.carry_flag());
    }

    #[test]
    fn teq_and_tst_update_nz_only() {
        let mut cpu = Arm9::default();
        cpu.registers.set_register_at(0, 0b1100);
        cpu.registers.set_register_at(1, 0b1100);

        // teq r0, r1
        execute(&mut cpu, 0xE130_0001);
        assert!(cpu.cpsr.zero_flag());

        // tst r0, #0b0100
        execute(&mut cpu, 0xE310_0004);
        assert!(!cpu.cpsr.zero_flag());
    }

    #[test]
    fn mrs_and_msr_move_the_status_word() {
        let mut cpu = Arm9::default();
        cpu.cpsr.set_carry_flag(true);
        cpu.cpsr.set_zero_flag(true);

        // mrs r4, cpsr
        execute(&mut cpu, 0xE10F_4000);
        assert_eq!(cpu.registers.register_at(4), cpu.cpsr.value());

        // msr cpsr, r5 (register form carries the I bit on this machine)
        cpu.registers.set_register_at(5, 1 << 31);
        execute(&mut cpu, 0xE329_F005);
        assert!(cpu.cpsr.sign_flag());
        assert!(!cpu.cpsr.carry_flag());
    }

    #[test]
    fn ldr_and_str_word() {
        let mut cpu = cpu_with_ram();
        cpu.memory.write_word(0x100, 0xCAFE_BABE);
        cpu.registers.set_register_at(1, 0x100);

        // ldr r0, [r1]
        execute(&mut cpu, 0xE591_0000);
        assert_eq!(cpu.registers.register_at(0), 0xCAFE_BABE);

        // str r0, [r2] with r2 = 0x200
        cpu.registers.set_register_at(2, 0x200);
        execute(&mut cpu, 0xE582_0000);
        assert_eq!(cpu.memory.read_word(0x200), 0xCAFE_BABE);
    }

    #[test]
    fn ldrb_zero_extends() {
        let mut cpu = cpu_with_ram();
        cpu.memory.write_at(0x80, 0xFE);
        cpu.registers.set_register_at(1, 0x80);

        // ldrb r0, [r1]
        execute(&mut cpu, 0xE5D1_0000);
        assert_eq!(cpu.registers.register_at(0), 0xFE);
    }

    #[test]
    fn ldr_pc_literal() {
        let mut cpu = cpu_with_ram();
        // Literal pool word at pc + imm12 + 4
        cpu.memory.write_word(0x10C, 0x1234_5678);
        cpu.registers.set_program_counter(0x100);

        // ldr r0, [pc, #0x8]
        execute(&mut cpu, 0xE59F_0008);
        assert_eq!(cpu.registers.register_at(0), 0x1234_5678);
    }

    #[test]
    fn pre_index_with_writeback_transfers_at_offset_address() {
        let mut cpu = cpu_with_ram();
        cpu.memory.write_word(0x140, 0xAA55_AA55);
        cpu.registers.set_register_at(1, 0x100);

        // ldr r0, [r1, #0x40]!
        execute(&mut cpu, 0xE5B1_0040);

        assert_eq!(cpu.registers.register_at(0), 0xAA55_AA55);
        assert_eq!(cpu.registers.register_at(1), 0x140);
    }

    #[test]
    fn post_index_transfers_at_base_then_writes_back() {
        let mut cpu = cpu_with_ram();
        cpu.memory.write_word(0x100, 7);
        cpu.registers.set_register_at(1, 0x100);

        // ldr r0, [r1], #0x40 (post, up, W clear: writeback is implicit)
        execute(&mut cpu, 0xE491_0040);

        assert_eq!(cpu.registers.register_at(0), 7);
        assert_eq!(cpu.registers.register_at(1), 0x140);
    }

    #[test]
    fn block_transfer_increment_after() {
        let mut cpu = cpu_with_ram();
        cpu.registers.set_register_at(13, 0x1000);
        cpu.memory.write_word(0x1000, 1);
        cpu.memory.write_word(0x1004, 5);
        cpu.memory.write_word(0x1008, 7);

        // ldmia r13!, {r1, r5, r7}
        execute(&mut cpu, 0xE8BD_00A2);

        assert_eq!(cpu.registers.register_at(1), 1);
        assert_eq!(cpu.registers.register_at(5), 5);
        assert_eq!(cpu.registers.register_at(7), 7);
        assert_eq!(cpu.registers.register_at(13), 0x100C);
    }

    #[test]
    fn block_transfer_store_decrement_before() {
        let mut cpu = cpu_with_ram();
        for r in 0..8 {
            cpu.registers.set_register_at(r, r as u32 * 10);
        }
        cpu.registers.set_register_at(13, 0x1000);

        // stmdb r13!, {r1, r5, r7}
        execute(&mut cpu, 0xE92D_00A2);

        assert_eq!(cpu.memory.read_word(0x0FF4), 10);
        assert_eq!(cpu.memory.read_word(0x0FF8), 50);
        assert_eq!(cpu.memory.read_word(0x0FFC), 70);
        assert_eq!(cpu.registers.register_at(13), 0x0FF4);
    }

    #[test]
    fn branch_with_link() {
        let mut cpu = Arm9::default();
        // Harness has already advanced PC past the instruction at 0.
        cpu.registers.set_program_counter(4);

        // bl +0x10 (offset24 = 2)
        execute(&mut cpu, 0xEB00_0002);

        assert_eq!(cpu.registers.register_at(REG_LR), 4);
        assert_eq!(cpu.registers.program_counter(), 0x10);
    }

    #[test]
    fn branch_backwards() {
        let mut cpu = Arm9::default();
        cpu.registers.set_program_counter(0x104);

        // b -32 (offset24 = -9 → displacement -36+4)
        execute(&mut cpu, 0xEAFF_FFF7);

        assert_eq!(cpu.registers.program_counter(), 0x104 - 32);
    }

    #[test]
    fn branch_condition_not_taken() {
        let mut cpu = Arm9::default();
        cpu.registers.set_program_counter(0x104);

        // beq +… with Z clear
        execute(&mut cpu, 0x0B00_0002);

        assert_eq!(cpu.registers.program_counter(), 0x104);
        assert_eq!(cpu.registers.register_at(REG_LR), 0);
    }

    #[test]
    fn bx_flips_thumb_bit_and_clears_low_bit() {
        let mut cpu = Arm9::default();
        cpu.registers.set_register_at(3, 0x2001);

        // bx r3
        execute(&mut cpu, 0xE12F_FF13);

        assert!(cpu.cpsr.state_bit());
        assert_eq!(cpu.registers.program_counter(), 0x2000);

        // bx r4 with bit 0 clear goes back to ARM
        cpu.registers.set_register_at(4, 0x3000);
        execute(&mut cpu, 0xE12F_FF14);
        assert!(!cpu.cpsr.state_bit());
        assert_eq!(cpu.registers.program_counter(), 0x3000);
    }

    #[test]
    fn blx_links_post_increment_pc() {
        let mut cpu = Arm9::default();
        cpu.registers.set_program_counter(0x104);
        cpu.registers.set_register_at(2, 0x501);

        // blx r2
        execute(&mut cpu, 0xE12F_FF32);

        assert_eq!(cpu.registers.register_at(REG_LR), 0x104);
        assert_eq!(cpu.registers.program_counter(), 0x500);
        assert!(cpu.cpsr.state_bit());
    }

    #[test]
    fn swi_and_mrc_have_no_architectural_effect() {
        let mut cpu = Arm9::default();
        cpu.registers.set_register_at(0, 42);

        execute(&mut cpu, 0xEF00_002A); // swi 0x2A
        execute(&mut cpu, 0xEE10_1F10); // mrc

        assert_eq!(cpu.registers.register_at(0), 42);
        assert_eq!(cpu.registers.program_counter(), 0);
    }

    #[test]
    fn sub_flag_contract() {
        let mut cpu = Arm9::default();
        cpu.registers.set_register_at(0, 5);

        // subs r1, r0, #3
        execute(&mut cpu, 0xE250_1003);
        assert_eq!(cpu.registers.register_at(1), 2);
        assert!(cpu.cpsr.carry_flag()); // rn >= imm
        assert!(!cpu.cpsr.zero_flag());
        assert!(!cpu.cpsr.sign_flag());

        // subs r1, r0, #9
        execute(&mut cpu, 0xE250_1009);
        assert_eq!(cpu.registers.register_at(1), 5u32.wrapping_sub(9));
        assert!(!cpu.cpsr.carry_flag());
        assert!(cpu.cpsr.sign_flag());
    }

    #[test]
    fn rsb_register_form_always_clears_overflow() {
        let mut cpu = Arm9::default();
        cpu.cpsr.set_overflow_flag(true);
        cpu.registers.set_register_at(0, 1);
        cpu.registers.set_register_at(2, 0x8000_0000);

        // rsbs r1, r0, r2 with Rm bit 31 set
        execute(&mut cpu, 0xE070_1002);

        assert_eq!(cpu.registers.register_at(1), 0x7FFF_FFFF);
        assert!(!cpu.cpsr.overflow_flag());
        assert!(!cpu.cpsr.sign_flag());
        assert!(!cpu.cpsr.carry_flag()); // C asks rn > rm
    }

    #[test]
    fn bic_register_form_clears_in_rd() {
        let mut cpu = Arm9::default();
        cpu.registers.set_register_at(0, 0b1111);
        cpu.registers.set_register_at(2, 0b0101);

        // bic r0, r1, r2: register form reads Rd as its first operand
        execute(&mut cpu, 0xE1C1_0002);

        assert_eq!(cpu.registers.register_at(0), 0b1010);
    }
}
