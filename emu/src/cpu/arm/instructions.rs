use std::ops::Deref;

use crate::bitwise::Bits;
use crate::cpu::alu::ShiftKind;
use crate::cpu::condition::Condition;
use crate::cpu::flags::{Indexing, LoadStoreKind, Offsetting, OperandKind, ReadWriteKind};
use crate::cpu::registers::REG_PC;

/// ARM mode ALU sub-opcodes, bits 24-21 of a data processing instruction.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ArmModeAluInstr {
    /// Logical AND: `Rd = Rn AND Op2`
    And = 0x0,
    /// Exclusive OR: `Rd = Rn XOR Op2`
    Eor = 0x1,
    /// Subtract: `Rd = Rn - Op2`
    Sub = 0x2,
    /// Reverse Subtract: `Rd = Op2 - Rn`
    Rsb = 0x3,
    /// Add: `Rd = Rn + Op2`
    Add = 0x4,
    /// Add with Carry: `Rd = Rn + Op2 + C`
    Adc = 0x5,
    /// Subtract with Carry: `Rd = Rn - Op2 - !C`
    Sbc = 0x6,
    /// Reverse Subtract with Carry: `Rd = Op2 - Rn - !C`
    Rsc = 0x7,
    /// Test bits (flags only). With S clear this slot encodes MRS.
    Tst = 0x8,
    /// Test equivalence (flags only). With S clear this slot encodes MSR.
    Teq = 0x9,
    /// Compare (flags only). With S clear: MRS on SPSR, recognized only.
    Cmp = 0xA,
    /// Compare negative (flags only). With S clear: MSR on SPSR, recognized only.
    Cmn = 0xB,
    /// Logical OR: `Rd = Rn OR Op2`
    Orr = 0xC,
    /// Move: `Rd = Op2`
    Mov = 0xD,
    /// Bit Clear: `Rd = Rn AND NOT Op2`
    Bic = 0xE,
    /// Move Not: `Rd = NOT Op2`
    Mvn = 0xF,
}

impl From<u32> for ArmModeAluInstr {
    fn from(alu_op_code: u32) -> Self {
        match alu_op_code {
            0x0 => Self::And,
            0x1 => Self::Eor,
            0x2 => Self::Sub,
            0x3 => Self::Rsb,
            0x4 => Self::Add,
            0x5 => Self::Adc,
            0x6 => Self::Sbc,
            0x7 => Self::Rsc,
            0x8 => Self::Tst,
            0x9 => Self::Teq,
            0xA => Self::Cmp,
            0xB => Self::Cmn,
            0xC => Self::Orr,
            0xD => Self::Mov,
            0xE => Self::Bic,
            0xF => Self::Mvn,
            _ => unreachable!(),
        }
    }
}

impl std::fmt::Display for ArmModeAluInstr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => f.write_str("and"),
            Self::Eor => f.write_str("eor"),
            Self::Sub => f.write_str("sub"),
            Self::Rsb => f.write_str("rsb"),
            Self::Add => f.write_str("add"),
            Self::Adc => f.write_str("adc"),
            Self::Sbc => f.write_str("sbc"),
            Self::Rsc => f.write_str("rsc"),
            Self::Tst => f.write_str("tst"),
            Self::Teq => f.write_str("teq"),
            Self::Cmp => f.write_str("cmp"),
            Self::Cmn => f.write_str("cmn"),
            Self::Orr => f.write_str("orr"),
            Self::Mov => f.write_str("mov"),
            Self::Bic => f.write_str("bic"),
            Self::Mvn => f.write_str("mvn"),
        }
    }
}

/// The flexible second operand of a data processing instruction.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AluSecondOperandInfo {
    /// A register passed through the barrel shifter by an immediate amount.
    Register {
        register: usize,
        shift_kind: ShiftKind,
        shift_amount: u32,
    },
    /// An 8-bit immediate rotated right by twice the 4-bit rotate field.
    Immediate { base: u32, rotation: u32 },
}

impl std::fmt::Display for AluSecondOperandInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Register {
                register,
                shift_kind,
                shift_amount,
            } => {
                if shift_amount == 0 {
                    write!(f, "r{register}")
                } else {
                    write!(f, "r{register},{shift_kind}#{shift_amount}")
                }
            }
            Self::Immediate { base, rotation } => {
                write!(f, "#0x{:X}", base.rotate_right(rotation))
            }
        }
    }
}

/// Offset of a single data transfer.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SingleDataTransferOffsetInfo {
    /// Already-rotated immediate offset.
    Immediate { offset: u32 },
    /// Register offset through the barrel shifter.
    Register {
        register: usize,
        shift_kind: ShiftKind,
        shift_amount: u32,
    },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArmModeInstruction {
    DataProcessing {
        condition: Condition,
        alu_instruction: ArmModeAluInstr,
        set_conditions: bool,
        op_kind: OperandKind,
        rn: usize,
        rd: usize,
        op2: AluSecondOperandInfo,
    },
    BranchAndExchange {
        condition: Condition,
        link: bool,
        rm: usize,
    },
    SingleDataTransfer {
        condition: Condition,
        kind: LoadStoreKind,
        quantity: ReadWriteKind,
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        rd: usize,
        rn: usize,
        offset_info: SingleDataTransferOffsetInfo,
    },
    BlockDataTransfer {
        condition: Condition,
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        load_store: LoadStoreKind,
        rn: usize,
        register_list: u32,
    },
    Branch {
        condition: Condition,
        link: bool,
        /// Displacement from the post-increment PC: offset24 shifted left
        /// two, plus the architectural +4, sign-extended.
        offset: u32,
    },
    SoftwareInterrupt {
        comment: u32,
    },
    /// Coprocessor register transfer (MRC/MCR), recognized and skipped.
    CoprocessorRegisterTransfer,
    Unknown {
        opcode: u32,
    },
}

impl From<u32> for ArmModeInstruction {
    fn from(op_code: u32) -> Self {
        let condition = Condition::from(op_code.get_bits(28..=31) as u8);

        // BX/BLX register form, tested before the class dispatch.
        if op_code.get_bits(8..=27) == 0x12FFF {
            return Self::BranchAndExchange {
                condition,
                link: op_code.get_bit(5),
                rm: op_code.get_bits(0..=3) as usize,
            };
        }

        // SWI with the AL condition nibble.
        if op_code.get_bits(24..=31) == 0xEF {
            return Self::SoftwareInterrupt {
                comment: op_code.get_bits(0..=7),
            };
        }

        match op_code.get_bits(26..=27) {
            0b00 => {
                let op_kind: OperandKind = op_code.get_bit(25).into();
                let op2 = match op_kind {
                    OperandKind::Immediate => AluSecondOperandInfo::Immediate {
                        base: op_code.get_bits(0..=7),
                        rotation: op_code.get_bits(8..=11) * 2,
                    },
                    OperandKind::Register => AluSecondOperandInfo::Register {
                        register: op_code.get_bits(0..=3) as usize,
                        shift_kind: op_code.get_bits(5..=6).into(),
                        shift_amount: op_code.get_bits(7..=11),
                    },
                };

                Self::DataProcessing {
                    condition,
                    alu_instruction: op_code.get_bits(21..=24).into(),
                    set_conditions: op_code.get_bit(20),
                    op_kind,
                    rn: op_code.get_bits(16..=19) as usize,
                    rd: op_code.get_bits(12..=15) as usize,
                    op2,
                }
            }
            0b01 => {
                let kind: LoadStoreKind = op_code.get_bit(20).into();
                let rn = op_code.get_bits(16..=19) as usize;

                // In this class the roles of the I bit are inverted with
                // respect to data processing: clear means rotated immediate,
                // set means shifted register. A load through R15 is the
                // PC-relative literal form and takes a plain 12-bit offset.
                let offset_info = if kind == LoadStoreKind::Load && rn == REG_PC {
                    SingleDataTransferOffsetInfo::Immediate {
                        offset: op_code.get_bits(0..=11),
                    }
                } else if op_code.get_bit(25) {
                    SingleDataTransferOffsetInfo::Register {
                        register: op_code.get_bits(0..=3) as usize,
                        shift_kind: op_code.get_bits(5..=6).into(),
                        shift_amount: op_code.get_bits(7..=11),
                    }
                } else {
                    SingleDataTransferOffsetInfo::Immediate {
                        offset: op_code
                            .get_bits(0..=7)
                            .rotate_right(op_code.get_bits(8..=11) * 2),
                    }
                };

                Self::SingleDataTransfer {
                    condition,
                    kind,
                    quantity: op_code.get_bit(22).into(),
                    indexing: op_code.get_bit(24).into(),
                    offsetting: op_code.get_bit(23).into(),
                    write_back: op_code.get_bit(21),
                    rd: op_code.get_bits(12..=15) as usize,
                    rn,
                    offset_info,
                }
            }
            0b10 => {
                if op_code.get_bit(25) {
                    // Displacement carries the +4 prefetch compensation and
                    // the quirky 26-bit sign extension of this machine.
                    let mut offset = (op_code.get_bits(0..=23) << 2).wrapping_add(4);
                    if offset.get_bit(25) {
                        offset = !(!offset & 0x00FF_FFFF);
                    }

                    Self::Branch {
                        condition,
                        link: op_code.get_bit(24),
                        offset,
                    }
                } else {
                    Self::BlockDataTransfer {
                        condition,
                        indexing: op_code.get_bit(24).into(),
                        offsetting: op_code.get_bit(23).into(),
                        write_back: op_code.get_bit(21),
                        load_store: op_code.get_bit(20).into(),
                        rn: op_code.get_bits(16..=19) as usize,
                        register_list: op_code.get_bits(0..=15),
                    }
                }
            }
            0b11 => {
                if op_code.get_bit(25) {
                    Self::CoprocessorRegisterTransfer
                } else {
                    Self::Unknown { opcode: op_code }
                }
            }
            _ => unreachable!(),
        }
    }
}

impl ArmModeInstruction {
    /// Renders the trace text: lowercase mnemonic, condition suffix,
    /// operands.
    pub fn disassemble(&self) -> String {
        match self {
            Self::DataProcessing {
                condition,
                alu_instruction,
                set_conditions,
                op_kind,
                rn,
                rd,
                op2,
            } => {
                use ArmModeAluInstr::*;

                let s = if *set_conditions { "s" } else { "" };
                match alu_instruction {
                    And | Eor | Sub | Rsb | Add | Adc | Sbc | Rsc | Orr | Bic => {
                        format!("{alu_instruction}{condition}{s} r{rd}, r{rn}, {op2}")
                    }
                    Mov | Mvn => format!("{alu_instruction}{condition}{s} r{rd}, {op2}"),
                    Tst | Teq if *set_conditions => {
                        format!("{alu_instruction}{condition} r{rn}, {op2}")
                    }
                    Cmp if *set_conditions => format!("cmp{condition} r{rn}, {op2}"),
                    Cmn if *set_conditions => format!("cmn{condition} r{rd}, {op2}"),
                    // S clear repurposes the test slots as PSR transfers.
                    Tst => format!("mrs r{rd}, cpsr"),
                    Teq => match op_kind {
                        OperandKind::Immediate => {
                            let rm = match op2 {
                                AluSecondOperandInfo::Immediate { base, .. } => base & 0xF,
                                AluSecondOperandInfo::Register { register, .. } => *register as u32,
                            };
                            format!("msr cpsr, r{rm}")
                        }
                        OperandKind::Register => {
                            let imm = match op2 {
                                AluSecondOperandInfo::Immediate { base, .. } => *base,
                                AluSecondOperandInfo::Register { register, .. } => *register as u32,
                            };
                            format!("msr cpsr, 0x{imm:08X}")
                        }
                    },
                    Cmp => "mrs2".to_string(),
                    Cmn => "msr2".to_string(),
                }
            }
            Self::BranchAndExchange {
                condition,
                link,
                rm,
            } => {
                let l = if *link { "l" } else { "" };
                format!("b{l}x{condition} r{rm}")
            }
            Self::SingleDataTransfer {
                condition,
                kind,
                quantity,
                offsetting,
                rd,
                rn,
                offset_info,
                ..
            } => {
                let mnemonic = match kind {
                    LoadStoreKind::Load => "ldr",
                    LoadStoreKind::Store => "str",
                };
                let b = match quantity {
                    ReadWriteKind::Byte => "b",
                    ReadWriteKind::Word => "",
                };
                let sign = match offsetting {
                    Offsetting::Up => "",
                    Offsetting::Down => "-",
                };

                if *kind == LoadStoreKind::Load && *rn == REG_PC {
                    return format!("{mnemonic}{b}{condition} r{rd}, [pc, #0x{:X}]", {
                        // Literal form uses the plain 12-bit immediate.
                        match offset_info {
                            SingleDataTransferOffsetInfo::Immediate { offset } => *offset,
                            SingleDataTransferOffsetInfo::Register { .. } => 0,
                        }
                    });
                }

                let offset = match offset_info {
                    SingleDataTransferOffsetInfo::Immediate { offset } => {
                        format!("#{sign}0x{offset:08X}")
                    }
                    SingleDataTransferOffsetInfo::Register {
                        register,
                        shift_kind,
                        shift_amount,
                    } => {
                        if *shift_amount == 0 {
                            format!("{sign}r{register}")
                        } else {
                            format!("{sign}r{register},{shift_kind}#{shift_amount}")
                        }
                    }
                };

                format!("{mnemonic}{b}{condition} r{rd}, [r{rn}, {offset}]")
            }
            Self::BlockDataTransfer {
                condition,
                indexing,
                offsetting,
                write_back,
                load_store,
                rn,
                register_list,
            } => {
                let mnemonic = match load_store {
                    LoadStoreKind::Load => "ldm",
                    LoadStoreKind::Store => "stm",
                };

                // Stack views get the fd/ed style aliases, plain bases the
                // ia/ib/da/db style.
                let mode = if *rn == 13 {
                    let pre = *indexing == Indexing::Pre;
                    let up = *offsetting == Offsetting::Up;
                    match (load_store, pre, up) {
                        (LoadStoreKind::Load, false, false) => "fa",
                        (LoadStoreKind::Load, false, true) => "fd",
                        (LoadStoreKind::Load, true, false) => "ea",
                        (LoadStoreKind::Load, true, true) => "ed",
                        (LoadStoreKind::Store, false, false) => "ed",
                        (LoadStoreKind::Store, false, true) => "ea",
                        (LoadStoreKind::Store, true, false) => "fd",
                        (LoadStoreKind::Store, true, true) => "fa",
                    }
                } else {
                    let up = if *offsetting == Offsetting::Up {
                        "i"
                    } else {
                        "d"
                    };
                    let pre = if *indexing == Indexing::Pre { "b" } else { "a" };
                    return format!(
                        "{mnemonic}{condition}{up}{pre} r{rn}{}, {}",
                        if *write_back { "!" } else { "" },
                        register_list_text(*register_list)
                    );
                };

                format!(
                    "{mnemonic}{condition}{mode} sp{}, {}",
                    if *write_back { "!" } else { "" },
                    register_list_text(*register_list)
                )
            }
            Self::Branch {
                condition,
                link,
                offset,
            } => {
                let l = if *link { "l" } else { "" };
                format!("b{l}{condition} #{}", *offset as i32)
            }
            Self::SoftwareInterrupt { comment } => format!("swi 0x{comment:02X}"),
            Self::CoprocessorRegisterTransfer => "mrc ...".to_string(),
            Self::Unknown { opcode } => format!("Unknown opcode! (0x{opcode:08X})"),
        }
    }
}

fn register_list_text(register_list: u32) -> String {
    let mut out = String::from("{");
    let mut first = true;
    for i in 0..16 {
        if register_list.get_bit(i) {
            if !first {
                out.push(',');
            }
            out.push_str(&format!("r{i}"));
            first = false;
        }
    }
    out.push('}');
    out
}

/// A fetched A-mode word: the decoded instruction, its condition, and the
/// raw bits the executor still needs for operand fields.
pub struct ArmModeOpcode {
    pub instruction: ArmModeInstruction,
    pub condition: Condition,
    pub raw: u32,
}

impl From<u32> for ArmModeOpcode {
    fn from(op_code: u32) -> Self {
        Self {
            instruction: ArmModeInstruction::from(op_code),
            condition: Condition::from(op_code.get_bits(28..=31) as u8),
            raw: op_code,
        }
    }
}

impl Deref for ArmModeOpcode {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn decode_mov_immediate() {
        // mov r1, #0x64
        let op = ArmModeOpcode::from(0xE3A0_1064);
        assert_eq!(op.condition, Condition::AL);
        assert_eq!(
            op.instruction,
            ArmModeInstruction::DataProcessing {
                condition: Condition::AL,
                alu_instruction: ArmModeAluInstr::Mov,
                set_conditions: false,
                op_kind: OperandKind::Immediate,
                rn: 0,
                rd: 1,
                op2: AluSecondOperandInfo::Immediate {
                    base: 0x64,
                    rotation: 0
                },
            }
        );
        assert_eq!(op.instruction.disassemble(), "mov r1, #0x64");
    }

    #[test]
    fn decode_adds_register() {
        // adds r2, r0, r1
        let op = ArmModeOpcode::from(0xE090_2001);
        assert_eq!(
            op.instruction,
            ArmModeInstruction::DataProcessing {
                condition: Condition::AL,
                alu_instruction: ArmModeAluInstr::Add,
                set_conditions: true,
                op_kind: OperandKind::Register,
                rn: 0,
                rd: 2,
                op2: AluSecondOperandInfo::Register {
                    register: 1,
                    shift_kind: ShiftKind::Lsl,
                    shift_amount: 0
                },
            }
        );
        assert_eq!(op.instruction.disassemble(), "adds r2, r0, r1");
    }

    #[test]
    fn decode_branch_and_exchange() {
        // bx r3
        let op = ArmModeOpcode::from(0xE12F_FF13);
        assert_eq!(
            op.instruction,
            ArmModeInstruction::BranchAndExchange {
                condition: Condition::AL,
                link: false,
                rm: 3,
            }
        );

        // blx r3 (link bit 5)
        let op = ArmModeOpcode::from(0xE12F_FF33);
        assert_eq!(
            op.instruction,
            ArmModeInstruction::BranchAndExchange {
                condition: Condition::AL,
                link: true,
                rm: 3,
            }
        );
        assert_eq!(op.instruction.disassemble(), "blx r3");
    }

    #[test]
    fn decode_branch_offsets() {
        // bl +0x10 after prefetch: offset24 = 2
        let op = ArmModeOpcode::from(0xEB00_0002);
        assert_eq!(
            op.instruction,
            ArmModeInstruction::Branch {
                condition: Condition::AL,
                link: true,
                offset: 12,
            }
        );

        // b with offset24 = -9: displacement -36 + 4 = -32
        let op = ArmModeOpcode::from(0xEAFF_FFF7);
        match op.instruction {
            ArmModeInstruction::Branch { offset, .. } => assert_eq!(offset as i32, -32),
            other => panic!("decoded {other:?}"),
        }
    }

    #[test]
    fn decode_load_store() {
        // str r5, [r4, #-0x10] (pre, down, no wb)
        let op = ArmModeOpcode::from(0xE504_5010);
        assert_eq!(
            op.instruction,
            ArmModeInstruction::SingleDataTransfer {
                condition: Condition::AL,
                kind: LoadStoreKind::Store,
                quantity: ReadWriteKind::Word,
                indexing: Indexing::Pre,
                offsetting: Offsetting::Down,
                write_back: false,
                rd: 5,
                rn: 4,
                offset_info: SingleDataTransferOffsetInfo::Immediate { offset: 0x10 },
            }
        );
    }

    #[test]
    fn decode_block_transfer() {
        // ldmia r13!, {r1, r5, r7}
        let op = ArmModeOpcode::from(0xE8BD_00A2);
        assert_eq!(
            op.instruction,
            ArmModeInstruction::BlockDataTransfer {
                condition: Condition::AL,
                indexing: Indexing::Post,
                offsetting: Offsetting::Up,
                write_back: true,
                load_store: LoadStoreKind::Load,
                rn: 13,
                register_list: 0x00A2,
            }
        );
        assert_eq!(op.instruction.disassemble(), "ldmfd sp!, {r1,r5,r7}");
    }

    #[test]
    fn decode_recognized_but_unmodeled() {
        assert_eq!(
            ArmModeInstruction::from(0xEF00_002A),
            ArmModeInstruction::SoftwareInterrupt { comment: 0x2A }
        );
        assert_eq!(
            ArmModeInstruction::from(0xEE10_1F10),
            ArmModeInstruction::CoprocessorRegisterTransfer
        );
    }

    #[test]
    fn undecodable_word_is_unknown() {
        // Class 11 with bit 25 clear
        let op = ArmModeInstruction::from(0xEC00_0000);
        assert_eq!(op, ArmModeInstruction::Unknown { opcode: 0xEC00_0000 });
        assert_eq!(op.disassemble(), "Unknown opcode! (0xEC000000)");
    }
}
