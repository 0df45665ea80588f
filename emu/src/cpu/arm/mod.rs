//! # A-Mode (ARM) Instruction Set
//!
//! 32-bit fixed-width instructions. Bits 31:28 carry the condition field,
//! bits 27:26 pick the primary class, and two special patterns (`BX`/`BLX`
//! register and `SWI`) are tested before the class dispatch.
//!
//! [`instructions`] decodes a raw word into [`ArmModeInstruction`] and
//! renders the trace text; [`operations`] executes against the processor.

pub mod instructions;
pub mod operations;

pub use instructions::{ArmModeInstruction, ArmModeOpcode};
