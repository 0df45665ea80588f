//! # The Processor
//!
//! A 32-bit ARM-family core with two instruction encodings:
//!
//! - **ARM state**: 32-bit fixed-width instructions, every one predicated on
//!   a 4-bit condition field. See [`arm`].
//! - **Thumb state**: 16-bit compact instructions, with a two-halfword form
//!   for long branches. See [`thumb`].
//!
//! The T bit of the CPSR selects the active decoder; `BX`/`BLX` and a POP
//! that restores PC flip it. PC is defined as already pointing at the *next*
//! instruction while the current one executes, so PC-relative operations add
//! a further +4 (ARM) or +2 (Thumb) where the encoding calls for it.
//!
//! Module structure follows the hardware split:
//!
//! - [`arm9`]: the harness holding registers, CPSR/SPSR, breakpoints, step loop
//! - [`psr`]: program status word (flags, interrupt masks, T bit, mode)
//! - [`condition`]: the 16 condition codes
//! - [`alu`]: flag predicates, add/subtract with flags, barrel shifter
//! - [`arm`] / [`thumb`]: one decoder + executor per instruction set

pub mod alu;
pub mod arm;
pub mod arm9;
pub mod condition;
pub mod flags;
pub mod psr;
pub mod registers;
pub mod thumb;
