//! # Register File
//!
//! Sixteen 32-bit general registers. R13, R14 and R15 carry the SP, LR and
//! PC aliases but are ordinary slots in the same array; there is no banked
//! storage behind them.
//!
//! PC reads ahead: during execution of an instruction R15 already points at
//! the next one. PC-relative operations compensate where the encodings call
//! for it.

use serde::{Deserialize, Serialize};

/// Stack Pointer register index.
pub const REG_SP: usize = 0xD;

/// Link Register index (return address for subroutines).
pub const REG_LR: usize = 0xE;

/// Program Counter register index.
pub const REG_PC: usize = 0xF;

#[derive(Default, Serialize, Deserialize)]
pub struct Registers([u32; 16]);

impl Registers {
    pub const fn program_counter(&self) -> u32 {
        self.0[REG_PC]
    }

    pub const fn set_program_counter(&mut self, new_value: u32) {
        self.0[REG_PC] = new_value;
    }

    pub const fn register_at(&self, reg: usize) -> u32 {
        self.0[reg]
    }

    pub fn set_register_at(&mut self, reg: usize, new_value: u32) {
        assert!(reg <= 15, "invalid register index: {reg}");
        self.0[reg] = new_value;
    }

    /// Zeroes the whole file.
    pub fn clear(&mut self) {
        self.0 = [0; 16];
    }
}
