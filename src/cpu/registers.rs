//! Hypothetical Machine registers.
//!
//! Three registers:
//! - PC: program counter, address of the next instruction
//! - AC: accumulator (main computation register)
//! - MQ: multiplier-quotient register (used by multiply/divide)

use crate::word::format_word;
use serde::{Serialize, Deserialize};

/// The register file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// Program counter. Only checked against memory bounds at fetch time.
    pub pc: i32,

    /// Accumulator
    pub ac: i32,

    /// Multiplier-quotient
    pub mq: i32,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Increment the program counter by 1.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> i32 {
        let old = self.pc;
        self.pc += 1;
        old
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: i32) {
        self.pc = addr;
    }
}

impl std::fmt::Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PC: {:02}  AC: {}  MQ: {}",
            self.pc,
            format_word(self.ac),
            format_word(self.mq)
        )
    }
}
