//! CPU emulation for the Hypothetical Machine.
//!
//! This module implements the complete machine:
//! - 50 decimal memory cells shared by code and data
//! - 3 registers: PC (program counter), AC (accumulator), MQ (multiplier-quotient)
//! - 17-instruction set with single-address architecture

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;

pub use memory::Memory;
pub use registers::Registers;
pub use decode::{Instruction, Opcode, decode_word, fetch};
pub use execute::{CpuState, Machine, MachineSnapshot, RunOutcome};
