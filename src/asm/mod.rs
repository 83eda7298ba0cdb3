//! Program text handling.
//!
//! This module provides:
//! - The program loader (text → memory)
//! - A disassembler (memory → readable text)

pub mod loader;
pub mod disasm;

pub use loader::{parse_line, parse_raw_line, LoadError, LoadErrorKind};
pub use disasm::{disassemble, disassemble_word};
