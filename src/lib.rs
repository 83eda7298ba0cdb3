//! # Hypo Emulator
//!
//! An emulator of the Hypothetical Machine, a small decimal teaching
//! computer.
//!
//! The machine has 50 memory words holding signed values in -99999..=99999,
//! two arithmetic registers plus a program counter, and a 17-instruction set.
//! Code and data share one address space: whatever the program counter points
//! at is decoded as `opcode * 1000 + address`.

pub mod word;
pub mod cpu;
pub mod io;
pub mod asm;
pub mod shell;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use word::{clamp, format_word, MEMORY_SIZE, WORD_MAX, WORD_MIN};
pub use cpu::{CpuState, Instruction, Machine, MachineSnapshot, Memory, Opcode, Registers, RunOutcome};
pub use io::{CapturedOutput, Console, InputDevice, OutputDevice, ScriptedInput, TraceSink};
pub use asm::{disassemble, LoadError, LoadErrorKind};
pub use shell::Bios;

#[cfg(feature = "tui")]
pub use tui::run_debugger;
