//! TUI debugger for the Hypo emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and CPU state view
//! - Memory view
//! - Step/run/breakpoint controls
//! - Disassembly, program output and trace views

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
