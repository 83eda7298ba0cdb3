//! I/O hooks consumed by the machine.
//!
//! GET pulls one integer from an [`InputDevice`], PUT pushes one word to an
//! [`OutputDevice`], and tracing hands every decoded instruction to a
//! [`TraceSink`]. Closures implement all three traits, so tests can inject
//! plain functions. The concrete devices here cover the interactive console,
//! scripted input and captured output.

use crate::cpu::Instruction;
use crate::word::format_word;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// Source of values for GET.
pub trait InputDevice {
    /// Produce one integer. The machine clamps it before storing.
    fn read_int(&mut self) -> i64;
}

/// Sink for values written by PUT.
pub trait OutputDevice {
    /// Consume one word.
    fn write_int(&mut self, value: i32);
}

/// Observer for decoded instructions when tracing is on.
pub trait TraceSink {
    /// Called with the address and instruction about to execute.
    fn observe(&mut self, pc: i32, instr: &Instruction);
}

impl<F: FnMut() -> i64> InputDevice for F {
    fn read_int(&mut self) -> i64 {
        self()
    }
}

impl<F: FnMut(i32)> OutputDevice for F {
    fn write_int(&mut self, value: i32) {
        self(value)
    }
}

impl<F: FnMut(i32, &Instruction)> TraceSink for F {
    fn observe(&mut self, pc: i32, instr: &Instruction) {
        self(pc, instr)
    }
}

// ==================== Scripted devices ====================

/// Input that replays a fixed queue of values, then yields zero.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    values: VecDeque<i64>,
}

impl ScriptedInput {
    /// Create from a list of values, consumed front to back.
    pub fn new(values: impl IntoIterator<Item = i64>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Queue another value.
    pub fn push(&mut self, value: i64) {
        self.values.push_back(value);
    }

    /// Number of values not yet consumed.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl InputDevice for ScriptedInput {
    fn read_int(&mut self) -> i64 {
        self.values.pop_front().unwrap_or_else(|| {
            log::warn!("scripted input exhausted, reading 0");
            0
        })
    }
}

/// Shared handle to a [`ScriptedInput`], so a caller can keep feeding values
/// after the machine owns the device.
#[derive(Debug, Clone, Default)]
pub struct SharedInput {
    queue: Rc<RefCell<ScriptedInput>>,
}

impl SharedInput {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue another value.
    pub fn push(&self, value: i64) {
        self.queue.borrow_mut().push(value);
    }
}

impl InputDevice for SharedInput {
    fn read_int(&mut self) -> i64 {
        self.queue.borrow_mut().read_int()
    }
}

/// Output that records every word written.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    values: Rc<RefCell<Vec<i32>>>,
}

impl CapturedOutput {
    /// Create an empty capture buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn values(&self) -> Vec<i32> {
        self.values.borrow().clone()
    }

    /// Remove and return everything written so far.
    pub fn take(&self) -> Vec<i32> {
        std::mem::take(&mut *self.values.borrow_mut())
    }
}

impl OutputDevice for CapturedOutput {
    fn write_int(&mut self, value: i32) {
        self.values.borrow_mut().push(value);
    }
}

// ==================== Console ====================

/// Line-oriented console over a reader and a writer.
///
/// The interactive shell and the console devices share one console through
/// [`SharedConsole`], so prompts, program output and menu text interleave on
/// the same stream.
#[derive(Debug)]
pub struct Console<R, W> {
    reader: R,
    writer: W,
}

/// A console shared between the shell and the machine's hooks.
pub type SharedConsole<R, W> = Rc<RefCell<Console<R, W>>>;

impl<R: BufRead, W: Write> Console<R, W> {
    /// Create a console.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Wrap into a shared handle.
    pub fn shared(self) -> SharedConsole<R, W> {
        Rc::new(RefCell::new(self))
    }

    /// Read one line without its terminator. `None` at end of input.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    /// Write text as-is and flush, for prompts.
    pub fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes())?;
        self.writer.flush()
    }

    /// Write a line.
    pub fn write_line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", text)?;
        self.writer.flush()
    }

    /// Borrow the writer.
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Take the reader and writer back.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

/// GET hook that prompts on a console until it reads an integer.
#[derive(Debug)]
pub struct ConsoleInput<R, W> {
    console: SharedConsole<R, W>,
}

impl<R, W> ConsoleInput<R, W> {
    /// Prompt on the given console.
    pub fn new(console: SharedConsole<R, W>) -> Self {
        Self { console }
    }
}

impl<R: BufRead, W: Write> InputDevice for ConsoleInput<R, W> {
    fn read_int(&mut self) -> i64 {
        let mut console = self.console.borrow_mut();
        loop {
            if let Err(e) = console.write_str("Enter a numeric value: ") {
                log::error!("failed to write input prompt: {}", e);
                return 0;
            }
            match console.read_line() {
                Ok(Some(line)) => match line.trim().parse::<i64>() {
                    Ok(value) => return value,
                    Err(_) => {
                        if let Err(e) = console.write_line("Error reading input. Try again.") {
                            log::error!("failed to write input error: {}", e);
                            return 0;
                        }
                    }
                },
                Ok(None) => {
                    log::warn!("end of input while waiting for a value, reading 0");
                    return 0;
                }
                Err(e) => {
                    log::error!("failed to read input: {}", e);
                    return 0;
                }
            }
        }
    }
}

/// PUT hook that prints each word on its own line.
#[derive(Debug)]
pub struct ConsoleOutput<R, W> {
    console: SharedConsole<R, W>,
}

impl<R, W> ConsoleOutput<R, W> {
    /// Print on the given console.
    pub fn new(console: SharedConsole<R, W>) -> Self {
        Self { console }
    }
}

impl<R: BufRead, W: Write> OutputDevice for ConsoleOutput<R, W> {
    fn write_int(&mut self, value: i32) {
        if let Err(e) = self.console.borrow_mut().write_line(&format_word(value)) {
            log::warn!("dropped output {}: {}", value, e);
        }
    }
}

/// Trace sink that prints each instruction on a console.
#[derive(Debug)]
pub struct ConsoleTrace<R, W> {
    console: SharedConsole<R, W>,
}

impl<R, W> ConsoleTrace<R, W> {
    /// Print on the given console.
    pub fn new(console: SharedConsole<R, W>) -> Self {
        Self { console }
    }
}

impl<R: BufRead, W: Write> TraceSink for ConsoleTrace<R, W> {
    fn observe(&mut self, _pc: i32, instr: &Instruction) {
        if let Err(e) = self.console.borrow_mut().write_line(&instr.to_string()) {
            log::warn!("dropped trace line: {}", e);
        }
    }
}
