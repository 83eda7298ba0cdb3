//! Program loader for the Hypothetical Machine.
//!
//! Programs are plain text, one memory assignment per line:
//!
//! ```text
//! 0: 31002 // PUT content of memory address 2
//! 1: 5000  // GOTO 0
//! 2: 99103
//! ```
//!
//! - The address is one or more decimal digits, immediately followed by `:`
//! - The value is one or more decimal digits with an optional leading `-`
//! - Anything after whitespace following the value is a free-form comment
//!
//! Lines apply in input order, so a later line for the same address wins.
//! Loading stops at the first bad line.

use crate::cpu::{CpuState, Machine};
use crate::word::{self, MEMORY_SIZE};
use regex::bytes::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// `<address>:<value>` with an optional whitespace-separated trailer.
///
/// Matches raw bytes with ASCII-only classes, so a comment may hold any
/// bytes at all.
static LINE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn line_pattern() -> &'static Regex {
    LINE_PATTERN.get_or_init(|| {
        Regex::new(r"(?-u)^([0-9]+):[\t\n\f\r ]*(-?[0-9]+)([\t\n\f\r ].*)?$")
            .expect("program line pattern is valid")
    })
}

/// The kind of a [`LoadError`], for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadErrorKind {
    /// The input could not be opened or read.
    BadFile,
    /// A line does not match the program grammar.
    BadLine,
    /// A line names an address outside memory.
    BadAddress,
    /// A line's value could not be parsed.
    BadValue,
}

/// Errors that can occur while loading a program.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid program file: {0}")]
    BadFile(#[from] io::Error),

    #[error("invalid line {line} in program: {text:?}")]
    BadLine { line: usize, text: String },

    #[error("invalid memory address on line {line}: {address} (0-49)")]
    BadAddress { line: usize, address: String },

    #[error("invalid value on line {line}: {text:?}")]
    BadValue { line: usize, text: String },
}

impl LoadError {
    /// Which of the four failure kinds this is.
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            LoadError::BadFile(_) => LoadErrorKind::BadFile,
            LoadError::BadLine { .. } => LoadErrorKind::BadLine,
            LoadError::BadAddress { .. } => LoadErrorKind::BadAddress,
            LoadError::BadValue { .. } => LoadErrorKind::BadValue,
        }
    }
}

/// Parse one program line into `(address, value)`.
///
/// `line` is the 1-based line number used in errors. The value is clamped to
/// the word range.
pub fn parse_line(line: usize, text: &str) -> Result<(usize, i32), LoadError> {
    parse_raw_line(line, text.as_bytes())
}

/// [`parse_line`] over raw bytes. Only the address and value must be text.
pub fn parse_raw_line(line: usize, raw: &[u8]) -> Result<(usize, i32), LoadError> {
    let bad_line = || LoadError::BadLine {
        line,
        text: String::from_utf8_lossy(raw).into_owned(),
    };
    let caps = line_pattern().captures(raw).ok_or_else(bad_line)?;

    // Both groups are ASCII digits by construction.
    let addr_text = String::from_utf8_lossy(&caps[1]);
    let addr = match addr_text.parse::<usize>() {
        Ok(addr) if addr < MEMORY_SIZE => addr,
        _ => {
            return Err(LoadError::BadAddress {
                line,
                address: addr_text.into_owned(),
            })
        }
    };

    let value_text = String::from_utf8_lossy(&caps[2]);
    let value = value_text.parse::<i64>().map_err(|_| LoadError::BadValue {
        line,
        text: value_text.to_string(),
    })?;

    Ok((addr, word::clamp(value)))
}

impl Machine {
    /// Load a program, replacing all memory and zeroing the registers.
    ///
    /// The machine is halted while loading and only becomes runnable when
    /// every line loaded. On failure memory holds whatever was assigned
    /// before the bad line. Returns the number of lines applied.
    pub fn load_program<R: BufRead>(&mut self, reader: R) -> Result<usize, LoadError> {
        self.state = CpuState::Halted;
        self.mem.clear();
        self.regs.reset();
        self.cycles = 0;

        let mut applied = 0;
        for (index, line) in reader.split(b'\n').enumerate() {
            let mut line = line.map_err(|e| {
                log::warn!("failed to read program: {}", e);
                LoadError::BadFile(e)
            })?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            let (addr, value) = parse_raw_line(index + 1, &line).map_err(|e| {
                log::warn!("{}", e);
                e
            })?;
            self.mem.write(addr, value);
            applied += 1;
        }

        self.state = CpuState::Runnable;
        log::info!("program loaded: {} assignments", applied);
        Ok(applied)
    }

    /// Load a program from a string.
    pub fn load_str(&mut self, source: &str) -> Result<usize, LoadError> {
        self.load_program(source.as_bytes())
    }

    /// Load a program from a file.
    ///
    /// A file that cannot be opened is reported as [`LoadError::BadFile`]
    /// and leaves the machine untouched.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            log::warn!("cannot open program {}: {}", path.display(), e);
            LoadError::BadFile(e)
        })?;
        log::debug!("loading program from {}", path.display());
        self.load_program(BufReader::new(file))
    }
}
