//! Disassembler for Hypothetical Machine programs.
//!
//! Renders memory words as readable instructions. Data and code share memory,
//! so every word is shown both as a number and as the instruction it would
//! decode to.

use crate::cpu::{decode_word, CpuState};
use crate::word::format_word;

/// Disassemble a single word to text. Words that would not execute are shown
/// as `???` with the reason.
pub fn disassemble_word(word: i32) -> String {
    match decode_word(word) {
        (instr, CpuState::Runnable) => instr.to_string(),
        (_, CpuState::InvalidAddress) => "??? ; bad address".to_string(),
        _ => "???".to_string(),
    }
}

/// Disassemble a slice of words, one line per address.
pub fn disassemble(words: &[i32]) -> String {
    let mut output = String::new();
    output.push_str("; Hypo Disassembly\n");
    output.push_str("; ----------------\n\n");

    for (addr, word) in words.iter().enumerate() {
        let line = disassemble_word(*word);
        output.push_str(&format!("{:02}: {}  {}\n", addr, format_word(*word), line));
    }

    output
}
