//! Instruction decoder for the Hypothetical Machine.
//!
//! A word encodes `opcode * 1000 + target`. There are 17 opcodes; every
//! other opcode value decodes to [`Opcode::Unknown`].

use crate::cpu::execute::CpuState;
use crate::cpu::Memory;
use crate::word;
use serde::{Serialize, Deserialize};

/// Operation selected by the leading digits of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // ==================== Control ====================

    /// Halt execution
    Hlt,
    /// Jump if AC = 0
    Jeq,
    /// Jump if AC > 0
    Jgt,
    /// Jump if AC < 0
    Jlt,
    /// Unconditional jump
    Jmp,
    /// Jump if AC <= 0
    Jle,
    /// Jump if AC != 0
    Jne,

    // ==================== Transfer ====================

    /// AC := [addr]
    Lac,
    /// [addr] := AC
    Pac,
    /// MQ := [addr]
    Lmq,
    /// [addr] := MQ
    Pmq,

    // ==================== Arithmetic ====================

    /// AC := AC + [addr]
    Add,
    /// AC := AC - [addr]
    Sub,
    /// MQ := MQ * [addr]
    Mul,
    /// AC := MQ mod [addr], MQ := MQ div [addr]
    Div,

    // ==================== I/O ====================

    /// [addr] := input
    Get,
    /// output [addr]
    Put,

    /// Any opcode value outside the table
    Unknown,
}

impl Opcode {
    /// Every valid opcode, in numeric order.
    pub const ALL: [Opcode; 17] = [
        Opcode::Hlt, Opcode::Jeq, Opcode::Jgt, Opcode::Jlt, Opcode::Jmp,
        Opcode::Jle, Opcode::Jne, Opcode::Lac, Opcode::Pac, Opcode::Lmq,
        Opcode::Pmq, Opcode::Add, Opcode::Sub, Opcode::Mul, Opcode::Div,
        Opcode::Get, Opcode::Put,
    ];

    /// Look up an opcode value.
    pub fn from_code(code: i32) -> Opcode {
        match code {
            0 => Opcode::Hlt,
            1 => Opcode::Jeq,
            2 => Opcode::Jgt,
            3 => Opcode::Jlt,
            5 => Opcode::Jmp,
            6 => Opcode::Jle,
            7 => Opcode::Jne,
            10 => Opcode::Lac,
            11 => Opcode::Pac,
            12 => Opcode::Lmq,
            13 => Opcode::Pmq,
            20 => Opcode::Add,
            21 => Opcode::Sub,
            22 => Opcode::Mul,
            23 => Opcode::Div,
            30 => Opcode::Get,
            31 => Opcode::Put,
            _ => Opcode::Unknown,
        }
    }

    /// Numeric opcode value, `None` for [`Opcode::Unknown`].
    pub fn code(self) -> Option<i32> {
        let code = match self {
            Opcode::Hlt => 0,
            Opcode::Jeq => 1,
            Opcode::Jgt => 2,
            Opcode::Jlt => 3,
            Opcode::Jmp => 5,
            Opcode::Jle => 6,
            Opcode::Jne => 7,
            Opcode::Lac => 10,
            Opcode::Pac => 11,
            Opcode::Lmq => 12,
            Opcode::Pmq => 13,
            Opcode::Add => 20,
            Opcode::Sub => 21,
            Opcode::Mul => 22,
            Opcode::Div => 23,
            Opcode::Get => 30,
            Opcode::Put => 31,
            Opcode::Unknown => return None,
        };
        Some(code)
    }

    /// Three-letter mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Hlt => "HLT",
            Opcode::Jeq => "JEQ",
            Opcode::Jgt => "JGT",
            Opcode::Jlt => "JLT",
            Opcode::Jmp => "JMP",
            Opcode::Jle => "JLE",
            Opcode::Jne => "JNE",
            Opcode::Lac => "LAC",
            Opcode::Pac => "PAC",
            Opcode::Lmq => "LMQ",
            Opcode::Pmq => "PMQ",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Get => "GET",
            Opcode::Put => "PUT",
            Opcode::Unknown => "UNK",
        }
    }
}

/// A decoded view of a memory word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Operation tag.
    pub op: Opcode,
    /// Target address field (0-999 as decoded).
    pub addr: i32,
}

impl Instruction {
    /// Create an instruction.
    pub const fn new(op: Opcode, addr: i32) -> Self {
        Self { op, addr }
    }

    /// The placeholder reported when no word could be fetched.
    pub const fn unknown() -> Self {
        Self::new(Opcode::Unknown, 0)
    }

    /// Encode back to a memory word, `None` for unknown opcodes.
    pub fn encode(&self) -> Option<i32> {
        self.op.code().map(|code| code * 1000 + self.addr)
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:03}", self.op.mnemonic(), self.addr)
    }
}

/// Decode a word into an instruction and a validity verdict.
///
/// Opcode and target come from truncating division and remainder by 1000,
/// so a negative word yields a negative target and decodes as an invalid
/// address (or invalid instruction when the opcode is also negative).
pub fn decode_word(raw: i32) -> (Instruction, CpuState) {
    let op = Opcode::from_code(raw / 1000);
    let addr = raw % 1000;

    if op == Opcode::Unknown {
        return (Instruction::new(Opcode::Unknown, addr), CpuState::InvalidInstruction);
    }
    if !word::in_bounds(addr) {
        return (Instruction::new(op, addr), CpuState::InvalidAddress);
    }
    (Instruction::new(op, addr), CpuState::Runnable)
}

/// Fetch and decode the word at `addr`.
///
/// An address outside memory yields `(UNK 000, InvalidInstruction)`.
pub fn fetch(mem: &Memory, addr: i32) -> (Instruction, CpuState) {
    match mem.get(addr) {
        Some(raw) => decode_word(raw),
        None => (Instruction::unknown(), CpuState::InvalidInstruction),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::MEMORY_SIZE;

    #[test]
    fn test_decode_table() {
        let cases = [
            (0, Opcode::Hlt, 0),
            (1001, Opcode::Jeq, 1),
            (2001, Opcode::Jgt, 1),
            (3001, Opcode::Jlt, 1),
            (5002, Opcode::Jmp, 2),
            (6049, Opcode::Jle, 49),
            (7030, Opcode::Jne, 30),
            (10001, Opcode::Lac, 1),
            (11001, Opcode::Pac, 1),
            (12001, Opcode::Lmq, 1),
            (13002, Opcode::Pmq, 2),
            (20013, Opcode::Add, 13),
            (21014, Opcode::Sub, 14),
            (22003, Opcode::Mul, 3),
            (23022, Opcode::Div, 22),
            (30031, Opcode::Get, 31),
            (31049, Opcode::Put, 49),
        ];

        let mut mem = Memory::new();
        for (word, op, addr) in cases {
            mem.write(0, word);
            assert_eq!(fetch(&mem, 0), (Instruction::new(op, addr), CpuState::Runnable), "word {}", word);
        }
    }

    #[test]
    fn test_decode_bad_target() {
        let size = MEMORY_SIZE as i32;
        assert_eq!(
            decode_word(1000 + size),
            (Instruction::new(Opcode::Jeq, size), CpuState::InvalidAddress)
        );
        assert_eq!(
            decode_word(31000 + size),
            (Instruction::new(Opcode::Put, size), CpuState::InvalidAddress)
        );
        assert_eq!(
            decode_word(10999),
            (Instruction::new(Opcode::Lac, 999), CpuState::InvalidAddress)
        );
    }

    #[test]
    fn test_decode_unknown_opcode() {
        for word in [32000, 33000, 4000, 8000, 9000, 14000, 24000, 99000] {
            assert_eq!(decode_word(word), (Instruction::unknown(), CpuState::InvalidInstruction));
        }
        // The target digits are kept for diagnostics.
        assert_eq!(
            decode_word(99103),
            (Instruction::new(Opcode::Unknown, 103), CpuState::InvalidInstruction)
        );
    }

    #[test]
    fn test_fetch_out_of_range() {
        let mem = Memory::new();
        for addr in [-1, MEMORY_SIZE as i32, MEMORY_SIZE as i32 + 1, 1000] {
            assert_eq!(fetch(&mem, addr), (Instruction::unknown(), CpuState::InvalidInstruction));
        }
    }

    #[test]
    fn test_negative_word() {
        // -5 splits into opcode 0 (HLT) and target -5.
        assert_eq!(
            decode_word(-5),
            (Instruction::new(Opcode::Hlt, -5), CpuState::InvalidAddress)
        );
        assert_eq!(decode_word(-31002).1, CpuState::InvalidInstruction);
    }

    #[test]
    fn test_opcode_code_roundtrip() {
        for op in Opcode::ALL {
            let code = op.code().unwrap();
            assert_eq!(Opcode::from_code(code), op);
        }
        assert_eq!(Opcode::Unknown.code(), None);
    }

    #[test]
    fn test_instruction_display() {
        assert_eq!(Instruction::new(Opcode::Put, 2).to_string(), "PUT 002");
        assert_eq!(Instruction::new(Opcode::Jmp, 49).to_string(), "JMP 049");
        assert_eq!(Instruction::unknown().to_string(), "UNK 000");
    }

    #[test]
    fn test_encode() {
        assert_eq!(Instruction::new(Opcode::Put, 2).encode(), Some(31002));
        assert_eq!(Instruction::new(Opcode::Hlt, 0).encode(), Some(0));
        assert_eq!(Instruction::unknown().encode(), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::word::{WORD_MAX, WORD_MIN};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn runnable_words_have_valid_targets(raw in WORD_MIN..=WORD_MAX) {
            let (instr, state) = decode_word(raw);
            if state == CpuState::Runnable {
                prop_assert!(word::in_bounds(instr.addr));
                prop_assert!(instr.op != Opcode::Unknown);
                prop_assert_eq!(instr.encode(), Some(raw));
            }
        }

        #[test]
        fn fetch_is_total(addr in any::<i32>()) {
            let mem = Memory::new();
            let (_, state) = fetch(&mem, addr);
            prop_assert!(state == CpuState::Runnable || state == CpuState::InvalidInstruction);
        }
    }
}
