//! CPU execution engine for the Hypothetical Machine.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//! Nothing here returns an error: every anomaly becomes a [`CpuState`].

use crate::cpu::decode::{self, Instruction, Opcode};
use crate::cpu::{Memory, Registers};
use crate::io::{InputDevice, OutputDevice, TraceSink};
use crate::word;
use serde::{Serialize, Deserialize};

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpuState {
    /// Execution may continue.
    Runnable,
    /// Executed HLT, or a program load is in progress or failed.
    Halted,
    /// The word at PC has no valid opcode, or PC is outside memory.
    InvalidInstruction,
    /// The instruction's target address is outside memory.
    InvalidAddress,
    /// DIV with a zero divisor.
    DivideByZero,
}

impl CpuState {
    /// Whether stepping may continue.
    pub fn is_runnable(self) -> bool {
        self == CpuState::Runnable
    }
}

impl std::fmt::Display for CpuState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CpuState::Runnable => "runnable",
            CpuState::Halted => "halted",
            CpuState::InvalidInstruction => "invalid instruction",
            CpuState::InvalidAddress => "invalid address",
            CpuState::DivideByZero => "divide by zero",
        };
        f.write_str(name)
    }
}

/// Result of a bounded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Instructions executed during this run.
    pub steps: u64,
    /// State when the run stopped.
    pub state: CpuState,
}

/// Serializable copy of everything but the hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    /// Memory contents.
    pub memory: Memory,
    /// Register contents.
    pub registers: Registers,
    /// CPU state.
    pub state: CpuState,
    /// Instructions executed since the last load.
    pub cycles: u64,
}

/// The Hypothetical Machine.
pub struct Machine {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count since the last load.
    pub cycles: u64,
    input: Box<dyn InputDevice>,
    output: Box<dyn OutputDevice>,
    tracer: Option<Box<dyn TraceSink>>,
    trace: bool,
}

impl Machine {
    /// Create a zeroed machine wired to the given I/O hooks.
    pub fn new(input: impl InputDevice + 'static, output: impl OutputDevice + 'static) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Runnable,
            cycles: 0,
            input: Box::new(input),
            output: Box::new(output),
            tracer: None,
            trace: false,
        }
    }

    /// Replace the GET hook.
    pub fn set_input(&mut self, input: impl InputDevice + 'static) {
        self.input = Box::new(input);
    }

    /// Replace the PUT hook.
    pub fn set_output(&mut self, output: impl OutputDevice + 'static) {
        self.output = Box::new(output);
    }

    /// Install the sink that receives instructions while tracing.
    pub fn set_tracer(&mut self, tracer: impl TraceSink + 'static) {
        self.tracer = Some(Box::new(tracer));
    }

    /// Turn tracing on or off.
    pub fn set_trace(&mut self, on: bool) {
        self.trace = on;
    }

    /// Flip tracing, returning the new setting.
    pub fn toggle_trace(&mut self) -> bool {
        self.trace = !self.trace;
        self.trace
    }

    /// Whether tracing is on.
    pub fn is_tracing(&self) -> bool {
        self.trace
    }

    /// Zero the registers and make the CPU runnable. Memory is untouched.
    pub fn reset_cpu(&mut self) {
        self.regs.reset();
        self.state = CpuState::Runnable;
    }

    /// Execute a single instruction cycle and return the resulting state.
    ///
    /// A word that fails to decode only changes the state: PC, registers and
    /// memory stay as they were.
    pub fn step(&mut self) -> CpuState {
        let (instr, verdict) = decode::fetch(&self.mem, self.regs.pc);
        if verdict != CpuState::Runnable {
            self.state = verdict;
            return self.state;
        }

        if self.trace {
            if let Some(tracer) = self.tracer.as_mut() {
                tracer.observe(self.regs.pc, &instr);
            }
        }

        // Advance PC before dispatch (jumps override)
        self.regs.advance_pc();
        self.execute(instr);
        self.cycles += 1;

        self.state
    }

    /// Step until the state is no longer runnable.
    pub fn run(&mut self) -> CpuState {
        loop {
            if !self.step().is_runnable() {
                return self.state;
            }
        }
    }

    /// Step until the state is no longer runnable or `max_steps` steps ran.
    pub fn run_limited(&mut self, max_steps: u64) -> RunOutcome {
        let start_cycles = self.cycles;
        let mut attempts = 0;

        while attempts < max_steps {
            attempts += 1;
            if !self.step().is_runnable() {
                break;
            }
        }

        RunOutcome {
            steps: self.cycles - start_cycles,
            state: self.state,
        }
    }

    /// Execute a decoded, validated instruction.
    fn execute(&mut self, instr: Instruction) {
        let target = instr.addr as usize;

        match instr.op {
            // ==================== Control ====================

            Opcode::Hlt => {
                self.state = CpuState::Halted;
            }

            Opcode::Jeq => {
                if self.regs.ac == 0 {
                    self.regs.jump(instr.addr);
                }
            }

            Opcode::Jgt => {
                if self.regs.ac > 0 {
                    self.regs.jump(instr.addr);
                }
            }

            Opcode::Jlt => {
                if self.regs.ac < 0 {
                    self.regs.jump(instr.addr);
                }
            }

            Opcode::Jmp => {
                self.regs.jump(instr.addr);
            }

            Opcode::Jle => {
                if self.regs.ac <= 0 {
                    self.regs.jump(instr.addr);
                }
            }

            Opcode::Jne => {
                if self.regs.ac != 0 {
                    self.regs.jump(instr.addr);
                }
            }

            // ==================== Transfer ====================

            Opcode::Lac => {
                self.regs.ac = self.mem.read(target);
            }

            Opcode::Pac => {
                self.mem.write(target, self.regs.ac);
            }

            Opcode::Lmq => {
                self.regs.mq = self.mem.read(target);
            }

            Opcode::Pmq => {
                self.mem.write(target, self.regs.mq);
            }

            // ==================== Arithmetic ====================

            Opcode::Add => {
                let operand = self.mem.read(target) as i64;
                self.regs.ac = word::clamp(self.regs.ac as i64 + operand);
            }

            Opcode::Sub => {
                let operand = self.mem.read(target) as i64;
                self.regs.ac = word::clamp(self.regs.ac as i64 - operand);
            }

            Opcode::Mul => {
                let operand = self.mem.read(target) as i64;
                self.regs.mq = word::clamp(self.regs.mq as i64 * operand);
            }

            Opcode::Div => {
                let divisor = self.mem.read(target);
                if divisor == 0 {
                    self.state = CpuState::DivideByZero;
                    return;
                }
                self.regs.ac = self.regs.mq % divisor;
                self.regs.mq /= divisor;
            }

            // ==================== I/O ====================

            Opcode::Get => {
                let value = word::clamp(self.input.read_int());
                self.mem.write(target, value);
            }

            Opcode::Put => {
                self.output.write_int(self.mem.read(target));
            }

            Opcode::Unknown => {
                self.state = CpuState::InvalidInstruction;
            }
        }
    }

    /// Capture memory, registers, state and cycle count.
    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            memory: self.mem.clone(),
            registers: self.regs,
            state: self.state,
            cycles: self.cycles,
        }
    }

    /// Overwrite memory, registers, state and cycle count from a snapshot.
    pub fn restore(&mut self, snapshot: &MachineSnapshot) {
        self.mem = snapshot.memory.clone();
        self.regs = snapshot.registers;
        self.state = snapshot.state;
        self.cycles = snapshot.cycles;
    }

    /// Check if the CPU has stopped for any reason.
    pub fn is_halted(&self) -> bool {
        !self.state.is_runnable()
    }

    /// Check if the CPU can keep stepping.
    pub fn is_running(&self) -> bool {
        self.state.is_runnable()
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("mem", &self.mem)
            .field("trace", &self.trace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{CapturedOutput, ScriptedInput};
    use crate::word::{MEMORY_SIZE, WORD_MAX, WORD_MIN};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn machine() -> Machine {
        Machine::new(ScriptedInput::default(), CapturedOutput::new())
    }

    /// Machine with `word` at address 0, stepped once.
    fn step_word(word: i32, setup: impl FnOnce(&mut Machine)) -> Machine {
        let mut m = machine();
        m.mem.write(0, word);
        setup(&mut m);
        m.step();
        m
    }

    #[test]
    fn test_halt() {
        let m = step_word(0, |_| {});
        assert_eq!(m.state, CpuState::Halted);
        assert_eq!(m.regs.pc, 1);
        assert_eq!(m.cycles, 1);
    }

    #[test]
    fn test_conditional_jumps() {
        // (word, ac, expected pc)
        let cases = [
            (1002, 0, 2),
            (1002, 1, 1),
            (2002, 1, 2),
            (2002, 0, 1),
            (2002, -1, 1),
            (3002, -1, 2),
            (3002, 0, 1),
            (5007, 0, 7),
            (5007, -4, 7),
            (6002, 0, 2),
            (6002, -1, 2),
            (6002, 1, 1),
            (7002, 1, 2),
            (7002, -1, 2),
            (7002, 0, 1),
        ];

        for (word, ac, pc) in cases {
            let m = step_word(word, |m| m.regs.ac = ac);
            assert_eq!(m.regs.pc, pc, "word {} with AC={}", word, ac);
            assert_eq!(m.state, CpuState::Runnable);
        }
    }

    #[test]
    fn test_lac_pac() {
        let m = step_word(10000, |_| {});
        assert_eq!(m.regs.ac, 10000);

        let m = step_word(10010, |_| {});
        assert_eq!(m.regs.ac, 0);

        let m = step_word(11001, |m| m.regs.ac = 5);
        assert_eq!(m.mem.read(1), 5);

        let m = step_word(11000, |m| m.regs.ac = WORD_MAX);
        assert_eq!(m.mem.read(0), WORD_MAX);
    }

    #[test]
    fn test_lmq_pmq() {
        let m = step_word(12000, |_| {});
        assert_eq!(m.regs.mq, 12000);

        let m = step_word(13001, |m| m.regs.mq = 6);
        assert_eq!(m.mem.read(1), 6);
    }

    #[test]
    fn test_add_sub() {
        let m = step_word(20000, |m| m.regs.ac = -6);
        assert_eq!(m.regs.ac, 19994);

        let m = step_word(20001, |m| m.regs.ac = 6);
        assert_eq!(m.regs.ac, 6);

        let m = step_word(21000, |m| m.regs.ac = 6);
        assert_eq!(m.regs.ac, -20994);

        let m = step_word(20001, |m| {
            m.regs.ac = 90_000;
            m.mem.write(1, 90_000);
        });
        assert_eq!(m.regs.ac, WORD_MAX);

        let m = step_word(21001, |m| {
            m.regs.ac = -90_000;
            m.mem.write(1, 90_000);
        });
        assert_eq!(m.regs.ac, WORD_MIN);
    }

    #[test]
    fn test_mul_saturates() {
        let cases = [(0, 1, 0), (3, 4, 12), (33333, 4, WORD_MAX), (33333, -4, WORD_MIN)];
        for (mq, operand, want) in cases {
            let m = step_word(22001, |m| {
                m.regs.mq = mq;
                m.mem.write(1, operand);
            });
            assert_eq!(m.regs.mq, want, "{} * {}", mq, operand);
        }
    }

    #[test]
    fn test_div() {
        // (mq, divisor, quotient, remainder)
        let cases = [(0, 1, 0, 0), (12, 3, 4, 0), (12, 9, 1, 3), (-12, 9, -1, -3), (12, -9, -1, 3)];
        for (mq, divisor, quotient, remainder) in cases {
            let m = step_word(23001, |m| {
                m.regs.mq = mq;
                m.mem.write(1, divisor);
            });
            assert_eq!(m.state, CpuState::Runnable);
            assert_eq!((m.regs.mq, m.regs.ac), (quotient, remainder), "{} / {}", mq, divisor);
        }
    }

    #[test]
    fn test_div_by_zero_leaves_registers() {
        let m = step_word(23001, |m| {
            m.regs.mq = 12;
            m.regs.ac = -7;
        });
        assert_eq!(m.state, CpuState::DivideByZero);
        assert_eq!(m.regs.mq, 12);
        assert_eq!(m.regs.ac, -7);
    }

    #[test]
    fn test_get_clamps_input() {
        for (input, want) in [(42, 42), (-1_000_000, WORD_MIN), (WORD_MAX as i64, WORD_MAX), (-3, -3)] {
            let mut m = Machine::new(move || input, CapturedOutput::new());
            m.mem.write(0, 30000);
            m.step();
            assert_eq!(m.mem.read(0), want);
        }
    }

    #[test]
    fn test_put() {
        for (word, want) in [(31000, 31000), (31001, 0)] {
            let output = CapturedOutput::new();
            let mut m = Machine::new(ScriptedInput::default(), output.clone());
            m.mem.write(0, word);
            m.step();
            assert_eq!(output.values(), vec![want]);
        }
    }

    #[test]
    fn test_invalid_word_changes_only_state() {
        let m = step_word(32000, |m| m.regs.ac = 3);
        assert_eq!(m.state, CpuState::InvalidInstruction);
        assert_eq!(m.regs.pc, 0);
        assert_eq!(m.regs.ac, 3);
        assert_eq!(m.cycles, 0);

        let m = step_word(10050, |_| {});
        assert_eq!(m.state, CpuState::InvalidAddress);
        assert_eq!(m.regs.pc, 0);
    }

    #[test]
    fn test_pc_off_the_end() {
        let mut m = machine();
        m.regs.pc = 49;
        m.mem.write(49, 1000);
        m.regs.ac = 1;
        assert_eq!(m.step(), CpuState::Runnable);
        assert_eq!(m.regs.pc, 50);
        assert_eq!(m.step(), CpuState::InvalidInstruction);
    }

    #[test]
    fn test_run_stops_on_halt() {
        let mut m = machine();
        // LAC 5, ADD 5, PAC 6, HLT
        for (addr, word) in [(0, 10005), (1, 20005), (2, 11006), (3, 0), (5, 21)] {
            m.mem.write(addr, word);
        }
        assert_eq!(m.run(), CpuState::Halted);
        assert_eq!(m.mem.read(6), 42);
        assert_eq!(m.cycles, 4);
    }

    #[test]
    fn test_countdown_loop() {
        // Print 3, 2, 1 then halt.
        let output = CapturedOutput::new();
        let mut m = Machine::new(ScriptedInput::default(), output.clone());
        let program = [
            (0, 10010), // LAC 10
            (1, 11011), // PAC 11
            (2, 31011), // PUT 11
            (3, 21012), // SUB 12
            (4, 7001),  // JNE 1
            (5, 0),     // HLT
            (10, 3),
            (12, 1),
        ];
        for (addr, word) in program {
            m.mem.write(addr, word);
        }
        assert_eq!(m.run(), CpuState::Halted);
        assert_eq!(output.values(), vec![3, 2, 1]);
    }

    #[test]
    fn test_endless_output_loop() {
        let output = CapturedOutput::new();
        let mut m = Machine::new(ScriptedInput::default(), output.clone());
        m.mem.write(0, 31002);
        m.mem.write(1, 5000);
        m.mem.write(2, 99103);

        let outcome = m.run_limited(1000);
        assert_eq!(outcome, RunOutcome { steps: 1000, state: CpuState::Runnable });
        let values = output.values();
        assert_eq!(values.len(), 500);
        assert!(values.iter().all(|v| *v == 99103));
    }

    #[test]
    fn test_trace_sink() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut m = machine();
        m.set_tracer(move |pc: i32, instr: &Instruction| sink.borrow_mut().push(format!("{} {}", pc, instr)));
        m.mem.write(0, 5002);
        m.mem.write(2, 0);

        m.step();
        assert!(seen.borrow().is_empty());

        m.reset_cpu();
        assert!(m.toggle_trace());
        m.run();
        assert_eq!(*seen.borrow(), vec!["0 JMP 002".to_string(), "2 HLT 000".to_string()]);
    }

    #[test]
    fn test_reset_cpu_keeps_memory() {
        let mut m = step_word(0, |m| m.regs.ac = 9);
        m.reset_cpu();
        assert_eq!(m.regs, Registers::new());
        assert_eq!(m.state, CpuState::Runnable);
        assert_eq!(m.mem.read(0), 0);

        let mut m = step_word(31049, |_| {});
        m.reset_cpu();
        assert_eq!(m.mem.read(0), 31049);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut m = step_word(10000, |_| {});
        let snap = m.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: MachineSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);

        m.reset_cpu();
        m.mem.clear();
        m.restore(&back);
        assert_eq!(m.regs.ac, 10000);
        assert_eq!(m.regs.pc, 1);
    }

    #[test]
    fn test_truncated_snapshot_rejected() {
        let json = r#"{"memory":{"cells":[31002]},"registers":{"pc":5,"ac":0,"mq":0},"state":"Runnable","cycles":0}"#;
        assert!(serde_json::from_str::<MachineSnapshot>(json).is_err());
    }

    #[test]
    fn test_restored_snapshot_steps_safely() {
        let mut cells = vec![0; MEMORY_SIZE];
        cells[5] = 10_049;
        cells[49] = 7_000_000;
        let json = format!(
            r#"{{"memory":{{"cells":{:?}}},"registers":{{"pc":5,"ac":0,"mq":0}},"state":"Runnable","cycles":3}}"#,
            cells
        );
        let snap: MachineSnapshot = serde_json::from_str(&json).unwrap();

        let mut m = machine();
        m.restore(&snap);
        assert_eq!(m.step(), CpuState::Runnable);
        assert_eq!(m.regs.ac, 99_999);
        assert_eq!(m.cycles, 4);

        m.regs.pc = 60;
        assert_eq!(m.step(), CpuState::InvalidInstruction);
    }
}
