//! WebAssembly bindings for the Hypo emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.
//! GET reads from a queue the page fills with `push_input`; PUT output is
//! collected and drained with `take_output`. While tracing, each executed
//! instruction is rendered into a log drained with `take_trace`.

use wasm_bindgen::prelude::*;
use crate::asm::disasm::disassemble_word;
use crate::cpu::{fetch, Instruction, Machine};
use crate::io::{CapturedOutput, SharedInput};
use crate::word::MEMORY_SIZE;
use std::cell::RefCell;
use std::rc::Rc;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    machine: Machine,
    input: SharedInput,
    output: CapturedOutput,
    trace_log: Rc<RefCell<Vec<String>>>,
    source: String,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a new machine instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        let input = SharedInput::new();
        let output = CapturedOutput::new();
        let trace_log = Rc::new(RefCell::new(Vec::new()));
        let mut machine = Machine::new(input.clone(), output.clone());

        let log = trace_log.clone();
        machine.set_tracer(move |pc: i32, instr: &Instruction| {
            log.borrow_mut().push(format!("{:02}: {}", pc, instr));
        });

        Self {
            machine,
            input,
            output,
            trace_log,
            source: String::new(),
        }
    }

    /// Load a program from its text. Returns the number of lines applied.
    #[wasm_bindgen]
    pub fn load_program(&mut self, source: &str) -> Result<usize, JsError> {
        let applied = self.machine.load_str(source)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.source = source.to_string();
        Ok(applied)
    }

    /// Step one instruction. Returns the instruction that was at PC.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        if !self.machine.is_running() {
            return Err(JsError::new(&format!("CPU stopped: {}", self.machine.state)));
        }

        let (instr, _) = fetch(&self.machine.mem, self.machine.regs.pc);
        self.machine.step();
        Ok(instr.to_string())
    }

    /// Run until the CPU stops or `max_steps` instructions ran.
    /// Returns the total step count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_steps: u32) -> u64 {
        self.machine.run_limited(max_steps as u64);
        self.machine.cycles
    }

    /// Reload the last program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.output.take();
        self.trace_log.borrow_mut().clear();
        if self.source.is_empty() {
            self.machine.reset_cpu();
        } else {
            let _ = self.machine.load_str(&self.source);
        }
    }

    /// Zero registers and make the CPU runnable, keeping memory.
    #[wasm_bindgen]
    pub fn reset_cpu(&mut self) {
        self.machine.reset_cpu();
    }

    /// Queue a value for GET.
    #[wasm_bindgen]
    pub fn push_input(&mut self, value: i32) {
        self.input.push(value as i64);
    }

    /// Drain everything written by PUT since the last call.
    #[wasm_bindgen]
    pub fn take_output(&mut self) -> Vec<i32> {
        self.output.take()
    }

    /// Turn tracing on or off.
    #[wasm_bindgen]
    pub fn set_trace(&mut self, on: bool) {
        self.machine.set_trace(on);
    }

    /// Drain the traced instructions (`"PC: MNEMONIC addr"`) since the last call.
    #[wasm_bindgen]
    pub fn take_trace(&mut self) -> Vec<String> {
        std::mem::take(&mut *self.trace_log.borrow_mut())
    }

    /// Check if the CPU can keep stepping.
    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.machine.is_running()
    }

    /// Get step count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.machine.cycles
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> i32 {
        self.machine.regs.pc
    }

    /// Get accumulator.
    #[wasm_bindgen]
    pub fn accumulator(&self) -> i32 {
        self.machine.regs.ac
    }

    /// Get multiplier-quotient register.
    #[wasm_bindgen]
    pub fn multiplier_quotient(&self) -> i32 {
        self.machine.regs.mq
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        self.machine.state.to_string()
    }

    /// Get memory cell value at address (0-49).
    #[wasm_bindgen]
    pub fn memory_at(&self, addr: usize) -> i32 {
        if addr < MEMORY_SIZE {
            self.machine.mem.read(addr)
        } else {
            0
        }
    }

    /// Get all memory cells.
    #[wasm_bindgen]
    pub fn memory_all(&self) -> js_sys::Int32Array {
        js_sys::Int32Array::from(self.machine.mem.cells())
    }

    /// Get the whole machine state as a JSON string.
    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.machine.snapshot())
            .map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for WasmMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Disassemble a single word.
#[wasm_bindgen]
pub fn wasm_disassemble(word: i32) -> String {
    disassemble_word(word)
}
