//! Debugger application state and logic.

use crate::asm::disasm::disassemble_word;
use crate::cpu::{fetch, CpuState, Instruction, Machine};
use crate::io::{CapturedOutput, ScriptedInput};
use crate::word::MEMORY_SIZE;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Trace lines kept for display.
const TRACE_LINES: usize = 64;

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub machine: Machine,
    /// Program source, reloaded on reset.
    pub source: String,
    /// Values fed to GET, replayed from the start on reset.
    pub inputs: Vec<i64>,
    /// Everything the program has written with PUT.
    pub output: CapturedOutput,
    /// Most recent traced instructions, oldest first.
    pub trace_log: Rc<RefCell<Vec<String>>>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<i32>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(source: String, inputs: Vec<i64>) -> Self {
        let output = CapturedOutput::new();
        let trace_log = Rc::new(RefCell::new(Vec::new()));
        let mut machine = Machine::new(ScriptedInput::new(inputs.clone()), output.clone());

        let log = trace_log.clone();
        machine.set_tracer(move |pc: i32, instr: &Instruction| {
            let mut log = log.borrow_mut();
            if log.len() == TRACE_LINES {
                log.remove(0);
            }
            log.push(format!("{:02}: {}", pc, instr));
        });

        let mut app = Self {
            machine,
            source,
            inputs,
            output,
            trace_log,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: String::new(),
            mem_scroll: 0,
        };
        app.load();
        app
    }

    fn load(&mut self) {
        self.status = match self.machine.load_str(&self.source) {
            Ok(_) => "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            Err(e) => format!("Load error: {}", e),
        };
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.machine.is_running() {
            self.status = format!("CPU stopped: {}", self.machine.state);
            self.running = false;
            return;
        }

        let pc = self.machine.regs.pc;
        let (instr, _) = fetch(&self.machine.mem, pc);
        match self.machine.step() {
            CpuState::Runnable => {
                self.status = format!("PC={:02}: {}", pc, instr);
            }
            CpuState::Halted => {
                self.status = format!("PC={:02}: {}  (halted)", pc, instr);
                self.running = false;
            }
            state => {
                self.status = format!("PC={:02}: {}", pc, state);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.machine.is_running() {
            self.running = false;
            self.status = format!("Stopped after {} steps: {}", self.machine.cycles, self.machine.state);
            return;
        }

        // Check for breakpoint
        let pc = self.machine.regs.pc;
        if self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={}", pc);
            return;
        }

        self.step();
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.machine.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={}", pc);
        }
    }

    /// Reload the program and replay input from the start.
    pub fn reset(&mut self) {
        self.machine.set_input(ScriptedInput::new(self.inputs.clone()));
        self.output.take();
        self.trace_log.borrow_mut().clear();
        self.running = false;
        self.load();
    }

    /// Toggle the machine's trace flag.
    pub fn toggle_trace(&mut self) {
        let on = self.machine.toggle_trace();
        self.status = format!("Tracing mode: {}", on);
    }

    /// Disassembly around the current PC as `(addr, text, is_current)`.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(i32, String, bool)> {
        let pc = self.machine.regs.pc;
        let start = (pc - (lines as i32 / 2)).max(0);

        (start..start + lines as i32)
            .filter(|addr| (*addr as usize) < MEMORY_SIZE)
            .map(|addr| {
                let word = self.machine.mem.read(addr as usize);
                (addr, disassemble_word(word), addr == pc)
            })
            .collect()
    }
}

/// Run the debugger with a program source.
pub fn run_debugger(source: String, inputs: Vec<i64>) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(source, inputs);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('t') => app.toggle_trace(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => {
                            app.mem_scroll = app.mem_scroll.saturating_sub(1);
                        }
                        KeyCode::Down => {
                            if app.mem_scroll + 1 < MEMORY_SIZE {
                                app.mem_scroll += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        // Tick for continuous running
        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
