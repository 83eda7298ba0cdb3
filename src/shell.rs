//! Interactive BIOS menu.
//!
//! A line-based monitor around one [`Machine`]: each line read from the
//! console is a single-character command (load, step, run, dump, reset...).
//! Program I/O and trace output share the same console as the menu.

use crate::cpu::Machine;
use crate::io::{Console, ConsoleInput, ConsoleOutput, ConsoleTrace, SharedConsole};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Menu commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Help,
    Go,
    Load,
    Memory,
    Quit,
    Registers,
    Step,
    Trace,
    State,
    Reset,
}

/// Menu keys in display order.
const MENU: &[(&str, &str, Command)] = &[
    ("?", "display this help text", Command::Help),
    ("g", "run program to halt state (go!)", Command::Go),
    ("h", "display this help text", Command::Help),
    ("l", "load program from file", Command::Load),
    ("m", "display memory", Command::Memory),
    ("q", "quit hypo", Command::Quit),
    ("r", "dump register contents", Command::Registers),
    ("s", "step program forward by one instruction", Command::Step),
    ("t", "toggle execution tracing", Command::Trace),
    ("x", "dump all machine state", Command::State),
    ("z", "reboot/reset the CPU state", Command::Reset),
];

fn lookup(key: &str) -> Option<Command> {
    MENU.iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, _, command)| *command)
}

/// The BIOS: a machine plus the console it talks through.
pub struct Bios<R, W> {
    machine: Machine,
    console: SharedConsole<R, W>,
    default_program: Option<PathBuf>,
}

impl<R: BufRead + 'static, W: Write + 'static> Bios<R, W> {
    /// Create a BIOS whose machine reads and writes through `console`.
    pub fn new(console: Console<R, W>, default_program: Option<PathBuf>) -> Self {
        let console = console.shared();
        let mut machine = Machine::new(
            ConsoleInput::new(console.clone()),
            ConsoleOutput::new(console.clone()),
        );
        machine.set_tracer(ConsoleTrace::new(console.clone()));

        Self {
            machine,
            console,
            default_program,
        }
    }

    /// The machine being driven.
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Mutable access to the machine being driven.
    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    /// The shared console.
    pub fn console(&self) -> &SharedConsole<R, W> {
        &self.console
    }

    /// Read and dispatch commands until `q` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            self.say("Hypothetical Machine BiOS (enter h for help)")?;
            self.prompt("Enter command: ")?;

            // End of input quits like a normal exit.
            let line = self.console.borrow_mut().read_line()?;
            let line = line.unwrap_or_else(|| "q".to_string());

            match lookup(line.trim()) {
                Some(Command::Quit) => {
                    self.say("Bye!")?;
                    return Ok(());
                }
                Some(command) => {
                    log::debug!("bios command {:?}", command);
                    self.dispatch(command)?;
                }
                None => self.say("Command not implemented.")?,
            }
        }
    }

    fn dispatch(&mut self, command: Command) -> io::Result<()> {
        match command {
            Command::Help => {
                let help: Vec<String> = MENU
                    .iter()
                    .map(|(key, desc, _)| format!("{}: {}", key, desc))
                    .collect();
                self.say(&help.join("\n"))
            }
            Command::Go => {
                let state = self.machine.run();
                self.say(&format!("Program terminated with: {}", state))
            }
            Command::Load => self.load(),
            Command::Memory => {
                let dump = self.machine.mem.dump();
                self.prompt(&dump)
            }
            Command::Registers => {
                let regs = self.machine.regs.to_string();
                self.say(&regs)
            }
            Command::Step => {
                self.machine.step();
                Ok(())
            }
            Command::Trace => {
                let on = self.machine.toggle_trace();
                self.say(&format!("Tracing mode: {}", on))
            }
            Command::State => {
                let text = format!(
                    "Memory:\n{}\nRegisters:\n{}\n\nCPU State: {}\n",
                    self.machine.mem.dump(),
                    self.machine.regs,
                    self.machine.state
                );
                self.say(&text)
            }
            Command::Reset => {
                self.machine.reset_cpu();
                self.say("CPU state reset.")
            }
            // Handled by the loop.
            Command::Quit => Ok(()),
        }
    }

    fn load(&mut self) -> io::Result<()> {
        let default = self
            .default_program
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.prompt(&format!("Program file path (default: {:?}): ", default))?;

        let answer = self.console.borrow_mut().read_line()?;
        let path = match answer.as_deref().map(str::trim) {
            None => {
                log::warn!("end of input while reading program path");
                return Ok(());
            }
            Some("") => match &self.default_program {
                Some(path) => path.clone(),
                None => return self.say("No default program configured."),
            },
            Some(path) => PathBuf::from(path),
        };

        match self.machine.load_file(&path) {
            Ok(_) => self.say("Program loaded successfully."),
            Err(e) => self.say(&format!("Error loading program: {}", e)),
        }
    }

    fn say(&self, text: &str) -> io::Result<()> {
        self.console.borrow_mut().write_line(text)
    }

    fn prompt(&self, text: &str) -> io::Result<()> {
        self.console.borrow_mut().write_str(text)
    }
}

impl<R, W> std::fmt::Debug for Bios<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bios")
            .field("machine", &self.machine)
            .field("default_program", &self.default_program)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuState;
    use std::io::Cursor;

    type TestBios = Bios<Cursor<Vec<u8>>, Vec<u8>>;

    fn bios(input: &str) -> TestBios {
        let console = Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        Bios::new(console, None)
    }

    fn output(bios: &TestBios) -> String {
        String::from_utf8(bios.console().borrow().writer().clone()).unwrap()
    }

    fn write_program(name: &str, source: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("hypo-shell-{}-{}.txt", name, std::process::id()));
        std::fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn test_quit_and_eof() {
        let mut b = bios("q\n");
        b.run().unwrap();
        assert!(output(&b).ends_with("Bye!\n"));

        let mut b = bios("");
        b.run().unwrap();
        assert!(output(&b).ends_with("Bye!\n"));
    }

    #[test]
    fn test_help_is_sorted() {
        let mut b = bios("h\n");
        b.run().unwrap();
        let text = output(&b);
        let help = text.find("?: display this help text").unwrap();
        let go = text.find("g: run program to halt state (go!)").unwrap();
        let reset = text.find("z: reboot/reset the CPU state").unwrap();
        assert!(help < go && go < reset);
    }

    #[test]
    fn test_unknown_command() {
        let mut b = bios("w\n");
        b.run().unwrap();
        assert!(output(&b).contains("Command not implemented."));
    }

    #[test]
    fn test_load_and_run() {
        let path = write_program("run", "0: 10003\n1: 31003\n2: 0\n3: 42\n");
        let mut b = bios(&format!("l\n{}\ng\nr\n", path.display()));
        b.run().unwrap();
        let text = output(&b);
        std::fs::remove_file(&path).ok();

        assert!(text.contains("Program loaded successfully."));
        assert!(text.contains(" 00042\n"));
        assert!(text.contains("Program terminated with: halted"));
        assert!(text.contains("PC: 03  AC:  00042  MQ:  00000"));
        assert_eq!(b.machine().state, CpuState::Halted);
    }

    #[test]
    fn test_load_default_program() {
        let path = write_program("default", "0: 0\n");
        let console = Console::new(Cursor::new(b"l\n\ns\n".to_vec()), Vec::new());
        let mut b = Bios::new(console, Some(path.clone()));
        b.run().unwrap();
        std::fs::remove_file(&path).ok();

        assert!(output(&b).contains("Program loaded successfully."));
        assert_eq!(b.machine().state, CpuState::Halted);
        assert_eq!(b.machine().regs.pc, 1);
    }

    #[test]
    fn test_load_reports_errors() {
        let path = write_program("bad", "0: 0\n77: 1\n");
        let mut b = bios(&format!("l\n{}\n", path.display()));
        b.run().unwrap();
        std::fs::remove_file(&path).ok();

        assert!(output(&b).contains("Error loading program: invalid memory address on line 2: 77 (0-49)"));
        assert_eq!(b.machine().state, CpuState::Halted);
    }

    #[test]
    fn test_get_prompts_on_console() {
        let mut b = bios("g\n17\nm\n");
        b.machine_mut().mem.write(0, 30005);
        b.machine_mut().mem.write(1, 0);
        b.run().unwrap();

        let text = output(&b);
        assert!(text.contains("Enter a numeric value: "));
        assert!(text.contains("05:  00017"));
        assert_eq!(b.machine().mem.read(5), 17);
    }

    #[test]
    fn test_trace_and_reset() {
        let mut b = bios("t\ns\nz\nx\n");
        b.machine_mut().mem.write(0, 5003);
        b.run().unwrap();

        let text = output(&b);
        assert!(text.contains("Tracing mode: true"));
        assert!(text.contains("JMP 003\n"));
        assert!(text.contains("CPU state reset."));
        assert!(text.contains("CPU State: runnable"));
        assert_eq!(b.machine().regs.pc, 0);
    }
}
