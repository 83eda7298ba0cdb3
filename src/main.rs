//! Hypo Emulator - CLI Entry Point
//!
//! Commands:
//! - `hypo bios [--program <file>]` - Interactive BIOS menu (default)
//! - `hypo run <program>` - Run a program until it stops
//! - `hypo debug <program>` - Full-screen debugger
//! - `hypo disasm <program>` - Disassemble a program

use clap::{Args, Parser, Subcommand};
use hypo::io::{CapturedOutput, Console, ConsoleInput, ConsoleOutput, ConsoleTrace, ScriptedInput};
use hypo::{Bios, Machine};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "hypo")]
#[command(version)]
#[command(about = "An emulator of the Hypothetical Machine teaching computer")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    // BIOS options, used when no subcommand is given
    #[command(flatten)]
    bios: BiosArgs,
}

#[derive(Args, Debug, Clone, PartialEq)]
struct BiosArgs {
    /// Program offered as the default by the load command
    #[arg(short, long, env = "HYPO_PROGRAM")]
    program: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive BIOS menu
    Bios(BiosArgs),
    /// Run a program until it stops
    Run {
        /// Path to the program file
        program: PathBuf,
        /// Stop after this many instructions
        #[arg(short, long)]
        max_steps: Option<u64>,
        /// Print each instruction before it executes
        #[arg(short, long)]
        trace: bool,
        /// Values for GET, in order (prompts on stdin when none are given)
        #[arg(short, long, allow_negative_numbers = true)]
        input: Vec<i64>,
        /// Print the final machine state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Full-screen debugger
    Debug {
        /// Path to the program file
        program: PathBuf,
        /// Values for GET, in order
        #[arg(short, long, allow_negative_numbers = true)]
        input: Vec<i64>,
    },
    /// Disassemble a program
    Disasm {
        /// Path to the program file
        program: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Bios(args)) => run_bios(args.program),
        Some(Commands::Run { program, max_steps, trace, input, json }) => {
            run_program(&program, max_steps, trace, input, json);
        }
        Some(Commands::Debug { program, input }) => debug_program(&program, input),
        Some(Commands::Disasm { program }) => disassemble_file(&program),
        None => run_bios(cli.bios.program),
    }
}

fn run_bios(default_program: Option<PathBuf>) {
    let console = Console::new(io::stdin().lock(), io::stdout());
    let mut bios = Bios::new(console, default_program);

    if let Err(e) = bios.run() {
        eprintln!("❌ Console error: {}", e);
        std::process::exit(1);
    }
}

fn run_program(path: &Path, max_steps: Option<u64>, trace: bool, inputs: Vec<i64>, json: bool) {
    let console = Console::new(io::stdin().lock(), io::stdout()).shared();
    let mut machine = Machine::new(
        ConsoleInput::new(console.clone()),
        ConsoleOutput::new(console.clone()),
    );
    if !inputs.is_empty() {
        machine.set_input(ScriptedInput::new(inputs));
    }
    machine.set_tracer(ConsoleTrace::new(console.clone()));
    machine.set_trace(trace);

    if let Err(e) = machine.load_file(path) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }

    let steps = match max_steps {
        Some(limit) => machine.run_limited(limit).steps,
        None => {
            machine.run();
            machine.cycles
        }
    };

    if json {
        match serde_json::to_string_pretty(&machine.snapshot()) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to serialize machine state: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    eprintln!();
    eprintln!("━━━ Result ━━━");
    eprintln!("Steps: {}", steps);
    eprintln!("State: {}", machine.state);
    eprintln!("{}", machine.regs);

    if machine.is_running() {
        eprintln!();
        eprintln!("⚠️  Stopped after {} steps. Use --max-steps to increase.", steps);
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &Path, inputs: Vec<i64>) {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = hypo::run_debugger(source, inputs) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &Path, _inputs: Vec<i64>) {
    eprintln!("❌ This build has no debugger (enable the `tui` feature)");
    std::process::exit(1);
}

fn disassemble_file(path: &Path) {
    let mut machine = Machine::new(ScriptedInput::default(), CapturedOutput::new());
    if let Err(e) = machine.load_file(path) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }

    println!("{}", hypo::disassemble(machine.mem.cells()));
}
