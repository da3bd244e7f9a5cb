use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::LevelFilter;
use miette::{bail, IntoDiagnostic, Report, Result};

use sim85::{parse_literal, to_hex, AssembleReport, Logger, Options, Output, Simulator};
use sim85::{StepOutcome, Stop, Strictness, Tick, MEMORY_SIZE};

/// sim85 is a two-pass assembler and T-state counting simulator for Intel 8085 assembly.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.asm` file to run
    path: Option<PathBuf>,

    /// Log more detail to stderr, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a `.asm` file and run it to completion
    Run {
        /// `.asm` file to run
        name: PathBuf,
        #[command(flatten)]
        opts: SessionOpts,
        /// Run one instruction every DELAY milliseconds
        #[arg(short, long)]
        delay: Option<u64>,
        /// Print memory after the run, as `ADDR:LEN` (e.g. `9000H:16`). Repeatable
        #[arg(long, value_parser = parse_dump)]
        dump: Vec<(u16, usize)>,
    },
    /// Execute a fixed number of instructions, printing state after each
    Step {
        /// `.asm` file to trace
        name: PathBuf,
        #[command(flatten)]
        opts: SessionOpts,
        /// Number of instructions to execute
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
    /// Check a `.asm` file without running or outputting binary
    Check {
        /// File to check
        name: PathBuf,
        /// Leniencies to turn into errors: `unresolved`, `literals` or `all`
        #[arg(long)]
        strict: Option<Strictness>,
    },
    /// Create a raw `.bin` image of the program as loaded at 8000H
    Compile {
        /// `.asm` file to compile
        name: PathBuf,
        /// Destination to output .bin file
        dest: Option<PathBuf>,
    },
    /// Print address, bytes and source of every assembled instruction
    List {
        /// `.asm` file to list
        name: PathBuf,
        /// Leniencies to turn into errors: `unresolved`, `literals` or `all`
        #[arg(long)]
        strict: Option<Strictness>,
    },
}

#[derive(clap::Args)]
struct SessionOpts {
    /// Stop after this many instructions
    #[arg(long)]
    max_steps: Option<usize>,
    /// Leniencies to turn into errors: `unresolved`, `literals` or `all`
    #[arg(long)]
    strict: Option<Strictness>,
    /// Store a byte before running, as `ADDR=BYTE` (e.g. `2050H=05H`). Repeatable
    #[arg(long = "set", value_parser = parse_poke)]
    pokes: Vec<(u16, u8)>,
    /// Produce minimal output, suited for blackbox tests
    #[arg(short, long)]
    minimal: bool,
}

impl SessionOpts {
    fn options(&self) -> Options {
        let mut options = sim85::env::options();
        if let Some(strictness) = self.strict {
            options.strictness = strictness;
        }
        if let Some(max_steps) = self.max_steps {
            options.max_steps = max_steps;
        }
        options
    }

    fn apply_output(&self) {
        Output::set_minimal(self.minimal);
        if self.minimal {
            colored::control::set_override(false);
        }
    }
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    sim85::env::init()?;

    // Tolerated diagnostics are rendered below, so the logger only repeats them on request
    let level = match args.verbose {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    Logger::init(level);

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(sim85::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    let Some(command) = args.command else {
        if let Some(path) = args.path {
            let opts = SessionOpts {
                max_steps: None,
                strict: None,
                pokes: Vec::new(),
                minimal: false,
            };
            return run(&path, &opts, None, &[]);
        }
        println!("\n~ sim85 v{VERSION} ~");
        println!("{}", LOGO.truecolor(255, 183, 197).bold());
        println!("{SHORT_INFO}");
        std::process::exit(0);
    };

    match command {
        Command::Run {
            name,
            opts,
            delay,
            dump,
        } => run(&name, &opts, delay, &dump),
        Command::Step { name, opts, count } => step(&name, &opts, count),
        Command::Check { name, strict } => {
            file_message(Green, "Checking", &name);
            let mut sim = Simulator::new(with_strictness(strict));
            let report = assemble(&mut sim, &name)?;
            if report.warnings.is_empty() {
                message(Green, "Success", "no errors found!");
            } else {
                message(Green, "Success", &report.message);
            }
            Ok(())
        }
        Command::Compile { name, dest } => {
            file_message(Green, "Assembling", &name);
            let mut sim = Simulator::new(sim85::env::options());
            assemble(&mut sim, &name)?;

            let out_file_name = match dest {
                Some(dest) => dest,
                None => name.with_extension("bin"),
            };
            fs::write(&out_file_name, sim.program().image()).into_diagnostic()?;

            message(Green, "Finished", "emit binary");
            file_message(Green, "Saved", &out_file_name);
            Ok(())
        }
        Command::List { name, strict } => {
            let mut sim = Simulator::new(with_strictness(strict));
            assemble(&mut sim, &name)?;
            Output::print_listing(sim.program());
            Ok(())
        }
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn with_strictness(strict: Option<Strictness>) -> Options {
    let mut options = sim85::env::options();
    if let Some(strictness) = strict {
        options.strictness = strictness;
    }
    options
}

/// Assemble a file into the session, rendering warnings. An empty program is an error here.
fn assemble(sim: &mut Simulator, name: &Path) -> Result<AssembleReport> {
    let src = fs::read_to_string(name).into_diagnostic()?;
    let report = sim.assemble(&src)?;
    for warning in &report.warnings {
        eprintln!("{warning:?}");
    }
    if !report.success {
        bail!("{}", report.message);
    }
    Ok(report)
}

fn load(name: &Path, opts: &SessionOpts) -> Result<Simulator> {
    opts.apply_output();
    file_message(MsgColor::Green, "Assembling", name);
    let mut sim = Simulator::new(opts.options());
    let report = assemble(&mut sim, name)?;
    message(MsgColor::Green, "Assembled", &report.message);
    for &(addr, value) in &opts.pokes {
        sim.set_memory(addr, value);
    }
    Ok(sim)
}

fn run(name: &Path, opts: &SessionOpts, delay: Option<u64>, dump: &[(u16, usize)]) -> Result<()> {
    let mut sim = load(name, opts)?;

    message(MsgColor::Green, "Running", "from 8000H");
    let (steps, stop) = match delay {
        Some(delay) => slow_run(&mut sim, Duration::from_millis(delay)),
        None => {
            let summary = sim.run();
            (summary.steps, summary.stop)
        }
    };

    Output::print_registers(&sim);
    for &(addr, len) in dump {
        Output::print_memory(&sim, addr, len);
    }
    finish(stop, steps)
}

/// Drive [`Simulator::tick`] on a timer until it asks to stop or the step ceiling is hit.
fn slow_run(sim: &mut Simulator, delay: Duration) -> (usize, Stop) {
    let mut steps = 0;
    loop {
        if steps >= sim.options().max_steps {
            return (steps, Stop::StepLimit);
        }
        match sim.tick() {
            Tick::Continue => {}
            Tick::Halted { executed } => return (steps + executed as usize, Stop::Halted),
            Tick::Stopped => return (steps, Stop::Halted),
            Tick::Fault(fault) => return (steps, Stop::Fault(fault)),
        }
        steps += 1;
        sleep(delay);
    }
}

fn step(name: &Path, opts: &SessionOpts, count: usize) -> Result<()> {
    let mut sim = load(name, opts)?;

    for steps in 0..count {
        let pc = sim.pc();
        let text = match sim.program().get(pc) {
            Some(record) => format!("{} {}", record.mnemonic, record.operands.join(",")),
            None => String::new(),
        };
        match sim.step() {
            StepOutcome::Executed => {
                let line = sim.last_source_line().unwrap_or_default();
                let right = format!("{}H  line {line:<4} {}", to_hex(pc, 4), text.trim_end());
                message(MsgColor::Cyan, "Step", &right);
                Output::print_registers(&sim);
            }
            StepOutcome::Halted => return finish(Stop::Halted, steps),
            StepOutcome::Fault(fault) => return finish(Stop::Fault(fault), steps),
        }
        if sim.is_halted() {
            return finish(Stop::Halted, steps + 1);
        }
    }
    Ok(())
}

fn finish(stop: Stop, steps: usize) -> Result<()> {
    let plural = if steps == 1 { "" } else { "s" };
    match stop {
        Stop::Halted => {
            let right = format!("Program Halted after {steps} step{plural}");
            message(MsgColor::Green, "Completed", &right);
            Ok(())
        }
        Stop::StepLimit => {
            message(MsgColor::Cyan, "Stopped", &format!("Max Steps Reached ({steps})"));
            Ok(())
        }
        Stop::Fault(fault) => {
            message(MsgColor::Red, "Error", &format!("after {steps} step{plural}"));
            Err(Report::new(fault))
        }
    }
}

/// `ADDR:LEN`, numbers written as in source (`9000H`, `36864`).
fn parse_dump(arg: &str) -> Result<(u16, usize), String> {
    let Some((addr, len)) = arg.split_once(':') else {
        return Err("expected ADDR:LEN".to_string());
    };
    let addr = parse_number(addr, "address", u16::MAX as i64)? as u16;
    let len = parse_number(len, "length", MEMORY_SIZE as i64)? as usize;
    Ok((addr, len))
}

/// `ADDR=BYTE`, numbers written as in source (`2050H=05H`).
fn parse_poke(arg: &str) -> Result<(u16, u8), String> {
    let Some((addr, value)) = arg.split_once('=') else {
        return Err("expected ADDR=BYTE".to_string());
    };
    let addr = parse_number(addr, "address", u16::MAX as i64)? as u16;
    let value = parse_number(value, "byte", u8::MAX as i64)? as u8;
    Ok((addr, value))
}

fn parse_number(text: &str, what: &str, max: i64) -> Result<i64, String> {
    match parse_literal(text.trim()) {
        Some(value) if (0..=max).contains(&value) => Ok(value),
        Some(value) => Err(format!("{what} {value} out of range")),
        None => Err(format!("bad {what} '{}'", text.trim())),
    }
}

const LOGO: &str = r#"
       _           ___  ____
  ___ (_)_ __ ___ ( _ )| ___|
 / __|| | '_ ` _ \/ _ \|___ \
 \__ \| | | | | | | (_) |___) |
 |___/|_|_| |_| |_|\___/|____/ "#;

const SHORT_INFO: &str = r"
Welcome to sim85, an assembler and cycle-counting simulator for the Intel 8085.
Programs are assembled at 8000H. Please use `-h` or `--help` to access the usage instructions.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
