use std::cell::RefCell;

use colored::{ColoredString, Colorize};
use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::program::{Program, LOAD_ADDRESS};
use crate::runtime::Simulator;
use crate::symbol::Register;

/// Uppercase, zero-padded hex. `width` is 2 for bytes and 4 for words.
pub fn to_hex(value: u16, width: usize) -> String {
    format!("{value:0width$X}")
}

/// Width of the text inside the register panel
const PANEL_WIDTH: usize = 28;

#[derive(Clone, Copy, Debug)]
pub struct Output;

impl Output {
    thread_local! {
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    }

    pub fn set_minimal(new_value: bool) -> bool {
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }
    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }

    pub fn print_registers(sim: &Simulator) {
        let reg = sim.registers();
        let flags = sim.flags();
        if Self::is_minimal() {
            for r in Register::ALL {
                println!("{:<2} {}", r.to_string(), to_hex(reg.get(r) as u16, 2));
            }
            println!("PC {}", to_hex(reg.pc, 4));
            println!("SP {}", to_hex(reg.sp, 4));
            println!(
                "FLAGS S={} Z={} AC={} P={} CY={}",
                flags.s as u8, flags.z as u8, flags.ac as u8, flags.p as u8, flags.cy as u8
            );
            println!("T-STATES {}", sim.t_states());
            return;
        }

        let border = "─".repeat(PANEL_WIDTH);
        println!("{}", format!("┌{border}┐").dimmed());
        Self::panel_row(format!(
            " {:<2}  {:>4}  {:>4}  {:>4}  {:<3}",
            "", "hex", "uint", "int", "chr"
        ));
        for r in Register::ALL {
            let value = reg.get(r);
            Self::panel_row(format!(
                " {:<2}  {:>4}  {:>4}  {:>4}  {}",
                r.to_string(),
                to_hex(value as u16, 2),
                value,
                value as i8,
                char_display(value)
            ));
        }
        Self::panel_row(format!(" PC  {}   SP  {}", to_hex(reg.pc, 4), to_hex(reg.sp, 4)));
        Self::panel_row(format!(
            " S {}  Z {}  AC {}  P {}  CY {}",
            flags.s as u8, flags.z as u8, flags.ac as u8, flags.p as u8, flags.cy as u8
        ));
        Self::panel_row(format!(" T-states {}", sim.t_states()));
        println!("{}", format!("└{border}┘").dimmed());
    }

    fn panel_row(content: String) {
        let side = "│".dimmed();
        println!("{side}{content:<PANEL_WIDTH$}{side}");
    }

    /// Hex dump of `len` bytes, 16 per row.
    pub fn print_memory(sim: &Simulator, start: u16, len: usize) {
        let mut offset = 0;
        while offset < len {
            let row = start.wrapping_add(offset as u16);
            let count = (len - offset).min(16);
            let bytes: Vec<String> = (0..count)
                .map(|i| {
                    let byte = sim.memory(row.wrapping_add(i as u16));
                    let text = to_hex(byte as u16, 2);
                    if byte == 0 && !Self::is_minimal() {
                        text.dimmed().to_string()
                    } else {
                        text
                    }
                })
                .collect();
            let addr = to_hex(row, 4);
            let addr = if Self::is_minimal() {
                ColoredString::from(addr.as_str())
            } else {
                addr.cyan()
            };
            println!("{addr}: {}", bytes.join(" "));
            offset += count;
        }
    }

    /// Address, encoded bytes and source text of every instruction, with label markers.
    pub fn print_listing(program: &Program) {
        for record in program.records() {
            for (name, _) in program
                .labels()
                .iter()
                .filter(|(_, addr)| **addr == record.address)
            {
                println!("{}", format!("{name}:").green());
            }
            let start = (record.address - LOAD_ADDRESS) as usize;
            let len = record.instr.len() as usize;
            let bytes: Vec<String> = program.image()[start..start + len]
                .iter()
                .map(|&byte| to_hex(byte as u16, 2))
                .collect();
            println!(
                "{}  {:<9} {:<5}{:<14} {}",
                to_hex(record.address, 4).cyan(),
                bytes.join(" "),
                record.mnemonic.to_string(),
                record.operands.join(","),
                format!("; line {}", record.line).dimmed()
            );
        }
        if program.labels().is_empty() {
            return;
        }
        println!();
        for (name, &addr) in program.labels() {
            println!("{:<16} {}", name, to_hex(addr, 4));
        }
    }
}

/// Three character rendering of a byte
fn char_display(value: u8) -> String {
    match value {
        // ASCII control characters which are arbitrarily considered significant
        0x00 => "NUL".into(),
        0x08 => "BS ".into(),
        0x09 => "HT ".into(),
        0x0a => "LF ".into(),
        0x0d => "CR ".into(),
        0x1b => "ESC".into(),
        0x7f => "DEL".into(),
        0x20 => "[_]".into(),
        0x21..=0x7e => format!("{:<3}", value as char),
        // Unimportant control characters, then anything outside ASCII
        0x00..=0x7f => "───".into(),
        0x80.. => "┄┄┄".into(),
    }
}

/// Writes log records to stderr in the same aligned style as status messages.
pub struct Logger;

static LOGGER: Logger = Logger;

impl Logger {
    /// Install as the global logger. Only the first call has any effect.
    pub fn init(level: LevelFilter) {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(level);
        }
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let left = match record.level() {
            Level::Error => "error".red(),
            Level::Warn => "warning".yellow(),
            Level::Info => "info".cyan(),
            Level::Debug => "debug".blue(),
            Level::Trace => "trace".dimmed(),
        };
        eprintln!("{left:>12} {}", record.args());
    }

    fn flush(&self) {}
}
