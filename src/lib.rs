//! Two-pass assembler and T-state counting simulator for the Intel 8085.

// Assembling
mod lexer;
pub use lexer::parse_literal;
mod parser;
pub use parser::AsmParser;
mod air;
pub use air::{Air, AirStmt, Assembly};
mod opcode;
pub use opcode::{lookup, Instr};
mod program;
pub use program::{Program, Record, LOAD_ADDRESS};
mod symbol;
pub use symbol::{AluOp, Condition, Labels, Mnemonic, Pair, RegOrMem, Register, StackPair};

// Running
mod memory;
mod runtime;
mod state;
mod timing;
pub use memory::{Memory, MEMORY_SIZE};
pub use runtime::{AssembleReport, RunSummary, Simulator, StepOutcome, Stop, Tick};
pub use state::{Flags, Registers};

mod options;
pub use options::{Options, Strictness, DEFAULT_MAX_STEPS};
mod error;
pub use error::Fault;
mod span;
pub use span::Span;
mod output;
pub use output::{to_hex, Logger, Output};

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;

/// Assemble `src` at [`LOAD_ADDRESS`] without touching any simulator state.
pub fn assemble(src: &str, strictness: Strictness) -> miette::Result<Assembly> {
    AsmParser::new(src, strictness).parse()?.backpatch(src)
}
