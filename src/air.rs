use miette::{Report, Result};

use crate::error;
use crate::lexer::parse_literal;
use crate::opcode::Instr;
use crate::options::Strictness;
use crate::parser::tolerate;
use crate::program::{Program, Record};
use crate::span::Span;
use crate::symbol::{new_labels, Labels};

/// Assembly intermediate representation: every assembled line with its address, plus the
/// label table filled during the first pass.
#[derive(Debug)]
pub struct Air {
    stmts: Vec<AirStmt>,
    pub(crate) labels: Labels,
    pub(crate) warnings: Vec<Report>,
    strictness: Strictness,
}

/// Single instruction line. The value operand, if any, is still unresolved.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AirStmt {
    pub address: u16,
    /// 1-based source line
    pub line: usize,
    pub instr: Instr,
    pub operands: Vec<String>,
    pub value: Option<Pending>,
}

/// Immediate, address or label reference waiting for the second pass.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Pending {
    pub text: String,
    pub span: Span,
}

/// Output of a successful assembly.
#[derive(Debug)]
pub struct Assembly {
    pub program: Program,
    /// Problems that were worked around
    pub warnings: Vec<Report>,
}

impl Air {
    pub fn new(strictness: Strictness) -> Self {
        Air {
            stmts: Vec::new(),
            labels: new_labels(),
            warnings: Vec::new(),
            strictness,
        }
    }

    pub fn add_stmt(&mut self, stmt: AirStmt) {
        self.stmts.push(stmt)
    }

    pub fn stmts(&self) -> &[AirStmt] {
        &self.stmts
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Second pass: resolve pending values against the now complete label table and encode.
    pub fn backpatch(self, src: &str) -> Result<Assembly> {
        let Air {
            stmts,
            labels,
            mut warnings,
            strictness,
        } = self;
        let mut program = Program::new(labels);

        for stmt in stmts {
            let mut instr = stmt.instr;
            if let Some(pending) = &stmt.value {
                let labels = program.labels();
                let value = resolve(pending, labels, src, strictness, stmt.line, &mut warnings)?;
                instr.patch(value);
            }
            let bytes = instr.encode();
            program.push(
                Record {
                    address: stmt.address,
                    mnemonic: instr.mnemonic(),
                    operands: stmt.operands,
                    opcode: bytes[0],
                    line: stmt.line,
                    instr,
                },
                &bytes,
            );
        }
        Ok(Assembly { program, warnings })
    }
}

/// Label first, then numeric literal. Anything else resolves to 0 unless literals are strict.
fn resolve(
    pending: &Pending,
    labels: &Labels,
    src: &str,
    strictness: Strictness,
    line: usize,
    warnings: &mut Vec<Report>,
) -> Result<u16> {
    if let Some(&addr) = labels.get(&pending.text) {
        return Ok(addr);
    }
    if let Some(value) = parse_literal(&pending.text) {
        // Out of range values keep their low bits, negative ones wrap
        return Ok(value as u16);
    }
    let span = pending.span;
    let looks_like_label = pending
        .text
        .starts_with(|c: char| c.is_ascii_alphabetic() || c == '_');
    tolerate(warnings, strictness.literals, line, |sev| {
        if looks_like_label {
            error::asm_undefined_label(span, src, sev)
        } else {
            error::asm_bad_literal(span, src, sev)
        }
    })?;
    Ok(0)
}
