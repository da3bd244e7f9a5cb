use miette::{miette, Diagnostic, LabeledSpan, Report, Severity};
use thiserror::Error;

use crate::span::Span;

// Assembler diagnostics. Severity is chosen by the caller: tolerated problems are reported as
// warnings, the same problems under a strict policy are errors.

pub fn asm_unknown_mnemonic(span: Span, src: &str, severity: Severity) -> Report {
    miette!(
        severity = severity,
        code = "asm::unknown_mnemonic",
        help = "check the list of 8085 instructions; the line was not assembled",
        labels = vec![LabeledSpan::at(span, "unknown mnemonic")],
        "Encountered an unknown instruction.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_bad_operand(span: Span, src: &str, severity: Severity, expected: &str) -> Report {
    miette!(
        severity = severity,
        code = "asm::bad_operand",
        help = format!("this operand should be a {expected}; the line was not assembled"),
        labels = vec![LabeledSpan::at(span, "invalid operand")],
        "Invalid operand for this instruction.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_missing_operand(span: Span, src: &str, severity: Severity, expected: &str) -> Report {
    miette!(
        severity = severity,
        code = "asm::missing_operand",
        help = format!("this instruction also needs a {expected}; the line was not assembled"),
        labels = vec![LabeledSpan::at(span, "incomplete instruction")],
        "Missing operand.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_surplus_operands(span: Span, src: &str, severity: Severity) -> Report {
    miette!(
        severity = severity,
        code = "asm::surplus_operands",
        help = "extra operands are ignored",
        labels = vec![LabeledSpan::at(span, "unexpected operand")],
        "Too many operands for this instruction.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_bad_literal(span: Span, src: &str, severity: Severity) -> Report {
    miette!(
        severity = severity,
        code = "asm::bad_literal",
        help = "use decimal like 42 or hexadecimal with a trailing H like 2AH; 0 was used instead",
        labels = vec![LabeledSpan::at(span, "not a number")],
        "Encountered an invalid numeric literal.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_undefined_label(span: Span, src: &str, severity: Severity) -> Report {
    miette!(
        severity = severity,
        code = "asm::undefined_label",
        help = "labels are case sensitive and must be defined as `NAME:`; 0 was used instead",
        labels = vec![LabeledSpan::at(span, "undefined label")],
        "Reference to an undefined label.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_duplicate_label(span: Span, src: &str, severity: Severity) -> Report {
    miette!(
        severity = severity,
        code = "asm::duplicate_label",
        help = "the later definition replaces the earlier one",
        labels = vec![LabeledSpan::at(span, "duplicate label")],
        "Duplicate label.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_bad_label(span: Span, src: &str, severity: Severity) -> Report {
    miette!(
        severity = severity,
        code = "asm::bad_label",
        help = "a label is a single word directly followed by `:` at the start of a line",
        labels = vec![LabeledSpan::at(span, "malformed label")],
        "Malformed label definition.",
    )
    .with_source_code(src.to_string())
}

pub fn asm_overflow(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::overflow",
        help = "programs are loaded at 8000H and must end at or before FFFFH",
        labels = vec![LabeledSpan::at(span, "does not fit")],
        "Program does not fit in memory.",
    )
    .with_source_code(src.to_string())
}

/// Fetch from an address that holds no assembled instruction and no `HLT`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error, Diagnostic)]
#[error("no instruction at {addr:04X}H (memory holds {byte:02X}H)")]
#[diagnostic(
    code(run::unmapped),
    help("execution only follows assembled instructions; reset or assemble again")
)]
pub struct Fault {
    pub addr: u16,
    pub byte: u8,
}
