use miette::{Report, Result, Severity};

use crate::air::{Air, AirStmt, Pending};
use crate::error;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::opcode::{self, LookupError};
use crate::options::Strictness;
use crate::program::LOAD_ADDRESS;
use crate::span::Span;

/// Report a problem the assembler can work around. Under a strict policy it becomes the
/// error that ends assembly; otherwise it is logged and kept as a warning.
pub(crate) fn tolerate<F>(
    warnings: &mut Vec<Report>,
    strict: bool,
    line: usize,
    make: F,
) -> Result<()>
where
    F: FnOnce(Severity) -> Report,
{
    if strict {
        return Err(make(Severity::Error));
    }
    let report = make(Severity::Warning);
    log::warn!("line {line}: {report}");
    warnings.push(report);
    Ok(())
}

/// First pass: works out the address of every line and records label definitions.
///
/// Values (immediates, addresses, label references) are left pending for
/// [`Air::backpatch`], which is what allows labels to be used before they are defined.
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
    strictness: Strictness,
    /// Assembly intermediate representation
    air: Air,
    /// Next free address. Wider than an address to catch programs running off the end.
    addr: u32,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str, strictness: Strictness) -> Self {
        AsmParser {
            src,
            strictness,
            air: Air::new(strictness),
            addr: LOAD_ADDRESS as u32,
        }
    }

    fn get_span(&self, span: Span) -> &'a str {
        &self.src[span.as_range()]
    }

    /// Create AIR out of the source, line by line.
    pub fn parse(mut self) -> Result<Air> {
        let mut offs = 0;
        for (i, raw) in self.src.split_inclusive('\n').enumerate() {
            let text = raw.trim_end_matches(['\n', '\r']);
            self.parse_line(text, offs, i + 1)?;
            offs += raw.len();
        }
        Ok(self.air)
    }

    fn parse_line(&mut self, text: &str, base: usize, line: usize) -> Result<()> {
        let toks: Vec<Token> = tokenize(text, base)
            .filter(|tok| !matches!(tok.kind, TokenKind::Whitespace | TokenKind::Comment))
            .collect();

        // Optional `name:` prefix
        let rest = match toks.as_slice() {
            [name, colon, rest @ ..]
                if name.kind == TokenKind::Word && colon.kind == TokenKind::Colon =>
            {
                self.define_label(*name, line)?;
                rest
            }
            rest => rest,
        };
        let Some(first) = rest.first() else {
            // Blank, comment-only or label-only
            return Ok(());
        };

        if let Some(colon) = rest.iter().find(|tok| tok.kind == TokenKind::Colon) {
            let span = first.span.to(colon.span);
            return self.tolerate_unresolved(line, |src, sev| {
                error::asm_bad_label(span, src, sev)
            });
        }

        let words: Vec<Token> = rest
            .iter()
            .filter(|tok| tok.kind == TokenKind::Word)
            .copied()
            .collect();
        let Some((mnemonic, operands)) = words.split_first() else {
            // Only separators left on the line
            let span = first.span;
            return self.tolerate_unresolved(line, |src, sev| {
                error::asm_unknown_mnemonic(span, src, sev)
            });
        };
        let stmt_span = mnemonic.span.to(words[words.len() - 1].span);
        let operand_texts: Vec<&str> = operands.iter().map(|tok| self.get_span(tok.span)).collect();

        let template = match opcode::template(self.get_span(mnemonic.span), &operand_texts) {
            Ok(template) => template,
            Err(LookupError::UnknownMnemonic) => {
                let span = mnemonic.span;
                return self.tolerate_unresolved(line, |src, sev| {
                    error::asm_unknown_mnemonic(span, src, sev)
                });
            }
            Err(LookupError::Missing { expected }) => {
                return self.tolerate_unresolved(line, |src, sev| {
                    error::asm_missing_operand(stmt_span, src, sev, expected)
                });
            }
            Err(LookupError::BadOperand { index, expected }) => {
                let span = operands[index].span;
                return self.tolerate_unresolved(line, |src, sev| {
                    error::asm_bad_operand(span, src, sev, expected)
                });
            }
        };

        if template.surplus > 0 {
            let span = operands[operands.len() - template.surplus]
                .span
                .to(stmt_span);
            self.tolerate_unresolved(line, |src, sev| {
                error::asm_surplus_operands(span, src, sev)
            })?;
        }

        let address = self.addr;
        self.addr += template.instr.len() as u32;
        if self.addr > 0x10000 {
            return Err(error::asm_overflow(stmt_span, self.src));
        }

        let value = template.value.map(|index| Pending {
            text: operand_texts[index].to_string(),
            span: operands[index].span,
        });
        self.air.add_stmt(AirStmt {
            address: address as u16,
            line,
            instr: template.instr,
            operands: operand_texts.iter().map(|text| text.to_string()).collect(),
            value,
        });
        Ok(())
    }

    /// Labels are case-preserving. A repeated label takes the later address.
    fn define_label(&mut self, name: Token, line: usize) -> Result<()> {
        let text = self.get_span(name.span);
        if self.air.labels.contains_key(text) {
            self.tolerate_unresolved(line, |src, sev| {
                error::asm_duplicate_label(name.span, src, sev)
            })?;
        }
        // A label after the last byte of memory has nowhere to point; wrap like the PC does.
        self.air.labels.insert(text.to_string(), self.addr as u16);
        Ok(())
    }

    fn tolerate_unresolved<F>(&mut self, line: usize, make: F) -> Result<()>
    where
        F: FnOnce(&str, Severity) -> Report,
    {
        let src = self.src;
        tolerate(
            &mut self.air.warnings,
            self.strictness.unresolved,
            line,
            |sev| make(src, sev),
        )
    }
}
