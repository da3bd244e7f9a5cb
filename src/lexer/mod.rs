use crate::lexer::cursor::Cursor;
use crate::span::{Idx, Span};

pub mod cursor;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// Mnemonic, register, label or numeric literal. Told apart by the parser.
    Word,
    /// Ends a label definition
    Colon,
    /// Separates operands, same as whitespace
    Comma,
    Comment,
    Whitespace,
    Eof,
}

/// Test if a character is considered to be whitespace.
pub(crate) fn is_whitespace(c: char) -> bool {
    c.is_whitespace()
}

/// Anything that does not separate tokens belongs to a word.
pub(crate) fn is_word(c: char) -> bool {
    !is_whitespace(c) && !matches!(c, ',' | ':' | ';')
}

impl Cursor<'_> {
    pub fn advance_token(&mut self) -> (TokenKind, usize) {
        let first_char = match self.bump() {
            Some(c) => c,
            None => return (TokenKind::Eof, 0),
        };
        let kind = match first_char {
            ';' => {
                self.take_while(|c| c != '\n');
                TokenKind::Comment
            }
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            c if is_whitespace(c) => {
                self.take_while(is_whitespace);
                TokenKind::Whitespace
            }
            _ => {
                self.take_while(is_word);
                TokenKind::Word
            }
        };
        let len = self.pos_within_token();
        self.reset_pos_within_token();
        (kind, len)
    }
}

/// Tokenize a single source line. `base` is the offset of the line within the whole source,
/// so spans point into the full text.
pub fn tokenize(line: &str, base: usize) -> impl Iterator<Item = Token> + '_ {
    let mut cursor = Cursor::new(line);
    let mut offs = base;
    std::iter::from_fn(move || {
        let (kind, len) = cursor.advance_token();
        if kind == TokenKind::Eof {
            return None;
        }
        let token = Token {
            kind,
            span: Span::new(Idx(offs), len),
        };
        offs += len;
        Some(token)
    })
}

/// Numeric literal: decimal by default, hexadecimal with an `H`/`h` suffix.
///
/// Decimal literals may carry a sign. Returns `None` for anything that is not a literal.
pub fn parse_literal(text: &str) -> Option<i64> {
    if let Some(digits) = text.strip_suffix(['H', 'h']) {
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return i64::from_str_radix(digits, 16).ok();
    }
    text.parse().ok()
}
