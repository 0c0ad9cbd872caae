use std::fmt::{self, Display};

use crate::error::{Error, Result};
use crate::lexer::cursor::Cursor;
use crate::span::{Idx, Span};

pub mod cursor;

/// A single word of a source line.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind<'a> {
    /// `R` followed by a decimal index. Not range checked here.
    Reg(u16),
    /// `#` decimal or `x` hex literal
    Imm(i32),
    /// Anything else, resolved by the parser
    Command(&'a str),
    /// End of line or start of a trailing comment
    Eol,
}

impl Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Reg(idx) => write!(f, "register R{idx}"),
            TokenKind::Imm(val) => write!(f, "literal #{val}"),
            TokenKind::Command(cmd) => write!(f, "`{cmd}`"),
            TokenKind::Eol => f.write_str("end of line"),
        }
    }
}

/// Test if a character separates tokens.
pub(crate) fn is_whitespace(c: char) -> bool {
    // Commas are essentially whitespace in LC3
    matches!(c, ' ' | '\n' | '\t' | '\r' | ',')
}

/// Splits a single line into tokens. Spans are offset by the position of the line in the file.
pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    line_offs: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(line: &'a str, line_offs: usize) -> Self {
        Lexer {
            cursor: Cursor::new(line),
            line_offs,
        }
    }

    /// Produce the next token. Returns [`TokenKind::Eol`] forever once the line is exhausted.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        self.cursor.take_while(is_whitespace);
        self.cursor.reset_pos();
        let start = Idx(self.line_offs + self.cursor.pos());

        if self.cursor.is_eof() || self.cursor.first() == ';' {
            self.cursor.take_while(|_| true);
            return Ok(Token {
                kind: TokenKind::Eol,
                span: Span::new(start, 0),
            });
        }

        self.cursor.take_while(|c| !is_whitespace(c) && c != ';');
        let text = self.cursor.token_str();
        let span = Span::new(start, self.cursor.pos_in_token());
        let kind = classify(text).map_err(|e| e.at(span))?;
        Ok(Token { kind, span })
    }
}

fn classify(text: &str) -> Result<TokenKind<'_>> {
    let malformed = |expected: &'static str| Error::MalformedOperand {
        expected,
        found: format!("`{text}`"),
        span: None,
    };
    let (head, rest) = text.split_at(text.chars().next().map_or(0, char::len_utf8));
    let kind = match head {
        "R" | "r" if is_digits(rest, 10) => {
            TokenKind::Reg(rest.parse().map_err(|_| malformed("register"))?)
        }
        "#" => TokenKind::Imm(rest.parse().map_err(|_| malformed("decimal literal"))?),
        "x" | "X" if is_digits(rest, 16) => TokenKind::Imm(
            i32::from_str_radix(rest, 16).map_err(|_| malformed("hex literal"))?,
        ),
        _ => TokenKind::Command(text),
    };
    Ok(kind)
}

fn is_digits(s: &str, radix: u32) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_digit(radix))
}

#[cfg(test)]
mod tests {
    use miette::SourceSpan;

    use super::*;

    fn tokenize(line: &str) -> Result<Vec<Token<'_>>> {
        let mut lexer = Lexer::new(line, 0);
        let mut toks = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            if tok.kind == TokenKind::Eol {
                return Ok(toks);
            }
            toks.push(tok);
        }
    }

    fn range(span: Span) -> (usize, usize) {
        let span = SourceSpan::from(span);
        (span.offset(), span.len())
    }

    fn kinds(line: &str) -> Vec<TokenKind<'_>> {
        tokenize(line).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn splits_on_commas_and_whitespace() {
        assert_eq!(
            kinds("ADD R0, R1,\t#-5"),
            vec![
                TokenKind::Command("ADD"),
                TokenKind::Reg(0),
                TokenKind::Reg(1),
                TokenKind::Imm(-5)
            ]
        );
    }

    #[test]
    fn literals() {
        assert_eq!(kinds("#15 #+3 x25 X1f"), vec![
            TokenKind::Imm(15),
            TokenKind::Imm(3),
            TokenKind::Imm(0x25),
            TokenKind::Imm(0x1F),
        ]);
    }

    #[test]
    fn registers_are_not_range_checked() {
        assert_eq!(kinds("r7 R12"), vec![TokenKind::Reg(7), TokenKind::Reg(12)]);
    }

    #[test]
    fn words_that_look_like_operands() {
        // Not digits after the prefix, so these stay commands
        assert_eq!(kinds("RET x HALT"), vec![
            TokenKind::Command("RET"),
            TokenKind::Command("x"),
            TokenKind::Command("HALT"),
        ]);
    }

    #[test]
    fn trailing_comment() {
        assert_eq!(kinds("NOT R0 R0 ; flip"), vec![
            TokenKind::Command("NOT"),
            TokenKind::Reg(0),
            TokenKind::Reg(0),
        ]);
        assert!(kinds("   ; only a comment").is_empty());
        assert!(kinds("").is_empty());
    }

    #[test]
    fn bad_literal() {
        assert!(matches!(
            tokenize("ADD R0 R0 #abc"),
            Err(Error::MalformedOperand { expected: "decimal literal", span: Some(_), .. })
        ));
        assert!(tokenize("LD R0 #99999999999").is_err());
    }

    #[test]
    fn spans_include_line_offset() {
        let mut lexer = Lexer::new("  LEA R1", 10);
        let tok = lexer.next_token().unwrap();
        assert_eq!(range(tok.span), (12, 3));
        let tok = lexer.next_token().unwrap();
        assert_eq!(range(tok.span), (16, 2));
        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.kind, TokenKind::Eol);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eol);
    }
}
