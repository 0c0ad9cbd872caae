// Heavily inspired and referenced from `rustc_lexer` and adapted to suit the project.
// See https://doc.rust-lang.org/beta/nightly-rustc/src/rustc_lexer/cursor.rs.html

use std::str::Chars;

/// Peekable iterator over a char sequence.
#[derive(Clone)]
pub struct Cursor<'a> {
    /// Length of the whole input, used to derive positions
    len_total: usize,
    /// Length of the input that remained when the current token started
    len_at_token: usize,
    chars: Chars<'a>,
    input: &'a str,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Cursor<'a> {
        Cursor {
            len_total: input.len(),
            len_at_token: input.len(),
            chars: input.chars(),
            input,
        }
    }

    /// Peek the next character without consuming it. Returns `'\0'` at end of input.
    pub fn first(&self) -> char {
        self.chars.clone().next().unwrap_or('\0')
    }

    /// File is finished parsing
    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    /// Advance by one character
    pub fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    /// Consume characters while the predicate holds.
    pub fn take_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while predicate(self.first()) && !self.is_eof() {
            self.bump();
        }
    }

    /// Byte offset of the cursor from the start of the input.
    pub fn pos(&self) -> usize {
        self.len_total - self.chars.as_str().len()
    }

    /// Bytes consumed since the last [`Cursor::reset_pos`].
    pub fn pos_in_token(&self) -> usize {
        self.len_at_token - self.chars.as_str().len()
    }

    /// Start a new token at the current position.
    pub fn reset_pos(&mut self) {
        self.len_at_token = self.chars.as_str().len();
    }

    /// Text of the token consumed since the last [`Cursor::reset_pos`].
    pub fn token_str(&self) -> &'a str {
        let start = self.len_total - self.len_at_token;
        &self.input[start..self.pos()]
    }
}
