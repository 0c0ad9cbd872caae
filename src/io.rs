use std::collections::VecDeque;
use std::io::{stdin, stdout, ErrorKind, IsTerminal, Read, Write};

use ::console::Term;

use crate::error::{Error, Result};

/// Character device used by the `OUT` and `IN` traps.
pub trait Console {
    fn put_char(&mut self, ch: u8) -> Result<()>;
    /// Block until a character is available.
    fn get_char(&mut self) -> Result<u8>;
}

/// Standard output, and standard input or an unbuffered terminal.
#[derive(Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn put_char(&mut self, ch: u8) -> Result<()> {
        let mut out = stdout();
        out.write_all(&[ch])
            .and_then(|_| out.flush())
            .map_err(|e| Error::io("failed to write to console", e))
    }

    fn get_char(&mut self) -> Result<u8> {
        if stdin().is_terminal() {
            let term = Term::stdout();
            loop {
                let ch = term
                    .read_char()
                    .map_err(|e| Error::io("failed to read from terminal", e))?;
                // Characters that do not fit a byte are dropped
                if let Ok(byte) = u8::try_from(u32::from(ch)) {
                    return Ok(byte);
                }
            }
        } else {
            let mut buf = [0; 1];
            stdin().read_exact(&mut buf).map_err(|e| {
                let context = match e.kind() {
                    ErrorKind::UnexpectedEof => "reached end of console input",
                    _ => "failed to read from console",
                };
                Error::io(context, e)
            })?;
            Ok(buf[0])
        }
    }
}

/// In-memory console, mostly for tests and embedding.
#[derive(Default, Debug)]
pub struct BufferConsole {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl BufferConsole {
    pub fn with_input(input: &[u8]) -> Self {
        BufferConsole {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Console for BufferConsole {
    fn put_char(&mut self, ch: u8) -> Result<()> {
        self.output.push(ch);
        Ok(())
    }

    fn get_char(&mut self) -> Result<u8> {
        self.input.pop_front().ok_or_else(|| {
            Error::io(
                "reached end of console input",
                ErrorKind::UnexpectedEof.into(),
            )
        })
    }
}
