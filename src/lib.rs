// Assembling
mod encode;
mod lexer;
mod parser;
pub use parser::{AsmParser, Assembly};

// Running
mod image;
pub use image::{Image, IMAGE_BYTES, MEMORY_MAX};
mod io;
pub use io::{BufferConsole, Console, StdConsole};
mod runtime;
pub use runtime::{sign_extend, RunState};

mod error;
pub use error::{Error, Result, UnknownMnemonic};
mod span;
mod symbol;
pub use symbol::{BrFlags, Condition};

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 4;

/// Assemble `src` into a memory image.
pub fn assemble(src: &str) -> Result<Assembly> {
    AsmParser::new(src).parse()
}
