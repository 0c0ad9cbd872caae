use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal assembler and interpreter errors.
///
/// Assembly errors carry an optional span into the source file. The encoder never knows where its
/// operands came from, so the parser fills the span in with [`Error::at`].
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    // Encoding errors
    #[error("cannot represent {value} in {bits} signed bits (min {min}, max {max})")]
    #[diagnostic(
        code(encode::range),
        help("the operand must fit in a two's complement field of the given width")
    )]
    OutOfRange {
        value: i32,
        bits: u32,
        min: i32,
        max: i32,
        #[label("out-of-range literal")]
        span: Option<SourceSpan>,
    },

    #[error("invalid register index {index}")]
    #[diagnostic(code(encode::register), help("registers range from R0 to R7"))]
    BadRegister {
        index: u16,
        #[label("unknown register")]
        span: Option<SourceSpan>,
    },

    #[error("invalid trap vector {vect:#x}")]
    #[diagnostic(
        code(encode::trap),
        help("supported trap vectors are x21 (OUT), x23 (IN) and x25 (HALT)")
    )]
    BadTrapVector {
        vect: i32,
        #[label("unsupported trap vector")]
        span: Option<SourceSpan>,
    },

    // Parser errors
    #[error("expected {expected}, found {found}")]
    #[diagnostic(code(parse::operand), help("check the operands for this instruction"))]
    MalformedOperand {
        expected: &'static str,
        found: String,
        #[label("unexpected token")]
        span: Option<SourceSpan>,
    },

    // Image errors
    #[error("binary image is {len} bytes long, expected {expected}")]
    #[diagnostic(
        code(image::size),
        help("images hold exactly 65536 big-endian words with no header")
    )]
    MalformedImage { len: usize, expected: usize },

    // Runtime errors
    #[error("opcode {opcode:#x} is not supported (word x{word:04X} at x{addr:04X})")]
    #[diagnostic(code(run::opcode))]
    UnknownOpcode { opcode: u16, word: u16, addr: u16 },

    #[error("trap vector {vect:#x} is not implemented (at x{addr:04X})")]
    #[diagnostic(code(run::trap))]
    UnimplementedTrap { vect: u16, addr: u16 },

    #[error("machine is halted and cannot continue")]
    #[diagnostic(code(run::halted))]
    HaltedMachine,

    #[error("program counter moved past the top of memory")]
    #[diagnostic(code(run::pc_overflow))]
    PcOverflow,

    #[error("{context}")]
    #[diagnostic(code(io))]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Attach a source location to an error that does not have one yet.
    pub fn at(mut self, at: impl Into<SourceSpan>) -> Self {
        match &mut self {
            Error::OutOfRange { span, .. }
            | Error::BadRegister { span, .. }
            | Error::BadTrapVector { span, .. }
            | Error::MalformedOperand { span, .. } => {
                if span.is_none() {
                    *span = Some(at.into());
                }
            }
            _ => {}
        }
        self
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}

/// Raised for lines whose mnemonic is not recognised. The line is skipped and assembly continues.
#[derive(Debug, Error, Diagnostic)]
#[error("unsupported instruction `{mnemonic}` on line {line}, skipping")]
#[diagnostic(
    severity(Warning),
    code(parse::unknown_mnemonic),
    help("no word was emitted for this line")
)]
pub struct UnknownMnemonic {
    pub mnemonic: String,
    pub line: usize,
    #[label("unknown mnemonic")]
    pub span: SourceSpan,
}
