use colored::Colorize;

use crate::encode;
use crate::error::{Error, Result, UnknownMnemonic};
use crate::image::Image;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::runtime::RunState;
use crate::span::Span;
use crate::symbol::{trap, Mnemonic};

/// Output of a successful assembly.
#[derive(Debug)]
pub struct Assembly {
    /// Full memory image with the program placed at x3000
    pub image: Image,
    /// Number of words emitted
    pub len: usize,
    /// Lines that were skipped because their mnemonic is not known
    pub warnings: Vec<UnknownMnemonic>,
}

/// Turns source text into a memory image, one line at a time.
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
    image: Image,
    /// Next free address. Wider than an address so that running off the end is detectable.
    pc: u32,
    warnings: Vec<UnknownMnemonic>,
    trace: bool,
}

// ADD and AND accept a register or an immediate as the last operand
enum Choice {
    Reg(u16),
    Imm(i32),
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str) -> Self {
        AsmParser {
            src,
            image: Image::new(),
            pc: RunState::ORIGIN as u32,
            warnings: Vec::new(),
            trace: false,
        }
    }

    /// Print every emitted word to stderr.
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    /// Assemble the whole source. Stops at the first fatal error.
    pub fn parse(mut self) -> Result<Assembly> {
        let src = self.src;
        let mut offs = 0;
        for (idx, raw) in src.split_inclusive('\n').enumerate() {
            let line = raw.trim_end_matches(['\n', '\r']);
            self.parse_line(line, offs, idx + 1)?;
            offs += raw.len();
        }
        Ok(Assembly {
            image: self.image,
            len: (self.pc - RunState::ORIGIN as u32) as usize,
            warnings: self.warnings,
        })
    }

    fn parse_line(&mut self, line: &'a str, offs: usize, line_no: usize) -> Result<()> {
        // Full line comment, not tokenized at all
        if line.starts_with(';') {
            return Ok(());
        }

        let mut lexer = Lexer::new(line, offs);
        let head = lexer.next_token()?;
        let cmd = match head.kind {
            TokenKind::Eol => return Ok(()),
            TokenKind::Command(cmd) => cmd,
            other => {
                return Err(Error::MalformedOperand {
                    expected: "mnemonic",
                    found: other.to_string(),
                    span: Some(head.span.into()),
                })
            }
        };

        let Ok(mnemonic) = cmd.parse::<Mnemonic>() else {
            // Skipped without consuming an address
            self.warnings.push(UnknownMnemonic {
                mnemonic: cmd.to_string(),
                line: line_no,
                span: head.span.into(),
            });
            return Ok(());
        };

        let mut ops = Operands::new(lexer, head.span);
        let word = Self::encode(mnemonic, &mut ops).map_err(|e| ops.locate(e))?;
        ops.finish()?;

        let addr = self.emit(word)?;
        if self.trace {
            eprintln!(
                "{:>12} x{addr:04X} = x{word:04X}  {}",
                "Emit".cyan(),
                line.trim()
            );
        }
        Ok(())
    }

    /// Consume the operands of `mnemonic` and pack them.
    fn encode(mnemonic: Mnemonic, ops: &mut Operands) -> Result<u16> {
        match mnemonic {
            Mnemonic::Add => {
                let (dest, src) = (ops.reg()?, ops.reg()?);
                match ops.reg_or_imm()? {
                    Choice::Reg(src2) => encode::add_reg(dest, src, src2),
                    Choice::Imm(imm) => encode::add_imm(dest, src, imm),
                }
            }
            Mnemonic::And => {
                let (dest, src) = (ops.reg()?, ops.reg()?);
                match ops.reg_or_imm()? {
                    Choice::Reg(src2) => encode::and_reg(dest, src, src2),
                    Choice::Imm(imm) => encode::and_imm(dest, src, imm),
                }
            }
            Mnemonic::Not => encode::not(ops.reg()?, ops.reg()?),
            Mnemonic::Ld => encode::ld(ops.reg()?, ops.imm()?),
            Mnemonic::St => encode::st(ops.reg()?, ops.imm()?),
            Mnemonic::Ldi => encode::ldi(ops.reg()?, ops.imm()?),
            Mnemonic::Sti => encode::sti(ops.reg()?, ops.imm()?),
            Mnemonic::Lea => encode::lea(ops.reg()?, ops.imm()?),
            Mnemonic::Ldr => encode::ldr(ops.reg()?, ops.reg()?, ops.imm()?),
            Mnemonic::Str => encode::str(ops.reg()?, ops.reg()?, ops.imm()?),
            Mnemonic::Br(flags) => encode::br(flags, ops.imm()?),
            Mnemonic::Jmp => encode::jmp(ops.reg()?),
            Mnemonic::Ret => encode::jmp(7),
            Mnemonic::Trap => encode::trap(ops.imm()?),
            Mnemonic::Halt => encode::trap(trap::HALT as i32),
            Mnemonic::Out => encode::trap(trap::OUT as i32),
            Mnemonic::In => encode::trap(trap::IN as i32),
            Mnemonic::Fill => encode::fill(ops.imm()?),
        }
    }

    /// Store a word at the program counter and advance it. Returns the address written.
    fn emit(&mut self, word: u16) -> Result<u16> {
        let addr = u16::try_from(self.pc).map_err(|_| Error::PcOverflow)?;
        self.image[addr] = word;
        self.pc += 1;
        Ok(addr)
    }
}

/// Operand tokens of one line, remembering where each came from for error reporting.
struct Operands<'a> {
    lexer: Lexer<'a>,
    /// Span of the mnemonic, used when nothing more specific is known
    head: Span,
    regs: Vec<(u16, Span)>,
    imm: Option<Span>,
}

impl<'a> Operands<'a> {
    fn new(lexer: Lexer<'a>, head: Span) -> Self {
        Operands {
            lexer,
            head,
            regs: Vec::new(),
            imm: None,
        }
    }

    fn unexpected(expected: &'static str, tok: Token) -> Error {
        Error::MalformedOperand {
            expected,
            found: tok.kind.to_string(),
            span: Some(tok.span.into()),
        }
    }

    fn reg(&mut self) -> Result<u16> {
        let tok = self.lexer.next_token()?;
        match tok.kind {
            TokenKind::Reg(idx) => {
                self.regs.push((idx, tok.span));
                Ok(idx)
            }
            _ => Err(Self::unexpected("register", tok)),
        }
    }

    fn imm(&mut self) -> Result<i32> {
        let tok = self.lexer.next_token()?;
        match tok.kind {
            TokenKind::Imm(val) => {
                self.imm = Some(tok.span);
                Ok(val)
            }
            _ => Err(Self::unexpected("numeric literal", tok)),
        }
    }

    fn reg_or_imm(&mut self) -> Result<Choice> {
        let tok = self.lexer.next_token()?;
        match tok.kind {
            TokenKind::Reg(idx) => {
                self.regs.push((idx, tok.span));
                Ok(Choice::Reg(idx))
            }
            TokenKind::Imm(val) => {
                self.imm = Some(tok.span);
                Ok(Choice::Imm(val))
            }
            _ => Err(Self::unexpected("register or numeric literal", tok)),
        }
    }

    /// Error if anything but a comment follows the last operand.
    fn finish(&mut self) -> Result<()> {
        let tok = self.lexer.next_token()?;
        match tok.kind {
            TokenKind::Eol => Ok(()),
            _ => Err(Self::unexpected("end of line", tok)),
        }
    }

    /// Point an encoding error at the operand that caused it.
    fn locate(&self, err: Error) -> Error {
        let span = match &err {
            Error::BadRegister { index, .. } => self
                .regs
                .iter()
                .find(|(idx, _)| idx == index)
                .map(|(_, span)| *span),
            Error::OutOfRange { .. } | Error::BadTrapVector { .. } => self.imm,
            _ => None,
        };
        err.at(span.unwrap_or(self.head))
    }
}
