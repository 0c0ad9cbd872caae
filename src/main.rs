use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{IntoDiagnostic, NamedSource, Report, Result};

use lc3kit::{AsmParser, Assembly, Image, RunState, StdConsole};

/// Assembler and interpreter for a 16-bit LC3-style machine.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Print every emitted or executed word to stderr
    #[arg(short, long, global = true, env = "LC3_TRACE")]
    trace: bool,

    /// Only print program output, no status lines
    #[arg(short, long, global = true)]
    minimal: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Load a binary image and run it until it halts
    Exec {
        /// Image of exactly 65536 big-endian words
        name: PathBuf,
    },
    /// Assemble a source file into a binary image
    Asm {
        /// Source file to assemble
        name: PathBuf,
        /// Destination of the image, defaults to the source name with a `.bin` extension
        dest: Option<PathBuf>,
    },
    /// Assemble a source file in memory and run it until it halts
    Run {
        /// Source file to run
        name: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    let args = Args::parse();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(lc3kit::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    let out = Reporter {
        minimal: args.minimal,
    };
    match args.command {
        Command::Exec { name } => {
            out.file_message("Loading", &name);
            let image = Image::read(&name)?;
            execute(image, &out, args.trace)
        }
        Command::Asm { name, dest } => {
            let assembly = assemble(&name, &out, args.trace)?;
            let dest = dest.unwrap_or_else(|| name.with_extension("bin"));
            assembly.image.write(&dest)?;
            out.message("Finished", &format!("{} words", assembly.len));
            out.file_message("Saved", &dest);
            Ok(())
        }
        Command::Run { name } => {
            let assembly = assemble(&name, &out, args.trace)?;
            execute(assembly.image, &out, args.trace)
        }
    }
}

/// Status line printer, silent with `--minimal`.
struct Reporter {
    minimal: bool,
}

impl Reporter {
    fn file_message(&self, left: &str, right: &Path) {
        self.message(left, &format!("target {}", right.display()));
    }

    fn message(&self, left: &str, right: &str) {
        if !self.minimal {
            println!("{:>12} {right}", left.green());
        }
    }
}

/// Assemble a source file, printing any skipped lines to stdout.
fn assemble(name: &Path, out: &Reporter, trace: bool) -> Result<Assembly> {
    out.file_message("Assembling", name);
    let src = fs::read_to_string(name).into_diagnostic()?;
    let named = || NamedSource::new(name.display().to_string(), src.clone());

    let mut parser = AsmParser::new(&src);
    parser.set_trace(trace);
    let mut assembly = parser
        .parse()
        .map_err(|e| Report::new(e).with_source_code(named()))?;

    for warning in assembly.warnings.drain(..) {
        println!("{:?}", Report::new(warning).with_source_code(named()));
    }
    Ok(assembly)
}

fn execute(image: Image, out: &Reporter, trace: bool) -> Result<()> {
    let mut state = RunState::new(image);
    state.set_trace(trace);

    out.message("Running", "from x3000");
    state.run(&mut StdConsole)?;
    if !out.minimal {
        println!("\n{:>12}", "Halted".cyan());
    }
    Ok(())
}
