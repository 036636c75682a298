//! Two-pass assembler for the MOS 6502 and WDC 65C02
//!
//! The pipeline is tokenizer → parser → compiler. The parser drives a stack
//! of tokenizers, pushing on `.include` and popping at end of stream, and
//! produces a single [Program] of statements. The compiler walks that tree
//! twice: pass 1 lays out addresses and defines labels, pass 2 resolves
//! references and emits the bytes.
//!
//! Comments start with a semicolon (`;`) and continue to the end of the
//! line. Labels end with `:` and are case-sensitive; mnemonics are matched
//! case-insensitively. A label whose name is a pure decimal integer is a
//! local label, may be defined any number of times, and is referenced as
//! `1f` (nearest following definition) or `1b` (nearest preceding one).
//!
//! Numbers are written as `$12`/`0x12` (hex), `%101`/`0b101` (binary),
//! decimal, or `'c'` (character ordinal). `NAME = expr` defines a
//! compile-time constant. Expressions fold `+`/`-` left-associatively and
//! support the unary low/high byte operators `<` and `>`.
//!
//! The assembler supports the following directives:
//! - .org expr: set the program counter
//! - .byte expr-list: emit one byte per value; strings expand char-by-char
//! - .word expr-list: emit two bytes per value, little-endian
//! - .fill count[, value]: emit `count` bytes of `value` (default 0)
//! - .align expr: pad with zeros to the next multiple
//! - .cpu "6502" | "65c02": switch the active opcode table mid-source
//! - .include "path", .inc "path": splice another source file in place
//! - .ifdef SYM ... [.else ...] .endif: assemble a block conditionally
//! - .enum [Name] ... .end: allocate sequential integers to member symbols

pub mod compiler;
pub mod opcodes;
pub mod parser;
pub mod statement;
pub mod symbols;
pub mod tokenizer;

use std::fmt;
use std::path::Path;

pub use compiler::Compiler;
pub use opcodes::CpuMode;
pub use parser::Parser;
pub use statement::{AddressingMode, Expression, Program, Statement, SymbolKind};
pub use symbols::SymbolTable;

/// Assemble source code text into a vector of bytes
pub fn assemble(source: &str) -> Result<Vec<u8>, Error> {
    let program = Parser::from_source(source).parse_program()?;
    let mut compiler = Compiler::new();
    compiler.compile(&program)?;
    Ok(compiler.into_bytes())
}

/// Assemble a file into a vector of bytes
pub fn assemble_from_file(path: &str) -> Result<Vec<u8>, Error> {
    let program = Parser::from_file(Path::new(path))?.parse_program()?;
    let mut compiler = Compiler::new();
    compiler.compile(&program)?;
    Ok(compiler.into_bytes())
}

/// An error that can occur during the assembly process
///
/// All errors are fatal to the current run; there is no recovery. The
/// `Display` form is `FILE:LINE: MESSAGE (LEXEME)`, dropping the parts
/// that are not available.
#[derive(Debug)]
pub enum Error {
    /// An unrecognized character in the source
    Lex {
        lexeme: String,
        line: usize,
        file: Option<String>,
    },
    /// An unexpected token or malformed statement
    Parse {
        message: String,
        lexeme: String,
        line: usize,
        file: Option<String>,
    },
    /// A missing or cyclic `.include`
    Include {
        message: String,
        path: String,
        line: usize,
        file: Option<String>,
    },
    /// A pass-2 reference to an undefined symbol or local label
    Resolve {
        message: String,
        line: usize,
        file: Option<String>,
    },
    /// A branch offset outside [-128, 127]
    Range {
        message: String,
        line: usize,
        file: Option<String>,
    },
    /// An addressing mode or mnemonic the active CPU does not have
    Encoding {
        message: String,
        line: usize,
        file: Option<String>,
    },
    /// A directive argument with an invalid value
    Value {
        message: String,
        line: usize,
        file: Option<String>,
    },
    /// A file could not be read
    Read { path: String },
    /// An internal inconsistency. If you see this, this is probably a bug
    /// in the assembler itself
    Internal { message: String },
}

fn location(file: &Option<String>, line: usize) -> String {
    match file {
        Some(file) => format!("{}:{}", file, line),
        None => format!("{}", line),
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Lex { lexeme, line, file } => {
                write!(f, "{}: unknown character ({})", location(file, *line), lexeme)
            }
            Error::Parse {
                message,
                lexeme,
                line,
                file,
            } => {
                if lexeme.is_empty() {
                    write!(f, "{}: {}", location(file, *line), message)
                } else {
                    write!(f, "{}: {} ({})", location(file, *line), message, lexeme)
                }
            }
            Error::Include {
                message,
                path,
                line,
                file,
            } => write!(f, "{}: {} ({})", location(file, *line), message, path),
            Error::Resolve { message, line, file }
            | Error::Range { message, line, file }
            | Error::Encoding { message, line, file }
            | Error::Value { message, line, file } => {
                write!(f, "{}: {}", location(file, *line), message)
            }
            Error::Read { path } => write!(f, "failed to read file {}", path),
            Error::Internal { message } => write!(
                f,
                "internal error: {}. If you see this, this is probably a bug \
                 in the assembler itself",
                message
            ),
        }
    }
}

impl std::error::Error for Error {}
