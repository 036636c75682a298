//! Splits one assembly source into a stream of [Token]s
//!
//! Each tokenizer owns a single character buffer and tracks the 1-based line
//! it is currently reading. Newlines are significant (they become
//! [TokenKind::Eol] tokens); everything from a `;` to the end of the line is
//! stripped without consuming the newline itself.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::assembler::Error;

/// What a single token is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A byte no rule recognized; the parser surfaces it as an error
    Unknown,
    Eol,
    Eof,
    Identifier,
    /// A `.`-prefixed directive name, dot included in the lexeme
    Directive,
    Number,
    Str,
    Operator,
    /// A decimal integer followed by `f` or `b`, e.g. `1f`
    LocalLabelRef,
}

/// The parsed payload of a token, where one exists
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    None,
    Int(i64),
    Str(String),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub value: TokenValue,
    pub line: usize,
}

impl Token {
    /// Get the integer payload of a number token
    pub fn int_value(&self) -> Option<i64> {
        match self.value {
            TokenValue::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Get the string payload of a string token (quotes already stripped)
    pub fn str_value(&self) -> Option<&str> {
        match &self.value {
            TokenValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Token recognition rules, tried in order against the remaining buffer
const PATTERNS: &[(TokenKind, &str)] = &[
    (TokenKind::Eol, r"^\n"),
    (TokenKind::Directive, r"^\.[A-Za-z0-9_]+"),
    (TokenKind::Number, r"^\$[0-9A-Fa-f]+"),
    (TokenKind::Number, r"^0x[0-9A-Fa-f]+"),
    (TokenKind::Number, r"^%[01]+"),
    (TokenKind::Number, r"^0b[01]+"),
    (TokenKind::LocalLabelRef, r"^[0-9]+[fb]"),
    (TokenKind::Number, r"^[0-9]+"),
    (TokenKind::Str, r#"^"[^"]*""#),
    (TokenKind::Number, r"^'[^']'"),
    (TokenKind::Operator, r"^[#=<>(),@:+\-*/]"),
    (TokenKind::Identifier, r"^[A-Za-z_][A-Za-z0-9_]*"),
];

/// Turns the text of one source file into tokens
pub struct Tokenizer {
    text: String,
    pos: usize,
    line: usize,
    filename: Option<PathBuf>,
    patterns: Vec<(TokenKind, Regex)>,
}

impl Tokenizer {
    /// Create a tokenizer over an in-memory source with no backing file
    pub fn new(source: &str, filename: Option<PathBuf>) -> Tokenizer {
        let patterns = PATTERNS
            .iter()
            .map(|&(kind, pattern)| (kind, Regex::new(pattern).unwrap()))
            .collect();
        Tokenizer {
            text: source.to_string(),
            pos: 0,
            line: 1,
            filename,
            patterns,
        }
    }

    /// Create a tokenizer reading from a file on disk
    pub fn from_file(path: &Path) -> Result<Tokenizer, Error> {
        let text = fs::read_to_string(path).map_err(|_| Error::Read {
            path: path.display().to_string(),
        })?;
        Ok(Tokenizer::new(&text, Some(path.to_path_buf())))
    }

    /// The file this tokenizer reads from, as it was opened
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// The next token in the buffer; [TokenKind::Eof] forever once exhausted
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();

            if self.pos >= self.text.len() {
                return self.accept(TokenKind::Eof, String::new(), TokenValue::None);
            }

            if self.text.as_bytes()[self.pos] == b';' {
                self.skip_comment();
                continue;
            }

            let remaining = &self.text[self.pos..];
            for (kind, pattern) in &self.patterns {
                if let Some(mat) = pattern.find(remaining) {
                    let kind = *kind;
                    let lexeme = mat.as_str().to_string();
                    self.pos += lexeme.len();

                    if kind == TokenKind::Eol {
                        self.line += 1;
                        return Token {
                            kind,
                            lexeme,
                            value: TokenValue::None,
                            line: self.line - 1,
                        };
                    }

                    return match parse_value(kind, &lexeme) {
                        Some(value) => self.accept(kind, lexeme, value),
                        // e.g. a numeric literal too large to represent
                        None => self.accept(TokenKind::Unknown, lexeme, TokenValue::None),
                    };
                }
            }

            // unrecognized byte
            let ch = remaining.chars().next().unwrap();
            self.pos += ch.len_utf8();
            return self.accept(TokenKind::Unknown, ch.to_string(), TokenValue::None);
        }
    }

    fn accept(&self, kind: TokenKind, lexeme: String, value: TokenValue) -> Token {
        Token {
            kind,
            lexeme,
            value,
            line: self.line,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.text.len() {
            match self.text.as_bytes()[self.pos] {
                b' ' | b'\t' | b'\r' => self.pos += 1,
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        // consume up to but not including the newline, so it still yields Eol
        while self.pos < self.text.len() && self.text.as_bytes()[self.pos] != b'\n' {
            self.pos += 1;
        }
    }
}

fn parse_value(kind: TokenKind, lexeme: &str) -> Option<TokenValue> {
    match kind {
        TokenKind::Number => {
            let value = if let Some(hex) = lexeme.strip_prefix('$') {
                i64::from_str_radix(hex, 16).ok()?
            } else if let Some(hex) = lexeme.strip_prefix("0x") {
                i64::from_str_radix(hex, 16).ok()?
            } else if let Some(bin) = lexeme.strip_prefix('%') {
                i64::from_str_radix(bin, 2).ok()?
            } else if let Some(bin) = lexeme.strip_prefix("0b") {
                i64::from_str_radix(bin, 2).ok()?
            } else if lexeme.starts_with('\'') {
                lexeme.chars().nth(1)? as i64
            } else {
                lexeme.parse().ok()?
            };
            Some(TokenValue::Int(value))
        }
        TokenKind::Str => Some(TokenValue::Str(lexeme[1..lexeme.len() - 1].to_string())),
        _ => Some(TokenValue::None),
    }
}
