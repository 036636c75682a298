//! Token stream → statement tree
//!
//! The parser owns a stack of tokenizers. The active tokenizer is the top
//! of the stack: `.include` pushes a new one, and when the active tokenizer
//! reports end of file with the stack non-empty it is popped transparently,
//! so included files splice into one logical token stream. A small peek
//! buffer provides the two-token look-ahead needed to tell a bare `A`
//! (accumulator) operand apart from a symbol named `A`.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::{env, fs, mem};

use crate::assembler::Error;
use crate::assembler::statement::{
    AddressingMode, BinaryOp, EnumMember, Expression, Program, Statement, StatementKind,
    SymbolKind,
};
use crate::assembler::tokenizer::{Token, TokenKind, Tokenizer};

pub struct Parser {
    lex: Tokenizer,
    stack: Vec<Tokenizer>,
    peeked: VecDeque<Token>,
}

impl Parser {
    pub fn new(tokenizer: Tokenizer) -> Parser {
        Parser {
            lex: tokenizer,
            stack: Vec::new(),
            peeked: VecDeque::new(),
        }
    }

    /// Parse in-memory source with no backing file
    pub fn from_source(source: &str) -> Parser {
        Parser::new(Tokenizer::new(source, None))
    }

    /// Parse a source file from disk
    pub fn from_file(path: &Path) -> Result<Parser, Error> {
        Ok(Parser::new(Tokenizer::from_file(path)?))
    }

    /// Parse statements until the outermost source is exhausted
    pub fn parse_program(&mut self) -> Result<Program, Error> {
        let mut statements = Vec::new();
        while self.peek().kind != TokenKind::Eof {
            if let Some(stmt) = self.parse_statement()? {
                statements.push(stmt);
            }
        }
        Ok(Program { statements })
    }

    // ---- token plumbing ----

    fn read_next_token(&mut self) -> Token {
        let mut tok = self.lex.next_token();
        // the end of an included file is invisible to the caller
        while tok.kind == TokenKind::Eof {
            match self.stack.pop() {
                Some(outer) => {
                    self.lex = outer;
                    tok = self.lex.next_token();
                }
                None => break,
            }
        }
        tok
    }

    fn peek_at(&mut self, offset: usize) -> &Token {
        while self.peeked.len() <= offset {
            let tok = self.read_next_token();
            self.peeked.push_back(tok);
        }
        &self.peeked[offset]
    }

    fn peek(&mut self) -> &Token {
        self.peek_at(0)
    }

    fn next(&mut self) -> Token {
        match self.peeked.pop_front() {
            Some(tok) => tok,
            None => self.read_next_token(),
        }
    }

    /// Consume and return the next token iff it matches
    fn expect(&mut self, kind: TokenKind, lexeme: Option<&str>, casei: bool) -> Option<Token> {
        let tok = self.peek();
        if tok.kind != kind {
            return None;
        }
        if let Some(expected) = lexeme {
            let matches = if casei {
                tok.lexeme.eq_ignore_ascii_case(expected)
            } else {
                tok.lexeme == expected
            };
            if !matches {
                return None;
            }
        }
        Some(self.next())
    }

    /// Like [Parser::expect], but a mismatch is a parse error
    fn require(&mut self, kind: TokenKind, lexeme: Option<&str>, casei: bool) -> Result<Token, Error> {
        if let Some(tok) = self.expect(kind, lexeme, casei) {
            return Ok(tok);
        }
        let tok = self.peek().clone();
        let message = match lexeme {
            Some(expected) => format!("Expected '{}', got '{}'", expected, tok.lexeme),
            None => format!("Expected {:?}, got {:?}", kind, tok.kind),
        };
        Err(self.parse_error(message, &tok))
    }

    /// Require the end of the statement; end of file counts
    fn require_eol(&mut self) -> Result<(), Error> {
        match self.peek().kind {
            TokenKind::Eol => {
                self.next();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => {
                let tok = self.peek().clone();
                Err(self.parse_error("Expected end of line", &tok))
            }
        }
    }

    fn current_file(&self) -> Option<String> {
        self.lex.filename().map(|p| p.display().to_string())
    }

    fn parse_error(&self, message: impl Into<String>, tok: &Token) -> Error {
        Error::Parse {
            message: message.into(),
            lexeme: tok.lexeme.clone(),
            line: tok.line,
            file: self.current_file(),
        }
    }

    fn statement(&self, kind: StatementKind, line: usize) -> Statement {
        Statement {
            kind,
            line,
            file: self.current_file(),
        }
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> Result<Option<Statement>, Error> {
        if self.expect(TokenKind::Eol, None, false).is_some() {
            return Ok(None);
        }
        if self.peek().kind == TokenKind::Eof {
            return Ok(None);
        }

        if let Some(tok) = self.expect(TokenKind::Directive, None, false) {
            return self.parse_directive(tok);
        }

        // local labels are declared as a bare decimal followed by ':'
        let local_label = self.peek().kind == TokenKind::Number && {
            let next = self.peek_at(1);
            next.kind == TokenKind::Operator && next.lexeme == ":"
        };
        if local_label {
            let tok = self.next();
            if !tok.lexeme.chars().all(|c| c.is_ascii_digit()) {
                return Err(self.parse_error("Local label names must be decimal", &tok));
            }
            self.next();
            let stmt = self.statement(StatementKind::Label { name: tok.lexeme }, tok.line);
            return Ok(Some(stmt));
        }

        if let Some(tok) = self.expect(TokenKind::Identifier, None, false) {
            if self.expect(TokenKind::Operator, Some(":"), false).is_some() {
                let stmt = self.statement(StatementKind::Label { name: tok.lexeme }, tok.line);
                return Ok(Some(stmt));
            }
            if self.expect(TokenKind::Operator, Some("="), false).is_some() {
                let value = self.parse_expr()?;
                self.require_eol()?;
                let stmt = self.statement(
                    StatementKind::Assignment {
                        name: tok.lexeme,
                        value,
                    },
                    tok.line,
                );
                return Ok(Some(stmt));
            }
            return self.parse_instruction(tok).map(Some);
        }

        let tok = self.peek().clone();
        if tok.kind == TokenKind::Unknown {
            return Err(Error::Lex {
                lexeme: tok.lexeme,
                line: tok.line,
                file: self.current_file(),
            });
        }
        Err(self.parse_error("Unexpected token", &tok))
    }

    fn parse_directive(&mut self, tok: Token) -> Result<Option<Statement>, Error> {
        match tok.lexeme.as_str() {
            ".include" | ".inc" => {
                self.handle_include(&tok)?;
                Ok(None)
            }
            ".ifdef" => self.parse_ifdef(&tok).map(Some),
            ".enum" => self.parse_enum(&tok).map(Some),
            ".byte" | ".word" | ".fill" => {
                let args = self.parse_expr_list()?;
                self.require_eol()?;
                Ok(Some(self.statement(
                    StatementKind::Directive {
                        name: tok.lexeme,
                        args,
                    },
                    tok.line,
                )))
            }
            ".org" | ".cpu" | ".align" => {
                let args = vec![self.parse_expr()?];
                self.require_eol()?;
                Ok(Some(self.statement(
                    StatementKind::Directive {
                        name: tok.lexeme,
                        args,
                    },
                    tok.line,
                )))
            }
            ".else" | ".endif" | ".end" => {
                Err(self.parse_error("Unexpected block terminator", &tok))
            }
            _ => Err(self.parse_error("Unknown directive", &tok)),
        }
    }

    /// `.ifdef SYM` up to the matching `.else`/`.endif`, nesting allowed
    fn parse_ifdef(&mut self, tok: &Token) -> Result<Statement, Error> {
        let condition = self.require(TokenKind::Identifier, None, false)?;
        self.require_eol()?;

        let (then_block, terminator) = self.parse_block(&[".else", ".endif"], ".ifdef")?;
        let else_block = if terminator == ".else" {
            self.require_eol()?;
            let (block, _) = self.parse_block(&[".endif"], ".ifdef")?;
            block
        } else {
            Vec::new()
        };
        self.require_eol()?;

        Ok(self.statement(
            StatementKind::IfDef {
                condition: condition.lexeme,
                then_block,
                else_block,
            },
            tok.line,
        ))
    }

    /// Parse statements until one of `terminators`; consumes the terminator
    /// directive (but not its line ending) and returns which one it was
    fn parse_block(
        &mut self,
        terminators: &[&str],
        opener: &str,
    ) -> Result<(Vec<Statement>, String), Error> {
        let mut statements = Vec::new();
        loop {
            let tok = self.peek().clone();
            if tok.kind == TokenKind::Eof {
                return Err(self.parse_error(format!("Unterminated {} block", opener), &tok));
            }
            if tok.kind == TokenKind::Directive && terminators.contains(&tok.lexeme.as_str()) {
                self.next();
                return Ok((statements, tok.lexeme));
            }
            if let Some(stmt) = self.parse_statement()? {
                statements.push(stmt);
            }
        }
    }

    /// `.enum [Name]` followed by one member per line, closed by `.end`
    fn parse_enum(&mut self, tok: &Token) -> Result<Statement, Error> {
        let name = self
            .expect(TokenKind::Identifier, None, false)
            .map(|t| t.lexeme);
        self.require_eol()?;

        let mut members = Vec::new();
        loop {
            if self.expect(TokenKind::Eol, None, false).is_some() {
                continue;
            }
            let next = self.peek().clone();
            if next.kind == TokenKind::Eof {
                return Err(self.parse_error("Unterminated .enum block", &next));
            }
            if next.kind == TokenKind::Directive && next.lexeme == ".end" {
                self.next();
                self.require_eol()?;
                break;
            }
            let member = self.require(TokenKind::Identifier, None, false)?;
            let value = if self.expect(TokenKind::Operator, Some("="), false).is_some() {
                Some(self.parse_expr()?)
            } else {
                None
            };
            self.require_eol()?;
            members.push(EnumMember {
                name: member.lexeme,
                value,
            });
        }

        Ok(self.statement(StatementKind::Enum { name, members }, tok.line))
    }

    /// Open the included file and make it the active tokenizer
    fn handle_include(&mut self, tok: &Token) -> Result<(), Error> {
        let arg = self.require(TokenKind::Str, None, false)?;
        let filename = arg.str_value().unwrap_or_default().to_string();
        self.require_eol()?;

        // relative to the directory of the including source
        let base_dir = self
            .lex
            .filename()
            .and_then(|f| fs::canonicalize(f).ok())
            .and_then(|f| f.parent().map(Path::to_path_buf))
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let path = base_dir.join(&filename);

        if !path.exists() {
            return Err(self.include_error("Include file not found", &path, tok));
        }

        let abs = fs::canonicalize(&path).ok();
        let open_sources = self.stack.iter().chain(std::iter::once(&self.lex));
        for source in open_sources {
            let Some(f) = source.filename() else { continue };
            if abs.is_some() && fs::canonicalize(f).ok() == abs {
                return Err(self.include_error("Recursive include detected", &path, tok));
            }
        }

        let new_lex = Tokenizer::from_file(&path)?;
        self.stack.push(mem::replace(&mut self.lex, new_lex));
        Ok(())
    }

    fn include_error(&self, message: &str, path: &Path, tok: &Token) -> Error {
        Error::Include {
            message: message.to_string(),
            path: path.display().to_string(),
            line: tok.line,
            file: self.current_file(),
        }
    }

    // ---- instructions ----

    fn parse_instruction(&mut self, tok: Token) -> Result<Statement, Error> {
        let mnemonic = tok.lexeme.to_uppercase();
        let (mode, operand) = self.parse_operands()?;
        self.require_eol()?;
        Ok(self.statement(
            StatementKind::Instruction {
                mnemonic,
                mode,
                operand,
            },
            tok.line,
        ))
    }

    fn parse_operands(&mut self) -> Result<(AddressingMode, Option<Expression>), Error> {
        let kind = self.peek().kind;
        if kind == TokenKind::Eol || kind == TokenKind::Eof {
            return Ok((AddressingMode::Implied, None));
        }

        // a bare `A` at the end of the line is the accumulator, not a symbol
        if self.peek().kind == TokenKind::Identifier
            && self.peek().lexeme.eq_ignore_ascii_case("A")
        {
            let after = self.peek_at(1).kind;
            if after == TokenKind::Eol || after == TokenKind::Eof {
                self.next();
                return Ok((AddressingMode::Accumulator, None));
            }
        }

        if self.expect(TokenKind::Operator, Some("#"), false).is_some() {
            let expr = self.parse_expr()?;
            return Ok((AddressingMode::Immediate, Some(expr)));
        }

        if self.expect(TokenKind::Operator, Some("("), false).is_some() {
            let expr = self.parse_expr()?;
            // (expr,X)
            if self.expect(TokenKind::Operator, Some(","), false).is_some() {
                self.require(TokenKind::Identifier, Some("X"), true)?;
                self.require(TokenKind::Operator, Some(")"), false)?;
                return Ok((AddressingMode::IndexedIndirect, Some(expr)));
            }
            self.require(TokenKind::Operator, Some(")"), false)?;
            // (expr),Y
            if self.expect(TokenKind::Operator, Some(","), false).is_some() {
                self.require(TokenKind::Identifier, Some("Y"), true)?;
                return Ok((AddressingMode::IndirectIndexed, Some(expr)));
            }
            // (expr)
            return Ok((AddressingMode::Indirect, Some(expr)));
        }

        // absolute family; the compiler demotes to zero page where legal
        let expr = self.parse_expr()?;
        if self.expect(TokenKind::Operator, Some(","), false).is_some() {
            if self.expect(TokenKind::Identifier, Some("X"), true).is_some() {
                return Ok((AddressingMode::AbsoluteX, Some(expr)));
            }
            if self.expect(TokenKind::Identifier, Some("Y"), true).is_some() {
                return Ok((AddressingMode::AbsoluteY, Some(expr)));
            }
            let tok = self.peek().clone();
            return Err(self.parse_error("Expected index register X or Y", &tok));
        }
        Ok((AddressingMode::Absolute, Some(expr)))
    }

    // ---- expressions ----

    /// `expr := term (('+' | '-') term)*`, folding integer operands eagerly
    fn parse_expr(&mut self) -> Result<Expression, Error> {
        let mut val = self.parse_term()?;
        loop {
            let op = if self.expect(TokenKind::Operator, Some("+"), false).is_some() {
                BinaryOp::Add
            } else if self.expect(TokenKind::Operator, Some("-"), false).is_some() {
                BinaryOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_term()?;
            val = match (val, rhs) {
                (Expression::Int(lhs), Expression::Int(rhs)) => Expression::Int(match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                }),
                (lhs, rhs) => Expression::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            };
        }
        Ok(val)
    }

    fn parse_term(&mut self) -> Result<Expression, Error> {
        if let Some(tok) = self.expect(TokenKind::Operator, Some("<"), false) {
            return self.byte_select(SymbolKind::LowByte, &tok);
        }
        if let Some(tok) = self.expect(TokenKind::Operator, Some(">"), false) {
            return self.byte_select(SymbolKind::HighByte, &tok);
        }
        if let Some(tok) = self.expect(TokenKind::Number, None, false) {
            return Ok(Expression::Int(tok.int_value().unwrap_or(0)));
        }
        if let Some(tok) = self.expect(TokenKind::Identifier, None, false) {
            let mut name = tok.lexeme;
            // an attached `.member` token forms a scoped name like `Vec.Lo`
            if self.peek().kind == TokenKind::Directive {
                let member = self.next();
                name.push_str(&member.lexeme);
            }
            return Ok(Expression::Unresolved {
                name,
                kind: SymbolKind::Address,
            });
        }
        if let Some(tok) = self.expect(TokenKind::LocalLabelRef, None, false) {
            return Ok(Expression::Unresolved {
                name: tok.lexeme,
                kind: SymbolKind::LocalRel,
            });
        }
        if let Some(tok) = self.expect(TokenKind::Str, None, false) {
            return Ok(Expression::Str(tok.str_value().unwrap_or_default().to_string()));
        }

        let tok = self.peek().clone();
        if tok.kind == TokenKind::Unknown {
            return Err(Error::Lex {
                lexeme: tok.lexeme,
                line: tok.line,
                file: self.current_file(),
            });
        }
        Err(self.parse_error("Unexpected token in expression", &tok))
    }

    /// Apply unary `<` or `>`: fold on integers, retag a plain symbol
    fn byte_select(&mut self, kind: SymbolKind, tok: &Token) -> Result<Expression, Error> {
        let expr = self.parse_expr()?;
        match expr {
            Expression::Int(v) => Ok(Expression::Int(match kind {
                SymbolKind::LowByte => v & 0xFF,
                _ => (v >> 8) & 0xFF,
            })),
            Expression::Unresolved { name, .. } => Ok(Expression::Unresolved { name, kind }),
            _ => Err(self.parse_error("Cannot take a byte of a compound expression", tok)),
        }
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Expression>, Error> {
        let mut list = vec![self.parse_expr()?];
        loop {
            let kind = self.peek().kind;
            if kind == TokenKind::Eol || kind == TokenKind::Eof {
                break;
            }
            self.require(TokenKind::Operator, Some(","), false)?;
            list.push(self.parse_expr()?);
        }
        Ok(list)
    }
}
