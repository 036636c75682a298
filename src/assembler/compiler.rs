//! Two-pass address layout and byte emission
//!
//! Pass 1 walks the statement tree to assign every label an address and to
//! size every instruction, without producing output. Pass 2 re-walks the
//! same tree, resolves all references against the now-complete symbol
//! table, and appends opcode and operand bytes.
//!
//! Mode and size decisions are made once, in pass 1, and replayed verbatim
//! in pass 2. This keeps the two passes in lockstep: a forward reference
//! whose value turns out to fit in the zero page still assembles as a
//! 3-byte absolute instruction, because that is how pass 1 counted it.

use std::collections::HashMap;

use crate::assembler::Error;
use crate::assembler::opcodes::CpuMode;
use crate::assembler::statement::{
    AddressingMode, BinaryOp, EnumMember, Expression, Program, Statement, StatementKind,
    SymbolKind,
};
use crate::assembler::symbols::SymbolTable;

pub struct Compiler {
    symbols: SymbolTable,
    /// Local (decimal) labels; every definition PC, in source order
    local_labels: HashMap<String, Vec<i64>>,
    bytes: Vec<u8>,
    pc: i64,
    pass_num: u8,
    cpu: CpuMode,
    /// The first address set by `.org`, i.e. the image load address
    start_origin: Option<i64>,
    // pass-1 layout decisions, replayed in pass 2
    instruction_layout: Vec<(AddressingMode, u8)>,
    directive_layout: Vec<i64>,
    ifdef_choices: Vec<bool>,
    layout_index: usize,
    directive_index: usize,
    ifdef_index: usize,
}

impl Compiler {
    pub fn new() -> Compiler {
        Compiler {
            symbols: SymbolTable::new(),
            local_labels: HashMap::new(),
            bytes: Vec::new(),
            pc: 0,
            pass_num: 1,
            cpu: CpuMode::Mos6502,
            start_origin: None,
            instruction_layout: Vec::new(),
            directive_layout: Vec::new(),
            ifdef_choices: Vec::new(),
            layout_index: 0,
            directive_index: 0,
            ifdef_index: 0,
        }
    }

    /// Run both passes over the program
    pub fn compile(&mut self, program: &Program) -> Result<(), Error> {
        self.pass_num = 1;
        self.pc = 0;
        self.cpu = CpuMode::Mos6502;
        self.instruction_layout.clear();
        self.directive_layout.clear();
        self.ifdef_choices.clear();
        self.visit_block(&program.statements)?;

        self.pass_num = 2;
        self.pc = 0;
        self.cpu = CpuMode::Mos6502;
        self.layout_index = 0;
        self.directive_index = 0;
        self.ifdef_index = 0;
        self.visit_block(&program.statements)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Mutable access, e.g. for pre-seeding `-D` definitions
    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The load address of the image; 0 when no `.org` was seen
    pub fn start_origin(&self) -> i64 {
        self.start_origin.unwrap_or(0)
    }

    // ---- statement walk ----

    fn visit_block(&mut self, statements: &[Statement]) -> Result<(), Error> {
        for stmt in statements {
            self.visit_statement(stmt)?;
        }
        Ok(())
    }

    fn visit_statement(&mut self, stmt: &Statement) -> Result<(), Error> {
        match &stmt.kind {
            StatementKind::Label { name } => self.visit_label(stmt, name),
            StatementKind::Assignment { name, value } => {
                if self.pass_num == 1 {
                    if let Some(v) = self.resolve(value) {
                        self.symbols.set(name, Some(v));
                    }
                    // unresolvable assignments surface at their uses in pass 2
                }
                Ok(())
            }
            StatementKind::Directive { name, args } => self.visit_directive(stmt, name, args),
            StatementKind::Instruction {
                mnemonic,
                mode,
                operand,
            } => self.visit_instruction(stmt, mnemonic, *mode, operand.as_ref()),
            StatementKind::IfDef {
                condition,
                then_block,
                else_block,
            } => self.visit_ifdef(condition, then_block, else_block),
            StatementKind::Enum { name, members } => {
                self.visit_enum(stmt, name.as_deref(), members)
            }
        }
    }

    fn visit_label(&mut self, stmt: &Statement, name: &str) -> Result<(), Error> {
        if self.pass_num != 1 {
            return Ok(());
        }
        if name.chars().all(|c| c.is_ascii_digit()) {
            self.local_labels
                .entry(name.to_string())
                .or_default()
                .push(self.pc);
            return Ok(());
        }
        if self.symbols.contains(name) {
            return Err(stmt.resolve_error(format!("Symbol '{}' already defined", name)));
        }
        self.symbols.set(name, Some(self.pc));
        Ok(())
    }

    fn visit_ifdef(
        &mut self,
        condition: &str,
        then_block: &[Statement],
        else_block: &[Statement],
    ) -> Result<(), Error> {
        // the pass-1 decision is recorded so that a symbol defined further
        // down cannot make pass 2 walk a different block
        let take = if self.pass_num == 1 {
            let take = self.symbols.contains(condition);
            self.ifdef_choices.push(take);
            take
        } else {
            let take = self
                .ifdef_choices
                .get(self.ifdef_index)
                .copied()
                .ok_or_else(|| Error::Internal {
                    message: "conditional block walk diverged between passes".to_string(),
                })?;
            self.ifdef_index += 1;
            take
        };
        if take {
            self.visit_block(then_block)
        } else {
            self.visit_block(else_block)
        }
    }

    fn visit_enum(
        &mut self,
        stmt: &Statement,
        scope: Option<&str>,
        members: &[EnumMember],
    ) -> Result<(), Error> {
        if self.pass_num != 1 {
            return Ok(());
        }
        let mut counter = 0i64;
        for member in members {
            if let Some(expr) = &member.value {
                counter = self.resolve(expr).ok_or_else(|| {
                    stmt.resolve_error(format!(
                        "Could not resolve enum value for '{}'",
                        member.name
                    ))
                })?;
            }
            let qualified = match scope {
                Some(scope) => format!("{}.{}", scope, member.name),
                None => member.name.clone(),
            };
            if self.symbols.contains(&qualified) {
                return Err(stmt.resolve_error(format!("Symbol '{}' already defined", qualified)));
            }
            self.symbols.set(&qualified, Some(counter));
            counter += 1;
        }
        Ok(())
    }

    // ---- directives ----

    fn visit_directive(
        &mut self,
        stmt: &Statement,
        name: &str,
        args: &[Expression],
    ) -> Result<(), Error> {
        match name {
            ".org" => {
                let value = self.layout_arg(stmt, args, 0, ".org")?;
                self.pc = value;
                if self.start_origin.is_none() {
                    self.start_origin = Some(value);
                }
                Ok(())
            }
            ".byte" => {
                for arg in args {
                    // strings expand character by character
                    if let Expression::Str(s) = arg {
                        for ch in s.chars() {
                            self.emit_byte(ch as i64);
                        }
                    } else {
                        // values above 255 keep their low byte
                        let value = self.resolve_or_default(stmt, arg)?;
                        self.emit_byte(value);
                    }
                }
                Ok(())
            }
            ".word" => {
                for arg in args {
                    let value = self.resolve_or_default(stmt, arg)?;
                    self.emit_word(value);
                }
                Ok(())
            }
            ".fill" => {
                let count = self.layout_arg(stmt, args, 0, ".fill")?;
                if count < 0 {
                    return Err(
                        stmt.value_error(format!("Fill count must not be negative, got {}", count))
                    );
                }
                let value = match args.get(1) {
                    Some(arg) => self.resolve_or_default(stmt, arg)?,
                    None => 0,
                };
                for _ in 0..count {
                    self.emit_byte(value);
                }
                Ok(())
            }
            ".align" => {
                let alignment = self.layout_arg(stmt, args, 0, ".align")?;
                if alignment <= 0 {
                    return Err(
                        stmt.value_error(format!("Alignment must be positive, got {}", alignment))
                    );
                }
                let remainder = self.pc.rem_euclid(alignment);
                if remainder > 0 {
                    for _ in 0..(alignment - remainder) {
                        self.emit_byte(0);
                    }
                }
                Ok(())
            }
            ".cpu" => {
                let mode_name = match args.first() {
                    Some(Expression::Str(s)) => s.as_str(),
                    Some(Expression::Unresolved { name, .. }) => name.as_str(),
                    _ => return Err(stmt.value_error("Expected a CPU name string".to_string())),
                };
                self.cpu = CpuMode::from_name(mode_name)
                    .ok_or_else(|| stmt.value_error(format!("Unknown CPU mode: {}", mode_name)))?;
                Ok(())
            }
            _ => Err(stmt.encoding_error(format!("Unknown directive {}", name))),
        }
    }

    // ---- instructions ----

    fn visit_instruction(
        &mut self,
        stmt: &Statement,
        mnemonic: &str,
        mode: AddressingMode,
        operand: Option<&Expression>,
    ) -> Result<(), Error> {
        if self.pass_num == 1 {
            let (mode, size) = self.select_mode(mnemonic, mode, operand);
            self.instruction_layout.push((mode, size));
            self.pc += size as i64;
            return Ok(());
        }

        let (mode, size) = self
            .instruction_layout
            .get(self.layout_index)
            .copied()
            .ok_or_else(|| Error::Internal {
                message: "instruction walk diverged between passes".to_string(),
            })?;
        self.layout_index += 1;

        let modes = self
            .cpu
            .table()
            .get(mnemonic)
            .ok_or_else(|| stmt.encoding_error(format!("Unknown instruction {}", mnemonic)))?;
        let opcode = modes.get(&mode).copied().ok_or_else(|| {
            stmt.encoding_error(format!(
                "Addressing mode {:?} not supported for {}",
                mode, mnemonic
            ))
        })?;

        match mode {
            AddressingMode::Relative => {
                let operand = operand.ok_or_else(|| {
                    stmt.resolve_error(format!("Missing branch target for {}", mnemonic))
                })?;
                let target = self.resolve(operand).ok_or_else(|| {
                    stmt.resolve_error(format!("Unresolved branch target '{}'", operand))
                })?;
                // offset is relative to the end of this 2-byte instruction
                let offset = target - (self.pc + 2);
                if !(-128..=127).contains(&offset) {
                    return Err(stmt.range_error(format!("Branch out of range: {}", offset)));
                }
                self.emit_byte(opcode as i64);
                self.emit_byte(offset);
            }
            _ if size == 1 => {
                self.emit_byte(opcode as i64);
            }
            _ => {
                let operand = operand.ok_or_else(|| {
                    stmt.resolve_error(format!("Missing operand for {}", mnemonic))
                })?;
                let value = self.resolve(operand).ok_or_else(|| {
                    stmt.resolve_error(format!("Unresolved reference '{}'", operand))
                })?;
                self.emit_byte(opcode as i64);
                if size == 2 {
                    self.emit_byte(value);
                } else {
                    self.emit_word(value);
                }
            }
        }
        Ok(())
    }

    /// Pick the final addressing mode and byte size of an instruction
    fn select_mode(
        &self,
        mnemonic: &str,
        mode: AddressingMode,
        operand: Option<&Expression>,
    ) -> (AddressingMode, u8) {
        let modes = self.cpu.table().get(mnemonic);

        // the parser labels branch targets Absolute; remap for mnemonics
        // that only know Relative
        let mut mode = mode;
        if mode == AddressingMode::Absolute {
            if let Some(modes) = modes {
                if modes.contains_key(&AddressingMode::Relative)
                    && !modes.contains_key(&AddressingMode::Absolute)
                {
                    mode = AddressingMode::Relative;
                }
            }
        }

        let size = match mode {
            AddressingMode::Implied | AddressingMode::Accumulator => 1,
            AddressingMode::Immediate | AddressingMode::Relative => 2,
            AddressingMode::Absolute | AddressingMode::AbsoluteX | AddressingMode::AbsoluteY => {
                let zp_mode = match mode {
                    AddressingMode::Absolute => AddressingMode::ZeroPage,
                    AddressingMode::AbsoluteX => AddressingMode::ZeroPageX,
                    _ => AddressingMode::ZeroPageY,
                };
                let supports_zp = modes.is_some_and(|m| m.contains_key(&zp_mode));
                // demote only when the operand is already known to fit
                let value = operand.and_then(|expr| self.resolve(expr));
                match value {
                    Some(v) if supports_zp && (0..256).contains(&v) => {
                        mode = zp_mode;
                        2
                    }
                    _ => 3,
                }
            }
            // (abs) and (abs,X) exist only for JMP; all other indirects
            // take a zero-page operand
            AddressingMode::Indirect | AddressingMode::IndexedIndirect => {
                if mnemonic == "JMP" { 3 } else { 2 }
            }
            AddressingMode::IndirectIndexed => 2,
            AddressingMode::ZeroPage | AddressingMode::ZeroPageX | AddressingMode::ZeroPageY => 2,
        };
        (mode, size)
    }

    // ---- expression resolution ----

    /// Collapse an expression to an integer, or `None` if any symbol in it
    /// has no value yet
    fn resolve(&self, expr: &Expression) -> Option<i64> {
        match expr {
            Expression::Int(v) => Some(*v),
            Expression::Str(_) => None,
            Expression::Unresolved { name, kind } => match kind {
                SymbolKind::Address => self.symbols.get(name),
                SymbolKind::LowByte => self.symbols.get(name).map(|v| v & 0xFF),
                SymbolKind::HighByte => self.symbols.get(name).map(|v| (v >> 8) & 0xFF),
                SymbolKind::LocalRel => self.resolve_local(name),
            },
            Expression::Binary { op, lhs, rhs } => {
                let lhs = self.resolve(lhs)?;
                let rhs = self.resolve(rhs)?;
                Some(match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                })
            }
        }
    }

    /// Resolve a `1f`/`1b` reference relative to the current PC
    fn resolve_local(&self, name: &str) -> Option<i64> {
        let (label, direction) = name.split_at(name.len() - 1);
        let positions = self.local_labels.get(label)?;
        match direction {
            "f" => positions.iter().copied().filter(|&p| p > self.pc).min(),
            _ => positions.iter().copied().filter(|&p| p <= self.pc).max(),
        }
    }

    /// Resolve an argument that shapes the layout. It must be concrete when
    /// pass 1 reaches it, and pass 2 reuses the pass-1 value so that a later
    /// assignment override cannot make the passes disagree on the PC.
    fn layout_arg(
        &mut self,
        stmt: &Statement,
        args: &[Expression],
        index: usize,
        directive: &str,
    ) -> Result<i64, Error> {
        if self.pass_num == 1 {
            let arg = args.get(index).ok_or_else(|| Error::Internal {
                message: format!("missing {} argument", directive),
            })?;
            let value = self.resolve(arg).ok_or_else(|| {
                stmt.resolve_error(format!("Could not resolve {} argument '{}'", directive, arg))
            })?;
            self.directive_layout.push(value);
            return Ok(value);
        }
        let value = self
            .directive_layout
            .get(self.directive_index)
            .copied()
            .ok_or_else(|| Error::Internal {
                message: "directive walk diverged between passes".to_string(),
            })?;
        self.directive_index += 1;
        Ok(value)
    }

    /// Resolve an emitted value: unknown is 0 in pass 1, an error in pass 2
    fn resolve_or_default(&self, stmt: &Statement, expr: &Expression) -> Result<i64, Error> {
        match self.resolve(expr) {
            Some(v) => Ok(v),
            None if self.pass_num == 1 => Ok(0),
            None => Err(stmt.resolve_error(format!("Unresolved reference '{}'", expr))),
        }
    }

    // ---- emission ----

    fn emit_byte(&mut self, value: i64) {
        if self.pass_num == 2 {
            self.bytes.push((value & 0xFF) as u8);
        }
        self.pc += 1;
    }

    fn emit_word(&mut self, value: i64) {
        // little-endian
        self.emit_byte(value & 0xFF);
        self.emit_byte((value >> 8) & 0xFF);
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}
