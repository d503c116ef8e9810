// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Code generation from AST to bytecode.
//!
//! The `Compiler` walks a [`Program`] once and emits a flat instruction
//! stream plus a constant pool. Its symbol table and constant pool persist
//! across calls to [`Compiler::compile`], so later units can refer to
//! globals defined by earlier ones.

mod expressions;
mod scope;
mod statements;


pub use scope::{CompilationScope, LoopContext};

use tracing::debug;

use crate::ast::Program;
use crate::builtins::BUILTINS;
use crate::compiler::bytecode::{Bytecode, Instructions, OpCode, make};
use crate::compiler::symbol_table::{Symbol, SymbolScope, SymbolTable};
use crate::error::CompileError;
use crate::runtime::value::Value;

type Result<T> = std::result::Result<T, CompileError>;

/// Largest constant pool, global index, jump target and aggregate size (u16 operands).
const MAX_U16_OPERAND: usize = u16::MAX as usize;
/// Largest local index, argument count and free-variable count (u8 operands).
const MAX_U8_OPERAND: usize = u8::MAX as usize;

/// Placeholder target for jumps that are patched later.
const PLACEHOLDER: usize = 9999;

/// Compiles AST to bytecode.
pub struct Compiler {
    constants: Vec<Value>,
    symbol_table: SymbolTable,
    scopes: Vec<CompilationScope>,
}

/// Output of a compiled function body.
struct FinishedFunction {
    instructions: Instructions,
    free_symbols: Vec<Symbol>,
    num_locals: usize,
}

/// Persistent compiler state, used to roll back a failed unit.
#[derive(Debug, Clone)]
pub struct Snapshot {
    symbol_table: SymbolTable,
    constants: usize,
}

impl Compiler {
    /// Creates a compiler whose global table knows every builtin.
    pub fn new() -> Self {
        let mut symbol_table = SymbolTable::new();
        for (index, builtin) in BUILTINS.iter().enumerate() {
            symbol_table.define_builtin(index, builtin.name);
        }
        Self::with_state(symbol_table, Vec::new())
    }

    /// Creates a compiler continuing from existing state.
    pub fn with_state(symbol_table: SymbolTable, constants: Vec<Value>) -> Self {
        Self {
            constants,
            symbol_table,
            scopes: vec![CompilationScope::new()],
        }
    }

    /// Compiles one unit.
    ///
    /// On error the symbol table and constant pool may hold partial
    /// definitions; callers that keep compiling should [`restore`](Self::restore)
    /// a [`snapshot`](Self::snapshot) taken beforehand.
    pub fn compile(&mut self, program: &Program) -> Result<Bytecode> {
        self.scopes = vec![CompilationScope::new()];

        for statement in &program.body {
            self.compile_statement(statement)?;
        }

        let instructions = std::mem::take(&mut self.scope_mut().instructions);
        let bytecode = Bytecode {
            instructions,
            constants: self.constants.clone(),
            num_locals: self.symbol_table.max_locals(),
        };

        debug!(
            "Compiled unit: {} bytes, {} constants, {} locals",
            bytecode.instructions.len(),
            bytecode.constants.len(),
            bytecode.num_locals
        );

        Ok(bytecode)
    }

    /// Captures the persistent state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            symbol_table: self.symbol_table.clone(),
            constants: self.constants.len(),
        }
    }

    /// Rolls the persistent state back to `snapshot`.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.symbol_table = snapshot.symbol_table;
        self.constants.truncate(snapshot.constants);
        self.scopes = vec![CompilationScope::new()];
    }

    /// The global symbol table.
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbol_table
    }

    /// The constant pool so far.
    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    /// Splits the compiler into its persistent state.
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbol_table, self.constants)
    }

    // ========================================================================
    // Emission
    // ========================================================================

    fn scope_mut(&mut self) -> &mut CompilationScope {
        if self.scopes.is_empty() {
            self.scopes.push(CompilationScope::new());
        }
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    /// Offset the next instruction will be written at.
    fn current_offset(&self) -> usize {
        self.scopes.last().map_or(0, |scope| scope.instructions.len())
    }

    fn emit(&mut self, op: OpCode, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        self.scope_mut().instructions.push(&instruction)
    }

    /// Emits a jump whose target is patched later.
    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit(op, &[PLACEHOLDER])
    }

    /// Emits a jump to an already known offset.
    fn emit_jump_to(&mut self, op: OpCode, target: usize) -> Result<usize> {
        check_limit("jump offset", target, MAX_U16_OPERAND)?;
        Ok(self.emit(op, &[target]))
    }

    /// Points the jump at `position` to `target`.
    fn patch_jump(&mut self, position: usize, target: usize) -> Result<()> {
        check_limit("jump offset", target, MAX_U16_OPERAND)?;
        let operand = (target as u16).to_be_bytes();
        self.scope_mut().instructions.replace(position + 1, &operand);
        Ok(())
    }

    /// Points the jump at `position` to the next instruction.
    fn patch_jump_here(&mut self, position: usize) -> Result<()> {
        let target = self.current_offset();
        self.patch_jump(position, target)
    }

    fn add_constant(&mut self, value: Value) -> Result<usize> {
        let index = self.constants.len();
        check_limit("constants", index, MAX_U16_OPERAND)?;
        self.constants.push(value);
        Ok(index)
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    /// Runs `f` inside a block table, restoring the enclosing table even
    /// when `f` fails.
    fn in_block<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let outer = std::mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::new_block(outer);

        let result = f(self);

        let inner = std::mem::take(&mut self.symbol_table);
        self.symbol_table = inner.into_outer().unwrap_or_default();
        result
    }

    fn enter_function(&mut self) {
        let outer = std::mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::new_enclosed(outer);
        self.scopes.push(CompilationScope::new());
    }

    /// Leaves a function scope, returning what the closure needs from it.
    fn leave_function(&mut self) -> FinishedFunction {
        let instructions = self
            .scopes
            .pop()
            .map(|scope| scope.instructions)
            .unwrap_or_default();

        let inner = std::mem::take(&mut self.symbol_table);
        let finished = FinishedFunction {
            instructions,
            free_symbols: inner.free_symbols().to_vec(),
            num_locals: inner.max_locals(),
        };
        self.symbol_table = inner.into_outer().unwrap_or_default();
        finished
    }

    // ========================================================================
    // Symbols
    // ========================================================================

    /// Defines `name` in the current table, checking operand limits.
    fn define(&mut self, name: &str) -> Result<Symbol> {
        let symbol = self.symbol_table.define(name);
        match symbol.scope {
            SymbolScope::Global => check_limit("global variables", symbol.index, MAX_U16_OPERAND)?,
            _ => check_limit("local variables", symbol.index, MAX_U8_OPERAND)?,
        }
        Ok(symbol)
    }

    fn resolve(&mut self, name: &str) -> Result<Symbol> {
        self.symbol_table
            .resolve(name)
            .ok_or_else(|| CompileError::UndefinedVariable(name.to_string()))
    }

    fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(OpCode::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(OpCode::GetLocal, &[symbol.index]),
            SymbolScope::Builtin => self.emit(OpCode::GetBuiltin, &[symbol.index]),
            SymbolScope::Free => self.emit(OpCode::GetFree, &[symbol.index]),
            SymbolScope::FunctionSelf => self.emit(OpCode::CurrentClosure, &[]),
        };
    }

    /// Stores the top of stack into `symbol`, popping it.
    fn store_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(OpCode::SetGlobal, &[symbol.index]),
            _ => self.emit(OpCode::SetLocal, &[symbol.index]),
        };
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Fails with `LimitExceeded` when `value` does not fit below `limit`.
fn check_limit(what: &'static str, value: usize, limit: usize) -> Result<()> {
    if value > limit {
        return Err(CompileError::LimitExceeded { what, limit });
    }
    Ok(())
}
