// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Statement compilation.

use super::{Compiler, LoopContext, Result};
use crate::ast::*;
use crate::compiler::bytecode::OpCode;
use crate::error::CompileError;

impl Compiler {
    /// Compiles a single statement.
    pub(super) fn compile_statement(&mut self, stmt: &Statement) -> Result<()> {
        match stmt {
            Statement::Let(let_stmt) => self.compile_let(let_stmt),
            Statement::Expression(expr) => {
                self.compile_expression(expr)?;
                self.emit(OpCode::Pop, &[]);
                Ok(())
            }
            Statement::Return(value) => {
                match value {
                    Some(expr) => {
                        self.compile_expression(expr)?;
                        self.emit(OpCode::ReturnValue, &[]);
                    }
                    None => {
                        self.emit(OpCode::Return, &[]);
                    }
                }
                Ok(())
            }
            Statement::Block(block) => self.compile_block(block),
            Statement::If(if_stmt) => self.compile_if(if_stmt),
            Statement::While(while_stmt) => self.compile_while(while_stmt),
            Statement::DoWhile(do_while) => self.compile_do_while(do_while),
            Statement::For(for_stmt) => self.compile_for(for_stmt),
            Statement::Break => self.compile_loop_jump(false),
            Statement::Continue => self.compile_loop_jump(true),
        }
    }

    fn compile_let(&mut self, let_stmt: &LetStatement) -> Result<()> {
        // The value is compiled first so it still sees any outer binding
        // of the same name.
        match &let_stmt.value {
            Some(value) => self.compile_expression(value)?,
            None => {
                self.emit(OpCode::Null, &[]);
            }
        }
        let symbol = self.define(&let_stmt.name.name)?;
        self.store_symbol(&symbol);
        Ok(())
    }

    fn compile_block(&mut self, block: &BlockStatement) -> Result<()> {
        self.in_block(|compiler| {
            for stmt in &block.body {
                compiler.compile_statement(stmt)?;
            }
            Ok(())
        })
    }

    /// Compiles a branch or loop body. A bare statement gets its own block,
    /// so a `let` in it cannot outlive the statement and be read from a
    /// slot it never wrote.
    fn compile_body(&mut self, body: &Statement) -> Result<()> {
        match body {
            Statement::Block(_) => self.compile_statement(body),
            _ => self.in_block(|compiler| compiler.compile_statement(body)),
        }
    }

    fn compile_if(&mut self, if_stmt: &IfStatement) -> Result<()> {
        self.compile_expression(&if_stmt.condition)?;
        let jump_not_truthy = self.emit_jump(OpCode::JumpNotTruthy);

        self.compile_body(&if_stmt.consequence)?;

        match &if_stmt.alternative {
            Some(alternative) => {
                let jump_to_end = self.emit_jump(OpCode::Jump);
                self.patch_jump_here(jump_not_truthy)?;
                self.compile_body(alternative)?;
                self.patch_jump_here(jump_to_end)
            }
            None => self.patch_jump_here(jump_not_truthy),
        }
    }

    fn compile_while(&mut self, while_stmt: &WhileStatement) -> Result<()> {
        let condition = self.current_offset();
        self.compile_expression(&while_stmt.condition)?;
        let exit = self.emit_jump(OpCode::JumpNotTruthy);

        self.scope_mut().begin_loop();
        let body = self.compile_body(&while_stmt.body);
        let context = self.scope_mut().end_loop();
        body?;

        self.emit_jump_to(OpCode::Jump, condition)?;
        self.patch_jump_here(exit)?;
        self.patch_loop(context, self.current_offset(), condition)
    }

    fn compile_do_while(&mut self, do_while: &DoWhileStatement) -> Result<()> {
        let body_start = self.current_offset();

        self.scope_mut().begin_loop();
        let body = self.compile_body(&do_while.body);
        let context = self.scope_mut().end_loop();
        body?;

        let condition = self.current_offset();
        self.compile_expression(&do_while.condition)?;
        let exit = self.emit_jump(OpCode::JumpNotTruthy);
        self.emit_jump_to(OpCode::Jump, body_start)?;
        self.patch_jump_here(exit)?;

        self.patch_loop(context, self.current_offset(), condition)
    }

    fn compile_for(&mut self, for_stmt: &ForStatement) -> Result<()> {
        // The init clause gets its own block so its bindings end with the loop.
        self.in_block(|compiler| {
            if let Some(init) = &for_stmt.init {
                compiler.compile_statement(init)?;
            }

            let condition = compiler.current_offset();
            let exit = match &for_stmt.condition {
                Some(cond) => {
                    compiler.compile_expression(cond)?;
                    Some(compiler.emit_jump(OpCode::JumpNotTruthy))
                }
                None => None,
            };

            compiler.scope_mut().begin_loop();
            let body = compiler.compile_body(&for_stmt.body);
            let context = compiler.scope_mut().end_loop();
            body?;

            let update = compiler.current_offset();
            if let Some(expr) = &for_stmt.update {
                compiler.compile_expression(expr)?;
                compiler.emit(OpCode::Pop, &[]);
            }
            compiler.emit_jump_to(OpCode::Jump, condition)?;

            if let Some(exit) = exit {
                compiler.patch_jump_here(exit)?;
            }
            compiler.patch_loop(context, compiler.current_offset(), update)
        })
    }

    /// Emits a `break` or `continue` jump for the innermost loop.
    fn compile_loop_jump(&mut self, is_continue: bool) -> Result<()> {
        if self.scope_mut().current_loop().is_none() {
            return Err(if is_continue {
                CompileError::ContinueOutsideLoop
            } else {
                CompileError::BreakOutsideLoop
            });
        }

        let position = self.emit_jump(OpCode::Jump);
        if let Some(context) = self.scope_mut().current_loop() {
            if is_continue {
                context.continues.push(position);
            } else {
                context.breaks.push(position);
            }
        }
        Ok(())
    }

    /// Resolves a finished loop's `break` and `continue` jumps.
    fn patch_loop(&mut self, context: LoopContext, exit: usize, resume: usize) -> Result<()> {
        for position in context.breaks {
            self.patch_jump(position, exit)?;
        }
        for position in context.continues {
            self.patch_jump(position, resume)?;
        }
        Ok(())
    }
}
