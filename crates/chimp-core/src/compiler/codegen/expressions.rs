// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression compilation.

use std::sync::Arc;

use super::{Compiler, MAX_U8_OPERAND, MAX_U16_OPERAND, Result, check_limit};
use crate::ast::*;
use crate::compiler::bytecode::OpCode;
use crate::compiler::symbol_table::SymbolScope;
use crate::error::CompileError;
use crate::runtime::function::CompiledFunction;
use crate::runtime::value::Value;

impl Compiler {
    /// Compiles an expression, leaving exactly one value on the stack.
    pub(super) fn compile_expression(&mut self, expr: &Expression) -> Result<()> {
        match expr {
            Expression::Identifier(ident) => {
                let symbol = self.resolve(&ident.name)?;
                self.load_symbol(&symbol);
            }
            Expression::Integer(n) => {
                let index = self.add_constant(Value::Integer(*n))?;
                self.emit(OpCode::Constant, &[index]);
            }
            Expression::String(s) => {
                let index = self.add_constant(Value::string(s.as_str()))?;
                self.emit(OpCode::Constant, &[index]);
            }
            Expression::Boolean(true) => {
                self.emit(OpCode::True, &[]);
            }
            Expression::Boolean(false) => {
                self.emit(OpCode::False, &[]);
            }
            Expression::Null => {
                self.emit(OpCode::Null, &[]);
            }
            Expression::Prefix(prefix) => {
                self.compile_expression(&prefix.right)?;
                let op = match prefix.operator {
                    PrefixOperator::Minus => OpCode::Minus,
                    PrefixOperator::Bang => OpCode::Bang,
                };
                self.emit(op, &[]);
            }
            Expression::Infix(infix) => {
                self.compile_expression(&infix.left)?;
                self.compile_expression(&infix.right)?;
                self.emit(infix_opcode(infix.operator), &[]);
            }
            Expression::Logical(logical) => self.compile_logical(logical)?,
            Expression::Assign(assign) => self.compile_assign(assign)?,
            Expression::Array(elements) => {
                check_limit("array elements", elements.len(), MAX_U16_OPERAND)?;
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(OpCode::Array, &[elements.len()]);
            }
            Expression::Hash(pairs) => {
                check_limit("hash elements", pairs.len() * 2, MAX_U16_OPERAND)?;
                for (key, value) in pairs {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(OpCode::Hash, &[pairs.len() * 2]);
            }
            Expression::Index(index) => {
                self.compile_expression(&index.left)?;
                self.compile_expression(&index.index)?;
                self.emit(OpCode::Index, &[]);
            }
            Expression::Function(func) => self.compile_function(func)?,
            Expression::Call(call) => {
                check_limit("arguments", call.arguments.len(), MAX_U8_OPERAND)?;
                self.compile_expression(&call.function)?;
                for argument in &call.arguments {
                    self.compile_expression(argument)?;
                }
                self.emit(OpCode::Call, &[call.arguments.len()]);
            }
        }
        Ok(())
    }

    /// `&&` and `||` keep the left value when it decides the result.
    fn compile_logical(&mut self, logical: &LogicalExpression) -> Result<()> {
        self.compile_expression(&logical.left)?;

        let op = match logical.operator {
            LogicalOperator::And => OpCode::JumpNotTruthyNoPop,
            LogicalOperator::Or => OpCode::JumpTruthyNoPop,
        };
        let short_circuit = self.emit_jump(op);

        self.emit(OpCode::Pop, &[]);
        self.compile_expression(&logical.right)?;
        self.patch_jump_here(short_circuit)
    }

    fn compile_assign(&mut self, assign: &AssignExpression) -> Result<()> {
        let Expression::Identifier(target) = assign.target.as_ref() else {
            return Err(CompileError::InvalidAssignmentTarget(assign.target.to_string()));
        };

        let symbol = self.resolve(&target.name)?;
        if !matches!(symbol.scope, SymbolScope::Global | SymbolScope::Local) {
            return Err(CompileError::InvalidAssignmentTarget(target.name.clone()));
        }

        match assign.operator {
            Some(operator) => {
                if !is_arithmetic(operator) {
                    return Err(CompileError::UnknownOperator(format!("{}=", operator.as_str())));
                }
                self.load_symbol(&symbol);
                self.compile_expression(&assign.value)?;
                self.emit(infix_opcode(operator), &[]);
            }
            None => self.compile_expression(&assign.value)?,
        }

        let op = match symbol.scope {
            SymbolScope::Global => OpCode::SetGlobalNoPop,
            _ => OpCode::SetLocalNoPop,
        };
        self.emit(op, &[symbol.index]);
        Ok(())
    }

    fn compile_function(&mut self, func: &FunctionLiteral) -> Result<()> {
        self.enter_function();
        let body = self.compile_function_body(func);
        let finished = self.leave_function();
        body?;

        check_limit("free variables", finished.free_symbols.len(), MAX_U8_OPERAND)?;
        for free in &finished.free_symbols {
            self.load_symbol(free);
        }

        let compiled = CompiledFunction {
            name: func.name.clone(),
            instructions: finished.instructions,
            num_locals: finished.num_locals,
            num_parameters: func.parameters.len(),
        };
        let index = self.add_constant(Value::Function(Arc::new(compiled)))?;
        self.emit(OpCode::Closure, &[index, finished.free_symbols.len()]);
        Ok(())
    }

    fn compile_function_body(&mut self, func: &FunctionLiteral) -> Result<()> {
        if let Some(name) = &func.name {
            self.symbol_table.define_function_name(name);
        }

        check_limit("parameters", func.parameters.len(), MAX_U8_OPERAND)?;
        for parameter in &func.parameters {
            self.define(&parameter.name)?;
        }

        for stmt in &func.body.body {
            self.compile_statement(stmt)?;
        }

        if !matches!(func.body.body.last(), Some(Statement::Return(_))) {
            self.emit(OpCode::Return, &[]);
        }
        Ok(())
    }
}

fn infix_opcode(operator: InfixOperator) -> OpCode {
    match operator {
        InfixOperator::Add => OpCode::Add,
        InfixOperator::Sub => OpCode::Sub,
        InfixOperator::Mul => OpCode::Mul,
        InfixOperator::Div => OpCode::Div,
        InfixOperator::Mod => OpCode::Mod,
        InfixOperator::Equal => OpCode::Equal,
        InfixOperator::NotEqual => OpCode::NotEqual,
        InfixOperator::LessThan => OpCode::LessThan,
        InfixOperator::LessEqual => OpCode::LessEqual,
        InfixOperator::GreaterThan => OpCode::GreaterThan,
        InfixOperator::GreaterEqual => OpCode::GreaterEqual,
    }
}

fn is_arithmetic(operator: InfixOperator) -> bool {
    matches!(
        operator,
        InfixOperator::Add
            | InfixOperator::Sub
            | InfixOperator::Mul
            | InfixOperator::Div
            | InfixOperator::Mod
    )
}
