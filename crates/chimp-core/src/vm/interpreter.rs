// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode interpreter.

use std::sync::Arc;

use tracing::{debug, trace};

use super::Limits;
use super::frame::Frame;
use super::operators;
use crate::compiler::bytecode::{MAX_OPERAND_WIDTH, read_u8, read_u16};
use crate::compiler::{Bytecode, OpCode};
use crate::error::RuntimeError;
use crate::runtime::context::Context;
use crate::runtime::function::{Builtin, Closure, CompiledFunction};
use crate::runtime::value::{HashEntries, HashKey, HashPair, Value};

type Result<T> = std::result::Result<T, RuntimeError>;

/// The virtual machine that executes one compiled unit.
///
/// A `Vm` borrows its [`Context`] mutably for its whole lifetime, so a
/// context can only ever back one active run.
pub struct Vm<'a> {
    constants: &'a [Value],
    context: &'a mut Context,
    /// The operand stack; slots at and above `sp` are free
    stack: Vec<Value>,
    sp: usize,
    frames: Vec<Frame>,
    max_frames: usize,
    last_popped: Value,
    /// Value of a top-level `return`, which ends the run
    returned: Option<Value>,
}

impl<'a> Vm<'a> {
    /// Prepares a run of `bytecode` against `context`.
    pub fn new(bytecode: &'a Bytecode, context: &'a mut Context, limits: Limits) -> Result<Self> {
        if bytecode.num_locals > limits.stack_size {
            return Err(RuntimeError::StackOverflow);
        }

        let main = CompiledFunction {
            name: None,
            instructions: bytecode.instructions.clone(),
            num_locals: bytecode.num_locals,
            num_parameters: 0,
        };
        let main = Arc::new(Closure::new(Arc::new(main)));

        let mut frames = Vec::with_capacity(limits.max_frames.min(64));
        frames.push(Frame::new(main, 0));

        Ok(Self {
            constants: &bytecode.constants,
            context,
            stack: vec![Value::Null; limits.stack_size],
            sp: bytecode.num_locals,
            frames,
            max_frames: limits.max_frames,
            last_popped: Value::Null,
            returned: None,
        })
    }

    /// The value most recently removed by a statement-level pop.
    pub fn last_popped(&self) -> &Value {
        &self.last_popped
    }

    /// The value on top of the stack, if any.
    pub fn stack_top(&self) -> Option<&Value> {
        self.sp.checked_sub(1).map(|i| &self.stack[i])
    }

    /// The result of the run: the value of a top-level `return`, otherwise
    /// the last popped value.
    pub fn result(&self) -> Value {
        self.returned
            .clone()
            .unwrap_or_else(|| self.last_popped.clone())
    }

    /// Runs until the top-level frame finishes.
    pub fn run(&mut self) -> Result<Value> {
        debug!("Running unit with {} constants", self.constants.len());

        loop {
            let frame = self.current_frame();
            let ip = frame.ip;
            let ins = frame.instructions();

            if ip >= ins.len() {
                // Only the top-level unit can run off its end.
                if self.frames.len() == 1 {
                    break;
                }
                if self.return_from_frame(Value::Null)? {
                    break;
                }
                continue;
            }

            let byte = ins[ip];
            let op = OpCode::try_from(byte).map_err(RuntimeError::InvalidOpcode)?;
            let width = op.operand_width();
            // Operands are copied out so the frame is not borrowed during dispatch.
            let mut operand_bytes = [0u8; MAX_OPERAND_WIDTH];
            let encoded = ins
                .get(ip + 1..ip + 1 + width)
                .ok_or(RuntimeError::InvalidOpcode(byte))?;
            operand_bytes[..width].copy_from_slice(encoded);
            let operands = &operand_bytes[..];
            self.current_frame_mut().ip = ip + 1 + width;

            match op {
                OpCode::Constant => {
                    let index = read_u16(operands, 0) as usize;
                    let value = self
                        .constants
                        .get(index)
                        .cloned()
                        .ok_or(RuntimeError::InvalidConstant(index))?;
                    self.push(value)?;
                }

                OpCode::Pop => {
                    self.last_popped = self.pop()?;
                }

                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Mod => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    self.push(operators::arithmetic(op, &left, &right)?)?;
                }

                OpCode::Equal
                | OpCode::NotEqual
                | OpCode::GreaterThan
                | OpCode::GreaterEqual
                | OpCode::LessThan
                | OpCode::LessEqual => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    self.push(operators::comparison(op, &left, &right)?)?;
                }

                OpCode::True => self.push(Value::Boolean(true))?,
                OpCode::False => self.push(Value::Boolean(false))?,
                OpCode::Null => self.push(Value::Null)?,

                OpCode::Minus => {
                    let operand = self.pop()?;
                    self.push(operators::negate(&operand)?)?;
                }

                OpCode::Bang => {
                    let operand = self.pop()?;
                    self.push(Value::Boolean(!operand.is_truthy()))?;
                }

                OpCode::Jump => {
                    self.current_frame_mut().ip = read_u16(operands, 0) as usize;
                }

                OpCode::JumpNotTruthy => {
                    let condition = self.pop()?;
                    if !condition.is_truthy() {
                        self.current_frame_mut().ip = read_u16(operands, 0) as usize;
                    }
                }

                OpCode::JumpTruthyNoPop => {
                    if self.peek()?.is_truthy() {
                        self.current_frame_mut().ip = read_u16(operands, 0) as usize;
                    }
                }

                OpCode::JumpNotTruthyNoPop => {
                    if !self.peek()?.is_truthy() {
                        self.current_frame_mut().ip = read_u16(operands, 0) as usize;
                    }
                }

                OpCode::GetGlobal => {
                    let index = read_u16(operands, 0) as usize;
                    let value = self.context.global(index)?.clone();
                    self.push(value)?;
                }

                OpCode::SetGlobal => {
                    let index = read_u16(operands, 0) as usize;
                    let value = self.pop()?;
                    self.context.set_global(index, value)?;
                }

                OpCode::SetGlobalNoPop => {
                    let index = read_u16(operands, 0) as usize;
                    let value = self.peek()?.clone();
                    self.context.set_global(index, value)?;
                }

                OpCode::GetLocal => {
                    let slot = self.local_slot(read_u8(operands, 0))?;
                    let value = self.stack[slot].clone();
                    self.push(value)?;
                }

                OpCode::SetLocal => {
                    let slot = self.local_slot(read_u8(operands, 0))?;
                    let value = self.pop()?;
                    self.stack[slot] = value;
                }

                OpCode::SetLocalNoPop => {
                    let slot = self.local_slot(read_u8(operands, 0))?;
                    self.stack[slot] = self.peek()?.clone();
                }

                OpCode::GetBuiltin => {
                    let index = read_u8(operands, 0) as usize;
                    let builtin = self
                        .context
                        .builtin(index)
                        .ok_or(RuntimeError::UnknownBuiltin(index))?;
                    self.push(Value::Builtin(builtin))?;
                }

                OpCode::GetFree => {
                    let index = read_u8(operands, 0) as usize;
                    let value = self
                        .current_frame()
                        .closure
                        .free
                        .get(index)
                        .cloned()
                        .ok_or(RuntimeError::FreeOutOfRange(index))?;
                    self.push(value)?;
                }

                OpCode::CurrentClosure => {
                    let closure = Arc::clone(&self.current_frame().closure);
                    self.push(Value::Closure(closure))?;
                }

                OpCode::Array => {
                    let count = read_u16(operands, 0) as usize;
                    let elements = self.take_top(count)?;
                    self.push(Value::array(elements))?;
                }

                OpCode::Hash => {
                    let count = read_u16(operands, 0) as usize;
                    let elements = self.take_top(count)?;
                    let hash = build_hash(elements)?;
                    self.push(hash)?;
                }

                OpCode::Index => {
                    let index = self.pop()?;
                    let collection = self.pop()?;
                    self.push(operators::index(&collection, &index)?)?;
                }

                OpCode::Call => {
                    let argc = read_u8(operands, 0) as usize;
                    self.call(argc)?;
                }

                OpCode::ReturnValue => {
                    let value = self.pop()?;
                    if self.return_from_frame(value)? {
                        break;
                    }
                }

                OpCode::Return => {
                    if self.return_from_frame(Value::Null)? {
                        break;
                    }
                }

                OpCode::Closure => {
                    let index = read_u16(operands, 0) as usize;
                    let num_free = read_u8(operands, 2) as usize;
                    self.push_closure(index, num_free)?;
                }
            }
        }

        debug!("Run finished");
        Ok(self.result())
    }

    // ========================================================================
    // Stack
    // ========================================================================

    fn push(&mut self, value: Value) -> Result<()> {
        let slot = self
            .stack
            .get_mut(self.sp)
            .ok_or(RuntimeError::StackOverflow)?;
        *slot = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<Value> {
        if self.sp == 0 {
            return Err(RuntimeError::StackUnderflow);
        }
        self.sp -= 1;
        Ok(std::mem::take(&mut self.stack[self.sp]))
    }

    fn peek(&self) -> Result<&Value> {
        self.stack_top().ok_or(RuntimeError::StackUnderflow)
    }

    /// Removes the top `count` values, oldest first.
    fn take_top(&mut self, count: usize) -> Result<Vec<Value>> {
        let start = self
            .sp
            .checked_sub(count)
            .ok_or(RuntimeError::StackUnderflow)?;
        let values = self.stack[start..self.sp]
            .iter_mut()
            .map(std::mem::take)
            .collect();
        self.sp = start;
        Ok(values)
    }

    fn local_slot(&self, index: u8) -> Result<usize> {
        let slot = self.current_frame().base_pointer + index as usize;
        if slot >= self.stack.len() {
            return Err(RuntimeError::StackOverflow);
        }
        Ok(slot)
    }

    // ========================================================================
    // Frames
    // ========================================================================

    fn current_frame(&self) -> &Frame {
        // The top-level frame is only removed when the run ends.
        &self.frames[self.frames.len() - 1]
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Calls the value below the top `argc` stack values.
    fn call(&mut self, argc: usize) -> Result<()> {
        let callee_slot = self
            .sp
            .checked_sub(argc + 1)
            .ok_or(RuntimeError::StackUnderflow)?;

        match self.stack[callee_slot].clone() {
            Value::Closure(closure) => self.call_closure(closure, argc),
            Value::Builtin(builtin) => self.call_builtin(builtin, argc),
            other => Err(RuntimeError::NotCallable(other.type_name())),
        }
    }

    fn call_closure(&mut self, closure: Arc<Closure>, argc: usize) -> Result<()> {
        let function = &closure.function;
        if argc != function.arity() {
            return Err(RuntimeError::WrongArgumentCount {
                expected: function.arity(),
                got: argc,
            });
        }
        if self.frames.len() >= self.max_frames {
            return Err(RuntimeError::FrameOverflow);
        }

        let base_pointer = self.sp - argc;
        let sp = base_pointer + function.num_locals;
        if sp > self.stack.len() {
            return Err(RuntimeError::StackOverflow);
        }
        for slot in &mut self.stack[base_pointer + argc..sp] {
            *slot = Value::Null;
        }

        trace!(
            "Push frame {} for {} (base {})",
            self.frames.len(),
            function.name.as_deref().unwrap_or("<anonymous>"),
            base_pointer
        );

        self.frames.push(Frame::new(closure, base_pointer));
        self.sp = sp;
        Ok(())
    }

    fn call_builtin(&mut self, builtin: &'static Builtin, argc: usize) -> Result<()> {
        let args = &self.stack[self.sp - argc..self.sp];
        let result = (builtin.func)(self.context.output(), args).map_err(|message| {
            RuntimeError::Builtin {
                name: builtin.name,
                message,
            }
        })?;

        self.sp -= argc + 1;
        self.push(result)
    }

    /// Pops the current frame and pushes its result for the caller.
    /// Returns true when the top-level frame returned.
    fn return_from_frame(&mut self, value: Value) -> Result<bool> {
        if self.frames.len() == 1 {
            self.returned = Some(value);
            return Ok(true);
        }

        let frame = self.frames.pop().ok_or(RuntimeError::StackUnderflow)?;
        trace!("Pop frame {}", self.frames.len());

        self.sp = frame
            .base_pointer
            .checked_sub(1)
            .ok_or(RuntimeError::StackUnderflow)?;
        self.push(value)?;
        Ok(false)
    }

    fn push_closure(&mut self, index: usize, num_free: usize) -> Result<()> {
        let Some(Value::Function(function)) = self.constants.get(index) else {
            return Err(RuntimeError::InvalidConstant(index));
        };
        let function = Arc::clone(function);
        let free = self.take_top(num_free)?;
        self.push(Value::Closure(Arc::new(Closure { function, free })))
    }
}

/// Builds a hash from alternating keys and values.
fn build_hash(elements: Vec<Value>) -> Result<Value> {
    let mut pairs = HashEntries::default();
    let mut elements = elements.into_iter();
    while let (Some(key), Some(value)) = (elements.next(), elements.next()) {
        let hash_key = HashKey::try_from(&key)?;
        pairs.insert(hash_key, HashPair { key, value });
    }
    Ok(Value::Hash(Arc::new(pairs)))
}
