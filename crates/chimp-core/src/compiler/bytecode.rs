// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode definitions.
//!
//! An instruction is a one-byte opcode followed by its operands, each
//! encoded big-endian with the width given by the opcode's [`Definition`].

use std::fmt;
use std::ops::Deref;

use crate::runtime::value::Value;

/// A compiled unit: top-level instructions plus the constant pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    /// The top-level instructions
    pub instructions: Instructions,
    /// The constant pool
    pub constants: Vec<Value>,
    /// Stack slots the top-level frame reserves for block locals
    pub num_locals: usize,
}

impl Bytecode {
    /// Renders the top-level instructions followed by every function
    /// template in the constant pool.
    pub fn disassemble(&self) -> String {
        let mut out = self.instructions.to_string();
        for (index, constant) in self.constants.iter().enumerate() {
            if let Value::Function(func) = constant {
                let name = func.name.as_deref().unwrap_or("<anonymous>");
                out.push_str(&format!(
                    "\nconstant {index}: func {name} (params={}, locals={})\n",
                    func.num_parameters, func.num_locals
                ));
                out.push_str(&func.instructions.to_string());
            }
        }
        out
    }
}

/// An encoded instruction stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instructions(Vec<u8>);

impl Instructions {
    /// Creates an empty instruction stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an encoded instruction and returns its offset.
    pub fn push(&mut self, instruction: &[u8]) -> usize {
        let offset = self.0.len();
        self.0.extend_from_slice(instruction);
        offset
    }

    /// Overwrites the instruction at `offset` with `instruction`.
    ///
    /// The replacement must encode to the same width.
    pub fn replace(&mut self, offset: usize, instruction: &[u8]) {
        self.0[offset..offset + instruction.len()].copy_from_slice(instruction);
    }
}

impl Deref for Instructions {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Instructions {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl FromIterator<Vec<u8>> for Instructions {
    fn from_iter<I: IntoIterator<Item = Vec<u8>>>(iter: I) -> Self {
        Self(iter.into_iter().flatten().collect())
    }
}

impl fmt::Display for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut offset = 0;
        while offset < self.0.len() {
            let Ok(op) = OpCode::try_from(self.0[offset]) else {
                writeln!(f, "{offset:04} ERROR: unknown opcode {}", self.0[offset])?;
                offset += 1;
                continue;
            };
            let def = op.definition();
            let (operands, read) = read_operands(&def, &self.0[offset + 1..]);

            write!(f, "{offset:04} {}", def.name)?;
            for operand in operands {
                write!(f, " {operand}")?;
            }
            writeln!(f)?;

            offset += 1 + read;
        }
        Ok(())
    }
}

/// Operation codes for the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Push constant pool entry (u16 index)
    Constant,
    /// Pop and discard the top of stack, remembering it as the last popped value
    Pop,
    /// a + b
    Add,
    /// a - b
    Sub,
    /// a * b
    Mul,
    /// a / b
    Div,
    /// a % b
    Mod,
    /// Push true
    True,
    /// Push false
    False,
    /// Push null
    Null,
    /// a == b
    Equal,
    /// a != b
    NotEqual,
    /// a > b
    GreaterThan,
    /// a >= b
    GreaterEqual,
    /// a < b
    LessThan,
    /// a <= b
    LessEqual,
    /// -a
    Minus,
    /// !a
    Bang,
    /// Unconditional jump (u16 absolute offset)
    Jump,
    /// Pop; jump if falsy (u16 absolute offset)
    JumpNotTruthy,
    /// Jump if truthy without popping (u16 absolute offset)
    JumpTruthyNoPop,
    /// Jump if falsy without popping (u16 absolute offset)
    JumpNotTruthyNoPop,
    /// Push global (u16 index)
    GetGlobal,
    /// Pop into global (u16 index)
    SetGlobal,
    /// Store top of stack into global, leaving it (u16 index)
    SetGlobalNoPop,
    /// Push local (u8 index)
    GetLocal,
    /// Pop into local (u8 index)
    SetLocal,
    /// Store top of stack into local, leaving it (u8 index)
    SetLocalNoPop,
    /// Push builtin (u8 registry index)
    GetBuiltin,
    /// Push captured free variable (u8 index)
    GetFree,
    /// Push the executing closure
    CurrentClosure,
    /// Build array from the top N elements (u16 count)
    Array,
    /// Build hash from the top N elements, key/value alternating (u16 count)
    Hash,
    /// collection[index]
    Index,
    /// Call callee below N arguments (u8 argument count)
    Call,
    /// Return the top of stack
    ReturnValue,
    /// Return null
    Return,
    /// Build closure (u16 constant index, u8 free-variable count)
    Closure,
}

/// Widest operand encoding of any opcode, in bytes.
pub const MAX_OPERAND_WIDTH: usize = 3;

/// Name and operand widths of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Definition {
    /// Mnemonic used in disassembly
    pub name: &'static str,
    /// Width in bytes of each operand
    pub operand_widths: &'static [usize],
}

impl OpCode {
    const ALL: [OpCode; 38] = [
        OpCode::Constant,
        OpCode::Pop,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::Mod,
        OpCode::True,
        OpCode::False,
        OpCode::Null,
        OpCode::Equal,
        OpCode::NotEqual,
        OpCode::GreaterThan,
        OpCode::GreaterEqual,
        OpCode::LessThan,
        OpCode::LessEqual,
        OpCode::Minus,
        OpCode::Bang,
        OpCode::Jump,
        OpCode::JumpNotTruthy,
        OpCode::JumpTruthyNoPop,
        OpCode::JumpNotTruthyNoPop,
        OpCode::GetGlobal,
        OpCode::SetGlobal,
        OpCode::SetGlobalNoPop,
        OpCode::GetLocal,
        OpCode::SetLocal,
        OpCode::SetLocalNoPop,
        OpCode::GetBuiltin,
        OpCode::GetFree,
        OpCode::CurrentClosure,
        OpCode::Array,
        OpCode::Hash,
        OpCode::Index,
        OpCode::Call,
        OpCode::ReturnValue,
        OpCode::Return,
        OpCode::Closure,
    ];

    /// Total width in bytes of the opcode's operands.
    pub const fn operand_width(self) -> usize {
        match self {
            OpCode::Constant
            | OpCode::Jump
            | OpCode::JumpNotTruthy
            | OpCode::JumpTruthyNoPop
            | OpCode::JumpNotTruthyNoPop
            | OpCode::GetGlobal
            | OpCode::SetGlobal
            | OpCode::SetGlobalNoPop
            | OpCode::Array
            | OpCode::Hash => 2,
            OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::SetLocalNoPop
            | OpCode::GetBuiltin
            | OpCode::GetFree
            | OpCode::Call => 1,
            OpCode::Closure => 3,
            _ => 0,
        }
    }

    /// Looks up the opcode's definition.
    pub fn definition(self) -> Definition {
        let (name, operand_widths): (&'static str, &'static [usize]) = match self {
            OpCode::Constant => ("OpConstant", &[2]),
            OpCode::Pop => ("OpPop", &[]),
            OpCode::Add => ("OpAdd", &[]),
            OpCode::Sub => ("OpSub", &[]),
            OpCode::Mul => ("OpMul", &[]),
            OpCode::Div => ("OpDiv", &[]),
            OpCode::Mod => ("OpMod", &[]),
            OpCode::True => ("OpTrue", &[]),
            OpCode::False => ("OpFalse", &[]),
            OpCode::Null => ("OpNull", &[]),
            OpCode::Equal => ("OpEqual", &[]),
            OpCode::NotEqual => ("OpNotEqual", &[]),
            OpCode::GreaterThan => ("OpGreaterThan", &[]),
            OpCode::GreaterEqual => ("OpGreaterEqual", &[]),
            OpCode::LessThan => ("OpLessThan", &[]),
            OpCode::LessEqual => ("OpLessEqual", &[]),
            OpCode::Minus => ("OpMinus", &[]),
            OpCode::Bang => ("OpBang", &[]),
            OpCode::Jump => ("OpJump", &[2]),
            OpCode::JumpNotTruthy => ("OpJumpNotTruthy", &[2]),
            OpCode::JumpTruthyNoPop => ("OpJumpTruthyNoPop", &[2]),
            OpCode::JumpNotTruthyNoPop => ("OpJumpNotTruthyNoPop", &[2]),
            OpCode::GetGlobal => ("OpGetGlobal", &[2]),
            OpCode::SetGlobal => ("OpSetGlobal", &[2]),
            OpCode::SetGlobalNoPop => ("OpSetGlobalNoPop", &[2]),
            OpCode::GetLocal => ("OpGetLocal", &[1]),
            OpCode::SetLocal => ("OpSetLocal", &[1]),
            OpCode::SetLocalNoPop => ("OpSetLocalNoPop", &[1]),
            OpCode::GetBuiltin => ("OpGetBuiltin", &[1]),
            OpCode::GetFree => ("OpGetFree", &[1]),
            OpCode::CurrentClosure => ("OpCurrentClosure", &[]),
            OpCode::Array => ("OpArray", &[2]),
            OpCode::Hash => ("OpHash", &[2]),
            OpCode::Index => ("OpIndex", &[]),
            OpCode::Call => ("OpCall", &[1]),
            OpCode::ReturnValue => ("OpReturnValue", &[]),
            OpCode::Return => ("OpReturn", &[]),
            OpCode::Closure => ("OpClosure", &[2, 1]),
        };
        Definition {
            name,
            operand_widths,
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OpCode::ALL.get(byte as usize).copied().ok_or(byte)
    }
}

/// Encodes one instruction. Operands are truncated to their declared width,
/// so callers must range-check them first.
pub fn make(op: OpCode, operands: &[usize]) -> Vec<u8> {
    let def = op.definition();
    let len = 1 + def.operand_widths.iter().sum::<usize>();

    let mut instruction = Vec::with_capacity(len);
    instruction.push(op as u8);

    for (operand, width) in operands.iter().zip(def.operand_widths) {
        match width {
            2 => instruction.extend_from_slice(&(*operand as u16).to_be_bytes()),
            1 => instruction.push(*operand as u8),
            _ => {}
        }
    }

    instruction
}

/// Decodes the operands following an opcode, returning them with the number
/// of bytes read.
pub fn read_operands(def: &Definition, ins: &[u8]) -> (Vec<usize>, usize) {
    let mut operands = Vec::with_capacity(def.operand_widths.len());
    let mut offset = 0;

    for width in def.operand_widths {
        match width {
            2 => operands.push(read_u16(ins, offset) as usize),
            1 => operands.push(read_u8(ins, offset) as usize),
            _ => {}
        }
        offset += width;
    }

    (operands, offset)
}

/// Reads a big-endian u16 at `offset`.
#[inline]
pub fn read_u16(ins: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([ins[offset], ins[offset + 1]])
}

/// Reads a u8 at `offset`.
#[inline]
pub fn read_u8(ins: &[u8], offset: usize) -> u8 {
    ins[offset]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make() {
        assert_eq!(make(OpCode::Constant, &[65534]), vec![OpCode::Constant as u8, 255, 254]);
        assert_eq!(make(OpCode::Add, &[]), vec![OpCode::Add as u8]);
        assert_eq!(make(OpCode::GetLocal, &[255]), vec![OpCode::GetLocal as u8, 255]);
        assert_eq!(
            make(OpCode::Closure, &[65534, 255]),
            vec![OpCode::Closure as u8, 255, 254, 255]
        );
    }

    #[test]
    fn test_read_operands() {
        let cases: [(OpCode, &[usize], usize); 3] = [
            (OpCode::Constant, &[65535], 2),
            (OpCode::GetLocal, &[255], 1),
            (OpCode::Closure, &[65535, 255], 3),
        ];

        for (op, operands, bytes_read) in cases {
            let instruction = make(op, operands);
            let (read, n) = read_operands(&op.definition(), &instruction[1..]);
            assert_eq!(n, bytes_read);
            assert_eq!(read, operands);
        }
    }

    #[test]
    fn test_opcode_round_trips_through_byte() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::try_from(op as u8), Ok(op));
        }
        assert_eq!(OpCode::try_from(OpCode::ALL.len() as u8), Err(OpCode::ALL.len() as u8));
    }

    #[test]
    fn test_operand_width_matches_definition() {
        for op in OpCode::ALL {
            let width: usize = op.definition().operand_widths.iter().sum();
            assert_eq!(op.operand_width(), width, "{}", op.definition().name);
            assert!(width <= MAX_OPERAND_WIDTH);
        }
    }

    #[test]
    fn test_instructions_display() {
        let instructions: Instructions = vec![
            make(OpCode::Add, &[]),
            make(OpCode::GetLocal, &[1]),
            make(OpCode::Constant, &[2]),
            make(OpCode::Constant, &[65535]),
            make(OpCode::Closure, &[65535, 255]),
        ]
        .into_iter()
        .collect();

        let expected = "0000 OpAdd\n\
                        0001 OpGetLocal 1\n\
                        0003 OpConstant 2\n\
                        0006 OpConstant 65535\n\
                        0009 OpClosure 65535 255\n";
        assert_eq!(instructions.to_string(), expected);
    }

    #[test]
    fn test_replace_patches_operand() {
        let mut instructions = Instructions::new();
        let pos = instructions.push(&make(OpCode::Jump, &[9999]));
        instructions.replace(pos, &make(OpCode::Jump, &[7]));
        assert_eq!(read_u16(&instructions, pos + 1), 7);
    }
}
