// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for parsing, compilation and execution.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum Error {
    /// Syntax error during parsing
    #[error("SyntaxError: {message} at line {line}, column {column}")]
    Syntax {
        /// What went wrong
        message: String,
        /// 1-based line of the offending token
        line: usize,
        /// 1-based column of the offending token
        column: usize,
    },

    /// Compilation of a unit failed
    #[error("CompileError: {0}")]
    Compile(#[from] CompileError),

    /// Execution of a unit failed
    #[error("RuntimeError: {0}")]
    Runtime(#[from] RuntimeError),

    /// Reading a script failed
    #[error("IOError: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported while compiling one unit. Compilation stops at the first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Operator with no opcode, such as an unsupported compound assignment
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// Name not bound in any enclosing scope
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    /// Assignment to something other than a global or local name
    #[error("invalid assignment target: {0}")]
    InvalidAssignmentTarget(String),

    /// `break` with no enclosing loop in the current function
    #[error("break outside of a loop")]
    BreakOutsideLoop,

    /// `continue` with no enclosing loop in the current function
    #[error("continue outside of a loop")]
    ContinueOutsideLoop,

    /// An operand does not fit its encoding
    #[error("too many {what} (limit is {limit})")]
    LimitExceeded {
        /// What overflowed, e.g. "constants"
        what: &'static str,
        /// Largest allowed value
        limit: usize,
    },
}

/// Errors raised by the virtual machine. The current run stops.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Binary operator applied to operands of different types
    #[error("type mismatch: {left} {operator} {right}")]
    TypeMismatch {
        /// Type of the left operand
        left: &'static str,
        /// Operator source text
        operator: &'static str,
        /// Type of the right operand
        right: &'static str,
    },

    /// Binary operator not defined for this type pair
    #[error("unknown operator: {left} {operator} {right}")]
    UnknownOperator {
        /// Type of the left operand
        left: &'static str,
        /// Operator source text
        operator: &'static str,
        /// Type of the right operand
        right: &'static str,
    },

    /// Prefix operator not defined for the operand's type
    #[error("unknown operator: {operator}{operand}")]
    UnknownPrefixOperator {
        /// Operator source text
        operator: &'static str,
        /// Type of the operand
        operand: &'static str,
    },

    /// `/` or `%` with a zero divisor; holds the dividend
    #[error("divided {0} by 0")]
    DivisionByZero(i64),

    /// Call of a value that is not a closure or builtin
    #[error("not a function: {0}")]
    NotCallable(&'static str),

    /// Call with the wrong number of arguments
    #[error("wrong number of arguments: want={expected}, got={got}")]
    WrongArgumentCount {
        /// Declared parameter count
        expected: usize,
        /// Arguments supplied
        got: usize,
    },

    /// Hash key of a type that cannot be hashed
    #[error("unusable as hash key: {0}")]
    UnusableHashKey(&'static str),

    /// Index expression on a value that cannot be indexed that way
    #[error("index operator not supported: {collection}[{index}]")]
    IndexNotSupported {
        /// Type of the indexed value
        collection: &'static str,
        /// Type of the index
        index: &'static str,
    },

    /// A builtin rejected its arguments
    #[error("{name}: {message}")]
    Builtin {
        /// Name of the builtin
        name: &'static str,
        /// What was wrong
        message: String,
    },

    /// Operand stack is full
    #[error("stack overflow")]
    StackOverflow,

    /// Pop from an empty stack
    #[error("stack underflow")]
    StackUnderflow,

    /// Call depth limit reached
    #[error("frame stack overflow (too much recursion)")]
    FrameOverflow,

    /// Global index past the store's capacity
    #[error("global index {0} out of range")]
    GlobalOutOfRange(usize),

    /// Byte that is not an opcode, or a truncated instruction
    #[error("invalid opcode {0:#04x}")]
    InvalidOpcode(u8),

    /// Constant index past the end of the pool
    #[error("invalid constant reference {0}")]
    InvalidConstant(usize),

    /// Builtin index past the end of the registry
    #[error("unknown builtin {0}")]
    UnknownBuiltin(usize),

    /// Free variable index past the closure's captures
    #[error("free variable {0} out of range")]
    FreeOutOfRange(usize),
}

impl RuntimeError {
    /// True for invariant violations rather than errors in the user's program.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RuntimeError::StackOverflow
                | RuntimeError::StackUnderflow
                | RuntimeError::FrameOverflow
                | RuntimeError::GlobalOutOfRange(_)
                | RuntimeError::InvalidOpcode(_)
                | RuntimeError::InvalidConstant(_)
                | RuntimeError::UnknownBuiltin(_)
                | RuntimeError::FreeOutOfRange(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RuntimeError::TypeMismatch {
            left: "INTEGER",
            operator: "+",
            right: "STRING",
        };
        assert_eq!(err.to_string(), "type mismatch: INTEGER + STRING");

        let err = Error::from(CompileError::UndefinedVariable("x".into()));
        assert_eq!(err.to_string(), "CompileError: undefined variable: x");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(RuntimeError::StackOverflow.is_fatal());
        assert!(RuntimeError::FrameOverflow.is_fatal());
        assert!(!RuntimeError::DivisionByZero(1).is_fatal());
        assert!(!RuntimeError::NotCallable("INTEGER").is_fatal());
    }
}
