// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # chimp-core
//!
//! The Chimp scripting language: a small dynamically-typed language compiled
//! ahead of time to bytecode and run on a stack-based virtual machine.
//!
//! ## Overview
//!
//! - Lexer and recursive-descent parser producing a typed AST
//! - Single-pass compiler with lexical scoping and closure capture
//! - Stack VM with call frames, closures and a fixed builtin registry
//! - A persistent [`Engine`] session for incremental (REPL) compilation
//!
//! ## Quick Start
//!
//! ```rust
//! use chimp_core::{Engine, Value};
//!
//! let mut engine = Engine::new();
//! engine.eval("let double = func(x) { return x * 2; };").unwrap();
//! let result = engine.eval("double(21)").unwrap();
//! assert_eq!(result, Value::Integer(42));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod vm;

#[cfg(any(feature = "async", feature = "parallel"))]
mod async_engine;

use std::io::Write;
use std::path::Path;

use compiler::Compiler;
use parser::Parser;

// Re-exports for convenience
pub use compiler::Bytecode;
pub use error::{CompileError, Error, Result, RuntimeError};
pub use runtime::context::{Context, SharedOutput};
pub use runtime::value::Value;
pub use vm::{Limits, Vm};

#[cfg(feature = "async")]
pub use async_engine::AsyncEngine;
#[cfg(feature = "parallel")]
pub use async_engine::ParallelExecutor;

/// A persistent Chimp session.
///
/// Owns the global symbol table, the constant pool and the global store, so
/// each call to [`eval`](Engine::eval) can use globals defined by earlier
/// calls. A unit that fails to compile leaves the session untouched.
pub struct Engine {
    compiler: Compiler,
    context: Context,
    limits: Limits,
}

impl Engine {
    /// Creates a session with default limits, writing to stdout.
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    /// Creates a session with the given limits.
    pub fn with_limits(limits: Limits) -> Self {
        Self {
            compiler: Compiler::new(),
            context: Context::new(limits.globals_size),
            limits,
        }
    }

    /// Redirects builtin output (`puts`) to `output`.
    pub fn with_output(mut self, output: impl Write + Send + 'static) -> Self {
        self.context = self.context.with_output(output);
        self
    }

    /// Parses and compiles `source` against the session state.
    pub fn compile(&mut self, source: &str) -> Result<Bytecode> {
        let program = Parser::new(source).parse_program()?;

        let snapshot = self.compiler.snapshot();
        match self.compiler.compile(&program) {
            Ok(bytecode) => Ok(bytecode),
            Err(err) => {
                self.compiler.restore(snapshot);
                Err(err.into())
            }
        }
    }

    /// Runs a compiled unit, returning its last popped value or the value
    /// of a top-level `return`.
    pub fn run(&mut self, bytecode: &Bytecode) -> Result<Value> {
        let mut vm = Vm::new(bytecode, &mut self.context, self.limits)?;
        Ok(vm.run()?)
    }

    /// Compiles and runs `source`.
    pub fn eval(&mut self, source: &str) -> Result<Value> {
        let bytecode = self.compile(source)?;
        self.run(&bytecode)
    }

    /// Reads and evaluates a script file.
    pub fn eval_file(&mut self, path: impl AsRef<Path>) -> Result<Value> {
        let source = std::fs::read_to_string(path)?;
        self.eval(&source)
    }

    /// Every name visible at the top level, including builtins.
    pub fn global_names(&self) -> Vec<String> {
        self.compiler.symbol_table().names()
    }

    /// The session's execution context.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The limits runs are executed with.
    pub fn limits(&self) -> Limits {
        self.limits
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiles `source` against fresh state without running it.
pub fn check(source: &str) -> Result<Bytecode> {
    let program = Parser::new(source).parse_program()?;
    Ok(Compiler::new().compile(&program)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_eval() {
        let mut engine = Engine::new();
        assert_eq!(engine.eval("1 + 2").unwrap(), Value::Integer(3));
        assert_eq!(engine.eval("").unwrap(), Value::Null);
    }

    #[test]
    fn test_globals_persist_between_units() {
        let mut engine = Engine::new();
        engine.eval("let x = 40;").unwrap();
        engine.eval("let add = func(a) { return a + x; };").unwrap();
        assert_eq!(engine.eval("add(2)").unwrap(), Value::Integer(42));
        assert!(engine.global_names().contains(&"add".to_string()));
    }

    #[test]
    fn test_failed_compile_leaves_session_intact() {
        let mut engine = Engine::new();
        engine.eval("let a = 1;").unwrap();

        let err = engine.eval("let b = 2; nope;").unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::UndefinedVariable(_))));

        // `b` was rolled back, so it is still undefined and its slot is reused.
        assert!(engine.eval("b").is_err());
        engine.eval("let c = 3;").unwrap();
        assert_eq!(engine.eval("a + c").unwrap(), Value::Integer(4));
    }

    #[test]
    fn test_syntax_error() {
        let mut engine = Engine::new();
        let err = engine.eval("let = 1;").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_runtime_error_keeps_earlier_globals() {
        let mut engine = Engine::new();
        engine.eval("let a = 5;").unwrap();
        let err = engine.eval("a / 0").unwrap_err();
        assert_eq!(err.to_string(), "RuntimeError: divided 5 by 0");
        assert_eq!(engine.eval("a").unwrap(), Value::Integer(5));
    }

    #[test]
    fn test_output_redirect() {
        let output = SharedOutput::new();
        let mut engine = Engine::new().with_output(output.clone());
        engine.eval("puts([1, \"a\"])").unwrap();
        assert_eq!(output.contents(), "[1, \"a\"]\n");
    }

    #[test]
    fn test_check() {
        assert!(check("let f = func(x) { return x; }; f(1);").is_ok());
        assert!(matches!(
            check("undefinedName"),
            Err(Error::Compile(CompileError::UndefinedVariable(_)))
        ));
    }
}
