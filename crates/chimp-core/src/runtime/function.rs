// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Function templates, closures and native builtins.

use std::io::Write;
use std::sync::Arc;

use super::value::Value;
use crate::compiler::Instructions;

/// A compiled function body, stored in the constant pool.
///
/// Many closures may share one template.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    /// The function name (if any)
    pub name: Option<String>,
    /// The function's instruction stream
    pub instructions: Instructions,
    /// Stack slots reserved for parameters and locals
    pub num_locals: usize,
    /// Declared parameter count
    pub num_parameters: usize,
}

impl CompiledFunction {
    /// Returns the arity (number of parameters).
    pub fn arity(&self) -> usize {
        self.num_parameters
    }
}

/// A function template together with the values it captured.
#[derive(Debug, Clone)]
pub struct Closure {
    /// The shared template
    pub function: Arc<CompiledFunction>,
    /// Captured free variables, in capture order
    pub free: Vec<Value>,
}

impl Closure {
    /// Wraps a template with no free variables.
    pub fn new(function: Arc<CompiledFunction>) -> Self {
        Self {
            function,
            free: Vec::new(),
        }
    }
}

/// A native (Rust) function. Receives the context's output sink.
pub type NativeFunction = fn(&mut dyn Write, &[Value]) -> Result<Value, String>;

/// An entry of the builtin registry.
pub struct Builtin {
    /// The name the function is bound to
    pub name: &'static str,
    /// The native function pointer
    pub func: NativeFunction,
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}
