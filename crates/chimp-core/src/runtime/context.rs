// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Execution context: the global store, builtin registry and output sink.
//!
//! A `Context` outlives individual compiled units so that later units can
//! read globals written by earlier ones. Independent contexts share nothing.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use super::function::Builtin;
use super::value::Value;
use crate::builtins::BUILTINS;
use crate::error::RuntimeError;

/// State shared by successive VM runs.
pub struct Context {
    /// Fixed-capacity global store, indexed by global symbol index
    globals: Vec<Value>,
    /// The builtin registry, indexed by builtin symbol index
    builtins: &'static [Builtin],
    /// Where `puts` writes
    output: Box<dyn Write + Send>,
}

impl Context {
    /// Creates a context with `globals_size` global slots writing to stdout.
    pub fn new(globals_size: usize) -> Self {
        Self {
            globals: vec![Value::Null; globals_size],
            builtins: BUILTINS,
            output: Box::new(io::stdout()),
        }
    }

    /// Replaces the output sink used by builtins.
    pub fn with_output(mut self, output: impl Write + Send + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    /// Reads a global slot.
    pub fn global(&self, index: usize) -> Result<&Value, RuntimeError> {
        self.globals
            .get(index)
            .ok_or(RuntimeError::GlobalOutOfRange(index))
    }

    /// Writes a global slot.
    pub fn set_global(&mut self, index: usize, value: Value) -> Result<(), RuntimeError> {
        let slot = self
            .globals
            .get_mut(index)
            .ok_or(RuntimeError::GlobalOutOfRange(index))?;
        *slot = value;
        Ok(())
    }

    /// Number of global slots.
    pub fn globals_size(&self) -> usize {
        self.globals.len()
    }

    /// Looks up a builtin by registry index.
    pub fn builtin(&self, index: usize) -> Option<&'static Builtin> {
        self.builtins.get(index)
    }

    /// The registered builtins in index order.
    pub fn builtins(&self) -> &'static [Builtin] {
        self.builtins
    }

    /// The sink builtins write to.
    pub fn output(&mut self) -> &mut dyn Write {
        self.output.as_mut()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(crate::vm::GLOBALS_SIZE)
    }
}

/// A cloneable in-memory output sink.
///
/// Clones share one buffer, so a test can hand one clone to a `Context`
/// and read what was written through another.
#[derive(Debug, Clone, Default)]
pub struct SharedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedOutput {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Discards everything written so far.
    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals_are_fixed_capacity() {
        let mut context = Context::new(4);
        assert_eq!(context.globals_size(), 4);
        context.set_global(3, Value::Integer(7)).unwrap();
        assert_eq!(context.global(3).unwrap(), &Value::Integer(7));
        assert_eq!(
            context.set_global(4, Value::Null),
            Err(RuntimeError::GlobalOutOfRange(4))
        );
        assert!(context.global(0).unwrap().is_null());
    }

    #[test]
    fn test_builtin_registry() {
        let context = Context::default();
        assert_eq!(context.builtin(0).map(|b| b.name), Some("len"));
        assert!(context.builtin(context.builtins().len()).is_none());
    }

    #[test]
    fn test_shared_output() {
        let output = SharedOutput::new();
        let mut context = Context::new(1).with_output(output.clone());
        writeln!(context.output(), "hello").unwrap();
        assert_eq!(output.contents(), "hello\n");
        output.clear();
        assert_eq!(output.contents(), "");
    }
}
