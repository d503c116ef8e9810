// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Builtin functions.
//!
//! The registry is fixed and ordered: a builtin's position in [`BUILTINS`]
//! is the index the compiler emits for `GetBuiltin`. Builtins run without a
//! call frame and may accept any number of arguments, checking it themselves.

pub mod array;
pub mod console;

use std::io::Write;

use crate::runtime::function::Builtin;
use crate::runtime::value::Value;

/// The builtin registry, in index order.
pub static BUILTINS: &[Builtin] = &[
    Builtin { name: "len", func: len },
    Builtin { name: "puts", func: console::puts },
    Builtin { name: "first", func: array::first },
    Builtin { name: "last", func: array::last },
    Builtin { name: "rest", func: array::rest },
    Builtin { name: "push", func: array::push },
];

/// Looks up a builtin by name.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

/// len(string | array | hash) - number of characters or elements
pub fn len(_out: &mut dyn Write, args: &[Value]) -> Result<Value, String> {
    check_arity(args, 1)?;
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(elements) => elements.len(),
        Value::Hash(pairs) => pairs.len(),
        other => return Err(format!("argument not supported, got {}", other.type_name())),
    };
    Ok(Value::Integer(n as i64))
}

fn check_arity(args: &[Value], want: usize) -> Result<(), String> {
    if args.len() == want {
        Ok(())
    } else {
        Err(format!("wrong number of arguments. got={}, want={want}", args.len()))
    }
}

fn type_error(name: &str, want: &str, got: &Value) -> String {
    format!("argument to `{name}` must be {want}, got {}", got.type_name())
}
