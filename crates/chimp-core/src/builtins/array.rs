// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Array builtins. Arrays are immutable; `rest` and `push` return copies.

use std::io::Write;
use std::sync::Arc;

use super::{check_arity, type_error};
use crate::runtime::value::Value;

fn array_arg<'a>(name: &str, args: &'a [Value]) -> Result<&'a Arc<Vec<Value>>, String> {
    match &args[0] {
        Value::Array(elements) => Ok(elements),
        other => Err(type_error(name, "ARRAY", other)),
    }
}

/// first(array) - the first element, or null
pub fn first(_out: &mut dyn Write, args: &[Value]) -> Result<Value, String> {
    check_arity(args, 1)?;
    let elements = array_arg("first", args)?;
    Ok(elements.first().cloned().unwrap_or(Value::Null))
}

/// last(array) - the last element, or null
pub fn last(_out: &mut dyn Write, args: &[Value]) -> Result<Value, String> {
    check_arity(args, 1)?;
    let elements = array_arg("last", args)?;
    Ok(elements.last().cloned().unwrap_or(Value::Null))
}

/// rest(array) - every element but the first, or null for an empty array
pub fn rest(_out: &mut dyn Write, args: &[Value]) -> Result<Value, String> {
    check_arity(args, 1)?;
    let elements = array_arg("rest", args)?;
    match elements.split_first() {
        Some((_, tail)) => Ok(Value::array(tail.to_vec())),
        None => Ok(Value::Null),
    }
}

/// push(array, value) - a new array with `value` appended
pub fn push(_out: &mut dyn Write, args: &[Value]) -> Result<Value, String> {
    check_arity(args, 2)?;
    let elements = array_arg("push", args)?;
    let mut copy = Vec::with_capacity(elements.len() + 1);
    copy.extend(elements.iter().cloned());
    copy.push(args[1].clone());
    Ok(Value::array(copy))
}
