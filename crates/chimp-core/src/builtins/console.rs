// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Output builtins.

use std::io::Write;

use crate::runtime::value::Value;

/// puts - writes each argument on its own line
pub fn puts(out: &mut dyn Write, args: &[Value]) -> Result<Value, String> {
    for arg in args {
        writeln!(out, "{arg}").map_err(|e| e.to_string())?;
    }
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_puts_writes_lines() {
        let mut out = Vec::new();
        let result = puts(&mut out, &[Value::from("hello"), Value::Integer(3)]).unwrap();
        assert!(result.is_null());
        assert_eq!(String::from_utf8(out).unwrap(), "hello\n3\n");
    }
}
