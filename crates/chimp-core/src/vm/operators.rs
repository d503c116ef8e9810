// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Operator semantics shared by the interpreter.
//!
//! Integer arithmetic wraps on overflow. Only `+` is defined for strings.
//! `==` and `!=` accept any pair of values, while the ordering operators
//! are integer-only.

use crate::compiler::OpCode;
use crate::error::RuntimeError;
use crate::runtime::value::{HashKey, Value};

/// Source text of a binary or prefix opcode, for error messages.
pub fn operator_symbol(op: OpCode) -> &'static str {
    match op {
        OpCode::Add => "+",
        OpCode::Sub | OpCode::Minus => "-",
        OpCode::Mul => "*",
        OpCode::Div => "/",
        OpCode::Mod => "%",
        OpCode::Equal => "==",
        OpCode::NotEqual => "!=",
        OpCode::GreaterThan => ">",
        OpCode::GreaterEqual => ">=",
        OpCode::LessThan => "<",
        OpCode::LessEqual => "<=",
        OpCode::Bang => "!",
        _ => "?",
    }
}

fn unsupported(op: OpCode, left: &Value, right: &Value) -> RuntimeError {
    if std::mem::discriminant(left) == std::mem::discriminant(right) {
        RuntimeError::UnknownOperator {
            left: left.type_name(),
            operator: operator_symbol(op),
            right: right.type_name(),
        }
    } else {
        RuntimeError::TypeMismatch {
            left: left.type_name(),
            operator: operator_symbol(op),
            right: right.type_name(),
        }
    }
}

/// Applies `+ - * / %`.
pub fn arithmetic(op: OpCode, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => integer_arithmetic(op, *l, *r),
        (Value::String(l), Value::String(r)) if op == OpCode::Add => {
            let mut joined = String::with_capacity(l.len() + r.len());
            joined.push_str(l);
            joined.push_str(r);
            Ok(Value::string(joined))
        }
        _ => Err(unsupported(op, left, right)),
    }
}

fn integer_arithmetic(op: OpCode, left: i64, right: i64) -> Result<Value, RuntimeError> {
    let result = match op {
        OpCode::Add => left.wrapping_add(right),
        OpCode::Sub => left.wrapping_sub(right),
        OpCode::Mul => left.wrapping_mul(right),
        OpCode::Div if right == 0 => return Err(RuntimeError::DivisionByZero(left)),
        OpCode::Div => left.wrapping_div(right),
        OpCode::Mod if right == 0 => return Err(RuntimeError::DivisionByZero(left)),
        OpCode::Mod => left.wrapping_rem(right),
        _ => {
            return Err(unsupported(op, &Value::Integer(left), &Value::Integer(right)));
        }
    };
    Ok(Value::Integer(result))
}

/// Applies `== != > >= < <=`.
pub fn comparison(op: OpCode, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match op {
        OpCode::Equal => return Ok(Value::Boolean(left.identical(right))),
        OpCode::NotEqual => return Ok(Value::Boolean(!left.identical(right))),
        _ => {}
    }

    let (Value::Integer(l), Value::Integer(r)) = (left, right) else {
        return Err(unsupported(op, left, right));
    };
    let result = match op {
        OpCode::GreaterThan => l > r,
        OpCode::GreaterEqual => l >= r,
        OpCode::LessThan => l < r,
        OpCode::LessEqual => l <= r,
        _ => return Err(unsupported(op, left, right)),
    };
    Ok(Value::Boolean(result))
}

/// Applies prefix `-`.
pub fn negate(operand: &Value) -> Result<Value, RuntimeError> {
    match operand {
        Value::Integer(n) => Ok(Value::Integer(n.wrapping_neg())),
        other => Err(RuntimeError::UnknownPrefixOperator {
            operator: "-",
            operand: other.type_name(),
        }),
    }
}

/// Applies `collection[index]`. Missing elements and keys read as null.
pub fn index(collection: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match (collection, index) {
        (Value::Array(elements), Value::Integer(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| elements.get(i))
            .cloned()
            .unwrap_or(Value::Null)),
        (Value::Hash(pairs), key) => {
            let key = HashKey::try_from(key)?;
            Ok(pairs
                .get(&key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Value::Null))
        }
        _ => Err(RuntimeError::IndexNotSupported {
            collection: collection.type_name(),
            index: index.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_arithmetic_matches_native() {
        let cases = [(7, 3), (-7, 3), (7, -3), (0, 5), (i64::MAX, 1), (i64::MIN, -1)];
        for (l, r) in cases {
            let (a, b) = (Value::Integer(l), Value::Integer(r));
            assert_eq!(arithmetic(OpCode::Add, &a, &b), Ok(Value::Integer(l.wrapping_add(r))));
            assert_eq!(arithmetic(OpCode::Sub, &a, &b), Ok(Value::Integer(l.wrapping_sub(r))));
            assert_eq!(arithmetic(OpCode::Mul, &a, &b), Ok(Value::Integer(l.wrapping_mul(r))));
            assert_eq!(arithmetic(OpCode::Div, &a, &b), Ok(Value::Integer(l.wrapping_div(r))));
            assert_eq!(arithmetic(OpCode::Mod, &a, &b), Ok(Value::Integer(l.wrapping_rem(r))));
        }
    }

    #[test]
    fn test_division_by_zero() {
        let zero = Value::Integer(0);
        assert_eq!(
            arithmetic(OpCode::Div, &Value::Integer(5), &zero),
            Err(RuntimeError::DivisionByZero(5))
        );
        assert_eq!(
            arithmetic(OpCode::Mod, &Value::Integer(5), &zero),
            Err(RuntimeError::DivisionByZero(5))
        );
    }

    #[test]
    fn test_string_operators() {
        assert_eq!(
            arithmetic(OpCode::Add, &Value::from("chi"), &Value::from("mp")),
            Ok(Value::from("chimp"))
        );
        assert_eq!(
            arithmetic(OpCode::Sub, &Value::from("a"), &Value::from("b")),
            Err(RuntimeError::UnknownOperator {
                left: "STRING",
                operator: "-",
                right: "STRING"
            })
        );
        assert_eq!(
            comparison(OpCode::LessThan, &Value::from("a"), &Value::from("b")),
            Err(RuntimeError::UnknownOperator {
                left: "STRING",
                operator: "<",
                right: "STRING"
            })
        );
    }

    #[test]
    fn test_type_mismatch() {
        assert_eq!(
            arithmetic(OpCode::Add, &Value::Integer(1), &Value::Boolean(true)),
            Err(RuntimeError::TypeMismatch {
                left: "INTEGER",
                operator: "+",
                right: "BOOLEAN"
            })
        );
        assert_eq!(
            arithmetic(OpCode::Add, &Value::Boolean(true), &Value::Boolean(false)),
            Err(RuntimeError::UnknownOperator {
                left: "BOOLEAN",
                operator: "+",
                right: "BOOLEAN"
            })
        );
    }

    #[test]
    fn test_comparison() {
        let one = Value::Integer(1);
        let two = Value::Integer(2);
        assert_eq!(comparison(OpCode::LessThan, &one, &two), Ok(Value::Boolean(true)));
        assert_eq!(comparison(OpCode::GreaterEqual, &one, &two), Ok(Value::Boolean(false)));
        assert_eq!(comparison(OpCode::LessEqual, &two, &two), Ok(Value::Boolean(true)));
        assert_eq!(comparison(OpCode::Equal, &one, &Value::from("1")), Ok(Value::Boolean(false)));
        assert_eq!(comparison(OpCode::NotEqual, &Value::Null, &Value::Null), Ok(Value::Boolean(false)));
        assert!(matches!(
            comparison(OpCode::GreaterThan, &one, &Value::Null),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_negate() {
        assert_eq!(negate(&Value::Integer(5)), Ok(Value::Integer(-5)));
        assert_eq!(
            negate(&Value::Boolean(true)),
            Err(RuntimeError::UnknownPrefixOperator {
                operator: "-",
                operand: "BOOLEAN"
            })
        );
    }

    #[test]
    fn test_index() {
        let array = Value::array(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        assert_eq!(index(&array, &Value::Integer(1)), Ok(Value::Integer(2)));
        assert_eq!(index(&array, &Value::Integer(5)), Ok(Value::Null));
        assert_eq!(index(&array, &Value::Integer(-1)), Ok(Value::Null));
        assert_eq!(
            index(&array, &Value::from("x")),
            Err(RuntimeError::IndexNotSupported {
                collection: "ARRAY",
                index: "STRING"
            })
        );
        assert_eq!(
            index(&Value::Integer(1), &Value::Integer(0)),
            Err(RuntimeError::IndexNotSupported {
                collection: "INTEGER",
                index: "INTEGER"
            })
        );
    }
}
