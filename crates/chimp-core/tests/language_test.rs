// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! End-to-end language tests driven through `Engine`.

use chimp_core::{CompileError, Engine, Error, RuntimeError, SharedOutput, Value};

fn eval(source: &str) -> Value {
    Engine::new()
        .eval(source)
        .unwrap_or_else(|err| panic!("{source:?} failed: {err}"))
}

fn eval_err(source: &str) -> Error {
    match Engine::new().eval(source) {
        Ok(value) => panic!("{source:?} unexpectedly produced {value}"),
        Err(err) => err,
    }
}

#[test]
fn test_arithmetic_matches_native_integers() {
    let operands = [0i64, 1, -1, 7, -13, 1000, i64::MAX, i64::MIN];
    for &l in &operands {
        for &r in &operands {
            let cases = [
                ("+", Some(l.wrapping_add(r))),
                ("-", Some(l.wrapping_sub(r))),
                ("*", Some(l.wrapping_mul(r))),
                ("/", (r != 0).then(|| l.wrapping_div(r))),
                ("%", (r != 0).then(|| l.wrapping_rem(r))),
            ];
            for (op, expected) in cases {
                let mut engine = Engine::new();
                engine
                    .eval(&format!("let l = {}; let r = {};", literal(l), literal(r)))
                    .unwrap();
                let result = engine.eval(&format!("l {op} r"));
                match expected {
                    Some(value) => assert_eq!(result.unwrap(), Value::Integer(value), "{l} {op} {r}"),
                    None => assert!(
                        matches!(
                            result,
                            Err(Error::Runtime(RuntimeError::DivisionByZero(n))) if n == l
                        ),
                        "{l} {op} {r}"
                    ),
                }
            }
        }
    }
}

/// Source text for `n`. `i64::MIN` has no literal form.
fn literal(n: i64) -> String {
    if n == i64::MIN {
        format!("(-{} - 1)", i64::MAX)
    } else if n < 0 {
        format!("(0 - {})", n.unsigned_abs())
    } else {
        n.to_string()
    }
}

#[test]
fn test_closures_capture_independently() {
    let mut engine = Engine::new();
    engine
        .eval("let newAdder = func(a) { return func(b) { return a + b; }; }; let addTwo = newAdder(2);")
        .unwrap();
    assert_eq!(engine.eval("addTwo(3);").unwrap(), Value::Integer(5));
    assert_eq!(engine.eval("newAdder(10)(1);").unwrap(), Value::Integer(11));
    assert_eq!(engine.eval("addTwo(3);").unwrap(), Value::Integer(5));
}

#[test]
fn test_short_circuit_skips_side_effects() {
    let setup = "let calls = 0; let f = func() { calls += 1; return true; };";

    let mut engine = Engine::new();
    engine.eval(setup).unwrap();
    assert_eq!(engine.eval("false && f(); calls;").unwrap(), Value::Integer(0));
    assert_eq!(engine.eval("true || f(); calls;").unwrap(), Value::Integer(0));

    let mut engine = Engine::new();
    engine.eval(setup).unwrap();
    assert_eq!(engine.eval("true && f(); calls;").unwrap(), Value::Integer(1));
    assert_eq!(engine.eval("false || f(); calls;").unwrap(), Value::Integer(2));
}

#[test]
fn test_logical_operators_yield_operands() {
    assert_eq!(eval("0 || \"fallback\""), Value::from("fallback"));
    assert_eq!(eval("5 && 6"), Value::Integer(6));
    assert_eq!(eval("null && 1"), Value::Null);
}

#[test]
fn test_break_targets_innermost_loop() {
    let source = "
        let outer = 0;
        let inner = 0;
        for (let i = 0; i < 3; i += 1) {
            outer += 1;
            while (true) {
                inner += 1;
                break;
            }
        }
        outer * 10 + inner
    ";
    assert_eq!(eval(source), Value::Integer(33));
}

#[test]
fn test_while_with_break() {
    let source = "
        let i = 0;
        let sum = 0;
        while (i < 5) {
            sum += i;
            if (i == 3) { break; }
            i += 1;
        }
        sum
    ";
    assert_eq!(eval(source), Value::Integer(6));
}

#[test]
fn test_continue_in_nested_loops() {
    let source = "
        let pairs = 0;
        for (let i = 0; i < 4; i += 1) {
            for (let j = 0; j < 4; j += 1) {
                if (j == i) { continue; }
                pairs += 1;
            }
        }
        pairs
    ";
    assert_eq!(eval(source), Value::Integer(12));
}

#[test]
fn test_out_of_range_index_is_null() {
    assert_eq!(eval("[1, 2, 3][5];"), Value::Null);
    assert_eq!(eval("[1, 2, 3][-1];"), Value::Null);
    assert_eq!(eval("let h = {\"a\": 1}; h[\"b\"]"), Value::Null);
}

#[test]
fn test_arity_mismatch_is_runtime_error() {
    let err = eval_err("let add = func(a, b) { return a + b; }; add(1);");
    assert!(matches!(
        err,
        Error::Runtime(RuntimeError::WrongArgumentCount {
            expected: 2,
            got: 1
        })
    ));
}

#[test]
fn test_named_function_recursion_before_binding() {
    assert_eq!(
        eval("let f = func fact(n) { if (n < 2) { return 1; } return n * fact(n - 1); }; f(5)"),
        Value::Integer(120)
    );
    assert_eq!(
        eval("(func countdown(n) { if (n == 0) { return \"done\"; } return countdown(n - 1); })(4)"),
        Value::from("done")
    );
}

#[test]
fn test_compilation_is_deterministic() {
    let source = "
        let make = func(x) { let y = x * 2; return func(z) { return x + y + z; }; };
        let h = {\"k\": [1, 2, 3]};
        for (let i = 0; i < 3; i += 1) { if (i == 1) { continue; } make(i)(1); }
    ";
    let first = chimp_core::check(source).unwrap();
    let second = chimp_core::check(source).unwrap();
    assert_eq!(first.instructions, second.instructions);
    assert_eq!(first.disassemble(), second.disassemble());
}

#[test]
fn test_failed_unit_does_not_disturb_session() {
    let mut engine = Engine::new();
    engine.eval("let total = 10;").unwrap();

    assert!(matches!(
        engine.eval("let extra = 1; break;"),
        Err(Error::Compile(CompileError::BreakOutsideLoop))
    ));
    assert!(matches!(
        engine.eval("len = 3;"),
        Err(Error::Compile(CompileError::InvalidAssignmentTarget(_)))
    ));
    assert!(matches!(
        engine.eval("total +"),
        Err(Error::Syntax { .. })
    ));

    assert_eq!(engine.eval("total + 5").unwrap(), Value::Integer(15));
    assert!(!engine.global_names().contains(&"extra".to_string()));
}

#[test]
fn test_runtime_errors() {
    assert!(matches!(
        eval_err("1 + true"),
        Error::Runtime(RuntimeError::TypeMismatch { .. })
    ));
    assert!(matches!(
        eval_err("true + false"),
        Error::Runtime(RuntimeError::UnknownOperator { .. })
    ));
    assert!(matches!(
        eval_err("-\"x\""),
        Error::Runtime(RuntimeError::UnknownPrefixOperator { .. })
    ));
    assert!(matches!(eval_err("5()"), Error::Runtime(RuntimeError::NotCallable("INTEGER"))));
    assert!(matches!(
        eval_err("let h = {[1]: 2};"),
        Error::Runtime(RuntimeError::UnusableHashKey("ARRAY"))
    ));
    assert!(matches!(
        eval_err("len(1)"),
        Error::Runtime(RuntimeError::Builtin { name: "len", .. })
    ));
}

#[test]
fn test_builtins_and_output() {
    let output = SharedOutput::new();
    let mut engine = Engine::new().with_output(output.clone());
    let result = engine
        .eval(
            "
            let xs = push([1, 2], 3);
            puts(len(xs), first(xs), last(xs), rest(xs));
            puts(\"hi\");
            len(\"chimp\")
            ",
        )
        .unwrap();
    assert_eq!(result, Value::Integer(5));
    assert_eq!(output.contents(), "3\n1\n3\n[2, 3]\nhi\n");
}

#[test]
fn test_higher_order_functions() {
    let source = "
        let map = func(xs, f) {
            let iter = func(acc, rest_xs) {
                if (len(rest_xs) == 0) { return acc; }
                return iter(push(acc, f(first(rest_xs))), rest(rest_xs));
            };
            return iter([], xs);
        };
        map([1, 2, 3], func(x) { return x * x; })
    ";
    assert_eq!(
        eval(source),
        Value::array(vec![Value::Integer(1), Value::Integer(4), Value::Integer(9)])
    );
}

#[test]
fn test_eval_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("script.chimp");
    std::fs::write(&path, "let greet = func(name) { return \"hi \" + name; };\ngreet(\"chimp\")").unwrap();

    let mut engine = Engine::new();
    assert_eq!(engine.eval_file(&path).unwrap(), Value::from("hi chimp"));
    assert!(matches!(
        engine.eval_file(dir.path().join("missing.chimp")),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_bare_branch_let_is_scoped_to_branch() {
    // The sibling block leaves 42 in the shared slot; `b` must not see it.
    let err = eval_err(
        "let f = func() { { let secret = 42; } { if (false) let b = 0; return b; } }; f()",
    );
    assert!(matches!(
        err,
        Error::Compile(CompileError::UndefinedVariable(ref name)) if name == "b"
    ));

    assert_eq!(
        eval("let f = func() { { let secret = 42; } { let b; if (false) b = 0; return b; } }; f()"),
        Value::Null
    );
}

#[test]
fn test_bare_loop_body_let_does_not_leak_between_iterations() {
    let err = eval_err(
        "let out = []; for (let i = 0; i < 2; i += 1) { if (i == 0) let y = 5; out = push(out, y); } out",
    );
    assert!(matches!(
        err,
        Error::Compile(CompileError::UndefinedVariable(ref name)) if name == "y"
    ));

    let err = eval_err("let n = 0; while (n < 2) let z = n; z");
    assert!(matches!(err, Error::Compile(CompileError::UndefinedVariable(_))));
}

#[test]
fn test_block_local_never_observes_previous_iteration() {
    let source = "
        let out = [];
        for (let i = 0; i < 3; i += 1) {
            let y;
            if (i == 0) { y = 5; }
            out = push(out, y);
        }
        out
    ";
    assert_eq!(
        eval(source),
        Value::array(vec![Value::Integer(5), Value::Null, Value::Null])
    );

    let source = "
        let f = func() {
            let seen = [];
            let i = 0;
            while (i < 3) {
                { let stale = i * 10; }
                { let fresh; seen = push(seen, fresh); }
                i += 1;
            }
            return seen;
        };
        f()
    ";
    assert_eq!(
        eval(source),
        Value::array(vec![Value::Null, Value::Null, Value::Null])
    );
}
