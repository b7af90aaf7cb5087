//! Acceptance tests for statements, loops and functions

use crate::{EvalError, InterpreterSession, SessionError, Value};
use pretty_assertions::assert_eq;

fn integer(session: &InterpreterSession, name: &str) -> i64 {
    match session.variable(name).unwrap() {
        Value::Integer(value) => value,
        other => panic!("{name} is {other:?}, expected an integer"),
    }
}

#[test]
fn test_empty_program_is_zero() {
    let mut session = InterpreterSession::new();
    session.assert_evaluates_to_integer("", 0).unwrap();
}

#[test]
fn test_assignment_yields_null() {
    let mut session = InterpreterSession::new();
    session.assert_evaluates_to_null("x = 5;").unwrap();
    assert_eq!(integer(&session, "x"), 5);
}

#[test]
fn test_destructuring_assignment() {
    let mut session = InterpreterSession::new();

    session.evaluate("a, b = 1, 2;").unwrap();
    assert_eq!((integer(&session, "a"), integer(&session, "b")), (1, 2));

    session.evaluate("a, b = b, a;").unwrap();
    assert_eq!((integer(&session, "a"), integer(&session, "b")), (2, 1));

    session.evaluate("x, y = (10, 20);").unwrap();
    assert_eq!((integer(&session, "x"), integer(&session, "y")), (10, 20));

    session.evaluate("p, q, r = [7, 8], 9;").unwrap();
    assert_eq!(
        (integer(&session, "p"), integer(&session, "q"), integer(&session, "r")),
        (7, 8, 9)
    );
}

#[test]
fn test_single_target_keeps_tuple_whole() {
    let mut session = InterpreterSession::new();
    session.evaluate("t = (1, 2);").unwrap();
    assert_eq!(session.variable("t").unwrap().to_string(), "(1, 2)");
}

#[test]
fn test_destructuring_count_mismatch() {
    let mut session = InterpreterSession::new();

    let error = session.evaluate("a, b = 1, 2, 3;").unwrap_err();
    assert!(matches!(
        error,
        SessionError::Evaluation(EvalError::ArityMismatch { .. })
    ));

    let error = session.evaluate("a = 1, 2;").unwrap_err();
    assert!(matches!(
        error,
        SessionError::Evaluation(EvalError::ArityMismatch { .. })
    ));
}

#[test]
fn test_while_loop_counts() {
    let mut session = InterpreterSession::new();
    session
        .evaluate("i = 0; total = 0; while i < 5 { total = total + i; i = i + 1; }")
        .unwrap();
    assert_eq!(integer(&session, "total"), 10);
}

#[test]
fn test_break_and_continue() {
    let mut session = InterpreterSession::new();
    session
        .evaluate(
            "i = 0; odd = 0;
             while 1 {
                 i = i + 1;
                 if i > 9 { break; }
                 if i % 2 == 0 { continue; }
                 odd = odd + 1;
             }",
        )
        .unwrap();
    assert_eq!(integer(&session, "i"), 10);
    assert_eq!(integer(&session, "odd"), 5);
}

#[test]
fn test_break_only_leaves_inner_loop() {
    let mut session = InterpreterSession::new();
    session
        .evaluate(
            "outer_count = 0; inner_count = 0; i = 0;
             while i < 3 {
                 i = i + 1;
                 outer_count = outer_count + 1;
                 j = 0;
                 while 1 {
                     j = j + 1;
                     inner_count = inner_count + 1;
                     if j == 2 { break; }
                 }
             }",
        )
        .unwrap();
    assert_eq!(integer(&session, "outer_count"), 3);
    assert_eq!(integer(&session, "inner_count"), 6);
}

#[test]
fn test_function_definition_reports_signature() {
    let mut session = InterpreterSession::new();
    session
        .assert_evaluates_to_string("fn add(a, b) { return a + b; }", "Defined add(a, b)")
        .unwrap();
    session.assert_evaluates_to_integer("add(2, 3);", 5).unwrap();
}

#[test]
fn test_function_results() {
    let mut session = InterpreterSession::new();
    session
        .evaluate(
            "fn last() { 1; 2; }
             fn nothing() { x = 1; }
             fn bare() { return; }
             fn pair() { return 1, 2; }",
        )
        .unwrap();

    session.assert_evaluates_to_integer("last();", 2).unwrap();
    session.assert_evaluates_to_integer("nothing();", 0).unwrap();
    session.assert_evaluates_to_null("bare();").unwrap();
    assert_eq!(session.evaluate("pair();").unwrap().to_string(), "(1, 2)");

    session.evaluate("a, b = pair();").unwrap();
    assert_eq!((integer(&session, "a"), integer(&session, "b")), (1, 2));
}

#[test]
fn test_stray_break_in_function_yields_zero() {
    let mut session = InterpreterSession::new();
    session.evaluate("fn f() { break; 99; }").unwrap();
    session.assert_evaluates_to_integer("f();", 0).unwrap();
}

#[test]
fn test_return_leaves_enclosing_loop() {
    let mut session = InterpreterSession::new();
    session
        .evaluate(
            "fn first_over(limit) {
                 i = 0;
                 while 1 {
                     i = i + 1;
                     if i * i > limit { return i; }
                 }
             }",
        )
        .unwrap();
    session.assert_evaluates_to_integer("first_over(50);", 8).unwrap();
}

#[test]
fn test_function_locals_do_not_leak() {
    let mut session = InterpreterSession::new();
    session
        .evaluate("x = 1; fn f() { x = 2; y = 3; return x; } r = f();")
        .unwrap();

    assert_eq!(integer(&session, "r"), 2);
    assert_eq!(integer(&session, "x"), 1);
    assert!(session.variable("y").is_err());
}

#[test]
fn test_function_reads_caller_variables() {
    let mut session = InterpreterSession::new();
    session
        .evaluate("scale = 10; fn scaled(n) { return n * scale; }")
        .unwrap();
    session.assert_evaluates_to_integer("scaled(4);", 40).unwrap();
}

#[test]
fn test_outer_writes_through() {
    let mut session = InterpreterSession::new();
    session
        .evaluate("count = 0; fn bump() { outer count; count = count + 1; } bump(); bump();")
        .unwrap();
    assert_eq!(integer(&session, "count"), 2);
}

#[test]
fn test_outer_through_nested_calls() {
    let mut session = InterpreterSession::new();
    session
        .evaluate(
            "hits = 0;
             fn inner() { outer hits; hits = hits + 10; }
             fn middle() { outer hits; hits = hits + 1; inner(); }
             middle();",
        )
        .unwrap();
    assert_eq!(integer(&session, "hits"), 11);
}

#[test]
fn test_outer_without_owner_stays_local() {
    let mut session = InterpreterSession::new();
    session
        .evaluate("fn f() { outer ghost; ghost = 5; return ghost; } r = f();")
        .unwrap();
    assert_eq!(integer(&session, "r"), 5);
    assert!(session.variable("ghost").is_err());
}

#[test]
fn test_lists_are_shared_across_calls() {
    let mut session = InterpreterSession::new();
    session
        .evaluate("items = [1]; fn grow(l) { @append(l, 2); } grow(items);")
        .unwrap();
    assert_eq!(session.variable("items").unwrap().to_string(), "[1, 2]");
}

#[test]
fn test_recursion() {
    let mut session = InterpreterSession::new();
    session
        .evaluate("fn fact(n) { if n <= 1 { return 1; } return n * fact(n - 1); }")
        .unwrap();
    session.assert_evaluates_to_integer("fact(10);", 3_628_800).unwrap();
}

#[test]
fn test_runaway_recursion_is_an_error() {
    // Every nested call costs several evaluator frames
    let outcome = std::thread::Builder::new()
        .stack_size(64 << 20)
        .spawn(|| {
            let mut session = InterpreterSession::new();
            let error = session
                .evaluate("fn down(n) { return down(n + 1); } down(0);")
                .unwrap_err();
            matches!(
                error,
                SessionError::Evaluation(EvalError::CallDepthExceeded { limit: crate::MAX_CALL_DEPTH, .. })
            )
        })
        .unwrap()
        .join()
        .unwrap();
    assert!(outcome);
}

#[test]
fn test_function_arity_is_checked() {
    let mut session = InterpreterSession::new();
    session.evaluate("fn one(a) { return a; }").unwrap();

    let error = session.evaluate("one(1, 2);").unwrap_err();
    assert!(matches!(
        error,
        SessionError::Evaluation(EvalError::ArityMismatch { .. })
    ));
}

#[test]
fn test_undefined_function() {
    let mut session = InterpreterSession::new();
    let error = session.evaluate("nope();").unwrap_err();
    assert!(matches!(
        error,
        SessionError::Evaluation(EvalError::UndefinedFunction { ref name, .. }) if name == "nope"
    ));
}

#[test]
fn test_top_level_return_ends_program() {
    let mut session = InterpreterSession::new();
    session.assert_evaluates_to_integer("x = 1; return 7; x = 2;", 7).unwrap();
    assert_eq!(integer(&session, "x"), 1);
}

#[test]
fn test_import_is_ignored_at_runtime() {
    let mut session = InterpreterSession::new();
    session.assert_evaluates_to_null("import \"lib.macroni\";").unwrap();
}

#[test]
fn test_functions_see_later_definitions() {
    let mut session = InterpreterSession::new();
    session
        .evaluate("fn a() { return b() + 1; } fn b() { return 41; }")
        .unwrap();
    session.assert_evaluates_to_integer("a();", 42).unwrap();
}
