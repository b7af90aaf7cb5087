//! Acceptance tests for expression evaluation

use crate::{EvalError, InterpreterSession, SessionError, Value};
use pretty_assertions::assert_eq;

#[test]
fn test_literals() {
    let mut session = InterpreterSession::new();

    session.assert_evaluates_to_integer("42;", 42).unwrap();
    session.assert_evaluates_to_integer("true;", 1).unwrap();
    session.assert_evaluates_to_integer("false;", 0).unwrap();
    session.assert_evaluates_to_null("null;").unwrap();
    session.assert_evaluates_to_string("\"hi\\tthere\";", "hi\tthere").unwrap();

    // whole floats come back as integers
    session.assert_evaluates_to_integer("2.0;", 2).unwrap();
    assert_eq!(session.evaluate("2.5;").unwrap(), Value::Float(2.5));
}

#[test]
fn test_arithmetic() {
    let mut session = InterpreterSession::new();

    session.assert_evaluates_to_integer("1 + 2 * 3;", 7).unwrap();
    session.assert_evaluates_to_integer("(1 + 2) * 3;", 9).unwrap();
    session.assert_evaluates_to_integer("7 % 3;", 1).unwrap();
    session.assert_evaluates_to_integer("(0 - 7) % 3;", 2).unwrap();
    assert_eq!(session.evaluate("7 / 2;").unwrap(), Value::Float(3.5));
    assert_eq!(session.evaluate("4 / 2;").unwrap(), Value::Float(2.0));
}

#[test]
fn test_unary_minus_binds_following_sum() {
    let mut session = InterpreterSession::new();
    session.assert_evaluates_to_integer("-1 + 2;", -3).unwrap();
    session.assert_evaluates_to_integer("-2 * 3;", -6).unwrap();
}

#[test]
fn test_string_coercing_plus() {
    let mut session = InterpreterSession::new();
    session.assert_evaluates_to_string("\"a\" + 1;", "a1").unwrap();
    session.assert_evaluates_to_string("2 + \"b\";", "2b").unwrap();
    session.assert_evaluates_to_string("\"ab\" + \"cd\";", "abcd").unwrap();
}

#[test]
fn test_comparisons_produce_integers() {
    let mut session = InterpreterSession::new();

    session.assert_evaluates_to_integer("1 == null;", 0).unwrap();
    session.assert_evaluates_to_integer("null == null;", 1).unwrap();
    session.assert_evaluates_to_integer("1 == 1.0;", 1).unwrap();
    session.assert_evaluates_to_integer("1 != 2;", 1).unwrap();
    session.assert_evaluates_to_integer("2 >= 2;", 1).unwrap();
    session.assert_evaluates_to_integer("\"abc\" < \"abd\";", 1).unwrap();
    session.assert_evaluates_to_integer("(1, 2) < (1, 3);", 1).unwrap();
}

#[test]
fn test_ordering_unrelated_kinds_is_type_error() {
    let mut session = InterpreterSession::new();
    let error = session.evaluate("1 < \"a\";").unwrap_err();
    assert!(matches!(
        error,
        SessionError::Evaluation(EvalError::TypeError { .. })
    ));
}

#[test]
fn test_logical_operators_short_circuit() {
    let mut session = InterpreterSession::new();

    session.assert_evaluates_to_integer("0 && missing;", 0).unwrap();
    session.assert_evaluates_to_integer("1 || missing;", 1).unwrap();
    session.assert_evaluates_to_integer("2 && \"x\";", 1).unwrap();
    session.assert_evaluates_to_integer("0 || null;", 0).unwrap();
}

#[test]
fn test_conditional_expression_values() {
    let mut session = InterpreterSession::new();

    session.evaluate("x = if 1 { 10; } else { 20; };").unwrap();
    assert_eq!(session.variable("x").unwrap(), Value::Integer(10));

    session.evaluate("y = if \"\" { 10; } else { 20; };").unwrap();
    assert_eq!(session.variable("y").unwrap(), Value::Integer(20));

    session.assert_evaluates_to_null("if 0 { 1; }").unwrap();
}

#[test]
fn test_collections() {
    let mut session = InterpreterSession::new();

    let tuple = session.evaluate("(1, \"a\");").unwrap();
    assert_eq!(tuple, Value::tuple(vec![Value::Integer(1), Value::string("a")]));

    let list = session.evaluate("[1, 2, 3];").unwrap();
    assert_eq!(list.to_string(), "[1, 2, 3]");

    let empty = session.evaluate("[];").unwrap();
    assert_eq!(empty.to_string(), "[]");
}

#[test]
fn test_lenient_indexing() {
    let mut session = InterpreterSession::new();

    session.evaluate("lst = [1, 2];").unwrap();
    session.assert_evaluates_to_integer("lst[1];", 2).unwrap();
    session.assert_evaluates_to_integer("lst[-1];", 2).unwrap();
    session.assert_evaluates_to_null("lst[5];").unwrap();
    session.assert_evaluates_to_null("lst[-3];").unwrap();
    session.assert_evaluates_to_null("null[0];").unwrap();
    session.assert_evaluates_to_string("\"abc\"[1];", "b").unwrap();
}

#[test]
fn test_non_integer_index_is_an_error() {
    let mut session = InterpreterSession::new();
    let error = session.evaluate("[1, 2][\"0\"];").unwrap_err();
    assert!(matches!(
        error,
        SessionError::Evaluation(EvalError::IndexTypeError { .. })
    ));
}

#[test]
fn test_undefined_variable_carries_span() {
    let mut session = InterpreterSession::new();
    let error = session.evaluate("x = 1;\ny = missing;").unwrap_err();

    let SessionError::Evaluation(error) = &error else {
        panic!("expected an evaluation error, got {error:?}");
    };
    assert!(matches!(error, EvalError::UndefinedVariable { name, .. } if name == "missing"));
    let span = error.span().expect("span attached");
    assert_eq!(span.offset(), 11);
}

#[test]
fn test_division_by_zero() {
    let mut session = InterpreterSession::new();
    let error = session.evaluate("1 / 0;").unwrap_err();
    assert!(matches!(
        error,
        SessionError::Evaluation(EvalError::DivisionByZero { .. })
    ));
}

#[test]
fn test_repetition() {
    let mut session = InterpreterSession::new();
    session.assert_evaluates_to_string("\"ab\" * 3;", "ababab").unwrap();
    assert_eq!(session.evaluate("[1, 2] * 2;").unwrap().to_string(), "[1, 2, 1, 2]");
    assert_eq!(session.evaluate("2 * (1, 2);").unwrap().to_string(), "(1, 2, 1, 2)");
    assert_eq!(session.evaluate("[1] * (0 - 3);").unwrap().to_string(), "[]");
}

#[test]
fn test_oversized_repetition_is_an_error() {
    let mut session = InterpreterSession::new();
    for source in ["\"ab\" * 9223372036854775807;", "[0] * 9223372036854775807;"] {
        let error = session.evaluate(source).unwrap_err();
        assert!(matches!(
            error,
            SessionError::Evaluation(EvalError::IntegerOverflow { .. })
        ));
    }
}
