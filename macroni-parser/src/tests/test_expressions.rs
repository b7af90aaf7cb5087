use crate::ast::*;
use crate::parser::MacroniParser;

fn expr(input: &str) -> Expression {
    MacroniParser::parse_expression(input).unwrap()
}

fn binary(expr: &Expression) -> &BinaryOperation {
    match &expr.kind {
        ExpressionKind::BinaryOp(op) => op,
        other => panic!("Expected binary operation, got {other:?}"),
    }
}

#[test]
fn test_number_literals() {
    assert_eq!(expr("42").kind, ExpressionKind::Integer(42));
    assert_eq!(expr("3.5").kind, ExpressionKind::Float(3.5));
    assert_eq!(expr(".25").kind, ExpressionKind::Float(0.25));
}

#[test]
fn test_whole_floats_read_as_integers() {
    assert_eq!(expr("2.0").kind, ExpressionKind::Integer(2));
    assert_eq!(expr("1e3").kind, ExpressionKind::Integer(1000));
    assert_eq!(expr("1.5e1").kind, ExpressionKind::Integer(15));
}

#[test]
fn test_string_literal_escapes() {
    assert_eq!(
        expr(r#""line\nnext \"q\"""#).kind,
        ExpressionKind::String("line\nnext \"q\"".to_string())
    );
    assert_eq!(expr(r#""""#).kind, ExpressionKind::String(String::new()));
}

#[test]
fn test_keyword_literals() {
    assert_eq!(expr("null").kind, ExpressionKind::Null);
    assert_eq!(expr("true").kind, ExpressionKind::Boolean(true));
    assert_eq!(expr("false").kind, ExpressionKind::Boolean(false));
}

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    let e = expr("1 + 2 * 3");
    let add = binary(&e);
    assert_eq!(add.operator, BinaryOperator::Add);
    assert_eq!(binary(&add.right).operator, BinaryOperator::Multiply);
}

#[test]
fn test_addition_is_left_associative() {
    let e = expr("1 - 2 - 3");
    let outer = binary(&e);
    assert_eq!(outer.operator, BinaryOperator::Subtract);
    assert_eq!(binary(&outer.left).operator, BinaryOperator::Subtract);
    assert_eq!(outer.right.kind, ExpressionKind::Integer(3));
}

#[test]
fn test_negation_covers_following_sum() {
    match expr("-1 + 2").kind {
        ExpressionKind::UnaryOp(unary) => {
            assert_eq!(unary.operator, UnaryOperator::Minus);
            assert_eq!(binary(&unary.operand).operator, BinaryOperator::Add);
        }
        other => panic!("Expected negation, got {other:?}"),
    }
}

#[test]
fn test_negation_stops_at_comparison() {
    let e = expr("-a * b + c < d");
    let less = binary(&e);
    assert_eq!(less.operator, BinaryOperator::Less);
    match &less.left.kind {
        ExpressionKind::UnaryOp(unary) => {
            let add = binary(&unary.operand);
            assert_eq!(add.operator, BinaryOperator::Add);
            assert_eq!(binary(&add.left).operator, BinaryOperator::Multiply);
        }
        other => panic!("Expected negation, got {other:?}"),
    }
    match &less.right.kind {
        ExpressionKind::Identifier(id) => assert_eq!(id.name, "d"),
        other => panic!("Expected identifier, got {other:?}"),
    }
}

#[test]
fn test_negation_only_opens_a_sum() {
    assert!(MacroniParser::parse_expression("5 - -2").is_err());
    assert!(MacroniParser::parse_expression("2 * -3").is_err());
    assert!(MacroniParser::parse_expression("a == -3 && -b < 1").is_ok());
}

#[test]
fn test_mixed_precedence_and_associativity() {
    // (a || (b && c)) || (((d * e) % f) > g)
    let e = expr("a || b && c || d * e % f > g");
    let outer = binary(&e);
    assert_eq!(outer.operator, BinaryOperator::LogicalOr);
    assert_eq!(binary(&outer.left).operator, BinaryOperator::LogicalOr);
    assert_eq!(binary(&binary(&outer.left).right).operator, BinaryOperator::LogicalAnd);

    let greater = binary(&outer.right);
    assert_eq!(greater.operator, BinaryOperator::Greater);
    let modulo = binary(&greater.left);
    assert_eq!(modulo.operator, BinaryOperator::Modulo);
    assert_eq!(binary(&modulo.left).operator, BinaryOperator::Multiply);
}

#[test]
fn test_binary_span_covers_both_operands() {
    let e = expr("x  +  y * 2");
    assert_eq!((e.span.start, e.span.end), (0, 11));
    let product = &binary(&e).right;
    assert_eq!((product.span.start, product.span.end), (6, 11));
}

#[test]
fn test_logical_precedence() {
    let e = expr("a || b && c == d");
    let or = binary(&e);
    assert_eq!(or.operator, BinaryOperator::LogicalOr);
    let and = binary(&or.right);
    assert_eq!(and.operator, BinaryOperator::LogicalAnd);
    assert_eq!(binary(&and.right).operator, BinaryOperator::Equal);
}

#[test]
fn test_comparison_is_not_chainable() {
    assert!(MacroniParser::parse_expression("1 < 2 < 3").is_err());
}

#[test]
fn test_tuple_and_parenthesized() {
    match expr("(1, x, \"s\")").kind {
        ExpressionKind::Tuple(items) => assert_eq!(items.len(), 3),
        other => panic!("Expected tuple, got {other:?}"),
    }
    assert!(matches!(
        expr("(1 + 2)").kind,
        ExpressionKind::Parenthesized(_)
    ));
}

#[test]
fn test_list_literals() {
    match expr("[]").kind {
        ExpressionKind::List(items) => assert!(items.is_empty()),
        other => panic!("Expected list, got {other:?}"),
    }
    match expr("[1, 2 + 3, [4]]").kind {
        ExpressionKind::List(items) => {
            assert_eq!(items.len(), 3);
            assert!(matches!(items[2].kind, ExpressionKind::List(_)));
        }
        other => panic!("Expected list, got {other:?}"),
    }
}

#[test]
fn test_chained_indexing() {
    match expr("grid[1][-1]").kind {
        ExpressionKind::Index(outer) => {
            assert!(matches!(outer.index.kind, ExpressionKind::UnaryOp(_)));
            match &outer.target.kind {
                ExpressionKind::Index(inner) => {
                    assert_eq!(inner.index.kind, ExpressionKind::Integer(1));
                }
                other => panic!("Expected inner index, got {other:?}"),
            }
        }
        other => panic!("Expected index, got {other:?}"),
    }
}

#[test]
fn test_function_call() {
    match expr("f(1, g())").kind {
        ExpressionKind::FunctionCall(call) => {
            assert_eq!(call.name.name, "f");
            assert_eq!(call.arguments.len(), 2);
            assert!(matches!(
                call.arguments[1].kind,
                ExpressionKind::FunctionCall(_)
            ));
        }
        other => panic!("Expected function call, got {other:?}"),
    }
}

#[test]
fn test_if_expression_with_else() {
    match expr("if x > 1 { 1; } else { 2; }").kind {
        ExpressionKind::If(if_expr) => {
            assert_eq!(if_expr.then_block.statements.len(), 1);
            assert!(if_expr.else_block.is_some());
        }
        other => panic!("Expected if expression, got {other:?}"),
    }
}

#[test]
fn test_expression_spans() {
    let e = expr("  1 + 2");
    assert_eq!(e.span.start, 2);
    assert_eq!(e.span.end, 7);
    assert_eq!(e.span.column, 3);
}
