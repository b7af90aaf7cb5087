// Expression parsing module
// Handles operator precedence, binary operations, and unary minus

use pest::pratt_parser::{Assoc, Op, PrattParser};

use crate::ast::*;
use crate::error::*;
use crate::parser::{MacroniParser, Pair, Rule};

impl MacroniParser {
    /// Operator precedence parser, levels from lowest to highest
    pub(crate) fn pratt_parser() -> PrattParser<Rule> {
        PrattParser::new()
            .op(Op::infix(Rule::op_or, Assoc::Left))
            .op(Op::infix(Rule::op_and, Assoc::Left))
            .op(Op::infix(Rule::op_compare, Assoc::Left))
            // Below the arithmetic levels, so `-` takes the whole sum after it
            .op(Op::prefix(Rule::op_negate))
            .op(Op::infix(Rule::op_additive, Assoc::Left))
            .op(Op::infix(Rule::op_multiplicative, Assoc::Left))
    }

    /// Fold the operands and operators of a `logical`, `comparison` or `sum` rule
    fn parse_expression_with_precedence(pair: Pair) -> ParseResult<Expression> {
        let parser = Self::pratt_parser();

        parser
            .map_primary(|primary| Self::parse_expression_from_pair(primary))
            .map_prefix(|op, operand: ParseResult<Expression>| {
                let operand = operand?;
                let span = Self::span_from_range(Self::span_from_pair(&op), operand.span);

                Ok(Expression {
                    kind: ExpressionKind::UnaryOp(UnaryOperation {
                        operator: UnaryOperator::Minus,
                        operand: Box::new(operand),
                        span,
                    }),
                    span,
                })
            })
            .map_infix(
                |left: ParseResult<Expression>, op, right: ParseResult<Expression>| {
                    let left = left?;
                    let right = right?;
                    let operator = Self::binary_operator(&op)?;
                    let span = Self::span_from_range(left.span, right.span);

                    Ok(Expression {
                        kind: ExpressionKind::BinaryOp(BinaryOperation {
                            left: Box::new(left),
                            operator,
                            right: Box::new(right),
                            span,
                        }),
                        span,
                    })
                },
            )
            .parse(pair.into_inner())
    }

    /// Parse an expression from a Pest pair at any precedence level
    pub(crate) fn parse_expression_from_pair(pair: Pair) -> ParseResult<Expression> {
        let span = Self::span_from_pair(&pair);

        match pair.as_rule() {
            Rule::expression => {
                let mut inner = pair.clone().into_inner();
                let expr = Self::expect_next(&mut inner, &pair, "expression")?;
                Self::parse_expression_from_pair(expr)
            }
            Rule::conditional_expr => Self::parse_if_expression(pair),
            Rule::logical | Rule::comparison | Rule::sum => {
                Self::parse_expression_with_precedence(pair)
            }
            Rule::atom => Self::parse_atom(pair),
            Rule::number => Ok(Expression {
                kind: Self::parse_number(&pair)?,
                span,
            }),
            Rule::string => Ok(Expression {
                kind: ExpressionKind::String(Self::parse_string_literal(pair)?),
                span,
            }),
            Rule::null_literal => Ok(Expression {
                kind: ExpressionKind::Null,
                span,
            }),
            Rule::true_literal => Ok(Expression {
                kind: ExpressionKind::Boolean(true),
                span,
            }),
            Rule::false_literal => Ok(Expression {
                kind: ExpressionKind::Boolean(false),
                span,
            }),
            Rule::identifier => Ok(Expression {
                kind: ExpressionKind::Identifier(Self::parse_identifier(&pair)),
                span,
            }),
            Rule::builtin_call => Ok(Expression {
                kind: ExpressionKind::BuiltinCall(Self::parse_builtin_call(pair)?),
                span,
            }),
            Rule::function_call => Ok(Expression {
                kind: ExpressionKind::FunctionCall(Self::parse_function_call(pair)?),
                span,
            }),
            Rule::parenthesized => {
                let mut inner = pair.clone().into_inner();
                let expr = Self::expect_next(&mut inner, &pair, "expression")?;
                Ok(Expression {
                    kind: ExpressionKind::Parenthesized(Box::new(
                        Self::parse_expression_from_pair(expr)?,
                    )),
                    span,
                })
            }
            Rule::tuple => {
                let elements = pair
                    .into_inner()
                    .map(Self::parse_expression_from_pair)
                    .collect::<ParseResult<Vec<_>>>()?;
                Ok(Expression {
                    kind: ExpressionKind::Tuple(elements),
                    span,
                })
            }
            Rule::list => {
                let elements = match pair.into_inner().next() {
                    Some(items) => Self::parse_expression_list(items)?,
                    None => Vec::new(),
                };
                Ok(Expression {
                    kind: ExpressionKind::List(elements),
                    span,
                })
            }
            _ => Err(Self::unexpected_rule(&pair, "expression")),
        }
    }

    fn binary_operator(op: &Pair) -> ParseResult<BinaryOperator> {
        let operator = match (op.as_rule(), op.as_str()) {
            (Rule::op_or, _) => BinaryOperator::LogicalOr,
            (Rule::op_and, _) => BinaryOperator::LogicalAnd,
            (Rule::op_compare, "==") => BinaryOperator::Equal,
            (Rule::op_compare, "!=") => BinaryOperator::NotEqual,
            (Rule::op_compare, "<") => BinaryOperator::Less,
            (Rule::op_compare, "<=") => BinaryOperator::LessEqual,
            (Rule::op_compare, ">") => BinaryOperator::Greater,
            (Rule::op_compare, ">=") => BinaryOperator::GreaterEqual,
            (Rule::op_additive, "+") => BinaryOperator::Add,
            (Rule::op_additive, "-") => BinaryOperator::Subtract,
            (Rule::op_multiplicative, "*") => BinaryOperator::Multiply,
            (Rule::op_multiplicative, "/") => BinaryOperator::Divide,
            (Rule::op_multiplicative, "%") => BinaryOperator::Modulo,
            _ => return Err(Self::unexpected_rule(op, "binary operator")),
        };
        Ok(operator)
    }

    /// Primary expression followed by any number of `[index]` suffixes
    fn parse_atom(pair: Pair) -> ParseResult<Expression> {
        let mut inner = pair.clone().into_inner();
        let primary = Self::expect_next(&mut inner, &pair, "primary expression")?;
        let mut expr = Self::parse_expression_from_pair(primary)?;

        for suffix in inner {
            let suffix_span = Self::span_from_pair(&suffix);
            let mut suffix_inner = suffix.clone().into_inner();
            let index = Self::expect_next(&mut suffix_inner, &suffix, "index expression")?;
            let span = Self::span_from_range(expr.span, suffix_span);

            expr = Expression {
                kind: ExpressionKind::Index(IndexExpression {
                    target: Box::new(expr),
                    index: Box::new(Self::parse_expression_from_pair(index)?),
                    span,
                }),
                span,
            };
        }

        Ok(expr)
    }

    fn parse_if_expression(pair: Pair) -> ParseResult<Expression> {
        let span = Self::span_from_pair(&pair);
        let mut condition = None;
        let mut blocks = Vec::new();

        for inner in pair.clone().into_inner() {
            match inner.as_rule() {
                // Skip keywords
                Rule::kw_if | Rule::kw_else => {}
                Rule::block => blocks.push(Self::parse_block(inner)?),
                _ => condition = Some(Self::parse_expression_from_pair(inner)?),
            }
        }

        let mut blocks = blocks.into_iter();
        match (condition, blocks.next()) {
            (Some(condition), Some(then_block)) => Ok(Expression {
                kind: ExpressionKind::If(IfExpression {
                    condition: Box::new(condition),
                    then_block,
                    else_block: blocks.next(),
                    span,
                }),
                span,
            }),
            _ => Err(Self::unexpected_rule(&pair, "if condition and block")),
        }
    }

    fn parse_function_call(pair: Pair) -> ParseResult<FunctionCall> {
        let span = Self::span_from_pair(&pair);
        let mut inner = pair.clone().into_inner();
        let name = Self::expect_next(&mut inner, &pair, "function name")?;

        let arguments = match inner.next() {
            Some(arguments) => Self::parse_expression_list(arguments)?,
            None => Vec::new(),
        };

        Ok(FunctionCall {
            name: Self::parse_identifier(&name),
            arguments,
            span,
        })
    }
}
