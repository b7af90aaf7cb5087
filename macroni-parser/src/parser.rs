// Macroni Parser
// Program and statement parsing; expressions, literals and built-in calls live in submodules

use miette::SourceSpan;
use pest::Parser;
use pest_derive::Parser;

use crate::ast::*;
use crate::error::*;

mod builtins;
mod expressions;
mod literals;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct MacroniParser;

pub(crate) type Pair<'i> = pest::iterators::Pair<'i, Rule>;

impl MacroniParser {
    pub fn parse_program(input: &str) -> ParseResult<Program> {
        Self::parse_program_with_source(input, None)
    }

    pub fn parse_program_with_source(
        input: &str,
        source_file: Option<String>,
    ) -> ParseResult<Program> {
        let mut pairs = Self::parse(Rule::program, input)
            .map_err(|e| ParseError::from_pest_error(e, input.to_string()))?;

        let Some(program_pair) = pairs.next() else {
            return Ok(Program {
                statements: Vec::new(),
                source_file,
                span: Span::new(0, input.len()),
            });
        };
        let span = Self::span_from_pair(&program_pair);

        let statements = program_pair
            .into_inner()
            .filter(|pair| pair.as_rule() != Rule::EOI)
            .map(Self::parse_statement)
            .collect::<ParseResult<Vec<_>>>()
            .map_err(|e| e.with_source(input))?;

        Ok(Program {
            statements,
            source_file,
            span,
        })
    }

    /// Parse a standalone expression, as typed at the debugger's `eval` prompt
    pub fn parse_expression(input: &str) -> ParseResult<Expression> {
        let mut pairs = Self::parse(Rule::expression_input, input)
            .map_err(|e| ParseError::from_pest_error(e, input.to_string()))?;

        let expression_pair = pairs
            .next()
            .and_then(|pair| pair.into_inner().find(|p| p.as_rule() == Rule::expression))
            .ok_or_else(|| ParseError::PestError {
                src: input.to_string(),
                span: SourceSpan::new(0.into(), input.len()),
                message: "expected an expression".to_string(),
                line: 1,
                column: 1,
            })?;

        Self::parse_expression_from_pair(expression_pair).map_err(|e| e.with_source(input))
    }

    pub(crate) fn span_from_pair(pair: &Pair) -> Span {
        let pest_span = pair.as_span();
        let (line, column) = pest_span.start_pos().line_col();
        Span::with_line_col(pest_span.start(), pest_span.end(), line, column)
    }

    /// Span covering `first` through `last`, positioned at `first`
    pub(crate) fn span_from_range(first: Span, last: Span) -> Span {
        Span::with_line_col(first.start, last.end, first.line, first.column)
    }

    pub(crate) fn source_span(span: &Span) -> SourceSpan {
        SourceSpan::new(span.start.into(), span.len())
    }

    pub(crate) fn unexpected_rule(pair: &Pair, expected: &str) -> ParseError {
        ParseError::UnexpectedRule {
            expected: expected.to_string(),
            found: pair.as_rule(),
            span: Self::span_from_pair(pair),
        }
    }

    /// Next child of a pair, or an error naming what the grammar promised
    pub(crate) fn expect_next<'i>(
        inner: &mut pest::iterators::Pairs<'i, Rule>,
        parent: &Pair<'i>,
        expected: &str,
    ) -> ParseResult<Pair<'i>> {
        inner
            .next()
            .ok_or_else(|| Self::unexpected_rule(parent, expected))
    }

    fn parse_statement(pair: Pair) -> ParseResult<Statement> {
        let span = Self::span_from_pair(&pair);

        let kind = match pair.as_rule() {
            Rule::import_stmt => StatementKind::Import(Self::parse_import(pair)?),
            Rule::outer_stmt => {
                let mut inner = pair.clone().into_inner();
                // Skip the 'outer' keyword
                inner.next();
                let name = Self::expect_next(&mut inner, &pair, "identifier")?;
                StatementKind::Outer(Self::parse_identifier(&name))
            }
            Rule::func_def => StatementKind::FunctionDefinition(Self::parse_function(pair)?),
            Rule::while_stmt => StatementKind::While(Self::parse_while(pair)?),
            Rule::break_stmt => StatementKind::Break,
            Rule::continue_stmt => StatementKind::Continue,
            Rule::return_stmt => {
                let values = pair
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::return_values)
                    .map(Self::parse_expression_list)
                    .transpose()?
                    .unwrap_or_default();
                StatementKind::Return(ReturnStatement { values, span })
            }
            Rule::assign_stmt => StatementKind::Assignment(Self::parse_assignment(pair)?),
            Rule::expr_stmt => {
                let mut inner = pair.clone().into_inner();
                let expr = Self::expect_next(&mut inner, &pair, "expression")?;
                StatementKind::Expression(Self::parse_expression_from_pair(expr)?)
            }
            _ => return Err(Self::unexpected_rule(&pair, "statement")),
        };

        Ok(Statement { kind, span })
    }

    fn parse_import(pair: Pair) -> ParseResult<ImportStatement> {
        let span = Self::span_from_pair(&pair);
        let mut inner = pair.clone().into_inner();

        // Skip the 'import' keyword
        inner.next();
        let path = Self::expect_next(&mut inner, &pair, "string")?;

        Ok(ImportStatement {
            path: Self::parse_string_literal(path)?,
            span,
        })
    }

    fn parse_function(pair: Pair) -> ParseResult<FunctionDefinition> {
        let span = Self::span_from_pair(&pair);
        let mut name = None;
        let mut parameters = Vec::new();
        let mut body = None;

        for inner in pair.clone().into_inner() {
            match inner.as_rule() {
                Rule::kw_fn => {}
                Rule::identifier => name = Some(Self::parse_identifier(&inner)),
                Rule::params => {
                    parameters = inner
                        .into_inner()
                        .map(|param| Self::parse_identifier(&param))
                        .collect();
                }
                Rule::block => body = Some(Self::parse_block(inner)?),
                _ => return Err(Self::unexpected_rule(&inner, "function definition")),
            }
        }

        match (name, body) {
            (Some(name), Some(body)) => Ok(FunctionDefinition {
                name,
                parameters,
                body,
                span,
            }),
            _ => Err(Self::unexpected_rule(&pair, "function name and body")),
        }
    }

    fn parse_while(pair: Pair) -> ParseResult<WhileLoop> {
        let span = Self::span_from_pair(&pair);
        let mut inner = pair.clone().into_inner();

        // Skip the 'while' keyword
        inner.next();
        let condition = Self::expect_next(&mut inner, &pair, "loop condition")?;
        let body = Self::expect_next(&mut inner, &pair, "loop body")?;

        Ok(WhileLoop {
            condition: Self::parse_expression_from_pair(condition)?,
            body: Self::parse_block(body)?,
            span,
        })
    }

    fn parse_assignment(pair: Pair) -> ParseResult<Assignment> {
        let span = Self::span_from_pair(&pair);
        let mut targets = Vec::new();
        let mut values = Vec::new();

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::assign_targets => {
                    targets = inner
                        .into_inner()
                        .map(|target| Self::parse_identifier(&target))
                        .collect();
                }
                Rule::assign_values => values = Self::parse_expression_list(inner)?,
                Rule::op_assign => {}
                _ => return Err(Self::unexpected_rule(&inner, "assignment")),
            }
        }

        Ok(Assignment {
            targets,
            values,
            span,
        })
    }

    pub(crate) fn parse_block(pair: Pair) -> ParseResult<Block> {
        let span = Self::span_from_pair(&pair);
        let statements = pair
            .into_inner()
            .map(Self::parse_statement)
            .collect::<ParseResult<Vec<_>>>()?;

        Ok(Block { statements, span })
    }

    pub(crate) fn parse_identifier(pair: &Pair) -> Identifier {
        Identifier {
            name: pair.as_str().to_string(),
            span: Self::span_from_pair(pair),
        }
    }

    /// Comma-separated expressions (arguments, list items, return values)
    pub(crate) fn parse_expression_list(pair: Pair) -> ParseResult<Vec<Expression>> {
        pair.into_inner()
            .map(Self::parse_expression_from_pair)
            .collect()
    }
}
