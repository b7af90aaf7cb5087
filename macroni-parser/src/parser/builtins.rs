// Built-in call parsing
// Resolves `@name` against the fixed table and enforces each built-in's argument shape

use super::{MacroniParser, Pair};
use crate::ast::*;
use crate::error::*;

impl MacroniParser {
    pub(super) fn parse_builtin_call(pair: Pair) -> ParseResult<BuiltinCall> {
        let span = Self::span_from_pair(&pair);
        let mut inner = pair.clone().into_inner();
        let name_pair = Self::expect_next(&mut inner, &pair, "built-in name")?;
        let name_span = Self::span_from_pair(&name_pair);
        let name = name_pair.as_str().trim_start_matches('@');

        let builtin = Builtin::from_name(name).ok_or_else(|| {
            ParseError::unknown_builtin(
                String::new(),
                Self::source_span(&name_span),
                name.to_string(),
            )
        })?;

        let arguments = match inner.next() {
            Some(arguments) => Self::parse_expression_list(arguments)?,
            None => Vec::new(),
        };

        Self::check_builtin_shape(builtin, &arguments, &span)?;

        Ok(BuiltinCall {
            builtin,
            arguments,
            span,
        })
    }

    fn check_builtin_shape(builtin: Builtin, arguments: &[Expression], span: &Span) -> ParseResult<()> {
        let expected = match builtin.shape() {
            BuiltinShape::Arguments if arguments.is_empty() => Some("at least one argument"),
            BuiltinShape::Single if arguments.len() != 1 => Some("exactly one argument"),
            BuiltinShape::Empty if !arguments.is_empty() => Some("no arguments"),
            BuiltinShape::FunctionNames
                if arguments.len() != 2
                    || arguments
                        .iter()
                        .any(|arg| !matches!(arg.kind, ExpressionKind::Identifier(_))) =>
            {
                Some("two function names")
            }
            _ => None,
        };

        match expected {
            Some(expected) => Err(ParseError::builtin_arguments(
                String::new(),
                Self::source_span(span),
                builtin.name().to_string(),
                expected,
            )),
            None => Ok(()),
        }
    }
}
