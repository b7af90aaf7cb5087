// Macroni Parser Error Handling
// Error reporting with miette integration

use crate::parser::Rule;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Main parse error type with miette integration
#[derive(Error, Diagnostic, Debug)]
pub enum ParseError {
    #[error("Parse error: {message}")]
    #[diagnostic(
        code(macroni::parse::syntax),
        help("Check the syntax near the highlighted location")
    )]
    PestError {
        #[source_code]
        src: String,
        #[label("error occurred here")]
        span: SourceSpan,
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Invalid number literal `{found}`")]
    #[diagnostic(
        code(macroni::parse::invalid_number),
        help("Numbers are decimal, optionally with a fraction and exponent (e.g. 42, 3.5, 1e-3)")
    )]
    InvalidNumber {
        #[source_code]
        src: String,
        #[label("invalid number")]
        span: SourceSpan,
        found: String,
    },

    #[error("Unknown built-in `@{name}`")]
    #[diagnostic(
        code(macroni::parse::unknown_builtin),
        help("Built-ins are a fixed set such as @print, @wait, @find_template")
    )]
    UnknownBuiltin {
        #[source_code]
        src: String,
        #[label("not a built-in")]
        span: SourceSpan,
        name: String,
    },

    #[error("Wrong arguments for `@{name}`: expected {expected}")]
    #[diagnostic(code(macroni::parse::builtin_arguments))]
    BuiltinArguments {
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
        name: String,
        expected: String,
    },

    #[error("Unexpected grammar rule")]
    #[diagnostic(
        code(macroni::parse::unexpected_rule),
        help("Expected rule: {expected}")
    )]
    UnexpectedRule {
        expected: String,
        found: Rule,
        span: crate::ast::Span,
    },
}

impl ParseError {
    /// Create a parse error from a Pest parsing error
    pub fn from_pest_error(error: pest::error::Error<Rule>, src: String) -> Self {
        let span = match error.location {
            pest::error::InputLocation::Pos(pos) => SourceSpan::new(pos.into(), 1),
            pest::error::InputLocation::Span((start, end)) => {
                SourceSpan::new(start.into(), end - start)
            }
        };
        let (line, column) = match error.line_col {
            pest::error::LineColLocation::Pos(pos) => pos,
            pest::error::LineColLocation::Span(start, _) => start,
        };

        let message = match &error.variant {
            pest::error::ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
                let mut expected: Vec<String> = positives
                    .iter()
                    .map(rule_to_user_friendly_description)
                    .collect();
                expected.dedup();
                format!("expected {}", expected.join(" or "))
            }
            pest::error::ErrorVariant::ParsingError { .. } => "unexpected input".to_string(),
            pest::error::ErrorVariant::CustomError { message } => message.clone(),
        };

        ParseError::PestError {
            src,
            span,
            message,
            line,
            column,
        }
    }

    pub fn invalid_number(src: String, span: SourceSpan, found: String) -> Self {
        ParseError::InvalidNumber { src, span, found }
    }

    pub fn unknown_builtin(src: String, span: SourceSpan, name: String) -> Self {
        ParseError::UnknownBuiltin { src, span, name }
    }

    pub fn builtin_arguments(src: String, span: SourceSpan, name: String, expected: &str) -> Self {
        ParseError::BuiltinArguments {
            src,
            span,
            name,
            expected: expected.to_string(),
        }
    }

    /// Attach the full source text; builders create errors before it is known
    pub fn with_source(mut self, source: &str) -> Self {
        match &mut self {
            ParseError::PestError { src, .. }
            | ParseError::InvalidNumber { src, .. }
            | ParseError::UnknownBuiltin { src, .. }
            | ParseError::BuiltinArguments { src, .. } => {
                if src.is_empty() {
                    *src = source.to_string();
                }
            }
            ParseError::UnexpectedRule { .. } => {}
        }
        self
    }

    /// 1-based line of a syntax error, when known
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::PestError { line, .. } => Some(*line),
            ParseError::UnexpectedRule { span, .. } => span.line(),
            _ => None,
        }
    }
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Convert a parser rule to a user-friendly description
fn rule_to_user_friendly_description(rule: &Rule) -> String {
    match rule {
        Rule::number => "a number (like 42 or 3.5)".to_string(),
        Rule::string => "a string (like \"hello\")".to_string(),
        Rule::identifier => "an identifier (like counter)".to_string(),
        Rule::builtin_name => "a built-in (like @print)".to_string(),
        Rule::builtin_call => "a built-in call (like @wait(100))".to_string(),
        Rule::function_call => "a function call (like f(1, 2))".to_string(),
        Rule::expression | Rule::logical | Rule::atom | Rule::sum => "an expression".to_string(),
        Rule::tuple => "a tuple (like (a, b))".to_string(),
        Rule::list => "a list (like [1, 2, 3])".to_string(),
        Rule::block => "a block ({ ... })".to_string(),
        Rule::conditional_expr => "an if expression (if cond { ... })".to_string(),
        Rule::op_assign => "'='".to_string(),
        Rule::op_compare => "a comparison operator".to_string(),
        Rule::op_additive | Rule::op_multiplicative | Rule::op_negate => {
            "an arithmetic operator".to_string()
        }
        Rule::op_and => "'&&'".to_string(),
        Rule::op_or => "'||'".to_string(),
        Rule::kw_if => "the 'if' keyword".to_string(),
        Rule::kw_else => "the 'else' keyword".to_string(),
        Rule::kw_while => "the 'while' keyword".to_string(),
        Rule::kw_fn => "the 'fn' keyword".to_string(),
        Rule::kw_return => "the 'return' keyword".to_string(),
        Rule::kw_break => "the 'break' keyword".to_string(),
        Rule::kw_continue => "the 'continue' keyword".to_string(),
        Rule::kw_outer => "the 'outer' keyword".to_string(),
        Rule::kw_import => "the 'import' keyword".to_string(),
        Rule::EOI => "end of input".to_string(),
        _ => format!("{:?}", rule).replace('_', " "),
    }
}
