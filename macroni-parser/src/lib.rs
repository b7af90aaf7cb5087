//! Parser for the Macroni automation language.
//!
//! Source text becomes a [`Program`] of span-carrying statements; failures
//! are [`ParseError`] diagnostics that carry their source for rendering.

pub mod ast;
pub mod error;
pub mod parser;

pub use ast::*;
pub use error::*;
pub use parser::*;

/// Parse a whole script
pub fn parse_program(input: &str) -> Result<Program, ParseError> {
    parser::MacroniParser::parse_program(input)
}

/// Parse a whole script, naming its file in diagnostics
pub fn parse_program_with_source(
    input: &str,
    source_file: Option<String>,
) -> Result<Program, ParseError> {
    parser::MacroniParser::parse_program_with_source(input, source_file)
}

/// Parse a single expression, as the debugger's `eval` command does
pub fn parse_expression(input: &str) -> Result<Expression, ParseError> {
    parser::MacroniParser::parse_expression(input)
}

#[cfg(test)]
#[path = "tests/mod.rs"]
mod tests;
