// Literal parsing functions for the Macroni parser
// Handles numbers and strings

use super::{MacroniParser, Pair, Rule};
use crate::ast::*;
use crate::error::*;

impl MacroniParser {
    /// Parse a number literal; floats with no fractional part become integers
    pub(super) fn parse_number(pair: &Pair) -> ParseResult<ExpressionKind> {
        let span = Self::span_from_pair(pair);
        let text = pair.as_str();
        let invalid = || {
            ParseError::invalid_number(String::new(), Self::source_span(&span), text.to_string())
        };

        if !text.contains(['.', 'e', 'E']) {
            return text
                .parse::<i64>()
                .map(ExpressionKind::Integer)
                .map_err(|_| invalid());
        }

        let value = text.parse::<f64>().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }

        // 2.0 reads as 2, 1e3 as 1000
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Ok(ExpressionKind::Integer(value as i64))
        } else {
            Ok(ExpressionKind::Float(value))
        }
    }

    /// Parse a string literal, resolving escape sequences
    pub(crate) fn parse_string_literal(pair: Pair) -> ParseResult<String> {
        if pair.as_rule() != Rule::string {
            return Err(Self::unexpected_rule(&pair, "string"));
        }

        let content = pair
            .into_inner()
            .next()
            .map(|content| content.as_str())
            .unwrap_or_default();

        Ok(unescape(content))
    }
}

/// Resolve backslash escapes; unknown escapes are kept as written
pub(crate) fn unescape(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }

        let Some(escaped) = chars.next() else {
            result.push('\\');
            break;
        };

        match escaped {
            'n' => result.push('\n'),
            't' => result.push('\t'),
            'r' => result.push('\r'),
            '0' => result.push('\0'),
            'a' => result.push('\x07'),
            'b' => result.push('\x08'),
            'f' => result.push('\x0c'),
            'v' => result.push('\x0b'),
            '\\' => result.push('\\'),
            '"' => result.push('"'),
            '\'' => result.push('\''),
            'x' | 'u' | 'U' => {
                let width = match escaped {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars
                    .clone()
                    .take(width)
                    .take_while(|c| c.is_ascii_hexdigit())
                    .collect();

                let decoded = (digits.len() == width)
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);

                match decoded {
                    Some(decoded) => {
                        result.push(decoded);
                        for _ in 0..width {
                            chars.next();
                        }
                    }
                    None => {
                        result.push('\\');
                        result.push(escaped);
                    }
                }
            }
            other => {
                result.push('\\');
                result.push(other);
            }
        }
    }

    result
}
