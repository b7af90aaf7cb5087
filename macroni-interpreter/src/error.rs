//! Runtime error types for the Macroni interpreter.
//!
//! Errors propagate unhandled up the recursive evaluator; the runner or
//! REPL at the top renders them with miette.

use miette::{Diagnostic, SourceSpan};
use macroni_parser::Span;
use thiserror::Error;

/// Failures reported by a host adapter
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("{capability} is not available on this host")]
    #[diagnostic(code(macroni::host::unavailable))]
    Unavailable { capability: String },

    #[error("No recording named '{name}'")]
    #[diagnostic(
        code(macroni::host::missing_recording),
        help("Create it first with @record(\"{name}\")")
    )]
    MissingRecording { name: String },

    #[error("Input error: {message}")]
    #[diagnostic(code(macroni::host::input))]
    Input { message: String },

    #[error("Cache error in {path}: {message}")]
    #[diagnostic(code(macroni::host::cache))]
    Cache { path: String, message: String },

    #[error("{message}")]
    #[diagnostic(code(macroni::host::failed))]
    Failed { message: String },
}

impl HostError {
    pub fn unavailable(capability: &str) -> Self {
        Self::Unavailable {
            capability: capability.to_string(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

pub type HostResult<T> = std::result::Result<T, HostError>;

/// Runtime errors that can occur during evaluation
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Variable not found: {name}")]
    #[diagnostic(
        code(macroni::runtime::undefined_variable),
        help("Assign the variable before reading it, or declare it with `outer`")
    )]
    UndefinedVariable {
        name: String,
        #[label("undefined variable")]
        span: Option<SourceSpan>,
    },

    #[error("Function not found: {name}")]
    #[diagnostic(
        code(macroni::runtime::undefined_function),
        help("Functions must be defined with `fn` before they are called")
    )]
    UndefinedFunction {
        name: String,
        #[label("undefined function")]
        span: Option<SourceSpan>,
    },

    #[error("Arity mismatch: {what} expects {expected}, got {found}")]
    #[diagnostic(code(macroni::runtime::arity_mismatch))]
    ArityMismatch {
        what: String,
        expected: String,
        found: usize,
        #[label("wrong number of values")]
        span: Option<SourceSpan>,
    },

    #[error("Type error: {message}")]
    #[diagnostic(code(macroni::runtime::type_error))]
    TypeError {
        message: String,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("Index must be an integer, got {found}")]
    #[diagnostic(code(macroni::runtime::index_type))]
    IndexTypeError {
        found: String,
        #[label("non-integer index")]
        span: Option<SourceSpan>,
    },

    #[error("Division by zero")]
    #[diagnostic(
        code(macroni::runtime::division_by_zero),
        help("Ensure the divisor is not zero before division")
    )]
    DivisionByZero {
        #[label("division by zero here")]
        span: Option<SourceSpan>,
    },

    #[error("Integer overflow in {operation}")]
    #[diagnostic(code(macroni::runtime::integer_overflow))]
    IntegerOverflow {
        operation: String,
        #[label("overflows a 64-bit integer")]
        span: Option<SourceSpan>,
    },

    #[error("Call depth exceeded {limit} nested function calls")]
    #[diagnostic(
        code(macroni::runtime::call_depth),
        help("Check for recursion without a terminating condition")
    )]
    CallDepthExceeded {
        limit: usize,
        #[label("call nested too deeply")]
        span: Option<SourceSpan>,
    },

    #[error("Internal error: {message}")]
    #[diagnostic(code(macroni::runtime::internal))]
    Internal {
        message: String,
        #[label("while evaluating this")]
        span: Option<SourceSpan>,
    },

    #[error("@{builtin} failed: {source}")]
    #[diagnostic(code(macroni::runtime::host))]
    Host {
        builtin: String,
        #[source]
        source: HostError,
        #[label("host call failed")]
        span: Option<SourceSpan>,
    },
}

impl EvalError {
    pub fn undefined_variable(name: &str) -> Self {
        Self::UndefinedVariable {
            name: name.to_string(),
            span: None,
        }
    }

    pub fn undefined_function(name: &str) -> Self {
        Self::UndefinedFunction {
            name: name.to_string(),
            span: None,
        }
    }

    pub fn arity_mismatch(what: impl Into<String>, expected: impl ToString, found: usize) -> Self {
        Self::ArityMismatch {
            what: what.into(),
            expected: expected.to_string(),
            found,
            span: None,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError {
            message: message.into(),
            span: None,
        }
    }

    pub fn index_type(found: &str) -> Self {
        Self::IndexTypeError {
            found: found.to_string(),
            span: None,
        }
    }

    pub fn division_by_zero() -> Self {
        Self::DivisionByZero { span: None }
    }

    pub fn overflow(operation: &str) -> Self {
        Self::IntegerOverflow {
            operation: operation.to_string(),
            span: None,
        }
    }

    pub fn call_depth(limit: usize) -> Self {
        Self::CallDepthExceeded { limit, span: None }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            span: None,
        }
    }

    pub fn host(builtin: &str, source: HostError) -> Self {
        Self::Host {
            builtin: builtin.to_string(),
            source,
            span: None,
        }
    }

    /// Attach a source location unless one is already present
    pub fn with_span(mut self, at: Span) -> Self {
        let slot = match &mut self {
            Self::UndefinedVariable { span, .. }
            | Self::UndefinedFunction { span, .. }
            | Self::ArityMismatch { span, .. }
            | Self::TypeError { span, .. }
            | Self::IndexTypeError { span, .. }
            | Self::DivisionByZero { span }
            | Self::IntegerOverflow { span, .. }
            | Self::CallDepthExceeded { span, .. }
            | Self::Internal { span, .. }
            | Self::Host { span, .. } => span,
        };
        if slot.is_none() {
            *slot = Some(span_to_source_span(at));
        }
        self
    }

    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            Self::UndefinedVariable { span, .. }
            | Self::UndefinedFunction { span, .. }
            | Self::ArityMismatch { span, .. }
            | Self::TypeError { span, .. }
            | Self::IndexTypeError { span, .. }
            | Self::DivisionByZero { span }
            | Self::IntegerOverflow { span, .. }
            | Self::CallDepthExceeded { span, .. }
            | Self::Internal { span, .. }
            | Self::Host { span, .. } => *span,
        }
    }
}

/// Convert parser Span to miette SourceSpan
pub(crate) fn span_to_source_span(span: Span) -> SourceSpan {
    SourceSpan::new(span.start.into(), span.len())
}

/// Type alias for interpreter results
pub type Result<T> = std::result::Result<T, EvalError>;
