//! Interpreter session for running Macroni code against a persistent root
//!
//! A session keeps one root context alive across evaluations, so variables
//! and functions defined by one `evaluate` call are visible to the next, the
//! way a REPL behaves. The host is a [`HeadlessHost`] and the random source
//! is seeded, which makes sessions reproducible in tests.

use crate::context::ExecutionContext;
use crate::debugger::{DebugConsole, Debugger};
use crate::error::EvalError;
use crate::headless::HeadlessHost;
use crate::interpreter::{Interpreter, InterpreterOptions};
use crate::value::Value;
use macroni_parser::{parse_program, ParseError};
use miette::Diagnostic;
use thiserror::Error;

/// Seed used unless the session is built with another
pub const SESSION_SEED: u64 = 0x6d61_6372;

#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Evaluation(#[from] EvalError),

    #[error("Assertion failed: expected {expected}, but got {actual}")]
    AssertionFailed { expected: String, actual: String },

    #[error("Type error: expected {expected_type}, got {actual_type}")]
    TypeError {
        expected_type: String,
        actual_type: String,
    },
}

pub struct InterpreterSession {
    interpreter: Interpreter<HeadlessHost>,
    root: ExecutionContext<'static>,
}

impl InterpreterSession {
    pub fn new() -> Self {
        Self::with_host(HeadlessHost::new())
    }

    pub fn with_host(host: HeadlessHost) -> Self {
        let options = InterpreterOptions {
            seed: Some(SESSION_SEED),
            ..InterpreterOptions::default()
        };
        Self {
            interpreter: Interpreter::new(host, options),
            root: ExecutionContext::root(false),
        }
    }

    /// Turn on debugging with `debugger`, reading commands from `console`
    pub fn with_debugger(mut self, debugger: Debugger, console: impl DebugConsole + 'static) -> Self {
        self.interpreter = self.interpreter.with_debugger(debugger, Box::new(console));
        self.root = self.root.with_debug(true);
        self
    }

    /// Parse and run `source` in the persistent root context
    pub fn evaluate(&mut self, source: &str) -> Result<Value, SessionError> {
        let program = parse_program(source)?;
        Ok(self.interpreter.run_program(&self.root, &program)?)
    }

    pub fn assert_evaluates_to_integer(&mut self, source: &str, expected: i64) -> Result<(), SessionError> {
        match self.evaluate(source)? {
            Value::Integer(value) if value == expected => Ok(()),
            Value::Integer(value) => Err(SessionError::AssertionFailed {
                expected: expected.to_string(),
                actual: value.to_string(),
            }),
            other => Err(SessionError::TypeError {
                expected_type: "int".to_string(),
                actual_type: other.type_name().to_string(),
            }),
        }
    }

    pub fn assert_evaluates_to_string(&mut self, source: &str, expected: &str) -> Result<(), SessionError> {
        match self.evaluate(source)? {
            Value::String(value) if value == expected => Ok(()),
            Value::String(value) => Err(SessionError::AssertionFailed {
                expected: format!("{expected:?}"),
                actual: format!("{value:?}"),
            }),
            other => Err(SessionError::TypeError {
                expected_type: "string".to_string(),
                actual_type: other.type_name().to_string(),
            }),
        }
    }

    pub fn assert_evaluates_to_null(&mut self, source: &str) -> Result<(), SessionError> {
        match self.evaluate(source)? {
            Value::Null => Ok(()),
            other => Err(SessionError::AssertionFailed {
                expected: "null".to_string(),
                actual: other.repr(),
            }),
        }
    }

    /// Compare with language equality, so `1` matches `1.0`
    pub fn assert_evaluates_to_value(&mut self, source: &str, expected: Value) -> Result<(), SessionError> {
        let actual = self.evaluate(source)?;
        if actual.equals(&expected)? {
            Ok(())
        } else {
            Err(SessionError::AssertionFailed {
                expected: expected.repr(),
                actual: actual.repr(),
            })
        }
    }

    pub fn variable(&self, name: &str) -> Result<Value, SessionError> {
        Ok(self.root.lookup(name)?)
    }

    pub fn define_variable(&mut self, name: &str, value: Value) {
        self.root.assign(name, value);
    }

    pub fn context(&self) -> &ExecutionContext<'static> {
        &self.root
    }

    pub fn host(&self) -> &HeadlessHost {
        self.interpreter.host()
    }

    pub fn host_mut(&mut self) -> &mut HeadlessHost {
        self.interpreter.host_mut()
    }

    pub fn interpreter(&self) -> &Interpreter<HeadlessHost> {
        &self.interpreter
    }
}

impl Default for InterpreterSession {
    fn default() -> Self {
        Self::new()
    }
}
