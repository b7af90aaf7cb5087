//! Evaluation results and non-local control flow.
//!
//! `return`, `break` and `continue` travel up the evaluator as ordinary
//! return values. Blocks stop at the first signal and hand it upward; loops
//! consume `break`/`continue`; function calls consume `return`.

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Return,
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlSignal {
    pub kind: SignalKind,
    pub values: Vec<Value>,
}

impl ControlSignal {
    pub fn new(kind: SignalKind, values: Vec<Value>) -> Self {
        Self { kind, values }
    }

    /// The value a consumed `return` produces: nothing is null, one value is
    /// itself, several become a tuple
    pub fn into_payload(self) -> Value {
        let mut values = self.values;
        match values.len() {
            0 => Value::Null,
            1 => values.remove(0),
            _ => Value::Tuple(values),
        }
    }
}

/// Result of evaluating any node
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Value(Value),
    Signal(ControlSignal),
}

impl Outcome {
    pub fn null() -> Self {
        Outcome::Value(Value::Null)
    }

    pub fn is_signal(&self) -> bool {
        matches!(self, Outcome::Signal(_))
    }

    /// Collapse to a value at a top-level boundary: a `return` yields its
    /// payload, a stray `break`/`continue` yields null
    pub fn into_value(self) -> Value {
        match self {
            Outcome::Value(value) => value,
            Outcome::Signal(signal) if signal.kind == SignalKind::Return => signal.into_payload(),
            Outcome::Signal(_) => Value::Null,
        }
    }
}

/// Unwrap a value from an `Outcome`, returning any control signal from the
/// enclosing function unchanged
macro_rules! value_of {
    ($outcome:expr) => {
        match $outcome {
            $crate::control::Outcome::Value(value) => value,
            signal @ $crate::control::Outcome::Signal(_) => return Ok(signal),
        }
    };
}

/// Evaluate each expression in a sibling context, stopping at the first signal
macro_rules! values_of {
    ($interpreter:expr, $ctx:expr, $exprs:expr) => {{
        let exprs = $exprs;
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs.iter() {
            values.push($crate::control::value_of!(
                $interpreter.eval_sibling($ctx, $crate::context::Node::Expression(expr))?
            ));
        }
        values
    }};
}

pub(crate) use value_of;
pub(crate) use values_of;
