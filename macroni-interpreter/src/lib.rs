//! Macroni interpreter
//!
//! A tree-walking interpreter for the Macroni automation language. Programs
//! come from `macroni-parser`; evaluation threads an [`ExecutionContext`]
//! through every node, pausing in the step [`Debugger`] before each
//! statement when debugging is on. Built-ins reach the desktop only through
//! the [`Host`] trait.

#![allow(clippy::result_large_err)]

pub mod builtins;
pub mod context;
pub mod control;
pub mod debugger;
pub mod error;
pub mod evaluator;
pub mod headless;
pub mod host;
pub mod interpreter;
pub mod recording;
pub mod session;
pub mod value;

#[cfg(test)]
#[path = "tests/mod.rs"]
mod tests;

pub use context::{ExecutionContext, Node};
pub use control::{ControlSignal, Outcome, SignalKind};
pub use debugger::{DebugConsole, Debugger, PauseReason, Resume, ScriptedConsole, StdinConsole};
pub use error::{EvalError, HostError, HostResult, Result};
pub use evaluator::MAX_CALL_DEPTH;
pub use headless::{Action, HeadlessHost};
pub use host::{Bounds, Host, MAX_PIXEL_RADIUS, OcrMatch, OcrQuery, Point, Region, Rgb, TemplateQuery};
pub use interpreter::{Interpreter, InterpreterOptions, DEFAULT_TEMPLATE_DIR};
pub use recording::{EventKind, InputListener, RecordedEvent, Recorder, StopFlag};
pub use session::{InterpreterSession, SessionError};
pub use value::Value;
