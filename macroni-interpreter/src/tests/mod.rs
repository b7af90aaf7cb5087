//! Acceptance tests for the Macroni interpreter
//!
//! Each module drives the parser → interpreter pipeline through an
//! `InterpreterSession` backed by the headless desktop.

pub mod test_acceptance_expressions;
pub mod test_acceptance_statements;
