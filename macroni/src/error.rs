//! Errors raised by the command-line front end

use macroni_interpreter::EvalError;
use macroni_parser::ParseError;
use miette::Diagnostic;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Cannot read {}", path.display())]
    #[diagnostic(code(macroni::cli::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error("Import cycle: {chain}")]
    #[diagnostic(
        code(macroni::cli::import_cycle),
        help("A script may not import itself, directly or through other imports")
    )]
    ImportCycle { chain: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Evaluation(#[from] EvalError),

    #[error("Readline error: {0}")]
    #[diagnostic(code(macroni::cli::readline))]
    Readline(#[from] ReadlineError),

    #[error("Unknown REPL command `{command}`")]
    #[diagnostic(code(macroni::cli::command), help("Type :help for the list of commands"))]
    Command { command: String },
}

impl CliError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}
