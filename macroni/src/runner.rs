//! Running a script file with its imports.

use crate::console::ConsoleHost;
use crate::loader::{load_with_imports, LoadedScript};
use macroni_interpreter::{
    Debugger, ExecutionContext, Host, Interpreter, InterpreterOptions, StdinConsole, Value,
};
use miette::{NamedSource, Report};
use std::path::PathBuf;

/// Settings for one script run, built from the command line
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub file: PathBuf,
    pub debug: bool,
    /// Lines to pause at; with debugging on and none given, stepping
    /// starts at the first statement
    pub breakpoints: Vec<usize>,
    pub template_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub seed: Option<u64>,
}

impl RunConfig {
    pub fn interpreter_options(&self) -> InterpreterOptions {
        InterpreterOptions {
            template_dir: self.template_dir.clone(),
            seed: self.seed,
        }
    }

    pub fn debugger(&self) -> Debugger {
        if self.breakpoints.is_empty() {
            Debugger::stepping()
        } else {
            Debugger::new().with_breakpoints(self.breakpoints.iter().copied())
        }
    }
}

/// Load the script and its imports, then run them against the console host
pub fn run_script(config: &RunConfig) -> Result<Value, Report> {
    let scripts = load_with_imports(&config.file)?;

    let host = ConsoleHost::open(&config.cache_dir);
    let mut interpreter = Interpreter::new(host, config.interpreter_options());
    if config.debug {
        interpreter = interpreter.with_debugger(config.debugger(), Box::new(StdinConsole));
    }

    run_loaded(&mut interpreter, &scripts, config.debug)
}

/// Run already loaded scripts in order, sharing one root context
pub fn run_loaded<H: Host>(
    interpreter: &mut Interpreter<H>,
    scripts: &[LoadedScript],
    debug: bool,
) -> Result<Value, Report> {
    let root = ExecutionContext::root(debug);
    let mut last = Value::Null;

    for script in scripts {
        tracing::info!(script = %script.name(), "running script");
        last = interpreter
            .run_program(&root, &script.program)
            .map_err(|error| {
                Report::new(error)
                    .with_source_code(NamedSource::new(script.name(), script.source.clone()))
            })?;
    }

    tracing::debug!(result = %last, "script finished");
    Ok(last)
}
