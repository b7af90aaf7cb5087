//! The interpreter: owns the host, the debugger and the random source.
//!
//! Node evaluation lives in `evaluator.rs` and built-in dispatch in
//! `builtins.rs`; both are further `impl` blocks on [`Interpreter`].

use crate::context::{ExecutionContext, Node};
use crate::debugger::{DebugConsole, Debugger, Resume, StdinConsole};
use crate::error::Result;
use crate::host::Host;
use crate::value::Value;
use macroni_parser::Program;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};

pub const DEFAULT_TEMPLATE_DIR: &str = "./templates";

const DEBUG_PROMPT: &str = "(dbg) ";

const DEBUG_HELP: &[&str] = &[
    "c          continue",
    "s          step to the next line",
    "n          step over calls",
    "o          step out of the current call",
    "mem        show variables and functions",
    "eval EXPR  evaluate an expression here",
    "h, help    show this list",
];

/// Construction-time settings
#[derive(Debug, Clone)]
pub struct InterpreterOptions {
    pub template_dir: PathBuf,
    /// Fixed seed for `@rand`, `@rand_i`, `@wait` jitter and `@shuffle`
    pub seed: Option<u64>,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from(DEFAULT_TEMPLATE_DIR),
            seed: None,
        }
    }
}

pub struct Interpreter<H: Host> {
    pub(crate) host: H,
    pub(crate) debugger: Debugger,
    pub(crate) console: Box<dyn DebugConsole>,
    pub(crate) template_dir: PathBuf,
    pub(crate) rng: StdRng,
}

impl<H: Host> Interpreter<H> {
    pub fn new(host: H, options: InterpreterOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            host,
            debugger: Debugger::new(),
            console: Box::new(StdinConsole),
            template_dir: options.template_dir,
            rng,
        }
    }

    /// Replace the debugger and the console it talks to
    pub fn with_debugger(mut self, debugger: Debugger, console: Box<dyn DebugConsole>) -> Self {
        self.debugger = debugger;
        self.console = console;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn debugger(&self) -> &Debugger {
        &self.debugger
    }

    pub fn debugger_mut(&mut self) -> &mut Debugger {
        &mut self.debugger
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Evaluate a whole program in `ctx`'s frame and collapse the outcome:
    /// a top-level `return` yields its payload
    pub fn run_program(&mut self, ctx: &ExecutionContext<'_>, program: &Program) -> Result<Value> {
        let program_ctx = ctx.sibling(Node::Program(program));
        Ok(self.eval(&program_ctx)?.into_value())
    }

    /// Debugger hook run before every statement
    pub(crate) fn maybe_pause(&mut self, ctx: &ExecutionContext<'_>) {
        if !ctx.debug() {
            return;
        }
        let Some(line) = ctx.line() else {
            return;
        };
        let Some(reason) = self.debugger.check(line, ctx.depth()) else {
            return;
        };

        tracing::debug!(line, depth = ctx.depth(), %reason, "debugger paused");
        self.console
            .write_line(&format!("Paused ({reason}) at line {line}"));

        let resume = self.command_loop(ctx);
        self.debugger.resume(resume, ctx.depth());
    }

    fn command_loop(&mut self, ctx: &ExecutionContext<'_>) -> Resume {
        loop {
            let Some(input) = self.console.read_command(DEBUG_PROMPT) else {
                return Resume::Continue;
            };

            match input.trim() {
                "c" => return Resume::Continue,
                "s" => return Resume::Step,
                "n" => return Resume::Next,
                "o" => return Resume::Out,
                "mem" => self.dump_memory(ctx),
                "h" | "help" => {
                    for line in DEBUG_HELP {
                        self.console.write_line(line);
                    }
                }
                command => match command.strip_prefix("eval ") {
                    Some(source) => self.debug_eval(ctx, source),
                    None => self
                        .console
                        .write_line(&format!("Unknown command '{command}', type h for help")),
                },
            }
        }
    }

    fn dump_memory(&mut self, ctx: &ExecutionContext<'_>) {
        self.console.write_line("Variables:");
        for (name, value) in ctx.variables() {
            self.console
                .write_line(&format!("  {name} = {}", value.repr()));
        }
        self.console.write_line("Functions:");
        for signature in ctx.function_signatures() {
            self.console.write_line(&format!("  {signature}"));
        }
    }

    /// `eval EXPR`: errors are reported and the session carries on
    fn debug_eval(&mut self, ctx: &ExecutionContext<'_>, source: &str) {
        let expression = match macroni_parser::parse_expression(source.trim()) {
            Ok(expression) => expression,
            Err(error) => {
                self.console.write_line(&format!("Parse error: {error}"));
                return;
            }
        };

        let eval_ctx = ctx
            .sibling(Node::Expression(&expression))
            .with_debug(false);
        match self.eval(&eval_ctx) {
            Ok(outcome) => self.console.write_line(&outcome.into_value().repr()),
            Err(error) => self.console.write_line(&format!("Error: {error}")),
        }
    }
}
