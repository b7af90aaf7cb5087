//! Cooperative step debugger.
//!
//! The evaluator calls [`Debugger::check`] before every statement in a
//! block. When it returns a [`PauseReason`] the evaluator opens a command
//! loop on a [`DebugConsole`] and feeds the chosen [`Resume`] back in.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Run,
    Step,
    Next,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    Breakpoint,
    Step,
    Next,
    Out,
}

impl fmt::Display for PauseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PauseReason::Breakpoint => "breakpoint",
            PauseReason::Step => "step",
            PauseReason::Next => "next",
            PauseReason::Out => "out",
        };
        f.write_str(name)
    }
}

/// How execution continues after a pause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    Continue,
    Step,
    Next,
    Out,
}

#[derive(Debug, Default)]
pub struct Debugger {
    mode: Mode,
    breakpoints: BTreeSet<usize>,
    last_line: Option<usize>,
    target_depth: usize,
}

impl Debugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start in step mode so the first statement pauses
    pub fn stepping() -> Self {
        Self {
            mode: Mode::Step,
            ..Self::default()
        }
    }

    pub fn with_breakpoints(mut self, lines: impl IntoIterator<Item = usize>) -> Self {
        self.breakpoints.extend(lines);
        self
    }

    pub fn add_breakpoint(&mut self, line: usize) {
        self.breakpoints.insert(line);
    }

    pub fn remove_breakpoint(&mut self, line: usize) -> bool {
        self.breakpoints.remove(&line)
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = usize> + '_ {
        self.breakpoints.iter().copied()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Decide whether the statement at `line`, running at call `depth`,
    /// should pause. Breakpoints pause in any mode and leave it unchanged;
    /// every other pause drops back to `Run`.
    pub fn check(&mut self, line: usize, depth: usize) -> Option<PauseReason> {
        let line_changed = self.last_line != Some(line);

        let reason = if self.breakpoints.contains(&line) {
            Some(PauseReason::Breakpoint)
        } else {
            match self.mode {
                Mode::Step if line_changed => Some(PauseReason::Step),
                Mode::Next if depth <= self.target_depth && line_changed => Some(PauseReason::Next),
                Mode::Out if depth < self.target_depth => Some(PauseReason::Out),
                _ => None,
            }
        };

        if matches!(
            reason,
            Some(PauseReason::Step | PauseReason::Next | PauseReason::Out)
        ) {
            self.mode = Mode::Run;
        }
        self.last_line = Some(line);
        reason
    }

    /// Apply the command that ended a pause taken at call `depth`
    pub fn resume(&mut self, how: Resume, depth: usize) {
        self.mode = match how {
            Resume::Continue => Mode::Run,
            Resume::Step => Mode::Step,
            Resume::Next => Mode::Next,
            Resume::Out => Mode::Out,
        };
        if matches!(how, Resume::Next | Resume::Out) {
            self.target_depth = depth;
        }
    }
}

/// Where the paused debugger reads commands and writes output
pub trait DebugConsole {
    /// Next command line, or `None` at end of input
    fn read_command(&mut self, prompt: &str) -> Option<String>;

    fn write_line(&mut self, line: &str);
}

/// Console on the process's stdin and stdout
#[derive(Debug, Default)]
pub struct StdinConsole;

impl DebugConsole for StdinConsole {
    fn read_command(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        io::stdout().flush().ok()?;

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }

    fn write_line(&mut self, line: &str) {
        println!("{line}");
    }
}

/// Console fed from a fixed command list, recording everything written
#[derive(Debug, Clone, Default)]
pub struct ScriptedConsole {
    commands: Rc<RefCell<Vec<String>>>,
    transcript: Rc<RefCell<Vec<String>>>,
}

impl ScriptedConsole {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut commands: Vec<String> = commands.into_iter().map(Into::into).collect();
        commands.reverse();
        Self {
            commands: Rc::new(RefCell::new(commands)),
            transcript: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Lines written so far; clones share the same transcript
    pub fn transcript(&self) -> Vec<String> {
        self.transcript.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.commands.borrow().len()
    }
}

impl DebugConsole for ScriptedConsole {
    fn read_command(&mut self, prompt: &str) -> Option<String> {
        let command = self.commands.borrow_mut().pop()?;
        self.transcript
            .borrow_mut()
            .push(format!("{prompt}{command}"));
        Some(command)
    }

    fn write_line(&mut self, line: &str) {
        self.transcript.borrow_mut().push(line.to_string());
    }
}
