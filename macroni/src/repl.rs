//! Interactive REPL for Macroni
//!
//! Input accumulates over continuation lines until it looks complete, then
//! runs in one root context that lives for the whole session, so variables
//! and functions carry over between inputs. Errors are reported and the
//! loop carries on.

use crate::error::CliError;
use macroni_interpreter::{ExecutionContext, Host, Interpreter, Value};
use macroni_parser::parse_program;
use rustyline::{error::ReadlineError, DefaultEditor};

/// REPL configuration options
#[derive(Debug, Clone)]
pub struct ReplConfig {
    pub prompt: String,
    pub continuation_prompt: String,
    pub persist_history: bool,
    pub history_file: Option<String>,
    /// Pause at breakpoints and honour the step debugger
    pub debug: bool,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: ">>> ".to_string(),
            continuation_prompt: "... ".to_string(),
            persist_history: true,
            history_file: Some(".macroni_history".to_string()),
            debug: false,
        }
    }
}

/// Result of evaluating one complete input
#[derive(Debug)]
pub enum ReplResult {
    Value(Value),
    Command { message: String },
    Empty,
    Exit,
}

pub struct ReplSession<H: Host> {
    interpreter: Interpreter<H>,
    root: ExecutionContext<'static>,
    config: ReplConfig,
}

impl<H: Host> ReplSession<H> {
    pub fn new(interpreter: Interpreter<H>, config: ReplConfig) -> Self {
        let root = ExecutionContext::root(config.debug);
        Self {
            interpreter,
            root,
            config,
        }
    }

    /// Start the REPL main loop
    pub fn run(&mut self) -> Result<(), CliError> {
        let mut editor = DefaultEditor::new()?;
        if self.config.persist_history {
            if let Some(history_file) = &self.config.history_file {
                // a first session has no history yet
                let _ = editor.load_history(history_file);
            }
        }

        println!("Macroni REPL v{}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for commands, :quit or Ctrl-D to exit");
        println!();

        while let Some(input) = self.read_input(&mut editor)? {
            match self.evaluate_line(&input) {
                Ok(ReplResult::Exit) => break,
                Ok(ReplResult::Value(value)) => println!("{value}"),
                Ok(ReplResult::Command { message }) => println!("{message}"),
                Ok(ReplResult::Empty) => {}
                Err(error) => display_error(error, &input),
            }
        }

        if self.config.persist_history {
            if let Some(history_file) = &self.config.history_file {
                editor.save_history(history_file)?;
            }
        }
        Ok(())
    }

    /// Read one complete input, or `None` at end of input
    fn read_input(&self, editor: &mut DefaultEditor) -> Result<Option<String>, CliError> {
        let mut buffer = String::new();

        loop {
            let prompt = if buffer.is_empty() {
                &self.config.prompt
            } else {
                &self.config.continuation_prompt
            };

            match editor.readline(prompt) {
                Ok(line) => {
                    if buffer.is_empty() && line.trim().is_empty() {
                        return Ok(Some(String::new()));
                    }
                    let blank = line.trim().is_empty();
                    if !buffer.is_empty() {
                        buffer.push('\n');
                    }
                    buffer.push_str(&line);

                    if blank || is_input_complete(&buffer) {
                        editor.add_history_entry(buffer.as_str())?;
                        return Ok(Some(buffer));
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    return Ok(Some(String::new()));
                }
                Err(ReadlineError::Eof) => return Ok(None),
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Evaluate one complete input in the session's root context
    pub fn evaluate_line(&mut self, input: &str) -> Result<ReplResult, CliError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(ReplResult::Empty);
        }
        if let Some(command) = trimmed.strip_prefix(':') {
            return self.execute_command(command);
        }

        let program = parse_program(input)?;
        let value = self.interpreter.run_program(&self.root, &program)?;
        Ok(match value {
            Value::Null => ReplResult::Empty,
            value => ReplResult::Value(value),
        })
    }

    fn execute_command(&mut self, command: &str) -> Result<ReplResult, CliError> {
        match command.trim() {
            "help" | "h" => Ok(ReplResult::Command {
                message: HELP.to_string(),
            }),
            "vars" => {
                let variables = self.root.variables();
                if variables.is_empty() {
                    return Ok(ReplResult::Command {
                        message: "No variables defined".to_string(),
                    });
                }
                let lines: Vec<String> = variables
                    .iter()
                    .map(|(name, value)| format!("  {name} = {}", value.repr()))
                    .collect();
                Ok(ReplResult::Command {
                    message: format!("Variables:\n{}", lines.join("\n")),
                })
            }
            "funcs" => {
                let signatures = self.root.function_signatures();
                if signatures.is_empty() {
                    return Ok(ReplResult::Command {
                        message: "No functions defined".to_string(),
                    });
                }
                Ok(ReplResult::Command {
                    message: format!("Functions:\n  {}", signatures.join("\n  ")),
                })
            }
            "quit" | "q" | "exit" => Ok(ReplResult::Exit),
            other => Err(CliError::Command {
                command: format!(":{other}"),
            }),
        }
    }
}

const HELP: &str = r#"Macroni REPL commands:
  :help, :h         Show this help message
  :vars             List variables with their values
  :funcs            List defined functions
  :quit, :q, :exit  Exit the REPL

Input runs once brackets are balanced and the line ends a statement
(`;`) or closes a block. A blank line runs whatever has been typed.

Use Ctrl-C to discard the current input, Ctrl-D to exit."#;

/// Balanced brackets outside strings and comments, ending with `;` or a
/// closing bracket
pub fn is_input_complete(input: &str) -> bool {
    if input.trim_start().starts_with(':') {
        return true;
    }

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut in_comment = false;
    let mut last = None;

    for ch in input.chars() {
        if in_comment {
            in_comment = ch != '\n';
            continue;
        }
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            last = Some(ch);
            continue;
        }

        match ch {
            '#' => {
                in_comment = true;
                continue;
            }
            '"' => in_string = true,
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => depth -= 1,
            _ => {}
        }
        if !ch.is_whitespace() {
            last = Some(ch);
        }
    }

    !in_string && depth <= 0 && matches!(last, Some(';' | '}' | ']' | ')'))
}

fn display_error(error: CliError, input: &str) {
    match error {
        CliError::Evaluation(error) => {
            let source = miette::NamedSource::new("<repl>", input.to_string());
            eprintln!("{:?}", miette::Report::new(error).with_source_code(source));
        }
        error => eprintln!("{:?}", miette::Report::new(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroni_interpreter::{HeadlessHost, InterpreterOptions};
    use pretty_assertions::assert_eq;

    fn create_test_repl() -> ReplSession<HeadlessHost> {
        let options = InterpreterOptions {
            seed: Some(7),
            ..InterpreterOptions::default()
        };
        let config = ReplConfig {
            persist_history: false,
            history_file: None,
            ..ReplConfig::default()
        };
        ReplSession::new(Interpreter::new(HeadlessHost::new(), options), config)
    }

    fn command_message(result: ReplResult) -> String {
        match result {
            ReplResult::Command { message } => message,
            other => panic!("Expected command result, got {other:?}"),
        }
    }

    #[test]
    fn test_values_and_state_persist() {
        let mut repl = create_test_repl();

        assert!(matches!(repl.evaluate_line("x = 5;").unwrap(), ReplResult::Empty));
        match repl.evaluate_line("x + 1;").unwrap() {
            ReplResult::Value(value) => assert_eq!(value, Value::Integer(6)),
            other => panic!("Expected value, got {other:?}"),
        }

        repl.evaluate_line("fn twice(n) {\n  return n * 2;\n}").unwrap();
        match repl.evaluate_line("twice(x);").unwrap() {
            ReplResult::Value(value) => assert_eq!(value, Value::Integer(10)),
            other => panic!("Expected value, got {other:?}"),
        }
    }

    #[test]
    fn test_errors_leave_session_usable() {
        let mut repl = create_test_repl();
        repl.evaluate_line("x = 1;").unwrap();

        assert!(matches!(repl.evaluate_line("x = ;"), Err(CliError::Parse(_))));
        assert!(matches!(
            repl.evaluate_line("missing;"),
            Err(CliError::Evaluation(_))
        ));
        assert!(matches!(repl.evaluate_line("x;").unwrap(), ReplResult::Value(Value::Integer(1))));
    }

    #[test]
    fn test_empty_input() {
        let mut repl = create_test_repl();
        assert!(matches!(repl.evaluate_line("").unwrap(), ReplResult::Empty));
        assert!(matches!(repl.evaluate_line("   ").unwrap(), ReplResult::Empty));
        assert!(matches!(
            repl.evaluate_line("# note").unwrap(),
            ReplResult::Value(Value::Integer(0))
        ));
    }

    #[test]
    fn test_help_command() {
        let mut repl = create_test_repl();
        let message = command_message(repl.evaluate_line(":help").unwrap());
        assert!(message.contains(":vars"));
        assert!(message.contains(":funcs"));
        assert!(message.contains(":quit"));
    }

    #[test]
    fn test_vars_and_funcs_commands() {
        let mut repl = create_test_repl();
        assert_eq!(
            command_message(repl.evaluate_line(":vars").unwrap()),
            "No variables defined"
        );

        repl.evaluate_line("name = \"bob\"; n = 2; fn f(a, b) { return a; }").unwrap();
        assert_eq!(
            command_message(repl.evaluate_line(":vars").unwrap()),
            "Variables:\n  n = 2\n  name = \"bob\""
        );
        assert_eq!(
            command_message(repl.evaluate_line(":funcs").unwrap()),
            "Functions:\n  f(a, b)"
        );
    }

    #[test]
    fn test_quit_and_unknown_commands() {
        let mut repl = create_test_repl();
        for quit in [":quit", ":q", ":exit"] {
            assert!(matches!(repl.evaluate_line(quit).unwrap(), ReplResult::Exit));
        }

        let error = repl.evaluate_line(":bogus").unwrap_err();
        let CliError::Command { command } = error else {
            panic!("Expected command error");
        };
        assert_eq!(command, ":bogus");
    }

    #[test]
    fn test_function_definition_reports_signature() {
        let mut repl = create_test_repl();
        match repl.evaluate_line("fn add(a, b) { return a + b; }").unwrap() {
            ReplResult::Value(value) => assert_eq!(value.to_string(), "Defined add(a, b)"),
            other => panic!("Expected value, got {other:?}"),
        }
    }

    #[test]
    fn test_builtins_reach_the_host() {
        let mut repl = create_test_repl();
        repl.evaluate_line("@print(\"hello\", 1);").unwrap();
        assert_eq!(repl.interpreter.host().output(), ["hello 1"]);
    }

    #[test]
    fn test_multi_line_input_detection() {
        assert!(is_input_complete("x = 1;"));
        assert!(is_input_complete("while i < 3 {\n  i = i + 1;\n}"));
        assert!(is_input_complete("@print(1)"));
        assert!(is_input_complete(":vars"));
        assert!(is_input_complete("x = \"a;\";"));
        assert!(is_input_complete("x = 1; # done"));

        assert!(!is_input_complete("x = 1"));
        assert!(!is_input_complete("fn f() {"));
        assert!(!is_input_complete("fn f() {\n  return 1;"));
        assert!(!is_input_complete("x = [1,"));
        assert!(!is_input_complete("x = \"open;"));
        assert!(!is_input_complete("x = \"}\""));
        assert!(!is_input_complete("x = 1 # not closed;"));
    }

    #[test]
    fn test_repl_config_defaults() {
        let config = ReplConfig::default();
        assert_eq!(config.prompt, ">>> ");
        assert_eq!(config.continuation_prompt, "... ");
        assert!(config.persist_history);
        assert_eq!(config.history_file, Some(".macroni_history".to_string()));
        assert!(!config.debug);
    }
}
