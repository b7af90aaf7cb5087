use clap::Parser;
use macroni_interpreter::{
    DEFAULT_TEMPLATE_DIR, Debugger, Interpreter, InterpreterOptions, StdinConsole,
};
use miette::MietteHandlerOpts;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

mod cache;
mod console;
mod error;
mod loader;
mod repl;
mod runner;

use console::ConsoleHost;
use repl::{ReplConfig, ReplSession};
use runner::{run_script, RunConfig};

#[derive(Parser)]
#[command(
    name = "macroni",
    version,
    about = "Run macroni automation scripts",
    long_about = "Runs a macroni script, or starts an interactive REPL when no file is given.",
    before_help = format!("macroni v{}\n", env!("CARGO_PKG_VERSION"))
)]
struct Cli {
    /// Script to run; omit it to start the REPL
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Enable the step debugger
    #[arg(short, long)]
    debug: bool,

    /// Pause at this line when debugging (repeatable)
    #[arg(short, long = "breakpoint", value_name = "LINE")]
    breakpoints: Vec<usize>,

    /// Directory `@find_template` looks in
    #[arg(long, value_name = "DIR", default_value = DEFAULT_TEMPLATE_DIR)]
    template_dir: PathBuf,

    /// Directory holding the coordinate, colour, region and recording caches
    #[arg(long, value_name = "DIR", default_value = ".")]
    cache_dir: PathBuf,

    /// Seed for `@rand`, `@rand_i`, `@shuffle` and `@wait` jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    setup_miette_handler();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(file) = cli.file.clone() else {
        run_repl(&cli);
        return;
    };

    let config = RunConfig {
        file,
        debug: cli.debug,
        breakpoints: cli.breakpoints,
        template_dir: cli.template_dir,
        cache_dir: cli.cache_dir,
        seed: cli.seed,
    };

    if let Err(report) = run_script(&config) {
        eprintln!("{report:?}");
        process::exit(1);
    }
}

fn run_repl(cli: &Cli) {
    let options = InterpreterOptions {
        template_dir: cli.template_dir.clone(),
        seed: cli.seed,
    };
    let mut interpreter = Interpreter::new(ConsoleHost::open(&cli.cache_dir), options);
    if cli.debug {
        let debugger = Debugger::new().with_breakpoints(cli.breakpoints.iter().copied());
        interpreter = interpreter.with_debugger(debugger, Box::new(StdinConsole));
    }

    let config = ReplConfig {
        debug: cli.debug,
        ..ReplConfig::default()
    };
    let mut session = ReplSession::new(interpreter, config);
    if let Err(error) = session.run() {
        eprintln!("{:?}", miette::Report::new(error));
        process::exit(1);
    }
    println!("Goodbye!");
}

/// Configure miette's graphical report handler
fn setup_miette_handler() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .tab_width(4)
                .with_cause_chain()
                .build(),
        )
    }))
    .ok();
}

/// `RUST_LOG` wins; otherwise each `-v` raises the level from `warn`
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["macroni"]).unwrap();
        assert!(cli.file.is_none());
        assert!(!cli.debug);
        assert!(cli.breakpoints.is_empty());
        assert_eq!(cli.template_dir, PathBuf::from(DEFAULT_TEMPLATE_DIR));
        assert_eq!(cli.cache_dir, PathBuf::from("."));
        assert_eq!(cli.seed, None);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_script_flags() {
        let cli = Cli::try_parse_from([
            "macroni", "-f", "farm.macroni", "-d", "-b", "3", "--breakpoint", "10", "--seed", "42",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("farm.macroni")));
        assert!(cli.debug);
        assert_eq!(cli.breakpoints, vec![3, 10]);
        assert_eq!(cli.seed, Some(42));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_rejects_bad_breakpoint() {
        assert!(Cli::try_parse_from(["macroni", "-b", "three"]).is_err());
    }
}
