//! postfix-chain - CLI

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use postfix_chain::chain::process::run_worker;
use postfix_chain::util::config::{ChainConfig, TransportKind, DEFAULT_CAPACITY};
use postfix_chain::util::logger::{self, LogLevel};
use postfix_chain::{run, ChainError, NAME, VERSION};

/// Convert an infix expression to postfix, one worker per reduction step
#[derive(Parser, Debug)]
#[command(name = NAME)]
#[command(version = VERSION)]
#[command(disable_help_subcommand = true)]
struct Args {
    /// Infix expression with space-separated tokens, e.g. "( a + b ) * c"
    #[arg(value_name = "EXPRESSION", allow_hyphen_values = true)]
    expression: Option<String>,

    /// RON config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Channel capacity in bytes
    #[arg(long)]
    capacity: Option<usize>,

    /// How generations are spawned
    #[arg(long, value_enum)]
    transport: Option<TransportKind>,

    /// Log level on stderr
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Enable verbose output (same as `--log-level debug`)
    #[arg(short, long)]
    verbose: bool,

    /// Run one generation of a process chain (stdin: state, stdout: result)
    #[arg(
        long,
        value_name = "N",
        hide = true,
        conflicts_with_all = ["expression", "config", "transport"]
    )]
    worker_generation: Option<usize>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let outcome = match args.worker_generation {
        Some(generation) => {
            let capacity = args.capacity.unwrap_or(DEFAULT_CAPACITY);
            let log_level = args.log_level.unwrap_or_default();
            logger::init_with_level(log_level);
            run_worker(generation, capacity, log_level)
                .with_context(|| format!("generation {}", generation))
        }
        None => convert(args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let reported = err
                .downcast_ref::<ChainError>()
                .is_some_and(ChainError::is_reported);
            if !reported {
                eprintln!("error : {:#}", err);
            }
            ExitCode::FAILURE
        }
    }
}

fn convert(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ChainConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => ChainConfig::default(),
    };
    if let Some(capacity) = args.capacity {
        config.capacity = capacity;
    }
    if let Some(transport) = args.transport {
        config.transport = transport;
    }
    if let Some(log_level) = args.log_level {
        config.log_level = log_level;
    }
    if args.verbose {
        config.log_level = LogLevel::Debug;
    }
    config.validate()?;
    logger::init_with_level(config.log_level);

    let expression = args.expression.unwrap_or_default();
    if let Some(postfix) = run(&expression, &config)? {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", postfix).context("Failed to write result")?;
    }
    Ok(())
}
