//! readmems - diagnostic utility for MEMS 1.6 engine management
//!
//! Usage:
//!   readmems [OPTIONS] <serial device> <command> [read-loop-count]
//!
//! Port, command, output and loop count may also come from a TOML config
//! file; command-line values win.

mod cli;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use mems_link::SerialConnector;
use readmems::{Config, Engine, EngineSettings, ExitStatus, OperatorInput, Session};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::Cli;
use crate::output::OutputContext;

fn main() {
    let cli = Cli::parse();

    // Set up logging; diagnostics go to stderr, results to stdout
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let ctx = OutputContext::new(cli.no_color, cli.quiet);

    let status = match run(&cli, &ctx) {
        Ok(status) => status,
        Err(e) => {
            ctx.error(&format!("Error: {:#}", e));
            ExitStatus::CommandFailed
        }
    };

    std::process::exit(status.code());
}

fn run(cli: &Cli, ctx: &OutputContext) -> Result<ExitStatus> {
    if cli.list {
        ctx.usage();
        return Ok(ExitStatus::Success);
    }

    ctx.info(&format!("readmems v{}", env!("CARGO_PKG_VERSION")));

    // Load config file
    let config = match &cli.config {
        Some(path) => match Config::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                ctx.error(&e.to_string());
                return Ok(ExitStatus::UsageError);
            }
        },
        None => Config::load().unwrap_or_else(|e| {
            ctx.warn(&format!("Ignoring config file: {}", e));
            Config::default()
        }),
    };

    // Merge CLI args with config
    let run_config = match config.merge_with_args(&cli.overrides()) {
        Ok(run_config) => run_config,
        Err(e) => {
            ctx.error(&e.to_string());
            ctx.usage();
            return Ok(ExitStatus::UsageError);
        }
    };
    tracing::debug!(?run_config, "Resolved configuration");

    // One thread: every ECU transaction completes before the next is issued
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let engine = Engine::new(
        EngineSettings {
            dwell: run_config.dwell,
        },
        OperatorInput::stdin(),
    );
    let mut session = Session::new(SerialConnector::default(), engine).quiet(cli.quiet);

    Ok(runtime.block_on(session.run(&run_config, std::io::stdout())))
}
