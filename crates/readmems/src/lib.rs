//! readmems - diagnostic command runner for MEMS 1.6 engine management
//!
//! Resolves one command, drives it against an ECU link and streams the
//! results to the console and an optional log file.
//!
//! # Modules
//!
//! - [`config`] - config file, CLI merge and the resolved [`config::RunConfig`]
//! - [`engine`] - per-command dispatch and telemetry loops
//! - [`policy`] - actuator pulse and IAC convergence loops
//! - [`shell`] - interactive raw command shell
//! - [`operator`] - threaded operator input for the shell
//! - [`logging`] - text renderings and the console/file sink
//! - [`session`] - connect, run, disconnect, exit status

pub mod config;
pub mod engine;
pub mod logging;
pub mod operator;
pub mod policy;
pub mod session;
pub mod shell;

pub use config::{Config, ConfigError, LoopSpec, OutputTarget, RunConfig};
pub use engine::{Engine, EngineSettings, Outcome};
pub use operator::OperatorInput;
pub use session::{ExitStatus, Session};
