//! End-to-end run of one command
//!
//! A session opens the log sink, connects and initialises the ECU link, runs
//! the command and disconnects. The log file is kept only once the port has
//! opened; every earlier exit drops the sink and with it the file.

use std::future::Future;
use std::io::Write;

use chrono::Local;
use mems_core::{Command, CommandClass, EcuConnector, EcuLink};
use tokio::io::AsyncBufRead;

use crate::config::{OutputTarget, RunConfig};
use crate::engine::Engine;
use crate::logging::{LogFile, LogSink};

/// Process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The command ran and succeeded
    Success,
    /// The command ran, or tried to, and failed
    CommandFailed,
    /// Bad arguments or configuration
    UsageError,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::CommandFailed => -2,
            ExitStatus::UsageError => -1,
        }
    }
}

/// Resolves once the operator presses Ctrl-C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

pub struct Session<C, R> {
    connector: C,
    engine: Engine<R>,
    quiet: bool,
}

impl<C, R> Session<C, R>
where
    C: EcuConnector,
    R: AsyncBufRead + Unpin,
{
    pub fn new(connector: C, engine: Engine<R>) -> Self {
        Self {
            connector,
            engine,
            quiet: false,
        }
    }

    /// Suppress progress lines; errors and command output still print
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Run until the command finishes or Ctrl-C is pressed
    pub async fn run<W: Write>(&mut self, config: &RunConfig, console: W) -> ExitStatus {
        self.run_until(config, console, shutdown_signal()).await
    }

    /// Run until the command finishes or `interrupt` resolves
    ///
    /// An interrupted run succeeds if it emitted at least one result. A relay
    /// pulse is never cut short: once interrupted it still switches the relay
    /// off and reports that result.
    pub async fn run_until<W, F>(
        &mut self,
        config: &RunConfig,
        console: W,
        interrupt: F,
    ) -> ExitStatus
    where
        W: Write,
        F: Future<Output = ()>,
    {
        let quiet = self.quiet;
        let mut sink = open_sink(console, &config.output);

        if config.command != Command::Interactive {
            progress(&mut sink, quiet, &format!("Running command: {}\n", config.command));
        }

        let output = sink
            .log_path()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "stdout".to_string());
        progress(
            &mut sink,
            quiet,
            &format!(
                "Using config:\nport: {}\ncommand: {} ({})\noutput: {}\nloop: {}\n",
                config.port,
                config.command,
                config.command.index(),
                output,
                config.loop_spec
            ),
        );

        progress(&mut sink, quiet, &format!("attempting to connect to {}\n", config.port));
        let mut link = match self.connector.connect(&config.port).await {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!(connector = self.connector.name(), error = %e, "Connect failed");
                status(
                    &mut sink,
                    &format!("Error: could not open serial device ({}).\n", config.port),
                );
                return ExitStatus::CommandFailed;
            }
        };
        sink.retain_file();

        let success = match link.init_link().await {
            Ok(id) => {
                progress(
                    &mut sink,
                    quiet,
                    &format!("ECU responded to D0 command with: {}\n", id),
                );

                let finishes_when_interrupted =
                    matches!(config.command.class(), CommandClass::Pulse { .. });
                tokio::pin!(interrupt);

                let finished = {
                    let run = self.engine.run(
                        &mut link,
                        config.command,
                        config.loop_spec,
                        &mut sink,
                    );
                    tokio::pin!(run);

                    tokio::select! {
                        outcome = &mut run => Some(outcome),
                        _ = &mut interrupt => {
                            if finishes_when_interrupted {
                                tracing::info!("Interrupted, finishing relay pulse");
                                Some(run.await)
                            } else {
                                None
                            }
                        }
                    }
                };

                match finished {
                    Some(outcome) => outcome.success,
                    None => {
                        tracing::info!(samples = sink.emissions(), "Interrupted");
                        sink.emissions() > 0
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Initialisation failed");
                status(&mut sink, "Error in initialization sequence.\n");
                false
            }
        };

        link.disconnect().await;

        if success {
            ExitStatus::Success
        } else {
            ExitStatus::CommandFailed
        }
    }
}

fn open_sink<W: Write>(console: W, output: &OutputTarget) -> LogSink<W> {
    match output {
        OutputTarget::Stdout => LogSink::console_only(console),
        OutputTarget::LogDir(dir) => match LogFile::create(dir, Local::now()) {
            Ok(file) => LogSink::with_file(console, file),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Could not create log file, logging to console only");
                LogSink::console_only(console)
            }
        },
    }
}

fn progress<W: Write>(sink: &mut LogSink<W>, quiet: bool, text: &str) {
    if !quiet {
        status(sink, text);
    }
}

fn status<W: Write>(sink: &mut LogSink<W>, text: &str) {
    let console = sink.console_mut();
    if let Err(e) = console.write_all(text.as_bytes()).and_then(|_| console.flush()) {
        tracing::debug!(error = %e, "Console write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitStatus::Success.code(), 0);
        assert_eq!(ExitStatus::CommandFailed.code(), -2);
        assert_eq!(ExitStatus::UsageError.code(), -1);
    }
}
