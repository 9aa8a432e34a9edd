//! Command execution engine
//!
//! Drives one resolved command against an open ECU link and feeds its results
//! to the log sink. Failures never escape as errors: every command ends in an
//! [`Outcome`], and telemetry loops absorb failed iterations.

use std::io::Write;
use std::time::Duration;

use chrono::Local;
use mems_core::{Command, CommandClass, EcuLink};
use tokio::io::AsyncBufRead;

use crate::config::{LoopSpec, DEFAULT_DWELL};
use crate::logging::{self, LogSink};
use crate::{policy, shell};

/// Tunables for command execution
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Hold time for relay pulses
    pub dwell: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            dwell: DEFAULT_DWELL,
        }
    }
}

/// Result of running one command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    pub success: bool,
    /// Results emitted to the log sink
    pub samples: usize,
}

/// Runs commands; owns the operator input and the shell's response buffer
pub struct Engine<R> {
    settings: EngineSettings,
    operator: R,
    response: Vec<u8>,
}

impl<R> Engine<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(settings: EngineSettings, operator: R) -> Self {
        Self {
            settings,
            operator,
            response: Vec::with_capacity(shell::RESPONSE_BUFFER_SIZE),
        }
    }

    /// Run `command` to completion
    pub async fn run<L, W>(
        &mut self,
        link: &mut L,
        command: Command,
        loop_spec: LoopSpec,
        sink: &mut LogSink<W>,
    ) -> Outcome
    where
        L: EcuLink + ?Sized,
        W: Write,
    {
        tracing::debug!(%command, %loop_spec, "Running command");

        match command.class() {
            CommandClass::TelemetryRead => poll_telemetry(link, command, loop_spec, sink).await,

            CommandClass::SingleShotRead => match link.read_iac_position().await {
                Ok(position) => {
                    sink.emit(&logging::iac_position(position));
                    Outcome {
                        success: true,
                        samples: 1,
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "IAC position read failed");
                    Outcome::default()
                }
            },

            CommandClass::Pulse { on, off } => {
                flag(policy::pulse(link, on, off, self.settings.dwell).await)
            }

            CommandClass::Momentary(actuator) => flag(policy::momentary(link, actuator).await),

            CommandClass::Convergence(direction) => {
                let report = policy::converge(link, direction).await;
                tracing::debug!(transactions = report.transactions, "Convergence finished");
                flag(report.success)
            }

            CommandClass::Interactive => flag(
                shell::run(
                    link,
                    &mut self.operator,
                    sink.console_mut(),
                    &mut self.response,
                )
                .await,
            ),
        }
    }
}

fn flag(success: bool) -> Outcome {
    Outcome {
        success,
        samples: 0,
    }
}

/// Repeat single-sample reads as directed by `loop_spec`
///
/// A failed iteration still uses up one count and emits nothing.
async fn poll_telemetry<L, W>(
    link: &mut L,
    command: Command,
    loop_spec: LoopSpec,
    sink: &mut LogSink<W>,
) -> Outcome
where
    L: EcuLink + ?Sized,
    W: Write,
{
    match command {
        Command::GaugeRead => sink.write_header(logging::CSV_HEADER),
        Command::Read => {
            if let Err(e) = sink.console_mut().write_all(b"executing read\n") {
                tracing::debug!(error = %e, "Console write failed");
            }
        }
        _ => {}
    }

    let mut completed = 0u64;
    let mut samples = 0usize;

    while loop_spec.allows(completed) {
        completed += 1;
        match read_once(link, command).await {
            Ok(text) => {
                sink.emit(&text);
                samples += 1;
            }
            Err(e) => tracing::warn!(iteration = completed, error = %e, "Read failed"),
        }
    }

    Outcome {
        success: samples > 0,
        samples,
    }
}

async fn read_once<L>(link: &mut L, command: Command) -> mems_core::LinkResult<String>
where
    L: EcuLink + ?Sized,
{
    match command {
        Command::ReadRaw => {
            let (f80, f7d) = link.read_raw_frames().await?;
            Ok(logging::raw_frames(&f80, &f7d))
        }
        Command::GaugeRead => {
            let sample = link.read_sample().await?;
            Ok(logging::csv_row(&sample, &logging::timestamp(Local::now())))
        }
        _ => {
            let sample = link.read_sample().await?;
            Ok(logging::verbose_block(&sample))
        }
    }
}
