//! Console and log-file sink

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// File name of a log started at `now`
pub fn log_file_name(now: DateTime<Local>) -> String {
    format!("readmems-{}.log", now.format("%Y-%m-%d-%H%M%S"))
}

/// A log file that removes itself when dropped unless it has been retained
pub struct LogFile<F: Write = BufWriter<File>> {
    path: PathBuf,
    writer: Option<F>,
    retained: bool,
}

impl LogFile {
    /// Create a new log file in `dir`
    pub fn create(dir: &Path, now: DateTime<Local>) -> io::Result<Self> {
        let path = dir.join(log_file_name(now));
        let file = File::create(&path)?;
        tracing::debug!(path = %path.display(), "Opened log file");
        Ok(Self::with_writer(path, BufWriter::new(file)))
    }
}

impl<F: Write> LogFile<F> {
    /// Log to an already open `writer` backing `path`
    pub fn with_writer(path: PathBuf, writer: F) -> Self {
        Self {
            path,
            writer: Some(writer),
            retained: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file on disk when it is closed
    pub fn retain(&mut self) {
        self.retained = true;
    }

    fn write_str(&mut self, text: &str) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.write_all(text.as_bytes()),
            None => Err(io::Error::new(io::ErrorKind::Other, "log file closed")),
        }
    }
}

impl<F: Write> Drop for LogFile<F> {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to flush log file");
            }
        }

        if !self.retained {
            match std::fs::remove_file(&self.path) {
                Ok(()) => tracing::debug!(path = %self.path.display(), "Removed log file"),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove log file")
                }
            }
        }
    }
}

/// Destination for everything a command reports
///
/// The console always receives every line. The log file, when present,
/// receives the same lines; once a file write fails the file is skipped for
/// the rest of the run.
pub struct LogSink<W, F: Write = BufWriter<File>> {
    console: W,
    file: Option<LogFile<F>>,
    file_failed: bool,
    emissions: usize,
}

impl<W: Write> LogSink<W> {
    pub fn console_only(console: W) -> Self {
        Self {
            console,
            file: None,
            file_failed: false,
            emissions: 0,
        }
    }
}

impl<W: Write, F: Write> LogSink<W, F> {
    pub fn with_file(console: W, file: LogFile<F>) -> Self {
        Self {
            console,
            file: Some(file),
            file_failed: false,
            emissions: 0,
        }
    }

    /// Write one result, counted as an emission
    pub fn emit(&mut self, text: &str) {
        self.write_both(text);
        self.emissions += 1;
    }

    /// Write a header line; not counted as an emission
    pub fn write_header(&mut self, text: &str) {
        self.write_both(text);
    }

    fn write_both(&mut self, text: &str) {
        if let Err(e) = self.console.write_all(text.as_bytes()) {
            tracing::debug!(error = %e, "Console write failed");
        }

        if self.file_failed {
            return;
        }
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = file.write_str(text) {
                tracing::warn!(path = %file.path().display(), error = %e, "Log file write failed, continuing on console only");
                self.file_failed = true;
            }
        }
    }

    /// Console writer for status lines that do not belong in the log
    pub fn console_mut(&mut self) -> &mut W {
        &mut self.console
    }

    /// Keep the log file once the run ends
    pub fn retain_file(&mut self) {
        if let Some(file) = self.file.as_mut() {
            file.retain();
        }
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.file.as_ref().map(|file| file.path())
    }

    /// Number of results emitted so far
    pub fn emissions(&self) -> usize {
        self.emissions
    }

    /// Close the log file and hand back the console
    pub fn into_console(mut self) -> W {
        if let Err(e) = self.console.flush() {
            tracing::debug!(error = %e, "Console flush failed");
        }
        self.file = None;
        self.console
    }
}
