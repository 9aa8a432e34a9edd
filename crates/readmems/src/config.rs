//! Configuration file handling and run configuration

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use mems_core::{Command, UnknownCommand};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "readmems.toml";

/// Hold time between the on and off halves of a relay pulse
pub const DEFAULT_DWELL: Duration = Duration::from_secs(2);

/// Errors that stop the tool before it talks to the ECU
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    UnknownCommand(#[from] UnknownCommand),

    #[error("Invalid loop count '{0}': expected a number or 'inf'")]
    InvalidLoop(String),

    #[error("No serial port given")]
    MissingPort,

    #[error("No command given")]
    MissingCommand,

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// How many times a telemetry read repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopSpec {
    Finite(u64),
    Infinite,
}

impl LoopSpec {
    /// Whether another iteration runs after `completed` iterations
    pub fn allows(self, completed: u64) -> bool {
        match self {
            LoopSpec::Finite(n) => completed < n,
            LoopSpec::Infinite => true,
        }
    }
}

impl Default for LoopSpec {
    fn default() -> Self {
        LoopSpec::Finite(1)
    }
}

impl FromStr for LoopSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("inf") {
            return Ok(LoopSpec::Infinite);
        }

        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => trimmed.parse::<u64>(),
        };

        parsed
            .map(LoopSpec::Finite)
            .map_err(|_| ConfigError::InvalidLoop(s.to_string()))
    }
}

impl fmt::Display for LoopSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopSpec::Finite(n) => write!(f, "{}", n),
            LoopSpec::Infinite => f.write_str("inf"),
        }
    }
}

/// Where command output goes besides the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Console only
    Stdout,
    /// Console plus a timestamped log file in this directory
    LogDir(PathBuf),
}

impl OutputTarget {
    /// `stdout` selects the console; anything else enables a log file, placed in
    /// the named directory when it exists and in the working directory otherwise
    pub fn parse(value: &str) -> Self {
        if value == "stdout" {
            return OutputTarget::Stdout;
        }

        let dir = Path::new(value);
        if dir.is_dir() {
            OutputTarget::LogDir(dir.to_path_buf())
        } else {
            OutputTarget::LogDir(PathBuf::from("."))
        }
    }
}

/// Configuration file contents. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Serial device
    pub port: Option<String>,
    /// Command name
    pub command: Option<String>,
    /// `stdout` or a log directory
    pub output: Option<String>,
    /// Loop count or `inf`
    #[serde(rename = "loop")]
    pub loop_count: Option<String>,
}

impl Config {
    /// Load the first config file found in the working directory or the user
    /// config directory, or an empty config if there is none
    pub fn load() -> Result<Self, ConfigError> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Self::load_from(&local);
        }

        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Per-user config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("readmems").join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: &ArgOverrides<'_>) -> Result<RunConfig, ConfigError> {
        let port = args
            .port
            .map(String::from)
            .or_else(|| self.port.clone())
            .ok_or(ConfigError::MissingPort)?;

        let command: Command = args
            .command
            .or(self.command.as_deref())
            .ok_or(ConfigError::MissingCommand)?
            .parse()?;

        let output = args
            .output
            .map(String::from)
            .or_else(|| self.output.clone())
            .map(|value| OutputTarget::parse(&value))
            .unwrap_or(OutputTarget::Stdout);

        let loop_spec = match args.loop_count.map(String::from).or_else(|| self.loop_count.clone()) {
            Some(value) => value.parse()?,
            None => LoopSpec::default(),
        };

        Ok(RunConfig {
            port,
            command,
            output,
            loop_spec,
            dwell: args.dwell.unwrap_or(DEFAULT_DWELL),
        })
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgOverrides<'a> {
    pub port: Option<&'a str>,
    pub command: Option<&'a str>,
    pub output: Option<&'a str>,
    pub loop_count: Option<&'a str>,
    pub dwell: Option<Duration>,
}

/// Fully resolved parameters for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub port: String,
    pub command: Command,
    pub output: OutputTarget,
    pub loop_spec: LoopSpec,
    pub dwell: Duration,
}
