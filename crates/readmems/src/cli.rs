//! Command-line arguments

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use readmems::config::ArgOverrides;

#[derive(Parser, Debug)]
#[command(name = "readmems")]
#[command(author, version, about = "Diagnostic utility for MEMS 1.6 engine management")]
pub struct Cli {
    /// Serial device, e.g. /dev/ttyUSB0 or COM3
    pub port: Option<String>,

    /// Command to run (see --list)
    pub command: Option<String>,

    /// Read loop count, a number or 'inf'
    #[arg(value_name = "LOOP")]
    pub loop_count: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "READMEMS_CONFIG")]
    pub config: Option<PathBuf>,

    /// 'stdout', or a directory for the log file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Relay pulse hold time in milliseconds
    #[arg(long, value_name = "MS")]
    pub dwell_ms: Option<u64>,

    /// List available commands and exit
    #[arg(short, long)]
    pub list: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Hide progress lines; errors and command output still print
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    pub fn overrides(&self) -> ArgOverrides<'_> {
        ArgOverrides {
            port: self.port.as_deref(),
            command: self.command.as_deref(),
            output: self.output.as_deref(),
            loop_count: self.loop_count.as_deref(),
            dwell: self.dwell_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_positional_arguments() {
        let cli = Cli::parse_from(["readmems", "/dev/ttyUSB0", "memsgauge", "inf", "--dwell-ms", "0"]);
        let args = cli.overrides();

        assert_eq!(args.port, Some("/dev/ttyUSB0"));
        assert_eq!(args.command, Some("memsgauge"));
        assert_eq!(args.loop_count, Some("inf"));
        assert_eq!(args.dwell, Some(Duration::ZERO));
    }
}
