//! Operator-facing messages and the command listing

use colored::Colorize;
use mems_core::Command;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Context for operator messages
pub struct OutputContext {
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { quiet }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print the usage line and the command table
    pub fn usage(&self) {
        println!("{}", usage_text());
    }
}

/// Command display for the usage listing
#[derive(Debug, Tabled)]
pub struct CommandRow {
    #[tabled(rename = "Command")]
    pub name: &'static str,
    #[tabled(rename = "Description")]
    pub description: &'static str,
}

pub fn command_table() -> String {
    let rows: Vec<CommandRow> = Command::ALL
        .into_iter()
        .map(|cmd| CommandRow {
            name: cmd.name(),
            description: cmd.description(),
        })
        .collect();

    Table::new(rows).with(Style::sharp()).to_string()
}

pub fn usage_text() -> String {
    format!(
        "{}\n{}\n where <command> is one of the following:\n{}\n and [read-loop-count] is either a number or 'inf' to read forever.",
        "Diagnostic utility using ROSCO protocol for MEMS 1.6 systems".bold(),
        "Usage: readmems <serial device> <command> [read-loop-count]",
        command_table()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_table_lists_every_command() {
        let table = command_table();
        for cmd in Command::ALL {
            assert!(table.contains(cmd.name()), "missing {}", cmd.name());
        }
        assert!(table.contains("Description"));
    }

    #[test]
    fn test_usage_mentions_loop_count() {
        assert!(usage_text().contains("'inf' to read forever"));
    }
}
