//! Command registry
//!
//! The diagnostic tool runs exactly one command per process. Commands form a
//! closed set; resolution is an exact, case-insensitive match on the command
//! name and never guesses.

use std::fmt;
use std::str::FromStr;

use crate::models::{Actuator, IacDirection};

/// A diagnostic command understood by the tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Decoded telemetry, printed as a multi-line block
    Read,
    /// Raw 0x80/0x7D data frames as hex
    ReadRaw,
    /// Current idle air control valve position
    ReadIacPosition,
    /// Pulse the PTC (inlet manifold heater) relay
    PtcRelayTest,
    /// Pulse the fuel pump relay
    FuelPumpTest,
    /// Drive the idle air control valve fully closed
    IacClose,
    /// Drive the idle air control valve fully open
    IacOpen,
    /// Pulse the air conditioning relay
    AcRelayTest,
    /// Fire the ignition coil once
    CoilTest,
    /// Fire the injectors once
    InjectorTest,
    /// Operator-driven raw command shell
    Interactive,
    /// Decoded telemetry as CSV rows
    GaugeRead,
}

/// How the execution engine drives a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandClass {
    /// Repeated sample reads governed by the loop specification
    TelemetryRead,
    /// A single read transaction
    SingleShotRead,
    /// Actuator switched on, held for the dwell interval, then switched off
    Pulse { on: Actuator, off: Actuator },
    /// A single actuator transaction
    Momentary(Actuator),
    /// Repeated actuator transactions until the valve converges
    Convergence(IacDirection),
    /// Hand-off to the interactive shell
    Interactive,
}

impl Command {
    /// Every command, in registry order
    pub const ALL: [Command; 12] = [
        Command::Read,
        Command::ReadRaw,
        Command::ReadIacPosition,
        Command::PtcRelayTest,
        Command::FuelPumpTest,
        Command::IacClose,
        Command::IacOpen,
        Command::AcRelayTest,
        Command::CoilTest,
        Command::InjectorTest,
        Command::Interactive,
        Command::GaugeRead,
    ];

    /// Resolve a command name. Returns `None` for anything outside the set.
    pub fn resolve(name: &str) -> Option<Command> {
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.name().eq_ignore_ascii_case(name))
    }

    /// The name used on the command line and in config files
    pub fn name(self) -> &'static str {
        match self {
            Command::Read => "read",
            Command::ReadRaw => "read-raw",
            Command::ReadIacPosition => "read-iac",
            Command::PtcRelayTest => "ptc",
            Command::FuelPumpTest => "fuelpump",
            Command::IacClose => "iac-close",
            Command::IacOpen => "iac-open",
            Command::AcRelayTest => "ac",
            Command::CoilTest => "coil",
            Command::InjectorTest => "injectors",
            Command::Interactive => "interactive",
            Command::GaugeRead => "memsgauge",
        }
    }

    /// One-line description for the usage listing
    pub fn description(self) -> &'static str {
        match self {
            Command::Read => "Read and decode engine telemetry",
            Command::ReadRaw => "Dump raw 0x80 and 0x7D data frames",
            Command::ReadIacPosition => "Read the idle air control valve position",
            Command::PtcRelayTest => "Pulse the PTC heater relay",
            Command::FuelPumpTest => "Pulse the fuel pump relay",
            Command::IacClose => "Drive the idle air control valve closed",
            Command::IacOpen => "Drive the idle air control valve open",
            Command::AcRelayTest => "Pulse the A/C relay",
            Command::CoilTest => "Fire the ignition coil",
            Command::InjectorTest => "Fire the injectors",
            Command::Interactive => "Send raw command bytes to the ECU",
            Command::GaugeRead => "Log telemetry as CSV rows",
        }
    }

    /// Position in the registry, as reported in the "Using config" banner
    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|cmd| *cmd == self)
            .unwrap_or_default()
    }

    pub fn class(self) -> CommandClass {
        match self {
            Command::Read | Command::ReadRaw | Command::GaugeRead => CommandClass::TelemetryRead,
            Command::ReadIacPosition => CommandClass::SingleShotRead,
            Command::PtcRelayTest => CommandClass::Pulse {
                on: Actuator::PtcRelayOn,
                off: Actuator::PtcRelayOff,
            },
            Command::FuelPumpTest => CommandClass::Pulse {
                on: Actuator::FuelPumpOn,
                off: Actuator::FuelPumpOff,
            },
            Command::AcRelayTest => CommandClass::Pulse {
                on: Actuator::AcRelayOn,
                off: Actuator::AcRelayOff,
            },
            Command::CoilTest => CommandClass::Momentary(Actuator::FireCoil),
            Command::InjectorTest => CommandClass::Momentary(Actuator::TestInjectors),
            Command::IacClose => CommandClass::Convergence(IacDirection::Close),
            Command::IacOpen => CommandClass::Convergence(IacDirection::Open),
            Command::Interactive => CommandClass::Interactive,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing a name outside the registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::resolve(s).ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("read", Command::Read)]
    #[case("READ", Command::Read)]
    #[case("Read-Raw", Command::ReadRaw)]
    #[case("read-iac", Command::ReadIacPosition)]
    #[case("PTC", Command::PtcRelayTest)]
    #[case("FuelPump", Command::FuelPumpTest)]
    #[case("iac-CLOSE", Command::IacClose)]
    #[case("iac-open", Command::IacOpen)]
    #[case("Ac", Command::AcRelayTest)]
    #[case("coil", Command::CoilTest)]
    #[case("INJECTORS", Command::InjectorTest)]
    #[case("Interactive", Command::Interactive)]
    #[case("MemsGauge", Command::GaugeRead)]
    fn test_resolve_ignores_case(#[case] name: &str, #[case] expected: Command) {
        assert_eq!(Command::resolve(name), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("rea")]
    #[case("reads")]
    #[case("read ")]
    #[case("iac")]
    #[case("gauge")]
    fn test_resolve_rejects_unknown(#[case] name: &str) {
        assert_eq!(Command::resolve(name), None);
    }

    #[test]
    fn test_every_name_round_trips() {
        for cmd in Command::ALL {
            assert_eq!(Command::resolve(cmd.name()), Some(cmd));
            assert_eq!(cmd.name().parse::<Command>().unwrap(), cmd);
        }
    }

    #[test]
    fn test_registry_indices() {
        assert_eq!(Command::Read.index(), 0);
        assert_eq!(Command::Interactive.index(), 10);
        assert_eq!(Command::GaugeRead.index(), 11);
    }

    #[test]
    fn test_parse_error_names_input() {
        let err = "bogus".parse::<Command>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid command: bogus");
    }

    #[test]
    fn test_pulse_commands_pair_on_and_off() {
        assert_eq!(
            Command::FuelPumpTest.class(),
            CommandClass::Pulse {
                on: Actuator::FuelPumpOn,
                off: Actuator::FuelPumpOff
            }
        );
        assert_eq!(
            Command::IacOpen.class(),
            CommandClass::Convergence(IacDirection::Open)
        );
    }
}
