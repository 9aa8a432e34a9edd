//! MEMS 1.6 (ROSCO) command bytes and response framing
//!
//! Every request is a single command byte. The ECU replies with an echo of
//! that byte followed by a command-specific payload:
//!
//! | Command          | Response                          |
//! |------------------|-----------------------------------|
//! | `CA`, `75`, `0A` | echo only                         |
//! | `80`             | echo + 28-byte data frame         |
//! | `7D`             | echo + 32-byte data frame         |
//! | `D0`             | echo + 4-byte ECU id              |
//! | anything else    | echo + 1 value byte               |

use mems_core::{Actuator, FRAME_7D_LEN, FRAME_80_LEN};

/// Line speed of the diagnostic connector
pub const BAUD_RATE: u32 = 9600;

/// First byte of the initialisation sequence
pub const INIT_COMMAND_A: u8 = 0xCA;
/// Second byte of the initialisation sequence
pub const INIT_COMMAND_B: u8 = 0x75;
/// Communication heartbeat
pub const HEARTBEAT: u8 = 0xF4;
/// Request the ECU id, last step of initialisation
pub const INIT_ECU_ID: u8 = 0xD0;
/// Request data frame 0x80
pub const REQ_DATA_80: u8 = 0x80;
/// Request data frame 0x7D
pub const REQ_DATA_7D: u8 = 0x7D;
/// Request the idle air control valve position
pub const GET_IAC_POSITION: u8 = 0xFB;

/// Handshake bytes, in the order they are sent
pub const INIT_SEQUENCE: [u8; 4] = [INIT_COMMAND_A, INIT_COMMAND_B, HEARTBEAT, INIT_ECU_ID];

/// Command byte that exercises the given actuator
pub fn actuator_command(actuator: Actuator) -> u8 {
    match actuator {
        Actuator::FuelPumpOn => 0x11,
        Actuator::FuelPumpOff => 0x01,
        Actuator::PtcRelayOn => 0x12,
        Actuator::PtcRelayOff => 0x02,
        Actuator::AcRelayOn => 0x13,
        Actuator::AcRelayOff => 0x03,
        Actuator::TestInjectors => 0xF7,
        Actuator::FireCoil => 0xF8,
        Actuator::OpenIac => 0xFD,
        Actuator::CloseIac => 0xFE,
    }
}

/// Expected number of response bytes, echo included
pub fn response_size(command: u8) -> usize {
    match command {
        0x0A | INIT_COMMAND_A | INIT_COMMAND_B => 1,
        REQ_DATA_80 => 1 + FRAME_80_LEN,
        REQ_DATA_7D => 1 + FRAME_7D_LEN,
        INIT_ECU_ID => 5,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_sizes() {
        assert_eq!(response_size(INIT_COMMAND_A), 1);
        assert_eq!(response_size(INIT_COMMAND_B), 1);
        assert_eq!(response_size(HEARTBEAT), 2);
        assert_eq!(response_size(INIT_ECU_ID), 5);
        assert_eq!(response_size(REQ_DATA_80), 29);
        assert_eq!(response_size(REQ_DATA_7D), 33);
        assert_eq!(response_size(GET_IAC_POSITION), 2);
        assert_eq!(response_size(actuator_command(Actuator::CloseIac)), 2);
    }

    #[test]
    fn test_on_and_off_codes_differ_by_0x10() {
        for (on, off) in [
            (Actuator::FuelPumpOn, Actuator::FuelPumpOff),
            (Actuator::PtcRelayOn, Actuator::PtcRelayOff),
            (Actuator::AcRelayOn, Actuator::AcRelayOff),
        ] {
            assert_eq!(actuator_command(on), actuator_command(off) + 0x10);
        }
    }
}
