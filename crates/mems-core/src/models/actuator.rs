//! Actuator test models

/// IAC position reported when the valve is fully closed
pub const IAC_FULLY_CLOSED: u8 = 0x00;

/// IAC position at which the valve counts as fully open
pub const IAC_FULLY_OPEN: u8 = 0xB4;

/// An actuator the ECU can be told to exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actuator {
    FuelPumpOn,
    FuelPumpOff,
    PtcRelayOn,
    PtcRelayOff,
    AcRelayOn,
    AcRelayOff,
    TestInjectors,
    FireCoil,
    OpenIac,
    CloseIac,
}

impl Actuator {
    /// Whether the ECU's reply carries the resulting valve position
    pub fn reports_position(self) -> bool {
        matches!(self, Actuator::OpenIac | Actuator::CloseIac)
    }
}

/// Direction of an idle air control convergence run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IacDirection {
    Open,
    Close,
}

/// Result of a single actuator test transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorOutcome {
    /// Whether the ECU acknowledged the command
    pub success: bool,
    /// Position or state byte returned with the acknowledgement
    pub position: Option<u8>,
}

impl ActuatorOutcome {
    pub fn acknowledged(position: Option<u8>) -> Self {
        Self {
            success: true,
            position,
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            position: None,
        }
    }

    /// Acknowledged with the valve reported fully closed
    pub fn is_fully_closed(&self) -> bool {
        self.success && self.position == Some(IAC_FULLY_CLOSED)
    }

    /// Acknowledged with the valve reported below the fully-open threshold
    pub fn is_below_fully_open(&self) -> bool {
        self.success && self.position.map_or(true, |pos| pos < IAC_FULLY_OPEN)
    }
}
