//! Decoded telemetry

use super::frame::{Frame7D, Frame80};

/// Offset applied to every raw temperature byte
const TEMPERATURE_OFFSET: i16 = 55;

/// Idle switch bit in byte 10 of the 0x80 frame
const IDLE_SWITCH_ACTIVE: u8 = 0x10;

// Fault bits in the DTC0 / DTC1 bytes of the 0x80 frame
const COOLANT_SENSOR_FAULT: u8 = 0x01;
const AIR_SENSOR_FAULT: u8 = 0x02;
const FUEL_PUMP_FAULT: u8 = 0x02;
const THROTTLE_POT_FAULT: u8 = 0x80;

/// One decoded snapshot of ECU sensor and state values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetrySample {
    pub engine_rpm: u16,
    pub coolant_temp_c: i16,
    pub ambient_temp_c: i16,
    pub intake_air_temp_c: i16,
    pub fuel_temp_c: i16,
    pub map_kpa: f32,
    pub battery_voltage: f32,
    pub throttle_pot_voltage: f32,
    pub idle_switch: bool,
    pub park_neutral_switch: bool,
    /// Packed fault flags: bit0 coolant, bit1 intake air, bit2 fuel pump, bit3 throttle pot
    pub fault_codes: u8,
    pub iac_position: u8,
    pub lambda_voltage_mv: u16,
    pub closed_loop: bool,
    pub coolant_temp_sensor_fault: bool,
    pub intake_air_temp_sensor_fault: bool,
    pub fuel_pump_circuit_fault: bool,
    pub throttle_pot_circuit_fault: bool,
}

impl TelemetrySample {
    /// Decode a sample from a pair of data frames
    pub fn from_frames(f80: &Frame80, f7d: &Frame7D) -> Self {
        let d80 = &f80.0;
        let d7d = &f7d.0;

        let coolant_temp_sensor_fault = d80[13] & COOLANT_SENSOR_FAULT != 0;
        let intake_air_temp_sensor_fault = d80[13] & AIR_SENSOR_FAULT != 0;
        let fuel_pump_circuit_fault = d80[14] & FUEL_PUMP_FAULT != 0;
        let throttle_pot_circuit_fault = d80[14] & THROTTLE_POT_FAULT != 0;

        let fault_codes = u8::from(coolant_temp_sensor_fault)
            | u8::from(intake_air_temp_sensor_fault) << 1
            | u8::from(fuel_pump_circuit_fault) << 2
            | u8::from(throttle_pot_circuit_fault) << 3;

        Self {
            engine_rpm: f80.engine_rpm(),
            coolant_temp_c: temperature(d80[3]),
            ambient_temp_c: temperature(d80[4]),
            intake_air_temp_c: temperature(d80[5]),
            fuel_temp_c: temperature(d80[6]),
            map_kpa: f32::from(d80[7]),
            battery_voltage: f32::from(d80[8]) / 10.0,
            throttle_pot_voltage: f32::from(d80[9]) * 0.02,
            idle_switch: d80[10] & IDLE_SWITCH_ACTIVE != 0,
            park_neutral_switch: d80[12] != 0,
            fault_codes,
            iac_position: d80[18],
            lambda_voltage_mv: u16::from(d7d[6]) * 5,
            closed_loop: d7d[10] != 0,
            coolant_temp_sensor_fault,
            intake_air_temp_sensor_fault,
            fuel_pump_circuit_fault,
            throttle_pot_circuit_fault,
        }
    }
}

fn temperature(raw: u8) -> i16 {
    i16::from(raw) - TEMPERATURE_OFFSET
}
