//! Text renderings of command results

use std::fmt::Write;

use chrono::{DateTime, Local};
use mems_core::{Frame7D, Frame80, TelemetrySample};

/// Header line written once before the first CSV row
pub const CSV_HEADER: &str = "#time,engineSpeed,waterTemp,intakeAirTemp,throttleVoltage,\
manifoldPressure,idleBypassPos,mainVoltage,idleswitch,closedloop,lambdaVoltage_mV,\
intakeAirTempSensorFault,coolantTempSensorFault,fuelpumpCircuitFault,throttlepotCircuitFault\n";

/// Local timestamp with millisecond precision, as used in the first CSV column
pub fn timestamp(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}

/// Multi-line block for the `read` command
pub fn verbose_block(sample: &TelemetrySample) -> String {
    format!(
        "RPM: {}\n\
         Coolant (deg C): {}\n\
         Ambient (deg C): {}\n\
         Intake air (deg C): {}\n\
         Fuel temp (deg C): {}\n\
         MAP (kPa): {:.6}\n\
         Main voltage: {:.6}\n\
         Throttle pot voltage: {:.6}\n\
         Idle switch: {}\n\
         Park/neutral switch: {}\n\
         Fault codes: {}\n\
         IAC position: {}\n\
         -------------\n",
        sample.engine_rpm,
        sample.coolant_temp_c,
        sample.ambient_temp_c,
        sample.intake_air_temp_c,
        sample.fuel_temp_c,
        sample.map_kpa,
        sample.battery_voltage,
        sample.throttle_pot_voltage,
        u8::from(sample.idle_switch),
        u8::from(sample.park_neutral_switch),
        sample.fault_codes,
        sample.iac_position,
    )
}

/// One CSV row for the `memsgauge` command, fields in `CSV_HEADER` order
pub fn csv_row(sample: &TelemetrySample, timestamp: &str) -> String {
    format!(
        "{},{},{},{},{:.6},{:.6},{},{:.6},{},{},{},{},{},{},{}\n",
        timestamp,
        sample.engine_rpm,
        sample.coolant_temp_c,
        sample.intake_air_temp_c,
        sample.throttle_pot_voltage,
        sample.map_kpa,
        sample.iac_position,
        sample.battery_voltage,
        u8::from(sample.idle_switch),
        u8::from(sample.closed_loop),
        sample.lambda_voltage_mv,
        u8::from(sample.intake_air_temp_sensor_fault),
        u8::from(sample.coolant_temp_sensor_fault),
        u8::from(sample.fuel_pump_circuit_fault),
        u8::from(sample.throttle_pot_circuit_fault),
    )
}

/// Both raw frames as space-separated hex, one line each
pub fn raw_frames(f80: &Frame80, f7d: &Frame7D) -> String {
    let mut out = String::with_capacity(3 * (f80.as_bytes().len() + f7d.as_bytes().len()) + 10);
    hex_line(&mut out, "80", f80.as_bytes());
    hex_line(&mut out, "7D", f7d.as_bytes());
    out
}

fn hex_line(out: &mut String, label: &str, bytes: &[u8]) {
    out.push_str(label);
    out.push_str(": ");
    for byte in bytes {
        let _ = write!(out, "{:02X} ", byte);
    }
    out.push('\n');
}

/// IAC position as reported by `read-iac`
pub fn iac_position(position: u8) -> String {
    format!("0x{:02X}\n", position)
}

/// Hex dump, 16 bytes per row, always ending in a newline
pub fn hex_rows(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3 + bytes.len() / 16 + 1);
    for (idx, byte) in bytes.iter().enumerate() {
        let _ = write!(out, "{:02X} ", byte);
        if (idx + 1) % 16 == 0 {
            out.push('\n');
        }
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn sample() -> TelemetrySample {
        TelemetrySample {
            engine_rpm: 850,
            coolant_temp_c: 88,
            ambient_temp_c: 20,
            intake_air_temp_c: 30,
            fuel_temp_c: 25,
            map_kpa: 35.0,
            battery_voltage: 13.5,
            throttle_pot_voltage: 0.5,
            idle_switch: true,
            park_neutral_switch: false,
            fault_codes: 0,
            iac_position: 42,
            lambda_voltage_mv: 450,
            closed_loop: true,
            coolant_temp_sensor_fault: false,
            intake_air_temp_sensor_fault: true,
            fuel_pump_circuit_fault: false,
            throttle_pot_circuit_fault: false,
        }
    }

    #[test]
    fn test_csv_row_matches_header() {
        let row = csv_row(&sample(), "2024-01-02T03:04:05.006");
        let fields: Vec<&str> = row.trim_end().split(',').collect();
        let header: Vec<&str> = CSV_HEADER.trim_end().split(',').collect();

        assert_eq!(fields.len(), header.len());
        assert_eq!(fields.len() - 1, 14);
        assert_eq!(
            row,
            "2024-01-02T03:04:05.006,850,88,30,0.500000,35.000000,42,13.500000,1,1,450,1,0,0,0\n"
        );
    }

    #[test]
    fn test_timestamp_has_milliseconds() {
        let now = Local
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(6))
            .unwrap();
        assert_eq!(timestamp(now), "2024-01-02T03:04:05.006");
    }

    #[test]
    fn test_verbose_block() {
        let block = verbose_block(&sample());
        assert!(block.starts_with("RPM: 850\nCoolant (deg C): 88\n"));
        assert!(block.contains("MAP (kPa): 35.000000\n"));
        assert!(block.contains("Idle switch: 1\nPark/neutral switch: 0\n"));
        assert!(block.ends_with("IAC position: 42\n-------------\n"));
    }

    #[test]
    fn test_raw_frames() {
        let text = raw_frames(&Frame80::default(), &Frame7D::default());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("80: 1C 00 "));
        assert!(lines[1].starts_with("7D: 20 00 "));
        assert_eq!(lines[0].split_whitespace().count(), 1 + 28);
    }

    #[test]
    fn test_hex_rows_wrap_every_16_bytes() {
        assert_eq!(hex_rows(&[0xAB]), "AB \n");
        assert_eq!(hex_rows(&[]), "\n");

        let bytes: Vec<u8> = (0..17).collect();
        assert_eq!(
            hex_rows(&bytes),
            "00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F \n10 \n"
        );
    }

    #[test]
    fn test_iac_position() {
        assert_eq!(iac_position(0x0A), "0x0A\n");
    }
}
