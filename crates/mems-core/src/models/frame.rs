//! Raw data frames returned by the ECU
//!
//! Frames are stored without the leading command echo, so byte 0 is always
//! the frame's own length byte.

use std::fmt;

/// Length of the 0x80 data frame, excluding the command echo
pub const FRAME_80_LEN: usize = 28;

/// Length of the 0x7D data frame, excluding the command echo
pub const FRAME_7D_LEN: usize = 32;

/// Data frame returned in reply to command 0x80
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame80(pub [u8; FRAME_80_LEN]);

/// Data frame returned in reply to command 0x7D
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame7D(pub [u8; FRAME_7D_LEN]);

impl Frame80 {
    /// Build a frame from exactly `FRAME_80_LEN` bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn engine_rpm(&self) -> u16 {
        u16::from_be_bytes([self.0[1], self.0[2]])
    }
}

impl Default for Frame80 {
    fn default() -> Self {
        let mut bytes = [0u8; FRAME_80_LEN];
        bytes[0] = FRAME_80_LEN as u8;
        Self(bytes)
    }
}

impl Frame7D {
    /// Build a frame from exactly `FRAME_7D_LEN` bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for Frame7D {
    fn default() -> Self {
        let mut bytes = [0u8; FRAME_7D_LEN];
        bytes[0] = FRAME_7D_LEN as u8;
        Self(bytes)
    }
}

/// The four identification bytes returned by the 0xD0 handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EcuId(pub [u8; 4]);

impl fmt::Display for EcuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{:02X} {:02X} {:02X} {:02X}", a, b, c, d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_requires_exact_length() {
        assert!(Frame80::from_slice(&[0u8; FRAME_80_LEN]).is_some());
        assert!(Frame80::from_slice(&[0u8; FRAME_80_LEN - 1]).is_none());
        assert!(Frame7D::from_slice(&[0u8; FRAME_7D_LEN + 1]).is_none());
    }

    #[test]
    fn test_rpm_is_big_endian() {
        let mut frame = Frame80::default();
        frame.0[1] = 0x03;
        frame.0[2] = 0x20;
        assert_eq!(frame.engine_rpm(), 800);
    }

    #[test]
    fn test_ecu_id_display() {
        assert_eq!(EcuId([0x99, 0x00, 0x03, 0x03]).to_string(), "99 00 03 03");
    }
}
