//! Common error types for ECU links

use thiserror::Error;

/// Result type for link operations
pub type LinkResult<T> = Result<T, LinkError>;

/// Errors that can occur while talking to an ECU
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The port could not be opened
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The link was used after it was closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Read or write on the underlying stream failed
    #[error("I/O error: {0}")]
    Io(String),

    /// No complete response arrived in time
    #[error("Timeout waiting for response to 0x{command:02X}")]
    Timeout { command: u8 },

    /// The ECU answered, but did not echo the command back
    #[error("ECU rejected 0x{command:02X} (echo 0x{echo:02X})")]
    Rejected { command: u8, echo: u8 },

    /// The response ended before the expected number of bytes
    #[error("Short response to 0x{command:02X}: expected {expected} bytes, received {received}")]
    ShortResponse {
        command: u8,
        expected: usize,
        received: usize,
    },
}

impl LinkError {
    /// True for failures of the link itself, false when the ECU answered but
    /// the transaction did not succeed
    pub fn is_transport(&self) -> bool {
        !matches!(self, LinkError::Rejected { .. })
    }
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::BrokenPipe => {
                LinkError::ConnectionClosed
            }
            _ => LinkError::Io(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_is_not_transport() {
        let err = LinkError::Rejected {
            command: 0xFE,
            echo: 0x00,
        };
        assert!(!err.is_transport());
        assert!(LinkError::Timeout { command: 0x80 }.is_transport());
        assert!(LinkError::ConnectionClosed.is_transport());
    }

    #[test]
    fn test_io_error_conversion() {
        let eof = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        assert_eq!(LinkError::from(eof), LinkError::ConnectionClosed);

        let other = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(matches!(LinkError::from(other), LinkError::Io(msg) if msg == "boom"));
    }

    #[test]
    fn test_display_formats_bytes_as_hex() {
        let err = LinkError::Rejected {
            command: 0x7D,
            echo: 0x0A,
        };
        assert_eq!(err.to_string(), "ECU rejected 0x7D (echo 0x0A)");
    }
}
