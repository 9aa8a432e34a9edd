//! ECU link traits
//!
//! The execution engine only ever sees these traits. Each method is a single
//! blocking round-trip from the caller's point of view: the future resolves
//! once the ECU has answered or the transaction has failed, and the next
//! transaction is not issued before that.

use async_trait::async_trait;

use crate::error::LinkResult;
use crate::models::{Actuator, ActuatorOutcome, EcuId, Frame7D, Frame80, TelemetrySample};

/// An open, exclusive connection to one ECU
#[async_trait]
pub trait EcuLink: Send {
    /// Run the initialisation handshake and return the ECU id bytes
    async fn init_link(&mut self) -> LinkResult<EcuId>;

    /// Fetch both raw data frames
    async fn read_raw_frames(&mut self) -> LinkResult<(Frame80, Frame7D)>;

    /// Fetch and decode one telemetry sample
    async fn read_sample(&mut self) -> LinkResult<TelemetrySample> {
        let (f80, f7d) = self.read_raw_frames().await?;
        Ok(TelemetrySample::from_frames(&f80, &f7d))
    }

    /// Read the idle air control valve position
    async fn read_iac_position(&mut self) -> LinkResult<u8>;

    /// Exercise an actuator once
    ///
    /// Transport failures and rejections both come back as an unsuccessful
    /// outcome; the link logs which one it was.
    async fn test_actuator(&mut self, actuator: Actuator) -> ActuatorOutcome;

    /// Write a single raw command byte
    async fn write_raw_byte(&mut self, byte: u8) -> LinkResult<()>;

    /// Read one byte of a raw response, `None` once the response has ended
    async fn read_raw_byte(&mut self) -> Option<u8>;

    /// Close the link. Further calls fail with `ConnectionClosed`.
    async fn disconnect(&mut self);
}

/// Factory for opening links to a named port
#[async_trait]
pub trait EcuConnector: Send + Sync {
    /// The link type this connector produces
    type Link: EcuLink;

    /// Attempt to open the port, returning a link on success
    async fn connect(&self, port: &str) -> LinkResult<Self::Link>;

    /// Human-readable name for this connector
    fn name(&self) -> &'static str;
}
