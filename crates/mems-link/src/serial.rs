//! Serial link speaking the ROSCO protocol

use std::time::Duration;

use async_trait::async_trait;
use mems_core::{
    Actuator, ActuatorOutcome, EcuConnector, EcuId, EcuLink, Frame7D, Frame80, LinkError,
    LinkResult,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{ClearBuffer, DataBits, Parity, SerialPort, SerialStream, StopBits};

use crate::protocol::{self, GET_IAC_POSITION, INIT_SEQUENCE, REQ_DATA_7D, REQ_DATA_80};

/// Timing and line settings for a serial link
#[derive(Debug, Clone)]
pub struct SerialSettings {
    /// Line speed
    pub baud_rate: u32,
    /// Maximum time to wait for a complete response
    pub response_timeout: Duration,
    /// Silence after which a raw response counts as finished
    pub raw_byte_timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: protocol::BAUD_RATE,
            response_timeout: Duration::from_millis(2000),
            raw_byte_timeout: Duration::from_millis(500),
        }
    }
}

/// ECU link over any byte stream, normally a serial port
pub struct SerialLink<S = SerialStream> {
    stream: Option<S>,
    settings: SerialSettings,
}

impl<S> SerialLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, settings: SerialSettings) -> Self {
        Self {
            stream: Some(stream),
            settings,
        }
    }

    fn stream(&mut self) -> LinkResult<&mut S> {
        self.stream.as_mut().ok_or(LinkError::ConnectionClosed)
    }

    /// Send one command byte and read its complete, echo-checked response
    async fn transact(&mut self, command: u8) -> LinkResult<Vec<u8>> {
        let response_timeout = self.settings.response_timeout;
        let stream = self.stream()?;

        stream.write_all(&[command]).await?;
        stream.flush().await?;
        tracing::trace!(command = %hex::encode([command]), "Sent command");

        let mut response = vec![0u8; protocol::response_size(command)];
        timeout(response_timeout, read_response(stream, command, &mut response))
            .await
            .map_err(|_| LinkError::Timeout { command })??;

        tracing::trace!(response = %hex::encode(&response), "Received response");

        if response[0] != command {
            return Err(LinkError::Rejected {
                command,
                echo: response[0],
            });
        }

        Ok(response)
    }
}

async fn read_response<S>(stream: &mut S, command: u8, buf: &mut [u8]) -> LinkResult<()>
where
    S: AsyncRead + Unpin,
{
    let mut received = 0;
    while received < buf.len() {
        let n = stream.read(&mut buf[received..]).await?;
        if n == 0 {
            return Err(LinkError::ShortResponse {
                command,
                expected: buf.len(),
                received,
            });
        }
        received += n;
    }
    Ok(())
}

#[async_trait]
impl<S> EcuLink for SerialLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn init_link(&mut self) -> LinkResult<EcuId> {
        let mut last = Vec::new();
        for command in INIT_SEQUENCE {
            last = self.transact(command).await?;
        }

        let mut id = [0u8; 4];
        id.copy_from_slice(&last[1..5]);
        tracing::info!(ecu_id = %hex::encode(id), "ECU initialised");
        Ok(EcuId(id))
    }

    async fn read_raw_frames(&mut self) -> LinkResult<(Frame80, Frame7D)> {
        let d80 = self.transact(REQ_DATA_80).await?;
        let d7d = self.transact(REQ_DATA_7D).await?;

        // transact() guarantees the lengths, so these only fail on a sizing bug
        let f80 = Frame80::from_slice(&d80[1..]).ok_or(LinkError::ShortResponse {
            command: REQ_DATA_80,
            expected: d80.len(),
            received: d80.len(),
        })?;
        let f7d = Frame7D::from_slice(&d7d[1..]).ok_or(LinkError::ShortResponse {
            command: REQ_DATA_7D,
            expected: d7d.len(),
            received: d7d.len(),
        })?;

        Ok((f80, f7d))
    }

    async fn read_iac_position(&mut self) -> LinkResult<u8> {
        let response = self.transact(GET_IAC_POSITION).await?;
        Ok(response[1])
    }

    async fn test_actuator(&mut self, actuator: Actuator) -> ActuatorOutcome {
        match self.transact(protocol::actuator_command(actuator)).await {
            Ok(response) => {
                let position = actuator.reports_position().then(|| response[1]);
                ActuatorOutcome::acknowledged(position)
            }
            Err(e) => {
                tracing::warn!(?actuator, transport = e.is_transport(), "Actuator test failed: {}", e);
                ActuatorOutcome::failed()
            }
        }
    }

    async fn write_raw_byte(&mut self, byte: u8) -> LinkResult<()> {
        let stream = self.stream()?;
        stream.write_all(&[byte]).await?;
        stream.flush().await?;
        tracing::trace!(byte = %hex::encode([byte]), "Sent raw byte");
        Ok(())
    }

    async fn read_raw_byte(&mut self) -> Option<u8> {
        let raw_timeout = self.settings.raw_byte_timeout;
        let stream = self.stream.as_mut()?;

        let mut byte = [0u8; 1];
        match timeout(raw_timeout, stream.read(&mut byte)).await {
            Ok(Ok(1)) => Some(byte[0]),
            Ok(Ok(_)) | Err(_) => None,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Raw read failed");
                None
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::debug!(error = %e, "Error closing serial stream");
            }
            tracing::info!("Disconnected from ECU");
        }
    }
}

/// Opens serial ports as ECU links
#[derive(Debug, Clone, Default)]
pub struct SerialConnector {
    settings: SerialSettings,
}

#[async_trait]
impl EcuConnector for SerialConnector {
    type Link = SerialLink<SerialStream>;

    async fn connect(&self, port: &str) -> LinkResult<Self::Link> {
        let builder = tokio_serial::new(port, self.settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(self.settings.response_timeout);

        let stream = SerialStream::open(&builder)
            .map_err(|e| LinkError::ConnectionFailed(format!("{}: {}", port, e)))?;

        // Drain anything left over from a previous session
        if let Err(e) = stream.clear(ClearBuffer::All) {
            tracing::warn!(error = %e, "Failed to clear serial buffers");
        }

        tracing::info!(port, baud = self.settings.baud_rate, "Connected to serial port");
        Ok(SerialLink::new(stream, self.settings.clone()))
    }

    fn name(&self) -> &'static str {
        "serial"
    }
}
