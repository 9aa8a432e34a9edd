//! Mock ECU link for testing
//!
//! `MockLink` simulates a MEMS 1.6 ECU well enough to drive every command.
//! Clones share state, so a test can hand one clone to the code under test
//! and inspect the transaction log through another.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use mems_core::{
    Actuator, ActuatorOutcome, EcuConnector, EcuId, EcuLink, Frame7D, Frame80, LinkError,
    LinkResult, IAC_FULLY_OPEN,
};

use crate::protocol::{INIT_ECU_ID, REQ_DATA_80};

/// Baseline idle speed; the nth frame read reports `BASE_RPM + n`
const BASE_RPM: u16 = 800;

/// One call made against a `MockLink`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    Init,
    ReadFrames,
    ReadIac,
    Actuator(Actuator),
    WriteRaw(u8),
    ReadRaw,
    Disconnect,
}

struct MockState {
    ecu_id: EcuId,
    latency: Duration,
    fail_init: bool,
    connected: bool,
    /// 1-based indices of frame reads that time out
    fail_reads: HashSet<usize>,
    reads: usize,
    iac_position: u8,
    iac_step: u8,
    scripts: HashMap<Actuator, VecDeque<ActuatorOutcome>>,
    raw_responses: HashMap<u8, Vec<u8>>,
    pending_raw: VecDeque<u8>,
    fail_raw_writes: bool,
    transactions: Vec<Transaction>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            ecu_id: EcuId([0x99, 0x00, 0x03, 0x03]),
            latency: Duration::ZERO,
            fail_init: false,
            connected: true,
            fail_reads: HashSet::new(),
            reads: 0,
            iac_position: 0x40,
            iac_step: 0x10,
            scripts: HashMap::new(),
            raw_responses: HashMap::new(),
            pending_raw: VecDeque::new(),
            fail_raw_writes: false,
            transactions: Vec::new(),
        }
    }
}

impl MockState {
    fn frames(&self) -> (Frame80, Frame7D) {
        let rpm = BASE_RPM.wrapping_add(self.reads as u16);

        let mut f80 = Frame80::default();
        f80.0[1..3].copy_from_slice(&rpm.to_be_bytes());
        f80.0[3] = 140; // coolant 85 C
        f80.0[4] = 75; // ambient 20 C
        f80.0[5] = 80; // intake air 25 C
        f80.0[6] = 75; // fuel 20 C
        f80.0[7] = 34; // MAP kPa
        f80.0[8] = 140; // 14.0 V
        f80.0[9] = 30; // 0.6 V
        f80.0[10] = 0x10; // idle switch on
        f80.0[18] = self.iac_position;

        let mut f7d = Frame7D::default();
        f7d.0[6] = 90; // 450 mV
        f7d.0[10] = 1; // closed loop
        (f80, f7d)
    }

    fn simulate_actuator(&mut self, actuator: Actuator) -> ActuatorOutcome {
        if let Some(outcome) = self.scripts.get_mut(&actuator).and_then(VecDeque::pop_front) {
            return outcome;
        }

        match actuator {
            Actuator::CloseIac => {
                self.iac_position = self.iac_position.saturating_sub(self.iac_step);
                ActuatorOutcome::acknowledged(Some(self.iac_position))
            }
            Actuator::OpenIac => {
                self.iac_position = self
                    .iac_position
                    .saturating_add(self.iac_step)
                    .min(IAC_FULLY_OPEN);
                ActuatorOutcome::acknowledged(Some(self.iac_position))
            }
            _ => ActuatorOutcome::acknowledged(None),
        }
    }
}

/// Simulated ECU link
#[derive(Clone, Default)]
pub struct MockLink {
    state: Arc<Mutex<MockState>>,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a different id from the handshake
    pub fn with_ecu_id(self, id: [u8; 4]) -> Self {
        self.state.lock().ecu_id = EcuId(id);
        self
    }

    /// Delay every frame read and actuator test
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().latency = latency;
        self
    }

    /// Make the initialisation handshake fail
    pub fn failing_init(self) -> Self {
        self.state.lock().fail_init = true;
        self
    }

    /// Make the given frame reads (1-based) time out
    pub fn fail_reads(self, reads: impl IntoIterator<Item = usize>) -> Self {
        self.state.lock().fail_reads.extend(reads);
        self
    }

    /// Set the simulated IAC valve position
    pub fn with_iac_position(self, position: u8) -> Self {
        self.state.lock().iac_position = position;
        self
    }

    /// Set how far each IAC open/close step moves the valve
    pub fn with_iac_step(self, step: u8) -> Self {
        self.state.lock().iac_step = step;
        self
    }

    /// Queue outcomes for an actuator; they are returned before any simulated behaviour
    pub fn script_actuator(
        self,
        actuator: Actuator,
        outcomes: impl IntoIterator<Item = ActuatorOutcome>,
    ) -> Self {
        self.state
            .lock()
            .scripts
            .entry(actuator)
            .or_default()
            .extend(outcomes);
        self
    }

    /// Full response (echo included) returned for a raw command byte
    pub fn respond_raw(self, command: u8, response: Vec<u8>) -> Self {
        self.state.lock().raw_responses.insert(command, response);
        self
    }

    /// Make every raw write fail
    pub fn failing_raw_writes(self) -> Self {
        self.state.lock().fail_raw_writes = true;
        self
    }

    /// Every call made so far, in order
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().transactions.clone()
    }

    /// Number of calls matching the given transaction
    pub fn count(&self, transaction: Transaction) -> usize {
        self.state
            .lock()
            .transactions
            .iter()
            .filter(|t| **t == transaction)
            .count()
    }

    /// Number of actuator transactions of any kind
    pub fn actuator_calls(&self) -> usize {
        self.state
            .lock()
            .transactions
            .iter()
            .filter(|t| matches!(t, Transaction::Actuator(_)))
            .count()
    }

    pub fn iac_position(&self) -> u8 {
        self.state.lock().iac_position
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    async fn simulate_latency(&self) {
        let latency = self.state.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl EcuLink for MockLink {
    async fn init_link(&mut self) -> LinkResult<EcuId> {
        let mut state = self.state.lock();
        state.transactions.push(Transaction::Init);
        if !state.connected {
            return Err(LinkError::ConnectionClosed);
        }
        if state.fail_init {
            return Err(LinkError::Timeout {
                command: INIT_ECU_ID,
            });
        }
        Ok(state.ecu_id)
    }

    async fn read_raw_frames(&mut self) -> LinkResult<(Frame80, Frame7D)> {
        self.simulate_latency().await;
        let mut state = self.state.lock();
        state.transactions.push(Transaction::ReadFrames);
        if !state.connected {
            return Err(LinkError::ConnectionClosed);
        }

        state.reads += 1;
        if state.fail_reads.contains(&state.reads) {
            tracing::debug!(read = state.reads, "Mock link: simulated read timeout");
            return Err(LinkError::Timeout {
                command: REQ_DATA_80,
            });
        }
        Ok(state.frames())
    }

    async fn read_iac_position(&mut self) -> LinkResult<u8> {
        let mut state = self.state.lock();
        state.transactions.push(Transaction::ReadIac);
        if !state.connected {
            return Err(LinkError::ConnectionClosed);
        }
        Ok(state.iac_position)
    }

    async fn test_actuator(&mut self, actuator: Actuator) -> ActuatorOutcome {
        self.simulate_latency().await;
        let mut state = self.state.lock();
        state.transactions.push(Transaction::Actuator(actuator));
        if !state.connected {
            return ActuatorOutcome::failed();
        }
        state.simulate_actuator(actuator)
    }

    async fn write_raw_byte(&mut self, byte: u8) -> LinkResult<()> {
        let mut state = self.state.lock();
        state.transactions.push(Transaction::WriteRaw(byte));
        if !state.connected {
            return Err(LinkError::ConnectionClosed);
        }
        if state.fail_raw_writes {
            return Err(LinkError::Io("simulated write failure".to_string()));
        }

        let response = state
            .raw_responses
            .get(&byte)
            .cloned()
            .unwrap_or_else(|| vec![byte]);
        state.pending_raw = response.into();
        Ok(())
    }

    async fn read_raw_byte(&mut self) -> Option<u8> {
        let mut state = self.state.lock();
        state.transactions.push(Transaction::ReadRaw);
        if !state.connected {
            return None;
        }
        state.pending_raw.pop_front()
    }

    async fn disconnect(&mut self) {
        let mut state = self.state.lock();
        state.transactions.push(Transaction::Disconnect);
        state.connected = false;
    }
}

/// Connector handing out clones of a template `MockLink`
#[derive(Clone)]
pub struct MockConnector {
    template: Option<MockLink>,
}

impl MockConnector {
    pub fn new(template: MockLink) -> Self {
        Self {
            template: Some(template),
        }
    }

    /// A connector whose port never opens
    pub fn unreachable() -> Self {
        Self { template: None }
    }
}

#[async_trait]
impl EcuConnector for MockConnector {
    type Link = MockLink;

    async fn connect(&self, port: &str) -> LinkResult<MockLink> {
        match &self.template {
            Some(link) => {
                tracing::debug!(port, "Mock connector: connected");
                Ok(link.clone())
            }
            None => Err(LinkError::ConnectionFailed(format!(
                "{}: no such device",
                port
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rpm_ramps_with_each_read() {
        let mut link = MockLink::new();
        let first = link.read_sample().await.unwrap();
        let second = link.read_sample().await.unwrap();

        assert_eq!(first.engine_rpm, 801);
        assert_eq!(second.engine_rpm, 802);
        assert_eq!(link.count(Transaction::ReadFrames), 2);
    }

    #[tokio::test]
    async fn test_failing_reads_are_one_based() {
        let mut link = MockLink::new().fail_reads([2]);

        assert!(link.read_raw_frames().await.is_ok());
        assert!(link.read_raw_frames().await.is_err());
        assert!(link.read_raw_frames().await.is_ok());
    }

    #[tokio::test]
    async fn test_iac_close_saturates_at_zero() {
        let mut link = MockLink::new().with_iac_position(0x18).with_iac_step(0x10);

        let first = link.test_actuator(Actuator::CloseIac).await;
        let second = link.test_actuator(Actuator::CloseIac).await;

        assert_eq!(first.position, Some(0x08));
        assert!(second.is_fully_closed());
    }

    #[tokio::test]
    async fn test_scripted_outcomes_take_priority() {
        let mut link = MockLink::new().script_actuator(
            Actuator::OpenIac,
            [ActuatorOutcome::failed()],
        );

        assert!(!link.test_actuator(Actuator::OpenIac).await.success);
        assert!(link.test_actuator(Actuator::OpenIac).await.success);
    }

    #[tokio::test]
    async fn test_raw_response_drains() {
        let mut link = MockLink::new().respond_raw(0xFF, vec![0xAB]);

        link.write_raw_byte(0xFF).await.unwrap();
        assert_eq!(link.read_raw_byte().await, Some(0xAB));
        assert_eq!(link.read_raw_byte().await, None);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let observer = MockLink::new();
        let mut link = observer.clone();

        link.disconnect().await;
        assert!(!observer.is_connected());
        assert_eq!(
            link.read_iac_position().await.unwrap_err(),
            LinkError::ConnectionClosed
        );
    }

    #[tokio::test]
    async fn test_unreachable_connector() {
        let err = MockConnector::unreachable()
            .connect("/dev/ttyUSB9")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, LinkError::ConnectionFailed(_)));
    }
}
