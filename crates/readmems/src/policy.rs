//! Actuator retry and convergence policies
//!
//! Each policy drives one actuator command to completion and reports whether
//! it succeeded. Any failed transaction ends the policy at once; whether the
//! link failed or the ECU refused is only visible in the link's own logging.

use std::time::Duration;

use mems_core::{Actuator, EcuLink, IacDirection};

/// Fully-closed acknowledgements accepted before the close policy stops
pub const IAC_CLOSE_TOLERANCE: u32 = 80;

/// Result of a policy run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyReport {
    pub success: bool,
    /// Actuator transactions issued
    pub transactions: usize,
}

/// Keep sending close commands until the valve has reported fully closed
/// `IAC_CLOSE_TOLERANCE` times
///
/// The ECU keeps accepting close commands after the valve hits its stop, and
/// readings that are not yet closed do not use up the tolerance.
pub async fn close_convergence<L>(link: &mut L) -> PolicyReport
where
    L: EcuLink + ?Sized,
{
    let mut limit = IAC_CLOSE_TOLERANCE;
    let mut transactions = 0;

    loop {
        let outcome = link.test_actuator(Actuator::CloseIac).await;
        transactions += 1;

        if !outcome.success {
            tracing::warn!(transactions, "IAC close failed");
            return PolicyReport {
                success: false,
                transactions,
            };
        }
        if outcome.is_fully_closed() {
            limit -= 1;
        }
        tracing::debug!(position = ?outcome.position, remaining = limit, "IAC close step");

        if limit == 0 {
            return PolicyReport {
                success: true,
                transactions,
            };
        }
    }
}

/// Keep sending open commands while the valve reports a position below fully open
///
/// There is no iteration cap.
pub async fn open_convergence<L>(link: &mut L) -> PolicyReport
where
    L: EcuLink + ?Sized,
{
    let mut transactions = 0;

    loop {
        let outcome = link.test_actuator(Actuator::OpenIac).await;
        transactions += 1;

        if !outcome.success {
            tracing::warn!(transactions, "IAC open failed");
            return PolicyReport {
                success: false,
                transactions,
            };
        }
        tracing::debug!(position = ?outcome.position, "IAC open step");

        if !outcome.is_below_fully_open() {
            return PolicyReport {
                success: true,
                transactions,
            };
        }
    }
}

/// Run the convergence policy for `direction`
pub async fn converge<L>(link: &mut L, direction: IacDirection) -> PolicyReport
where
    L: EcuLink + ?Sized,
{
    match direction {
        IacDirection::Close => close_convergence(link).await,
        IacDirection::Open => open_convergence(link).await,
    }
}

/// Switch an actuator on, hold it for `dwell`, then switch it off
///
/// The off command is only sent if the on command succeeded; the result is
/// that of the off command.
pub async fn pulse<L>(link: &mut L, on: Actuator, off: Actuator, dwell: Duration) -> bool
where
    L: EcuLink + ?Sized,
{
    if !link.test_actuator(on).await.success {
        tracing::warn!(?on, "Actuator did not switch on, skipping off command");
        return false;
    }

    tokio::time::sleep(dwell).await;
    link.test_actuator(off).await.success
}

/// Exercise an actuator once
pub async fn momentary<L>(link: &mut L, actuator: Actuator) -> bool
where
    L: EcuLink + ?Sized,
{
    link.test_actuator(actuator).await.success
}

#[cfg(test)]
mod tests {
    use super::*;
    use mems_core::ActuatorOutcome;
    use mems_link::{MockLink, Transaction};

    fn closed() -> ActuatorOutcome {
        ActuatorOutcome::acknowledged(Some(0x00))
    }

    #[tokio::test]
    async fn test_close_tolerates_80_closed_readings() {
        let mut link = MockLink::new().with_iac_position(0x00);

        let report = close_convergence(&mut link).await;
        assert_eq!(
            report,
            PolicyReport {
                success: true,
                transactions: 80
            }
        );
        assert_eq!(link.count(Transaction::Actuator(Actuator::CloseIac)), 80);
    }

    #[tokio::test]
    async fn test_close_open_readings_do_not_count() {
        // 0x30 -> 0x20 -> 0x10 -> 0x00, then 79 more closed readings
        let mut link = MockLink::new().with_iac_position(0x40).with_iac_step(0x10);

        let report = close_convergence(&mut link).await;
        assert!(report.success);
        assert_eq!(report.transactions, 3 + 80);
    }

    #[tokio::test]
    async fn test_close_aborts_on_failure() {
        let mut link = MockLink::new().script_actuator(
            Actuator::CloseIac,
            [closed(), closed(), ActuatorOutcome::failed()],
        );

        let report = close_convergence(&mut link).await;
        assert_eq!(
            report,
            PolicyReport {
                success: false,
                transactions: 3
            }
        );
    }

    #[tokio::test]
    async fn test_open_stops_at_fully_open() {
        let mut link = MockLink::new().script_actuator(
            Actuator::OpenIac,
            [0x10, 0x50, 0xB4].map(|pos| ActuatorOutcome::acknowledged(Some(pos))),
        );

        let report = converge(&mut link, IacDirection::Open).await;
        assert_eq!(
            report,
            PolicyReport {
                success: true,
                transactions: 3
            }
        );
    }

    #[tokio::test]
    async fn test_open_aborts_on_failure() {
        let mut link = MockLink::new().script_actuator(
            Actuator::OpenIac,
            [ActuatorOutcome::acknowledged(Some(0x10)), ActuatorOutcome::failed()],
        );

        let report = open_convergence(&mut link).await;
        assert!(!report.success);
        assert_eq!(report.transactions, 2);
    }

    #[tokio::test]
    async fn test_pulse_switches_off_after_on() {
        let mut link = MockLink::new();

        assert!(pulse(&mut link, Actuator::FuelPumpOn, Actuator::FuelPumpOff, Duration::ZERO).await);
        assert_eq!(
            link.transactions(),
            vec![
                Transaction::Actuator(Actuator::FuelPumpOn),
                Transaction::Actuator(Actuator::FuelPumpOff)
            ]
        );
    }

    #[tokio::test]
    async fn test_pulse_skips_off_when_on_fails() {
        let mut link = MockLink::new()
            .script_actuator(Actuator::PtcRelayOn, [ActuatorOutcome::failed()]);

        assert!(!pulse(&mut link, Actuator::PtcRelayOn, Actuator::PtcRelayOff, Duration::ZERO).await);
        assert_eq!(link.count(Transaction::Actuator(Actuator::PtcRelayOff)), 0);
    }

    #[tokio::test]
    async fn test_pulse_reports_off_result() {
        let mut link = MockLink::new()
            .script_actuator(Actuator::AcRelayOff, [ActuatorOutcome::failed()]);

        assert!(!pulse(&mut link, Actuator::AcRelayOn, Actuator::AcRelayOff, Duration::ZERO).await);
        assert_eq!(link.actuator_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_holds_for_dwell() {
        let mut link = MockLink::new();
        let start = tokio::time::Instant::now();

        pulse(&mut link, Actuator::FuelPumpOn, Actuator::FuelPumpOff, Duration::from_secs(2)).await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_momentary_mirrors_outcome() {
        let mut link = MockLink::new()
            .script_actuator(Actuator::FireCoil, [ActuatorOutcome::failed()]);

        assert!(!momentary(&mut link, Actuator::FireCoil).await);
        assert!(momentary(&mut link, Actuator::FireCoil).await);
        assert!(momentary(&mut link, Actuator::TestInjectors).await);
    }
}
