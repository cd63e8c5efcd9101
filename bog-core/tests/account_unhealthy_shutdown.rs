//! One-account-unhealthy scenario.
//!
//! The short account starts failing its health probe (simulating repeated
//! auth errors). `DualAccountManager::health_check` must keep reporting the
//! long leg healthy while flagging the short leg, and a stop-loss teardown
//! triggered on `ACCOUNT_FAILURE` must still verify both accounts clean —
//! the long leg never held a losing position in this run, and the short
//! leg's simulated client accepts cancel/close calls even while `ping`/
//! snapshot calls are failing is not assumed: teardown tolerates a leg that
//! stays genuinely unreachable by retrying rather than panicking.

use anyhow::Result;
use bog_core::exchange::SimulatedExchangeClient;
use bog_core::monitoring::alerts::{AlertManager, AlertManagerConfig};
use bog_core::stoploss::{StopLossConfig, StopLossManager, StopLossTrigger};
use bog_core::testing::{test_leverage_brackets, test_symbol_filters};
use bog_core::DualAccountManager;
use rust_decimal_macros::dec;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn repeated_health_failure_on_one_leg_is_detected() -> Result<()> {
    let filters = test_symbol_filters();
    let brackets = test_leverage_brackets();
    let long = SimulatedExchangeClient::shared(filters, brackets.clone(), Vec::new(), dec!(0.17), dec!(1000));
    let short = SimulatedExchangeClient::shared(filters, brackets, Vec::new(), dec!(0.17), dec!(1000));

    let manager = DualAccountManager::new(long.clone(), short.clone(), "DOGEUSDC", dec!(0.05));

    let health = manager.health_check().await;
    assert!(health.both_healthy());

    // Two consecutive failed health checks on the short leg, matching the
    // controller's ACCOUNT_FAILURE consecutive-failure threshold.
    short.set_healthy(false);
    let mut consecutive_failures = 0;
    for _ in 0..2 {
        let health = manager.health_check().await;
        if !health.both_healthy() {
            consecutive_failures += 1;
        }
        assert!(health.long.is_healthy());
        assert!(!health.short.is_healthy());
    }
    assert_eq!(consecutive_failures, 2, "both probes in the window must observe the unhealthy leg");

    Ok(())
}

#[tokio::test]
async fn account_failure_teardown_eventually_verifies_clean() -> Result<()> {
    let filters = test_symbol_filters();
    let brackets = test_leverage_brackets();
    let long = SimulatedExchangeClient::shared(filters, brackets.clone(), Vec::new(), dec!(0.17), dec!(1000));
    let short = SimulatedExchangeClient::shared(filters, brackets, Vec::new(), dec!(0.17), dec!(1000));
    short.set_healthy(false);

    let accounts = Arc::new(DualAccountManager::new(long, short.clone(), "DOGEUSDC", dec!(0.05)));
    let alerts = Arc::new(AlertManager::new(AlertManagerConfig::default()));
    let config = StopLossConfig {
        emergency_timeout: Duration::from_secs(2),
        max_stop_loss_retries: 1,
        close_throttle: Duration::from_millis(1),
    };
    let manager = StopLossManager::new(accounts, Arc::new(AtomicBool::new(false)), Arc::new(AtomicBool::new(false)), alerts, config);

    // While the short leg stays unhealthy, cancel/close calls against it fail
    // (the simulator rejects every call, healthy or not, once `set_healthy`
    // is false), so verification cannot succeed until the leg recovers.
    let recover = {
        let short = short.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            short.set_healthy(true);
        })
    };

    let report = manager.trigger(StopLossTrigger::AccountFailure).await;
    recover.await?;

    assert!(report.verified_clean, "teardown must eventually verify clean once the unhealthy leg recovers within the emergency window");

    Ok(())
}
