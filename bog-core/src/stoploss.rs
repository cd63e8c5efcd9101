//! Orderly teardown of both accounts on any stop condition: cancel resting
//! orders, close open positions, verify clean, and retry into an emergency
//! loop if verification keeps failing. Guarded by a single `AtomicBool`
//! latch so a second concurrent trigger collapses into the run already in
//! progress instead of racing it.

use crate::account::DualAccountManager;
use crate::core::errors::EngineError;
use crate::core::types::GridParameters;
use crate::exchange::ExchangeClient;
use crate::monitoring::alerts::{Alert, AlertCategory, AlertManager, AlertSeverity};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// The four conditions that trigger an unconditional shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopLossTrigger {
    AtrChannelBreakout,
    AccountFailure,
    EmergencyStop,
    StartupFailure,
}

impl StopLossTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            StopLossTrigger::AtrChannelBreakout => "ATR_CHANNEL_BREAKOUT",
            StopLossTrigger::AccountFailure => "ACCOUNT_FAILURE",
            StopLossTrigger::EmergencyStop => "EMERGENCY_STOP",
            StopLossTrigger::StartupFailure => "STARTUP_FAILURE",
        }
    }
}

impl std::fmt::Display for StopLossTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopLossConfig {
    pub emergency_timeout: Duration,
    pub max_stop_loss_retries: u32,
    pub close_throttle: Duration,
}

impl Default for StopLossConfig {
    fn default() -> Self {
        Self {
            emergency_timeout: Duration::from_secs(30),
            max_stop_loss_retries: 3,
            close_throttle: Duration::from_millis(500),
        }
    }
}

/// Outcome of one `trigger()` call: whether teardown reached the clean-state
/// invariant, and via which path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownReport {
    pub trigger: StopLossTrigger,
    pub verified_clean: bool,
    pub entered_emergency_loop: bool,
}

/// Holds a non-owning reference to the dual-account manager and to both
/// executors' shutdown flags: the controller owns the executors, this
/// manager only borrows their shutdown handles. `stop_in_progress` collapses
/// concurrent triggers to one run.
pub struct StopLossManager<C: ExchangeClient> {
    accounts: Arc<DualAccountManager<C>>,
    long_shutdown: Arc<AtomicBool>,
    short_shutdown: Arc<AtomicBool>,
    alerts: Arc<AlertManager>,
    config: StopLossConfig,
    stop_in_progress: Arc<AtomicBool>,
}

impl<C: ExchangeClient> StopLossManager<C> {
    pub fn new(
        accounts: Arc<DualAccountManager<C>>,
        long_shutdown: Arc<AtomicBool>,
        short_shutdown: Arc<AtomicBool>,
        alerts: Arc<AlertManager>,
        config: StopLossConfig,
    ) -> Self {
        Self {
            accounts,
            long_shutdown,
            short_shutdown,
            alerts,
            config,
            stop_in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_tripped(&self) -> bool {
        self.stop_in_progress.load(Ordering::SeqCst)
    }

    /// Closed-interval breach check: price at or beyond either stop-loss
    /// line trips the gate (equality counts as a breach).
    pub fn check_price_breach(&self, mid: Decimal, params: &GridParameters) -> Option<StopLossTrigger> {
        if mid >= params.stop_loss_upper || mid <= params.stop_loss_lower {
            Some(StopLossTrigger::AtrChannelBreakout)
        } else {
            None
        }
    }

    /// Runs the full cancel/close/verify/retry sequence. Idempotent: a
    /// second concurrent call observes the latch already held and returns
    /// immediately without re-running teardown.
    pub async fn trigger(&self, reason: StopLossTrigger) -> TeardownReport {
        if self
            .stop_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(trigger = %reason, "stop-loss already in progress, collapsing duplicate trigger");
            return TeardownReport { trigger: reason, verified_clean: false, entered_emergency_loop: false };
        }

        error!(trigger = %reason, "CRITICAL: stop-loss triggered, tearing down both accounts");
        let _ = self.alerts.send(
            Alert::new(AlertCategory::Risk, "stop_loss_triggered", AlertSeverity::Critical, format!("stop-loss trigger: {reason}"))
                .with_detail("trigger", reason.as_str()),
        );

        self.long_shutdown.store(true, Ordering::SeqCst);
        self.short_shutdown.store(true, Ordering::SeqCst);

        let deadline = Instant::now() + self.config.emergency_timeout;
        self.cancel_and_close().await;

        let mut verified = self.verify_with_log().await;
        let mut attempt = 0;
        while !verified && attempt < self.config.max_stop_loss_retries {
            attempt += 1;
            warn!(attempt, "teardown verification failed, retrying cancel+close");
            self.cancel_and_close().await;
            verified = self.verify_with_log().await;
        }

        let mut entered_emergency_loop = false;
        if !verified {
            entered_emergency_loop = true;
            warn!("entering emergency teardown loop until deadline");
            while Instant::now() < deadline {
                self.cancel_and_close().await;
                verified = self.verify_with_log().await;
                if verified {
                    break;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }

        if verified {
            info!(trigger = %reason, "teardown complete: both accounts clean");
            let _ = self.alerts.send(Alert::new(
                AlertCategory::Risk,
                "stop_loss_teardown_clean",
                AlertSeverity::Info,
                "teardown verified clean",
            ));
        } else {
            error!(trigger = %reason, "CRITICAL: emergency teardown did not verify clean within deadline");
            let _ = self.alerts.send(Alert::new(
                AlertCategory::Risk,
                "stop_loss_teardown_failed",
                AlertSeverity::Critical,
                "emergency teardown did not verify clean state before deadline",
            ));
        }

        TeardownReport { trigger: reason, verified_clean: verified, entered_emergency_loop }
    }

    /// Steps 2-4: cancel all resting orders, then close every non-zero
    /// position worst-PnL-first with a throttling sleep between closes
    /// (both handled inside `DualAccountManager::close_all_positions`).
    async fn cancel_and_close(&self) {
        let (long_cancel, short_cancel) = self.accounts.cancel_all_orders().await;
        log_leg_result("long", "cancel_all_orders", long_cancel);
        log_leg_result("short", "cancel_all_orders", short_cancel);

        let (long_close, short_close) = self.accounts.close_all_positions().await;
        log_leg_result("long", "close_all_positions", long_close);
        log_leg_result("short", "close_all_positions", short_close);
    }

    async fn verify_with_log(&self) -> bool {
        match self.accounts.verify_clean().await {
            Ok(clean) => clean,
            Err(e) => {
                warn!(error = %e, "verify_clean failed, treating as not-yet-clean");
                false
            }
        }
    }
}

fn log_leg_result(leg: &'static str, step: &'static str, result: Result<(), EngineError>) {
    if let Err(e) = result {
        warn!(leg, step, error = %e, "teardown step failed on one leg, continuing");
    }
}
