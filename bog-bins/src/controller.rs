//! Top-level orchestrator: the one long-lived task that wires the account
//! manager, both grid executors and the stop-loss manager together and runs
//! the startup sequence, 1Hz executor loops, 10s supervisor loop, and
//! shutdown.
//!
//! One struct owns every subsystem; `tokio::spawn` runs each independent
//! loop, and a plain `Arc<AtomicBool>` shutdown flag is checked at the top
//! of each loop. Lives in `bog-bins` rather than `bog-core` because it is
//! the one component that needs both `bog-core`'s executor/account plumbing
//! and `bog-strategies`' grid calculator — putting it in `bog-core` would
//! make that crate depend on its own downstream consumer.

use bog_core::account::DualAccountManager;
use bog_core::config::types::EngineConfig;
use bog_core::core::errors::EngineError;
use bog_core::core::types::{AccountSide, ExecutorConfig, GridParameters};
use bog_core::exchange::ExchangeClient;
use bog_core::executor::GridExecutor;
use bog_core::monitoring::alerts::{Alert, AlertCategory, AlertManager, AlertSeverity};
use bog_core::resilience::KillSwitch;
use bog_core::shared::{PriceSnapshot, SharedMarketData};
use bog_core::stoploss::{StopLossConfig, StopLossManager, StopLossTrigger};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Process exit codes for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Clean = 0,
    StartupFailure = 1,
    StopLossTripped = 2,
    EmergencyTeardownDidNotVerify = 3,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Extra candles fetched beyond `atr_period` so the RMA has room to warm up
/// smoothly rather than starting exactly at its seed boundary.
const CANDLE_WARMUP_BUFFER: usize = 10;

/// Consecutive account-health failures before `ACCOUNT_FAILURE` trips.
const ACCOUNT_FAILURE_THRESHOLD: u32 = 2;

pub struct DualGridController<C: ExchangeClient> {
    config: EngineConfig,
    accounts: Arc<DualAccountManager<C>>,
    shared: Arc<SharedMarketData>,
    alerts: Arc<AlertManager>,
}

impl<C: ExchangeClient + 'static> DualGridController<C> {
    pub fn new(config: EngineConfig, long_client: Arc<C>, short_client: Arc<C>, alerts: Arc<AlertManager>) -> Self {
        let accounts = Arc::new(DualAccountManager::new(long_client, short_client, config.symbol.clone(), config.balance_alignment_tolerance));
        let shared = Arc::new(SharedMarketData::new(config.atr_period + CANDLE_WARMUP_BUFFER));
        Self { config, accounts, shared, alerts }
    }

    /// Runs startup, the running phase, and shutdown end to end. Returns the
    /// exit code the binary should surface to the OS.
    pub async fn run(self, kill_switch: KillSwitch) -> ExitCode {
        let params = match self.startup().await {
            Ok(params) => params,
            Err(e) => {
                error!(error = %e, "CRITICAL: STARTUP_FAILURE");
                let _ = self.alerts.send(Alert::new(AlertCategory::System, "startup_failure", AlertSeverity::Critical, e.to_string()));
                let stoploss = self.stoploss_manager(Arc::new(AtomicBool::new(true)), Arc::new(AtomicBool::new(true)));
                let report = stoploss.trigger(StopLossTrigger::StartupFailure).await;
                return if report.verified_clean { ExitCode::StartupFailure } else { ExitCode::EmergencyTeardownDidNotVerify };
            }
        };

        let long_shutdown = Arc::new(AtomicBool::new(false));
        let short_shutdown = Arc::new(AtomicBool::new(false));
        let stoploss = Arc::new(self.stoploss_manager(long_shutdown.clone(), short_shutdown.clone()));

        let long_executor = GridExecutor::new(
            self.accounts.long_client(),
            self.shared.clone(),
            params.clone(),
            self.executor_config(AccountSide::Long),
            self.accounts.long_client().get_symbol_filters(&self.config.symbol).await.unwrap_or_else(|_| unreachable_filters()),
            long_shutdown.clone(),
        );
        let short_executor = GridExecutor::new(
            self.accounts.short_client(),
            self.shared.clone(),
            params.clone(),
            self.executor_config(AccountSide::Short),
            self.accounts.short_client().get_symbol_filters(&self.config.symbol).await.unwrap_or_else(|_| unreachable_filters()),
            short_shutdown.clone(),
        );

        let long_handle = tokio::spawn(run_executor_loop(long_executor, long_shutdown.clone()));
        let short_handle = tokio::spawn(run_executor_loop(short_executor, short_shutdown.clone()));

        let trigger = self.supervise(&params, &stoploss, &kill_switch, &long_handle, &short_handle).await;

        long_shutdown.store(true, Ordering::SeqCst);
        short_shutdown.store(true, Ordering::SeqCst);
        let _ = long_handle.await;
        let _ = short_handle.await;

        if stoploss.is_tripped() {
            // teardown already ran inside supervise() via stoploss.trigger()
            return exit_code_for(trigger);
        }

        let report = stoploss.trigger(trigger).await;
        if report.verified_clean {
            ExitCode::Clean
        } else {
            ExitCode::EmergencyTeardownDidNotVerify
        }
    }

    fn stoploss_manager(&self, long_shutdown: Arc<AtomicBool>, short_shutdown: Arc<AtomicBool>) -> StopLossManager<C> {
        StopLossManager::new(
            self.accounts.clone(),
            long_shutdown,
            short_shutdown,
            self.alerts.clone(),
            StopLossConfig {
                emergency_timeout: Duration::from_secs(self.config.emergency_timeout_seconds),
                max_stop_loss_retries: self.config.max_stop_loss_retries,
                close_throttle: Duration::from_millis(500),
            },
        )
    }

    fn executor_config(&self, side: AccountSide) -> ExecutorConfig {
        ExecutorConfig {
            symbol: self.config.symbol.clone(),
            side,
            max_open_orders: self.config.max_open_orders,
            max_orders_per_batch: self.config.max_orders_per_batch,
            order_frequency_seconds: self.config.order_frequency_seconds,
            activation_bounds: self.config.activation_bounds,
            take_profit_ratio: self.config.take_profit_ratio,
            safe_extra_spread: self.config.safe_extra_spread,
            max_grid_deviation: self.config.max_grid_deviation,
        }
    }

    /// Connects both accounts, sets hedge mode, runs pre-start cleanup,
    /// checks balance alignment, seeds the ATR analyzer, freezes grid
    /// parameters, sets leverage, and publishes the initial price.
    async fn startup(&self) -> Result<Arc<GridParameters>, EngineError> {
        let long = self.accounts.long_client();
        let short = self.accounts.short_client();

        // Step 1: connect, verify hedge mode, filters cached implicitly via
        // get_symbol_filters calls made by each executor at construction.
        long.ping().await?;
        short.ping().await?;
        long.set_position_mode(true).await?;
        short.set_position_mode(true).await?;

        // Step 2: unconditional pre-start cleanup.
        self.pre_start_cleanup().await?;

        // Step 3: balance advisory, warn-only.
        let _ = self.accounts.check_balance_alignment().await;

        // Step 4: ingest candles and compute GridParameters once.
        let candles = long.get_candles(&self.config.symbol, &self.config.atr_timeframe, self.config.atr_period + CANDLE_WARMUP_BUFFER).await?;
        for candle in &candles {
            self.shared.push_candle(*candle);
        }

        let atr = bog_strategies::compute_atr(&candles, self.config.atr_period, self.config.atr_multiplier)
            .map_err(|e| EngineError::AtrError { message: e.to_string() })?;

        let (long_snapshot, short_snapshot) = self.accounts.sync_account_info().await?;
        let filters = long.get_symbol_filters(&self.config.symbol).await?;
        let brackets = long.get_leverage_brackets(&self.config.symbol).await?;

        let inputs = bog_strategies::GridCalcInputs {
            atr,
            filters,
            brackets,
            margin_long: long_snapshot.available_balance,
            margin_short: short_snapshot.available_balance,
            safety_factor: self.config.safety_factor,
            target_profit_rate: self.config.target_profit_rate,
            maker_fee: self.config.maker_fee,
            max_leverage: self.config.max_leverage,
            fund_utilization: self.config.fund_utilization,
        };
        let params = bog_strategies::calculate_grid_parameters(&inputs).map_err(|e| EngineError::ValidationError {
            field: "grid_parameters".into(),
            message: e.to_string(),
        })?;

        long.set_leverage(&self.config.symbol, params.safe_leverage).await?;
        short.set_leverage(&self.config.symbol, params.safe_leverage).await?;

        self.shared
            .set_parameters(params.clone())
            .map_err(|_| EngineError::ValidationError { field: "grid_parameters".into(), message: "parameters already frozen".into() })?;

        let ticker = long.get_book_ticker(&self.config.symbol).await?;
        self.shared.publish_price(PriceSnapshot::new(ticker.best_bid, ticker.best_ask));

        Ok(self.shared.parameters().expect("just set"))
    }

    async fn pre_start_cleanup(&self) -> Result<(), EngineError> {
        let (lc, sc) = self.accounts.cancel_all_orders().await;
        lc?;
        sc?;
        let (lp, sp) = self.accounts.close_all_positions().await;
        lp?;
        sp?;

        for attempt in 0..3 {
            if self.accounts.verify_clean().await? {
                return Ok(());
            }
            warn!(attempt, "pre-start cleanup did not verify clean yet, retrying");
            let (lc, sc) = self.accounts.cancel_all_orders().await;
            let _ = lc;
            let _ = sc;
            let (lp, sp) = self.accounts.close_all_positions().await;
            let _ = lp;
            let _ = sp;
        }

        Err(EngineError::PositionError { symbol: self.config.symbol.clone(), message: "could not verify clean state before startup".into() })
    }

    /// The 10s supervisor loop. Returns the trigger that ended the run (an
    /// external stop request is modeled as `EmergencyStop`).
    async fn supervise(
        &self,
        params: &Arc<GridParameters>,
        stoploss: &Arc<StopLossManager<C>>,
        kill_switch: &KillSwitch,
        long_handle: &tokio::task::JoinHandle<()>,
        short_handle: &tokio::task::JoinHandle<()>,
    ) -> StopLossTrigger {
        let mut ticker = tokio::time::interval(Duration::from_secs(10));
        let mut consecutive_account_failures = 0u32;

        loop {
            ticker.tick().await;

            if kill_switch.should_stop() {
                return StopLossTrigger::EmergencyStop;
            }
            if self.shared.shutdown_requested() {
                if let Some(price) = self.shared.latest_price() {
                    if let Some(trigger) = stoploss.check_price_breach(price.mid, params) {
                        return trigger;
                    }
                }
                return StopLossTrigger::EmergencyStop;
            }
            if long_handle.is_finished() || short_handle.is_finished() {
                error!("an executor task exited unexpectedly");
                return StopLossTrigger::AccountFailure;
            }

            let health = self.accounts.health_check().await;
            if health.both_healthy() {
                consecutive_account_failures = 0;
            } else {
                consecutive_account_failures += 1;
                warn!(consecutive_account_failures, "account health check failed");
                if consecutive_account_failures >= ACCOUNT_FAILURE_THRESHOLD {
                    return StopLossTrigger::AccountFailure;
                }
            }

            if let Ok((long_snapshot, short_snapshot)) = self.accounts.sync_account_info().await {
                let long_size: Decimal = long_snapshot.positions.iter().map(|p| p.size).sum();
                let short_size: Decimal = short_snapshot.positions.iter().map(|p| p.size).sum();
                let net = (long_size - short_size).abs();
                if net > self.config.max_net_position {
                    warn!(net = %net, max = %self.config.max_net_position, "net exposure exceeded cap");
                    return StopLossTrigger::EmergencyStop;
                }
            }

            if let Some(price) = self.shared.latest_price() {
                if let Some(trigger) = stoploss.check_price_breach(price.mid, params) {
                    return trigger;
                }
            }
        }
    }
}

fn exit_code_for(trigger: StopLossTrigger) -> ExitCode {
    match trigger {
        StopLossTrigger::StartupFailure => ExitCode::StartupFailure,
        _ => ExitCode::StopLossTripped,
    }
}

/// Symbol filters are fetched once at startup; a failure here means the
/// exchange client itself is unreachable, which `startup()` already turns
/// into a `STARTUP_FAILURE` before any executor is constructed. This only
/// backstops a filters fetch failing after startup already succeeded once.
fn unreachable_filters() -> bog_core::core::types::SymbolFilters {
    bog_core::core::types::SymbolFilters {
        price_tick: Decimal::ZERO,
        qty_step: Decimal::ZERO,
        min_qty: Decimal::ZERO,
        max_qty: Decimal::ZERO,
        min_notional: Decimal::ZERO,
        price_precision: 0,
        qty_precision: 0,
    }
}

/// Drives one executor at ~1 Hz until its shutdown flag is set; the two
/// executors run independently of each other.
async fn run_executor_loop<C: ExchangeClient>(mut executor: GridExecutor<C>, shutdown: Arc<AtomicBool>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    while !shutdown.load(Ordering::SeqCst) {
        ticker.tick().await;
        if let Err(e) = executor.tick().await {
            error!(account_side = %executor.account_side, error = %e, "executor tick failed");
            if !e.recoverable() {
                shutdown.store(true, Ordering::SeqCst);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bog_core::config::profiles::ConfigProfile;
    use bog_core::exchange::SimulatedExchangeClient;
    use bog_core::monitoring::alerts::AlertManagerConfig;
    use bog_core::testing::{test_candle_series, test_leverage_brackets, test_symbol_filters};
    use rust_decimal_macros::dec;

    fn config() -> EngineConfig {
        let mut cfg = ConfigProfile::development();
        cfg.symbol = "DOGEUSDC".to_string();
        cfg.atr_period = 5;
        cfg
    }

    fn clients() -> (Arc<SimulatedExchangeClient>, Arc<SimulatedExchangeClient>) {
        let candles = test_candle_series(20, dec!(0.16), dec!(0.18));
        let long = SimulatedExchangeClient::shared(test_symbol_filters(), test_leverage_brackets(), candles.clone(), dec!(0.17), dec!(1000));
        let short = SimulatedExchangeClient::shared(test_symbol_filters(), test_leverage_brackets(), candles, dec!(0.17), dec!(1000));
        (long, short)
    }

    #[tokio::test]
    async fn startup_computes_and_freezes_grid_parameters() {
        let (long, short) = clients();
        let alerts = Arc::new(AlertManager::new(AlertManagerConfig::default()));
        let controller = DualGridController::new(config(), long, short, alerts);

        let params = controller.startup().await.unwrap();
        assert!(params.upper > params.lower);
        assert!(controller.shared.parameters().is_some());
    }

    #[tokio::test]
    async fn startup_fails_cleanly_when_account_unreachable() {
        let (long, short) = clients();
        short.set_healthy(false);
        let alerts = Arc::new(AlertManager::new(AlertManagerConfig::default()));
        let controller = DualGridController::new(config(), long, short, alerts);

        assert!(controller.startup().await.is_err());
    }

    #[tokio::test]
    async fn startup_fails_cleanly_when_capital_is_insufficient() {
        let candles = test_candle_series(20, dec!(0.16), dec!(0.18));
        let long = SimulatedExchangeClient::shared(test_symbol_filters(), test_leverage_brackets(), candles.clone(), dec!(0.17), dec!(0.05));
        let short = SimulatedExchangeClient::shared(test_symbol_filters(), test_leverage_brackets(), candles, dec!(0.17), dec!(0.05));
        let alerts = Arc::new(AlertManager::new(AlertManagerConfig::default()));
        let controller = DualGridController::new(config(), long, short, alerts);

        let err = controller.startup().await.unwrap_err();
        assert!(matches!(err, EngineError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn exit_code_values_match_spec() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::StartupFailure.as_i32(), 1);
        assert_eq!(ExitCode::StopLossTripped.as_i32(), 2);
        assert_eq!(ExitCode::EmergencyTeardownDidNotVerify.as_i32(), 3);
    }
}
