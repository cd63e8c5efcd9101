//! Prometheus metrics for the dual-account grid engine.
//!
//! Covers trading activity (orders, fills, grid level state), risk (safe
//! leverage, net exposure, stop-loss triggers) and system health
//! (exchange connectivity, errors, uptime). There is no nanosecond-scale
//! latency histogram family here — the engine ticks at ~1Hz, not
//! tick-to-trade speed, so that kind of detail would only add noise.

use prometheus::{Counter, Gauge, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry};
use std::sync::Arc;
use tracing::info;

/// Central registry for all Prometheus metrics.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Arc<Registry>,
    trading: Arc<TradingMetrics>,
    risk: Arc<RiskMetrics>,
    system: Arc<SystemMetrics>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Arc::new(Registry::new());

        let trading = Arc::new(TradingMetrics::new(&registry)?);
        let risk = Arc::new(RiskMetrics::new(&registry)?);
        let system = Arc::new(SystemMetrics::new(&registry)?);

        info!("Prometheus metrics registry initialized");

        Ok(Self { registry, trading, risk, system })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn trading(&self) -> &TradingMetrics {
        &self.trading
    }

    pub fn risk(&self) -> &RiskMetrics {
        &self.risk
    }

    pub fn system(&self) -> &SystemMetrics {
        &self.system
    }
}

impl Default for MetricsRegistry {
    #[allow(clippy::panic)]
    fn default() -> Self {
        Self::new().unwrap_or_else(|e| {
            tracing::error!("FATAL: failed to create metrics registry: {}", e);
            panic!("cannot create metrics registry")
        })
    }
}

/// Trading activity metrics, labeled by account side (`long`/`short`).
pub struct TradingMetrics {
    pub orders_total: IntCounterVec,
    pub fills_total: IntCounterVec,
    pub volume_total: Counter,
    pub rejections_total: IntCounterVec,
    pub cancellations_total: IntCounterVec,
    pub grid_levels_by_state: IntGaugeVec,
    pub fill_rate: Gauge,
}

impl TradingMetrics {
    fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let orders_total = IntCounterVec::new(
            Opts::new("trading_orders_total", "Total number of orders submitted").namespace("bog"),
            &["account", "side", "purpose"],
        )?;
        registry.register(Box::new(orders_total.clone()))?;

        let fills_total = IntCounterVec::new(
            Opts::new("trading_fills_total", "Total number of fills received").namespace("bog"),
            &["account", "side", "purpose"],
        )?;
        registry.register(Box::new(fills_total.clone()))?;

        let volume_total = Counter::new("bog_trading_volume_usd_total", "Total trading volume in USD")?;
        registry.register(Box::new(volume_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("trading_rejections_total", "Total number of order rejections").namespace("bog"),
            &["account", "reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let cancellations_total = IntCounterVec::new(
            Opts::new("trading_cancellations_total", "Total number of order cancellations").namespace("bog"),
            &["account"],
        )?;
        registry.register(Box::new(cancellations_total.clone()))?;

        let grid_levels_by_state = IntGaugeVec::new(
            Opts::new("trading_grid_levels_by_state", "Number of grid levels currently in each state")
                .namespace("bog"),
            &["account", "state"],
        )?;
        registry.register(Box::new(grid_levels_by_state.clone()))?;

        let fill_rate = Gauge::new("bog_trading_fill_rate", "Current order fill rate (0.0 to 1.0)")?;
        registry.register(Box::new(fill_rate.clone()))?;

        Ok(Self {
            orders_total,
            fills_total,
            volume_total,
            rejections_total,
            cancellations_total,
            grid_levels_by_state,
            fill_rate,
        })
    }
}

/// Risk metrics: leverage, exposure and stop-loss state.
pub struct RiskMetrics {
    pub safe_leverage: IntGauge,
    pub net_exposure_usd: Gauge,
    pub position_size: IntGaugeVec,
    pub unrealized_pnl_usd: IntGaugeVec,
    pub daily_pnl_usd: Gauge,
    pub risk_violations_total: IntCounterVec,
    pub stop_loss_triggers_total: IntCounterVec,
    pub stop_loss_tripped: IntGauge,
}

impl RiskMetrics {
    fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let safe_leverage = IntGauge::new("bog_risk_safe_leverage", "Computed safe leverage for the active grid")?;
        registry.register(Box::new(safe_leverage.clone()))?;

        let net_exposure_usd = Gauge::new(
            "bog_risk_net_exposure_usd",
            "Absolute difference between long and short notional exposure, in USD",
        )?;
        registry.register(Box::new(net_exposure_usd.clone()))?;

        let position_size = IntGaugeVec::new(
            Opts::new("risk_position_size", "Current position size per account (base units)").namespace("bog"),
            &["account"],
        )?;
        registry.register(Box::new(position_size.clone()))?;

        let unrealized_pnl_usd = IntGaugeVec::new(
            Opts::new("risk_unrealized_pnl_usd", "Unrealized PnL per account, in USD").namespace("bog"),
            &["account"],
        )?;
        registry.register(Box::new(unrealized_pnl_usd.clone()))?;

        let daily_pnl_usd = Gauge::new("bog_risk_daily_pnl_usd", "Combined daily realized PnL in USD")?;
        registry.register(Box::new(daily_pnl_usd.clone()))?;

        let risk_violations_total = IntCounterVec::new(
            Opts::new("risk_violations_total", "Total number of risk violations").namespace("bog"),
            &["type"],
        )?;
        registry.register(Box::new(risk_violations_total.clone()))?;

        let stop_loss_triggers_total = IntCounterVec::new(
            Opts::new("risk_stop_loss_triggers_total", "Total number of stop-loss teardowns triggered")
                .namespace("bog"),
            &["reason"],
        )?;
        registry.register(Box::new(stop_loss_triggers_total.clone()))?;

        let stop_loss_tripped = IntGauge::new(
            "bog_risk_stop_loss_tripped",
            "1 if a stop-loss teardown is in progress, 0 otherwise",
        )?;
        registry.register(Box::new(stop_loss_tripped.clone()))?;

        Ok(Self {
            safe_leverage,
            net_exposure_usd,
            position_size,
            unrealized_pnl_usd,
            daily_pnl_usd,
            risk_violations_total,
            stop_loss_triggers_total,
            stop_loss_tripped,
        })
    }
}

/// System health metrics.
pub struct SystemMetrics {
    pub exchange_connected: IntGaugeVec,
    pub errors_total: IntCounterVec,
    pub memory_usage_bytes: IntGauge,
    pub uptime_seconds: IntGauge,
}

impl SystemMetrics {
    fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let exchange_connected = IntGaugeVec::new(
            Opts::new("system_exchange_connected", "Exchange connection status (1 = connected, 0 = disconnected)")
                .namespace("bog"),
            &["account"],
        )?;
        registry.register(Box::new(exchange_connected.clone()))?;

        let errors_total = IntCounterVec::new(
            Opts::new("system_errors_total", "Total system errors").namespace("bog"),
            &["component", "severity"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        let memory_usage_bytes = IntGauge::new("bog_system_memory_usage_bytes", "Memory usage in bytes")?;
        registry.register(Box::new(memory_usage_bytes.clone()))?;

        let uptime_seconds = IntGauge::new("bog_system_uptime_seconds", "System uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            exchange_connected,
            errors_total,
            memory_usage_bytes,
            uptime_seconds,
        })
    }
}
