//! Configuration structures for the dual-account grid engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every tunable the engine freezes at startup. None of this is recomputed
/// mid-run — changing a grid's shape requires restarting the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub symbol: String,

    /// Number of candles the ATR analyzer smooths over.
    pub atr_period: usize,
    /// Channel-width multiplier applied to ATR (2.0 in this spec; legacy
    /// configs using ~0.26 as a spacing multiplier are superseded).
    pub atr_multiplier: Decimal,
    /// Candle interval the ATR analyzer consumes, e.g. "1h".
    pub atr_timeframe: String,

    pub target_profit_rate: Decimal,
    pub maker_fee: Decimal,
    pub safety_factor: Decimal,
    pub fund_utilization: Decimal,
    pub max_leverage: u32,

    pub max_open_orders: usize,
    pub max_orders_per_batch: usize,
    pub order_frequency_seconds: u64,
    pub take_profit_ratio: Decimal,
    pub safe_extra_spread: Decimal,
    pub activation_bounds: Option<(Decimal, Decimal)>,

    pub max_grid_deviation: Decimal,
    pub max_net_position: Decimal,
    pub balance_alignment_tolerance: Decimal,

    pub emergency_timeout_seconds: u64,
    pub max_stop_loss_retries: u32,
    pub health_check_interval_seconds: u64,
}

/// Per-account API credentials, loaded from the environment and never
/// written to logs: the `Debug` impl redacts every field.
#[derive(Clone, Serialize, Deserialize)]
pub struct Secrets {
    pub long_api_key: String,
    pub long_api_secret: String,
    pub short_api_key: String,
    pub short_api_secret: String,
}

impl Secrets {
    /// Loads credentials from the conventional `BOG_LONG_*` / `BOG_SHORT_*`
    /// environment variables.
    pub fn from_env() -> Result<Self, std::env::VarError> {
        Ok(Self {
            long_api_key: std::env::var("BOG_LONG_API_KEY")?,
            long_api_secret: std::env::var("BOG_LONG_API_SECRET")?,
            short_api_key: std::env::var("BOG_SHORT_API_KEY")?,
            short_api_secret: std::env::var("BOG_SHORT_API_SECRET")?,
        })
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("long_api_key", &"<redacted>")
            .field("long_api_secret", &"<redacted>")
            .field("short_api_key", &"<redacted>")
            .field("short_api_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_debug_never_prints_values() {
        let secrets = Secrets {
            long_api_key: "super-secret-key".into(),
            long_api_secret: "super-secret-secret".into(),
            short_api_key: "another-secret".into(),
            short_api_secret: "yet-another".into(),
        };

        let debug = format!("{:?}", secrets);
        assert!(!debug.contains("super-secret-key"));
        assert!(!debug.contains("super-secret-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
