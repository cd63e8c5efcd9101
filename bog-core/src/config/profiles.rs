//! Configuration profiles for different environments.
//!
//! - **Development**: simulated exchange client, relaxed deviation/position
//!   limits, frequent health checks for fast feedback.
//! - **Staging**: production-shaped limits at reduced size.
//! - **Production**: the full defaults for a live deployment.

use super::types::EngineConfig;
use rust_decimal_macros::dec;

/// Configuration profile name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileName {
    Development,
    Staging,
    Production,
}

impl ProfileName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Some(Self::Development),
            "staging" | "stage" => Some(Self::Staging),
            "prod" | "production" => Some(Self::Production),
            _ => None,
        }
    }
}

/// Pre-built `EngineConfig` sets for each deployment environment.
pub struct ConfigProfile;

impl ConfigProfile {
    /// Development: tiny position cap, frequent supervisor checks, wide
    /// deviation tolerance so local testing against a simulated exchange
    /// doesn't trip the stop-loss manager on noise.
    pub fn development() -> EngineConfig {
        EngineConfig {
            symbol: "DOGEUSDC".to_string(),
            atr_period: 14,
            atr_multiplier: dec!(2.0),
            atr_timeframe: "1h".to_string(),
            target_profit_rate: dec!(0.002),
            maker_fee: dec!(0.0002),
            safety_factor: dec!(0.8),
            fund_utilization: dec!(0.9),
            max_leverage: 20,
            max_open_orders: 5,
            max_orders_per_batch: 2,
            order_frequency_seconds: 3,
            take_profit_ratio: dec!(0.01),
            safe_extra_spread: dec!(0.00001),
            activation_bounds: None,
            max_grid_deviation: dec!(0.20),
            max_net_position: dec!(50),
            balance_alignment_tolerance: dec!(0.05),
            emergency_timeout_seconds: 30,
            max_stop_loss_retries: 3,
            health_check_interval_seconds: 5,
        }
    }

    /// Staging: production defaults at a reduced position cap.
    pub fn staging() -> EngineConfig {
        EngineConfig {
            max_net_position: dec!(200),
            ..Self::production()
        }
    }

    /// Production: the full defaults for a live deployment.
    pub fn production() -> EngineConfig {
        EngineConfig {
            symbol: "DOGEUSDC".to_string(),
            atr_period: 14,
            atr_multiplier: dec!(2.0),
            atr_timeframe: "1h".to_string(),
            target_profit_rate: dec!(0.002),
            maker_fee: dec!(0.0002),
            safety_factor: dec!(0.8),
            fund_utilization: dec!(0.9),
            max_leverage: 20,
            max_open_orders: 5,
            max_orders_per_batch: 2,
            order_frequency_seconds: 3,
            take_profit_ratio: dec!(0.01),
            safe_extra_spread: dec!(0.00001),
            activation_bounds: None,
            max_grid_deviation: dec!(0.10),
            max_net_position: dec!(1000),
            balance_alignment_tolerance: dec!(0.05),
            emergency_timeout_seconds: 30,
            max_stop_loss_retries: 3,
            health_check_interval_seconds: 10,
        }
    }

    pub fn load(profile: ProfileName) -> EngineConfig {
        match profile {
            ProfileName::Development => Self::development(),
            ProfileName::Staging => Self::staging(),
            ProfileName::Production => Self::production(),
        }
    }

    /// Loads a profile from the `BOG_PROFILE` environment variable, defaulting
    /// to `development` when unset or unrecognized.
    pub fn from_env() -> EngineConfig {
        let profile = std::env::var("BOG_PROFILE")
            .ok()
            .and_then(|s| ProfileName::from_str(&s))
            .unwrap_or(ProfileName::Development);

        Self::load(profile)
    }
}
