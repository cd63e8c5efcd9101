//! Runtime configuration for the dual-account grid engine.
//!
//! All values are frozen once the controller starts. Three profiles cover
//! development, staging, and production; secrets are loaded separately from
//! the environment and never appear in a config file.

pub mod profiles;
pub mod types;

pub use profiles::{ConfigProfile, ProfileName};
pub use types::{EngineConfig, Secrets};

use anyhow::{bail, Result};
use rust_decimal::Decimal;

impl EngineConfig {
    /// Sanity-checks the frozen configuration before the controller starts.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            bail!("symbol must not be empty");
        }
        if self.atr_period < 2 {
            bail!("atr_period must be >= 2, got {}", self.atr_period);
        }
        if self.atr_multiplier <= Decimal::ZERO {
            bail!("atr_multiplier must be positive");
        }
        if self.target_profit_rate <= Decimal::ZERO {
            bail!("target_profit_rate must be positive");
        }
        if self.safety_factor <= Decimal::ZERO || self.safety_factor > Decimal::ONE {
            bail!("safety_factor must be in (0, 1]");
        }
        if self.fund_utilization <= Decimal::ZERO || self.fund_utilization > Decimal::ONE {
            bail!("fund_utilization must be in (0, 1]");
        }
        if self.max_leverage == 0 {
            bail!("max_leverage must be positive");
        }
        if self.max_open_orders == 0 {
            bail!("max_open_orders must be positive");
        }
        if self.max_orders_per_batch == 0 {
            bail!("max_orders_per_batch must be positive");
        }
        if self.take_profit_ratio <= Decimal::ZERO {
            bail!("take_profit_ratio must be positive");
        }
        if self.max_grid_deviation <= Decimal::ZERO {
            bail!("max_grid_deviation must be positive");
        }
        if self.max_net_position <= Decimal::ZERO {
            bail!("max_net_position must be positive");
        }
        if let Some((low, high)) = self.activation_bounds {
            if low >= high {
                bail!("activation_bounds low must be < high");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_profile_validates() {
        assert!(ConfigProfile::development().validate().is_ok());
        assert!(ConfigProfile::staging().validate().is_ok());
        assert!(ConfigProfile::production().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_safety_factor() {
        let mut cfg = ConfigProfile::production();
        cfg.safety_factor = rust_decimal_macros::dec!(1.5);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_empty_symbol() {
        let mut cfg = ConfigProfile::production();
        cfg.symbol = String::new();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_activation_bounds() {
        let mut cfg = ConfigProfile::production();
        cfg.activation_bounds = Some((rust_decimal_macros::dec!(0.20), rust_decimal_macros::dec!(0.10)));
        assert!(cfg.validate().is_err());
    }
}
