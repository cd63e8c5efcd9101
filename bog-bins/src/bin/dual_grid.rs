//! `bog-dual-grid`: runs the dual-account hedged grid engine against the
//! in-memory simulated exchange client (a live REST/websocket client is out
//! of scope for this crate).

use anyhow::{Context, Result};
use bog_bins::common::{init_logging, CommonArgs};
use bog_bins::controller::DualGridController;
use bog_core::config::profiles::{ConfigProfile, ProfileName};
use bog_core::exchange::SimulatedExchangeClient;
use bog_core::monitoring::alerts::{AlertManager, AlertManagerConfig};
use bog_core::resilience::KillSwitch;
use bog_core::testing::{test_candle_series, test_leverage_brackets, test_symbol_filters};
use clap::Parser;
use rust_decimal_macros::dec;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = CommonArgs::parse();
    init_logging(&args.log_level)?;

    let profile = ProfileName::from_str(&args.profile).with_context(|| format!("unknown profile '{}'", args.profile))?;
    let mut config = ConfigProfile::load(profile);
    if let Some(symbol) = args.symbol {
        config.symbol = symbol;
    }
    config.validate().context("invalid configuration")?;

    tracing::info!(symbol = %config.symbol, profile = %profile.as_str(), "starting dual-account grid engine");

    // No live exchange client exists in this crate; both legs run against the
    // deterministic simulator, seeded with a plausible channel so the engine
    // has candles to warm its ATR analyzer against.
    let seed_candles = test_candle_series(config.atr_period + 10, dec!(0.16), dec!(0.18));
    let filters = test_symbol_filters();
    let brackets = test_leverage_brackets();
    let starting_capital = dec!(10_000);

    let long_client = SimulatedExchangeClient::shared(filters, brackets.clone(), seed_candles.clone(), dec!(0.17), starting_capital);
    let short_client = SimulatedExchangeClient::shared(filters, brackets, seed_candles, dec!(0.17), starting_capital);

    let alerts = std::sync::Arc::new(AlertManager::new(AlertManagerConfig::default()));
    let kill_switch = KillSwitch::install();

    let controller = DualGridController::new(config, long_client, short_client, alerts);
    let exit_code = controller.run(kill_switch).await;

    tracing::info!(exit_code = exit_code.as_i32(), "dual-account grid engine stopped");
    Ok(ExitCode::from(exit_code.as_i32() as u8))
}
