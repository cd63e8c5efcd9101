//! Bog Core - dual-account hedged grid-trading engine for perpetual futures.
//!
//! Two accounts on the same exchange, one LONG-only and one SHORT-only, each
//! running a symmetric grid ladder across an ATR-derived price channel. Every
//! monetary figure is `rust_decimal::Decimal`; the exchange boundary is an
//! `async_trait`, with a deterministic in-memory simulator as the only
//! concrete implementation shipped here — a live REST/websocket client is out
//! of scope for this crate.
//!
//! ## Modules
//! - `core`: domain types, grid-level state machine, error taxonomy, precision
//! - `config`: `EngineConfig`, per-environment profiles, redacted `Secrets`
//! - `exchange`: the `ExchangeClient` trait and its simulated implementation
//! - `shared`: single-writer/multi-reader market data shared across tasks
//! - `executor`: the per-account, per-side grid control loop
//! - `account`: the dual-account manager (balance sync, health, teardown fan-out)
//! - `stoploss`: orderly dual-account teardown on any stop condition
//! - `risk`: rate limiting for outbound exchange calls
//! - `resilience`: backoff, circuit breaker, signal-driven kill switch
//! - `monitoring`: Prometheus metrics and the alert manager
//! - `testing`: fixtures shared by this crate's and downstream crates' tests

pub mod account;
pub mod config;
pub mod core;
pub mod exchange;
pub mod executor;
pub mod monitoring;
pub mod resilience;
pub mod risk;
pub mod shared;
pub mod stoploss;
pub mod testing;

pub use crate::core::errors::{EngineError, Severity};
pub use crate::core::types::{AccountSide, GridParameters, Side};
pub use account::DualAccountManager;
pub use exchange::ExchangeClient;
pub use executor::GridExecutor;
pub use shared::SharedMarketData;
pub use stoploss::{StopLossManager, StopLossTrigger};
