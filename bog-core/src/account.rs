//! Wraps the LONG and SHORT exchange account connections behind one handle.
//! Both legs are fetched in parallel via `tokio::try_join!`, preferring
//! structured concurrency over manually spawned and joined tasks for this
//! fixed, small fan-out.

use crate::core::errors::EngineError;
use crate::core::types::AccountSnapshot;
use crate::exchange::ExchangeClient;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-account connectivity/permission probe result.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountHealth {
    pub connected: bool,
    pub balance_non_negative: bool,
    pub error: Option<String>,
}

impl AccountHealth {
    fn healthy() -> Self {
        Self { connected: true, balance_non_negative: true, error: None }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self { connected: false, balance_non_negative: false, error: Some(message.into()) }
    }

    pub fn is_healthy(&self) -> bool {
        self.connected && self.balance_non_negative && self.error.is_none()
    }
}

/// Health results for both accounts from one `health_check()` call.
#[derive(Debug, Clone, PartialEq)]
pub struct DualHealth {
    pub long: AccountHealth,
    pub short: AccountHealth,
}

impl DualHealth {
    pub fn both_healthy(&self) -> bool {
        self.long.is_healthy() && self.short.is_healthy()
    }
}

/// Balance comparison between the two legs of the hedge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceAlignment {
    pub diff: Decimal,
    pub ratio: Decimal,
    pub aligned: bool,
}

/// Owns both exchange client handles. `sync_account_info`, `unified_margin`
/// and `balance_alignment` are the three calls the grid calculator and
/// controller consume; `cancel_all_orders`/`close_all_positions` are the
/// fan-out primitives the stop-loss manager composes into its teardown.
pub struct DualAccountManager<C: ExchangeClient> {
    long: Arc<C>,
    short: Arc<C>,
    symbol: String,
    balance_alignment_tolerance: Decimal,
}

impl<C: ExchangeClient> DualAccountManager<C> {
    pub fn new(long: Arc<C>, short: Arc<C>, symbol: impl Into<String>, balance_alignment_tolerance: Decimal) -> Self {
        Self { long, short, symbol: symbol.into(), balance_alignment_tolerance }
    }

    pub fn long_client(&self) -> Arc<C> {
        self.long.clone()
    }

    pub fn short_client(&self) -> Arc<C> {
        self.short.clone()
    }

    /// Fetches both account snapshots in parallel. Fails if either fetch
    /// fails — a grid calculation seeded from only one account's balance
    /// would silently under- or over-size the other leg.
    pub async fn sync_account_info(&self) -> Result<(AccountSnapshot, AccountSnapshot), EngineError> {
        tokio::try_join!(self.long.get_account_snapshot(), self.short.get_account_snapshot())
    }

    /// The smaller of the two accounts' available balances — this is the
    /// figure the grid calculator sizes every level against, so neither leg
    /// can be asked to fund more than it actually has.
    pub fn unified_margin(long: &AccountSnapshot, short: &AccountSnapshot) -> Decimal {
        long.available_balance.min(short.available_balance)
    }

    pub fn balance_alignment(long: &AccountSnapshot, short: &AccountSnapshot, tolerance: Decimal) -> BalanceAlignment {
        let diff = (long.available_balance - short.available_balance).abs();
        let larger = long.available_balance.max(short.available_balance);
        let ratio = if larger.is_zero() {
            Decimal::ONE
        } else {
            Decimal::ONE - diff / larger
        };
        BalanceAlignment { diff, ratio, aligned: ratio >= Decimal::ONE - tolerance }
    }

    pub async fn check_balance_alignment(&self) -> Result<BalanceAlignment, EngineError> {
        let (long, short) = self.sync_account_info().await?;
        let alignment = Self::balance_alignment(&long, &short, self.balance_alignment_tolerance);
        if !alignment.aligned {
            warn!(
                diff = %alignment.diff,
                ratio = %alignment.ratio,
                "accounts are not balance-aligned; manual transfer recommended (out of scope for this engine)"
            );
        }
        Ok(alignment)
    }

    /// Per-account connectivity + non-negative-balance + trade-permission
    /// probe, run in parallel. A client error on either leg degrades that
    /// leg's result rather than failing the whole call — the stop-loss
    /// manager needs both results even when only one account is unwell.
    pub async fn health_check(&self) -> DualHealth {
        let (long_ping, short_ping) = tokio::join!(self.long.ping(), self.short.ping());
        let long = match long_ping {
            Ok(()) => match self.long.get_account_snapshot().await {
                Ok(snap) if snap.available_balance >= Decimal::ZERO => AccountHealth::healthy(),
                Ok(_) => AccountHealth { connected: true, balance_non_negative: false, error: None },
                Err(e) => AccountHealth::failed(e.to_string()),
            },
            Err(e) => AccountHealth::failed(e.to_string()),
        };
        let short = match short_ping {
            Ok(()) => match self.short.get_account_snapshot().await {
                Ok(snap) if snap.available_balance >= Decimal::ZERO => AccountHealth::healthy(),
                Ok(_) => AccountHealth { connected: true, balance_non_negative: false, error: None },
                Err(e) => AccountHealth::failed(e.to_string()),
            },
            Err(e) => AccountHealth::failed(e.to_string()),
        };
        DualHealth { long, short }
    }

    /// Parallel cancel-all fan-out. Each leg's failure is logged but does
    /// not stop the other from being attempted — the caller (stop-loss
    /// manager) re-verifies and retries afterwards.
    pub async fn cancel_all_orders(&self) -> (Result<(), EngineError>, Result<(), EngineError>) {
        tokio::join!(self.long.cancel_all_orders(&self.symbol), self.short.cancel_all_orders(&self.symbol))
    }

    /// Fans out a reduce-only market close for every open position on both
    /// accounts. Positions are closed worst-PnL-first within each account;
    /// the two accounts themselves close in parallel.
    pub async fn close_all_positions(&self) -> (Result<(), EngineError>, Result<(), EngineError>) {
        tokio::join!(close_account_positions(&self.long, &self.symbol), close_account_positions(&self.short, &self.symbol))
    }

    /// True only if both accounts report zero position size and zero open
    /// orders — the teardown postcondition a caller checks before declaring
    /// the run clean.
    pub async fn verify_clean(&self) -> Result<bool, EngineError> {
        let (long, short) = self.sync_account_info().await?;
        let long_orders = self.long.get_open_orders(&self.symbol).await?;
        let short_orders = self.short.get_open_orders(&self.symbol).await?;
        let positions_zero = long.positions.iter().all(|p| p.size.is_zero()) && short.positions.iter().all(|p| p.size.is_zero());
        let orders_zero = long_orders.is_empty() && short_orders.is_empty();
        Ok(positions_zero && orders_zero)
    }
}

async fn close_account_positions<C: ExchangeClient>(client: &Arc<C>, symbol: &str) -> Result<(), EngineError> {
    use crate::exchange::PlaceOrderRequest;

    let snapshot = client.get_account_snapshot().await?;
    let mut positions = snapshot.positions;
    // Most-loss first: closing losers first reduces the window of further
    // adverse movement against the remaining positions.
    positions.sort_by(|a, b| a.unrealized_pnl.cmp(&b.unrealized_pnl));

    for position in positions {
        if position.size.is_zero() {
            continue;
        }
        let close_side = match position.side {
            crate::core::types::AccountSide::Long => crate::core::types::Side::Sell,
            crate::core::types::AccountSide::Short => crate::core::types::Side::Buy,
        };
        let request = PlaceOrderRequest::reduce_only_market(symbol, close_side, position.size.abs(), position.side.position_side_str());
        client.place_order(request).await?;
        info!(symbol, size = %position.size, side = %close_side, "reduce-only close submitted");
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    }
    Ok(())
}
