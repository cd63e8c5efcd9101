//! Shared domain types for the dual-account grid engine.
//!
//! Every monetary, price, quantity and PnL field here is `rust_decimal::Decimal`.
//! The one sanctioned exception is the ATR smoothing loop in `bog_strategies::atr`,
//! which works in `f64` and converts back to `Decimal` at its boundary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// A single OHLCV candle for a fixed interval (e.g. 1h). Consumed read-only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Exchange trading-rule filters for a symbol, fetched once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymbolFilters {
    pub price_tick: Decimal,
    pub qty_step: Decimal,
    pub min_qty: Decimal,
    pub max_qty: Decimal,
    pub min_notional: Decimal,
    pub price_precision: u32,
    pub qty_precision: u32,
}

/// One rung of the exchange's notional-tiered leverage table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeverageBracket {
    pub notional_floor: Decimal,
    pub notional_cap: Decimal,
    pub max_leverage: u32,
    pub maintenance_margin_rate: Decimal,
    pub cum: Decimal,
}

/// Looks up the bracket whose `[notional_floor, notional_cap]` contains `notional`.
///
/// Falls back to the last bracket if `notional` exceeds every cap (the
/// exchange's own top tier behaves the same way).
pub fn bracket_for_notional(brackets: &[LeverageBracket], notional: Decimal) -> Option<&LeverageBracket> {
    brackets
        .iter()
        .find(|b| notional >= b.notional_floor && notional < b.notional_cap)
        .or_else(|| brackets.last())
}

/// Output of the ATR analyzer: current volatility estimate and channel bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ATRResult {
    pub atr_value: Decimal,
    pub upper: Decimal,
    pub lower: Decimal,
    pub current_price: Decimal,
    pub channel_width: Decimal,
    pub timestamp: i64,
}

impl ATRResult {
    /// True if this channel is narrower than `prev`'s — an advisory signal the
    /// Python reference used to gate strategy startup on contraction.
    pub fn is_contraction_vs(&self, prev: &ATRResult) -> bool {
        self.channel_width < prev.channel_width
    }
}

/// Order side on the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side that closes a position opened with `self`.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Which leg of the hedge an executor drives. A LONG executor opens with BUY
/// and closes with SELL; a SHORT executor opens with SELL and closes with BUY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountSide {
    Long,
    Short,
}

impl AccountSide {
    pub fn open_side(self) -> Side {
        match self {
            AccountSide::Long => Side::Buy,
            AccountSide::Short => Side::Sell,
        }
    }

    pub fn close_side(self) -> Side {
        self.open_side().opposite()
    }

    pub fn position_side_str(self) -> &'static str {
        match self {
            AccountSide::Long => "LONG",
            AccountSide::Short => "SHORT",
        }
    }
}

impl fmt::Display for AccountSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.position_side_str())
    }
}

/// Terminal and non-terminal exchange order states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }
}

/// Identifier assigned by the exchange to a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeOrderId(pub String);

impl fmt::Display for ExchangeOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live order tracked by an executor: everything needed to reconcile state
/// without re-deriving it from the exchange on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedOrder {
    pub exchange_order_id: ExchangeOrderId,
    pub side: Side,
    pub original_amount: Decimal,
    pub price: Decimal,
    pub filled_amount: Decimal,
    pub avg_fill_price: Option<Decimal>,
    pub cumulative_fees: Decimal,
    pub status: OrderStatus,
}

impl TrackedOrder {
    pub fn new(exchange_order_id: ExchangeOrderId, side: Side, price: Decimal, amount: Decimal) -> Self {
        Self {
            exchange_order_id,
            side,
            original_amount: amount,
            price,
            filled_amount: Decimal::ZERO,
            avg_fill_price: None,
            cumulative_fees: Decimal::ZERO,
            status: OrderStatus::New,
        }
    }

    pub fn remaining(&self) -> Decimal {
        self.original_amount - self.filled_amount
    }
}

/// Stable per-level identifier, displayed as `L{n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LevelId(pub u32);

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Snapshot of one open position on an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionInfo {
    pub symbol: String,
    pub side: AccountSide,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub leverage: u32,
}

/// Point-in-time view of one account, as returned by the exchange client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub wallet_balance: Decimal,
    pub available_balance: Decimal,
    pub margin_used: Decimal,
    pub positions: Vec<PositionInfo>,
    pub open_orders: Vec<TrackedOrder>,
    pub last_updated: SystemTime,
}

/// The frozen output of the grid calculator. Computed once per run and never
/// mutated afterwards — callers hold it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridParameters {
    pub upper: Decimal,
    pub lower: Decimal,
    pub grid_spacing: Decimal,
    pub grid_levels: u32,
    pub amount_per_grid: Decimal,
    pub quantity_per_grid: Decimal,
    pub safe_leverage: u32,
    pub stop_loss_upper: Decimal,
    pub stop_loss_lower: Decimal,
}

impl GridParameters {
    pub fn channel_center(&self) -> Decimal {
        (self.upper + self.lower) / Decimal::TWO
    }
}

/// Per-executor tunables that are not part of the shared grid shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub symbol: String,
    pub side: AccountSide,
    pub max_open_orders: usize,
    pub max_orders_per_batch: usize,
    pub order_frequency_seconds: u64,
    pub activation_bounds: Option<(Decimal, Decimal)>,
    pub take_profit_ratio: Decimal,
    pub safe_extra_spread: Decimal,
    /// Fractional deviation of mid from channel centre that trips the
    /// per-tick risk gate, e.g. `0.10` for 10%.
    pub max_grid_deviation: Decimal,
}
