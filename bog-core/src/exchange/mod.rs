//! The exchange boundary: an async trait the engine depends on, plus the one
//! concrete implementation shipped in this workspace (a deterministic
//! simulator). A real REST/websocket client against a live exchange is out
//! of scope here — this trait is the seam a future crate would implement.
//!
//! All responses are parsed into the typed structs in `crate::core::types`
//! before they reach the engine; nothing past this boundary is an untyped
//! JSON blob.

pub mod simulated;

pub use simulated::SimulatedExchangeClient;

use crate::core::errors::EngineError;
use crate::core::types::{
    AccountSnapshot, Candle, ExchangeOrderId, LeverageBracket, OrderStatus, Side, SymbolFilters,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `LIMIT` maker orders for grid rungs; `MARKET` reduce-only for forced closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

/// Request body for a new order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// `None` for MARKET orders.
    pub price: Option<Decimal>,
    pub position_side: &'static str,
    pub reduce_only: bool,
}

impl PlaceOrderRequest {
    /// A resting GTC maker order for one grid rung.
    pub fn limit(symbol: impl Into<String>, side: Side, price: Decimal, quantity: Decimal, position_side: &'static str) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            position_side,
            reduce_only: false,
        }
    }

    /// A reduce-only market order used by the stop-loss manager's teardown.
    pub fn reduce_only_market(symbol: impl Into<String>, side: Side, quantity: Decimal, position_side: &'static str) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            position_side,
            reduce_only: true,
        }
    }
}

/// Result of a successful placement: just enough to seed a `TrackedOrder`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub exchange_order_id: ExchangeOrderId,
    pub status: OrderStatus,
}

/// An `ORDER_TRADE_UPDATE` event from the user-data stream, or the
/// equivalent reconstructed from a REST open-orders poll.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderUpdateEvent {
    pub exchange_order_id: ExchangeOrderId,
    pub status: OrderStatus,
    pub filled_amount: Decimal,
    pub avg_fill_price: Option<Decimal>,
    pub fee: Decimal,
}

/// Best bid/ask snapshot — the `bookTicker` stream event, or its REST
/// equivalent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookTicker {
    pub best_bid: Decimal,
    pub best_ask: Decimal,
}

impl BookTicker {
    pub fn mid(&self) -> Decimal {
        (self.best_bid + self.best_ask) / Decimal::TWO
    }
}

/// Everything the engine needs from one exchange account connection:
/// placing and cancelling orders, polling fills, and reading account/
/// position state. REST calls are I/O, so every method here is a
/// suspension point.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlacedOrder, EngineError>;

    async fn cancel_order(&self, symbol: &str, order_id: &ExchangeOrderId) -> Result<(), EngineError>;

    async fn cancel_all_orders(&self, symbol: &str) -> Result<(), EngineError>;

    /// Ground truth for open orders — used by the executor's start-of-tick
    /// reconciliation to drop tracked orders the exchange no longer has.
    async fn get_open_orders(&self, symbol: &str) -> Result<Vec<ExchangeOrderId>, EngineError>;

    async fn get_account_snapshot(&self) -> Result<AccountSnapshot, EngineError>;

    async fn get_leverage_brackets(&self, symbol: &str) -> Result<Vec<LeverageBracket>, EngineError>;

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), EngineError>;

    /// Enables hedge mode (simultaneous LONG/SHORT positions on one symbol).
    async fn set_position_mode(&self, hedge_mode: bool) -> Result<(), EngineError>;

    async fn get_symbol_filters(&self, symbol: &str) -> Result<SymbolFilters, EngineError>;

    async fn get_candles(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>, EngineError>;

    async fn get_book_ticker(&self, symbol: &str) -> Result<BookTicker, EngineError>;

    /// Drains order-update events received since the last call. Real
    /// implementations buffer these off a websocket task; the simulator
    /// derives them synchronously from its own fill engine.
    async fn poll_order_updates(&self) -> Result<Vec<OrderUpdateEvent>, EngineError>;

    /// Connectivity/auth/permission probe used by `DualAccountManager::health_check`.
    async fn ping(&self) -> Result<(), EngineError>;
}
