//! Core domain types for the dual-account grid engine.
//!
//! - `types`: candles, symbol filters, leverage brackets, ATR output, grid
//!   parameters, tracked orders and account snapshots.
//! - `grid_level`: the per-level open/close state machine.
//! - `errors`: the engine-wide error taxonomy with severity and recoverability.

pub mod errors;
pub mod grid_level;
pub mod precision;
pub mod types;

pub use errors::{EngineError, Severity};
pub use grid_level::{GridLevel, GridLevelState, TransitionError};
pub use precision::{quantize_price, quantize_qty, validate_order, ValidatedOrder};
pub use types::{
    bracket_for_notional, AccountSide, AccountSnapshot, ATRResult, Candle, ExchangeOrderId,
    ExecutorConfig, GridParameters, LeverageBracket, LevelId, OrderStatus, PositionInfo, Side,
    SymbolFilters, TrackedOrder,
};
