//! Pure calculation crate for the dual-account grid engine: quantization
//! against exchange filters, ATR channel analysis, and grid parameter
//! derivation. No I/O, no async, no exchange connectivity — everything
//! here is a deterministic function of its inputs.

pub mod atr;
pub mod grid_calculator;
pub mod precision;

pub use atr::{check_channel_contraction, compute_atr, AtrError, AtrState};
pub use grid_calculator::{calculate_grid_parameters, level_prices, GridCalcError, GridCalcInputs};
pub use precision::{quantize_price, quantize_qty, validate_order, ValidatedOrder};
