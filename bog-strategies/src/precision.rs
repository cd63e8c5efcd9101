//! Price/quantity quantization and order validation against exchange filters.
//!
//! Re-exported from `bog_core::core::precision`: the grid executor (in
//! `bog-core`) needs these same pure functions, so the implementation lives
//! there and this module is the public home the rest of the calculation
//! pipeline (`grid_calculator`) imports from.

pub use bog_core::core::precision::{quantize_price, quantize_qty, validate_order, ValidatedOrder};
