//! Price/quantity quantization and order validation against exchange filters.
//!
//! Lives in `bog-core` (rather than `bog-strategies`, which re-exports it)
//! because the grid executor needs it too and `bog-strategies` depends on
//! `bog-core`, not the other way around.

use super::types::SymbolFilters;
use rust_decimal::Decimal;

/// Rounds `price` down to the nearest `price_tick`, per the exchange's own
/// truncation rule for limit prices. Never rounds up: an entry price rounded
/// up could cross the spread it was meant to sit behind.
pub fn quantize_price(price: Decimal, filters: &SymbolFilters) -> Decimal {
    if filters.price_tick.is_zero() {
        return price;
    }
    let ticks = (price / filters.price_tick).trunc();
    let quantized = ticks * filters.price_tick;
    if quantized <= Decimal::ZERO {
        filters.price_tick
    } else {
        quantized.round_dp(filters.price_precision)
    }
}

/// Rounds `qty` to a multiple of `qty_step`, truncating down by default or
/// ceiling up when `round_up` is set (used when a notional shortfall needs
/// to be corrected by growing the order rather than shrinking the price).
pub fn quantize_qty(qty: Decimal, filters: &SymbolFilters, round_up: bool) -> Decimal {
    if filters.qty_step.is_zero() {
        return qty.max(filters.min_qty);
    }
    let steps = qty / filters.qty_step;
    let steps = if round_up { steps.ceil() } else { steps.trunc() };
    let quantized = (steps * filters.qty_step).round_dp(filters.qty_precision);
    quantized.max(filters.min_qty).min(filters.max_qty)
}

/// Result of validating and, where necessary, adjusting an order against
/// exchange filters before it is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOrder {
    pub price: Decimal,
    pub quantity: Decimal,
    pub adjusted: bool,
}

/// Quantizes price and quantity, then grows the quantity (never the price)
/// if the resulting notional falls below `min_notional`. Mirrors the
/// reference implementation's two-pass adjust-then-revalidate behavior.
pub fn validate_order(price: Decimal, quantity: Decimal, filters: &SymbolFilters) -> ValidatedOrder {
    let mut adjusted = false;

    let q_price = quantize_price(price, filters);
    if q_price != price {
        adjusted = true;
    }

    let mut q_qty = quantize_qty(quantity, filters, false);
    if q_qty != quantity {
        adjusted = true;
    }

    let notional = q_price * q_qty;
    if notional < filters.min_notional && q_price > Decimal::ZERO {
        let required_qty = filters.min_notional / q_price;
        q_qty = quantize_qty(required_qty, filters, true);
        adjusted = true;
    }

    ValidatedOrder { price: q_price, quantity: q_qty, adjusted }
}
