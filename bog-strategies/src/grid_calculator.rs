//! Derives a frozen `GridParameters` set from an ATR channel, account
//! margins and exchange filters.
//!
//! All arithmetic here is `Decimal`; the only float excursion in this crate
//! lives in `atr::AtrState`, several layers upstream of this module.

use crate::precision::{quantize_price, quantize_qty};
use bog_core::core::types::{bracket_for_notional, GridParameters, LeverageBracket, SymbolFilters, ATRResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridCalcError {
    /// Even a single grid level would fall below the exchange's min notional.
    InsufficientCapital { usable_quote: Decimal, min_notional: Decimal },
    /// The channel is degenerate (upper <= lower) — no range to grid over.
    DegenerateChannel { upper: Decimal, lower: Decimal },
}

impl fmt::Display for GridCalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridCalcError::InsufficientCapital { usable_quote, min_notional } => write!(
                f,
                "insufficient capital: usable quote {} cannot fund even one level at min notional {}",
                usable_quote, min_notional
            ),
            GridCalcError::DegenerateChannel { upper, lower } => {
                write!(f, "degenerate channel: upper {} <= lower {}", upper, lower)
            }
        }
    }
}

impl std::error::Error for GridCalcError {}

/// Account and risk inputs that feed the grid shape, separate from the ATR
/// channel itself so a controller can re-derive parameters from a fresh ATR
/// read without re-plumbing every margin/config field.
#[derive(Debug, Clone)]
pub struct GridCalcInputs {
    pub atr: ATRResult,
    pub filters: SymbolFilters,
    pub brackets: Vec<LeverageBracket>,
    pub margin_long: Decimal,
    pub margin_short: Decimal,
    pub safety_factor: Decimal,
    pub target_profit_rate: Decimal,
    pub maker_fee: Decimal,
    pub max_leverage: u32,
    pub fund_utilization: Decimal,
}

/// Computes grid spacing, level count, per-level size, safe leverage and
/// stop-loss lines from a single ATR channel reading. Called once at
/// startup; the result is frozen for the life of the run.
pub fn calculate_grid_parameters(inputs: &GridCalcInputs) -> Result<GridParameters, GridCalcError> {
    let upper = inputs.atr.upper;
    let lower = inputs.atr.lower;
    if upper <= lower {
        return Err(GridCalcError::DegenerateChannel { upper, lower });
    }

    let spacing_raw = (inputs.target_profit_rate + Decimal::TWO * inputs.maker_fee) * upper;
    let spacing = quantize_price(spacing_raw, &inputs.filters);
    let range = upper - lower;
    let mut n: u32 = (range / spacing).trunc().to_u32().unwrap_or(0).clamp(4, 100);

    let avg = (upper + lower) / Decimal::TWO;

    // Bracket selection is circular (the bracket depends on notional, which
    // depends on leverage, which depends on the bracket's margin rate); seed
    // it with the worst-case (maximum configured) leverage and accept the
    // resulting margin rate as representative of the final tier.
    let m_total = inputs.margin_long + inputs.margin_short;
    let seed_notional = m_total * Decimal::from(inputs.max_leverage);
    let bracket = bracket_for_notional(&inputs.brackets, seed_notional);
    let mmr = bracket.map(|b| b.maintenance_margin_rate).unwrap_or(Decimal::ZERO);
    let bracket_max_leverage = bracket.map(|b| b.max_leverage).unwrap_or(inputs.max_leverage);

    let l_long = Decimal::ONE / (Decimal::ONE + mmr - lower / avg);
    let l_short = Decimal::ONE / (upper / avg - Decimal::ONE + mmr);
    let raw_leverage = l_long.min(l_short) * inputs.safety_factor;

    let leverage_cap = Decimal::from(inputs.max_leverage.min(bracket_max_leverage));
    let safe_leverage_dec = raw_leverage.trunc().max(Decimal::ONE).min(leverage_cap);
    let safe_leverage: u32 = safe_leverage_dec.to_u32().unwrap_or(1);

    let usable_quote_long = inputs.margin_long * inputs.fund_utilization;
    let usable_quote_short = inputs.margin_short * inputs.fund_utilization;
    let usable_quote = usable_quote_long.min(usable_quote_short);
    let total_notional = usable_quote * Decimal::from(safe_leverage);

    // Shrink the level count until each level clears min_notional, or fail.
    let mut amount_per_grid = total_notional / Decimal::from(n);
    while amount_per_grid < inputs.filters.min_notional {
        if n <= 1 {
            return Err(GridCalcError::InsufficientCapital {
                usable_quote,
                min_notional: inputs.filters.min_notional,
            });
        }
        n -= 1;
        amount_per_grid = total_notional / Decimal::from(n);
    }

    let quantity_per_grid = quantize_qty(amount_per_grid / avg, &inputs.filters, false);

    let stop_loss_upper = upper + inputs.atr.atr_value / inputs.safety_factor;
    let stop_loss_lower = lower - inputs.atr.atr_value / inputs.safety_factor;

    Ok(GridParameters {
        upper,
        lower,
        grid_spacing: spacing,
        grid_levels: n,
        amount_per_grid,
        quantity_per_grid,
        safe_leverage,
        stop_loss_upper,
        stop_loss_lower,
    })
}

/// Uniform level prices across `[lower, upper]` with explicit endpoints —
/// `lower + i * (upper - lower) / (n - 1)` — rather than repeated addition
/// of `spacing`, which would drift the top level away from `upper` after
/// enough steps of rounding. Each price is quantized to `price_tick` so the
/// function returns exchange-placeable prices on its own.
pub fn level_prices(params: &GridParameters, filters: &SymbolFilters) -> Vec<Decimal> {
    if params.grid_levels < 2 {
        return vec![quantize_price(params.lower, filters)];
    }
    let steps = Decimal::from(params.grid_levels - 1);
    let range = params.upper - params.lower;
    (0..params.grid_levels)
        .map(|i| quantize_price(params.lower + Decimal::from(i) * range / steps, filters))
        .collect()
}
