//! Average True Range channel analyzer.
//!
//! The smoothing loop works in `f64` — the one place in this codebase that
//! isn't `Decimal` — matching the reference implementation's use of
//! `pandas.ewm(alpha=1/period, adjust=False)`. Results are converted back to
//! `Decimal` at the boundary, where they re-join the rest of the engine.

use bog_core::core::types::{Candle, ATRResult};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::fmt;

/// Why an ATR computation couldn't produce a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtrError {
    /// Fewer than `required` candles were available to seed or compute ATR.
    InsufficientData { available: usize, required: usize },

    /// A candle field wasn't a finite, non-negative price.
    NaNInput { field: &'static str },
}

impl fmt::Display for AtrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtrError::InsufficientData { available, required } => {
                write!(f, "insufficient data: {} candle(s) available, {} required", available, required)
            }
            AtrError::NaNInput { field } => {
                write!(f, "candle field '{}' is not a finite, non-negative price", field)
            }
        }
    }
}

impl std::error::Error for AtrError {}

fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

fn from_f64(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap_or(Decimal::ZERO)
}

/// Converts a candle's `Decimal` field to `f64`, rejecting anything that
/// isn't a finite, non-negative price rather than coercing it to `0.0`.
fn checked_f64(field: &'static str, d: Decimal) -> Result<f64, AtrError> {
    if d.is_sign_negative() {
        return Err(AtrError::NaNInput { field });
    }
    match d.to_f64() {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(AtrError::NaNInput { field }),
    }
}

fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    (high - low).max((high - prev_close).abs()).max((low - prev_close).abs())
}

/// Incremental Wilder RMA over a rolling candle stream.
///
/// The first candle only establishes `prev_close` — a true range needs a
/// previous close to compare against, so it can't seed anything by itself.
/// Seeding then needs `period` true ranges, i.e. `period + 1` candles in
/// total, seeded with their simple mean, then updated with the standard
/// Wilder recurrence `atr = (atr * (period - 1) + tr) / period`, which is
/// algebraically the same thing `ewm(alpha=1/period, adjust=False)` computes.
#[derive(Debug, Clone)]
pub struct AtrState {
    period: usize,
    multiplier: Decimal,
    seed_trs: Vec<f64>,
    atr: Option<f64>,
    prev_close: Option<f64>,
    last_result: Option<ATRResult>,
}

impl AtrState {
    pub fn new(period: usize, multiplier: Decimal) -> Self {
        Self {
            period,
            multiplier,
            seed_trs: Vec::with_capacity(period),
            atr: None,
            prev_close: None,
            last_result: None,
        }
    }

    /// Feeds one closed candle. Returns `Ok(None)` until `period + 1` candles
    /// have been seen (the RMA has no value before its seed window is full).
    /// Rejects non-finite or negative `high`/`low`/`close` fields outright
    /// rather than silently folding them into a zero-valued ATR.
    pub fn update(&mut self, candle: &Candle) -> Result<Option<ATRResult>, AtrError> {
        let high = checked_f64("high", candle.high)?;
        let low = checked_f64("low", candle.low)?;
        let close = checked_f64("close", candle.close)?;

        let prev_close = self.prev_close;
        self.prev_close = Some(close);

        let tr = match prev_close {
            None => return Ok(None),
            Some(pc) => true_range(high, low, pc),
        };

        let atr = match self.atr {
            None => {
                self.seed_trs.push(tr);
                if self.seed_trs.len() < self.period {
                    return Ok(None);
                }
                let seed = self.seed_trs.iter().sum::<f64>() / self.period as f64;
                self.atr = Some(seed);
                seed
            }
            Some(prev_atr) => {
                let next = (prev_atr * (self.period as f64 - 1.0) + tr) / self.period as f64;
                self.atr = Some(next);
                next
            }
        };

        let atr_dec = from_f64(atr);
        let upper = candle.high + atr_dec * self.multiplier;
        let lower = candle.low - atr_dec * self.multiplier;
        let result = ATRResult {
            atr_value: atr_dec,
            upper,
            lower,
            current_price: candle.close,
            channel_width: upper - lower,
            timestamp: candle.open_time,
        };
        self.last_result = Some(result);
        Ok(Some(result))
    }

    pub fn is_seeded(&self) -> bool {
        self.atr.is_some()
    }

    pub fn last(&self) -> Option<ATRResult> {
        self.last_result
    }
}

/// Computes one ATR channel from a closed candle slice in a single pass.
/// Checks the `period + 1` candle requirement upfront instead of leaving the
/// boundary to whatever loop happens to drive an `AtrState`.
pub fn compute_atr(candles: &[Candle], period: usize, multiplier: Decimal) -> Result<ATRResult, AtrError> {
    let required = period + 1;
    if candles.len() < required {
        return Err(AtrError::InsufficientData { available: candles.len(), required });
    }
    let mut state = AtrState::new(period, multiplier);
    let mut last = None;
    for candle in candles {
        last = state.update(candle)?;
    }
    last.ok_or(AtrError::InsufficientData { available: candles.len(), required })
}

/// True if `current`'s channel is narrower than `previous`'s — the advisory
/// signal the reference implementation checked before allowing the grid to
/// (re)activate. Informational only: nothing in this engine blocks on it.
pub fn check_channel_contraction(previous: &ATRResult, current: &ATRResult) -> bool {
    current.is_contraction_vs(previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(open_time: i64, high: &str, low: &str, close: &str) -> Candle {
        Candle {
            open_time,
            open: close.parse().unwrap(),
            high: high.parse().unwrap(),
            low: low.parse().unwrap(),
            close: close.parse().unwrap(),
            volume: Decimal::ZERO,
        }
    }

    #[test]
    fn first_candle_only_seeds_prev_close() {
        let mut state = AtrState::new(3, dec!(1));
        assert!(state.update(&candle(1, "9", "9", "9")).unwrap().is_none());
        assert!(!state.is_seeded());
    }

    #[test]
    fn seeds_with_simple_mean_of_first_period_true_ranges() {
        let mut state = AtrState::new(3, dec!(1));
        assert!(state.update(&candle(1, "9", "9", "9")).unwrap().is_none());
        assert!(state.update(&candle(2, "11", "9", "10")).unwrap().is_none());
        assert!(state.update(&candle(3, "12", "10", "11")).unwrap().is_none());
        let result = state.update(&candle(4, "13", "11", "12")).unwrap().unwrap();
        // TRs: 2, 2, 2 (no gaps) -> seed atr = 2
        assert_eq!(result.atr_value, dec!(2));
    }

    #[test]
    fn incremental_update_uses_wilder_recurrence() {
        let mut state = AtrState::new(2, dec!(1));
        assert!(state.update(&candle(1, "9", "9", "9")).unwrap().is_none());
        assert!(state.update(&candle(2, "10", "8", "9")).unwrap().is_none()); // seeding first
        let seeded = state.update(&candle(3, "10", "8", "9")).unwrap().unwrap();
        assert_eq!(seeded.atr_value, dec!(2));

        let next = state.update(&candle(4, "14", "10", "12")).unwrap().unwrap();
        // tr = max(4, |14-9|=5, |10-9|=1) = 5; atr = (2*1 + 5) / 2 = 3.5
        assert_eq!(next.atr_value, dec!(3.5));
    }

    #[test]
    fn channel_bounds_derive_from_high_low_and_multiplier() {
        let mut state = AtrState::new(2, dec!(2));
        assert!(state.update(&candle(1, "9", "9", "9")).unwrap().is_none());
        assert!(state.update(&candle(2, "10", "8", "9")).unwrap().is_none());
        let result = state.update(&candle(3, "10", "8", "9")).unwrap().unwrap();
        assert_eq!(result.upper, dec!(10) + dec!(2) * dec!(2));
        assert_eq!(result.lower, dec!(8) - dec!(2) * dec!(2));
    }

    #[test]
    fn contraction_is_detected_on_narrower_channel() {
        let wide = ATRResult {
            atr_value: dec!(1),
            upper: dec!(20),
            lower: dec!(10),
            current_price: dec!(15),
            channel_width: dec!(10),
            timestamp: 1,
        };
        let narrow = ATRResult {
            channel_width: dec!(8),
            ..wide
        };
        assert!(check_channel_contraction(&wide, &narrow));
        assert!(!check_channel_contraction(&narrow, &wide));
    }

    #[test]
    fn exactly_period_plus_one_candles_computes_atr() {
        let candles = vec![candle(1, "9", "9", "9"), candle(2, "10", "8", "9"), candle(3, "10", "8", "9")];
        let result = compute_atr(&candles, 2, dec!(1)).unwrap();
        assert_eq!(result.atr_value, dec!(2));
    }

    #[test]
    fn fewer_than_period_plus_one_candles_is_insufficient_data() {
        let candles = vec![candle(1, "9", "9", "9"), candle(2, "10", "8", "9")];
        let err = compute_atr(&candles, 2, dec!(1)).unwrap_err();
        assert_eq!(err, AtrError::InsufficientData { available: 2, required: 3 });
    }

    #[test]
    fn negative_price_field_is_rejected() {
        let mut state = AtrState::new(2, dec!(1));
        state.update(&candle(1, "9", "9", "9")).unwrap();
        let bad = Candle {
            open_time: 2,
            open: dec!(-1),
            high: dec!(-1),
            low: dec!(-2),
            close: dec!(-1),
            volume: Decimal::ZERO,
        };
        let err = state.update(&bad).unwrap_err();
        assert_eq!(err, AtrError::NaNInput { field: "high" });
    }
}

/// Property tests over randomized candle streams, catching edge cases a
/// handful of hand-picked unit tests miss.
#[cfg(test)]
mod proptests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn candle(open_time: i64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            open_time,
            open: from_f64(close),
            high: from_f64(high),
            low: from_f64(low),
            close: from_f64(close),
            volume: Decimal::ZERO,
        }
    }

    proptest! {
        /// The RMA is a weighted average of true ranges, which are all
        /// non-negative, so the smoothed value can never go negative.
        #[test]
        fn atr_value_never_negative(
            lows in prop::collection::vec(1.0..100.0_f64, 5..20),
            spread in 0.01..10.0_f64,
        ) {
            let period = 3;
            let mut state = AtrState::new(period, dec!(1));
            for (i, low) in lows.iter().enumerate() {
                let high = low + spread;
                let close = low + spread / 2.0;
                if let Some(result) = state.update(&candle(i as i64, high, *low, close)).unwrap() {
                    prop_assert!(result.atr_value >= Decimal::ZERO);
                }
            }
        }

        /// Every seeded update's channel straddles that candle's own
        /// high/low: `lower <= low` and `upper >= high`, since the channel
        /// is high/low plus or minus a non-negative ATR term.
        #[test]
        fn channel_always_contains_the_seeding_candles_range(
            lows in prop::collection::vec(1.0..100.0_f64, 5..20),
            spread in 0.01..10.0_f64,
        ) {
            let period = 3;
            let mut state = AtrState::new(period, dec!(1.5));
            for (i, low) in lows.iter().enumerate() {
                let high = low + spread;
                let close = low + spread / 2.0;
                let c = candle(i as i64, high, *low, close);
                if let Some(result) = state.update(&c).unwrap() {
                    prop_assert!(result.upper >= c.high);
                    prop_assert!(result.lower <= c.low);
                }
            }
        }

        /// The Wilder recurrence is a convex combination of the previous ATR
        /// and the new true range, so the updated value always lies between
        /// them (inclusive) regardless of how extreme the new range is.
        #[test]
        fn wilder_update_stays_between_prev_atr_and_new_true_range(
            prev_atr in 0.0..50.0_f64,
            tr in 0.0..50.0_f64,
            period in 2usize..30,
        ) {
            let next = (prev_atr * (period as f64 - 1.0) + tr) / period as f64;
            let (lo, hi) = if prev_atr <= tr { (prev_atr, tr) } else { (tr, prev_atr) };
            prop_assert!(next >= lo - 1e-9 && next <= hi + 1e-9);
        }
    }

    #[test]
    fn f64_decimal_roundtrip_is_precise_for_typical_prices() {
        for raw in ["0.17005", "123.456", "0.00001", "9999.99999"] {
            let d: Decimal = raw.parse().unwrap();
            let roundtripped = from_f64(to_f64(d));
            assert_relative_eq!(to_f64(d), to_f64(roundtripped), max_relative = 1e-9);
        }
    }
}
