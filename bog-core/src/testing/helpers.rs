//! Fixture builders for tests: symbol filters, candles, leverage brackets
//! and account snapshots with sane grid-trading defaults.

use crate::core::types::{
    AccountSide, AccountSnapshot, Candle, ExchangeOrderId, LeverageBracket, PositionInfo, Side,
    SymbolFilters, TrackedOrder,
};
use crate::monitoring::MetricsRegistry;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::SystemTime;

/// Binance-style default filters, matching the exchange's documented
/// fallback values when a symbol's own filters can't be resolved.
pub fn test_symbol_filters() -> SymbolFilters {
    SymbolFilters {
        price_tick: dec!(0.00001),
        qty_step: dec!(1),
        min_qty: dec!(1),
        max_qty: dec!(10_000_000),
        min_notional: dec!(5),
        price_precision: 5,
        qty_precision: 0,
    }
}

/// A single flat-bodied candle useful for seeding ATR warm-up.
pub fn test_candle(open_time: i64, high: Decimal, low: Decimal, close: Decimal) -> Candle {
    Candle {
        open_time,
        open: close,
        high,
        low,
        close,
        volume: dec!(1000),
    }
}

/// A short run of candles oscillating within `[low, high]`, enough to seed
/// an ATR window of the given period.
pub fn test_candle_series(period: usize, low: Decimal, high: Decimal) -> Vec<Candle> {
    (0..period as i64)
        .map(|i| {
            let mid = (low + high) / Decimal::TWO;
            test_candle(i, high, low, mid)
        })
        .collect()
}

/// A two-tier leverage bracket table resembling a mid-cap perpetual.
pub fn test_leverage_brackets() -> Vec<LeverageBracket> {
    vec![
        LeverageBracket {
            notional_floor: dec!(0),
            notional_cap: dec!(50_000),
            max_leverage: 50,
            maintenance_margin_rate: dec!(0.004),
            cum: dec!(0),
        },
        LeverageBracket {
            notional_floor: dec!(50_000),
            notional_cap: dec!(250_000),
            max_leverage: 20,
            maintenance_margin_rate: dec!(0.005),
            cum: dec!(50),
        },
    ]
}

/// A tracked order in `NEW` state, useful as a starting fixture for
/// executor reconciliation tests.
pub fn test_tracked_order(id: &str, side: Side, price: Decimal, amount: Decimal) -> TrackedOrder {
    TrackedOrder::new(ExchangeOrderId(id.to_string()), side, price, amount)
}

/// An account snapshot with the given balances and no open positions/orders.
pub fn test_account_snapshot(wallet_balance: Decimal) -> AccountSnapshot {
    AccountSnapshot {
        wallet_balance,
        available_balance: wallet_balance,
        margin_used: Decimal::ZERO,
        positions: Vec::new(),
        open_orders: Vec::new(),
        last_updated: SystemTime::now(),
    }
}

/// An account snapshot with one open position on `side`.
pub fn test_account_snapshot_with_position(
    wallet_balance: Decimal,
    side: AccountSide,
    size: Decimal,
    entry_price: Decimal,
    leverage: u32,
) -> AccountSnapshot {
    let mut snapshot = test_account_snapshot(wallet_balance);
    snapshot.positions.push(PositionInfo {
        symbol: "TESTUSDT".to_string(),
        side,
        size,
        entry_price,
        unrealized_pnl: Decimal::ZERO,
        leverage,
    });
    snapshot
}

/// A fresh metrics registry for tests that need one but don't care about
/// its contents.
pub fn test_metrics_registry() -> Arc<MetricsRegistry> {
    Arc::new(MetricsRegistry::new().expect("failed to create test metrics registry"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candle_series_has_requested_length() {
        let candles = test_candle_series(14, dec!(0.16), dec!(0.18));
        assert_eq!(candles.len(), 14);
    }

    #[test]
    fn leverage_brackets_cover_from_zero() {
        let brackets = test_leverage_brackets();
        assert_eq!(brackets[0].notional_floor, Decimal::ZERO);
    }

    #[test]
    fn account_snapshot_with_position_has_one_position() {
        let snapshot = test_account_snapshot_with_position(
            dec!(1000),
            AccountSide::Long,
            dec!(100),
            dec!(0.17),
            20,
        );
        assert_eq!(snapshot.positions.len(), 1);
        assert_eq!(snapshot.positions[0].side, AccountSide::Long);
    }
}
