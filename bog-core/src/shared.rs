//! Single-writer, multi-reader market data shared by the controller, both
//! executors and the stop-loss manager: one writer publishes price/candle
//! updates, many readers observe without locking each other out.
//! `GridParameters` is write-once: a `OnceLock` enforces that at the type
//! level instead of by convention — the one genuinely mutable cell here is
//! the price snapshot.

use crate::core::types::{Candle, GridParameters};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Best bid/ask/mid at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSnapshot {
    pub best_bid: Decimal,
    pub best_ask: Decimal,
    pub mid: Decimal,
    pub updated_at_ms: u64,
}

impl PriceSnapshot {
    pub fn new(best_bid: Decimal, best_ask: Decimal) -> Self {
        Self {
            best_bid,
            best_ask,
            mid: (best_bid + best_ask) / Decimal::TWO,
            updated_at_ms: now_ms(),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// Candles and price are single-writer (the ingest task); `GridParameters`
/// is written exactly once at startup and frozen for the run.
pub struct SharedMarketData {
    price: RwLock<Option<PriceSnapshot>>,
    candles: RwLock<VecDeque<Candle>>,
    candle_capacity: usize,
    parameters: OnceLock<Arc<GridParameters>>,
    /// Flipped once by the controller on SIGINT/SIGTERM/stop-loss trigger;
    /// every task checks this at its next suspension point.
    shutdown_requested: AtomicBool,
}

impl SharedMarketData {
    /// `candle_capacity` should be `atr_period + buffer`: history is trimmed
    /// to that size as new candles arrive.
    pub fn new(candle_capacity: usize) -> Self {
        Self {
            price: RwLock::new(None),
            candles: RwLock::new(VecDeque::with_capacity(candle_capacity)),
            candle_capacity,
            parameters: OnceLock::new(),
            shutdown_requested: AtomicBool::new(false),
        }
    }

    pub fn publish_price(&self, snapshot: PriceSnapshot) {
        *self.price.write() = Some(snapshot);
    }

    pub fn latest_price(&self) -> Option<PriceSnapshot> {
        *self.price.read()
    }

    /// Appends one freshly closed candle, trimming to `candle_capacity`.
    pub fn push_candle(&self, candle: Candle) {
        let mut candles = self.candles.write();
        candles.push_back(candle);
        while candles.len() > self.candle_capacity {
            candles.pop_front();
        }
    }

    pub fn candles(&self) -> Vec<Candle> {
        self.candles.read().iter().copied().collect()
    }

    pub fn candle_count(&self) -> usize {
        self.candles.read().len()
    }

    /// Freezes the grid parameters for the run. Returns `Err` with the
    /// existing value if called more than once — parameters are never
    /// recomputed mid-run.
    pub fn set_parameters(&self, params: GridParameters) -> Result<(), Arc<GridParameters>> {
        self.parameters.set(Arc::new(params)).map_err(|_| self.parameters.get().cloned().unwrap())
    }

    pub fn parameters(&self) -> Option<Arc<GridParameters>> {
        self.parameters.get().cloned()
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_candle;
    use rust_decimal_macros::dec;

    #[test]
    fn candle_history_trims_to_capacity() {
        let shared = SharedMarketData::new(3);
        for i in 0..5 {
            shared.push_candle(test_candle(i, dec!(1), dec!(1), dec!(1)));
        }
        assert_eq!(shared.candle_count(), 3);
    }

    #[test]
    fn parameters_are_write_once() {
        let shared = SharedMarketData::new(10);
        let params = crate::core::types::GridParameters {
            upper: dec!(0.18),
            lower: dec!(0.16),
            grid_spacing: dec!(0.001),
            grid_levels: 10,
            amount_per_grid: dec!(10),
            quantity_per_grid: dec!(50),
            safe_leverage: 10,
            stop_loss_upper: dec!(0.19),
            stop_loss_lower: dec!(0.15),
        };
        assert!(shared.set_parameters(params.clone()).is_ok());
        assert!(shared.set_parameters(params).is_err());
        assert!(shared.parameters().is_some());
    }

    #[test]
    fn price_snapshot_computes_mid() {
        let snap = PriceSnapshot::new(dec!(0.169), dec!(0.171));
        assert_eq!(snap.mid, dec!(0.170));
    }

    #[test]
    fn shutdown_flag_defaults_false() {
        let shared = SharedMarketData::new(10);
        assert!(!shared.shutdown_requested());
        shared.request_shutdown();
        assert!(shared.shutdown_requested());
    }
}
