//! The per-account, per-side control loop: a six-step tick (reconcile fills,
//! check the risk gate, place opens, place closes, age out stale orders,
//! report) folded into one `GridExecutor<C>` generic over the exchange
//! client trait. A grid executor is both strategy and order-driver in one
//! type rather than split across two, since the two are never reused
//! independently here.

use crate::core::errors::EngineError;
use crate::core::grid_level::{GridLevel, GridLevelState};
use crate::core::precision::{quantize_price, quantize_qty};
use crate::core::types::{AccountSide, ExchangeOrderId, ExecutorConfig, GridParameters, LevelId, OrderStatus, Side, SymbolFilters};
use crate::exchange::{ExchangeClient, PlaceOrderRequest};
use crate::shared::SharedMarketData;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Reasons the control loop can decline to place anything this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskGateResult {
    Clear,
    /// Price has wandered more than `max_grid_deviation` from channel centre.
    DeviationExceeded,
    /// Price has crossed a hard stop-loss line.
    StopLossBreached,
}

/// What happened on one call to `GridExecutor::tick`. Exists mainly so tests
/// and the supervisor loop can observe behavior without re-deriving it from
/// level state.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub opens_placed: usize,
    pub closes_placed: usize,
    pub levels_completed: usize,
    pub risk_gate: Option<RiskGateResult>,
}

/// One account/side's grid: owns its `GridLevel` set and tracked-order maps
/// exclusively. Reads shared price/parameters; never writes them.
pub struct GridExecutor<C: ExchangeClient> {
    pub account_side: AccountSide,
    symbol: String,
    client: Arc<C>,
    shared: Arc<SharedMarketData>,
    params: Arc<GridParameters>,
    config: ExecutorConfig,
    filters: SymbolFilters,
    levels: Vec<GridLevel>,
    open_order_index: HashMap<ExchangeOrderId, LevelId>,
    close_order_index: HashMap<ExchangeOrderId, LevelId>,
    last_batch: Option<Instant>,
    /// Non-owning handle shared with the stop-loss manager: the controller
    /// owns this executor, the stop-loss manager only borrows a flag it can
    /// set to request a teardown.
    shutdown: Arc<AtomicBool>,
}

impl<C: ExchangeClient> GridExecutor<C> {
    pub fn new(
        client: Arc<C>,
        shared: Arc<SharedMarketData>,
        params: Arc<GridParameters>,
        config: ExecutorConfig,
        filters: SymbolFilters,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let levels = build_levels(&params, &config, &filters);
        Self {
            account_side: config.side,
            symbol: config.symbol.clone(),
            client,
            shared,
            params,
            config,
            filters,
            levels,
            open_order_index: HashMap::new(),
            close_order_index: HashMap::new(),
            last_batch: None,
            shutdown,
        }
    }

    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn levels(&self) -> &[GridLevel] {
        &self.levels
    }

    fn open_count(&self) -> usize {
        self.levels.iter().filter(|l| l.state() == GridLevelState::OpenPlaced).count()
    }

    /// Runs one control-loop iteration. Returns `Ok` even when placements
    /// were skipped for a benign reason (rate limit, risk gate); only a
    /// hard client failure propagates as `Err`.
    pub async fn tick(&mut self) -> Result<TickReport, EngineError> {
        let mut report = TickReport::default();

        if self.shutdown.load(Ordering::SeqCst) {
            return Ok(report);
        }

        self.reconcile().await?;

        let price = match self.shared.latest_price() {
            Some(p) => p,
            None => return Ok(report),
        };

        let gate = self.risk_gate(price.mid);
        report.risk_gate = Some(gate);
        if gate != RiskGateResult::Clear {
            warn!(account_side = %self.account_side, ?gate, "risk gate tripped, requesting shutdown");
            self.shutdown.store(true, Ordering::SeqCst);
            self.shared.request_shutdown();
            return Ok(report);
        }

        report.opens_placed = self.place_opens(price.mid).await?;
        report.closes_placed = self.place_closes().await?;
        report.levels_completed = self.reset_completed_levels();

        Ok(report)
    }

    /// Step 1: absorb order-update events, then reconcile against the
    /// exchange's own open-orders list so a lost event can never leave a
    /// level stuck holding a dead order id.
    async fn reconcile(&mut self) -> Result<(), EngineError> {
        for event in self.client.poll_order_updates().await? {
            self.apply_order_update(event);
        }

        let live: std::collections::HashSet<ExchangeOrderId> =
            self.client.get_open_orders(&self.symbol).await?.into_iter().collect();

        for level in self.levels.iter_mut() {
            if level.state() == GridLevelState::OpenPlaced {
                if let Some(id) = level.open_order_id.clone() {
                    if !live.contains(&id) {
                        debug!(level = %level.id, order = %id, "ground-truth reconciliation dropped stale open order");
                        let _ = level.cancel_open();
                    }
                }
            }
            if level.state() == GridLevelState::ClosePlaced {
                if let Some(id) = level.close_order_id.clone() {
                    if !live.contains(&id) {
                        debug!(level = %level.id, order = %id, "ground-truth reconciliation dropped stale close order");
                        let _ = level.cancel_close();
                    }
                }
            }
        }

        Ok(())
    }

    fn apply_order_update(&mut self, event: crate::exchange::OrderUpdateEvent) {
        if let Some(level_id) = self.open_order_index.get(&event.exchange_order_id).copied() {
            let level = self.level_mut(level_id);
            match event.status {
                OrderStatus::Filled => {
                    if level.on_open_filled().is_ok() {
                        if let Some(fill_price) = event.avg_fill_price {
                            level.open_price = fill_price;
                        }
                        info!(level = %level.id, price = %level.open_price, "open order filled");
                    }
                    self.open_order_index.remove(&event.exchange_order_id);
                }
                OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired => {
                    let _ = level.cancel_open();
                    self.open_order_index.remove(&event.exchange_order_id);
                }
                OrderStatus::New | OrderStatus::PartiallyFilled => {}
            }
            return;
        }

        if let Some(level_id) = self.close_order_index.get(&event.exchange_order_id).copied() {
            let level = self.level_mut(level_id);
            match event.status {
                OrderStatus::Filled => {
                    if level.on_close_filled().is_ok() {
                        info!(level = %level.id, price = %level.close_price, "close order filled, round trip complete");
                    }
                    self.close_order_index.remove(&event.exchange_order_id);
                }
                OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired => {
                    let _ = level.cancel_close();
                    self.close_order_index.remove(&event.exchange_order_id);
                }
                OrderStatus::New | OrderStatus::PartiallyFilled => {}
            }
        }
    }

    fn level_mut(&mut self, id: LevelId) -> &mut GridLevel {
        self.levels.iter_mut().find(|l| l.id == id).expect("level index always points at a live level")
    }

    /// Step 3.
    fn risk_gate(&self, mid: Decimal) -> RiskGateResult {
        if mid >= self.params.stop_loss_upper || mid <= self.params.stop_loss_lower {
            return RiskGateResult::StopLossBreached;
        }

        let center = self.params.channel_center();
        if center.is_zero() {
            return RiskGateResult::Clear;
        }
        let deviation = ((mid - center) / center).abs();
        if deviation > self.config.max_grid_deviation {
            return RiskGateResult::DeviationExceeded;
        }

        RiskGateResult::Clear
    }

    /// Step 4 (opens) + step 5 (place).
    async fn place_opens(&mut self, mid: Decimal) -> Result<usize, EngineError> {
        if let Some(last) = self.last_batch {
            if last.elapsed().as_secs() < self.config.order_frequency_seconds {
                return Ok(0);
            }
        }

        let open_slots = self.config.max_open_orders.saturating_sub(self.open_count());
        if open_slots == 0 {
            return Ok(0);
        }

        let mut candidates: Vec<LevelId> = self
            .levels
            .iter()
            .filter(|l| l.state() == GridLevelState::NotActive)
            .map(|l| l.id)
            .collect();
        candidates.sort_by_key(|id| {
            let level = self.levels.iter().find(|l| l.id == *id).unwrap();
            (level.open_price - mid).abs()
        });
        candidates.truncate(open_slots.min(self.config.max_orders_per_batch));

        let mut placed = 0;
        for id in candidates {
            let level = self.levels.iter().find(|l| l.id == id).unwrap().clone();
            let price = quantize_price(level.open_price, &self.filters);
            let qty = quantize_qty(level.amount, &self.filters, false);
            if price * qty < self.filters.min_notional {
                warn!(level = %id, "open candidate still below min_notional after quantization, skipping");
                continue;
            }

            let request = PlaceOrderRequest::limit(&self.symbol, level.open_side, price, qty, self.account_side.position_side_str());
            match self.client.place_order(request).await {
                Ok(result) => {
                    let level = self.level_mut(id);
                    if level.place_open(result.exchange_order_id.clone()).is_ok() {
                        self.open_order_index.insert(result.exchange_order_id, id);
                        placed += 1;
                    }
                }
                Err(err) if err.recoverable() => {
                    warn!(level = %id, error = %err, "open placement failed, retrying next tick");
                }
                Err(err) => return Err(err),
            }
        }

        if placed > 0 {
            self.last_batch = Some(Instant::now());
        }
        Ok(placed)
    }

    /// Step 4 (closes) + step 5 (place).
    async fn place_closes(&mut self) -> Result<usize, EngineError> {
        let candidates: Vec<LevelId> = self
            .levels
            .iter()
            .filter(|l| l.state() == GridLevelState::OpenFilled)
            .map(|l| l.id)
            .collect();

        let mut placed = 0;
        for id in candidates {
            let level = self.levels.iter().find(|l| l.id == id).unwrap().clone();
            let close_side = self.account_side.close_side();
            let mid = self.shared.latest_price().map(|p| p.mid).unwrap_or(level.open_price);
            let raw_close_price = close_price(level.open_price, close_side, self.config.take_profit_ratio, self.config.safe_extra_spread, mid);
            let price = quantize_price(raw_close_price, &self.filters);
            let qty = quantize_qty(level.amount, &self.filters, false);

            let request = PlaceOrderRequest::limit(&self.symbol, close_side, price, qty, self.account_side.position_side_str());
            match self.client.place_order(request).await {
                Ok(result) => {
                    let level = self.level_mut(id);
                    level.close_price = price;
                    if level.place_close(result.exchange_order_id.clone()).is_ok() {
                        self.close_order_index.insert(result.exchange_order_id, id);
                        placed += 1;
                    }
                }
                Err(err) if err.recoverable() => {
                    warn!(level = %id, error = %err, "close placement failed, retrying next tick");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(placed)
    }

    /// Step 6: a completed round trip is where PnL accrues — reset the
    /// level so it re-enters the NOT_ACTIVE candidate pool next tick.
    fn reset_completed_levels(&mut self) -> usize {
        let mut count = 0;
        for level in self.levels.iter_mut() {
            if level.state() == GridLevelState::Complete {
                let _ = level.reset();
                count += 1;
            }
        }
        count
    }
}

/// Close price for a filled open at `open_price`: offset by `take_profit_ratio`
/// in the profitable direction, nudged by `safe_extra_spread` if that offset
/// would cross the current mid and turn the close into a taker fill.
fn close_price(open_price: Decimal, close_side: Side, take_profit_ratio: Decimal, safe_extra_spread: Decimal, mid: Decimal) -> Decimal {
    match close_side {
        Side::Sell => {
            let price = open_price * (Decimal::ONE + take_profit_ratio);
            if price <= mid {
                mid + safe_extra_spread
            } else {
                price
            }
        }
        Side::Buy => {
            let price = open_price * (Decimal::ONE - take_profit_ratio);
            if price >= mid {
                mid - safe_extra_spread
            } else {
                price
            }
        }
    }
}

fn build_levels(params: &GridParameters, config: &ExecutorConfig, filters: &SymbolFilters) -> Vec<GridLevel> {
    let prices = bog_level_prices(params, filters);
    prices
        .into_iter()
        .enumerate()
        .filter(|(_, price)| match config.activation_bounds {
            Some((low, high)) => *price >= low && *price <= high,
            None => true,
        })
        .map(|(i, price)| {
            let open_price = quantize_price(price, filters);
            let quantity = quantize_qty(params.amount_per_grid / price, filters, false);
            let open_side = config.side.open_side();
            let nominal_close = close_price(open_price, config.side.close_side(), config.take_profit_ratio, config.safe_extra_spread, open_price);
            GridLevel::new(LevelId(i as u32), open_price, nominal_close, quantity, open_side)
        })
        .collect()
}

/// Evenly spaced level prices across `[lower, upper]`, duplicated here (not
/// imported from `bog-strategies`, which depends on `bog-core`) — kept
/// trivial and inlined rather than introducing a dependency cycle. Each price
/// is quantized to `price_tick` so the function is self-consistent even
/// before `build_levels` re-quantizes on the way into a `GridLevel`.
fn bog_level_prices(params: &GridParameters, filters: &SymbolFilters) -> Vec<Decimal> {
    if params.grid_levels < 2 {
        return vec![quantize_price(params.lower, filters)];
    }
    let steps = Decimal::from(params.grid_levels - 1);
    let range = params.upper - params.lower;
    (0..params.grid_levels)
        .map(|i| quantize_price(params.lower + Decimal::from(i) * range / steps, filters))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::SimulatedExchangeClient;
    use crate::shared::PriceSnapshot;
    use crate::testing::{test_leverage_brackets, test_symbol_filters};
    use rust_decimal_macros::dec;

    fn params() -> GridParameters {
        GridParameters {
            upper: dec!(0.18),
            lower: dec!(0.16),
            grid_spacing: dec!(0.0004),
            grid_levels: 5,
            amount_per_grid: dec!(20),
            quantity_per_grid: dec!(100),
            safe_leverage: 10,
            stop_loss_upper: dec!(0.20),
            stop_loss_lower: dec!(0.14),
        }
    }

    fn config(side: AccountSide) -> ExecutorConfig {
        ExecutorConfig {
            symbol: "DOGEUSDC".to_string(),
            side,
            max_open_orders: 5,
            max_orders_per_batch: 5,
            order_frequency_seconds: 0,
            activation_bounds: None,
            take_profit_ratio: dec!(0.01),
            safe_extra_spread: dec!(0.00001),
            max_grid_deviation: dec!(0.10),
        }
    }

    async fn executor(side: AccountSide, mid: Decimal) -> (GridExecutor<SimulatedExchangeClient>, Arc<SharedMarketData>) {
        let filters = test_symbol_filters();
        let client = SimulatedExchangeClient::shared(filters, test_leverage_brackets(), Vec::new(), mid, dec!(10000));
        let shared = Arc::new(SharedMarketData::new(20));
        shared.publish_price(PriceSnapshot::new(mid, mid));
        let params = Arc::new(params());
        let executor = GridExecutor::new(client, shared.clone(), params, config(side), filters, Arc::new(AtomicBool::new(false)));
        (executor, shared)
    }

    #[tokio::test]
    async fn first_tick_places_opens_on_every_notactive_level() {
        let (mut executor, _shared) = executor(AccountSide::Long, dec!(0.17)).await;
        let report = executor.tick().await.unwrap();
        assert!(report.opens_placed > 0);
        assert_eq!(report.risk_gate, Some(RiskGateResult::Clear));
    }

    #[tokio::test]
    async fn stop_loss_breach_trips_risk_gate_and_shuts_down() {
        let (mut executor, shared) = executor(AccountSide::Long, dec!(0.205)).await;
        let report = executor.tick().await.unwrap();
        assert_eq!(report.risk_gate, Some(RiskGateResult::StopLossBreached));
        assert_eq!(report.opens_placed, 0);
        assert!(shared.shutdown_requested());
        assert!(executor.shutdown.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn deviation_gate_trips_before_stop_loss() {
        // center = 0.17, max_grid_deviation = 0.10 -> gate trips above ~0.187
        let (mut executor, _shared) = executor(AccountSide::Long, dec!(0.19)).await;
        let report = executor.tick().await.unwrap();
        assert_eq!(report.risk_gate, Some(RiskGateResult::DeviationExceeded));
    }

    #[tokio::test]
    async fn open_fill_and_close_round_trip_resets_level() {
        let (mut executor, shared) = executor(AccountSide::Long, dec!(0.17)).await;
        executor.tick().await.unwrap();

        let filled_level = executor.levels.iter().find(|l| l.state() == GridLevelState::OpenPlaced).unwrap().clone();
        executor.client.advance_price(filled_level.open_price - dec!(0.0001));
        executor.tick().await.unwrap();
        let level = executor.levels.iter().find(|l| l.id == filled_level.id).unwrap();
        assert_eq!(level.state(), GridLevelState::ClosePlaced);

        let close_price = level.close_price;
        executor.client.advance_price(close_price + dec!(0.0001));
        let report = executor.tick().await.unwrap();
        assert_eq!(report.levels_completed, 1);

        let level = executor.levels.iter().find(|l| l.id == filled_level.id).unwrap();
        assert_eq!(level.state(), GridLevelState::NotActive);
        let _ = shared;
    }

    #[tokio::test]
    async fn rate_limited_open_retries_next_tick_without_orphaned_order() {
        let (mut executor, _shared) = executor(AccountSide::Long, dec!(0.17)).await;
        let total_notactive = executor.levels.iter().filter(|l| l.state() == GridLevelState::NotActive).count();

        executor.client.reject_next_orders_with_rate_limit(1);
        let first = executor.tick().await.unwrap();
        assert_eq!(first.opens_placed, total_notactive - 1);
        assert_eq!(executor.open_order_index.len(), first.opens_placed);
        assert_eq!(executor.levels.iter().filter(|l| l.state() == GridLevelState::NotActive).count(), 1);

        let second = executor.tick().await.unwrap();
        assert_eq!(second.opens_placed, 1);
        assert_eq!(executor.levels.iter().filter(|l| l.state() == GridLevelState::NotActive).count(), 0);
        assert_eq!(executor.open_order_index.len(), total_notactive);
    }

    #[tokio::test]
    async fn close_price_nudges_to_stay_maker() {
        let price = close_price(dec!(0.17), Side::Sell, dec!(0.01), dec!(0.00001), dec!(0.172));
        assert!(price > dec!(0.172));
    }
}
