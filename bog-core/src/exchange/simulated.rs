//! A deterministic, in-memory `ExchangeClient` used by the binary (in place
//! of real credentials) and by every integration test. Models resting maker
//! orders that fill only when an externally driven price crosses them — a
//! grid engine whose limit orders filled the instant they were placed would
//! never demonstrate the open/close cycle a real one goes through.

use super::{
    BookTicker, ExchangeClient, OrderUpdateEvent, PlaceOrderRequest, PlacedOrder,
};
use crate::core::errors::EngineError;
use crate::core::types::{
    AccountSnapshot, Candle, ExchangeOrderId, LeverageBracket, OrderStatus, Side, SymbolFilters,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone)]
struct RestingOrder {
    side: Side,
    price: Decimal,
    quantity: Decimal,
}

struct Inner {
    resting: HashMap<ExchangeOrderId, RestingOrder>,
    events: Vec<OrderUpdateEvent>,
    price: Decimal,
    filters: SymbolFilters,
    brackets: Vec<LeverageBracket>,
    candles: Vec<Candle>,
    wallet_balance: Decimal,
    available_balance: Decimal,
}

/// In-memory exchange simulator: one account's worth of state behind a
/// mutex, an `AtomicU64` order-id counter, and an `AtomicBool` health flag a
/// test can flip to exercise account-failure handling.
pub struct SimulatedExchangeClient {
    inner: Mutex<Inner>,
    next_order_id: AtomicU64,
    healthy: AtomicBool,
    reject_next_orders: AtomicU64,
}

impl SimulatedExchangeClient {
    pub fn new(filters: SymbolFilters, brackets: Vec<LeverageBracket>, candles: Vec<Candle>, starting_price: Decimal, wallet_balance: Decimal) -> Self {
        Self {
            inner: Mutex::new(Inner {
                resting: HashMap::new(),
                events: Vec::new(),
                price: starting_price,
                filters,
                brackets,
                candles,
                wallet_balance,
                available_balance: wallet_balance,
            }),
            next_order_id: AtomicU64::new(1),
            healthy: AtomicBool::new(true),
            reject_next_orders: AtomicU64::new(0),
        }
    }

    pub fn shared(filters: SymbolFilters, brackets: Vec<LeverageBracket>, candles: Vec<Candle>, starting_price: Decimal, wallet_balance: Decimal) -> Arc<Self> {
        Arc::new(Self::new(filters, brackets, candles, starting_price, wallet_balance))
    }

    /// Moves the simulated market price and fills any resting order the new
    /// price crosses: a BUY fills at or below its price, a SELL at or above.
    pub fn advance_price(&self, new_price: Decimal) {
        let mut inner = self.inner.lock();
        inner.price = new_price;

        let mut filled = Vec::new();
        for (id, order) in inner.resting.iter() {
            let crosses = match order.side {
                Side::Buy => new_price <= order.price,
                Side::Sell => new_price >= order.price,
            };
            if crosses {
                filled.push((id.clone(), order.clone()));
            }
        }

        for (id, order) in filled {
            inner.resting.remove(&id);
            inner.events.push(OrderUpdateEvent {
                exchange_order_id: id,
                status: OrderStatus::Filled,
                filled_amount: order.quantity,
                avg_fill_price: Some(order.price),
                fee: Decimal::ZERO,
            });
        }
    }

    pub fn current_price(&self) -> Decimal {
        self.inner.lock().price
    }

    pub fn resting_order_count(&self) -> usize {
        self.inner.lock().resting.len()
    }

    /// Toggles the health probe used by `ping`, simulating auth/connectivity
    /// failure without tearing down the whole simulator.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Makes the next `n` `place_order` calls fail with `RateLimitError`,
    /// simulating an exchange HTTP 429.
    pub fn reject_next_orders_with_rate_limit(&self, n: u64) {
        self.reject_next_orders.store(n, Ordering::SeqCst);
    }

    fn next_id(&self) -> ExchangeOrderId {
        let n = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        ExchangeOrderId(format!("SIM-{n}"))
    }
}

#[async_trait]
impl ExchangeClient for SimulatedExchangeClient {
    async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlacedOrder, EngineError> {
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(EngineError::AuthenticationError { message: "simulated account unhealthy".into() });
        }
        if self
            .reject_next_orders
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| if n > 0 { Some(n - 1) } else { None })
            .is_ok()
        {
            return Err(EngineError::RateLimitError { bucket: "ORDERS_1SEC".into(), retry_after_ms: 250 });
        }
        if request.quantity <= Decimal::ZERO {
            return Err(EngineError::ValidationError {
                field: "quantity".into(),
                message: "quantity must be positive".into(),
            });
        }

        let id = self.next_id();
        let mut inner = self.inner.lock();

        match request.price {
            // MARKET (reduce-only forced close): fills immediately at the
            // current simulated price.
            None => {
                let fill_price = inner.price;
                inner.events.push(OrderUpdateEvent {
                    exchange_order_id: id.clone(),
                    status: OrderStatus::Filled,
                    filled_amount: request.quantity,
                    avg_fill_price: Some(fill_price),
                    fee: Decimal::ZERO,
                });
            }
            // LIMIT: rests until `advance_price` crosses it.
            Some(price) => {
                inner.resting.insert(
                    id.clone(),
                    RestingOrder { side: request.side, price, quantity: request.quantity },
                );
            }
        }

        Ok(PlacedOrder { exchange_order_id: id, status: OrderStatus::New })
    }

    async fn cancel_order(&self, _symbol: &str, order_id: &ExchangeOrderId) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        if inner.resting.remove(order_id).is_none() {
            return Err(EngineError::OrderError {
                order_id: order_id.to_string(),
                message: "order not found or already terminal".into(),
            });
        }
        inner.events.push(OrderUpdateEvent {
            exchange_order_id: order_id.clone(),
            status: OrderStatus::Canceled,
            filled_amount: Decimal::ZERO,
            avg_fill_price: None,
            fee: Decimal::ZERO,
        });
        Ok(())
    }

    async fn cancel_all_orders(&self, _symbol: &str) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        let ids: Vec<ExchangeOrderId> = inner.resting.keys().cloned().collect();
        for id in ids {
            inner.resting.remove(&id);
            inner.events.push(OrderUpdateEvent {
                exchange_order_id: id,
                status: OrderStatus::Canceled,
                filled_amount: Decimal::ZERO,
                avg_fill_price: None,
                fee: Decimal::ZERO,
            });
        }
        Ok(())
    }

    async fn get_open_orders(&self, _symbol: &str) -> Result<Vec<ExchangeOrderId>, EngineError> {
        Ok(self.inner.lock().resting.keys().cloned().collect())
    }

    async fn get_account_snapshot(&self) -> Result<AccountSnapshot, EngineError> {
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(EngineError::AuthenticationError { message: "simulated account unhealthy".into() });
        }
        let inner = self.inner.lock();
        Ok(AccountSnapshot {
            wallet_balance: inner.wallet_balance,
            available_balance: inner.available_balance,
            margin_used: inner.wallet_balance - inner.available_balance,
            positions: Vec::new(),
            open_orders: Vec::new(),
            last_updated: SystemTime::now(),
        })
    }

    async fn get_leverage_brackets(&self, _symbol: &str) -> Result<Vec<LeverageBracket>, EngineError> {
        Ok(self.inner.lock().brackets.clone())
    }

    async fn set_leverage(&self, _symbol: &str, _leverage: u32) -> Result<(), EngineError> {
        Ok(())
    }

    async fn set_position_mode(&self, _hedge_mode: bool) -> Result<(), EngineError> {
        Ok(())
    }

    async fn get_symbol_filters(&self, _symbol: &str) -> Result<SymbolFilters, EngineError> {
        Ok(self.inner.lock().filters)
    }

    async fn get_candles(&self, _symbol: &str, _interval: &str, limit: usize) -> Result<Vec<Candle>, EngineError> {
        let inner = self.inner.lock();
        let start = inner.candles.len().saturating_sub(limit);
        Ok(inner.candles[start..].to_vec())
    }

    async fn get_book_ticker(&self, _symbol: &str) -> Result<BookTicker, EngineError> {
        let price = self.inner.lock().price;
        Ok(BookTicker { best_bid: price, best_ask: price })
    }

    async fn poll_order_updates(&self) -> Result<Vec<OrderUpdateEvent>, EngineError> {
        Ok(std::mem::take(&mut self.inner.lock().events))
    }

    async fn ping(&self) -> Result<(), EngineError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EngineError::AuthenticationError { message: "simulated account unhealthy".into() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_leverage_brackets, test_symbol_filters};
    use rust_decimal_macros::dec;

    fn client() -> SimulatedExchangeClient {
        SimulatedExchangeClient::new(test_symbol_filters(), test_leverage_brackets(), Vec::new(), dec!(0.17), dec!(1000))
    }

    #[tokio::test]
    async fn limit_order_rests_until_price_crosses() {
        let client = client();
        let placed = client
            .place_order(PlaceOrderRequest::limit("DOGEUSDC", Side::Buy, dec!(0.168), dec!(50), "LONG"))
            .await
            .unwrap();

        assert!(client.poll_order_updates().await.unwrap().is_empty());
        assert_eq!(client.resting_order_count(), 1);

        client.advance_price(dec!(0.169));
        assert!(client.poll_order_updates().await.unwrap().is_empty());

        client.advance_price(dec!(0.167));
        let events = client.poll_order_updates().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].exchange_order_id, placed.exchange_order_id);
        assert_eq!(events[0].status, OrderStatus::Filled);
        assert_eq!(client.resting_order_count(), 0);
    }

    #[tokio::test]
    async fn market_order_fills_immediately() {
        let client = client();
        client
            .place_order(PlaceOrderRequest::reduce_only_market("DOGEUSDC", Side::Sell, dec!(10), "LONG"))
            .await
            .unwrap();
        let events = client.poll_order_updates().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, OrderStatus::Filled);
    }

    #[tokio::test]
    async fn unhealthy_account_rejects_calls() {
        let client = client();
        client.set_healthy(false);
        assert!(client.ping().await.is_err());
        assert!(client.get_account_snapshot().await.is_err());
        assert!(client
            .place_order(PlaceOrderRequest::limit("DOGEUSDC", Side::Buy, dec!(0.17), dec!(10), "LONG"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn cancel_removes_resting_order() {
        let client = client();
        let placed = client
            .place_order(PlaceOrderRequest::limit("DOGEUSDC", Side::Buy, dec!(0.16), dec!(10), "LONG"))
            .await
            .unwrap();
        client.cancel_order("DOGEUSDC", &placed.exchange_order_id).await.unwrap();
        assert_eq!(client.resting_order_count(), 0);
        let events = client.poll_order_updates().await.unwrap();
        assert_eq!(events[0].status, OrderStatus::Canceled);
    }
}
