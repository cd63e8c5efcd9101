//! Exchange rate-limit budgeting.
//!
//! The engine talks to each account's REST API under three independent
//! limit classes (see the exchange's own weight/order-rate documentation):
//!
//! - `REQUEST_WEIGHT` — general API call weight, ~2400/minute
//! - `ORDERS_1MIN` — order placement/cancellation, ~1200/minute
//! - `ORDERS_1SEC` — order placement/cancellation, ~300 per 10 seconds
//!
//! Each class gets its own token-bucket [`RateLimiter`]; a single account's
//! [`RateLimiterSet`] bundles all three so callers check once per request.

pub mod rate_limiter;

pub use rate_limiter::{RateLimiter, RateLimiterConfig};

/// The three independent rate-limit buckets tracked per exchange account.
pub struct RateLimiterSet {
    pub request_weight: RateLimiter,
    pub orders_1min: RateLimiter,
    pub orders_1sec: RateLimiter,
}

impl RateLimiterSet {
    /// Builds the standard budget: 2400 weight/min, 1200 orders/min, 300
    /// orders per 10s — matching the exchange's published defaults.
    pub fn standard() -> Self {
        Self {
            request_weight: RateLimiter::new(RateLimiterConfig {
                max_orders_per_second: 40,
                burst_capacity: 2400,
                refill_rate: 40.0,
                refill_interval: std::time::Duration::from_secs(1),
            }),
            orders_1min: RateLimiter::new(RateLimiterConfig {
                max_orders_per_second: 20,
                burst_capacity: 1200,
                refill_rate: 20.0,
                refill_interval: std::time::Duration::from_secs(1),
            }),
            orders_1sec: RateLimiter::new(RateLimiterConfig {
                max_orders_per_second: 30,
                burst_capacity: 300,
                refill_rate: 30.0,
                refill_interval: std::time::Duration::from_secs(1),
            }),
        }
    }

    /// True only if every bucket has room for one more order-class call.
    pub fn allow_order(&self) -> bool {
        self.orders_1min.allow() && self.orders_1sec.allow()
    }

    /// True if a general (non order-mutating) API call has budget.
    pub fn allow_request(&self) -> bool {
        self.request_weight.allow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_set_starts_with_full_buckets() {
        let limiters = RateLimiterSet::standard();
        assert!(limiters.allow_order());
        assert!(limiters.allow_request());
    }

    #[test]
    fn order_budget_is_independent_of_request_budget() {
        let limiters = RateLimiterSet::standard();
        for _ in 0..300 {
            limiters.orders_1sec.allow();
        }
        assert!(limiters.allow_request());
    }
}
