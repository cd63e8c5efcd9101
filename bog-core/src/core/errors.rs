//! Error taxonomy for the dual-account grid engine.
//!
//! Every error carries enough context to decide, without re-inspecting the
//! call site, whether the caller should retry, back off, or escalate to a
//! stop-loss teardown.

use std::fmt;

/// How serious an error is, independent of whether it is recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Top-level error type surfaced by exchange clients, executors, and the
/// controller. Transport/exchange failures carry a message rather than the
/// underlying error value so this type stays `Clone` and thread-shareable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Connection reset, timeout, DNS failure — nothing the exchange said no to.
    NetworkError { message: String },

    /// The exchange responded with an error payload (bad param, server fault).
    APIError { code: i64, message: String },

    /// A rate-limit bucket was exhausted before the request could be sent.
    RateLimitError { bucket: String, retry_after_ms: u64 },

    /// Credentials were rejected or a signature did not validate.
    AuthenticationError { message: String },

    /// A value failed a local sanity check before being sent (bad price, qty, etc).
    ValidationError { field: String, message: String },

    /// An order would have required more margin than the account has free.
    InsufficientBalance { required: String, available: String },

    /// An order-level failure: rejected, unexpectedly missing, or inconsistent fill.
    OrderError { order_id: String, message: String },

    /// A position-level failure: it doesn't match what the engine expected.
    PositionError { symbol: String, message: String },

    /// The ATR analyzer could not produce a channel from the given candles
    /// (too few candles, or a non-finite/negative price field).
    AtrError { message: String },
}

impl EngineError {
    pub fn severity(&self) -> Severity {
        match self {
            EngineError::NetworkError { .. } => Severity::Warning,
            EngineError::APIError { .. } => Severity::Error,
            EngineError::RateLimitError { .. } => Severity::Warning,
            EngineError::AuthenticationError { .. } => Severity::Critical,
            EngineError::ValidationError { .. } => Severity::Error,
            EngineError::InsufficientBalance { .. } => Severity::Critical,
            EngineError::OrderError { .. } => Severity::Error,
            EngineError::PositionError { .. } => Severity::Critical,
            EngineError::AtrError { .. } => Severity::Critical,
        }
    }

    /// Whether the caller should retry (with backoff) instead of escalating
    /// to a stop-loss teardown. Authentication failures, capital shortfalls
    /// and position-state inconsistencies are never self-healing.
    pub fn recoverable(&self) -> bool {
        match self {
            EngineError::NetworkError { .. } => true,
            EngineError::APIError { .. } => true,
            EngineError::RateLimitError { .. } => true,
            EngineError::AuthenticationError { .. } => false,
            EngineError::ValidationError { .. } => false,
            EngineError::InsufficientBalance { .. } => false,
            EngineError::OrderError { .. } => true,
            EngineError::PositionError { .. } => false,
            EngineError::AtrError { .. } => false,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NetworkError { message } => {
                write!(f, "network error: {}", message)
            }
            EngineError::APIError { code, message } => {
                write!(f, "exchange API error {}: {}", code, message)
            }
            EngineError::RateLimitError { bucket, retry_after_ms } => {
                write!(f, "rate limit exhausted on {} bucket, retry after {}ms", bucket, retry_after_ms)
            }
            EngineError::AuthenticationError { message } => {
                write!(f, "authentication failed: {}", message)
            }
            EngineError::ValidationError { field, message } => {
                write!(f, "validation failed for {}: {}", field, message)
            }
            EngineError::InsufficientBalance { required, available } => {
                write!(f, "insufficient balance: required {}, available {}", required, available)
            }
            EngineError::OrderError { order_id, message } => {
                write!(f, "order {} failed: {}", order_id, message)
            }
            EngineError::PositionError { symbol, message } => {
                write!(f, "position error on {}: {}", symbol, message)
            }
            EngineError::AtrError { message } => {
                write!(f, "ATR analyzer error: {}", message)
            }
        }
    }
}

impl std::error::Error for EngineError {}
