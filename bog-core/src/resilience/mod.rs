//! Resilience patterns for unattended operation: retry backoff, a circuit
//! breaker for repeated exchange-call failures, and a signal-driven kill
//! switch for graceful and emergency shutdown.

pub mod backoff;
pub mod circuit_breaker;
pub mod kill_switch;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use kill_switch::{KillSwitch, KillSwitchState};
