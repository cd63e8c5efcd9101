//! Monitoring and observability: Prometheus metrics export, an HTTP server
//! for scraping, and an alert manager for severity-tagged operational events.

pub mod alerts;
pub mod metrics;
pub mod server;

pub use alerts::{Alert, AlertCategory, AlertId, AlertManager, AlertManagerConfig, AlertOutput, AlertSeverity};
pub use metrics::{MetricsRegistry, RiskMetrics, SystemMetrics, TradingMetrics};
pub use server::{MetricsServer, MetricsServerConfig};
