//! # Actix Middleware Library
//!
//! Shared middleware components for Inkwell Actix services
//!
//! ## Modules
//! - `metrics`: Prometheus request metrics and the `/metrics` exporter
//! - `rate_limit`: Redis-backed fixed-window rate limiting (fail-open)

pub mod metrics;
pub mod rate_limit;

pub use metrics::{render_metrics, MetricsMiddleware};
pub use rate_limit::{client_ip, RateLimitConfig, RateLimitMiddleware, RateLimiter};
