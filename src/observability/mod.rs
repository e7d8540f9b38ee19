//! # Observability
//!
//! - `metrics`: Prometheus metrics collection
//! - `logging`: `tracing` subscriber setup for the binary

pub mod logging;
pub mod metrics;

// Re-export for convenience
pub use metrics::*;
