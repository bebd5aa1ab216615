//! Observability subsystem.
//!
//! Structured logs go through `tracing`; counters and histograms through the
//! `metrics` facade with a Prometheus exporter. Request IDs flow from the
//! server handler into every log line and onward to the backend.

pub mod logging;
pub mod metrics;
