//! Reverse-proxy load balancer.
//!
//! For each inbound request the balancer matches the path against configured
//! upstream pools (first match wins), selects a live backend through the
//! pool's policy, forwards the request, and streams the response back.
//! Failed attempts record a stacking, self-expiring penalty against the
//! backend and are retried within a wall-clock budget; exhaustion surfaces
//! as a single 502.
//!
//! ```text
//! request → http::server → load_balancer::balancer
//!               ├─ routing::matcher   (which pool?)
//!               ├─ load_balancer::*   (which backend?)
//!               ├─ http::replacer     (extra-header templates)
//!               └─ http::forwarder    (one streamed attempt)
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;

// Traffic management
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load_balancer::balancer::{Balancer, ProxyError, ProxyOutcome};
