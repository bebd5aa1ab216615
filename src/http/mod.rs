//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, outcome mapping)
//!     → [balancer matches a pool and selects a backend]
//!     → forwarder.rs (one attempt: rewrite, strip, stream)
//!     → replacer.rs (extra-header templates, when configured)
//!     → Response streamed to client
//! ```

pub mod forwarder;
pub mod replacer;
pub mod server;

pub use server::HttpServer;
