//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path → balancer.rs (first pool whose prefix matches)
//!     → Apply selection policy:
//!         - round_robin.rs (rotate through live backends)
//!         - random.rs (uniform pick among live backends)
//!         - least_conn.rs (fewest inflight requests)
//!     → backend.rs (acquire connection guard, cached forwarder)
//!     → forward, record outcome, retry within the time budget
//! ```
//!
//! # Design Decisions
//! - Backends that are down are excluded at selection time; returning a down
//!   backend is a contract violation of the policy
//! - Policies may hold private rotation state scoped to one pool

use std::sync::Arc;

pub mod backend;
pub mod balancer;
pub mod least_conn;
pub mod pool;
pub mod random;
pub mod round_robin;

use backend::Backend;

/// A backend selection policy.
///
/// `select` must only return backends whose `is_down()` is currently false,
/// or `None` when no live backend exists.
pub trait Policy: Send + Sync + std::fmt::Debug {
    fn select(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}

/// Look up a policy by its configuration identifier.
pub fn policy_from_name(name: &str) -> Option<Box<dyn Policy>> {
    match name {
        "round_robin" => Some(Box::new(round_robin::RoundRobin::new())),
        "random" => Some(Box::new(random::Random::new())),
        "least_conn" => Some(Box::new(least_conn::LeastConnections::new())),
        _ => None,
    }
}
