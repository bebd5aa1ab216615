//! Round-robin selection policy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{backend::Backend, Policy};

/// Round-robin selector.
/// Stores an internal cursor to rotate through backends, skipping any that
/// are currently down.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Policy for RoundRobin {
    fn select(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }

        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        let len = backends.len();

        for i in 0..len {
            let backend = &backends[(start + i) % len];
            if !backend.is_down() {
                return Some(backend.clone());
            }
        }
        None
    }
}
