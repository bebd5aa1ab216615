//! Random selection policy.

use std::sync::Arc;

use crate::load_balancer::{backend::Backend, Policy};

/// Uniform random selector over the live backends.
#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl Policy for Random {
    fn select(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        let live: Vec<&Arc<Backend>> = backends.iter().filter(|b| !b.is_down()).collect();
        if live.is_empty() {
            return None;
        }
        Some(live[fastrand::usize(..live.len())].clone())
    }
}
