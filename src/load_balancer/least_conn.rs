//! Least Connections selection policy.

use std::sync::Arc;

use crate::load_balancer::{backend::Backend, Policy};

/// Least connections selector.
/// Picks the live backend with the fewest inflight requests.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Policy for LeastConnections {
    fn select(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        // Ties go to the earliest-configured backend (stability).
        backends
            .iter()
            .filter(|b| !b.is_down())
            .min_by_key(|b| b.active_connections())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    fn backend(port: u16) -> Arc<Backend> {
        Arc::new(
            Backend::from_config(&BackendConfig {
                address: format!("http://127.0.0.1:{port}"),
                fail_timeout_secs: 10,
                extra_headers: Vec::new(),
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_picks_fewest_inflight() {
        let policy = LeastConnections::new();
        let b1 = backend(8080);
        let b2 = backend(8081);

        let _g1 = b1.acquire();
        let backends = vec![b1.clone(), b2.clone()];

        let s1 = policy.select(&backends).unwrap();
        assert_eq!(s1.address(), b2.address());

        let _g2 = b2.acquire();
        let _g3 = b2.acquire();

        let s2 = policy.select(&backends).unwrap();
        assert_eq!(s2.address(), b1.address());
    }

    #[tokio::test]
    async fn test_down_backend_never_wins() {
        let policy = LeastConnections::new();
        let b1 = backend(8080);
        let b2 = backend(8081);
        b1.set_unhealthy(true);

        // b1 has fewer inflight requests but is down.
        let _g = b2.acquire();
        let selected = policy.select(&[b1, b2.clone()]).unwrap();
        assert_eq!(selected.address(), b2.address());
    }
}
