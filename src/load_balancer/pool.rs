//! Upstream pool: a route prefix, its backends, and one selection policy.

use std::sync::Arc;

use crate::config::validation::ValidationError;
use crate::config::PoolConfig;
use crate::load_balancer::{backend::Backend, policy_from_name, Policy};

/// One route-bound group of backends.
///
/// Immutable after construction; reconfiguration rebuilds pools wholesale.
/// Only the per-backend counters ever change.
#[derive(Debug)]
pub struct UpstreamPool {
    /// Path prefix this pool is routed on.
    from: String,
    /// Backends in configured order.
    backends: Vec<Arc<Backend>>,
    /// Selection policy, with any rotation state scoped to this pool.
    policy: Box<dyn Policy>,
}

impl UpstreamPool {
    pub fn new(from: impl Into<String>, backends: Vec<Arc<Backend>>, policy: Box<dyn Policy>) -> Self {
        Self {
            from: from.into(),
            backends,
            policy,
        }
    }

    /// Build a pool from its configuration entry.
    ///
    /// Invalid backend addresses, header names, or policy identifiers are
    /// fatal here, never at request time.
    pub fn from_config(config: &PoolConfig) -> Result<Self, ValidationError> {
        if config.backends.is_empty() {
            return Err(ValidationError::EmptyPool {
                from: config.from.clone(),
            });
        }
        let policy = policy_from_name(&config.policy).ok_or_else(|| ValidationError::UnknownPolicy {
            name: config.policy.clone(),
        })?;
        let backends = config
            .backends
            .iter()
            .map(|b| Backend::from_config(b).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(config.from.clone(), backends, policy))
    }

    /// The path prefix this pool is routed on.
    pub fn prefix(&self) -> &str {
        &self.from
    }

    /// Ask the policy for a live backend.
    pub fn select(&self) -> Option<Arc<Backend>> {
        self.policy.select(&self.backends)
    }

    /// The backends of this pool, in configured order.
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, PoolConfig};

    #[tokio::test]
    async fn test_from_config() {
        let pool = UpstreamPool::from_config(&PoolConfig {
            from: "/api".to_string(),
            policy: "round_robin".to_string(),
            backends: vec![BackendConfig {
                address: "http://127.0.0.1:9000".to_string(),
                fail_timeout_secs: 10,
                extra_headers: Vec::new(),
            }],
        })
        .unwrap();

        assert_eq!(pool.prefix(), "/api");
        assert_eq!(pool.backends().len(), 1);
        assert!(pool.select().is_some());
    }

    #[test]
    fn test_unknown_policy_is_fatal() {
        let result = UpstreamPool::from_config(&PoolConfig {
            from: "/api".to_string(),
            policy: "most_recently_bribed".to_string(),
            backends: vec![BackendConfig {
                address: "http://127.0.0.1:9000".to_string(),
                fail_timeout_secs: 10,
                extra_headers: Vec::new(),
            }],
        });
        assert!(matches!(result, Err(ValidationError::UnknownPolicy { .. })));
    }

    #[test]
    fn test_empty_pool_is_fatal() {
        let result = UpstreamPool::from_config(&PoolConfig {
            from: "/api".to_string(),
            policy: "round_robin".to_string(),
            backends: Vec::new(),
        });
        assert!(matches!(result, Err(ValidationError::EmptyPool { .. })));
    }
}
