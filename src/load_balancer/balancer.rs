//! Request orchestration: match, select, forward, retry.
//!
//! # Design Decisions
//! - First matching pool wins; pool order is caller-controlled
//! - The retry loop terminates on wall-clock budget, never on attempt count.
//!   The policy is re-invoked every iteration with no already-tried
//!   exclusion, so a single failing backend may be reselected until either
//!   its fail counter takes it out of rotation or the budget elapses
//! - An attempt already in flight when the budget expires is not canceled;
//!   the loop simply does not start another one
//! - The inbound body is buffered once so a retry can resend it; response
//!   bodies stream through untouched

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, Response};
use thiserror::Error;

use crate::config::validation::ValidationError;
use crate::config::{PoolConfig, ProxySettings};
use crate::http::replacer::{self, Replacer};
use crate::load_balancer::pool::UpstreamPool;
use crate::routing::matcher;

/// Terminal, per-request failure. Per-attempt transport errors never escape
/// the retry loop; only these do.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Every attempt failed within the budget, or no backend was selectable.
    #[error("unreachable backend")]
    Unreachable { attempts: u32 },

    /// The inbound body exceeded the retransmission buffer cap.
    #[error("buffering request body: {0}")]
    BodyTooLarge(#[source] axum::Error),
}

/// What became of one inbound request.
pub enum ProxyOutcome {
    /// A backend produced a response; its body streams through.
    Forwarded(Response<Body>),
    /// No pool prefix matched; the request is handed back for the next
    /// pipeline stage. Not a failure.
    NotMatched(Request<Body>),
}

/// The load-balancing layer: ordered pools plus the retry budget.
#[derive(Debug)]
pub struct Balancer {
    pools: Vec<UpstreamPool>,
    retry_budget: Duration,
    max_buffer_bytes: usize,
}

impl Balancer {
    pub fn new(pools: Vec<UpstreamPool>) -> Self {
        let defaults = ProxySettings::default();
        Self {
            pools,
            retry_budget: Duration::from_secs(defaults.retry_budget_secs),
            max_buffer_bytes: defaults.max_buffer_bytes,
        }
    }

    pub fn from_config(pools: &[PoolConfig], settings: &ProxySettings) -> Result<Self, ValidationError> {
        let pools = pools
            .iter()
            .map(UpstreamPool::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            pools,
            retry_budget: Duration::from_secs(settings.retry_budget_secs),
            max_buffer_bytes: settings.max_buffer_bytes,
        })
    }

    pub fn with_retry_budget(mut self, budget: Duration) -> Self {
        self.retry_budget = budget;
        self
    }

    pub fn pools(&self) -> &[UpstreamPool] {
        &self.pools
    }

    /// Handle one inbound request.
    ///
    /// Matches the path against the pools in order, then drives the
    /// select → forward → record-failure loop until success, an empty
    /// selection, or budget exhaustion.
    pub async fn handle(
        &self,
        req: Request<Body>,
        remote: Option<SocketAddr>,
    ) -> Result<ProxyOutcome, ProxyError> {
        let pool = match self
            .pools
            .iter()
            .find(|p| matcher::matches(p.prefix(), req.uri().path()))
        {
            Some(pool) => pool,
            None => return Ok(ProxyOutcome::NotMatched(req)),
        };

        let (parts, body) = req.into_parts();
        // The Host as the caller sent it, captured before any rewriting.
        let request_host = replacer::request_host(&parts);
        let body = axum::body::to_bytes(body, self.max_buffer_bytes)
            .await
            .map_err(ProxyError::BodyTooLarge)?;

        // Built once per request, and only if some attempt needs it.
        let mut replacer: Option<Replacer> = None;
        let start = Instant::now();
        let mut attempts: u32 = 0;

        while start.elapsed() < self.retry_budget {
            let Some(backend) = pool.select() else {
                return Err(ProxyError::Unreachable { attempts });
            };
            let _guard = backend.acquire();
            attempts += 1;

            let extra_headers = if backend.extra_headers().is_empty() {
                Vec::new()
            } else {
                let replacer = replacer
                    .get_or_insert_with(|| Replacer::new(&parts, &request_host, remote));
                backend.resolve_extra_headers(replacer)
            };

            match backend
                .forwarder()
                .attempt(&parts, &extra_headers, body.clone())
                .await
            {
                Ok(response) => return Ok(ProxyOutcome::Forwarded(response)),
                Err(err) => {
                    tracing::debug!(
                        backend = %backend.address(),
                        attempt = attempts,
                        error = %err,
                        "forward attempt failed"
                    );
                    backend.record_failure();
                }
            }
        }

        Err(ProxyError::Unreachable { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, PoolConfig};

    fn pool_config(from: &str) -> PoolConfig {
        PoolConfig {
            from: from.to_string(),
            policy: "round_robin".to_string(),
            backends: vec![BackendConfig {
                address: "http://127.0.0.1:9000".to_string(),
                fail_timeout_secs: 10,
                extra_headers: Vec::new(),
            }],
        }
    }

    #[tokio::test]
    async fn test_unmatched_request_is_handed_back() {
        let balancer =
            Balancer::from_config(&[pool_config("/api")], &ProxySettings::default()).unwrap();

        let req = Request::builder()
            .uri("/images/logo.png")
            .body(Body::empty())
            .unwrap();

        match balancer.handle(req, None).await.unwrap() {
            ProxyOutcome::NotMatched(req) => {
                assert_eq!(req.uri().path(), "/images/logo.png");
            }
            ProxyOutcome::Forwarded(_) => panic!("request must not be forwarded"),
        }
    }

    #[tokio::test]
    async fn test_empty_selection_is_terminal() {
        let balancer =
            Balancer::from_config(&[pool_config("/")], &ProxySettings::default()).unwrap();
        balancer.pools()[0].backends()[0].set_unhealthy(true);

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let err = balancer.handle(req, None).await.err().unwrap();
        assert!(matches!(err, ProxyError::Unreachable { attempts: 0 }));
    }
}
