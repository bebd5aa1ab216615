//! Upstream backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server with its cached forwarder
//! - Track active connections (for Least Connections selection)
//! - Track passive health: stacking failure penalties with timed decay
//!
//! # Design Decisions
//! - Only transport-level errors count as failures; a 5xx produced by the
//!   backend is still a response, not a failure
//! - Each recorded failure schedules its own detached decrement; penalties
//!   never collapse into a single boolean

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderName;
use url::Url;

use crate::config::validation::ValidationError;
use crate::config::BackendConfig;
use crate::http::forwarder::Forwarder;
use crate::http::replacer::Replacer;

/// Custom health predicate overriding the default down-check.
pub type DownPredicate = Arc<dyn Fn(&Backend) -> bool + Send + Sync>;

/// A single upstream backend server.
pub struct Backend {
    /// Validated base URL of this backend.
    base_url: Url,
    /// Forwarding engine bound to this backend, reused across attempts.
    forwarder: Forwarder,
    /// Number of currently inflight forwarded requests.
    active_connections: AtomicUsize,
    /// Outstanding failure penalties. Each decays after `fail_timeout`.
    fails: AtomicU32,
    /// Administrative out-of-rotation flag.
    unhealthy: AtomicBool,
    /// How long one recorded failure keeps weighing on this backend.
    fail_timeout: Duration,
    /// Extra headers applied to every forwarded request, in operator order.
    /// Values are templates resolved per attempt.
    extra_headers: Vec<(HeaderName, String)>,
    /// Optional predicate replacing the default down-check.
    check_down: Option<DownPredicate>,
}

impl Backend {
    /// Build a backend from its configuration entry.
    ///
    /// Address problems are fatal here, at construction, never at request time.
    pub fn from_config(config: &BackendConfig) -> Result<Self, ValidationError> {
        let base_url = Url::parse(&config.address).map_err(|e| ValidationError::InvalidAddress {
            address: config.address.clone(),
            reason: e.to_string(),
        })?;
        if base_url.scheme() != "http" {
            return Err(ValidationError::InvalidAddress {
                address: config.address.clone(),
                reason: "only http backends are supported".to_string(),
            });
        }
        if base_url.host_str().is_none() {
            return Err(ValidationError::InvalidAddress {
                address: config.address.clone(),
                reason: "missing host".to_string(),
            });
        }

        let mut extra_headers = Vec::with_capacity(config.extra_headers.len());
        for header in &config.extra_headers {
            let name = HeaderName::try_from(header.name.as_str())
                .map_err(|_| ValidationError::InvalidHeaderName {
                    name: header.name.clone(),
                })?;
            extra_headers.push((name, header.value.clone()));
        }

        let forwarder = Forwarder::new(&base_url)?;
        Ok(Self {
            base_url,
            forwarder,
            active_connections: AtomicUsize::new(0),
            fails: AtomicU32::new(0),
            unhealthy: AtomicBool::new(false),
            fail_timeout: Duration::from_secs(config.fail_timeout_secs),
            extra_headers,
            check_down: None,
        })
    }

    /// Replace the default down-check with a custom predicate.
    pub fn with_check_down(mut self, predicate: DownPredicate) -> Self {
        self.check_down = Some(predicate);
        self
    }

    /// Base URL of this backend.
    pub fn address(&self) -> &Url {
        &self.base_url
    }

    /// The forwarding engine bound to this backend.
    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    /// Extra header templates configured for this backend, in order.
    pub fn extra_headers(&self) -> &[(HeaderName, String)] {
        &self.extra_headers
    }

    /// Resolve the extra-header templates against one request.
    pub fn resolve_extra_headers(
        &self,
        replacer: &Replacer,
    ) -> Vec<(HeaderName, axum::http::HeaderValue)> {
        self.extra_headers
            .iter()
            .filter_map(|(name, template)| {
                let value = replacer.replace(template);
                match axum::http::HeaderValue::from_str(&value) {
                    Ok(value) => Some((name.clone(), value)),
                    Err(_) => {
                        tracing::debug!(header = %name, "resolved value is not a valid header value, skipping");
                        None
                    }
                }
            })
            .collect()
    }

    // --- Health ---

    /// Record one failed attempt against this backend.
    ///
    /// The penalty is lifted by a detached timer after `fail_timeout`, so the
    /// decrement outlives the request that observed the failure. Concurrent
    /// failures stack and each decays on its own schedule.
    pub fn record_failure(self: &Arc<Self>) {
        self.fails.fetch_add(1, Ordering::Relaxed);
        let backend = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(backend.fail_timeout).await;
            backend.fails.fetch_sub(1, Ordering::Relaxed);
        });
    }

    /// Whether this backend should currently be excluded from selection.
    ///
    /// Lock-free read of the shared counters.
    pub fn is_down(&self) -> bool {
        if let Some(check) = &self.check_down {
            return check(self);
        }
        self.unhealthy.load(Ordering::Relaxed) || self.fails.load(Ordering::Relaxed) > 0
    }

    /// Administratively pull this backend out of (or back into) rotation.
    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.unhealthy.store(unhealthy, Ordering::Relaxed);
    }

    /// Current number of outstanding failure penalties.
    pub fn fails(&self) -> u32 {
        self.fails.load(Ordering::Relaxed)
    }

    /// Duration one recorded failure keeps weighing on this backend.
    pub fn fail_timeout(&self) -> Duration {
        self.fail_timeout
    }

    // --- Connection accounting ---

    /// Current number of inflight forwarded requests.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Count one inflight attempt. The guard releases it on drop.
    pub fn acquire(self: &Arc<Self>) -> ConnectionGuard {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard {
            backend: Arc::clone(self),
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("address", &self.base_url.as_str())
            .field("fails", &self.fails.load(Ordering::Relaxed))
            .field("active_connections", &self.active_connections.load(Ordering::Relaxed))
            .field("unhealthy", &self.unhealthy.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// RAII guard for the inflight-connection count.
#[derive(Debug)]
pub struct ConnectionGuard {
    backend: Arc<Backend>,
}

impl Deref for ConnectionGuard {
    type Target = Backend;
    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.backend.active_connections.fetch_sub(1, Ordering::Relaxed);
    }
}
