//! Semantic configuration checks, past what serde can express.

use axum::http::HeaderName;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;
use crate::load_balancer::policy_from_name;

/// A configuration problem. Always fatal at load or construction time,
/// never surfaced at request time.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("pool {from:?} has no backends")]
    EmptyPool { from: String },

    #[error("invalid backend address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("unknown selection policy {name:?}")]
    UnknownPolicy { name: String },

    #[error("invalid extra header name {name:?}")]
    InvalidHeaderName { name: String },
}

/// Check everything pool construction would reject, up front, so a bad
/// config fails at load with a pointed error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), ValidationError> {
    for pool in &config.pools {
        if pool.backends.is_empty() {
            return Err(ValidationError::EmptyPool {
                from: pool.from.clone(),
            });
        }
        if policy_from_name(&pool.policy).is_none() {
            return Err(ValidationError::UnknownPolicy {
                name: pool.policy.clone(),
            });
        }
        for backend in &pool.backends {
            let url = Url::parse(&backend.address).map_err(|e| ValidationError::InvalidAddress {
                address: backend.address.clone(),
                reason: e.to_string(),
            })?;
            if url.scheme() != "http" {
                return Err(ValidationError::InvalidAddress {
                    address: backend.address.clone(),
                    reason: "only http backends are supported".to_string(),
                });
            }
            for header in &backend.extra_headers {
                HeaderName::try_from(header.name.as_str()).map_err(|_| {
                    ValidationError::InvalidHeaderName {
                        name: header.name.clone(),
                    }
                })?;
            }
        }
    }
    Ok(())
}
