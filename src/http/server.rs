//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router and wire up middleware
//! - Dispatch requests to the balancer
//! - Map balancer outcomes to client responses (404 / 502 / 413)
//! - Record per-request metrics
//! - Graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::validation::ValidationError;
use crate::config::ProxyConfig;
use crate::load_balancer::balancer::{Balancer, ProxyError, ProxyOutcome};
use crate::observability::metrics;

const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Swapped wholesale on reconfiguration; requests in flight keep the
    /// pools they started with.
    pub balancer: Arc<ArcSwap<Balancer>>,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    balancer: Arc<ArcSwap<Balancer>>,
}

impl HttpServer {
    /// Create a server from configuration. Pool construction errors are
    /// fatal here, before the listener ever accepts a request.
    pub fn new(config: &ProxyConfig) -> Result<Self, ValidationError> {
        Ok(Self::from_balancer(Balancer::from_config(
            &config.pools,
            &config.proxy,
        )?))
    }

    /// Create a server around an already-built balancer.
    pub fn from_balancer(balancer: Balancer) -> Self {
        let balancer = Arc::new(ArcSwap::from_pointee(balancer));
        let state = AppState {
            balancer: balancer.clone(),
        };
        let router = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http());
        Self { router, balancer }
    }

    /// Handle to the shared balancer slot, for configuration reload.
    pub fn shared_balancer(&self) -> Arc<ArcSwap<Balancer>> {
        self.balancer.clone()
    }

    /// Run the server on the given listener until shutdown is signaled.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown.recv() => {},
                    _ = tokio::signal::ctrl_c() => {},
                }
                tracing::info!("shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler: hand the request to the balancer, map the outcome.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
) -> Response {
    let start = Instant::now();

    if !request.headers().contains_key(X_REQUEST_ID) {
        if let Ok(id) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
            request.headers_mut().insert(X_REQUEST_ID, id);
        }
    }
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let balancer = state.balancer.load_full();
    match balancer.handle(request, Some(remote)).await {
        Ok(ProxyOutcome::Forwarded(response)) => {
            metrics::record_request(&method, response.status().as_u16(), start);
            response
        }
        Ok(ProxyOutcome::NotMatched(_)) => {
            // Not a failure: nothing is configured for this path.
            tracing::debug!(request_id = %request_id, path = %path, "no matching upstream");
            metrics::record_request(&method, 404, start);
            (StatusCode::NOT_FOUND, "no matching upstream").into_response()
        }
        Err(ProxyError::Unreachable { attempts }) => {
            // One report per exhausted request; individual attempts only
            // show up at debug level.
            tracing::warn!(
                request_id = %request_id,
                path = %path,
                attempts,
                "unreachable backend"
            );
            metrics::record_request(&method, 502, start);
            (StatusCode::BAD_GATEWAY, "unreachable backend").into_response()
        }
        Err(err @ ProxyError::BodyTooLarge(_)) => {
            tracing::debug!(request_id = %request_id, path = %path, error = %err, "request body rejected");
            metrics::record_request(&method, 413, start);
            (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response()
        }
    }
}
