//! Failure handling: passive health, retry budget, unhealthy exclusion.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Request;
use axum::Router;

use upstream_proxy::config::BackendConfig;
use upstream_proxy::load_balancer::backend::Backend;
use upstream_proxy::load_balancer::pool::UpstreamPool;
use upstream_proxy::load_balancer::{round_robin::RoundRobin, Policy};
use upstream_proxy::{Balancer, ProxyError, ProxyOutcome};

mod common;

fn make_backend(addr: std::net::SocketAddr, fail_timeout_secs: u64) -> Arc<Backend> {
    Arc::new(
        Backend::from_config(&BackendConfig {
            address: format!("http://{addr}"),
            fail_timeout_secs,
            extra_headers: Vec::new(),
        })
        .unwrap(),
    )
}

fn request(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

async fn body_string(outcome: ProxyOutcome) -> String {
    match outcome {
        ProxyOutcome::Forwarded(response) => {
            let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
                .await
                .unwrap();
            String::from_utf8(bytes.to_vec()).unwrap()
        }
        ProxyOutcome::NotMatched(_) => panic!("request was not forwarded"),
    }
}

#[tokio::test]
async fn test_connect_failure_marks_backend_down() {
    let backend = make_backend(common::closed_port().await, 10);
    let pool = UpstreamPool::new("/", vec![backend.clone()], Box::new(RoundRobin::new()));
    let balancer = Balancer::new(vec![pool]);

    let start = Instant::now();
    let err = balancer.handle(request("/"), None).await.err().unwrap();

    match err {
        ProxyError::Unreachable { attempts } => assert!(attempts >= 1),
        other => panic!("unexpected error: {other}"),
    }
    assert!(backend.fails() > 0, "failure must be recorded immediately");
    assert!(backend.is_down());
    // The lone backend leaves rotation after its first failure, so the
    // request terminates well inside the budget.
    assert!(start.elapsed() < Duration::from_secs(30));
}

/// A policy that pins every selection to one backend, regardless of health.
#[derive(Debug)]
struct Pinned(Arc<Backend>);

impl Policy for Pinned {
    fn select(&self, _backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        Some(self.0.clone())
    }
}

#[tokio::test]
async fn test_retry_loop_ends_at_time_budget() {
    let backend = make_backend(common::closed_port().await, 1);
    let pool = UpstreamPool::new("/", vec![backend.clone()], Box::new(Pinned(backend.clone())));
    let budget = Duration::from_millis(300);
    let balancer = Balancer::new(vec![pool]).with_retry_budget(budget);

    let start = Instant::now();
    let err = balancer.handle(request("/"), None).await.err().unwrap();
    let elapsed = start.elapsed();

    match err {
        ProxyError::Unreachable { attempts } => {
            assert!(attempts > 1, "the same failing target must be re-attempted");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(elapsed >= budget, "loop must run the budget out");
    assert!(elapsed < Duration::from_secs(5), "loop must not run far past it");
}

#[tokio::test]
async fn test_unhealthy_backend_excluded_from_rotation() {
    let addr1 = common::spawn_backend(Router::new().fallback(|| async { "one" })).await;
    let addr2 = common::spawn_backend(Router::new().fallback(|| async { "two" })).await;

    let b1 = make_backend(addr1, 10);
    let b2 = make_backend(addr2, 10);
    b1.set_unhealthy(true);

    let pool = UpstreamPool::new(
        "/",
        vec![b1.clone(), b2.clone()],
        Box::new(RoundRobin::new()),
    );
    let balancer = Balancer::new(vec![pool]);

    for _ in 0..6 {
        let outcome = balancer.handle(request("/"), None).await.unwrap();
        assert_eq!(body_string(outcome).await, "two");
    }

    // Back in rotation once the flag clears.
    b1.set_unhealthy(false);
    let mut bodies = Vec::new();
    for _ in 0..4 {
        let outcome = balancer.handle(request("/"), None).await.unwrap();
        bodies.push(body_string(outcome).await);
    }
    assert!(bodies.iter().any(|b| b == "one"));
    assert!(bodies.iter().any(|b| b == "two"));
}
