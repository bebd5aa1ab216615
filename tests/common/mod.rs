//! Shared helpers for socket-level proxy tests.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

use upstream_proxy::{HttpServer, Shutdown};

/// Serve `router` on an ephemeral local port and return its address.
pub async fn spawn_backend(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Run the proxy on an ephemeral port. The returned `Shutdown` must be kept
/// alive for the duration of the test and triggered at the end.
#[allow(dead_code)]
pub async fn spawn_proxy(server: HttpServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    (addr, shutdown)
}

/// An address nothing is listening on (bound, then released).
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
