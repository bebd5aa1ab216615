//! Config file watching and hot reload.
//!
//! On change the file is reloaded, validated, and the balancer swapped
//! wholesale. A bad new config is logged and ignored; the running pools
//! stay live.

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::config::loader::load_config;
use crate::load_balancer::balancer::Balancer;

/// Watch `path` and swap `balancer` on successful reloads.
///
/// The returned watcher must be kept alive for notifications to keep
/// flowing.
pub fn spawn_config_watcher(
    path: PathBuf,
    balancer: Arc<ArcSwap<Balancer>>,
) -> notify::Result<notify::RecommendedWatcher> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
        if let Ok(event) = result {
            if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                let _ = tx.send(());
            }
        }
    })?;
    watcher.watch(&path, RecursiveMode::NonRecursive)?;

    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            match load_config(&path) {
                Ok(config) => match Balancer::from_config(&config.pools, &config.proxy) {
                    Ok(rebuilt) => {
                        balancer.store(Arc::new(rebuilt));
                        tracing::info!(
                            config = %path.display(),
                            pools = config.pools.len(),
                            "configuration reloaded"
                        );
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "pool rebuild failed, keeping previous configuration");
                    }
                },
                Err(err) => {
                    tracing::error!(error = %err, "config reload failed, keeping previous configuration");
                }
            }
        }
    });

    Ok(watcher)
}
