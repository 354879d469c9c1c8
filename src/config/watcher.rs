//! Reloads the endpoint table when its configuration file changes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_endpoints;
use crate::core::EndpointStore;

/// Editors often emit a burst of events for one save.
const DEBOUNCE: Duration = Duration::from_millis(250);

/// Watches the endpoint configuration file and publishes every valid revision to an
/// [`EndpointStore`]. An invalid revision leaves the current table in place.
pub struct ConfigWatcher {
    path: PathBuf,
    store: Arc<EndpointStore>,
}

impl ConfigWatcher {
    pub fn new(path: &Path, store: Arc<EndpointStore>) -> Self {
        Self {
            path: path.to_path_buf(),
            store,
        }
    }

    /// Start watching. The returned watcher must be kept alive for as long as reloads
    /// are wanted; dropping it stops the watch and ends the reload task.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let (change_tx, mut change_rx) = mpsc::unbounded_channel::<()>();
        let file_name = self.path.file_name().map(|name| name.to_os_string());

        // Watch the parent directory so files replaced by rename are still seen.
        let watch_dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = (event.kind.is_modify() || event.kind.is_create())
                        && event
                            .paths
                            .iter()
                            .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if relevant {
                        let _ = change_tx.send(());
                    }
                }
                Err(e) => tracing::error!("Config watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %self.path.display(), "Config watcher started");

        let path = self.path;
        let store = self.store;
        tokio::spawn(async move {
            while change_rx.recv().await.is_some() {
                tokio::time::sleep(DEBOUNCE).await;
                while change_rx.try_recv().is_ok() {}

                tracing::info!(path = %path.display(), "Config file change detected, reloading");
                match load_endpoints(&path).await {
                    Ok(table) => {
                        tracing::info!(endpoints = table.len(), "Endpoint configuration reloaded");
                        store.replace(table);
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to reload config: {}. Keeping current configuration.",
                            e
                        );
                    }
                }
            }
            tracing::debug!("Config reload task finished");
        });

        Ok(watcher)
    }
}
