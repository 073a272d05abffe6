//! Configuration file watcher for hot reload.
//!
//! # Responsibilities
//! - Notice writes to the config file
//! - Re-read and validate it through the loader
//! - Hand valid configs to the server's route reloader
//!
//! # Design Decisions
//! - An invalid file is logged and skipped; the server keeps its routes
//! - Events for other files in the same directory are ignored

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::RenderServerConfig;

/// Watches one config file and sends each valid revision.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RenderServerConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RenderServerConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Load the file and send it if it is valid. Returns whether it was sent.
    pub fn reload(&self) -> bool {
        reload(&self.path, &self.update_tx)
    }

    /// Start watching the file. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, update_tx } = self;
        let file_name = path.file_name().map(ToOwned::to_owned);
        let reload_path = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_write(&event.kind) => {
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(ToOwned::to_owned) == file_name);
                    if ours {
                        tracing::info!(path = ?reload_path, "Config file change detected, reloading");
                        reload(&reload_path, &update_tx);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        // Editors often replace the file, so watch its directory.
        let target = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&target, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

fn is_write(kind: &EventKind) -> bool {
    kind.is_modify() || kind.is_create()
}

fn reload(path: &Path, tx: &mpsc::UnboundedSender<RenderServerConfig>) -> bool {
    match load_config(path) {
        Ok(config) => {
            tracing::debug!(routes = config.routes.len(), "Reloaded config is valid");
            tx.send(config).is_ok()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
            false
        }
    }
}
