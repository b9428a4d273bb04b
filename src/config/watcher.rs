//! Configuration file watcher for hot reload of request defaults.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::defaults::DefaultContext;
use crate::config::loader::load_config;

/// Watches a config file and swaps its `[request]` table into a default context.
pub struct ConfigWatcher {
    path: PathBuf,
    context: DefaultContext,
}

impl ConfigWatcher {
    /// Create a watcher that updates `context` (usually the global one).
    pub fn new(path: &Path, context: DefaultContext) -> Self {
        Self {
            path: path.to_path_buf(),
            context,
        }
    }

    /// Load the file once and store it, without watching.
    pub fn reload(&self) -> Result<(), crate::config::ConfigError> {
        let config = load_config(&self.path)?;
        self.context.store(Arc::new(config.request));
        tracing::info!(path = ?self.path, "Request defaults reloaded");
        Ok(())
    }

    /// Start watching the file. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let context = self.context.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&path) {
                            Ok(new_config) => {
                                context.store(Arc::new(new_config.request));
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload config: {}. Keeping current defaults.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
