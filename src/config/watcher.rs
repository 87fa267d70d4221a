//! Configuration file watcher for hot reload.
//!
//! A save usually arrives as several events (truncate, write, metadata).
//! Events are coalesced: the generation is loaded once the files have been
//! quiet for one poll interval.

use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_sources, load_tree, pipelines_dir_for, DEFAULT_PIPELINES_PATH};
use crate::engine::GenerationSources;

/// Watches the global document and the pipeline directory, and sends a
/// freshly loaded generation on every change.
pub struct ConfigWatcher {
    config_path: PathBuf,
    pipelines_dir: Option<PathBuf>,
    extra_pipelines: Vec<PathBuf>,
    poll_interval: Duration,
    update_tx: mpsc::UnboundedSender<GenerationSources>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for loaded generations.
    pub fn new(
        config_path: &Path,
        pipelines_dir: Option<&Path>,
    ) -> (Self, mpsc::UnboundedReceiver<GenerationSources>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                config_path: config_path.to_path_buf(),
                pipelines_dir: pipelines_dir.map(Path::to_path_buf),
                extra_pipelines: Vec::new(),
                poll_interval: Duration::from_secs(2),
                update_tx,
            },
            update_rx,
        )
    }

    /// Pipeline files outside the pipeline directory to watch as well.
    pub fn with_extra_pipelines(mut self, files: Vec<PathBuf>) -> Self {
        self.extra_pipelines = files;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The pipeline directory to watch. Without an explicit one, it is read
    /// from the global document once, at start.
    fn resolved_pipelines_dir(&self) -> PathBuf {
        if let Some(dir) = &self.pipelines_dir {
            return dir.clone();
        }
        match load_tree(&self.config_path) {
            Ok(global) => pipelines_dir_for(&self.config_path, &global),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot read pipeline directory from config, using default");
                self.config_path
                    .parent()
                    .unwrap_or_else(|| Path::new(""))
                    .join(DEFAULT_PIPELINES_PATH)
            }
        }
    }

    /// Start watching in a background thread. Dropping the returned
    /// watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let pipelines_dir = self.resolved_pipelines_dir();
        let (dirty_tx, dirty_rx) = std_mpsc::channel::<()>();

        let reloader = Reloader {
            config_path: self.config_path.clone(),
            pipelines_dir: pipelines_dir.clone(),
            extra_pipelines: self.extra_pipelines.clone(),
            quiet_period: self.poll_interval,
            update_tx: self.update_tx.clone(),
        };
        thread::Builder::new()
            .name("config-reload".to_string())
            .spawn(move || reloader.run(dirty_rx))
            .map_err(notify::Error::io)?;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        tracing::debug!(paths = ?event.paths, "Configuration change detected");
                        let _ = dirty_tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        watcher.watch(&self.config_path, RecursiveMode::NonRecursive)?;
        if pipelines_dir.is_dir() {
            watcher.watch(&pipelines_dir, RecursiveMode::NonRecursive)?;
        }
        for file in &self.extra_pipelines {
            watcher.watch(file, RecursiveMode::NonRecursive)?;
        }

        tracing::info!(
            config = %self.config_path.display(),
            pipelines_dir = %pipelines_dir.display(),
            "Config watcher started"
        );
        Ok(watcher)
    }
}

/// Loads a generation once a burst of change events has settled.
struct Reloader {
    config_path: PathBuf,
    pipelines_dir: PathBuf,
    extra_pipelines: Vec<PathBuf>,
    quiet_period: Duration,
    update_tx: mpsc::UnboundedSender<GenerationSources>,
}

impl Reloader {
    /// Runs until the watcher, and with it the event sender, is dropped.
    fn run(self, dirty_rx: std_mpsc::Receiver<()>) {
        while dirty_rx.recv().is_ok() {
            loop {
                match dirty_rx.recv_timeout(self.quiet_period) {
                    Ok(()) => continue,
                    Err(std_mpsc::RecvTimeoutError::Timeout) => break,
                    Err(std_mpsc::RecvTimeoutError::Disconnected) => return,
                }
            }

            tracing::info!("Configuration change detected, reloading");
            match load_sources(&self.config_path, Some(&self.pipelines_dir), &self.extra_pipelines) {
                Ok(sources) => {
                    if self.update_tx.send(sources).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to reload configuration, keeping the live generation");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_reloader_stops_when_watcher_is_dropped() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("config.toml");
        fs::write(&config, "[proxy]\nid = 'gw'").unwrap();

        let (update_tx, mut update_rx) = mpsc::unbounded_channel();
        let reloader = Reloader {
            config_path: config,
            pipelines_dir: dir.path().join("pipelines"),
            extra_pipelines: Vec::new(),
            quiet_period: Duration::from_millis(50),
            update_tx,
        };

        let (dirty_tx, dirty_rx) = std_mpsc::channel();
        for _ in 0..5 {
            dirty_tx.send(()).unwrap();
        }
        drop(dirty_tx);
        reloader.run(dirty_rx);

        assert!(update_rx.try_recv().is_err());
    }

    #[test]
    fn test_settled_change_is_loaded() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("config.toml");
        fs::write(&config, "[proxy]\nid = 'gw'").unwrap();

        let (update_tx, mut update_rx) = mpsc::unbounded_channel();
        let reloader = Reloader {
            config_path: config,
            pipelines_dir: dir.path().join("pipelines"),
            extra_pipelines: Vec::new(),
            quiet_period: Duration::from_millis(50),
            update_tx,
        };

        let (dirty_tx, dirty_rx) = std_mpsc::channel();
        let handle = thread::spawn(move || reloader.run(dirty_rx));
        dirty_tx.send(()).unwrap();
        dirty_tx.send(()).unwrap();
        thread::sleep(Duration::from_millis(300));
        drop(dirty_tx);
        handle.join().unwrap();

        let sources = update_rx.try_recv().unwrap();
        assert_eq!(
            sources.global.tree.get("proxy").and_then(|p| p.get("id")).and_then(|v| v.as_str()),
            Some("gw")
        );
        assert!(update_rx.try_recv().is_err());
    }
}
