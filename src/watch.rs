//! Watch mode: recompile the stylesheet module on every change under the root

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;

use crate::errors::{PluginError, Result};
use crate::live_update::{LiveUpdateChannel, LiveUpdateMessage};
use crate::plugin::{DevServer, Plugin};
use crate::provider::StylesheetModuleProvider;
use crate::virtual_module::STYLESHEET_MODULE;

const IGNORED_DIRS: &[&str] = &["node_modules", ".git", "dist", "target"];

/// Whether a change to `path` should not trigger a rebuild
pub fn should_ignore(path: &Path, outputs: &[PathBuf]) -> bool {
    if outputs.iter().any(|output| output == path) {
        return true;
    }

    path.components().any(|component| match component {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name)),
        _ => false,
    })
}

/// Recursive watcher over the project root
pub struct ProjectWatcher {
    _watcher: RecommendedWatcher,
    tx: broadcast::Sender<PathBuf>,
}

impl ProjectWatcher {
    /// Watch `root`, skipping ignored directories and the given output files
    pub fn new(root: &Path, outputs: Vec<PathBuf>) -> Result<Self> {
        let (tx, _) = broadcast::channel(100);
        let tx_clone = tx.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    for path in event.paths {
                        if should_ignore(&path, &outputs) {
                            continue;
                        }
                        let _ = tx_clone.send(path);
                    }
                }
                Err(e) => tracing::warn!("File watcher error: {}", e),
            }
        })
        .map_err(|e| PluginError::WatchError(e.to_string()))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| PluginError::WatchError(format!("Cannot watch {}: {}", root.display(), e)))?;

        Ok(Self {
            _watcher: watcher,
            tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PathBuf> {
        self.tx.subscribe()
    }
}

/// Print every live-update message as one JSON line on stdout
pub fn spawn_update_printer(channel: &LiveUpdateChannel) -> tokio::task::JoinHandle<()> {
    let mut rx = channel.subscribe();

    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        loop {
            match rx.recv().await {
                Ok(message) => {
                    if let Err(e) = write_json_line(&mut stdout, &message).await {
                        tracing::warn!("Failed to print live update: {}", e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Live-update printer fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn write_json_line(stdout: &mut tokio::io::Stdout, message: &LiveUpdateMessage) -> Result<()> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

/// Dev server stand-in carrying the live-update channel
pub fn dev_server(channel: &LiveUpdateChannel) -> DevServer {
    DevServer {
        ws: Some(channel.clone()),
    }
}

/// Reload the module after each change until the watcher goes away
///
/// Failed reloads are logged and the loop keeps going; the next change
/// retries.
pub async fn watch_loop(
    provider: &mut StylesheetModuleProvider,
    watcher: &ProjectWatcher,
    out: Option<&Path>,
) -> Result<()> {
    let mut changes = watcher.subscribe();

    loop {
        let changed = match changes.recv().await {
            Ok(path) => path,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return Ok(()),
        };

        // Editors emit bursts of events per save
        let mut batched = 0;
        while changes.try_recv().is_ok() {
            batched += 1;
        }
        tracing::debug!(path = %changed.display(), batched, "Change detected");

        match provider.load(STYLESHEET_MODULE.internal()).await {
            Ok(Some(module)) => {
                if let Some(out) = out {
                    tokio::fs::write(out, &module).await?;
                }
                tracing::info!(path = %changed.display(), "Reloaded stylesheet module");
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Reload failed: {}", e),
        }
    }
}
