use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::sleep;
use uuid::Uuid;

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Removes staging directories orphaned by a crashed or killed process.
///
/// Only UUID-named directories are considered, so a shared staging root is safe.
pub struct StagingSweeper {
    staging_root: PathBuf,
    max_age: Duration,
    shutdown: watch::Receiver<bool>,
}

impl StagingSweeper {
    pub fn new(staging_root: PathBuf, max_age: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            staging_root,
            max_age,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            "🧹 Staging sweeper started for {}",
            self.staging_root.display()
        );

        loop {
            let removed = self.sweep().await;
            if removed > 0 {
                tracing::info!("🧹 Removed {} orphaned staging directories", removed);
            }

            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Staging sweeper shutting down");
                    break;
                }
                _ = sleep(SWEEP_INTERVAL) => {}
            }
        }
    }

    /// One pass over the staging root; returns how many directories were removed.
    pub async fn sweep(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.staging_root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                tracing::warn!("Cannot read staging root: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_staging_dir = entry
                .file_name()
                .to_str()
                .is_some_and(|name| Uuid::parse_str(name).is_ok());
            if !is_staging_dir {
                continue;
            }

            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_dir() {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|m| SystemTime::now().duration_since(m).ok())
                .unwrap_or_default();
            if age < self.max_age {
                continue;
            }

            match tokio::fs::remove_dir_all(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::error!(
                    "Failed to remove orphaned staging directory {}: {}",
                    entry.path().display(),
                    e
                ),
            }
        }

        removed
    }
}
