use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::sleep;

/// Outcome of a single retention pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Periodically deletes temp files that outlived their request.
pub struct RetentionWorker {
    dir: PathBuf,
    retention: Duration,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl RetentionWorker {
    pub fn new(
        dir: impl Into<PathBuf>,
        retention: Duration,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            dir: dir.into(),
            retention,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            "🚀 Retention worker started (dir={}, retention={:?}, interval={:?})",
            self.dir.display(),
            self.retention,
            self.interval
        );

        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    // A dropped sender means the server is gone too
                    if changed.is_err() || *self.shutdown.borrow() {
                        tracing::info!("🛑 Retention worker shutting down");
                        break;
                    }
                }
                _ = sleep(self.interval) => {
                    self.sweep_once().await;
                }
            }
        }
    }

    /// Runs one pass over the directory. Per-entry errors are logged and counted, never fatal.
    pub async fn sweep_once(&self) -> SweepReport {
        sweep_dir(&self.dir, self.retention, SystemTime::now()).await
    }
}

async fn sweep_dir(dir: &Path, retention: Duration, now: SystemTime) -> SweepReport {
    let mut report = SweepReport::default();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("Failed to read temp directory {}: {}", dir.display(), e);
            report.failed += 1;
            return report;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Failed to list temp directory {}: {}", dir.display(), e);
                report.failed += 1;
                break;
            }
        };
        report.scanned += 1;
        let path = entry.path();

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            // Removed by its own request since the listing
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                tracing::warn!("Failed to get file info for {}: {}", path.display(), e);
                report.failed += 1;
                continue;
            }
        };

        if !metadata.is_file() {
            continue;
        }

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!("No modification time for {}: {}", path.display(), e);
                report.failed += 1;
                continue;
            }
        };

        // Timestamps in the future count as fresh
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= retention {
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("🧹 Deleted old file: {} (age {:?})", path.display(), age);
                report.deleted += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("Failed to delete file {}: {}", path.display(), e);
                report.failed += 1;
            }
        }
    }

    if report.deleted > 0 || report.failed > 0 {
        tracing::info!(
            "✅ Retention sweep: scanned={}, deleted={}, failed={}",
            report.scanned,
            report.deleted,
            report.failed
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn file_aged(dir: &Path, name: &str, age: Duration) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
        path
    }

    fn worker(dir: &Path) -> (RetentionWorker, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let worker = RetentionWorker::new(
            dir,
            Duration::from_secs(3600),
            Duration::from_millis(10),
            rx,
        );
        (worker, tx)
    }

    #[tokio::test]
    async fn test_sweep_deletes_only_old_files() {
        let dir = tempfile::tempdir().unwrap();
        let old = file_aged(dir.path(), "old.pdf", Duration::from_secs(2 * 3600));
        let fresh = file_aged(dir.path(), "fresh.xlsx", Duration::from_secs(60));
        std::fs::create_dir(dir.path().join("profile")).unwrap();

        let (worker, _tx) = worker(dir.path());
        let report = worker.sweep_once().await;

        assert_eq!(report, SweepReport { scanned: 3, deleted: 1, failed: 0 });
        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(dir.path().join("profile").exists());
    }

    #[tokio::test]
    async fn test_second_sweep_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        file_aged(dir.path(), "a.eml", Duration::from_secs(5 * 3600));
        file_aged(dir.path(), "b.txt", Duration::from_secs(10));

        let (worker, _tx) = worker(dir.path());
        let first = worker.sweep_once().await;
        let second = worker.sweep_once().await;

        assert_eq!(first.deleted, 1);
        assert_eq!(second, SweepReport { scanned: 1, deleted: 0, failed: 0 });
    }

    #[tokio::test]
    async fn test_future_timestamps_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skewed.txt");
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(600)).unwrap();

        let report = sweep_dir(dir.path(), Duration::ZERO, SystemTime::now()).await;
        assert_eq!(report.deleted, 0);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_missing_directory_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (worker, _tx) = worker(&dir.path().join("gone"));
        let report = worker.sweep_once().await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.deleted, 0);
    }

    #[tokio::test]
    async fn test_run_sweeps_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let old = file_aged(dir.path(), "stale.rtf", Duration::from_secs(4 * 3600));

        let (worker, tx) = worker(dir.path());
        let handle = tokio::spawn(worker.run());

        for _ in 0..200 {
            if !old.exists() {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert!(!old.exists());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker should stop after shutdown")
            .unwrap();
    }
}
