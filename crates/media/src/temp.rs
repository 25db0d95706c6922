//! Disk-backed staging area for transcode intermediates.
//!
//! Every pipeline run claims a uniquely named path, so concurrent runs never
//! contend. The sweep only touches files older than the TTL; an artifact that
//! is both in flight and older than the TTL can race with it, which cannot
//! happen while pipeline artifacts live for seconds and the TTL is minutes.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use {
    tracing::{debug, warn},
    uuid::Uuid,
};

use crate::error::Result;

/// Process-wide staging directory.
#[derive(Debug)]
pub struct TempArtifactStore {
    dir: PathBuf,
}

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

impl TempArtifactStore {
    /// Open (and create if needed) the staging directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "temp artifact store ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A fresh path inside the staging directory. Nothing is created on disk.
    pub fn create_temp_path(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{suffix}", Uuid::new_v4().simple()))
    }

    /// Claim a unique artifact path. The file is removed when the artifact drops.
    pub fn acquire(&self, suffix: &str) -> TempArtifact {
        TempArtifact {
            path: self.create_temp_path(suffix),
            created_at: SystemTime::now(),
        }
    }

    /// Delete every regular file whose modification time is older than `ttl`.
    ///
    /// Individual failures are logged and counted; the pass always completes.
    pub async fn sweep(&self, ttl: Duration) -> SweepReport {
        self.sweep_at(ttl, SystemTime::now()).await
    }

    async fn sweep_at(&self, ttl: Duration, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return report,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "failed to list temp dir");
                return report;
            },
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %self.dir.display(), error = %e, "failed to read temp dir entry");
                    report.failed += 1;
                    break;
                },
            };
            let path = entry.path();

            let modified = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta.modified(),
                Ok(_) => continue,
                Err(e) => Err(e),
            };
            report.scanned += 1;

            let modified = match modified {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to stat temp artifact");
                    report.failed += 1;
                    continue;
                },
            };

            let age = now.duration_since(modified).unwrap_or_default();
            if age <= ttl {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), age_secs = age.as_secs(), "swept temp artifact");
                    report.removed += 1;
                },
                Err(e) if e.kind() == ErrorKind::NotFound => {},
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to delete temp artifact");
                    report.failed += 1;
                },
            }
        }

        report
    }
}

/// A claimed staging path. Deleted on drop, on every exit path.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    created_at: SystemTime,
}

impl TempArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, data: &[u8]) -> Result<()> {
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        // Blocking unlink, possibly on a runtime worker thread: Drop cannot await.
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(
                path = %self.path.display(),
                held_ms = self.created_at.elapsed().unwrap_or_default().as_millis() as u64,
                "removed temp artifact"
            ),
            Err(e) if e.kind() == ErrorKind::NotFound => {},
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove temp artifact"),
        }
    }
}
