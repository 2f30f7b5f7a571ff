use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Per-job temporary workspace under the configured scratch directory.
///
/// Deletion is best-effort with a bounded retry: a workspace that cannot be
/// removed is logged and left behind, it never fails the job.
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub async fn create(work_dir: &Path, job_id: &str) -> Result<Self> {
        let root = work_dir.join(format!("job-{}", job_id));
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create workspace {:?}", root))?;

        info!("Created workspace {:?}", root);

        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.root.join(name)
    }

    /// Create a subdirectory inside the workspace.
    pub async fn subdir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.root.join(name);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create workspace subdir {:?}", dir))?;
        Ok(dir)
    }

    /// Recursively delete the workspace, retrying with a fixed delay.
    pub async fn remove_with_retries(self, retries: u32, delay: Duration) {
        for attempt in 1..=retries.max(1) {
            match tokio::fs::remove_dir_all(&self.root).await {
                Ok(()) => {
                    info!("Deleted workspace {:?}", self.root);
                    return;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
                Err(e) => {
                    warn!(
                        "Attempt {}/{} to delete workspace {:?} failed: {}",
                        attempt, retries, self.root, e
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        error!(
            "Failed to delete workspace {:?} after {} attempts",
            self.root, retries
        );
    }
}
