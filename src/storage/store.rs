use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Durable object storage for chunks and post-processing artifacts.
///
/// Keys are `/`-separated paths. `put` overwrites: re-sending a chunk index
/// replaces the object, it never duplicates it.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// List object keys under a prefix, sorted lexicographically.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Bulk delete. Individual failures are logged and skipped.
    async fn delete(&self, keys: &[String]) -> Result<()>;
}

/// Filesystem-backed artifact store: object keys map onto paths under a root
/// directory.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create storage root {:?}", root))?;

        info!("Artifact store rooted at {:?}", root);

        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn collect_keys(&self, dir: &Path, out: &mut Vec<String>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                self.collect_keys(&path, out)?;
            } else if let Ok(rel) = path.strip_prefix(&self.root) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create parent dirs for {:?}", path))?;
        }

        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write artifact {}", key))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read artifact {}", key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = self.path_for(prefix.trim_end_matches('/'));
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        self.collect_keys(&dir, &mut keys)
            .with_context(|| format!("Failed to list artifacts under {}", prefix))?;
        keys.sort();

        Ok(keys)
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            let path = self.path_for(key);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("Failed to delete artifact {}: {}", key, e);
            }
        }

        Ok(())
    }
}
