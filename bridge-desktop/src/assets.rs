//! Packaged assets served from a directory on disk.

use async_trait::async_trait;
use bridge_traits::{
    assets::AssetBundle,
    error::{BridgeError, Result},
};
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Asset bundle rooted at a directory.
///
/// Mirrors the layout of an Android `assets/` folder, e.g.
/// `<root>/voice/hello.mp3` and `<root>/metadata/categories.json`.
pub struct DirectoryAssetBundle {
    root: PathBuf,
}

impl DirectoryAssetBundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a bundle-relative path, refusing anything that escapes the root.
    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let rel = Path::new(relative);
        let safe = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe || relative.is_empty() {
            return Err(BridgeError::OperationFailed(format!(
                "Invalid asset path: {}",
                relative
            )));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl AssetBundle for DirectoryAssetBundle {
    async fn read(&self, path: &str) -> Result<Option<Bytes>> {
        let full = self.resolve(path)?;
        match fs::read(&full).await {
            Ok(data) => {
                debug!(asset = path, size = data.len(), "Read packaged asset");
                Ok(Some(Bytes::from(data)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>> {
        let full = self.resolve(dir)?;
        let mut read_dir = match fs::read_dir(&full).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(BridgeError::Io)? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
