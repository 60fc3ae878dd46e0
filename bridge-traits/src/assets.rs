//! Read-only content shipped inside the application package.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Packaged asset access (Android `AssetManager`, iOS main bundle).
///
/// Paths are relative and use `/` separators, e.g. `voice/hello.mp3` or
/// `metadata/categories.json`.
#[async_trait]
pub trait AssetBundle: Send + Sync {
    /// Read an asset fully into memory.
    ///
    /// Returns `Ok(None)` when no asset exists at `path`.
    async fn read(&self, path: &str) -> Result<Option<Bytes>>;

    /// Check whether an asset exists.
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.read(path).await?.is_some())
    }

    /// List asset names directly under `dir`.
    async fn list(&self, dir: &str) -> Result<Vec<String>>;
}
