//! # Voice Pack Archive
//!
//! Verification and extraction of the downloaded zip.
//!
//! Entries are written to `<dest>.tmp` and renamed into place, so a reader
//! never observes a half-written clip.

use async_zip::base::read::mem::ZipFileReader;
use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use futures::AsyncReadExt;
use std::path::{Component, Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::ProvisioningConfig;
use super::progress::ProgressTracker;
use crate::error::{PlaybackError, Result};

/// A file entry of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub index: usize,
    pub name: String,
}

/// An opened voice pack held in memory.
pub struct VoiceArchive {
    reader: ZipFileReader,
    entries: Vec<ArchiveEntry>,
}

impl std::fmt::Debug for VoiceArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceArchive")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl VoiceArchive {
    /// Parse the central directory. Directory entries are skipped.
    pub async fn open(data: Vec<u8>) -> Result<Self> {
        let reader = ZipFileReader::new(data)
            .await
            .map_err(|e| PlaybackError::InvalidArchive(e.to_string()))?;

        let mut entries = Vec::new();
        for (index, entry) in reader.file().entries().iter().enumerate() {
            let is_dir = entry
                .dir()
                .map_err(|e| PlaybackError::InvalidArchive(e.to_string()))?;
            if is_dir {
                continue;
            }
            let name = entry
                .filename()
                .as_str()
                .map_err(|e| PlaybackError::InvalidArchive(e.to_string()))?
                .to_string();
            entries.push(ArchiveEntry { index, name });
        }

        Ok(Self { reader, entries })
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Check that the archive is a complete voice pack with safe entry names.
    pub fn verify(&self, config: &ProvisioningConfig) -> Result<()> {
        if let Some(bad) = self.entries.iter().find(|e| safe_relative_path(&e.name).is_none()) {
            return Err(PlaybackError::InvalidArchive(format!(
                "unsafe entry path: {}",
                bad.name
            )));
        }

        for required in [config.categories_entry(), config.voice_files_entry()] {
            if !self.contains(&required) {
                return Err(PlaybackError::InvalidArchive(format!("missing {}", required)));
            }
        }

        let voice_prefix = format!("{}/", config.voice_dir);
        if !self.entries.iter().any(|e| e.name.starts_with(&voice_prefix)) {
            return Err(PlaybackError::InvalidArchive(format!(
                "no entries under {}",
                voice_prefix
            )));
        }

        Ok(())
    }

    /// Write every file entry below `root`.
    ///
    /// `on_progress` receives non-decreasing fractions of the entry count.
    /// Returns the number of files written.
    pub async fn extract_to<F>(
        &self,
        fs: &dyn FileSystemAccess,
        root: &Path,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<usize>
    where
        F: FnMut(f32),
    {
        let mut progress = ProgressTracker::new(Some(self.entries.len() as u64));

        for entry in &self.entries {
            if cancel.is_cancelled() {
                return Err(PlaybackError::Cancelled);
            }

            let relative = safe_relative_path(&entry.name).ok_or_else(|| {
                PlaybackError::InvalidArchive(format!("unsafe entry path: {}", entry.name))
            })?;
            let dest = root.join(relative);

            let data = self.read_entry(entry).await?;
            write_atomically(fs, &dest, data)
                .await
                .map_err(|e| PlaybackError::Extraction(format!("{}: {}", entry.name, e)))?;
            debug!(entry = %entry.name, "Extracted");

            if let Some(p) = progress.advance(1) {
                on_progress(p);
            }
        }

        if let Some(p) = progress.finish() {
            on_progress(p);
        }
        Ok(self.entries.len())
    }

    async fn read_entry(&self, entry: &ArchiveEntry) -> Result<Vec<u8>> {
        let mut reader = self
            .reader
            .reader_without_entry(entry.index)
            .await
            .map_err(|e| PlaybackError::Extraction(format!("{}: {}", entry.name, e)))?;
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .await
            .map_err(|e| PlaybackError::Extraction(format!("{}: {}", entry.name, e)))?;
        Ok(data)
    }
}

async fn write_atomically(
    fs: &dyn FileSystemAccess,
    dest: &Path,
    data: Vec<u8>,
) -> bridge_traits::error::Result<()> {
    if let Some(parent) = dest.parent() {
        fs.create_dir_all(parent).await?;
    }
    let tmp = temp_path(dest);
    fs.write_file(&tmp, Bytes::from(data)).await?;
    if let Err(e) = fs.rename(&tmp, dest).await {
        warn!(path = %tmp.display(), error = %e, "Rename failed, removing temp file");
        let _ = fs.delete_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

/// `<dest>.tmp` next to `dest`.
pub fn temp_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Relative path for an entry name, or `None` if it could escape the
/// destination (absolute, `..`, drive prefixes, backslashes, empty).
pub fn safe_relative_path(name: &str) -> Option<PathBuf> {
    if name.is_empty() || name.contains('\\') || name.starts_with('/') {
        return None;
    }
    let path = Path::new(name);
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_paths() {
        assert_eq!(
            safe_relative_path("voice/a.mp3"),
            Some(PathBuf::from("voice/a.mp3"))
        );
        assert_eq!(
            safe_relative_path("./metadata/x.json"),
            Some(PathBuf::from("metadata/x.json"))
        );
        assert_eq!(safe_relative_path("../etc/passwd"), None);
        assert_eq!(safe_relative_path("voice/../../x"), None);
        assert_eq!(safe_relative_path("/abs/path"), None);
        assert_eq!(safe_relative_path("voice\\..\\x"), None);
        assert_eq!(safe_relative_path(""), None);
    }

    #[test]
    fn temp_path_appends_suffix() {
        assert_eq!(
            temp_path(Path::new("/data/voice/a.mp3")),
            PathBuf::from("/data/voice/a.mp3.tmp")
        );
    }
}
