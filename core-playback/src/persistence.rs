//! # Persistence
//!
//! JSON documents stored in the host [`SettingsStore`]: the user's imported
//! custom sounds and the last queue.
//!
//! Corrupt documents are logged and read as empty so a bad write can never
//! keep the app from starting.

use bridge_traits::storage::{FileSystemAccess, SettingsStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{AudioFile, CUSTOM_CATEGORY};
use crate::error::{PlaybackError, Result};
use crate::identifier::AudioIdentifier;

/// Settings key holding the custom sound list.
pub const CUSTOM_SOUNDS_KEY: &str = "custom_sounds";

/// Settings key holding the queue snapshot.
pub const QUEUE_KEY: &str = "audio_queue";

/// Directory under the data dir receiving imported files.
pub const CUSTOM_SOUNDS_DIR: &str = "custom_sounds";

async fn load_json<T: serde::de::DeserializeOwned>(
    store: &dyn SettingsStore,
    key: &str,
) -> Result<Vec<T>> {
    let Some(raw) = store.get_string(key).await? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str(&raw) {
        Ok(items) => Ok(items),
        Err(e) => {
            warn!(key, error = %e, "Discarding malformed settings document");
            Ok(Vec::new())
        }
    }
}

async fn save_json<T: serde::Serialize>(
    store: &dyn SettingsStore,
    key: &str,
    items: &[T],
) -> Result<()> {
    let raw = serde_json::to_string(items).map_err(|e| PlaybackError::Persistence(e.to_string()))?;
    store.set_string(key, &raw).await?;
    Ok(())
}

/// User-imported sounds.
pub struct CustomSoundStore {
    settings: Arc<dyn SettingsStore>,
    fs: Arc<dyn FileSystemAccess>,
}

impl CustomSoundStore {
    pub fn new(settings: Arc<dyn SettingsStore>, fs: Arc<dyn FileSystemAccess>) -> Self {
        Self { settings, fs }
    }

    pub async fn load(&self) -> Result<Vec<AudioFile>> {
        load_json(&*self.settings, CUSTOM_SOUNDS_KEY).await
    }

    pub async fn save(&self, sounds: &[AudioFile]) -> Result<()> {
        save_json(&*self.settings, CUSTOM_SOUNDS_KEY, sounds).await
    }

    /// Copy `source` into the custom sounds directory and record it.
    #[instrument(skip(self))]
    pub async fn import(&self, source: &Path) -> Result<AudioFile> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                PlaybackError::Persistence(format!("not a file path: {}", source.display()))
            })?
            .to_string();

        let dir = self.fs.get_data_directory().await?.join(CUSTOM_SOUNDS_DIR);
        self.fs.create_dir_all(&dir).await?;
        let dest = dir.join(&name);
        let data = self.fs.read_file(source).await?;
        self.fs.write_file(&dest, data).await?;

        let sound = AudioFile {
            filename: dest.to_string_lossy().into_owned(),
            label: name.clone(),
            internal: name,
            category: Some(CUSTOM_CATEGORY.to_string()),
            is_custom: true,
        };

        let mut sounds = self.load().await?;
        sounds.retain(|s| s.filename != sound.filename);
        sounds.push(sound.clone());
        self.save(&sounds).await?;

        info!(file = %sound.filename, "Imported custom sound");
        Ok(sound)
    }

    /// Forget a custom sound and delete its file.
    pub async fn remove(&self, filename: &str) -> Result<bool> {
        let mut sounds = self.load().await?;
        let before = sounds.len();
        sounds.retain(|s| s.filename != filename);
        if sounds.len() == before {
            return Ok(false);
        }
        self.save(&sounds).await?;

        if let Err(e) = self.fs.delete_file(Path::new(filename)).await {
            if !e.is_not_found() {
                warn!(filename, error = %e, "Failed to delete custom sound file");
            }
        }
        Ok(true)
    }
}

/// Last queue contents, restored on start-up.
pub struct QueueSnapshotStore {
    settings: Arc<dyn SettingsStore>,
}

impl QueueSnapshotStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    pub async fn save(&self, queue: &[AudioIdentifier]) -> Result<()> {
        debug!(len = queue.len(), "Saving queue snapshot");
        save_json(&*self.settings, QUEUE_KEY, queue).await
    }

    pub async fn load(&self) -> Result<Vec<AudioIdentifier>> {
        load_json(&*self.settings, QUEUE_KEY).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.settings.delete(QUEUE_KEY).await?;
        Ok(())
    }
}
