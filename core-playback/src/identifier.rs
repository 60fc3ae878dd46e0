//! Audio identifiers.
//!
//! A queue entry names where a clip lives, never its bytes. Identifiers are
//! plain values: compared structurally and freely cloned between the queue,
//! the state machine and the player.

use bridge_traits::playback::AudioSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Namespace prefix for clips that come from the downloadable voice pack.
pub const VOICE_PREFIX: &str = "voice/";

/// Reference to a playable clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioIdentifier {
    /// Compiled-in resource id.
    BundledResource(u32),
    /// Path inside the packaged assets, e.g. `voice/hello.mp3`.
    PackagedAsset(String),
    /// Absolute path on local storage (imported custom sounds).
    FileReference(PathBuf),
}

impl AudioIdentifier {
    pub fn resource(id: u32) -> Self {
        AudioIdentifier::BundledResource(id)
    }

    pub fn asset(path: impl Into<String>) -> Self {
        AudioIdentifier::PackagedAsset(path.into())
    }

    /// Shorthand for a clip in the voice pack.
    pub fn voice(file_name: &str) -> Self {
        AudioIdentifier::PackagedAsset(format!("{}{}", VOICE_PREFIX, file_name))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        AudioIdentifier::FileReference(path.into())
    }

    /// Whether this clip must be resolved through the voice asset pipeline.
    pub fn is_voice_asset(&self) -> bool {
        matches!(self, AudioIdentifier::PackagedAsset(path) if path.starts_with(VOICE_PREFIX))
    }

    /// File name inside the voice pack, without the namespace prefix.
    pub fn voice_file_name(&self) -> Option<&str> {
        match self {
            AudioIdentifier::PackagedAsset(path) => path.strip_prefix(VOICE_PREFIX),
            _ => None,
        }
    }

    /// Source descriptor for the host player, used when no resolution step
    /// applies.
    pub fn to_source(&self) -> AudioSource {
        match self {
            AudioIdentifier::BundledResource(id) => AudioSource::Resource(*id),
            AudioIdentifier::PackagedAsset(path) => AudioSource::PackagedAsset(path.clone()),
            AudioIdentifier::FileReference(path) => AudioSource::LocalFile { path: path.clone() },
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        match self {
            AudioIdentifier::FileReference(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for AudioIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioIdentifier::BundledResource(id) => write!(f, "resource:{}", id),
            AudioIdentifier::PackagedAsset(path) => write!(f, "asset:{}", path),
            AudioIdentifier::FileReference(path) => write!(f, "file:{}", path.display()),
        }
    }
}
