//! Native audio output bridge.
//!
//! The core never decodes audio. It hands a source descriptor to the host's
//! single-stream player (Android `MediaPlayer`, AVAudioPlayer, rodio on
//! desktop) and waits for exactly one terminal outcome per started clip.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::Result;

/// Where the host player should read a clip from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AudioSource {
    /// Compiled-in resource id (Android `R.raw.*`).
    Resource(u32),
    /// Path relative to the read-only content shipped with the app.
    PackagedAsset(String),
    /// Absolute path on local storage.
    LocalFile { path: PathBuf },
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::Resource(id) => write!(f, "resource:{}", id),
            AudioSource::PackagedAsset(path) => write!(f, "asset:{}", path),
            AudioSource::LocalFile { path } => write!(f, "file:{}", path.display()),
        }
    }
}

/// Terminal result of one playback attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipOutcome {
    /// The clip played to its natural end.
    Completed,
    /// The clip could not be started or failed mid-way.
    Failed(String),
}

impl ClipOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ClipOutcome::Completed)
    }
}

/// Single-fire completion callback handed to [`AudioOutput::play`].
pub type CompletionCallback = Box<dyn FnOnce(ClipOutcome) + Send + 'static>;

/// Host audio player.
///
/// # Contract
///
/// - Starting a clip releases whatever was playing before.
/// - When `play` returns `Ok`, `on_finished` fires exactly once, with either
///   [`ClipOutcome::Completed`] or [`ClipOutcome::Failed`], never both.
/// - When `play` returns `Err`, `on_finished` is dropped without being called.
/// - A clip stopped through `release` or superseded by another `play` may drop
///   its callback without firing.
/// - `release` is idempotent.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::playback::{AudioOutput, AudioSource};
///
/// async fn beep(output: &dyn AudioOutput) -> Result<()> {
///     output
///         .play(
///             AudioSource::PackagedAsset("ui/beep.mp3".into()),
///             Box::new(|outcome| println!("finished: {:?}", outcome)),
///         )
///         .await
/// }
/// ```
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Start playing `source` from the beginning.
    async fn play(&self, source: AudioSource, on_finished: CompletionCallback) -> Result<()>;

    /// Pause the current clip, if any.
    async fn pause(&self) -> Result<()>;

    /// Stop and free the underlying player.
    async fn release(&self) -> Result<()>;
}
