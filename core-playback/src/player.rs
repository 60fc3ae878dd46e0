//! Media player adapter.
//!
//! Resolves [`AudioIdentifier`]s to host [`AudioSource`]s and turns the
//! host's completion callbacks into [`ClipReport`]s on a channel.
//!
//! Each dispatch gets a new generation id. Reports for older generations
//! belong to clips that were superseded or released and must be ignored.

use async_trait::async_trait;
use bridge_traits::playback::{AudioOutput, AudioSource, ClipOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{PlaybackError, Result};
use crate::identifier::AudioIdentifier;
use crate::provisioning::AssetProvisioner;

/// Looks up local copies of voice pack clips.
#[async_trait]
pub trait VoiceFileResolver: Send + Sync {
    async fn voice_file(&self, name: &str) -> Option<PathBuf>;
}

#[async_trait]
impl VoiceFileResolver for AssetProvisioner {
    async fn voice_file(&self, name: &str) -> Option<PathBuf> {
        AssetProvisioner::voice_file(self, name).await
    }
}

/// Terminal outcome of one dispatched clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipReport {
    pub generation: u64,
    pub outcome: ClipOutcome,
}

pub struct MediaPlayer {
    output: Arc<dyn AudioOutput>,
    resolver: Arc<dyn VoiceFileResolver>,
    reports: mpsc::UnboundedSender<ClipReport>,
    generation: u64,
}

impl MediaPlayer {
    /// Create the adapter and the receiving end of its report channel.
    pub fn new(
        output: Arc<dyn AudioOutput>,
        resolver: Arc<dyn VoiceFileResolver>,
    ) -> (Self, mpsc::UnboundedReceiver<ClipReport>) {
        let (reports, rx) = mpsc::unbounded_channel();
        (
            Self {
                output,
                resolver,
                reports,
                generation: 0,
            },
            rx,
        )
    }

    /// Generation of the most recent dispatch.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Map an identifier to something the host player can open.
    pub async fn resolve(&self, clip: &AudioIdentifier) -> Result<AudioSource> {
        match clip.voice_file_name() {
            Some(name) => self
                .resolver
                .voice_file(name)
                .await
                .map(|path| AudioSource::LocalFile { path })
                .ok_or_else(|| PlaybackError::VoiceFileNotFound(name.to_string())),
            None => Ok(clip.to_source()),
        }
    }

    /// Start `clip`. Exactly one report with the returned generation follows,
    /// unless the clip is superseded first.
    pub async fn play(&mut self, clip: &AudioIdentifier) -> u64 {
        self.generation += 1;
        let generation = self.generation;

        let source = match self.resolve(clip).await {
            Ok(source) => source,
            Err(e) => {
                warn!(%clip, error = %e, "Cannot resolve clip");
                self.report(generation, ClipOutcome::Failed(e.to_string()));
                return generation;
            }
        };

        debug!(%clip, %source, generation, "Starting clip");
        let reports = self.reports.clone();
        let on_finished = Box::new(move |outcome: ClipOutcome| {
            let _ = reports.send(ClipReport {
                generation,
                outcome,
            });
        });

        if let Err(e) = self.output.play(source, on_finished).await {
            warn!(%clip, error = %e, "Player refused clip");
            self.report(
                generation,
                ClipOutcome::Failed(PlaybackError::PlaybackFailed(e.to_string()).to_string()),
            );
        }
        generation
    }

    pub async fn pause(&self) -> Result<()> {
        self.output.pause().await?;
        Ok(())
    }

    /// Stop the current clip. Its report, if any, becomes stale.
    pub async fn release(&mut self) -> Result<()> {
        self.generation += 1;
        self.output.release().await?;
        Ok(())
    }

    fn report(&self, generation: u64, outcome: ClipOutcome) {
        let _ = self.reports.send(ClipReport {
            generation,
            outcome,
        });
    }
}
