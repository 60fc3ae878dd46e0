//! # Playback Core
//!
//! Queue-driven clip playback for the soundboard.
//!
//! ## Overview
//!
//! This crate handles:
//! - [`AudioIdentifier`] values naming clips (bundled, packaged or on disk)
//! - The ordered [`AudioQueue`] and the sans-IO [`PlaybackStateMachine`]
//! - The [`MediaPlayer`] adapter over the host's single-stream player
//! - Voice pack provisioning ([`AssetProvisioner`]): download, verify, extract
//! - Catalog parsing, custom sounds and queue persistence
//! - The [`PlaybackOrchestrator`] actor tying it all together

pub mod catalog;
pub mod error;
pub mod identifier;
pub mod orchestrator;
pub mod persistence;
pub mod player;
pub mod provisioning;
pub mod queue;
pub mod state_machine;

pub use catalog::{AudioFile, Catalog, Category, VoiceFile};
pub use error::{PlaybackError, Result};
pub use identifier::AudioIdentifier;
pub use orchestrator::{OrchestratorBuilder, PlaybackOrchestrator, ASSETS_PENDING_MESSAGE};
pub use persistence::{CustomSoundStore, QueueSnapshotStore};
pub use player::{ClipReport, MediaPlayer, VoiceFileResolver};
pub use provisioning::{
    AssetProvisioner, DownloadState, MetadataSource, MetadataState, ProvisioningConfig,
};
pub use queue::AudioQueue;
pub use state_machine::{PlaybackPhase, PlaybackState, PlaybackStateMachine, PlayerCommand};
