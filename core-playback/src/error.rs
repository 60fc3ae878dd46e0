//! # Playback Error Types
//!
//! Error types for queue manipulation, clip playback and voice asset
//! provisioning.

use thiserror::Error;

/// Errors that can occur in the playback core.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Queue Errors
    // ========================================================================
    /// An index passed to a queue operation was outside `0..len`.
    #[error("Queue index {index} out of range (queue length {len})")]
    InvalidQueueIndex { index: usize, len: usize },

    // ========================================================================
    // Source Errors
    // ========================================================================
    /// A voice file is neither downloaded nor bundled.
    #[error("Voice file not found: {0}")]
    VoiceFileNotFound(String),

    /// The player could not start a clip.
    #[error("Playback operation failed: {0}")]
    PlaybackFailed(String),

    // ========================================================================
    // Provisioning Errors
    // ========================================================================
    /// The device reported no connectivity.
    #[error("No internet connection")]
    NoConnection,

    /// The release endpoint did not yield an archive URL.
    #[error("Could not resolve latest release: {0}")]
    ReleaseDiscovery(String),

    /// A request completed with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Transport failure while talking to the network.
    #[error("Network error: {0}")]
    Network(String),

    /// The downloaded archive is unreadable or lacks required entries.
    #[error("Invalid voice asset archive: {0}")]
    InvalidArchive(String),

    /// Writing archive entries to storage failed.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// The in-flight provisioning attempt was cancelled.
    #[error("Download cancelled")]
    Cancelled,

    /// A provisioning attempt this caller waited on failed.
    #[error("{0}")]
    ProvisioningFailed(String),

    /// Provisioning did not finish within the configured timeout.
    #[error("Download timed out")]
    Timeout,

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// Reading or writing persisted state failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A platform bridge returned an error.
    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The orchestrator task is gone.
    #[error("Playback orchestrator has shut down")]
    ShutDown,

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::NoConnection
                | PlaybackError::Network(_)
                | PlaybackError::Timeout
                | PlaybackError::Cancelled
        ) || matches!(self, PlaybackError::HttpStatus { status, .. } if *status >= 500 || *status == 429)
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::NoConnection
                | PlaybackError::Network(_)
                | PlaybackError::HttpStatus { .. }
                | PlaybackError::ReleaseDiscovery(_)
                | PlaybackError::Timeout
        )
    }

    /// Returns `true` if the downloaded payload could not be trusted.
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, PlaybackError::InvalidArchive(_))
    }

    /// Message published in `DownloadState::Error` for a failed provisioning
    /// attempt.
    pub fn download_message(&self) -> String {
        match self {
            PlaybackError::NoConnection => "No internet connection".to_string(),
            PlaybackError::ReleaseDiscovery(_) => "Could not resolve latest release".to_string(),
            PlaybackError::HttpStatus { status, .. } => {
                format!("Download failed (HTTP {})", status)
            }
            PlaybackError::InvalidArchive(_) => "Invalid voice asset archive".to_string(),
            PlaybackError::Extraction(_) => "Extraction failed".to_string(),
            PlaybackError::Cancelled => "Download cancelled".to_string(),
            PlaybackError::Timeout => "Download timed out".to_string(),
            PlaybackError::ProvisioningFailed(message) => message.clone(),
            other => format!("Download failed: {}", other),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
