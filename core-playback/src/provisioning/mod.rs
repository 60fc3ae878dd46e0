//! # Voice Asset Provisioning
//!
//! Makes the voice pack available locally: release discovery, streaming
//! download, archive verification, extraction, and catalog loading.
//!
//! ## Overview
//!
//! - [`AssetProvisioner`] runs the pipeline and owns the one live
//!   [`DownloadState`], published through a `tokio::sync::watch` channel
//! - [`ProvisioningConfig`] names the endpoint, directories and freshness window
//! - [`archive`] verifies and extracts the downloaded zip
//! - [`release`] resolves the archive URL of the latest release
//!
//! Debug builds never download: they serve clips and catalog documents from
//! the packaged [`AssetBundle`](bridge_traits::AssetBundle).

pub mod archive;
pub mod config;
pub mod pipeline;
pub mod progress;
pub mod release;

pub use config::ProvisioningConfig;
pub use pipeline::AssetProvisioner;

use serde::{Deserialize, Serialize};

/// Lifecycle of the voice pack download.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum DownloadState {
    #[default]
    NotStarted,
    /// Looking for local assets and connectivity.
    Checking,
    /// Fraction of the archive received.
    Downloading(f32),
    /// Fraction of archive entries written.
    Extracting(f32),
    Completed,
    Error(String),
}

impl DownloadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadState::Completed | DownloadState::Error(_))
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            DownloadState::Checking | DownloadState::Downloading(_) | DownloadState::Extracting(_)
        )
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, DownloadState::Completed)
    }

    pub fn progress(&self) -> Option<f32> {
        match self {
            DownloadState::Downloading(p) | DownloadState::Extracting(p) => Some(*p),
            _ => None,
        }
    }
}

/// Where the current catalog came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSource {
    /// Freshly downloaded pack.
    Server,
    /// In-memory copy or previously downloaded files.
    Cache,
    /// Documents packaged with a debug build.
    BundledFallback,
}

impl MetadataSource {
    pub fn as_str(self) -> &'static str {
        match self {
            MetadataSource::Server => "server",
            MetadataSource::Cache => "cache",
            MetadataSource::BundledFallback => "bundled",
        }
    }
}

/// Lifecycle of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum MetadataState {
    #[default]
    NotLoaded,
    Loading,
    Loaded(MetadataSource),
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_state_predicates() {
        assert!(DownloadState::Completed.is_terminal());
        assert!(DownloadState::Error("x".into()).is_terminal());
        assert!(!DownloadState::NotStarted.is_terminal());
        assert!(DownloadState::Downloading(0.5).is_in_progress());
        assert!(DownloadState::Checking.is_in_progress());
        assert_eq!(DownloadState::Extracting(0.25).progress(), Some(0.25));
        assert_eq!(DownloadState::Completed.progress(), None);
    }

    #[test]
    fn states_serialize_tagged() {
        let json = serde_json::to_string(&DownloadState::Downloading(0.5)).unwrap();
        assert_eq!(json, r#"{"state":"downloading","value":0.5}"#);
        let json = serde_json::to_string(&MetadataState::Loaded(MetadataSource::Cache)).unwrap();
        assert_eq!(json, r#"{"state":"loaded","value":"cache"}"#);
    }
}
