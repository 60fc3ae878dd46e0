//! Provisioning configuration

use core_runtime::config::{BuildMode, SoundboardConfig, DEFAULT_METADATA_TTL, DEFAULT_RELEASE_URL};
use std::time::Duration;

/// Media type requested from the release endpoint.
pub const GITHUB_JSON_ACCEPT: &str = "application/vnd.github.v3+json";

/// Layout and policy for the downloadable voice pack.
#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
    /// Debug builds serve bundled assets and never download.
    pub build_mode: BuildMode,

    /// Release discovery endpoint (GitHub "latest release" API)
    pub release_url: String,

    /// Name of the release asset holding the voice pack
    pub archive_name: String,

    /// Directory under the data dir holding clips (default: "voice")
    pub voice_dir: String,

    /// Directory under the data dir holding catalog documents (default: "metadata")
    pub metadata_dir: String,

    pub categories_file: String,
    pub voice_files_file: String,

    /// Directory under the cache dir for materialized bundle copies
    pub bundled_cache_dir: String,

    /// How long a loaded catalog stays fresh (default: 24h)
    pub metadata_ttl: Duration,

    /// Upper bound for one provisioning attempt (default: 600s)
    pub download_timeout: Duration,

    /// Read buffer for the streaming download (default: 64 KiB)
    pub chunk_size: usize,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            build_mode: BuildMode::current(),
            release_url: DEFAULT_RELEASE_URL.to_string(),
            archive_name: "voice_assets.zip".to_string(),
            voice_dir: "voice".to_string(),
            metadata_dir: "metadata".to_string(),
            categories_file: "categories.json".to_string(),
            voice_files_file: "voice_files.json".to_string(),
            bundled_cache_dir: "bundled".to_string(),
            metadata_ttl: DEFAULT_METADATA_TTL,
            download_timeout: Duration::from_secs(600),
            chunk_size: 64 * 1024,
        }
    }
}

impl ProvisioningConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive from the application configuration.
    pub fn from_soundboard_config(config: &SoundboardConfig) -> Self {
        Self::default()
            .with_build_mode(config.build_mode)
            .with_release_url(config.release_url.clone())
            .with_metadata_ttl(config.metadata_ttl)
    }

    pub fn with_build_mode(mut self, mode: BuildMode) -> Self {
        self.build_mode = mode;
        self
    }

    pub fn with_release_url(mut self, url: impl Into<String>) -> Self {
        self.release_url = url.into();
        self
    }

    pub fn with_archive_name(mut self, name: impl Into<String>) -> Self {
        self.archive_name = name.into();
        self
    }

    pub fn with_metadata_ttl(mut self, ttl: Duration) -> Self {
        self.metadata_ttl = ttl;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Archive entry path of the categories document, e.g. `metadata/categories.json`.
    pub fn categories_entry(&self) -> String {
        format!("{}/{}", self.metadata_dir, self.categories_file)
    }

    pub fn voice_files_entry(&self) -> String {
        format!("{}/{}", self.metadata_dir, self.voice_files_file)
    }

    /// Name of the partial download inside the cache dir.
    pub fn temp_archive_name(&self) -> String {
        format!("{}.part", self.archive_name)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.release_url.starts_with("https://") || self.release_url.starts_with("http://"))
        {
            return Err(format!("release_url must be http(s), got '{}'", self.release_url));
        }

        if self.archive_name.is_empty() {
            return Err("archive_name cannot be empty".to_string());
        }

        if self.voice_dir.is_empty() || self.metadata_dir.is_empty() {
            return Err("voice_dir and metadata_dir cannot be empty".to_string());
        }

        if self.voice_dir == self.metadata_dir {
            return Err("voice_dir and metadata_dir must differ".to_string());
        }

        if self.metadata_ttl.is_zero() {
            return Err("metadata_ttl must be greater than 0".to_string());
        }

        if self.chunk_size == 0 {
            return Err("chunk_size must be at least 1".to_string());
        }

        Ok(())
    }
}
