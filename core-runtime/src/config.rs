//! # Core Configuration Module
//!
//! Provides configuration management for the soundboard core.
//!
//! ## Overview
//!
//! A builder constructs a [`SoundboardConfig`] holding every bridge the core
//! needs plus the tunables of the provisioning pipeline. `build()` fails fast
//! with an actionable [`Error::CapabilityMissing`] when a bridge is absent.
//!
//! ## Required Dependencies
//!
//! - `AudioOutput` - the host's native player
//! - `SettingsStore` - queue and custom-sound persistence
//!
//! ## Dependencies with desktop defaults (`desktop-shims`)
//!
//! - `HttpClient` - reqwest
//! - `FileSystemAccess` - tokio fs, rooted at `data_dir`/`cache_dir` when set
//! - `NetworkMonitor` - TCP reachability probe
//! - `AssetBundle` - a directory given through `assets_dir`
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{BuildMode, SoundboardConfig};
//! use std::sync::Arc;
//!
//! let config = SoundboardConfig::builder()
//!     .build_mode(BuildMode::Release)
//!     .audio_output(Arc::new(MyPlayer))
//!     .settings_store(Arc::new(MyPrefs))
//!     .asset_bundle(Arc::new(MyAssets))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    AssetBundle, AudioOutput, Clock, FileSystemAccess, HttpClient, NetworkMonitor,
    SettingsStore, SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Endpoint describing the latest published voice asset release.
pub const DEFAULT_RELEASE_URL: &str =
    "https://api.github.com/repos/HugeFrog24/AndroidSoundboard-Assets/releases/latest";

/// How long a loaded catalog is served from memory before refreshing.
pub const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Development builds read bundled assets and never touch the network for
/// voice files; release builds download them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Debug,
    Release,
}

impl BuildMode {
    /// Mode matching how the current binary was compiled.
    pub fn current() -> Self {
        if cfg!(debug_assertions) {
            BuildMode::Debug
        } else {
            BuildMode::Release
        }
    }

    pub fn is_debug(self) -> bool {
        matches!(self, BuildMode::Debug)
    }
}

impl Default for BuildMode {
    fn default() -> Self {
        Self::current()
    }
}

/// Core configuration for the soundboard.
///
/// Use [`SoundboardConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct SoundboardConfig {
    /// Debug or release asset behavior
    pub build_mode: BuildMode,

    /// Release metadata endpoint queried before downloading the archive
    pub release_url: String,

    /// Freshness window for the in-memory catalog
    pub metadata_ttl: Duration,

    /// Save the queue after every mutation and restore it at startup
    pub persist_queue: bool,

    /// Buffer size of the event bus
    pub event_buffer_size: usize,

    pub http_client: Arc<dyn HttpClient>,
    pub file_system: Arc<dyn FileSystemAccess>,
    pub settings_store: Arc<dyn SettingsStore>,
    pub network_monitor: Arc<dyn NetworkMonitor>,
    pub audio_output: Arc<dyn AudioOutput>,
    pub asset_bundle: Arc<dyn AssetBundle>,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SoundboardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundboardConfig")
            .field("build_mode", &self.build_mode)
            .field("release_url", &self.release_url)
            .field("metadata_ttl", &self.metadata_ttl)
            .field("persist_queue", &self.persist_queue)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish_non_exhaustive()
    }
}

impl SoundboardConfig {
    /// Creates a new builder.
    pub fn builder() -> SoundboardConfigBuilder {
        SoundboardConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The release endpoint is an absolute http(s) URL
    /// - The metadata freshness window is non-zero and below a week
    /// - The event buffer can hold at least one event
    pub fn validate(&self) -> Result<()> {
        if !(self.release_url.starts_with("https://") || self.release_url.starts_with("http://"))
        {
            return Err(Error::Config(format!(
                "Release URL must be an absolute http(s) URL, got '{}'",
                self.release_url
            )));
        }

        if self.metadata_ttl.is_zero() {
            return Err(Error::Config(
                "Metadata TTL must be greater than zero".to_string(),
            ));
        }

        if self.metadata_ttl > Duration::from_secs(7 * 24 * 60 * 60) {
            return Err(Error::Config(
                "Metadata TTL exceeds maximum of 7 days".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn audio_output_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioOutput".to_string(),
        message: "An AudioOutput implementation is required to play clips. \
                 Android: wrap MediaPlayer. Desktop: inject a rodio/cpal-backed player."
            .to_string(),
    }
}

fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "A SettingsStore is required for queue and custom sound persistence. \
                 Desktop: open a SqliteSettingsStore. \
                 Mobile: inject SharedPreferences/UserDefaults."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::new()
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client provided. Desktop: enable the 'desktop-shims' feature. \
                 Mobile: inject the platform HTTP stack."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system(
    data_dir: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
) -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    let fs = match (data_dir, cache_dir) {
        (Some(data), Some(cache)) => TokioFileSystem::with_directories(cache, data),
        (Some(data), None) => TokioFileSystem::with_directories(data.join("cache"), data),
        (None, Some(_)) => {
            return Err(Error::Config(
                "cache_dir was set without data_dir. Set both or neither.".to_string(),
            ))
        }
        (None, None) => TokioFileSystem::new(),
    };
    Ok(Arc::new(fs))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system(
    _data_dir: Option<PathBuf>,
    _cache_dir: Option<PathBuf>,
) -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "No file system provided. Desktop: enable the 'desktop-shims' feature. \
                 Mobile: inject app-specific storage directories."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_network_monitor() -> Result<Arc<dyn NetworkMonitor>> {
    Ok(Arc::new(bridge_desktop::DesktopNetworkMonitor::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_network_monitor() -> Result<Arc<dyn NetworkMonitor>> {
    Err(Error::CapabilityMissing {
        capability: "NetworkMonitor".to_string(),
        message: "No network monitor provided. Mobile: wrap ConnectivityManager.".to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_asset_bundle(assets_dir: Option<PathBuf>) -> Result<Arc<dyn AssetBundle>> {
    match assets_dir {
        Some(dir) => Ok(Arc::new(bridge_desktop::DirectoryAssetBundle::new(dir))),
        None => Err(asset_bundle_missing_error()),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_asset_bundle(_assets_dir: Option<PathBuf>) -> Result<Arc<dyn AssetBundle>> {
    Err(asset_bundle_missing_error())
}

fn asset_bundle_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AssetBundle".to_string(),
        message: "An AssetBundle is required for bundled voice files and fallback metadata. \
                 Desktop: set assets_dir. Android: wrap AssetManager."
            .to_string(),
    }
}

/// Builder for constructing [`SoundboardConfig`] instances.
#[derive(Default)]
pub struct SoundboardConfigBuilder {
    build_mode: Option<BuildMode>,
    release_url: Option<String>,
    metadata_ttl: Option<Duration>,
    persist_queue: Option<bool>,
    event_buffer_size: Option<usize>,
    data_dir: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    assets_dir: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    audio_output: Option<Arc<dyn AudioOutput>>,
    asset_bundle: Option<Arc<dyn AssetBundle>>,
    clock: Option<Arc<dyn Clock>>,
}

impl SoundboardConfigBuilder {
    /// Overrides the compile-time build mode.
    pub fn build_mode(mut self, mode: BuildMode) -> Self {
        self.build_mode = Some(mode);
        self
    }

    /// Sets the release metadata endpoint.
    ///
    /// Default: [`DEFAULT_RELEASE_URL`]
    pub fn release_url(mut self, url: impl Into<String>) -> Self {
        self.release_url = Some(url.into());
        self
    }

    /// Sets the catalog freshness window.
    ///
    /// Default: 24 hours
    pub fn metadata_ttl(mut self, ttl: Duration) -> Self {
        self.metadata_ttl = Some(ttl);
        self
    }

    /// Enables or disables queue persistence.
    ///
    /// Default: true
    pub fn persist_queue(mut self, enabled: bool) -> Self {
        self.persist_queue = Some(enabled);
        self
    }

    /// Sets the event bus buffer size.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Root for downloaded assets when the desktop file system is used.
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Root for temporary downloads when the desktop file system is used.
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Directory mirroring the packaged `assets/` tree (desktop only).
    pub fn assets_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.assets_dir = Some(path.into());
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the settings store implementation (required).
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Sets the native player (required).
    pub fn audio_output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.audio_output = Some(output);
        self
    }

    pub fn asset_bundle(mut self, bundle: Arc<dyn AssetBundle>) -> Self {
        self.asset_bundle = Some(bundle);
        self
    }

    /// Injects a time source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the final `SoundboardConfig` instance.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` when a required bridge is absent and no
    ///   platform default applies
    /// - `Config` when a value fails validation
    pub fn build(self) -> Result<SoundboardConfig> {
        let audio_output = self.audio_output.ok_or_else(audio_output_missing_error)?;
        let settings_store = self.settings_store.ok_or_else(settings_store_missing_error)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system(self.data_dir, self.cache_dir)?,
        };

        let network_monitor = match self.network_monitor {
            Some(monitor) => monitor,
            None => provide_default_network_monitor()?,
        };

        let asset_bundle = match self.asset_bundle {
            Some(bundle) => bundle,
            None => provide_default_asset_bundle(self.assets_dir)?,
        };

        let config = SoundboardConfig {
            build_mode: self.build_mode.unwrap_or_default(),
            release_url: self
                .release_url
                .unwrap_or_else(|| DEFAULT_RELEASE_URL.to_string()),
            metadata_ttl: self.metadata_ttl.unwrap_or(DEFAULT_METADATA_TTL),
            persist_queue: self.persist_queue.unwrap_or(true),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            file_system,
            settings_store,
            network_monitor,
            audio_output,
            asset_bundle,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{DownloadStream, HttpRequest, HttpResponse};
    use bridge_traits::network::NetworkInfo;
    use bridge_traits::playback::{AudioSource, CompletionCallback};
    use bridge_traits::storage::FileMetadata;
    use bytes::Bytes;
    use std::path::Path;

    struct MockPlayer;

    #[async_trait]
    impl AudioOutput for MockPlayer {
        async fn play(&self, _source: AudioSource, _done: CompletionCallback) -> BridgeResult<()> {
            Ok(())
        }
        async fn pause(&self) -> BridgeResult<()> {
            Ok(())
        }
        async fn release(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct MockSettings;

    #[async_trait]
    impl SettingsStore for MockSettings {
        async fn set_string(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_string(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }
        async fn set_bool(&self, _key: &str, _value: bool) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_bool(&self, _key: &str) -> BridgeResult<Option<bool>> {
            Ok(None)
        }
        async fn set_i64(&self, _key: &str, _value: i64) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_i64(&self, _key: &str) -> BridgeResult<Option<i64>> {
            Ok(None)
        }
        async fn delete(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }
        async fn has_key(&self, _key: &str) -> BridgeResult<bool> {
            Ok(false)
        }
        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn clear_all(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct MockBundle;

    #[async_trait]
    impl AssetBundle for MockBundle {
        async fn read(&self, _path: &str) -> BridgeResult<Option<Bytes>> {
            Ok(None)
        }
        async fn list(&self, _dir: &str) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct MockHttp;

    #[async_trait]
    impl HttpClient for MockHttp {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            unimplemented!()
        }
        async fn download_stream(&self, _request: HttpRequest) -> BridgeResult<DownloadStream> {
            unimplemented!()
        }
    }

    struct MockNetwork;

    #[async_trait]
    impl NetworkMonitor for MockNetwork {
        async fn get_network_info(&self) -> BridgeResult<NetworkInfo> {
            Ok(NetworkInfo::disconnected())
        }
    }

    struct MockFs;

    #[async_trait]
    impl FileSystemAccess for MockFs {
        async fn get_cache_directory(&self) -> BridgeResult<PathBuf> {
            Ok(PathBuf::from("/cache"))
        }
        async fn get_data_directory(&self) -> BridgeResult<PathBuf> {
            Ok(PathBuf::from("/data"))
        }
        async fn exists(&self, _path: &Path) -> BridgeResult<bool> {
            Ok(false)
        }
        async fn metadata(&self, _path: &Path) -> BridgeResult<FileMetadata> {
            unimplemented!()
        }
        async fn create_dir_all(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }
        async fn read_file(&self, _path: &Path) -> BridgeResult<Bytes> {
            unimplemented!()
        }
        async fn write_file(&self, _path: &Path, _data: Bytes) -> BridgeResult<()> {
            Ok(())
        }
        async fn rename(&self, _from: &Path, _to: &Path) -> BridgeResult<()> {
            Ok(())
        }
        async fn delete_file(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }
        async fn delete_dir_all(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }
        async fn list_directory(&self, _path: &Path) -> BridgeResult<Vec<PathBuf>> {
            Ok(Vec::new())
        }
        async fn open_read_stream(
            &self,
            _path: &Path,
        ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
            unimplemented!()
        }
        async fn open_write_stream(
            &self,
            _path: &Path,
        ) -> BridgeResult<Box<dyn tokio::io::AsyncWrite + Send + Unpin>> {
            unimplemented!()
        }
    }

    fn full_builder() -> SoundboardConfigBuilder {
        SoundboardConfig::builder()
            .audio_output(Arc::new(MockPlayer))
            .settings_store(Arc::new(MockSettings))
            .asset_bundle(Arc::new(MockBundle))
            .http_client(Arc::new(MockHttp))
            .network_monitor(Arc::new(MockNetwork))
            .file_system(Arc::new(MockFs))
    }

    #[test]
    fn test_builder_with_all_bridges() {
        let config = full_builder()
            .build_mode(BuildMode::Release)
            .build()
            .unwrap();

        assert_eq!(config.build_mode, BuildMode::Release);
        assert_eq!(config.release_url, DEFAULT_RELEASE_URL);
        assert_eq!(config.metadata_ttl, DEFAULT_METADATA_TTL);
        assert!(config.persist_queue);
    }

    #[test]
    fn test_builder_requires_audio_output() {
        let err = SoundboardConfig::builder()
            .settings_store(Arc::new(MockSettings))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::CapabilityMissing { ref capability, .. } if capability == "AudioOutput"));
    }

    #[test]
    fn test_builder_requires_settings_store() {
        let err = SoundboardConfig::builder()
            .audio_output(Arc::new(MockPlayer))
            .build()
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("SettingsStore"));
        assert!(msg.contains("persistence"));
    }

    #[test]
    fn test_builder_requires_asset_bundle_without_assets_dir() {
        let err = SoundboardConfig::builder()
            .audio_output(Arc::new(MockPlayer))
            .settings_store(Arc::new(MockSettings))
            .http_client(Arc::new(MockHttp))
            .network_monitor(Arc::new(MockNetwork))
            .file_system(Arc::new(MockFs))
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("AssetBundle"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let err = full_builder().release_url("ftp://nope").build().unwrap_err();
        assert!(err.to_string().contains("http(s)"));

        let err = full_builder()
            .metadata_ttl(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("TTL"));

        let err = full_builder().event_buffer_size(0).build().unwrap_err();
        assert!(err.to_string().contains("buffer"));
    }

    #[test]
    fn test_build_mode_default_tracks_compilation() {
        assert_eq!(BuildMode::default().is_debug(), cfg!(debug_assertions));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_defaults_fill_optional_bridges() {
        let dir = std::env::temp_dir().join("soundboard-config-test");
        let config = SoundboardConfig::builder()
            .audio_output(Arc::new(MockPlayer))
            .settings_store(Arc::new(MockSettings))
            .data_dir(dir.join("data"))
            .assets_dir(dir.join("assets"))
            .build()
            .unwrap();

        assert_eq!(config.event_buffer_size, crate::events::DEFAULT_EVENT_BUFFER_SIZE);
    }
}
