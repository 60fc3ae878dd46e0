//! # Asset Provisioning Pipeline
//!
//! Downloads, verifies and installs the voice pack, then serves clips and
//! catalog documents by name.
//!
//! ## Algorithm
//!
//! 1. Debug builds publish `Completed` and never touch the network
//! 2. A complete local install (non-empty `voice/` plus both catalog
//!    documents) publishes `Completed`
//! 3. No connectivity fails with "No internet connection"
//! 4. The latest release is resolved to an archive URL
//! 5. The archive is streamed to `<cache>/voice_assets.zip.part`
//! 6. The archive is verified; a bad archive is deleted and nothing is written
//! 7. Entries are extracted below the data directory
//! 8. The temp file is removed, `Completed` is published and the catalog is
//!    reloaded from disk
//!
//! Attempts are single-flight: concurrent callers wait for the running
//! attempt and share its outcome.

use bridge_traits::{
    assets::AssetBundle,
    http::{HttpClient, HttpRequest},
    network::NetworkMonitor,
    storage::FileSystemAccess,
    time::Clock,
};
use chrono::{DateTime, Utc};
use core_runtime::events::{CoreEvent, DownloadEvent, DownloadPhase, EventBus, MetadataEvent};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::archive::{self, VoiceArchive};
use super::config::ProvisioningConfig;
use super::progress::ProgressTracker;
use super::release;
use super::{DownloadState, MetadataSource, MetadataState};
use crate::catalog::{AudioFile, Catalog};
use crate::error::{PlaybackError, Result};

struct CachedCatalog {
    catalog: Catalog,
    fetched_at: DateTime<Utc>,
}

/// Voice pack provisioning and lookup.
pub struct AssetProvisioner {
    config: ProvisioningConfig,
    http: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystemAccess>,
    network: Arc<dyn NetworkMonitor>,
    bundle: Arc<dyn AssetBundle>,
    clock: Arc<dyn Clock>,
    event_bus: Option<Arc<EventBus>>,
    download_tx: watch::Sender<DownloadState>,
    metadata_tx: watch::Sender<MetadataState>,
    audio_files_tx: watch::Sender<Vec<AudioFile>>,
    flight: Mutex<()>,
    attempts: AtomicU64,
    cancel: std::sync::Mutex<CancellationToken>,
    cached: Mutex<Option<CachedCatalog>>,
}

impl AssetProvisioner {
    pub fn new(
        config: ProvisioningConfig,
        http: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystemAccess>,
        network: Arc<dyn NetworkMonitor>,
        bundle: Arc<dyn AssetBundle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (download_tx, _) = watch::channel(DownloadState::NotStarted);
        let (metadata_tx, _) = watch::channel(MetadataState::NotLoaded);
        let (audio_files_tx, _) = watch::channel(Vec::new());

        Self {
            config,
            http,
            fs,
            network,
            bundle,
            clock,
            event_bus: None,
            download_tx,
            metadata_tx,
            audio_files_tx,
            flight: Mutex::new(()),
            attempts: AtomicU64::new(0),
            cancel: std::sync::Mutex::new(CancellationToken::new()),
            cached: Mutex::new(None),
        }
    }

    /// Set event bus for progress events.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &ProvisioningConfig {
        &self.config
    }

    pub fn download_state(&self) -> watch::Receiver<DownloadState> {
        self.download_tx.subscribe()
    }

    pub fn current_download_state(&self) -> DownloadState {
        self.download_tx.borrow().clone()
    }

    pub fn metadata_state(&self) -> watch::Receiver<MetadataState> {
        self.metadata_tx.subscribe()
    }

    pub fn audio_files(&self) -> watch::Receiver<Vec<AudioFile>> {
        self.audio_files_tx.subscribe()
    }

    // ========================================================================
    // Provisioning
    // ========================================================================

    /// Make sure the voice pack is installed.
    ///
    /// Idempotent. Callers arriving while an attempt runs wait for it and
    /// receive its outcome instead of starting another download.
    #[instrument(skip(self))]
    pub async fn ensure_available(&self) -> Result<()> {
        let seen = self.attempts.load(Ordering::SeqCst);
        let _flight = self.flight.lock().await;

        if self.attempts.load(Ordering::SeqCst) != seen {
            let state = self.current_download_state();
            debug!(?state, "Joined a finished provisioning attempt");
            return match state {
                DownloadState::Completed => Ok(()),
                DownloadState::Error(message) => Err(PlaybackError::ProvisioningFailed(message)),
                other => Err(PlaybackError::Internal(format!(
                    "attempt finished in state {:?}",
                    other
                ))),
            };
        }

        if self.current_download_state().is_completed() {
            return Ok(());
        }

        if self.config.build_mode.is_debug() {
            debug!("Debug build, serving bundled voice assets");
            self.publish(DownloadState::Completed);
            self.attempts.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }

        let token = self.fresh_token();
        let result =
            match tokio::time::timeout(self.config.download_timeout, self.provision(&token)).await {
                Ok(result) => result,
                Err(_) => Err(PlaybackError::Timeout),
            };
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Err(e) = &result {
            let message = e.download_message();
            error!(error = %e, "Voice asset provisioning failed");
            self.discard_temp().await;
            self.publish(DownloadState::Error(message.clone()));
            match e {
                PlaybackError::Cancelled => self.emit(CoreEvent::Download(DownloadEvent::Cancelled)),
                _ => self.emit(CoreEvent::Download(DownloadEvent::Failed { message })),
            }
        }
        result
    }

    /// Reset a failed attempt and run again.
    pub async fn retry(&self) -> Result<()> {
        if matches!(self.current_download_state(), DownloadState::Error(_)) {
            info!("Retrying voice asset download");
            self.publish(DownloadState::NotStarted);
        }
        self.ensure_available().await
    }

    /// Cancel the running attempt, if any. Returns whether one was running.
    pub fn cancel_in_flight(&self) -> bool {
        if self.flight.try_lock().is_ok() {
            return false;
        }
        let token = self
            .cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        info!("Cancelling voice asset download");
        token.cancel();
        true
    }

    async fn provision(&self, token: &CancellationToken) -> Result<()> {
        self.publish(DownloadState::Checking);

        if self.has_local_assets().await? {
            info!("Voice assets already installed");
            self.publish(DownloadState::Completed);
            return Ok(());
        }

        if !self.network.is_connected().await {
            return Err(PlaybackError::NoConnection);
        }

        let url = tokio::select! {
            _ = token.cancelled() => return Err(PlaybackError::Cancelled),
            resolved = release::resolve_archive_url(&*self.http, &self.config) => resolved?,
        };
        info!(%url, "Downloading voice assets");
        self.emit(CoreEvent::Download(DownloadEvent::Started { url: url.clone() }));

        let temp = self.temp_archive_path().await?;
        self.download_archive(&url, &temp, token).await?;

        let data = self.fs.read_file(&temp).await?;
        let archive = VoiceArchive::open(data.to_vec()).await?;
        archive.verify(&self.config)?;

        self.publish(DownloadState::Extracting(0.0));
        let data_dir = self.fs.get_data_directory().await?;
        let files = archive
            .extract_to(&*self.fs, &data_dir, token, |p| {
                self.publish(DownloadState::Extracting(p));
                self.emit(CoreEvent::Download(DownloadEvent::Progress {
                    phase: DownloadPhase::Extracting,
                    progress: p,
                }));
            })
            .await?;

        self.discard_temp().await;
        info!(files, "Voice assets installed");
        self.publish(DownloadState::Completed);
        self.emit(CoreEvent::Download(DownloadEvent::Completed { files }));

        match self.read_disk_catalog().await {
            Some(catalog) => self.set_loaded(catalog, MetadataSource::Server).await,
            None => {
                self.set_metadata_error("Failed to load extracted metadata");
            }
        }
        Ok(())
    }

    async fn download_archive(
        &self,
        url: &str,
        temp: &Path,
        token: &CancellationToken,
    ) -> Result<()> {
        let stream = tokio::select! {
            _ = token.cancelled() => return Err(PlaybackError::Cancelled),
            stream = self.http.download_stream(HttpRequest::get(url)) => {
                stream.map_err(|e| PlaybackError::Network(e.to_string()))?
            }
        };

        if !stream.is_success() {
            warn!(status = stream.status, %url, "Archive download rejected");
            return Err(PlaybackError::HttpStatus {
                status: stream.status,
                url: url.to_string(),
            });
        }

        if let Some(parent) = temp.parent() {
            self.fs.create_dir_all(parent).await?;
        }
        let mut writer = self.fs.open_write_stream(temp).await?;
        let mut reader = stream.reader;
        let mut progress = ProgressTracker::new(stream.content_length);
        let mut buf = vec![0u8; self.config.chunk_size];

        self.publish(DownloadState::Downloading(0.0));
        loop {
            let read = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(PlaybackError::Cancelled),
                read = reader.read(&mut buf) => read.map_err(|e| PlaybackError::Network(e.to_string()))?,
            };
            if read == 0 {
                break;
            }
            writer.write_all(&buf[..read]).await?;
            if let Some(p) = progress.advance(read as u64) {
                self.report_download(p);
            }
        }
        writer.flush().await?;
        writer.shutdown().await?;

        if let Some(p) = progress.finish() {
            self.report_download(p);
        }
        debug!(bytes = progress.done(), "Archive downloaded");
        Ok(())
    }

    fn report_download(&self, progress: f32) {
        self.publish(DownloadState::Downloading(progress));
        self.emit(CoreEvent::Download(DownloadEvent::Progress {
            phase: DownloadPhase::Downloading,
            progress,
        }));
    }

    /// Whether a previous install is complete on disk.
    pub async fn has_local_assets(&self) -> Result<bool> {
        let data_dir = self.fs.get_data_directory().await?;
        if !self
            .fs
            .is_non_empty_dir(&data_dir.join(&self.config.voice_dir))
            .await?
        {
            return Ok(false);
        }
        let metadata_dir = data_dir.join(&self.config.metadata_dir);
        Ok(self
            .fs
            .exists(&metadata_dir.join(&self.config.categories_file))
            .await?
            && self
                .fs
                .exists(&metadata_dir.join(&self.config.voice_files_file))
                .await?)
    }

    async fn temp_archive_path(&self) -> Result<PathBuf> {
        Ok(self
            .fs
            .get_cache_directory()
            .await?
            .join(self.config.temp_archive_name()))
    }

    async fn discard_temp(&self) {
        let temp = match self.temp_archive_path().await {
            Ok(path) => path,
            Err(_) => return,
        };
        if matches!(self.fs.exists(&temp).await, Ok(true)) {
            if let Err(e) = self.fs.delete_file(&temp).await {
                warn!(path = %temp.display(), error = %e, "Failed to delete temp archive");
            }
        }
    }

    fn fresh_token(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self
            .cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token.clone();
        token
    }

    fn publish(&self, state: DownloadState) {
        debug!(?state, "Download state");
        self.download_tx.send_replace(state);
    }

    fn emit(&self, event: CoreEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(event);
        }
    }

    // ========================================================================
    // Voice files
    // ========================================================================

    /// Local path of a voice clip, or `None` when it is neither downloaded
    /// nor bundled.
    ///
    /// Debug builds always use the bundled copy. Release builds prefer the
    /// downloaded file.
    pub async fn voice_file(&self, name: &str) -> Option<PathBuf> {
        let relative = archive::safe_relative_path(name)?;

        if !self.config.build_mode.is_debug() {
            match self.downloaded_voice_file(&relative).await {
                Ok(Some(path)) => return Some(path),
                Ok(None) => {}
                Err(e) => warn!(name, error = %e, "Failed to check downloaded voice file"),
            }
        }

        match self.materialize_bundled(name, &relative).await {
            Ok(found) => found,
            Err(e) => {
                warn!(name, error = %e, "Failed to copy bundled voice file");
                None
            }
        }
    }

    async fn downloaded_voice_file(&self, relative: &Path) -> Result<Option<PathBuf>> {
        let path = self
            .fs
            .get_data_directory()
            .await?
            .join(&self.config.voice_dir)
            .join(relative);
        Ok(self.fs.exists(&path).await?.then_some(path))
    }

    /// Copy a bundled clip into the cache once and reuse that copy.
    async fn materialize_bundled(&self, name: &str, relative: &Path) -> Result<Option<PathBuf>> {
        let dest = self
            .fs
            .get_cache_directory()
            .await?
            .join(&self.config.bundled_cache_dir)
            .join(relative);
        if self.fs.exists(&dest).await? {
            return Ok(Some(dest));
        }

        let asset = format!("{}/{}", self.config.voice_dir, name);
        let Some(data) = self.bundle.read(&asset).await? else {
            return Ok(None);
        };

        if let Some(parent) = dest.parent() {
            self.fs.create_dir_all(parent).await?;
        }
        self.fs.write_file(&dest, data).await?;
        Ok(Some(dest))
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Load the catalog and publish its entries.
    pub async fn load_metadata(&self) -> Result<Vec<AudioFile>> {
        let catalog = self.fetch_metadata().await?;
        Ok(catalog.audio_files())
    }

    /// Resolve the catalog.
    ///
    /// Debug builds read the bundled documents. Otherwise a copy loaded
    /// within the freshness window is reused; then connectivity decides
    /// between refreshing through [`ensure_available`](Self::ensure_available)
    /// and falling back to the files on disk.
    #[instrument(skip(self))]
    pub async fn fetch_metadata(&self) -> Result<Catalog> {
        self.metadata_tx.send_replace(MetadataState::Loading);

        if self.config.build_mode.is_debug() {
            return match self.read_bundled_catalog().await {
                Some(catalog) => {
                    self.set_loaded(catalog.clone(), MetadataSource::BundledFallback)
                        .await;
                    Ok(catalog)
                }
                None => Err(self.set_metadata_error("Bundled metadata not available")),
            };
        }

        if let Some(catalog) = self.fresh_cached_catalog().await {
            debug!("Serving catalog from memory");
            self.set_loaded(catalog.clone(), MetadataSource::Cache).await;
            return Ok(catalog);
        }

        if !self.network.is_connected().await {
            return self.fall_back_to_disk("No internet connection").await;
        }

        match self.ensure_available().await {
            Ok(()) => match self.read_disk_catalog().await {
                Some(catalog) => {
                    self.set_loaded(catalog.clone(), MetadataSource::Server).await;
                    Ok(catalog)
                }
                None => self.fall_back_to_disk("Failed to load extracted metadata").await,
            },
            Err(e) => self.fall_back_to_disk(&e.download_message()).await,
        }
    }

    async fn fall_back_to_disk(&self, reason: &str) -> Result<Catalog> {
        match self.read_disk_catalog().await {
            Some(catalog) => {
                info!(reason, "Using previously downloaded catalog");
                self.set_loaded(catalog.clone(), MetadataSource::Cache).await;
                Ok(catalog)
            }
            None => Err(self.set_metadata_error(reason)),
        }
    }

    async fn fresh_cached_catalog(&self) -> Option<Catalog> {
        let cached = self.cached.lock().await;
        let entry = cached.as_ref()?;
        let fresh = match (self.clock.now() - entry.fetched_at).to_std() {
            Ok(elapsed) => elapsed < self.config.metadata_ttl,
            Err(_) => false,
        };
        fresh.then(|| entry.catalog.clone())
    }

    async fn read_disk_catalog(&self) -> Option<Catalog> {
        let metadata_dir = match self.fs.get_data_directory().await {
            Ok(dir) => dir.join(&self.config.metadata_dir),
            Err(e) => {
                warn!(error = %e, "No data directory");
                return None;
            }
        };
        let categories = self
            .read_disk_text(&metadata_dir.join(&self.config.categories_file))
            .await?;
        let voice_files = self
            .read_disk_text(&metadata_dir.join(&self.config.voice_files_file))
            .await?;
        Some(Catalog::parse(&categories, &voice_files))
    }

    async fn read_disk_text(&self, path: &Path) -> Option<String> {
        match self.fs.read_file(path).await {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read catalog document");
                None
            }
        }
    }

    async fn read_bundled_catalog(&self) -> Option<Catalog> {
        let categories = self.read_bundled_text(&self.config.categories_entry()).await?;
        let voice_files = self.read_bundled_text(&self.config.voice_files_entry()).await?;
        Some(Catalog::parse(&categories, &voice_files))
    }

    async fn read_bundled_text(&self, path: &str) -> Option<String> {
        match self.bundle.read(path).await {
            Ok(Some(bytes)) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Ok(None) => None,
            Err(e) => {
                warn!(path, error = %e, "Failed to read bundled document");
                None
            }
        }
    }

    async fn set_loaded(&self, catalog: Catalog, source: MetadataSource) {
        let files = catalog.audio_files();
        info!(source = source.as_str(), files = files.len(), "Catalog loaded");

        if source == MetadataSource::Server {
            *self.cached.lock().await = Some(CachedCatalog {
                catalog,
                fetched_at: self.clock.now(),
            });
        }

        self.emit(CoreEvent::Metadata(MetadataEvent::Loaded {
            source: source.as_str().to_string(),
            files: files.len(),
        }));
        self.metadata_tx.send_replace(MetadataState::Loaded(source));
        self.audio_files_tx.send_replace(files);
    }

    fn set_metadata_error(&self, message: &str) -> PlaybackError {
        warn!(message, "Catalog unavailable");
        self.emit(CoreEvent::Metadata(MetadataEvent::Failed {
            message: message.to_string(),
        }));
        self.metadata_tx
            .send_replace(MetadataState::Error(message.to_string()));
        PlaybackError::ProvisioningFailed(message.to_string())
    }
}
