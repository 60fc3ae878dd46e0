//! Shared fixtures for core-playback integration tests.
//!
//! Hand-written bridge mocks plus a helper that builds voice pack zips in
//! memory.

#![allow(dead_code)]

use async_trait::async_trait;
use async_zip::base::write::ZipFileWriter;
use async_zip::{Compression, ZipEntryBuilder};
use bridge_desktop::TokioFileSystem;
use bridge_traits::{
    assets::AssetBundle,
    error::{BridgeError, Result},
    http::{DownloadStream, HttpClient, HttpRequest, HttpResponse},
    network::{NetworkInfo, NetworkMonitor, NetworkType},
    playback::{AudioOutput, AudioSource, ClipOutcome, CompletionCallback},
    storage::SettingsStore,
    time::{Clock, SystemClock},
};
use bytes::Bytes;
use core_playback::{AssetProvisioner, ProvisioningConfig};
use core_runtime::config::BuildMode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::DuplexStream;

pub const ARCHIVE_URL: &str = "https://downloads.example.com/v7/voice_assets.zip";

pub const CATEGORIES_JSON: &str = r#"[{"id": "greetings"}, {"id": "memes"}]"#;

pub const VOICE_FILES_JSON: &str = r#"[
    {"filename": "a.mp3", "label": "A", "internal": "a", "cat": "Greetings"},
    {"filename": "b.mp3", "label": "B", "internal": "b", "cat": "memes"},
    {"filename": "c.mp3", "label": "C", "internal": "c"}
]"#;

// ============================================================================
// Archives
// ============================================================================

/// Build a zip with the given `(name, contents)` entries.
pub async fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipFileWriter::new(Vec::<u8>::new());
    for (name, data) in entries {
        let builder = ZipEntryBuilder::new(name.to_string().into(), Compression::Stored);
        writer.write_entry_whole(builder, data).await.unwrap();
    }
    writer.close().await.unwrap()
}

/// A complete voice pack with three clips.
pub async fn voice_pack() -> Vec<u8> {
    build_zip(&[
        ("metadata/categories.json", CATEGORIES_JSON.as_bytes()),
        ("metadata/voice_files.json", VOICE_FILES_JSON.as_bytes()),
        ("voice/a.mp3", b"clip-a"),
        ("voice/b.mp3", b"clip-b"),
        ("voice/c.mp3", b"clip-c"),
    ])
    .await
}

pub fn release_json(url: &str) -> String {
    format!(
        r#"{{"tag_name": "v7", "assets": [{{"name": "voice_assets.zip", "browser_download_url": "{}"}}]}}"#,
        url
    )
}

// ============================================================================
// HTTP
// ============================================================================

pub enum ArchiveResponse {
    Body { status: u16, data: Vec<u8> },
    /// Sends `prefix` and then never finishes.
    Stalled { prefix: Vec<u8>, declared_len: u64 },
}

pub struct MockHttp {
    release_status: u16,
    release_body: String,
    archive: Mutex<ArchiveResponse>,
    open_streams: Mutex<Vec<DuplexStream>>,
    pub release_calls: AtomicUsize,
    pub downloads: AtomicUsize,
}

impl MockHttp {
    pub fn serving(archive: Vec<u8>) -> Self {
        Self::with_archive(ArchiveResponse::Body {
            status: 200,
            data: archive,
        })
    }

    pub fn with_archive(archive: ArchiveResponse) -> Self {
        Self {
            release_status: 200,
            release_body: release_json(ARCHIVE_URL),
            archive: Mutex::new(archive),
            open_streams: Mutex::new(Vec::new()),
            release_calls: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn with_release(mut self, status: u16, body: impl Into<String>) -> Self {
        self.release_status = status;
        self.release_body = body.into();
        self
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Send `rest` on every stalled download and end those streams.
    pub async fn resume_stalled(&self, rest: &[u8]) {
        use tokio::io::AsyncWriteExt;
        let streams: Vec<DuplexStream> = self.open_streams.lock().unwrap().drain(..).collect();
        for mut server in streams {
            server.write_all(rest).await.unwrap();
            server.shutdown().await.unwrap();
        }
    }
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(
            request.headers.get("Accept").map(String::as_str),
            Some("application/vnd.github.v3+json")
        );
        Ok(HttpResponse {
            status: self.release_status,
            headers: HashMap::new(),
            body: Bytes::from(self.release_body.clone()),
        })
    }

    async fn download_stream(&self, request: HttpRequest) -> Result<DownloadStream> {
        assert_eq!(request.url, ARCHIVE_URL);
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let archive = self.archive.lock().unwrap();
        match &*archive {
            ArchiveResponse::Body { status, data } => Ok(DownloadStream {
                status: *status,
                content_length: Some(data.len() as u64),
                reader: Box::new(std::io::Cursor::new(data.clone())),
            }),
            ArchiveResponse::Stalled {
                prefix,
                declared_len,
            } => {
                let (client, mut server) = tokio::io::duplex(prefix.len().max(1) * 2);
                use tokio::io::AsyncWriteExt;
                let prefix = prefix.clone();
                // Write synchronously into the pipe buffer; it is large enough.
                futures::executor::block_on(server.write_all(&prefix))
                    .map_err(BridgeError::Io)?;
                self.open_streams.lock().unwrap().push(server);
                Ok(DownloadStream {
                    status: 200,
                    content_length: Some(*declared_len),
                    reader: Box::new(client),
                })
            }
        }
    }
}

// ============================================================================
// Network
// ============================================================================

pub struct StaticNetwork {
    connected: AtomicBool,
}

impl StaticNetwork {
    pub fn online() -> Self {
        Self {
            connected: AtomicBool::new(true),
        }
    }

    pub fn offline() -> Self {
        Self {
            connected: AtomicBool::new(false),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

#[async_trait]
impl NetworkMonitor for StaticNetwork {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        Ok(if self.connected.load(Ordering::SeqCst) {
            NetworkInfo::connected(NetworkType::WiFi)
        } else {
            NetworkInfo::disconnected()
        })
    }
}

// ============================================================================
// Bundle & settings
// ============================================================================

#[derive(Default)]
pub struct MemoryBundle {
    files: HashMap<String, Bytes>,
}

impl MemoryBundle {
    pub fn with(mut self, path: &str, data: &[u8]) -> Self {
        self.files.insert(path.to_string(), Bytes::copy_from_slice(data));
        self
    }

    /// Bundle carrying the catalog and one clip.
    pub fn debug_assets() -> Self {
        Self::default()
            .with("metadata/categories.json", CATEGORIES_JSON.as_bytes())
            .with("metadata/voice_files.json", VOICE_FILES_JSON.as_bytes())
            .with("voice/a.mp3", b"bundled-a")
    }
}

#[async_trait]
impl AssetBundle for MemoryBundle {
    async fn read(&self, path: &str) -> Result<Option<Bytes>> {
        Ok(self.files.get(path).cloned())
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", dir);
        Ok(self
            .files
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }
}

#[derive(Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_string(key, &value.to_string()).await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.get_string(key).await?.and_then(|v| v.parse().ok()))
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.set_string(key, &value.to_string()).await
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.get_string(key).await?.and_then(|v| v.parse().ok()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.values.lock().unwrap().contains_key(key))
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.values.lock().unwrap().keys().cloned().collect())
    }

    async fn clear_all(&self) -> Result<()> {
        self.values.lock().unwrap().clear();
        Ok(())
    }
}

// ============================================================================
// Audio output
// ============================================================================

/// Records every started clip and keeps its callback so tests decide when
/// (and how) it finishes.
#[derive(Default)]
pub struct MockOutput {
    started: Mutex<Vec<AudioSource>>,
    pending: Mutex<Option<CompletionCallback>>,
    pub pauses: AtomicUsize,
    pub releases: AtomicUsize,
}

impl MockOutput {
    pub fn started(&self) -> Vec<AudioSource> {
        self.started.lock().unwrap().clone()
    }

    /// Fire the callback of the clip that is playing. Returns false if none.
    pub fn finish(&self, outcome: ClipOutcome) -> bool {
        match self.pending.lock().unwrap().take() {
            Some(callback) => {
                callback(outcome);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl AudioOutput for MockOutput {
    async fn play(&self, source: AudioSource, on_finished: CompletionCallback) -> Result<()> {
        self.started.lock().unwrap().push(source);
        *self.pending.lock().unwrap() = Some(on_finished);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().unwrap().take();
        Ok(())
    }
}

// ============================================================================
// Provisioner fixture
// ============================================================================

pub struct Fixture {
    pub dirs: TempDir,
    pub fs: Arc<TokioFileSystem>,
    pub http: Arc<MockHttp>,
    pub network: Arc<StaticNetwork>,
    pub bundle: Arc<MemoryBundle>,
}

impl Fixture {
    pub fn new(http: MockHttp) -> Self {
        Self::with_parts(http, StaticNetwork::online(), MemoryBundle::default())
    }

    pub fn with_parts(http: MockHttp, network: StaticNetwork, bundle: MemoryBundle) -> Self {
        let dirs = tempfile::tempdir().unwrap();
        let fs = Arc::new(TokioFileSystem::with_directories(
            dirs.path().join("cache"),
            dirs.path().join("data"),
        ));
        Self {
            dirs,
            fs,
            http: Arc::new(http),
            network: Arc::new(network),
            bundle: Arc::new(bundle),
        }
    }

    pub fn data_dir(&self) -> std::path::PathBuf {
        self.dirs.path().join("data")
    }

    pub fn temp_archive(&self) -> std::path::PathBuf {
        self.dirs.path().join("cache").join("voice_assets.zip.part")
    }

    pub fn provisioner(&self, mode: BuildMode) -> AssetProvisioner {
        self.provisioner_with_clock(mode, Arc::new(SystemClock))
    }

    pub fn provisioner_with_clock(&self, mode: BuildMode, clock: Arc<dyn Clock>) -> AssetProvisioner {
        AssetProvisioner::new(
            ProvisioningConfig::default()
                .with_build_mode(mode)
                .with_download_timeout(Duration::from_secs(10)),
            self.http.clone(),
            self.fs.clone(),
            self.network.clone(),
            self.bundle.clone(),
            clock,
        )
    }

    /// Pre-install a voice pack as if a previous run had downloaded it.
    pub fn install_local_pack(&self) {
        let data = self.data_dir();
        std::fs::create_dir_all(data.join("voice")).unwrap();
        std::fs::create_dir_all(data.join("metadata")).unwrap();
        std::fs::write(data.join("voice/a.mp3"), b"local-a").unwrap();
        std::fs::write(data.join("metadata/categories.json"), CATEGORIES_JSON).unwrap();
        std::fs::write(data.join("metadata/voice_files.json"), VOICE_FILES_JSON).unwrap();
    }
}
