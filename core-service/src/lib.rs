//! Soundboard service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges collected in a
//! [`SoundboardConfig`] into the voice asset pipeline and the playback
//! orchestrator. Desktop apps typically enable the `desktop-shims` feature
//! (which depends on `bridge-desktop`) and call [`bootstrap_desktop`];
//! mobile hosts build the config themselves and call
//! [`SoundboardService::start`].

pub mod error;

pub use error::{CoreError, Result};

use std::path::Path;
use std::sync::Arc;

use bridge_traits::{
    AssetBundle, AudioOutput, Clock, FileSystemAccess, HttpClient, NetworkMonitor, SettingsStore,
};
use core_playback::{
    AssetProvisioner, AudioFile, CustomSoundStore, PlaybackOrchestrator, ProvisioningConfig,
    QueueSnapshotStore,
};
use core_runtime::config::SoundboardConfig;
use core_runtime::events::{EventBus, EventStream};
#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
use core_runtime::logging::LoggingConfig;
use tracing::{debug, info, instrument, warn};

/// File name of the desktop settings database under the data directory.
pub const SETTINGS_DB: &str = "settings.db";

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub file_system: Arc<dyn FileSystemAccess>,
    pub settings_store: Arc<dyn SettingsStore>,
    pub network_monitor: Arc<dyn NetworkMonitor>,
    pub audio_output: Arc<dyn AudioOutput>,
    pub asset_bundle: Arc<dyn AssetBundle>,
    pub clock: Arc<dyn Clock>,
}

impl From<&SoundboardConfig> for CoreDependencies {
    fn from(config: &SoundboardConfig) -> Self {
        Self {
            http_client: config.http_client.clone(),
            file_system: config.file_system.clone(),
            settings_store: config.settings_store.clone(),
            network_monitor: config.network_monitor.clone(),
            audio_output: config.audio_output.clone(),
            asset_bundle: config.asset_bundle.clone(),
            clock: config.clock.clone(),
        }
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct SoundboardService {
    deps: Arc<CoreDependencies>,
    event_bus: Arc<EventBus>,
    provisioner: Arc<AssetProvisioner>,
    orchestrator: PlaybackOrchestrator,
    custom_sounds: Arc<CustomSoundStore>,
}

impl SoundboardService {
    /// Build the pipeline and start the playback actor.
    ///
    /// With queue persistence enabled the last saved queue is restored
    /// before this returns. Playback does not resume on its own.
    #[instrument(skip_all, fields(build_mode = ?config.build_mode))]
    pub async fn start(config: SoundboardConfig) -> Result<Self> {
        config.validate()?;
        let provisioning = ProvisioningConfig::from_soundboard_config(&config);
        provisioning
            .validate()
            .map_err(CoreError::InitializationFailed)?;

        let deps = Arc::new(CoreDependencies::from(&config));
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        let provisioner = Arc::new(
            AssetProvisioner::new(
                provisioning,
                deps.http_client.clone(),
                deps.file_system.clone(),
                deps.network_monitor.clone(),
                deps.asset_bundle.clone(),
                deps.clock.clone(),
            )
            .with_event_bus(event_bus.clone()),
        );

        let mut builder = PlaybackOrchestrator::builder(deps.audio_output.clone(), provisioner.clone())
            .event_bus(event_bus.clone());
        if config.persist_queue {
            builder = builder.queue_store(QueueSnapshotStore::new(deps.settings_store.clone()));
        }
        let orchestrator = builder.spawn();

        if config.persist_queue {
            match orchestrator.restore_queue().await {
                Ok(len) => info!(len, "Queue restored"),
                Err(e) => warn!(error = %e, "Could not restore queue"),
            }
        }

        let custom_sounds = Arc::new(CustomSoundStore::new(
            deps.settings_store.clone(),
            deps.file_system.clone(),
        ));

        info!("Soundboard service started");
        Ok(Self {
            deps,
            event_bus,
            provisioner,
            orchestrator,
            custom_sounds,
        })
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }

    pub fn orchestrator(&self) -> &PlaybackOrchestrator {
        &self.orchestrator
    }

    pub fn provisioner(&self) -> &Arc<AssetProvisioner> {
        &self.provisioner
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Subscribe to every core event.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn custom_sounds(&self) -> &CustomSoundStore {
        &self.custom_sounds
    }

    /// Catalog entries followed by the user's custom sounds.
    ///
    /// A catalog that cannot be loaded yields only the custom sounds; the
    /// failure is visible through the metadata state.
    pub async fn load_sounds(&self) -> Result<Vec<AudioFile>> {
        let mut sounds = match self.provisioner.load_metadata().await {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "Catalog unavailable, showing custom sounds only");
                Vec::new()
            }
        };
        sounds.extend(self.custom_sounds.load().await?);
        Ok(sounds)
    }

    pub async fn import_sound(&self, source: &Path) -> Result<AudioFile> {
        Ok(self.custom_sounds.import(source).await?)
    }

    pub async fn remove_custom_sound(&self, filename: &str) -> Result<bool> {
        Ok(self.custom_sounds.remove(filename).await?)
    }

    /// Cancel any running download and stop the playback actor.
    pub async fn shutdown(&self) -> Result<()> {
        self.provisioner.cancel_in_flight();
        self.orchestrator.shutdown().await?;
        info!("Soundboard service stopped");
        Ok(())
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Installs the default tracing subscriber unless the host already set one,
/// opens the settings database under `data_dir` and serves bundled content
/// from `assets_dir`. Every other bridge uses the desktop default.
///
/// ```ignore
/// let service = core_service::bootstrap_desktop(player, "/var/lib/soundboard", "./assets").await?;
/// service.orchestrator().enqueue(AudioIdentifier::voice("hello.mp3")).await?;
/// ```
#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub async fn bootstrap_desktop(
    audio_output: Arc<dyn AudioOutput>,
    data_dir: impl Into<std::path::PathBuf>,
    assets_dir: impl Into<std::path::PathBuf>,
) -> Result<SoundboardService> {
    if let Err(e) = core_runtime::logging::init_logging(LoggingConfig::default()) {
        debug!(error = %e, "Keeping the host's tracing subscriber");
    }

    let data_dir = data_dir.into();
    let settings = bridge_desktop::SqliteSettingsStore::new(data_dir.join(SETTINGS_DB)).await?;

    let config = SoundboardConfig::builder()
        .audio_output(audio_output)
        .settings_store(Arc::new(settings))
        .data_dir(data_dir)
        .assets_dir(assets_dir)
        .build()?;

    SoundboardService::start(config).await
}
