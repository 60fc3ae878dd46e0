//! # Playback Orchestrator
//!
//! Composition root that wires the queue state machine, the media player and
//! the provisioning pipeline together.
//!
//! ## Overview
//!
//! A single actor task owns the [`PlaybackStateMachine`] and the
//! [`MediaPlayer`]. Every mutation arrives as a command on an `mpsc` channel,
//! so all state changes happen in one place and in order. The resulting
//! [`PlaybackState`] is published on a `watch` channel.
//!
//! ## Voice asset gating
//!
//! Before a `voice/` clip is dispatched the pipeline's download state is
//! checked:
//!
//! | Download state          | Action                                           |
//! |-------------------------|--------------------------------------------------|
//! | `Completed`             | play                                             |
//! | `NotStarted`, `Error`   | start provisioning, play once it succeeds        |
//! | in progress, started here | park the clip until that run ends              |
//! | in progress, elsewhere  | fail the clip with "Please wait for voice assets to download" |
//!
//! A parked clip is dropped as soon as another clip is dispatched or playback
//! stops, so a late provisioning result only ever applies to the clip that
//! asked for it.
//!
//! ## Usage
//!
//! ```ignore
//! let orchestrator = PlaybackOrchestrator::builder(output, provisioner)
//!     .event_bus(bus)
//!     .queue_store(QueueSnapshotStore::new(settings))
//!     .spawn();
//!
//! orchestrator.enqueue(AudioIdentifier::voice("hello.mp3")).await?;
//! orchestrator.toggle_playback().await?;
//! ```

use bridge_traits::playback::{AudioOutput, ClipOutcome};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, QueueEvent};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

use crate::catalog::AudioFile;
use crate::error::{PlaybackError, Result};
use crate::identifier::AudioIdentifier;
use crate::persistence::QueueSnapshotStore;
use crate::player::{ClipReport, MediaPlayer, VoiceFileResolver};
use crate::provisioning::{AssetProvisioner, DownloadState, MetadataState};
use crate::state_machine::{PlaybackState, PlaybackStateMachine, PlayerCommand};

/// Message shown when a voice clip is requested mid-download.
pub const ASSETS_PENDING_MESSAGE: &str = "Please wait for voice assets to download";

const DEFAULT_COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    Enqueue(Vec<AudioIdentifier>, Reply<()>),
    Toggle(Reply<()>),
    Clear(Reply<()>),
    Reorder { from: usize, to: usize, reply: Reply<()> },
    RemoveAt(usize, Reply<()>),
    SetQueue(Vec<AudioIdentifier>, Reply<()>),
    Restore(Reply<usize>),
}

enum Request {
    Apply(Command),
    Shutdown(oneshot::Sender<()>),
}

/// Voice clip held back until the provisioning run this actor started ends.
#[derive(Debug, Clone, PartialEq)]
struct PendingClip {
    index: usize,
    clip: AudioIdentifier,
}

/// Outcome of a provisioning run started for a pending clip.
struct ProvisioningFinished(std::result::Result<(), String>);

/// Builder for [`PlaybackOrchestrator`].
pub struct OrchestratorBuilder {
    output: Arc<dyn AudioOutput>,
    provisioner: Arc<AssetProvisioner>,
    resolver: Option<Arc<dyn VoiceFileResolver>>,
    event_bus: Option<Arc<EventBus>>,
    queue_store: Option<QueueSnapshotStore>,
    command_buffer: usize,
}

impl OrchestratorBuilder {
    pub fn event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Persist the queue after every mutation.
    pub fn queue_store(mut self, store: QueueSnapshotStore) -> Self {
        self.queue_store = Some(store);
        self
    }

    /// Override how voice clips are located (defaults to the provisioner).
    pub fn resolver(mut self, resolver: Arc<dyn VoiceFileResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn command_buffer(mut self, size: usize) -> Self {
        self.command_buffer = size.max(1);
        self
    }

    /// Start the actor on the current Tokio runtime.
    pub fn spawn(self) -> PlaybackOrchestrator {
        let resolver = self
            .resolver
            .unwrap_or_else(|| self.provisioner.clone() as Arc<dyn VoiceFileResolver>);
        let (player, clip_reports) = MediaPlayer::new(self.output, resolver);
        let (commands_tx, commands_rx) = mpsc::channel(self.command_buffer);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(PlaybackState {
            download_state: self.provisioner.current_download_state(),
            ..PlaybackState::default()
        });

        let actor = OrchestratorActor {
            machine: PlaybackStateMachine::new(),
            player,
            provisioner: self.provisioner.clone(),
            state_tx,
            internal_tx,
            queue_store: self.queue_store,
            event_bus: self.event_bus,
            pending: None,
            provisioning: false,
        };
        tokio::spawn(actor.run(commands_rx, clip_reports, internal_rx));

        PlaybackOrchestrator {
            commands: commands_tx,
            state: state_rx,
            provisioner: self.provisioner,
        }
    }
}

/// Handle to the playback actor. Cheap to clone.
#[derive(Clone)]
pub struct PlaybackOrchestrator {
    commands: mpsc::Sender<Request>,
    state: watch::Receiver<PlaybackState>,
    provisioner: Arc<AssetProvisioner>,
}

impl PlaybackOrchestrator {
    pub fn builder(
        output: Arc<dyn AudioOutput>,
        provisioner: Arc<AssetProvisioner>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            output,
            provisioner,
            resolver: None,
            event_bus: None,
            queue_store: None,
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Request::Apply(make(reply)))
            .await
            .map_err(|_| PlaybackError::ShutDown)?;
        rx.await.map_err(|_| PlaybackError::ShutDown)?
    }

    // ========================================================================
    // Commands
    // ========================================================================

    pub async fn enqueue(&self, clip: AudioIdentifier) -> Result<()> {
        self.request(|reply| Command::Enqueue(vec![clip], reply)).await
    }

    pub async fn enqueue_all(&self, clips: Vec<AudioIdentifier>) -> Result<()> {
        self.request(|reply| Command::Enqueue(clips, reply)).await
    }

    /// Enqueue a catalog entry.
    pub async fn enqueue_file(&self, file: &AudioFile) -> Result<()> {
        self.enqueue(file.to_identifier()).await
    }

    pub async fn toggle_playback(&self) -> Result<()> {
        self.request(Command::Toggle).await
    }

    pub async fn clear_queue(&self) -> Result<()> {
        self.request(Command::Clear).await
    }

    pub async fn reorder(&self, from: usize, to: usize) -> Result<()> {
        self.request(|reply| Command::Reorder { from, to, reply })
            .await
    }

    pub async fn remove_at(&self, index: usize) -> Result<()> {
        self.request(|reply| Command::RemoveAt(index, reply)).await
    }

    pub async fn set_queue(&self, clips: Vec<AudioIdentifier>) -> Result<()> {
        self.request(|reply| Command::SetQueue(clips, reply)).await
    }

    /// Load the persisted queue. Returns the number of restored entries.
    pub async fn restore_queue(&self) -> Result<usize> {
        self.request(Command::Restore).await
    }

    /// Provision voice assets now instead of on first use.
    pub async fn ensure_assets(&self) -> Result<()> {
        self.provisioner.ensure_available().await
    }

    pub async fn retry_download(&self) -> Result<()> {
        self.provisioner.retry().await
    }

    /// Release the player and stop the actor.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Request::Shutdown(reply))
            .await
            .map_err(|_| PlaybackError::ShutDown)?;
        rx.await.map_err(|_| PlaybackError::ShutDown)
    }

    // ========================================================================
    // Observables
    // ========================================================================

    pub fn state(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }

    pub fn current_state(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    pub fn download_state(&self) -> watch::Receiver<DownloadState> {
        self.provisioner.download_state()
    }

    pub fn metadata_state(&self) -> watch::Receiver<MetadataState> {
        self.provisioner.metadata_state()
    }

    pub fn audio_files(&self) -> watch::Receiver<Vec<AudioFile>> {
        self.provisioner.audio_files()
    }

    pub fn provisioner(&self) -> &Arc<AssetProvisioner> {
        &self.provisioner
    }
}

struct OrchestratorActor {
    machine: PlaybackStateMachine,
    player: MediaPlayer,
    provisioner: Arc<AssetProvisioner>,
    state_tx: watch::Sender<PlaybackState>,
    internal_tx: mpsc::UnboundedSender<ProvisioningFinished>,
    queue_store: Option<QueueSnapshotStore>,
    event_bus: Option<Arc<EventBus>>,
    pending: Option<PendingClip>,
    /// A provisioning run started by this actor has not reported back yet.
    provisioning: bool,
}

impl OrchestratorActor {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Request>,
        mut clip_reports: mpsc::UnboundedReceiver<ClipReport>,
        mut internal: mpsc::UnboundedReceiver<ProvisioningFinished>,
    ) {
        info!("Playback orchestrator started");
        let mut download_rx = self.provisioner.download_state();
        let mut download_open = true;

        loop {
            tokio::select! {
                request = commands.recv() => match request {
                    Some(Request::Shutdown(reply)) => {
                        self.stop_player().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(Request::Apply(command)) => self.handle_command(command).await,
                    None => {
                        self.stop_player().await;
                        break;
                    }
                },
                Some(report) = clip_reports.recv() => self.handle_clip_report(report).await,
                Some(finished) = internal.recv() => self.handle_provisioning_finished(finished).await,
                changed = download_rx.changed(), if download_open => {
                    if changed.is_err() {
                        download_open = false;
                    }
                }
            }
            self.publish_state();
        }

        info!("Playback orchestrator stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Enqueue(clips, reply) => {
                let cmds = self.machine.enqueue_all(clips);
                self.execute(cmds).await;
                self.queue_changed().await;
                self.publish_state();
                let _ = reply.send(Ok(()));
            }
            Command::Toggle(reply) => {
                let cmds = self.machine.toggle();
                self.execute(cmds).await;
                self.publish_state();
                let _ = reply.send(Ok(()));
            }
            Command::Clear(reply) => {
                let cmds = self.machine.clear();
                self.pending = None;
                self.execute(cmds).await;
                self.emit(CoreEvent::Queue(QueueEvent::Cleared));
                self.persist_queue().await;
                self.publish_state();
                let _ = reply.send(Ok(()));
            }
            Command::Reorder { from, to, reply } => {
                let result = match self.machine.reorder(from, to) {
                    Ok(cmds) => {
                        self.execute(cmds).await;
                        self.queue_changed().await;
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                self.publish_state();
                let _ = reply.send(result);
            }
            Command::RemoveAt(index, reply) => {
                let result = match self.machine.remove_at(index) {
                    Ok(cmds) => {
                        self.execute(cmds).await;
                        self.queue_changed().await;
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                self.publish_state();
                let _ = reply.send(result);
            }
            Command::SetQueue(clips, reply) => {
                let cmds = self.machine.set_queue(clips);
                self.execute(cmds).await;
                self.queue_changed().await;
                self.publish_state();
                let _ = reply.send(Ok(()));
            }
            Command::Restore(reply) => {
                let result = self.restore().await;
                self.publish_state();
                let _ = reply.send(result);
            }
        }
    }

    async fn restore(&mut self) -> Result<usize> {
        let Some(store) = &self.queue_store else {
            return Ok(0);
        };
        let clips = store.load().await?;
        let len = clips.len();
        let cmds = self.machine.set_queue(clips);
        self.execute(cmds).await;
        info!(len, "Restored queue");
        self.emit(CoreEvent::Queue(QueueEvent::Restored { len }));
        Ok(len)
    }

    async fn handle_clip_report(&mut self, report: ClipReport) {
        if !self.player.is_current(report.generation) {
            debug!(generation = report.generation, "Ignoring stale clip report");
            return;
        }

        let index = self.machine.current_index();
        let clip = self
            .machine
            .current_clip()
            .map(|c| c.to_string())
            .unwrap_or_default();

        match report.outcome {
            ClipOutcome::Completed => {
                self.emit(CoreEvent::Playback(PlaybackEvent::Completed { clip, index }));
                let was_playing = self.machine.is_playing();
                let cmds = self.machine.on_clip_complete();
                if was_playing && !self.machine.is_playing() {
                    self.emit(CoreEvent::Playback(PlaybackEvent::QueueFinished));
                }
                self.execute(cmds).await;
            }
            ClipOutcome::Failed(message) => {
                warn!(%clip, %message, "Clip failed");
                self.fail_clip(Some(clip), message).await;
            }
        }
    }

    async fn handle_provisioning_finished(&mut self, finished: ProvisioningFinished) {
        self.provisioning = false;
        let Some(pending) = self.pending.take() else {
            return;
        };

        // Edits before the cursor shift the index but keep the parked clip current.
        let still_current =
            self.machine.is_playing() && self.machine.current_clip() == Some(&pending.clip);
        if !still_current {
            debug!(
                clip = %pending.clip,
                index = pending.index,
                "Provisioning finished for a clip that is no longer current"
            );
            return;
        }

        match finished.0 {
            Ok(()) => {
                self.execute(vec![PlayerCommand::Play {
                    index: self.machine.current_index(),
                    clip: pending.clip,
                }])
                .await;
            }
            Err(message) => self.fail_clip(Some(pending.clip.to_string()), message).await,
        }
    }

    /// Stop the player and record `message` against the current clip.
    async fn fail_clip(&mut self, clip: Option<String>, message: String) {
        let cmds = self.clip_failed(clip, message).await;
        self.execute(cmds).await;
    }

    async fn clip_failed(&mut self, clip: Option<String>, message: String) -> Vec<PlayerCommand> {
        self.pending = None;
        self.stop_player().await;
        self.emit(CoreEvent::Playback(PlaybackEvent::Error {
            clip,
            message: message.clone(),
            recoverable: true,
        }));
        self.machine.on_clip_error(message)
    }

    async fn execute(&mut self, commands: Vec<PlayerCommand>) {
        let mut work: VecDeque<PlayerCommand> = commands.into();
        while let Some(command) = work.pop_front() {
            match command {
                PlayerCommand::Play { index, clip } => {
                    if let Err(message) = self.dispatch(index, clip.clone()).await {
                        let follow_up = self.clip_failed(Some(clip.to_string()), message).await;
                        work.extend(follow_up);
                    }
                }
                PlayerCommand::Pause => {
                    self.pending = None;
                    if let Err(e) = self.player.pause().await {
                        warn!(error = %e, "Pause failed");
                    }
                    let clip = self
                        .machine
                        .current_clip()
                        .map(|c| c.to_string())
                        .unwrap_or_default();
                    self.emit(CoreEvent::Playback(PlaybackEvent::Paused {
                        clip,
                        index: self.machine.current_index(),
                    }));
                }
                PlayerCommand::Stop => {
                    self.pending = None;
                    self.stop_player().await;
                    self.emit(CoreEvent::Playback(PlaybackEvent::Stopped));
                }
            }
        }
    }

    /// Start `clip`, or park it until voice assets are available.
    ///
    /// `Err` carries the message the clip fails with.
    #[instrument(skip(self), fields(clip = %clip))]
    async fn dispatch(
        &mut self,
        index: usize,
        clip: AudioIdentifier,
    ) -> std::result::Result<(), String> {
        if clip.is_voice_asset() {
            match self.provisioner.current_download_state() {
                DownloadState::Completed => {}
                DownloadState::NotStarted | DownloadState::Error(_) => {
                    self.wait_for_assets(index, clip).await;
                    self.start_provisioning();
                    return Ok(());
                }
                _ if self.provisioning => {
                    self.wait_for_assets(index, clip).await;
                    return Ok(());
                }
                _ => return Err(ASSETS_PENDING_MESSAGE.to_string()),
            }
        }

        self.pending = None;
        self.player.play(&clip).await;
        self.emit(CoreEvent::Playback(PlaybackEvent::Started {
            clip: clip.to_string(),
            index,
        }));
        Ok(())
    }

    async fn wait_for_assets(&mut self, index: usize, clip: AudioIdentifier) {
        // The previous clip must not report into the one that now waits.
        self.stop_player().await;
        debug!(%clip, index, "Clip waits for voice assets");
        self.pending = Some(PendingClip { index, clip });
    }

    fn start_provisioning(&mut self) {
        if self.provisioning {
            return;
        }
        self.provisioning = true;
        info!("Voice assets missing, starting provisioning");

        let provisioner = self.provisioner.clone();
        let done = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = provisioner
                .ensure_available()
                .await
                .map_err(|e| e.download_message());
            let _ = done.send(ProvisioningFinished(result));
        });
    }

    async fn stop_player(&mut self) {
        if let Err(e) = self.player.release().await {
            warn!(error = %e, "Releasing player failed");
        }
    }

    async fn queue_changed(&mut self) {
        self.emit(CoreEvent::Queue(QueueEvent::Changed {
            len: self.machine.queue().len(),
        }));
        self.persist_queue().await;
    }

    async fn persist_queue(&self) {
        if let Some(store) = &self.queue_store {
            if let Err(e) = store.save(&self.machine.queue().snapshot()).await {
                warn!(error = %e, "Failed to persist queue");
            }
        }
    }

    fn publish_state(&self) {
        let state = self
            .machine
            .state(self.provisioner.current_download_state());
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    fn emit(&self, event: CoreEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(event);
        }
    }
}
