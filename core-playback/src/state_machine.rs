//! # Playback State Machine
//!
//! Queue cursor and play/pause bookkeeping, with no I/O.
//!
//! Every transition returns the [`PlayerCommand`]s the caller must execute
//! against the media player, so the machine can be driven and checked without
//! a runtime or a real player.
//!
//! ## States
//!
//! ```text
//!            toggle (non-empty)
//!   Idle ─────────────────────────▶ Playing ◀──┐ on_clip_complete (more items)
//!    ▲                               │  │  └───┘
//!    │ on_clip_complete (last)       │  │
//!    │ on_clip_error / clear         │  │ toggle
//!    └───────────────────────────────┘  ▼
//!                                     Paused ── toggle ──▶ Playing
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::identifier::AudioIdentifier;
use crate::provisioning::DownloadState;
use crate::queue::AudioQueue;

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    /// Start `clip` (the entry at `index`) from the beginning.
    Play { index: usize, clip: AudioIdentifier },
    Pause,
    /// Release the player; nothing should be playing afterwards.
    Stop,
}

/// Derived phase of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    Idle,
    Playing,
    Paused,
}

/// Observable playback state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_index: usize,
    pub queue: Vec<AudioIdentifier>,
    pub error: Option<String>,
    pub download_state: DownloadState,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_index: 0,
            queue: Vec::new(),
            error: None,
            download_state: DownloadState::NotStarted,
        }
    }
}

impl PlaybackState {
    pub fn current_clip(&self) -> Option<&AudioIdentifier> {
        self.queue.get(self.current_index)
    }
}

/// Sequential playback over an [`AudioQueue`].
#[derive(Debug, Default)]
pub struct PlaybackStateMachine {
    queue: AudioQueue,
    current_index: usize,
    is_playing: bool,
    paused: bool,
    error: Option<String>,
}

impl PlaybackStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queue(items: Vec<AudioIdentifier>) -> Self {
        Self {
            queue: AudioQueue::from_items(items),
            ..Self::default()
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        if self.is_playing {
            PlaybackPhase::Playing
        } else if self.paused {
            PlaybackPhase::Paused
        } else {
            PlaybackPhase::Idle
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_clip(&self) -> Option<&AudioIdentifier> {
        self.queue.get(self.current_index)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn queue(&self) -> &AudioQueue {
        &self.queue
    }

    /// Observable snapshot, stamped with the pipeline's download state.
    pub fn state(&self, download_state: DownloadState) -> PlaybackState {
        PlaybackState {
            is_playing: self.is_playing,
            current_index: self.current_index,
            queue: self.queue.snapshot(),
            error: self.error.clone(),
            download_state,
        }
    }

    /// Play/pause button.
    pub fn toggle(&mut self) -> Vec<PlayerCommand> {
        if self.queue.is_empty() {
            return Vec::new();
        }

        if self.is_playing {
            self.is_playing = false;
            self.paused = true;
            debug!(index = self.current_index, "Pausing");
            return vec![PlayerCommand::Pause];
        }

        self.error = None;
        self.paused = false;
        self.is_playing = true;
        self.play_current()
    }

    /// The current clip played to its end.
    pub fn on_clip_complete(&mut self) -> Vec<PlayerCommand> {
        if !self.is_playing {
            return Vec::new();
        }

        if self.current_index + 1 < self.queue.len() {
            self.current_index += 1;
            self.play_current()
        } else {
            debug!("Reached end of queue");
            self.current_index = 0;
            self.is_playing = false;
            self.paused = false;
            Vec::new()
        }
    }

    /// The current clip failed. Playback stops; the cursor stays put.
    pub fn on_clip_error(&mut self, message: impl Into<String>) -> Vec<PlayerCommand> {
        self.is_playing = false;
        self.paused = false;
        self.error = Some(message.into());
        Vec::new()
    }

    pub fn enqueue(&mut self, item: AudioIdentifier) -> Vec<PlayerCommand> {
        self.queue.add(item);
        Vec::new()
    }

    pub fn enqueue_all(&mut self, items: Vec<AudioIdentifier>) -> Vec<PlayerCommand> {
        self.queue.add_all(items);
        Vec::new()
    }

    /// Replace the queue contents.
    ///
    /// The cursor is kept unless it falls outside the new queue, in which
    /// case it resets to 0. While playing, the clip at the cursor is
    /// re-dispatched only if it differs from the one that was playing.
    pub fn set_queue(&mut self, items: Vec<AudioIdentifier>) -> Vec<PlayerCommand> {
        let previous = self.current_clip().cloned();
        self.queue.replace(items);
        self.error = None;

        if self.queue.is_empty() {
            return self.reset_to_idle();
        }

        if self.current_index >= self.queue.len() {
            self.current_index = 0;
        }

        if self.is_playing && self.current_clip() != previous.as_ref() {
            return self.play_current();
        }
        Vec::new()
    }

    pub fn clear(&mut self) -> Vec<PlayerCommand> {
        self.queue.clear();
        self.error = None;
        self.reset_to_idle()
    }

    /// Remove the entry at `index`, keeping the cursor on the same clip.
    ///
    /// Removing the clip that is playing moves on to the clip that slides
    /// into its place, or stops when it was the last one.
    pub fn remove_at(&mut self, index: usize) -> Result<Vec<PlayerCommand>> {
        self.queue.remove_at(index)?;

        if self.queue.is_empty() {
            return Ok(self.reset_to_idle());
        }

        if index < self.current_index {
            self.current_index -= 1;
            return Ok(Vec::new());
        }

        if index > self.current_index {
            return Ok(Vec::new());
        }

        if self.current_index >= self.queue.len() {
            let was_playing = self.is_playing;
            self.current_index = 0;
            self.is_playing = false;
            self.paused = false;
            return Ok(if was_playing {
                vec![PlayerCommand::Stop]
            } else {
                Vec::new()
            });
        }

        if self.is_playing {
            return Ok(self.play_current());
        }
        Ok(Vec::new())
    }

    /// Remove the first entry equal to `item`.
    pub fn remove(&mut self, item: &AudioIdentifier) -> Vec<PlayerCommand> {
        let position = self.queue.iter().position(|i| i == item);
        match position {
            Some(index) => self.remove_at(index).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Move an entry, keeping the cursor on the same clip.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<Vec<PlayerCommand>> {
        self.queue.reorder(from, to)?;

        let current = self.current_index;
        self.current_index = if current == from {
            to
        } else if from < current && to >= current {
            current - 1
        } else if from > current && to <= current {
            current + 1
        } else {
            current
        };
        Ok(Vec::new())
    }

    fn play_current(&mut self) -> Vec<PlayerCommand> {
        match self.queue.get(self.current_index) {
            Some(clip) => {
                debug!(index = self.current_index, clip = %clip, "Dispatching clip");
                vec![PlayerCommand::Play {
                    index: self.current_index,
                    clip: clip.clone(),
                }]
            }
            None => self.reset_to_idle(),
        }
    }

    fn reset_to_idle(&mut self) -> Vec<PlayerCommand> {
        let was_playing = self.is_playing;
        self.current_index = 0;
        self.is_playing = false;
        self.paused = false;
        if was_playing {
            vec![PlayerCommand::Stop]
        } else {
            Vec::new()
        }
    }
}
