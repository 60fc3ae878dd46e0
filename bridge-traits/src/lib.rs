//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the soundboard core and
//! platform-specific implementations. Each trait represents a capability that
//! the core requires but that must be implemented differently per platform
//! (Android, desktop, iOS).
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Release discovery and streaming downloads
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Asset extraction and local storage
//! - [`AssetBundle`](assets::AssetBundle) - Read-only content packaged with the app
//!
//! ### Storage
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//!
//! ### Platform Integration
//! - [`AudioOutput`](playback::AudioOutput) - Native single-stream audio player
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity detection
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | Android  | host-provided       | 📋 Planned |
//! | iOS      | host-provided       | 📋 Planned |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! let audio_output = builder.audio_output
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "AudioOutput".to_string(),
//!         message: "No audio output provided. Inject the platform player.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Platform implementations should convert platform-specific errors to
//! `BridgeError` and include context such as file paths or HTTP status.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind `Arc<dyn Trait>`.

pub mod assets;
pub mod error;
pub mod http;
pub mod network;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use assets::AssetBundle;
pub use http::{DownloadStream, HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use playback::{AudioOutput, AudioSource, ClipOutcome, CompletionCallback};
pub use storage::{FileMetadata, FileSystemAccess, SettingsStore};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
