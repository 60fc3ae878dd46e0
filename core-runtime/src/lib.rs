//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the soundboard core:
//! - Logging and tracing infrastructure
//! - Configuration management with fail-fast capability checks
//! - Event bus for playback, download, metadata and queue events
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its logging conventions,
//! its configuration type and the broadcast channel used to surface state
//! changes to the host.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{BuildMode, SoundboardConfig, SoundboardConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};
