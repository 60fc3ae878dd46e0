//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux), used for development builds and tests.
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs`
//! - `SettingsStore` using a SQLite-backed key-value table
//! - `NetworkMonitor` using a TCP reachability probe
//! - `AssetBundle` serving an on-disk copy of the packaged assets
//!
//! There is no desktop `AudioOutput`: the host injects its own player.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let fs = TokioFileSystem::new();
//!     // Hand both to SoundboardConfig::builder()
//!     Ok(())
//! }
//! ```

mod assets;
mod filesystem;
mod http;
mod network;
mod settings;

pub use assets::DirectoryAssetBundle;
pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use network::DesktopNetworkMonitor;
pub use settings::SqliteSettingsStore;
