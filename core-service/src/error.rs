use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),
}

impl CoreError {
    /// Whether the host forgot to inject a platform capability.
    pub fn is_capability_missing(&self) -> bool {
        matches!(self, CoreError::Runtime(e) if e.is_capability_missing())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
