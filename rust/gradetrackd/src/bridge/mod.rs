//! External persistent store, reached through an opaque load/save bridge.
//!
//! - `FileBridge`: reads and writes the JSON data file directly.
//! - `SidecarBridge`: asks a `gradetrackd` child process over stdio.
//! - `NoBridge`: no external store; every call reports `Unavailable`.

mod file;
mod sidecar;

use async_trait::async_trait;
use thiserror::Error;

pub use file::{FileBridge, DATA_FILE_NAME};
pub use sidecar::SidecarBridge;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("external store not available")]
    Unavailable,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("remote error {code}: {message}")]
    Remote { code: String, message: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("write task failed: {0}")]
    Task(String),
}

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

#[async_trait]
pub trait DataBridge: Send + Sync {
    /// Serialized `StoredState`. May fail when nothing was saved yet.
    async fn load_data(&self) -> BridgeResult<String>;

    async fn save_data(&self, data: String) -> BridgeResult<()>;

    async fn data_location(&self) -> BridgeResult<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoBridge;

#[async_trait]
impl DataBridge for NoBridge {
    async fn load_data(&self) -> BridgeResult<String> {
        Err(BridgeError::Unavailable)
    }

    async fn save_data(&self, _data: String) -> BridgeResult<()> {
        Err(BridgeError::Unavailable)
    }

    async fn data_location(&self) -> BridgeResult<String> {
        Err(BridgeError::Unavailable)
    }
}
