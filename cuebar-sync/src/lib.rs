//! Cuebar Sync Library
//!
//! This library carries the shared logical clock between the controlling
//! client and viewers: the JSON message contract, a WebSocket client built on
//! tokio-tungstenite, and an in-process loopback used for tests and offline
//! runs.

pub mod loopback;
pub mod message;
pub mod transport;
pub mod ws;

pub use loopback::{LoopbackTransport, SENT_LOG_CAPACITY};
pub use message::{decode_state, Inbound, Outbound, RemoteState};
pub use transport::{SyncTransport, CLOCK_BUFFER};
pub use ws::{meeting_url, WsTransport};

use std::time::Duration;

/// Result type for cuebar-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cuebar-sync operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Transport is closed")]
    Closed,

    #[error("No state received within {0:?}")]
    Timeout(Duration),

    #[error("Transport task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
