//! Cuebar Player Library
//!
//! This library keeps a media element in step with a timeline's shared
//! logical clock: it finds the active segment, maps edited time onto source
//! video time, holds the video on question cards, and drives the periodic
//! sync and needle-animation ticks.

pub mod config;
pub mod driver;
pub mod media;
pub mod synchronizer;
pub mod timing;

pub use config::SyncConfig;
pub use driver::PlaybackDriver;
pub use media::{MediaElement, MediaError, SimulatedMedia};
pub use synchronizer::{Key, PlaybackEvent, PlaybackState, PlaybackSynchronizer, TickOutcome};
pub use timing::{edited_time_for, real_time};

/// Result type for cuebar-player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cuebar-player operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cuebar core error: {0}")]
    Core(#[from] cuebar_core::Error),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Playback task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
