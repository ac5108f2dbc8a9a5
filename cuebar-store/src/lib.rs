//! Cuebar Store Library
//!
//! This library persists timeline snapshots keyed by an opaque id. It offers a
//! directory-backed store, an in-memory store, an async handle that runs store
//! calls one at a time on the blocking pool, and an autosave helper that only
//! writes when the timeline changed.

pub mod autosave;
pub mod file;
pub mod handle;
pub mod memory;
#[cfg(feature = "ffmpeg")]
pub mod probe;

pub use autosave::AutoSave;
pub use file::FileStore;
pub use handle::StoreHandle;
pub use memory::MemoryStore;
#[cfg(feature = "ffmpeg")]
pub use probe::probe_duration;

use cuebar_core::TimelineSnapshot;

/// Result type for cuebar-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cuebar-store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cuebar core error: {0}")]
    Core(#[from] cuebar_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid timeline id: {0:?}")]
    InvalidId(String),

    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),

    #[cfg(feature = "ffmpeg")]
    #[error("No usable duration in {0}")]
    NoDuration(String),
}

/// Key-value persistence of timeline snapshots
pub trait TimelineStore {
    /// Stores `snapshot` under `id`, replacing any previous one
    fn save(&mut self, id: &str, snapshot: &TimelineSnapshot) -> Result<()>;

    /// Loads the snapshot stored under `id`, or `None` if there is none
    fn load_by_id(&self, id: &str) -> Result<Option<TimelineSnapshot>>;

    /// Ids of every stored snapshot, sorted
    fn list(&self) -> Result<Vec<String>>;
}

/// Checks that `id` is usable as a key: non-empty ASCII letters, digits, `-` and `_`
pub fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidId(id.to_string()))
    }
}
