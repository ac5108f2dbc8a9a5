//! Cuebar Core Library
//!
//! This library provides the timeline data model used by the cuebar authoring
//! tool: contiguous video/question-card segments and their edit operations,
//! the pixel geometry of the timeline bar, the shared logical clock, and the
//! binary snapshot container used for persistence.

pub mod clock;
pub mod container;
pub mod geometry;
pub mod question;
pub mod segment;
pub mod session;
pub mod store;

pub use clock::LogicalClock;
pub use container::{ContainerHeader, TimelineSnapshot};
pub use geometry::{GeometryConfig, Needle, TimelineGeometry};
pub use question::{parse_questions, Difficulty, DisplayType, ParseError, Question, QuestionType};
pub use segment::{Segment, SegmentId, SegmentKind};
pub use session::TimelineSession;
pub use store::{EditError, SegmentList, DEFAULT_QUESTION_LENGTH, MIN_SEGMENT_LENGTH};

/// Result type for cuebar-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cuebar-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid magic bytes, expected 'CUE\\0'")]
    InvalidMagic,

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u16),

    #[error("Invalid UTF-8 string in container")]
    InvalidString,

    #[error("Invalid tag {value} for {field}")]
    InvalidTag { field: &'static str, value: u8 },

    #[error("Invalid timeline: {0}")]
    InvalidTimeline(String),
}
