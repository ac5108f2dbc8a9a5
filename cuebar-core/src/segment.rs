//! Timeline segment data structures

use crate::Question;
use std::fmt;
use std::sync::Arc;

/// Opaque, unique identifier of a segment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SegmentId(String);

impl SegmentId {
    /// Generates a fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SegmentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SegmentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What plays while a segment is active
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "question", rename_all = "lowercase"))]
pub enum SegmentKind {
    /// Source video plays
    Plain,
    /// Video is held while the question card is shown
    Question(Arc<Question>),
}

/// A contiguous range of edited-timeline time
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    pub id: SegmentId,
    /// Start in seconds of edited-timeline time
    pub start: f64,
    /// End in seconds of edited-timeline time (exclusive)
    pub end: f64,
    pub kind: SegmentKind,
}

impl Segment {
    /// Creates a plain video segment with a fresh id
    pub fn plain(start: f64, end: f64) -> Self {
        Self {
            id: SegmentId::generate(),
            start,
            end,
            kind: SegmentKind::Plain,
        }
    }

    /// Creates a question segment with a fresh id
    pub fn question(start: f64, end: f64, question: Arc<Question>) -> Self {
        Self {
            id: SegmentId::generate(),
            start,
            end,
            kind: SegmentKind::Question(question),
        }
    }

    /// Returns the duration of this segment in seconds
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Checks if this segment is active at the given time (half-open range)
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }

    /// Checks whether this is a question-card segment
    pub fn is_question(&self) -> bool {
        matches!(self.kind, SegmentKind::Question(_))
    }

    /// Returns the question shown by this segment, if any
    pub fn question_data(&self) -> Option<&Arc<Question>> {
        match &self.kind {
            SegmentKind::Question(q) => Some(q),
            SegmentKind::Plain => None,
        }
    }

    /// Returns a copy moved by `delta` seconds, keeping its duration and id
    pub(crate) fn shifted(&self, delta: f64) -> Self {
        Self {
            start: self.start + delta,
            end: self.end + delta,
            ..self.clone()
        }
    }

    /// Returns a copy of the same kind covering `[start, end)` under a fresh id
    pub(crate) fn piece(&self, start: f64, end: f64) -> Self {
        Self {
            id: SegmentId::generate(),
            start,
            end,
            kind: self.kind.clone(),
        }
    }
}
