//! The editing session aggregate

use crate::store::EditError;
use crate::{
    GeometryConfig, LogicalClock, Needle, Question, Segment, SegmentId, SegmentList, TimelineGeometry,
    TimelineSnapshot, DEFAULT_QUESTION_LENGTH,
};
use std::sync::Arc;

/// One timeline being edited or played: segments, shared clock and bar geometry.
///
/// Edits go through the segment store operations and replace `segments` as a
/// whole; the session never patches individual segments.
#[derive(Debug, Clone)]
pub struct TimelineSession {
    pub id: String,
    pub source_video: String,
    pub segments: SegmentList,
    pub clock: LogicalClock,
    pub geometry: TimelineGeometry,
    pub needle: Needle,
    default_length: f64,
}

impl TimelineSession {
    /// Creates a session over a single plain segment of `duration` seconds
    pub fn new(id: impl Into<String>, source_video: impl Into<String>, duration: f64) -> Self {
        let geometry = TimelineGeometry::default();
        Self {
            id: id.into(),
            source_video: source_video.into(),
            segments: SegmentList::new(duration),
            clock: LogicalClock::default(),
            needle: Needle::new(geometry.config().needle_lerp),
            geometry,
            default_length: DEFAULT_QUESTION_LENGTH,
        }
    }

    /// Restores a session from a stored snapshot
    pub fn from_snapshot(id: impl Into<String>, snapshot: TimelineSnapshot) -> Self {
        let mut session = Self::new(id, snapshot.source_video, 0.0);
        session.segments = snapshot.segments;
        session.default_length = snapshot.default_length;
        session
    }

    /// Replaces the geometry configuration
    pub fn with_geometry(mut self, config: GeometryConfig) -> Self {
        self.geometry = TimelineGeometry::new(config);
        self.needle = Needle::new(config.needle_lerp);
        self
    }

    /// Length given to newly inserted question segments
    pub fn default_length(&self) -> f64 {
        self.default_length
    }

    /// Sets the question length for new insertions; must be positive
    pub fn set_default_length(&mut self, length: f64) -> Result<(), EditError> {
        if !(length.is_finite() && length > 0.0) {
            return Err(EditError::InvalidLength(length));
        }
        self.default_length = length;
        Ok(())
    }

    pub fn total_duration(&self) -> f64 {
        self.segments.total_duration()
    }

    /// Returns the segment active at the clock's current time
    pub fn active_segment(&self) -> Option<&Segment> {
        self.segments.segment_at(self.clock.current_time)
    }

    /// Captures the persisted part of the session
    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot::new(self.segments.clone(), self.source_video.clone(), self.default_length)
    }

    /// Inserts a question of the session's default length at `time`, splitting
    /// the plain segment found there.
    pub fn insert_question(&mut self, time: f64, question: Arc<Question>) -> Result<SegmentId, EditError> {
        let target = self
            .segments
            .segment_at(time)
            .map(|s| s.id.clone())
            .ok_or_else(|| EditError::SplitOutOfRange {
                time,
                start: 0.0,
                end: self.total_duration(),
            })?;
        self.split_and_add(&target, time, question)
    }

    /// Splits segment `id` at `split_time` and inserts a question there.
    ///
    /// Returns the id of the new question segment.
    pub fn split_and_add(
        &mut self,
        id: &SegmentId,
        split_time: f64,
        question: Arc<Question>,
    ) -> Result<SegmentId, EditError> {
        let updated = self
            .segments
            .try_split_and_add(id, split_time, question, self.default_length)?;
        let inserted = updated
            .segment_at(split_time)
            .map(|s| s.id.clone())
            .ok_or_else(|| EditError::NotFound(id.clone()))?;
        self.segments = updated;
        Ok(inserted)
    }

    pub fn resize(&mut self, id: &SegmentId, new_end: f64) -> Result<(), EditError> {
        self.segments = self.segments.try_resize(id, new_end)?;
        Ok(())
    }

    pub fn reposition(&mut self, id: &SegmentId, shift: f64) -> Result<(), EditError> {
        self.segments = self.segments.try_reposition(id, shift)?;
        Ok(())
    }

    /// Deletes a segment, pulling the clock back if it now points past the end
    pub fn delete(&mut self, id: &SegmentId) -> Result<(), EditError> {
        self.segments = self.segments.try_delete(id)?;
        if self.clock.current_time > self.total_duration() {
            self.clock.current_time = 0.0;
        }
        Ok(())
    }

    pub fn replace_question(&mut self, id: &SegmentId, question: Arc<Question>) -> Result<(), EditError> {
        self.segments = self.segments.try_replace_question(id, question)?;
        Ok(())
    }

    /// Pixel x the needle is heading for
    pub fn needle_target(&self) -> f64 {
        self.geometry
            .needle_target(self.clock.current_time, self.total_duration())
    }

    /// Advances the smoothed needle by one animation frame
    pub fn step_needle(&mut self) -> f64 {
        let target = self.needle_target();
        self.needle.step(target)
    }
}
