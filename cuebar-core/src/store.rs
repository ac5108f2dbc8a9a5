//! Segment store: the ordered segment list and its edit operations
//!
//! A [`SegmentList`] is always sorted, contiguous from `0`, and minimal (no two
//! touching plain segments). Every edit is a pure function returning a new
//! list; the input is never modified. Each edit comes in two flavours:
//! `try_*` reports why an edit was rejected, while the plain form returns the
//! list unchanged instead.
//!
//! Identity rules:
//! - `split_and_add` retires the split segment; all three pieces get fresh ids.
//! - `resize` keeps every id.
//! - `reposition` keeps the moved segment's id and the ids of neighbours that
//!   are shifted whole; a plain neighbour cut in two is retired and both
//!   pieces get fresh ids. Question cards are never cut, so only `resize`
//!   changes a card's length.
//! - Coalescing keeps the id of the earlier segment.

use crate::{Error, Question, Result, Segment, SegmentId};
use log::debug;
use std::sync::Arc;

/// Smallest duration a segment may be resized to, in seconds
pub const MIN_SEGMENT_LENGTH: f64 = 0.1;

/// Duration given to a newly inserted question segment unless configured otherwise
pub const DEFAULT_QUESTION_LENGTH: f64 = 10.0;

/// Boundaries closer than this are treated as the same point
pub(crate) const BOUNDARY_EPSILON: f64 = 1e-6;

/// Reason an edit was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("segment not found: {0}")]
    NotFound(SegmentId),

    #[error("segment {0} is a question card")]
    QuestionSegment(SegmentId),

    #[error("segment {0} is not a question card")]
    PlainSegment(SegmentId),

    #[error("split time {time}s is not strictly inside [{start}s, {end}s)")]
    SplitOutOfRange { time: f64, start: f64, end: f64 },

    #[error("question length must be a positive number of seconds, got {0}")]
    InvalidLength(f64),

    #[error("new end {new_end}s must be at least {min}s after the segment start {start}s")]
    TooShort { new_end: f64, start: f64, min: f64 },

    #[error("value is not a finite number: {0}")]
    NotFinite(f64),

    #[error("move would cut question segment {0} in two")]
    CutsQuestion(SegmentId),
}

/// Ordered, contiguous list of timeline segments
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SegmentList {
    segments: Vec<Segment>,
}

impl SegmentList {
    /// Creates a list holding one plain segment covering `[0, duration)`.
    ///
    /// A non-positive duration gives an empty list.
    pub fn new(duration: f64) -> Self {
        if duration.is_finite() && duration > 0.0 {
            Self {
                segments: vec![Segment::plain(0.0, duration)],
            }
        } else {
            Self::default()
        }
    }

    /// Builds a list from stored segments, validating ordering and contiguity.
    ///
    /// Touching plain segments are coalesced.
    pub fn from_segments(segments: Vec<Segment>) -> Result<Self> {
        let list = Self { segments };
        list.check_contiguity()?;
        Ok(Self {
            segments: normalize(list.segments),
        })
    }

    /// Returns the segments in chronological order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Iterates over the segments in chronological order
    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// Returns the number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Checks if the list has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total edited duration; always the last segment's end
    pub fn total_duration(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }

    /// Gets a segment by id
    pub fn get(&self, id: &SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| &s.id == id)
    }

    /// Gets the position of a segment by id
    pub fn index_of(&self, id: &SegmentId) -> Option<usize> {
        self.segments.iter().position(|s| &s.id == id)
    }

    /// Gets the segment whose half-open range contains `time`
    pub fn segment_at(&self, time: f64) -> Option<&Segment> {
        // Sorted and contiguous, so the candidate is the last segment starting at or before `time`.
        let idx = self.segments.partition_point(|s| s.start <= time);
        idx.checked_sub(1)
            .map(|i| &self.segments[i])
            .filter(|s| s.contains(time))
    }

    /// Iterates over question-card segments only
    pub fn question_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|s| s.is_question())
    }

    /// Checks every list invariant: starts at zero, contiguous, positive
    /// durations, unique ids, and no touching plain segments.
    pub fn check_invariants(&self) -> Result<()> {
        self.check_contiguity()?;

        for pair in self.segments.windows(2) {
            if !pair[0].is_question() && !pair[1].is_question() {
                return Err(Error::InvalidTimeline(format!(
                    "plain segments {} and {} are not merged",
                    pair[0].id, pair[1].id
                )));
            }
        }

        let mut ids: Vec<&SegmentId> = self.segments.iter().map(|s| &s.id).collect();
        ids.sort();
        if ids.windows(2).any(|w| w[0] == w[1]) {
            return Err(Error::InvalidTimeline("duplicate segment id".to_string()));
        }

        Ok(())
    }

    fn check_contiguity(&self) -> Result<()> {
        if let Some(first) = self.segments.first() {
            if first.start.abs() > BOUNDARY_EPSILON {
                return Err(Error::InvalidTimeline(format!(
                    "first segment starts at {}s instead of 0",
                    first.start
                )));
            }
        }

        for seg in &self.segments {
            if !(seg.start.is_finite() && seg.end.is_finite()) || seg.end - seg.start <= 0.0 {
                return Err(Error::InvalidTimeline(format!(
                    "segment {} has an empty or invalid range [{}, {})",
                    seg.id, seg.start, seg.end
                )));
            }
        }

        for pair in self.segments.windows(2) {
            if (pair[0].end - pair[1].start).abs() > BOUNDARY_EPSILON {
                return Err(Error::InvalidTimeline(format!(
                    "gap or overlap between {} (ends {}s) and {} (starts {}s)",
                    pair[0].id, pair[0].end, pair[1].id, pair[1].start
                )));
            }
        }

        Ok(())
    }

    fn require(&self, id: &SegmentId) -> std::result::Result<usize, EditError> {
        self.index_of(id).ok_or_else(|| EditError::NotFound(id.clone()))
    }

    /// Splits a plain segment at `split_time` and inserts a question segment
    /// of `length` seconds there, pushing everything after it to the right.
    pub fn try_split_and_add(
        &self,
        id: &SegmentId,
        split_time: f64,
        question: Arc<Question>,
        length: f64,
    ) -> std::result::Result<Self, EditError> {
        if !split_time.is_finite() {
            return Err(EditError::NotFinite(split_time));
        }
        if !(length.is_finite() && length > 0.0) {
            return Err(EditError::InvalidLength(length));
        }

        let index = self.require(id)?;
        let target = &self.segments[index];
        if target.is_question() {
            return Err(EditError::QuestionSegment(id.clone()));
        }
        if split_time <= target.start + BOUNDARY_EPSILON || split_time >= target.end - BOUNDARY_EPSILON {
            return Err(EditError::SplitOutOfRange {
                time: split_time,
                start: target.start,
                end: target.end,
            });
        }

        let question_end = split_time + length;
        let mut updated = Vec::with_capacity(self.segments.len() + 2);
        updated.extend_from_slice(&self.segments[..index]);
        updated.push(target.piece(target.start, split_time));
        updated.push(Segment::question(split_time, question_end, question));
        updated.push(target.piece(question_end, target.end + length));
        updated.extend(self.segments[index + 1..].iter().map(|s| s.shifted(length)));

        debug!(
            "split {} at {}s, inserted {}s question, total now {}s",
            id,
            split_time,
            length,
            self.total_duration() + length
        );

        Ok(Self {
            segments: normalize(updated),
        })
    }

    /// Like [`try_split_and_add`](Self::try_split_and_add) but returns the list
    /// unchanged when the edit is rejected.
    pub fn split_and_add(&self, id: &SegmentId, split_time: f64, question: Arc<Question>, length: f64) -> Self {
        self.try_split_and_add(id, split_time, question, length)
            .unwrap_or_else(|err| self.rejected("split_and_add", err))
    }

    /// Moves a segment's end to `new_end`; later segments shift by the same
    /// amount and keep their durations.
    pub fn try_resize(&self, id: &SegmentId, new_end: f64) -> std::result::Result<Self, EditError> {
        if !new_end.is_finite() {
            return Err(EditError::NotFinite(new_end));
        }

        let index = self.require(id)?;
        let target = &self.segments[index];
        if new_end <= target.start + MIN_SEGMENT_LENGTH {
            return Err(EditError::TooShort {
                new_end,
                start: target.start,
                min: MIN_SEGMENT_LENGTH,
            });
        }

        let delta = new_end - target.end;
        if delta == 0.0 {
            return Ok(self.clone());
        }

        let mut updated = Vec::with_capacity(self.segments.len());
        updated.extend_from_slice(&self.segments[..index]);
        updated.push(Segment {
            end: new_end,
            ..target.clone()
        });
        updated.extend(self.segments[index + 1..].iter().map(|s| s.shifted(delta)));

        debug!("resized {} by {}s", id, delta);

        Ok(Self {
            segments: normalize(updated),
        })
    }

    /// Like [`try_resize`](Self::try_resize) but returns the list unchanged
    /// when the edit is rejected.
    pub fn resize(&self, id: &SegmentId, new_end: f64) -> Self {
        self.try_resize(id, new_end)
            .unwrap_or_else(|err| self.rejected("resize", err))
    }

    /// Moves a question segment by `shift` seconds keeping its duration,
    /// reflowing the neighbours it lands on.
    ///
    /// Neighbours fully covered by the moved segment slide into the space it
    /// left; a plain neighbour covered only partly is cut at the covered
    /// boundary. Plain segments cannot be moved, and a move that would cut
    /// another question card is rejected. The shift is clamped so the segment
    /// stays inside the timeline, so the total duration never changes.
    pub fn try_reposition(&self, id: &SegmentId, shift: f64) -> std::result::Result<Self, EditError> {
        if !shift.is_finite() {
            return Err(EditError::NotFinite(shift));
        }

        let index = self.require(id)?;
        let target = &self.segments[index];
        if !target.is_question() {
            return Err(EditError::PlainSegment(id.clone()));
        }
        let length = target.duration();
        let latest_start = (self.total_duration() - length).max(0.0);
        let new_start = (target.start + shift).clamp(0.0, latest_start);
        let applied = new_start - target.start;
        if applied.abs() <= BOUNDARY_EPSILON {
            return Ok(self.clone());
        }

        let new_end = new_start + length;
        let moved = Segment {
            start: new_start,
            end: new_end,
            ..target.clone()
        };

        let mut updated = Vec::with_capacity(self.segments.len() + 1);
        if applied > 0.0 {
            updated.extend_from_slice(&self.segments[..index]);
            updated.push(moved);
            for other in &self.segments[index + 1..] {
                if new_end <= other.start + BOUNDARY_EPSILON {
                    updated.push(other.clone());
                } else if other.end <= new_end + BOUNDARY_EPSILON {
                    updated.push(other.shifted(-length));
                } else if other.is_question() {
                    return Err(EditError::CutsQuestion(other.id.clone()));
                } else {
                    updated.push(other.piece(other.start - length, new_end - length));
                    updated.push(other.piece(new_end, other.end));
                }
            }
        } else {
            for other in &self.segments[..index] {
                if other.end <= new_start + BOUNDARY_EPSILON {
                    updated.push(other.clone());
                } else if other.start >= new_start - BOUNDARY_EPSILON {
                    updated.push(other.shifted(length));
                } else if other.is_question() {
                    return Err(EditError::CutsQuestion(other.id.clone()));
                } else {
                    updated.push(other.piece(other.start, new_start));
                    updated.push(other.piece(new_start + length, other.end + length));
                }
            }
            updated.push(moved);
            updated.extend_from_slice(&self.segments[index + 1..]);
        }

        debug!("repositioned {} by {}s (requested {}s)", id, applied, shift);

        Ok(Self {
            segments: normalize(updated),
        })
    }

    /// Like [`try_reposition`](Self::try_reposition) but returns the list
    /// unchanged when the edit is rejected.
    pub fn reposition(&self, id: &SegmentId, shift: f64) -> Self {
        self.try_reposition(id, shift)
            .unwrap_or_else(|err| self.rejected("reposition", err))
    }

    /// Removes a segment and pulls later segments left by its duration.
    ///
    /// When both neighbours are plain they end up touching and merge into one
    /// segment that keeps the predecessor's id.
    pub fn try_delete(&self, id: &SegmentId) -> std::result::Result<Self, EditError> {
        let index = self.require(id)?;
        let removed = self.segments[index].duration();

        let mut updated = Vec::with_capacity(self.segments.len());
        updated.extend_from_slice(&self.segments[..index]);
        updated.extend(self.segments[index + 1..].iter().map(|s| s.shifted(-removed)));

        debug!("deleted {} ({}s)", id, removed);

        Ok(Self {
            segments: normalize(updated),
        })
    }

    /// Like [`try_delete`](Self::try_delete) but returns the list unchanged
    /// when the id is unknown.
    pub fn delete(&self, id: &SegmentId) -> Self {
        self.try_delete(id)
            .unwrap_or_else(|err| self.rejected("delete", err))
    }

    /// Swaps the question shown by a question segment; times and id are kept.
    pub fn try_replace_question(
        &self,
        id: &SegmentId,
        question: Arc<Question>,
    ) -> std::result::Result<Self, EditError> {
        let index = self.require(id)?;
        if !self.segments[index].is_question() {
            return Err(EditError::PlainSegment(id.clone()));
        }

        let mut updated = self.segments.clone();
        updated[index].kind = crate::SegmentKind::Question(question);
        Ok(Self { segments: updated })
    }

    fn rejected(&self, op: &str, err: EditError) -> Self {
        debug!("{} ignored: {}", op, err);
        self.clone()
    }
}

impl<'a> IntoIterator for &'a SegmentList {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

/// Sorts by start, drops empty pieces, snaps near-equal boundaries together
/// and coalesces touching plain segments.
fn normalize(mut segments: Vec<Segment>) -> Vec<Segment> {
    segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    segments.retain(|s| s.end - s.start > BOUNDARY_EPSILON);

    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    for mut seg in segments {
        match out.last_mut() {
            Some(prev) => {
                if (seg.start - prev.end).abs() <= BOUNDARY_EPSILON {
                    seg.start = prev.end;
                }
                if !prev.is_question() && !seg.is_question() && seg.start == prev.end {
                    prev.end = seg.end;
                    continue;
                }
            }
            None => {
                if seg.start.abs() <= BOUNDARY_EPSILON {
                    seg.start = 0.0;
                }
            }
        }
        out.push(seg);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Difficulty, QuestionType, SegmentKind};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn question() -> Arc<Question> {
        Arc::new(Question::new("Ready?", Difficulty::Easy, QuestionType::Mc))
    }

    fn ranges(list: &SegmentList) -> Vec<(f64, f64, bool)> {
        list.iter().map(|s| (s.start, s.end, s.is_question())).collect()
    }

    fn card_lengths(list: &SegmentList) -> Vec<f64> {
        let mut lengths: Vec<f64> = list.question_segments().map(|s| s.duration()).collect();
        lengths.sort_by(f64::total_cmp);
        lengths
    }

    /// `[0,30)` plain, `[30,40)` question, `[40,110)` plain
    fn split_fixture() -> SegmentList {
        let list = SegmentList::new(100.0);
        let id = list.segments()[0].id.clone();
        list.split_and_add(&id, 30.0, question(), 10.0)
    }

    #[test]
    fn test_new_single_segment() {
        let list = SegmentList::new(100.0);
        assert_eq!(ranges(&list), vec![(0.0, 100.0, false)]);
        assert_eq!(list.total_duration(), 100.0);
        assert!(SegmentList::new(0.0).is_empty());
        assert_eq!(SegmentList::new(-3.0).total_duration(), 0.0);
    }

    #[test]
    fn test_split_and_add_inserts_time() {
        let original = SegmentList::new(100.0);
        let original_id = original.segments()[0].id.clone();
        let list = split_fixture();

        assert_eq!(
            ranges(&list),
            vec![(0.0, 30.0, false), (30.0, 40.0, true), (40.0, 110.0, false)]
        );
        assert_eq!(list.total_duration(), 110.0);
        assert!(list.get(&original_id).is_none());
        list.check_invariants().unwrap();
    }

    #[test]
    fn test_split_shifts_later_segments() {
        let list = split_fixture();
        let tail = list.segments()[2].id.clone();
        let list = list.split_and_add(&tail, 60.0, question(), 5.0);

        assert_eq!(
            ranges(&list),
            vec![
                (0.0, 30.0, false),
                (30.0, 40.0, true),
                (40.0, 60.0, false),
                (60.0, 65.0, true),
                (65.0, 115.0, false),
            ]
        );
    }

    #[test]
    fn test_split_rejections_leave_list_unchanged() {
        let list = split_fixture();
        let q_id = list.segments()[1].id.clone();
        let plain_id = list.segments()[0].id.clone();

        assert_eq!(
            list.try_split_and_add(&q_id, 35.0, question(), 10.0),
            Err(EditError::QuestionSegment(q_id.clone()))
        );
        assert!(matches!(
            list.try_split_and_add(&plain_id, 30.0, question(), 10.0),
            Err(EditError::SplitOutOfRange { .. })
        ));
        assert!(matches!(
            list.try_split_and_add(&plain_id, 0.0, question(), 10.0),
            Err(EditError::SplitOutOfRange { .. })
        ));
        assert_eq!(
            list.try_split_and_add(&plain_id, 10.0, question(), 0.0),
            Err(EditError::InvalidLength(0.0))
        );
        assert_eq!(list.split_and_add(&SegmentId::from("missing"), 10.0, question(), 10.0), list);
    }

    #[test]
    fn test_resize_shifts_followers() {
        let list = split_fixture();
        let q_id = list.segments()[1].id.clone();
        let resized = list.resize(&q_id, 45.0);

        assert_eq!(
            ranges(&resized),
            vec![(0.0, 30.0, false), (30.0, 45.0, true), (45.0, 115.0, false)]
        );
        assert_eq!(resized.segments()[1].id, q_id);
        assert_eq!(resized.segments()[2].id, list.segments()[2].id);
        assert_eq!(resized.total_duration(), 115.0);
    }

    #[test]
    fn test_resize_to_current_end_is_identity() {
        let list = split_fixture();
        let q_id = list.segments()[1].id.clone();
        assert_eq!(list.resize(&q_id, 40.0), list);
    }

    #[test]
    fn test_resize_rejects_too_short() {
        let list = split_fixture();
        let q_id = list.segments()[1].id.clone();
        assert!(matches!(list.try_resize(&q_id, 30.05), Err(EditError::TooShort { .. })));
        assert_eq!(list.resize(&q_id, 30.1), list);
        assert_eq!(list.resize(&q_id, 30.2).segments()[1].end, 30.2);
    }

    #[test]
    fn test_delete_question_merges_plain_neighbours() {
        let list = split_fixture();
        let first = list.segments()[0].id.clone();
        let q_id = list.segments()[1].id.clone();
        let deleted = list.delete(&q_id);

        assert_eq!(ranges(&deleted), vec![(0.0, 100.0, false)]);
        assert_eq!(deleted.segments()[0].id, first);
        assert_eq!(deleted.total_duration(), list.total_duration() - 10.0);
    }

    #[test]
    fn test_delete_first_and_last() {
        let list = split_fixture();
        let first = list.segments()[0].id.clone();
        let last = list.segments()[2].id.clone();

        let without_first = list.delete(&first);
        assert_eq!(ranges(&without_first), vec![(0.0, 10.0, true), (10.0, 80.0, false)]);

        let without_last = list.delete(&last);
        assert_eq!(ranges(&without_last), vec![(0.0, 30.0, false), (30.0, 40.0, true)]);
        assert_eq!(without_last.total_duration(), 40.0);
    }

    #[test]
    fn test_delete_between_questions_does_not_merge() {
        let list = split_fixture();
        let tail = list.segments()[2].id.clone();
        let list = list.split_and_add(&tail, 60.0, question(), 10.0);
        let middle = list.segments()[2].id.clone();
        let deleted = list.delete(&middle);

        assert_eq!(
            ranges(&deleted),
            vec![(0.0, 30.0, false), (30.0, 40.0, true), (40.0, 50.0, true), (50.0, 100.0, false)]
        );
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let list = split_fixture();
        assert_eq!(list.delete(&SegmentId::from("nope")), list);
        assert!(matches!(list.try_delete(&SegmentId::from("nope")), Err(EditError::NotFound(_))));
    }

    #[test]
    fn test_reposition_right_partial_overlap() {
        let list = split_fixture();
        let first = list.segments()[0].id.clone();
        let q_id = list.segments()[1].id.clone();
        let tail = list.segments()[2].id.clone();
        let moved = list.reposition(&q_id, 20.0);

        assert_eq!(
            ranges(&moved),
            vec![(0.0, 50.0, false), (50.0, 60.0, true), (60.0, 110.0, false)]
        );
        assert_eq!(moved.segments()[0].id, first);
        assert_eq!(moved.segments()[1].id, q_id);
        assert_ne!(moved.segments()[2].id, tail);
        assert_eq!(moved.total_duration(), 110.0);
        moved.check_invariants().unwrap();
    }

    #[test]
    fn test_reposition_left_partial_overlap() {
        let list = split_fixture();
        let q_id = list.segments()[1].id.clone();
        let moved = list.reposition(&q_id, -20.0);

        assert_eq!(
            ranges(&moved),
            vec![(0.0, 10.0, false), (10.0, 20.0, true), (20.0, 110.0, false)]
        );
        assert_eq!(moved.segments()[1].id, q_id);
        moved.check_invariants().unwrap();
    }

    #[test]
    fn test_reposition_over_full_neighbours() {
        // [0,30) P, [30,40) Q1, [40,50) P, [50,60) Q2, [60,110) P
        let list = split_fixture();
        let tail = list.segments()[2].id.clone();
        let list = list.split_and_add(&tail, 50.0, question(), 10.0);
        let q1 = list.segments()[1].id.clone();
        let q2 = list.segments()[3].id.clone();

        let moved = list.reposition(&q1, 30.0);
        assert_eq!(
            ranges(&moved),
            vec![
                (0.0, 40.0, false),
                (40.0, 50.0, true),
                (50.0, 60.0, false),
                (60.0, 70.0, true),
                (70.0, 120.0, false),
            ]
        );
        assert_eq!(moved.segments()[1].id, q2);
        assert_eq!(moved.segments()[3].id, q1);
        moved.check_invariants().unwrap();
    }

    #[test]
    fn test_reposition_clamps_to_timeline() {
        let list = split_fixture();
        let q_id = list.segments()[1].id.clone();

        let far_right = list.reposition(&q_id, 1_000.0);
        assert_eq!(ranges(&far_right), vec![(0.0, 100.0, false), (100.0, 110.0, true)]);

        let far_left = list.reposition(&q_id, -1_000.0);
        assert_eq!(ranges(&far_left), vec![(0.0, 10.0, true), (10.0, 110.0, false)]);
    }

    #[test]
    fn test_reposition_zero_shift_is_identity() {
        let list = split_fixture();
        let q_id = list.segments()[1].id.clone();
        assert_eq!(list.reposition(&q_id, 0.0), list);
    }

    #[test]
    fn test_reposition_rejects_plain_segment() {
        let list = split_fixture();
        let first = list.segments()[0].id.clone();

        assert!(matches!(list.try_reposition(&first, 35.0), Err(EditError::PlainSegment(_))));
        assert_eq!(list.reposition(&first, 35.0), list);
    }

    #[test]
    fn test_reposition_never_cuts_question() {
        // [0,30) P, [30,40) Q1, [40,50) P, [50,60) Q2, [60,110) P
        let list = split_fixture();
        let tail = list.segments()[2].id.clone();
        let list = list.split_and_add(&tail, 50.0, question(), 10.0);
        let q1 = list.segments()[1].id.clone();
        let q2 = list.segments()[3].id.clone();

        // Q1 would end at 55, halfway into Q2.
        assert_eq!(list.try_reposition(&q1, 15.0), Err(EditError::CutsQuestion(q2.clone())));
        assert_eq!(list.try_reposition(&q2, -15.0), Err(EditError::CutsQuestion(q1)));
        assert_eq!(list.reposition(&q2, -15.0), list);
    }

    #[test]
    fn test_replace_question_keeps_timing() {
        let list = split_fixture();
        let q_id = list.segments()[1].id.clone();
        let replacement = Arc::new(Question::new("New?", Difficulty::Hard, QuestionType::Ai));
        let updated = list.try_replace_question(&q_id, replacement.clone()).unwrap();

        assert_eq!(updated.segments()[1].start, 30.0);
        assert_eq!(updated.segments()[1].kind, SegmentKind::Question(replacement));
        let plain = list.segments()[0].id.clone();
        assert!(matches!(
            list.try_replace_question(&plain, question()),
            Err(EditError::PlainSegment(_))
        ));
    }

    #[test]
    fn test_segment_at_boundaries() {
        let list = split_fixture();
        assert!(!list.segment_at(0.0).unwrap().is_question());
        assert!(!list.segment_at(29.999).unwrap().is_question());
        assert!(list.segment_at(30.0).unwrap().is_question());
        assert!(!list.segment_at(40.0).unwrap().is_question());
        assert!(list.segment_at(110.0).is_none());
        assert!(list.segment_at(-1.0).is_none());
    }

    #[test]
    fn test_from_segments_validates() {
        let gap = vec![Segment::plain(0.0, 10.0), Segment::question(11.0, 20.0, question())];
        assert!(SegmentList::from_segments(gap).is_err());

        let late_start = vec![Segment::plain(1.0, 10.0)];
        assert!(SegmentList::from_segments(late_start).is_err());

        let touching = vec![Segment::plain(0.0, 10.0), Segment::plain(10.0, 20.0)];
        let list = SegmentList::from_segments(touching).unwrap();
        assert_eq!(ranges(&list), vec![(0.0, 20.0, false)]);
    }

    #[test]
    fn test_random_edits_keep_invariants() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut list = SegmentList::new(300.0);

        for _ in 0..500 {
            let before = list.total_duration();
            let pick = rng.gen_range(0..list.len());
            let target = list.segments()[pick].clone();

            match rng.gen_range(0..4) {
                0 => {
                    let length = rng.gen_range(1.0..20.0);
                    let at = rng.gen_range(target.start..target.end);
                    let next = list.split_and_add(&target.id, at, question(), length);
                    if next != list {
                        assert!((next.total_duration() - (before + length)).abs() < 1e-6);
                    }
                    list = next;
                }
                1 => {
                    let new_end = target.start + rng.gen_range(0.0..40.0);
                    list = list.resize(&target.id, new_end);
                }
                2 => {
                    let shift = rng.gen_range(-60.0..60.0);
                    let cards_before = card_lengths(&list);
                    list = list.reposition(&target.id, shift);
                    assert!((list.total_duration() - before).abs() < 1e-6);

                    let cards_after = card_lengths(&list);
                    assert_eq!(cards_before.len(), cards_after.len());
                    for (a, b) in cards_before.iter().zip(&cards_after) {
                        assert!((a - b).abs() < 1e-6);
                    }
                }
                _ => {
                    if list.len() > 1 {
                        let next = list.delete(&target.id);
                        assert!((next.total_duration() - (before - target.duration())).abs() < 1e-6);
                        list = next;
                    }
                }
            }

            list.check_invariants().unwrap();
        }
    }
}
