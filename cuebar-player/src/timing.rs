//! Mapping between edited-timeline time and source video time

use cuebar_core::SegmentList;

/// Source video time shown at `edited_time`.
///
/// Question segments hold the video, so every second of question time at or
/// before `edited_time` is subtracted.
pub fn real_time(segments: &SegmentList, edited_time: f64) -> f64 {
    let held: f64 = segments
        .question_segments()
        .take_while(|q| q.start < edited_time)
        .map(|q| edited_time.min(q.end) - q.start)
        .sum();
    (edited_time - held).max(0.0)
}

/// Edited-timeline time at which the video reaches `real` seconds.
///
/// A real time sitting exactly where a question card was inserted maps to
/// the end of that card, where the video resumes. Times past the end of the
/// video map to the total duration.
pub fn edited_time_for(segments: &SegmentList, real: f64) -> f64 {
    let real = real.max(0.0);
    let mut played = 0.0;
    for seg in segments.iter().filter(|s| !s.is_question()) {
        let duration = seg.duration();
        if real < played + duration {
            return seg.start + (real - played);
        }
        played += duration;
    }
    segments.total_duration()
}
