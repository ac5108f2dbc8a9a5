//! Playback synchronizer state machine
//!
//! The synchronizer maps the session's logical clock onto a media element.
//! It runs its core pass after every clock change: find the active segment
//! and compute the real video time. A question card holds the video at that
//! time; otherwise a running clock keeps the video playing within the drift
//! threshold and a stopped one parks it at the exact position.

use crate::{real_time, MediaElement, SyncConfig};
use cuebar_core::{LogicalClock, Question, SegmentId, TimelineSession};
use log::{debug, error, info};
use std::sync::Arc;

/// What the viewer is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    PlayingVideo,
    PausedOnQuestion,
    PausedManual,
}

/// Keyboard input understood by the controlling client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Char(char),
}

/// Change observed during a sync pass
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    StateChanged(PlaybackState),
    QuestionShown {
        segment: SegmentId,
        question: Arc<Question>,
    },
    QuestionCleared,
    /// Media was moved to the real time after drifting too far
    Resynced { real_time: f64 },
    /// Clock passed the end of the timeline and wrapped to zero
    Wrapped,
    /// Media ran off its end; clock reset to a stopped zero
    Ended,
    EndingChanged(Option<String>),
    MediaFailed(String),
}

/// Result of one sync pass
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub state: PlaybackState,
    /// Segment containing the clock's current time, if any
    pub active: Option<SegmentId>,
    /// Source video time at the clock's current time, if a segment was active
    pub real_time: Option<f64>,
    pub events: Vec<PlaybackEvent>,
}

/// Keeps one media element in step with a session's logical clock
#[derive(Debug)]
pub struct PlaybackSynchronizer<M: MediaElement> {
    media: M,
    config: SyncConfig,
    state: PlaybackState,
    question: Option<(SegmentId, Arc<Question>)>,
    /// Events produced by control actions, waiting to be drained
    pending: Vec<PlaybackEvent>,
}

impl<M: MediaElement> PlaybackSynchronizer<M> {
    /// Creates a synchronizer in the manually paused state
    pub fn new(media: M, config: SyncConfig) -> Self {
        Self {
            media,
            config,
            state: PlaybackState::PausedManual,
            question: None,
            pending: Vec::new(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Question card currently on screen, if any
    pub fn current_question(&self) -> Option<&Arc<Question>> {
        self.question.as_ref().map(|(_, q)| q)
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    /// Takes the events produced by `toggle_play`, `handle_key` and `seek`
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Periodic tick: advances the clock by `elapsed` seconds of wall time,
    /// handles the end of the media and wrap-around, then runs a sync pass.
    pub fn tick(&mut self, session: &mut TimelineSession, elapsed: f64) -> TickOutcome {
        let mut events = Vec::new();
        self.media.on_tick(elapsed);

        if self.media.has_ended() {
            info!("media ended, rewinding to the start");
            session.clock.current_time = 0.0;
            session.clock.stopped = true;
            self.media.seek(0.0);
            events.push(PlaybackEvent::Ended);
        } else if session.clock.advance(elapsed, session.total_duration()) {
            events.push(PlaybackEvent::Wrapped);
        }

        self.sync(session, events)
    }

    /// Applies an authoritative clock in full, then runs a sync pass
    pub fn apply_clock(&mut self, session: &mut TimelineSession, clock: LogicalClock) -> TickOutcome {
        let mut events = Vec::new();
        if clock.ending_id != session.clock.ending_id {
            events.push(PlaybackEvent::EndingChanged(clock.ending_id.clone()));
        }
        session.clock = clock;
        self.sync(session, events)
    }

    /// Flips play/pause from the controlling client and returns the clock to broadcast.
    ///
    /// Pausing records the active segment as the clock's `ending_id`.
    pub fn toggle_play(&mut self, session: &mut TimelineSession) -> LogicalClock {
        let active = session.active_segment().map(|s| s.id.to_string());
        let mut clock = session.clock.clone();
        clock.stopped = !clock.stopped;
        clock.ending_id = if clock.stopped { active } else { None };

        debug!("toggle play: stopped={} at {}s", clock.stopped, clock.current_time);
        let outcome = self.apply_clock(session, clock);
        self.pending.extend(outcome.events);
        session.clock.clone()
    }

    /// Handles a key press; only space does anything, acting as play/pause
    pub fn handle_key(&mut self, session: &mut TimelineSession, key: Key) -> Option<LogicalClock> {
        match key {
            Key::Space => Some(self.toggle_play(session)),
            Key::Char(_) => None,
        }
    }

    /// Jumps to `time` on the edited timeline and returns the clock to broadcast
    pub fn seek(&mut self, session: &mut TimelineSession, time: f64) -> LogicalClock {
        let total = session.total_duration();
        let mut clock = session.clock.clone();
        clock.current_time = if time.is_finite() { time.clamp(0.0, total) } else { 0.0 };
        if clock.current_time >= total {
            clock.current_time = 0.0;
        }

        let outcome = self.apply_clock(session, clock);
        self.pending.extend(outcome.events);
        session.clock.clone()
    }

    fn sync(&mut self, session: &mut TimelineSession, mut events: Vec<PlaybackEvent>) -> TickOutcome {
        let total = session.total_duration();
        if session.clock.current_time > total {
            session.clock.current_time = 0.0;
            events.push(PlaybackEvent::Wrapped);
        }

        let now = session.clock.current_time;
        let Some(active) = session.segments.segment_at(now) else {
            return TickOutcome {
                state: self.state,
                active: None,
                real_time: None,
                events,
            };
        };
        let active_id = active.id.clone();
        let real = real_time(&session.segments, now);

        let next_state = match active.question_data() {
            Some(question) => {
                if self.media.is_playing() {
                    self.media.pause();
                }
                if self.media.current_time() != real {
                    self.media.seek(real);
                }
                let shown = self.question.as_ref().map(|(id, _)| id);
                if shown != Some(&active_id) {
                    debug!("showing question {} on segment {}", question.id, active_id);
                    self.question = Some((active_id.clone(), question.clone()));
                    events.push(PlaybackEvent::QuestionShown {
                        segment: active_id.clone(),
                        question: question.clone(),
                    });
                }
                PlaybackState::PausedOnQuestion
            }
            None => {
                if self.question.take().is_some() {
                    events.push(PlaybackEvent::QuestionCleared);
                }
                if session.clock.stopped {
                    if self.media.is_playing() {
                        self.media.pause();
                    }
                    if self.media.current_time() != real {
                        self.media.seek(real);
                    }
                    PlaybackState::PausedManual
                } else {
                    self.resume(real, &mut events)
                }
            }
        };

        if next_state != self.state {
            self.state = next_state;
            events.push(PlaybackEvent::StateChanged(next_state));
        }

        TickOutcome {
            state: self.state,
            active: Some(active_id),
            real_time: Some(real),
            events,
        }
    }

    fn resume(&mut self, real: f64, events: &mut Vec<PlaybackEvent>) -> PlaybackState {
        if (self.media.current_time() - real).abs() > self.config.drift_threshold {
            self.media.seek(real);
            events.push(PlaybackEvent::Resynced { real_time: real });
        }
        if !self.media.is_playing() {
            if let Err(err) = self.media.play() {
                error!("media refused to play: {}", err);
                events.push(PlaybackEvent::MediaFailed(err.to_string()));
                return PlaybackState::PausedManual;
            }
        }
        PlaybackState::PlayingVideo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatedMedia;
    use cuebar_core::{Difficulty, QuestionType};

    /// `[0,30)` plain, `[30,40)` question, `[40,60)` plain over 50 s of video
    fn setup() -> (TimelineSession, PlaybackSynchronizer<SimulatedMedia>) {
        let mut session = TimelineSession::new("demo", "intro.mp4", 50.0);
        let q = Arc::new(Question::new("Ready?", Difficulty::Easy, QuestionType::Mc));
        session.insert_question(30.0, q).unwrap();
        let sync = PlaybackSynchronizer::new(SimulatedMedia::new(50.0), SyncConfig::default());
        (session, sync)
    }

    #[test]
    fn test_repeated_stopped_clock_is_idempotent() {
        let (mut session, mut sync) = setup();
        let clock = LogicalClock {
            current_time: 0.0,
            stopped: true,
            ending_id: Some("s1".to_string()),
            speed: 1.0,
        };

        let first = sync.apply_clock(&mut session, clock.clone());
        assert_eq!(first.state, PlaybackState::PausedManual);
        assert_eq!(
            first.events,
            vec![PlaybackEvent::EndingChanged(Some("s1".to_string()))]
        );

        let second = sync.apply_clock(&mut session, clock);
        assert_eq!(second.state, PlaybackState::PausedManual);
        assert!(second.events.is_empty());
        assert_eq!(session.clock.ending_id.as_deref(), Some("s1"));
        assert!(!sync.media().is_playing());
        assert_eq!(sync.media().current_time(), 0.0);
    }

    #[test]
    fn test_running_clock_plays_media() {
        let (mut session, mut sync) = setup();
        let outcome = sync.apply_clock(&mut session, LogicalClock::running_at(10.0));

        assert_eq!(outcome.state, PlaybackState::PlayingVideo);
        assert_eq!(outcome.real_time, Some(10.0));
        assert!(sync.media().is_playing());
        assert_eq!(sync.media().current_time(), 10.0);
        assert!(outcome.events.contains(&PlaybackEvent::Resynced { real_time: 10.0 }));
    }

    #[test]
    fn test_small_drift_is_tolerated() {
        let (mut session, mut sync) = setup();
        sync.apply_clock(&mut session, LogicalClock::running_at(10.0));
        sync.media_mut().seek(10.2);

        let outcome = sync.apply_clock(&mut session, LogicalClock::running_at(10.0));
        assert!(outcome.events.is_empty());
        assert_eq!(sync.media().current_time(), 10.2);

        let outcome = sync.apply_clock(&mut session, LogicalClock::running_at(11.0));
        assert_eq!(outcome.events, vec![PlaybackEvent::Resynced { real_time: 11.0 }]);
    }

    #[test]
    fn test_question_segment_holds_video() {
        let (mut session, mut sync) = setup();
        sync.apply_clock(&mut session, LogicalClock::running_at(29.0));
        assert!(sync.media().is_playing());

        let outcome = sync.apply_clock(&mut session, LogicalClock::running_at(32.0));
        assert_eq!(outcome.state, PlaybackState::PausedOnQuestion);
        assert_eq!(outcome.real_time, Some(30.0));
        assert!(!sync.media().is_playing());
        assert!(sync.current_question().is_some());
        assert!(matches!(outcome.events[0], PlaybackEvent::QuestionShown { .. }));

        let outcome = sync.apply_clock(&mut session, LogicalClock::running_at(41.0));
        assert_eq!(outcome.state, PlaybackState::PlayingVideo);
        assert_eq!(outcome.real_time, Some(31.0));
        assert!(outcome.events.contains(&PlaybackEvent::QuestionCleared));
        assert!(sync.current_question().is_none());
    }

    #[test]
    fn test_tick_advances_clock_through_question() {
        let (mut session, mut sync) = setup();
        sync.apply_clock(&mut session, LogicalClock::running_at(29.5));

        let mut reached_question = false;
        for _ in 0..20 {
            let outcome = sync.tick(&mut session, 0.15);
            if outcome.state == PlaybackState::PausedOnQuestion {
                reached_question = true;
            }
        }
        assert!(reached_question);
        assert!((session.clock.current_time - 32.5).abs() < 1e-9);
        assert!((sync.media().current_time() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_tick_wraps_past_end() {
        let (mut session, mut sync) = setup();
        sync.apply_clock(&mut session, LogicalClock::running_at(59.95));
        sync.media_mut().pause();

        let outcome = sync.tick(&mut session, 0.15);
        assert!(outcome.events.contains(&PlaybackEvent::Wrapped));
        assert_eq!(session.clock.current_time, 0.0);
    }

    #[test]
    fn test_media_end_stops_clock() {
        let (mut session, mut sync) = setup();
        sync.apply_clock(&mut session, LogicalClock::running_at(59.9));
        assert_eq!(sync.media().current_time(), 49.9);

        let outcome = sync.tick(&mut session, 0.15);
        assert!(outcome.events.contains(&PlaybackEvent::Ended));
        assert!(session.clock.stopped);
        assert_eq!(session.clock.current_time, 0.0);
        assert_eq!(outcome.state, PlaybackState::PausedManual);
    }

    #[test]
    fn test_rejected_play_falls_back_to_paused() {
        let (mut session, _) = setup();
        let mut sync = PlaybackSynchronizer::new(SimulatedMedia::new(50.0).rejecting_play(), SyncConfig::default());

        let outcome = sync.apply_clock(&mut session, LogicalClock::running_at(5.0));
        assert_eq!(outcome.state, PlaybackState::PausedManual);
        assert!(matches!(outcome.events.last(), Some(PlaybackEvent::MediaFailed(_))));
    }

    #[test]
    fn test_space_toggles_and_records_ending() {
        let (mut session, mut sync) = setup();
        session.clock.current_time = 35.0;
        let question_id = session.active_segment().unwrap().id.to_string();

        let started = sync.handle_key(&mut session, Key::Space).unwrap();
        assert!(!started.stopped);
        assert_eq!(started.ending_id, None);

        let stopped = sync.handle_key(&mut session, Key::Space).unwrap();
        assert!(stopped.stopped);
        assert_eq!(stopped.ending_id, Some(question_id));

        assert_eq!(sync.handle_key(&mut session, Key::Char('k')), None);
        assert!(sync
            .drain_events()
            .iter()
            .any(|e| matches!(e, PlaybackEvent::QuestionShown { .. })));
        assert!(sync.drain_events().is_empty());
    }

    #[test]
    fn test_seek_clamps_and_syncs() {
        let (mut session, mut sync) = setup();
        let clock = sync.seek(&mut session, 45.0);
        assert_eq!(clock.current_time, 45.0);
        assert_eq!(sync.media().current_time(), 35.0);

        let clock = sync.seek(&mut session, -5.0);
        assert_eq!(clock.current_time, 0.0);
        let clock = sync.seek(&mut session, 500.0);
        assert_eq!(clock.current_time, 0.0);
    }

    #[test]
    fn test_clock_at_end_is_idle() {
        let (mut session, mut sync) = setup();
        let outcome = sync.apply_clock(&mut session, LogicalClock::stopped_at(60.0));
        assert_eq!(outcome.active, None);
        assert_eq!(outcome.real_time, None);
    }
}
