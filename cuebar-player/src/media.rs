//! The media element seam

/// Failure reported by a media element
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MediaError {
    #[error("playback was rejected: {0}")]
    PlayRejected(String),
}

/// Something with a native playhead measured in source video time.
///
/// The synchronizer only ever talks to the video through this trait.
pub trait MediaElement: Send {
    /// Starts playback
    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    fn is_playing(&self) -> bool;

    /// Native playhead in seconds of source video time
    fn current_time(&self) -> f64;

    fn seek(&mut self, time: f64);

    /// True once playback has run off the end of the media
    fn has_ended(&self) -> bool;

    /// Called once per sync tick with the wall time since the previous tick.
    ///
    /// Real players advance on their own; simulated ones move their playhead here.
    fn on_tick(&mut self, _elapsed: f64) {}
}

/// In-process media element with its own playhead
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedMedia {
    time: f64,
    duration: f64,
    playing: bool,
    ended: bool,
    reject_play: bool,
}

impl SimulatedMedia {
    /// Creates a paused media element of `duration` seconds
    pub fn new(duration: f64) -> Self {
        Self {
            time: 0.0,
            duration: duration.max(0.0),
            playing: false,
            ended: false,
            reject_play: false,
        }
    }

    /// Makes every `play` call fail, like a browser blocking autoplay
    pub fn rejecting_play(mut self) -> Self {
        self.reject_play = true;
        self
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

impl MediaElement for SimulatedMedia {
    fn play(&mut self) -> Result<(), MediaError> {
        if self.reject_play {
            return Err(MediaError::PlayRejected("autoplay blocked".to_string()));
        }
        self.playing = true;
        self.ended = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn seek(&mut self, time: f64) {
        self.time = time.clamp(0.0, self.duration);
        if self.time < self.duration {
            self.ended = false;
        }
    }

    fn has_ended(&self) -> bool {
        self.ended
    }

    fn on_tick(&mut self, elapsed: f64) {
        if !self.playing {
            return;
        }
        self.time += elapsed;
        if self.time >= self.duration {
            self.time = self.duration;
            self.playing = false;
            self.ended = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_media_advances_only_while_playing() {
        let mut media = SimulatedMedia::new(10.0);
        media.on_tick(1.0);
        assert_eq!(media.current_time(), 0.0);

        media.play().unwrap();
        media.on_tick(1.5);
        assert_eq!(media.current_time(), 1.5);
    }

    #[test]
    fn test_simulated_media_ends() {
        let mut media = SimulatedMedia::new(2.0);
        media.play().unwrap();
        media.on_tick(3.0);
        assert!(media.has_ended());
        assert!(!media.is_playing());
        assert_eq!(media.current_time(), 2.0);

        media.seek(0.0);
        assert!(!media.has_ended());
    }

    #[test]
    fn test_rejecting_play() {
        let mut media = SimulatedMedia::new(2.0).rejecting_play();
        assert!(matches!(media.play(), Err(MediaError::PlayRejected(_))));
        assert!(!media.is_playing());
    }
}
