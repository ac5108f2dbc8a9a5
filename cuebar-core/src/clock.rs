//! Shared logical clock

/// Meeting-wide playback state, shared by every participant.
///
/// `current_time` is measured on the edited timeline, not the source video.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogicalClock {
    /// Seconds of edited-timeline time
    pub current_time: f64,
    pub stopped: bool,
    /// Id of the segment most recently reached when playback halted, if any
    pub ending_id: Option<String>,
    /// Playback rate; `1.0` is real time
    pub speed: f64,
}

impl Default for LogicalClock {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            stopped: true,
            ending_id: None,
            speed: 1.0,
        }
    }
}

impl LogicalClock {
    /// Creates a stopped clock at the given time
    pub fn stopped_at(current_time: f64) -> Self {
        Self {
            current_time,
            ..Self::default()
        }
    }

    /// Creates a running clock at the given time
    pub fn running_at(current_time: f64) -> Self {
        Self {
            current_time,
            stopped: false,
            ..Self::default()
        }
    }

    /// Advances the clock by `elapsed` seconds of wall time, wrapping to zero
    /// once it passes `total_duration`. Does nothing while stopped.
    ///
    /// Returns true if the clock wrapped.
    pub fn advance(&mut self, elapsed: f64, total_duration: f64) -> bool {
        if self.stopped {
            return false;
        }
        self.current_time += elapsed * self.speed;
        if self.current_time > total_duration {
            self.current_time = 0.0;
            return true;
        }
        false
    }
}
