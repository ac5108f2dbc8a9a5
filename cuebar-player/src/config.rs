//! Playback timing configuration

use std::time::Duration;

/// Timer settings of the playback driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncConfig {
    /// Period of the sync tick that advances the clock and checks the media element
    pub tick_interval: Duration,
    /// Media drift in seconds tolerated before a corrective seek
    pub drift_threshold: f64,
    /// Period of the needle animation tick
    pub needle_frame: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(150),
            drift_threshold: 0.3,
            needle_frame: Duration::from_millis(16),
        }
    }
}
