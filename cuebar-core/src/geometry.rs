//! Timeline bar geometry: seconds to pixels, tick marks and the play-head needle

use crate::Segment;

/// Scale and layout settings of the timeline bar
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeometryConfig {
    pub pixels_per_second: f64,
    /// Zoom level in percent, 1 to 100
    pub zoom_percent: f64,
    /// Extra seconds of ticks drawn past the end of the timeline
    pub padding: f64,
    /// Target distance between ticks in pixels
    pub tick_spacing: f64,
    /// Fraction of the remaining distance the needle covers each frame
    pub needle_lerp: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            pixels_per_second: 100.0,
            zoom_percent: 50.0,
            padding: 10.0,
            tick_spacing: 100.0,
            needle_lerp: 0.3,
        }
    }
}

/// Pure mapping between timeline seconds and rendered pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimelineGeometry {
    config: GeometryConfig,
}

impl TimelineGeometry {
    /// Creates a geometry, clamping the zoom into `1..=100`
    pub fn new(mut config: GeometryConfig) -> Self {
        config.zoom_percent = clamp_zoom(config.zoom_percent);
        Self { config }
    }

    pub fn config(&self) -> &GeometryConfig {
        &self.config
    }

    pub fn zoom_percent(&self) -> f64 {
        self.config.zoom_percent
    }

    /// Sets the zoom level, clamped into `1..=100`
    pub fn set_zoom(&mut self, zoom_percent: f64) {
        self.config.zoom_percent = clamp_zoom(zoom_percent);
    }

    fn scale(&self) -> f64 {
        self.config.pixels_per_second * (self.config.zoom_percent / 100.0)
    }

    pub fn seconds_to_pixels(&self, seconds: f64) -> f64 {
        seconds * self.scale()
    }

    pub fn pixels_to_seconds(&self, pixels: f64) -> f64 {
        pixels / self.scale()
    }

    /// Width of the whole bar in pixels for a timeline of `total` seconds
    pub fn rendered_width(&self, total: f64) -> f64 {
        self.seconds_to_pixels(total)
    }

    /// Left offset and width of a segment block, in pixels
    pub fn segment_span(&self, segment: &Segment) -> (f64, f64) {
        (
            self.seconds_to_pixels(segment.start),
            self.seconds_to_pixels(segment.duration()),
        )
    }

    /// Tick interval in whole seconds giving roughly one tick per `tick_spacing` pixels.
    ///
    /// Returns `None` when the bar is narrower than one spacing.
    pub fn tick_interval(&self, total: f64) -> Option<u64> {
        let slots = (self.rendered_width(total) / self.config.tick_spacing).floor();
        if !(slots >= 1.0) {
            return None;
        }
        Some((total / slots).round().max(1.0) as u64)
    }

    /// Tick positions in seconds from `0` to `total + padding`
    pub fn ticks(&self, total: f64) -> Vec<u64> {
        let Some(step) = self.tick_interval(total) else {
            return vec![0];
        };

        let limit = total + self.config.padding;
        (0..)
            .map(|i: u64| i * step)
            .take_while(|&t| t as f64 <= limit)
            .collect()
    }

    /// Pixel x of the play-head for `current_time` on a timeline of `total` seconds
    pub fn needle_target(&self, current_time: f64, total: f64) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        let fraction = (current_time / total).clamp(0.0, 1.0);
        fraction * self.rendered_width(total)
    }
}

fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        GeometryConfig::default().zoom_percent
    } else {
        zoom.clamp(1.0, 100.0)
    }
}

/// Smoothed play-head position.
///
/// Purely visual: the displayed position trails the target and never feeds
/// back into the clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Needle {
    displayed: f64,
    lerp: f64,
}

impl Needle {
    pub fn new(lerp: f64) -> Self {
        Self {
            displayed: 0.0,
            lerp: lerp.clamp(0.0, 1.0),
        }
    }

    pub fn displayed(&self) -> f64 {
        self.displayed
    }

    /// Moves one animation frame toward `target` and returns the new position
    pub fn step(&mut self, target: f64) -> f64 {
        self.displayed += (target - self.displayed) * self.lerp;
        self.displayed
    }

    /// Jumps straight to `position`
    pub fn reset(&mut self, position: f64) {
        self.displayed = position;
    }
}

impl Default for Needle {
    fn default() -> Self {
        Self::new(GeometryConfig::default().needle_lerp)
    }
}
