//! Source video duration probe using FFmpeg

use crate::{Error, Result};
use ffmpeg_next as ffmpeg;
use log::debug;
use std::path::Path;
use std::sync::OnceLock;

static FFMPEG_INIT: OnceLock<std::result::Result<(), ffmpeg::Error>> = OnceLock::new();

fn init_ffmpeg() -> Result<()> {
    FFMPEG_INIT.get_or_init(ffmpeg::init).clone().map_err(Error::from)
}

/// Duration of the video at `path` in seconds.
///
/// Uses the best video stream's duration, falling back to the container's.
pub fn probe_duration(path: impl AsRef<Path>) -> Result<f64> {
    init_ffmpeg()?;
    let path = path.as_ref();
    let input = ffmpeg::format::input(&path)?;

    let from_stream = input.streams().best(ffmpeg::media::Type::Video).and_then(|stream| {
        let duration = stream.duration();
        let time_base = stream.time_base();
        (duration > 0 && time_base.denominator() != 0)
            .then(|| duration as f64 * time_base.numerator() as f64 / time_base.denominator() as f64)
    });

    let seconds = from_stream.unwrap_or_else(|| input.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64);
    if !(seconds.is_finite() && seconds > 0.0) {
        return Err(Error::NoDuration(path.display().to_string()));
    }

    debug!("probed {}: {:.3}s", path.display(), seconds);
    Ok(seconds)
}
