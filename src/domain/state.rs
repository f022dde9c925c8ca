//! Playback snapshot kept by the controller.
//!
//! A [`PlaybackState`] is a plain `Copy` value. The controller builds a new
//! one for every change and swaps it in, so a reader never sees the playhead
//! updated while the duration it is measured against is stale.

pub const DEFAULT_VOLUME: f64 = 1.0;
pub const DEFAULT_PLAYBACK_RATE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    /// Attached, nothing played yet.
    #[default]
    Idle,
    Playing,
    Paused,
    /// Playback reached the end of the media.
    Ended,
}

impl PlaybackPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Ended => "Ended",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub phase: PlaybackPhase,
    pub current_time: f64,
    /// `None` until the resource reports finite metadata.
    pub duration: Option<f64>,
    pub buffered_edge: f64,
    pub volume: f64,
    pub is_muted: bool,
    pub playback_rate: f64,
    pub is_fullscreen: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            current_time: 0.0,
            duration: None,
            buffered_edge: 0.0,
            volume: DEFAULT_VOLUME,
            is_muted: false,
            playback_rate: DEFAULT_PLAYBACK_RATE,
            is_fullscreen: false,
        }
    }
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        self.phase == PlaybackPhase::Playing
    }

    pub fn progress_percent(&self) -> f64 {
        percent_of(self.current_time, self.duration)
    }

    pub fn buffered_percent(&self) -> f64 {
        percent_of(self.buffered_edge, self.duration)
    }

    pub fn has_metadata(&self) -> bool {
        self.duration.is_some()
    }
}

/// Normalizes a duration reported by a resource. NaN, infinite and negative
/// values all mean "not known yet".
pub fn known_duration(raw: f64) -> Option<f64> {
    if raw.is_finite() && raw >= 0.0 {
        Some(raw)
    } else {
        None
    }
}

/// Position reported by a resource, with garbage mapped to the start.
pub fn sanitize_time(raw: f64) -> f64 {
    if raw.is_finite() && raw > 0.0 {
        raw
    } else {
        0.0
    }
}

/// `100 * value / duration` clamped to `[0, 100]`; 0 when the duration is
/// unknown or zero so range controls never receive NaN.
pub fn percent_of(value: f64, duration: Option<f64>) -> f64 {
    match duration {
        Some(total) if total > 0.0 && value.is_finite() => {
            (100.0 * value / total).clamp(0.0, 100.0)
        }
        _ => 0.0,
    }
}

pub fn format_clock(seconds: f64) -> String {
    let total = sanitize_time(seconds).floor() as u64;
    let (hours, minutes, secs) = (total / 3600, (total / 60) % 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_durations_are_normalized() {
        assert_eq!(known_duration(f64::NAN), None);
        assert_eq!(known_duration(f64::INFINITY), None);
        assert_eq!(known_duration(-1.0), None);
        assert_eq!(known_duration(0.0), Some(0.0));
        assert_eq!(known_duration(42.5), Some(42.5));
    }
}
