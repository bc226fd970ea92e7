use std::path::PathBuf;

use crate::decode::SourceInfo;

/// Output side of the transport, fixed once the device stream is open.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputInfo {
    /// Output device name.
    pub device: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Device sample format, e.g. `f32`.
    pub sample_format: String,
    /// Fixed callback buffer size, when one was requested.
    pub buffer_size_frames: Option<u32>,
}

/// Point-in-time view of the transport for display.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransportStatus {
    /// File currently installed as the source.
    pub path: Option<PathBuf>,
    pub playing: bool,
    pub position_ms: u64,
    pub source: Option<SourceInfo>,
    pub output: OutputInfo,
    /// Number of callbacks that ran out of buffered audio.
    pub underrun_events: u64,
}

impl TransportStatus {
    pub fn duration_ms(&self) -> Option<u64> {
        self.source.as_ref().and_then(|s| s.duration_ms)
    }

    /// Whether the source rate differs from the output rate.
    pub fn resampling(&self) -> bool {
        self.source
            .as_ref()
            .map(|s| s.sample_rate != self.output.sample_rate)
            .unwrap_or(false)
    }

    /// File name of the installed source, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
    }
}

/// Convert output frames to milliseconds at `sample_rate`.
pub fn frames_to_ms(frames: u64, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    frames.saturating_mul(1000) / sample_rate as u64
}

/// Convert a position in seconds to output frames at `sample_rate`.
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(rate: u32) -> SourceInfo {
        SourceInfo {
            codec: Some("PCM_S16".to_string()),
            sample_rate: rate,
            channels: 2,
            duration_ms: Some(3_000),
            ..SourceInfo::default()
        }
    }

    #[test]
    fn frames_to_ms_handles_zero_rate() {
        assert_eq!(frames_to_ms(96_000, 48_000), 2_000);
        assert_eq!(frames_to_ms(96_000, 0), 0);
    }

    #[test]
    fn seconds_to_frames_rejects_negative_and_nan() {
        assert_eq!(seconds_to_frames(1.5, 48_000), 72_000);
        assert_eq!(seconds_to_frames(-1.0, 48_000), 0);
        assert_eq!(seconds_to_frames(f64::NAN, 48_000), 0);
    }

    #[test]
    fn resampling_compares_source_and_output_rates() {
        let mut status = TransportStatus {
            source: Some(source(44_100)),
            output: OutputInfo {
                sample_rate: 48_000,
                ..OutputInfo::default()
            },
            ..TransportStatus::default()
        };
        assert!(status.resampling());
        status.output.sample_rate = 44_100;
        assert!(!status.resampling());
        status.source = None;
        assert!(!status.resampling());
    }

    #[test]
    fn file_name_and_duration_come_from_source() {
        let status = TransportStatus {
            path: Some(PathBuf::from("/music/track.wav")),
            source: Some(source(44_100)),
            ..TransportStatus::default()
        };
        assert_eq!(status.file_name(), Some("track.wav"));
        assert_eq!(status.duration_ms(), Some(3_000));
    }
}
