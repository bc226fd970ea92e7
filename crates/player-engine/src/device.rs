//! Output device selection.
//!
//! Thin helpers around CPAL for choosing the output device, its stream config and
//! buffer size, plus the channel layout the player asks for.

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait};

/// Whether the platform gates audio input behind a runtime permission.
///
/// Desktop CPAL hosts never ask, so the player always passes `NotRequired`; the other
/// outcomes only shape the requested [`ChannelLayout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordPermission {
    /// The host does not require a permission (desktop CPAL hosts).
    NotRequired,
    /// Required, and already granted before start-up.
    AlreadyGranted,
    /// Required and requested at start-up; carries the user's answer.
    Requested { granted: bool },
}

/// Input/output channel counts requested from the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelLayout {
    /// Advisory only: the transport builds an output stream and never opens an input
    /// stream, so this value is logged but not applied.
    pub inputs: u16,
    /// Channel count asked of the output config.
    pub outputs: u16,
}

impl ChannelLayout {
    /// Stereo output, no input.
    pub const PLAYBACK: Self = Self {
        inputs: 0,
        outputs: 2,
    };

    /// Layout for the given record-permission outcome.
    ///
    /// Only a permission that had to be requested and was granted reports inputs; every
    /// other outcome keeps the output-only layout. Playback is unaffected either way.
    pub fn for_permission(permission: RecordPermission) -> Self {
        match permission {
            RecordPermission::Requested { granted: true } => Self {
                inputs: 2,
                ..Self::PLAYBACK
            },
            RecordPermission::Requested { granted: false } => {
                tracing::info!("record permission denied; using output-only layout");
                Self::PLAYBACK
            }
            RecordPermission::NotRequired | RecordPermission::AlreadyGranted => Self::PLAYBACK,
        }
    }
}

/// Pick the first output device whose name contains `needle` (case-insensitive), or the
/// host default when `needle` is `None`.
pub fn pick_device(host: &cpal::Host, needle: Option<&str>) -> Result<cpal::Device> {
    if let Some(needle) = needle {
        let mut devices = host.output_devices().context("No output devices")?;
        return devices
            .find(|d| {
                d.description()
                    .map(|desc| matches_device_name(&desc.name(), needle))
                    .unwrap_or(false)
            })
            .ok_or_else(|| anyhow!("No output device matched: {needle}"));
    }

    host.default_output_device()
        .ok_or_else(|| anyhow!("No default output device"))
}

/// Choose an output config for `channels` output channels near `target_rate`.
///
/// Candidates are ranked by: exact channel match, rate at or below the target, higher
/// rate, then sample format (F32 > I32 > I16 > U16).
pub fn pick_output_config(
    device: &cpal::Device,
    target_rate: Option<u32>,
    channels: u16,
) -> Result<cpal::SupportedStreamConfig> {
    let mut best: Option<(Candidate, cpal::SupportedStreamConfig)> = None;

    for range in device.supported_output_configs()? {
        let rate = pick_rate_for_range(range.min_sample_rate(), range.max_sample_rate(), target_rate);
        let candidate = Candidate {
            channels_match: range.channels() == channels,
            below: target_rate.map(|t| rate <= t).unwrap_or(true),
            rate,
            format_rank: sample_format_rank(range.sample_format()),
        };
        let replace = best
            .as_ref()
            .map(|(current, _)| candidate.is_better_than(current))
            .unwrap_or(true);
        if replace {
            best = Some((candidate, range.with_sample_rate(rate)));
        }
    }

    best.map(|(_, cfg)| cfg)
        .ok_or_else(|| anyhow!("No supported output configs"))
}

/// Prefer a large fixed buffer (capped at 16384 frames) to ride out scheduling hiccups.
///
/// Returns `None` when the device does not report a range, leaving CPAL's default.
pub fn pick_buffer_size(config: &cpal::SupportedStreamConfig) -> Option<cpal::BufferSize> {
    match config.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } => {
            Some(cpal::BufferSize::Fixed(clamp_buffer_frames(*min, *max)))
        }
        cpal::SupportedBufferSize::Unknown => None,
    }
}

/// Print available output devices to stdout (`--list-devices`).
pub fn list_devices(host: &cpal::Host) -> Result<()> {
    let devices = host.output_devices().context("No output devices")?;
    for (i, d) in devices.enumerate() {
        println!("#{i}: {}", d.description()?);
    }
    Ok(())
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    channels_match: bool,
    below: bool,
    rate: u32,
    format_rank: u8,
}

impl Candidate {
    fn is_better_than(&self, other: &Candidate) -> bool {
        if self.channels_match != other.channels_match {
            self.channels_match
        } else if self.below != other.below {
            self.below
        } else if self.rate != other.rate {
            self.rate > other.rate
        } else {
            self.format_rank < other.format_rank
        }
    }
}

fn clamp_buffer_frames(min: u32, max: u32) -> u32 {
    const MAX_FRAMES: u32 = 16_384;
    if max <= MAX_FRAMES {
        max
    } else {
        min.max(MAX_FRAMES)
    }
}

fn pick_rate_for_range(min: u32, max: u32, target_rate: Option<u32>) -> u32 {
    match target_rate {
        Some(target) => target.clamp(min, max.max(min)),
        None => max,
    }
}

fn sample_format_rank(format: cpal::SampleFormat) -> u8 {
    match format {
        cpal::SampleFormat::F32 => 0,
        cpal::SampleFormat::I32 => 1,
        cpal::SampleFormat::I16 => 2,
        cpal::SampleFormat::U16 => 3,
        _ => 10,
    }
}

fn matches_device_name(name: &str, needle: &str) -> bool {
    let needle = needle.trim();
    !needle.is_empty() && name.to_lowercase().contains(&needle.to_lowercase())
}
