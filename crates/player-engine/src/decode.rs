//! File decode stage.
//!
//! Probes the file with Symphonia, optionally seeks, and decodes packets into
//! interleaved `f32` on a background thread that feeds a [`SampleQueue`].

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, anyhow};
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CodecParameters, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;

use crate::queue::{SampleQueue, capacity_for};

/// What probing learned about a source file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceInfo {
    /// Codec label (best-effort), e.g. `MP3` or `PCM_S16`.
    pub codec: Option<String>,
    /// Bits per sample when the container reports it.
    pub bit_depth: Option<u16>,
    /// Container label derived from the file extension.
    pub container: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Total duration when the container reports a frame count.
    pub duration_ms: Option<u64>,
}

/// A running decode thread.
pub struct DecodeStream {
    pub spec: SignalSpec,
    pub info: SourceInfo,
    pub queue: Arc<SampleQueue>,
}

/// Open `path` and start decoding from `start_ms` into a bounded queue.
///
/// The queue is closed on end of file, on decoder error, or by the caller to abandon
/// the stream early.
pub fn start_file_decode(path: &Path, start_ms: u64, buffer_seconds: f32) -> Result<DecodeStream> {
    let file = File::open(path).with_context(|| format!("open {:?}", path))?;

    let mut hint = Hint::new();
    let container = path.extension().and_then(|e| e.to_str()).map(|ext| {
        hint.with_extension(ext);
        ext.to_ascii_uppercase()
    });

    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("probe {:?}", path))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| anyhow!("No default audio track"))?;
    let codec_params = track.codec_params.clone();
    let layout = codec_params
        .channels
        .ok_or_else(|| anyhow!("Unknown channels"))?;
    let rate = codec_params
        .sample_rate
        .ok_or_else(|| anyhow!("Unknown sample rate"))?;
    let spec = SignalSpec::new(rate, layout);
    let channels = layout.count();

    if start_ms > 0 {
        if let Err(e) = format.seek(
            SeekMode::Accurate,
            SeekTo::Time {
                time: time_from_ms(start_ms),
                track_id: None,
            },
        ) {
            tracing::warn!(start_ms, "seek failed, decoding from start: {e}");
        }
    }

    let info = SourceInfo {
        codec: codec_name_from_params(&codec_params),
        bit_depth: codec_params
            .bits_per_sample
            .or(codec_params.bits_per_coded_sample)
            .and_then(|v| u16::try_from(v).ok()),
        container,
        sample_rate: rate,
        channels: u16::try_from(channels).unwrap_or(u16::MAX),
        duration_ms: duration_ms_from_codec_params(&codec_params),
    };

    let queue = Arc::new(SampleQueue::new(
        channels,
        capacity_for(rate, channels, buffer_seconds),
    ));
    let thread_queue = queue.clone();
    let thread_path: PathBuf = path.to_path_buf();
    thread::Builder::new()
        .name("decode".into())
        .spawn(move || {
            if let Err(e) = decode_loop(format, &codec_params, &thread_queue) {
                tracing::error!(path = ?thread_path, "decoder thread error: {e:#}");
            }
            thread_queue.close();
        })
        .context("spawn decode thread")?;

    Ok(DecodeStream { spec, info, queue })
}

/// Pull packets until end of file or until the consumer closes the queue.
fn decode_loop(
    mut format: Box<dyn FormatReader>,
    codec_params: &CodecParameters,
    queue: &SampleQueue,
) -> Result<()> {
    let mut decoder = symphonia::default::get_codecs()
        .make(codec_params, &DecoderOptions::default())
        .context("create decoder")?;

    while !queue.is_closed() {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(e) if is_end_of_stream(&e) => break,
            Err(e) => return Err(e).context("read packet"),
        };

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                tracing::debug!("skipping undecodable packet: {e}");
                continue;
            }
        };

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, *decoded.spec());
        sample_buf.copy_interleaved_ref(decoded);
        queue.push_blocking(sample_buf.samples());
    }

    Ok(())
}

/// Symphonia reports a clean end of file as an `UnexpectedEof` I/O error.
fn is_end_of_stream(err: &SymphoniaError) -> bool {
    matches!(err, SymphoniaError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
}

fn time_from_ms(ms: u64) -> Time {
    Time::new(ms / 1000, (ms % 1000) as f64 / 1000.0)
}

/// Duration from the container frame count, when present.
fn duration_ms_from_codec_params(codec_params: &CodecParameters) -> Option<u64> {
    let frames = codec_params.n_frames?;
    let rate = codec_params.sample_rate? as u64;
    if rate == 0 {
        return None;
    }
    Some(frames.saturating_mul(1000) / rate)
}

fn codec_name_from_params(params: &CodecParameters) -> Option<String> {
    use symphonia::core::codecs::*;
    let name = match params.codec {
        CODEC_TYPE_MP3 => "MP3",
        CODEC_TYPE_PCM_S8 | CODEC_TYPE_PCM_U8 => "PCM_8",
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => "PCM_S16",
        CODEC_TYPE_PCM_S24LE | CODEC_TYPE_PCM_S24BE => "PCM_S24",
        CODEC_TYPE_PCM_S32LE | CODEC_TYPE_PCM_S32BE => "PCM_S32",
        CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F32BE => "PCM_F32",
        CODEC_TYPE_PCM_F64LE | CODEC_TYPE_PCM_F64BE => "PCM_F64",
        _ => return None,
    };
    Some(name.to_string())
}
