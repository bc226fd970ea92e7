//! Output stage (CPAL stream callback).
//!
//! Each callback renders one block:
//! - silence while the transport is stopped (the queue is left untouched)
//! - otherwise a non-blocking refill from the current queue, channel mapping and
//!   conversion from `f32` to the device sample format
//!
//! Running dry on an open queue is an underrun; running dry on a closed queue is the
//! end of the source.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use cpal::traits::DeviceTrait;

use crate::queue::PopStrategy;
use crate::transport::TransportShared;

/// Build the device output stream that renders from `shared`.
pub(crate) fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    shared: Arc<TransportShared>,
    refill_max_frames: usize,
) -> Result<cpal::Stream> {
    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, shared, refill_max_frames),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, shared, refill_max_frames),
        cpal::SampleFormat::I32 => build_stream::<i32>(device, config, shared, refill_max_frames),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, shared, refill_max_frames),
        other => Err(anyhow!("Unsupported sample format: {other:?}")),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: Arc<TransportShared>,
    refill_max_frames: usize,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels_out = (config.channels as usize).max(1);
    let refill_max_frames = refill_max_frames.max(1);
    let mut state = RenderState::default();

    let err_fn = |err| tracing::warn!("stream error: {err}");
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            render_block(&mut state, &shared, data, channels_out, refill_max_frames);
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}

/// Callback-local buffer of interleaved samples taken from the queue.
#[derive(Default)]
pub(crate) struct RenderState {
    generation: u64,
    pos: usize,
    src_channels: usize,
    src: Vec<f32>,
}

impl RenderState {
    fn reset(&mut self, generation: u64) {
        self.generation = generation;
        self.pos = 0;
        self.src.clear();
    }
}

/// Render one interleaved block of `channels_out` channels into `data`.
pub(crate) fn render_block<T>(
    st: &mut RenderState,
    shared: &TransportShared,
    data: &mut [T],
    channels_out: usize,
    refill_max_frames: usize,
) where
    T: cpal::Sample + cpal::FromSample<f32>,
{
    let silence = <T as cpal::Sample>::from_sample::<f32>(0.0);
    if !shared.is_playing() {
        data.fill(silence);
        return;
    }

    let generation = shared.generation();
    if st.generation != generation {
        st.reset(generation);
    }
    let Some(queue) = shared.current_queue() else {
        data.fill(silence);
        shared.finish();
        return;
    };
    st.src_channels = queue.channels();

    let frames = data.len() / channels_out;
    let mut filled = 0usize;
    for frame in 0..frames {
        if st.pos >= st.src.len() {
            st.pos = 0;
            match queue.pop(PopStrategy::NonBlocking {
                max_frames: refill_max_frames,
            }) {
                Some(v) => st.src = v,
                None => {
                    st.src.clear();
                    if queue.is_drained() {
                        shared.finish();
                    } else {
                        shared.note_underrun();
                    }
                    data[frame * channels_out..].fill(silence);
                    break;
                }
            }
        }
        for ch in 0..channels_out {
            let sample = mapped_sample(st, channels_out, ch);
            data[frame * channels_out + ch] = <T as cpal::Sample>::from_sample::<f32>(sample);
        }
        filled += 1;
    }

    shared.add_played(filled as u64);
}

/// Sample for output channel `dst_ch` of the current frame.
///
/// - mono → stereo: duplicate
/// - stereo → mono: average
/// - anything else: same channel, clamped to the last source channel
///
/// Advances to the next source frame after the last output channel.
fn mapped_sample(st: &mut RenderState, dst_channels: usize, dst_ch: usize) -> f32 {
    let src_channels = st.src_channels.max(1);
    let frame = &st.src[st.pos..(st.pos + src_channels).min(st.src.len())];
    let get = |ch: usize| frame.get(ch).copied().unwrap_or(0.0);

    let out = match (src_channels, dst_channels) {
        (2, 1) => 0.5 * (get(0) + get(1)),
        _ => get(dst_ch.min(src_channels - 1)),
    };

    if dst_ch + 1 == dst_channels {
        st.pos += src_channels;
    }
    out
}
