//! Sample-rate conversion stage.
//!
//! Sits between the decode queue and the output callback when the file rate differs
//! from the device rate. Runs Rubato's sinc resampler on its own thread.

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, anyhow};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{
    Async, FixedAsync, Indexing, Resampler, SincInterpolationParameters, SincInterpolationType,
    WindowFunction, calculate_cutoff,
};

use crate::queue::{PopStrategy, SampleQueue, capacity_for};

#[derive(Clone, Copy, Debug)]
pub struct ResampleConfig {
    /// Input frames per resampler call.
    pub chunk_frames: usize,
    /// Buffered duration of the output queue.
    pub buffer_seconds: f32,
}

/// Spawn a resampler reading `srcq` at `src_rate` and return its output queue at `dst_rate`.
///
/// The output queue closes once `srcq` is closed and drained, or when the resampler fails.
/// Closing the output queue early makes the thread stop at its next push.
pub fn spawn_resampler(
    srcq: Arc<SampleQueue>,
    src_rate: u32,
    dst_rate: u32,
    cfg: ResampleConfig,
) -> Result<Arc<SampleQueue>> {
    let channels = srcq.channels();
    let dstq = Arc::new(SampleQueue::new(
        channels,
        capacity_for(dst_rate, channels, cfg.buffer_seconds),
    ));
    let chunk_frames = cfg.chunk_frames.max(1);
    let ratio = dst_rate as f64 / src_rate as f64;

    let out = dstq.clone();
    thread::Builder::new()
        .name("resample".into())
        .spawn(move || {
            if let Err(e) = run_resampler(&srcq, &out, ratio, chunk_frames) {
                tracing::error!("resampler error: {e:#}");
            }
            out.close();
        })
        .context("spawn resampler thread")?;

    Ok(dstq)
}

fn run_resampler(
    srcq: &SampleQueue,
    dstq: &SampleQueue,
    ratio: f64,
    chunk_frames: usize,
) -> Result<()> {
    let channels = srcq.channels();
    let window = WindowFunction::BlackmanHarris2;
    let sinc_len = 128;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window,
    };
    let mut resampler = Async::<f32>::new_sinc(
        ratio,
        1.1,
        &params,
        chunk_frames,
        channels,
        FixedAsync::Input,
    )
    .map_err(|e| anyhow!("resampler init: {e}"))?;

    let mut out = vec![0.0f32; resampler.output_frames_max() * channels];

    // Steady state: full chunks only.
    while let Some(input) = srcq.pop(PopStrategy::BlockingExact {
        frames: chunk_frames,
    }) {
        if dstq.is_closed() {
            return Ok(());
        }
        let produced = process_chunk(&mut resampler, &input, &mut out, channels, None)?;
        dstq.push_blocking(&out[..produced * channels]);
    }

    // Source closed: flush what is left as partial chunks.
    while let Some(tail) = srcq.pop(PopStrategy::BlockingUpTo {
        max_frames: chunk_frames,
    }) {
        if dstq.is_closed() {
            return Ok(());
        }
        let tail_frames = tail.len() / channels;
        let produced =
            process_chunk(&mut resampler, &tail, &mut out, channels, Some(tail_frames))?;
        if produced > 0 {
            dstq.push_blocking(&out[..produced * channels]);
        }
    }

    Ok(())
}

/// Run one resampler call and return the number of output frames written to `out`.
fn process_chunk(
    resampler: &mut Async<f32>,
    input: &[f32],
    out: &mut [f32],
    channels: usize,
    partial_len: Option<usize>,
) -> Result<usize> {
    let in_frames = input.len() / channels;
    let input_adapter = InterleavedSlice::new(input, channels, in_frames)
        .map_err(|e| anyhow!("interleaved slice (input): {e}"))?;
    let out_frames = out.len() / channels;
    let mut output_adapter = InterleavedSlice::new_mut(out, channels, out_frames)
        .map_err(|e| anyhow!("interleaved slice (output): {e}"))?;

    let indexing = Indexing {
        input_offset: 0,
        output_offset: 0,
        active_channels_mask: None,
        partial_len,
    };
    let (_consumed, produced) = resampler
        .process_into_buffer(&input_adapter, &mut output_adapter, Some(&indexing))
        .map_err(|e| anyhow!("resampler process: {e}"))?;
    Ok(produced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsampled_stream_closes_after_source() {
        let srcq = Arc::new(SampleQueue::new(2, 4 * 44_100));
        let dstq = spawn_resampler(
            srcq.clone(),
            44_100,
            48_000,
            ResampleConfig {
                chunk_frames: 256,
                buffer_seconds: 2.0,
            },
        )
        .unwrap();

        srcq.push_blocking(&vec![0.25f32; 2 * 4_410]);
        srcq.close();

        let mut frames = 0;
        while let Some(chunk) = dstq.pop(PopStrategy::BlockingUpTo { max_frames: 4096 }) {
            assert_eq!(chunk.len() % 2, 0);
            frames += chunk.len() / 2;
        }
        assert!(dstq.is_drained());
        assert!(frames > 4_000, "expected roughly 4800 frames, got {frames}");
    }

    #[test]
    fn closing_output_stops_the_thread() {
        let srcq = Arc::new(SampleQueue::new(1, 48_000));
        let dstq = spawn_resampler(
            srcq.clone(),
            48_000,
            44_100,
            ResampleConfig {
                chunk_frames: 128,
                buffer_seconds: 0.1,
            },
        )
        .unwrap();

        dstq.close();
        srcq.push_blocking(&vec![0.0f32; 1_024]);
        srcq.close();
        while dstq.pop(PopStrategy::BlockingUpTo { max_frames: 512 }).is_some() {}
        assert!(dstq.is_drained());
    }
}
