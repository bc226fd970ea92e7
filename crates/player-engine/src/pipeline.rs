//! Source pipeline wiring: decode, plus a resample stage when the rates differ.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::config::PlaybackConfig;
use crate::decode::{self, SourceInfo};
use crate::queue::SampleQueue;
use crate::resample::{self, ResampleConfig};

/// Running stages for one installed source, in pipeline order.
///
/// Dropping the pipeline closes every stage queue, which stops its threads.
pub(crate) struct SourcePipeline {
    pub(crate) info: SourceInfo,
    stages: Vec<Arc<SampleQueue>>,
}

impl SourcePipeline {
    /// Decode `path` from `start_ms` and deliver samples at `output_rate`.
    pub(crate) fn open(
        path: &Path,
        start_ms: u64,
        output_rate: u32,
        playback: &PlaybackConfig,
    ) -> Result<Self> {
        let decoded = decode::start_file_decode(path, start_ms, playback.buffer_seconds)?;
        let mut stages = vec![decoded.queue.clone()];

        if decoded.spec.rate != output_rate {
            let resampled = resample::spawn_resampler(
                decoded.queue.clone(),
                decoded.spec.rate,
                output_rate,
                ResampleConfig {
                    chunk_frames: playback.chunk_frames,
                    buffer_seconds: playback.buffer_seconds,
                },
            );
            match resampled {
                Ok(q) => stages.push(q),
                Err(e) => {
                    decoded.queue.close();
                    return Err(e);
                }
            }
            tracing::debug!(from_hz = decoded.spec.rate, to_hz = output_rate, "resampling");
        } else {
            tracing::debug!(rate_hz = output_rate, "resample skipped");
        }
        tracing::debug!(
            decode_frames = decoded.queue.capacity_frames(),
            "decode buffer"
        );

        Ok(Self {
            info: decoded.info,
            stages,
        })
    }

    /// Queue the output callback reads from.
    pub(crate) fn output(&self) -> Arc<SampleQueue> {
        self.stages[self.stages.len() - 1].clone()
    }

    pub(crate) fn close(&self) {
        for q in &self.stages {
            q.close();
        }
    }
}

impl Drop for SourcePipeline {
    fn drop(&mut self) {
        self.close();
    }
}
