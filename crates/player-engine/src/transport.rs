//! Audio transport.
//!
//! Owns the device output stream for the lifetime of the player and the currently
//! installed source. The UI thread drives it with start/stop/rewind; the output
//! callback reports back through [`TransportEvent`]s on a bounded channel:
//! - `start()` posts `playing: true` when it actually starts, `playing: false` when
//!   there is no source
//! - `stop()` always posts `playing: false`, even when already halted
//! - reaching the end of the source posts `playing: false` from the callback
//! - installing a new source halts silently

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use crate::config::PlaybackConfig;
use crate::decode::SourceInfo;
use crate::device::{self, ChannelLayout};
use crate::output;
use crate::pipeline::SourcePipeline;
use crate::queue::SampleQueue;
use crate::state::TransportControl;
use crate::status::{OutputInfo, TransportStatus, frames_to_ms, seconds_to_frames};

/// Pending notifications before the callback starts dropping them.
const EVENT_CAPACITY: usize = 64;

/// Notification from the engine to its single consumer (the UI thread).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    StatusChanged { playing: bool },
}

/// State shared between the transport and the output callback.
pub(crate) struct TransportShared {
    playing: AtomicBool,
    /// Bumped whenever the callback's queue is replaced.
    generation: AtomicU64,
    queue: Mutex<Option<Arc<SampleQueue>>>,
    /// Play head in output frames.
    played_frames: AtomicU64,
    underrun_events: AtomicU64,
    events: Sender<TransportEvent>,
}

impl TransportShared {
    pub(crate) fn new(events: Sender<TransportEvent>) -> Self {
        Self {
            playing: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            queue: Mutex::new(None),
            played_frames: AtomicU64::new(0),
            underrun_events: AtomicU64::new(0),
            events,
        }
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn current_queue(&self) -> Option<Arc<SampleQueue>> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Point the callback at `queue` with the play head at `position_frames`.
    pub(crate) fn replace_queue(&self, queue: Option<Arc<SampleQueue>>, position_frames: u64) {
        let mut slot = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = queue;
        self.played_frames.store(position_frames, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Set the playing flag; posts a notification and returns `true` if it changed.
    pub(crate) fn set_playing(&self, playing: bool) -> bool {
        if self.playing.swap(playing, Ordering::AcqRel) == playing {
            return false;
        }
        self.notify(playing);
        true
    }

    /// Clear the playing flag without telling anyone.
    pub(crate) fn halt(&self) {
        self.playing.store(false, Ordering::Release);
    }

    /// End of stream reached by the callback.
    pub(crate) fn finish(&self) {
        self.set_playing(false);
    }

    /// Post a status notification without blocking.
    pub(crate) fn notify(&self, playing: bool) {
        // A full channel means the consumer is behind; the next change resyncs it.
        let _ = self.events.try_send(TransportEvent::StatusChanged { playing });
    }

    pub(crate) fn played_frames(&self) -> u64 {
        self.played_frames.load(Ordering::Acquire)
    }

    pub(crate) fn add_played(&self, frames: u64) {
        if frames > 0 {
            self.played_frames.fetch_add(frames, Ordering::AcqRel);
        }
    }

    pub(crate) fn note_underrun(&self) {
        self.underrun_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn underrun_events(&self) -> u64 {
        self.underrun_events.load(Ordering::Relaxed)
    }
}

struct InstalledSource {
    path: PathBuf,
    pipeline: SourcePipeline,
}

/// CPAL-backed transport playing one file at a time.
pub struct AudioTransport {
    shared: Arc<TransportShared>,
    output: OutputInfo,
    playback: PlaybackConfig,
    source: Option<InstalledSource>,
    // Dropped last: keeps the device callback alive. `None` when no device is attached.
    _stream: Option<cpal::Stream>,
}

impl AudioTransport {
    /// Open an output stream on `device` and return the transport with its event receiver.
    ///
    /// The stream runs (emitting silence) until a source is installed and started.
    pub fn open(
        device: &cpal::Device,
        layout: ChannelLayout,
        playback: PlaybackConfig,
    ) -> Result<(Self, Receiver<TransportEvent>)> {
        let default_rate = device.default_output_config().ok().map(|c| c.sample_rate());
        let config = device::pick_output_config(device, default_rate, layout.outputs)?;
        let mut stream_config: cpal::StreamConfig = config.clone().into();
        if let Some(buf) = device::pick_buffer_size(&config) {
            stream_config.buffer_size = buf;
        }

        let (evt_tx, evt_rx) = crossbeam_channel::bounded(EVENT_CAPACITY);
        let shared = Arc::new(TransportShared::new(evt_tx));
        let stream = output::build_output_stream(
            device,
            &stream_config,
            config.sample_format(),
            shared.clone(),
            playback.refill_max_frames,
        )?;
        stream.play().context("start output stream")?;

        let output = OutputInfo {
            device: device
                .description()
                .map(|d| d.to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            sample_rate: stream_config.sample_rate,
            channels: stream_config.channels,
            sample_format: config.sample_format().to_string(),
            buffer_size_frames: match stream_config.buffer_size {
                cpal::BufferSize::Fixed(frames) => Some(frames),
                cpal::BufferSize::Default => None,
            },
        };
        tracing::info!(
            device = %output.device,
            rate_hz = output.sample_rate,
            channels = output.channels,
            inputs = layout.inputs,
            format = %output.sample_format,
            buffer = ?stream_config.buffer_size,
            "output stream open"
        );

        Ok((
            Self::from_parts(shared, output, playback, Some(stream)),
            evt_rx,
        ))
    }

    /// Assemble a transport around an existing callback state.
    pub(crate) fn from_parts(
        shared: Arc<TransportShared>,
        output: OutputInfo,
        playback: PlaybackConfig,
        stream: Option<cpal::Stream>,
    ) -> Self {
        Self {
            shared,
            output,
            playback,
            source: None,
            _stream: stream,
        }
    }

    /// Install `path` as the source, replacing any previous one.
    ///
    /// On success the transport is halted (without a notification) and the play head is
    /// at 0. On failure the previous source stays installed.
    pub fn set_source(&mut self, path: &Path) -> Result<SourceInfo> {
        let pipeline = SourcePipeline::open(path, 0, self.output.sample_rate, &self.playback)?;
        let info = pipeline.info.clone();
        tracing::debug!(
            path = ?path,
            codec = info.codec.as_deref().unwrap_or("-"),
            container = info.container.as_deref().unwrap_or("-"),
            rate_hz = info.sample_rate,
            channels = info.channels,
            "source format"
        );

        self.shared.halt();
        self.shared.replace_queue(Some(pipeline.output()), 0);
        self.source = Some(InstalledSource {
            path: path.to_path_buf(),
            pipeline,
        });
        Ok(info)
    }

    /// Restart the installed source at `seconds`.
    pub fn seek(&mut self, seconds: f64) {
        let frames = seconds_to_frames(seconds, self.output.sample_rate);
        let Some(source) = self.source.as_mut() else {
            self.shared.replace_queue(None, frames);
            return;
        };
        if frames == 0 && self.shared.played_frames() == 0 {
            return;
        }

        let start_ms = frames_to_ms(frames, self.output.sample_rate);
        match SourcePipeline::open(&source.path, start_ms, self.output.sample_rate, &self.playback)
        {
            Ok(pipeline) => {
                self.shared.replace_queue(Some(pipeline.output()), frames);
                // Old stages close when the previous pipeline drops here.
                source.pipeline = pipeline;
            }
            Err(e) => tracing::warn!(path = ?source.path, start_ms, "reposition failed: {e:#}"),
        }
    }
}

impl TransportControl for AudioTransport {
    fn set_source(&mut self, path: &Path) -> Result<()> {
        AudioTransport::set_source(self, path).map(|_| ())
    }

    fn start(&mut self) {
        if self.source.is_none() {
            tracing::warn!("start requested with no source installed");
            self.shared.notify(false);
            return;
        }
        if self.shared.set_playing(true) {
            tracing::debug!("transport started");
        }
    }

    fn stop(&mut self) {
        if self.shared.set_playing(false) {
            tracing::debug!("transport stopped");
        } else {
            // Already halted (end of stream, or a start that never happened): still
            // report it so a Stopping caller can settle.
            self.shared.notify(false);
        }
    }

    fn set_position(&mut self, seconds: f64) {
        self.seek(seconds);
    }

    fn status(&self) -> TransportStatus {
        TransportStatus {
            path: self.source.as_ref().map(|s| s.path.clone()),
            playing: self.shared.is_playing(),
            position_ms: frames_to_ms(self.shared.played_frames(), self.output.sample_rate),
            source: self.source.as_ref().map(|s| s.pipeline.info.clone()),
            output: self.output.clone(),
            underrun_events: self.shared.underrun_events(),
        }
    }
}

impl Drop for AudioTransport {
    fn drop(&mut self) {
        self.shared.halt();
        self.shared.replace_queue(None, 0);
    }
}
