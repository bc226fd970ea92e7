//! Bounded sample queue between pipeline stages.
//!
//! Decode thread → (optional resampler thread) → output callback. Producers block when
//! the queue is full; the output callback only ever uses the non-blocking pop.
//! `close()` ends the stream: pending pushes return, pops drain what is left.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Bounded queue of interleaved `f32` samples with a fixed channel count.
pub struct SampleQueue {
    channels: usize,
    capacity_samples: usize,
    inner: Mutex<QueueInner>,
    changed: Condvar,
}

struct QueueInner {
    samples: VecDeque<f32>,
    closed: bool,
}

/// How a consumer wants to take frames out of the queue.
pub enum PopStrategy {
    /// Wait for exactly `frames`; `None` if the queue closes first.
    BlockingExact { frames: usize },
    /// Wait for at least one frame, then take up to `max_frames`.
    BlockingUpTo { max_frames: usize },
    /// Take up to `max_frames` that are already queued; `None` when empty.
    NonBlocking { max_frames: usize },
}

/// Queue capacity in samples for `buffer_seconds` of audio.
///
/// Non-finite or non-positive durations fall back to two seconds.
pub fn capacity_for(rate_hz: u32, channels: usize, buffer_seconds: f32) -> usize {
    let secs = if buffer_seconds.is_finite() && buffer_seconds > 0.0 {
        buffer_seconds
    } else {
        2.0
    };
    let frames = (rate_hz as f32 * secs).ceil() as usize;
    frames.saturating_mul(channels)
}

impl SampleQueue {
    pub fn new(channels: usize, capacity_samples: usize) -> Self {
        let channels = channels.max(1);
        Self {
            channels,
            capacity_samples: capacity_samples.max(channels),
            inner: Mutex::new(QueueInner {
                samples: VecDeque::new(),
                closed: false,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Capacity in frames.
    pub fn capacity_frames(&self) -> usize {
        self.capacity_samples / self.channels
    }

    /// Frames currently buffered (snapshot).
    pub fn len_frames(&self) -> usize {
        self.lock().samples.len() / self.channels
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Closed by the producer and nothing left to read.
    pub fn is_drained(&self) -> bool {
        let g = self.lock();
        g.closed && g.samples.len() < self.channels
    }

    /// Mark the stream finished and wake every waiter. Idempotent.
    pub fn close(&self) {
        self.lock().closed = true;
        self.changed.notify_all();
    }

    /// Append samples, waiting for room when full.
    ///
    /// Returns early (dropping the rest) once the queue is closed.
    pub fn push_blocking(&self, samples: &[f32]) {
        let mut offset = 0;
        while offset < samples.len() {
            let mut g = self.lock();
            while g.samples.len() >= self.capacity_samples && !g.closed {
                g = self
                    .changed
                    .wait(g)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if g.closed {
                return;
            }

            let room = self.capacity_samples - g.samples.len();
            let end = (offset + room).min(samples.len());
            g.samples.extend(&samples[offset..end]);
            offset = end;

            drop(g);
            self.changed.notify_all();
        }
    }

    /// Take whole frames according to `strategy`.
    pub fn pop(&self, strategy: PopStrategy) -> Option<Vec<f32>> {
        let mut g = self.lock();
        let take_frames = match strategy {
            PopStrategy::BlockingExact { frames } => {
                let want = frames * self.channels;
                while g.samples.len() < want && !g.closed {
                    g = self
                        .changed
                        .wait(g)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                if g.samples.len() < want {
                    return None;
                }
                frames
            }
            PopStrategy::BlockingUpTo { max_frames } => {
                while g.samples.len() < self.channels && !g.closed {
                    g = self
                        .changed
                        .wait(g)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                (g.samples.len() / self.channels).min(max_frames)
            }
            PopStrategy::NonBlocking { max_frames } => {
                (g.samples.len() / self.channels).min(max_frames)
            }
        };

        if take_frames == 0 {
            return None;
        }
        let out: Vec<f32> = g.samples.drain(..take_frames * self.channels).collect();
        drop(g);
        self.changed.notify_all();
        Some(out)
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn capacity_for_falls_back_on_bad_durations() {
        assert_eq!(capacity_for(48_000, 2, 2.0), 192_000);
        assert_eq!(capacity_for(48_000, 2, 0.0), 192_000);
        assert_eq!(capacity_for(48_000, 2, -1.0), 192_000);
        assert_eq!(capacity_for(48_000, 2, f32::NAN), 192_000);
        assert_eq!(capacity_for(44_100, 1, 0.5), 22_050);
    }

    #[test]
    fn nonblocking_pop_on_empty_queue_is_none() {
        let q = SampleQueue::new(2, 16);
        assert!(q.pop(PopStrategy::NonBlocking { max_frames: 4 }).is_none());
    }

    #[test]
    fn nonblocking_pop_takes_whole_frames() {
        let q = SampleQueue::new(2, 64);
        q.push_blocking(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        let out = q.pop(PopStrategy::NonBlocking { max_frames: 8 }).unwrap();
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(q.len_frames(), 0);
    }

    #[test]
    fn blocking_exact_waits_for_producer() {
        let q = Arc::new(SampleQueue::new(2, 64));
        let consumer = q.clone();
        let handle = thread::spawn(move || {
            consumer
                .pop(PopStrategy::BlockingExact { frames: 3 })
                .map(|v| v.len())
        });

        q.push_blocking(&[0.1, 0.2, 0.3, 0.4]);
        q.push_blocking(&[0.5, 0.6]);

        assert_eq!(handle.join().unwrap(), Some(6));
    }

    #[test]
    fn blocking_up_to_drains_tail_then_reports_close() {
        let q = SampleQueue::new(2, 64);
        q.push_blocking(&[1.0, 2.0, 3.0, 4.0]);
        q.close();

        let tail = q.pop(PopStrategy::BlockingUpTo { max_frames: 8 }).unwrap();
        assert_eq!(tail.len(), 4);
        assert!(q.pop(PopStrategy::BlockingUpTo { max_frames: 8 }).is_none());
        assert!(q.is_drained());
    }

    #[test]
    fn close_releases_blocked_producer() {
        let q = Arc::new(SampleQueue::new(1, 2));
        q.push_blocking(&[1.0, 2.0]);

        let producer = q.clone();
        let handle = thread::spawn(move || producer.push_blocking(&[3.0, 4.0]));
        q.close();
        handle.join().unwrap();

        assert!(q.is_closed());
        assert_eq!(q.len_frames(), 2);
        assert!(!q.is_drained());
    }

    #[test]
    fn capacity_frames_reflects_channel_count() {
        let q = SampleQueue::new(2, 96_000);
        assert_eq!(q.capacity_frames(), 48_000);
        assert_eq!(q.channels(), 2);
    }
}
