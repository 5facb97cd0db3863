//! Bounded queue of interleaved `f32` samples between pipeline stages.
//!
//! - decode thread → queue
//! - resampler thread → queue
//! - CPAL callback drains the queue without blocking
//!
//! `close()` is the only shutdown signal: producers stop pushing, blocking consumers
//! return once the queue is drained.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Thread-safe bounded FIFO of interleaved samples with a fixed channel count.
///
/// The `done` flag lives under the same mutex as the samples so a consumer can never
/// miss a close that races with the last push.
pub struct SampleQueue {
    channels: usize,
    capacity: usize,
    state: Mutex<State>,
    changed: Condvar,
}

struct State {
    samples: VecDeque<f32>,
    done: bool,
}

/// How [`SampleQueue::pop`] waits for data.
#[derive(Clone, Copy, Debug)]
pub enum PopStrategy {
    /// Wait for exactly `frames`; `None` if the queue closes first.
    BlockingExact { frames: usize },
    /// Wait for at least one frame, then take up to `max_frames`.
    BlockingUpTo { max_frames: usize },
    /// Take up to `max_frames` of what is already queued.
    NonBlocking { max_frames: usize },
}

/// Capacity in samples for `seconds` of audio, falling back to two seconds for
/// non-finite or non-positive input.
pub fn capacity_for(rate_hz: u32, channels: usize, seconds: f32) -> usize {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        2.0
    };
    let frames = (rate_hz as f32 * seconds).ceil() as usize;
    frames.saturating_mul(channels)
}

impl SampleQueue {
    /// `capacity` is in samples, not frames.
    pub fn new(channels: usize, capacity: usize) -> Self {
        let channels = channels.max(1);
        Self {
            channels,
            capacity: capacity.max(channels),
            state: Mutex::new(State {
                samples: VecDeque::new(),
                done: false,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn max_frames(&self) -> usize {
        self.capacity / self.channels
    }

    pub fn len_frames(&self) -> usize {
        self.lock().samples.len() / self.channels
    }

    pub fn is_done(&self) -> bool {
        self.lock().done
    }

    /// Mark the stream finished and wake every waiter. Idempotent.
    pub fn close(&self) {
        self.lock().done = true;
        self.changed.notify_all();
    }

    /// Push samples, waiting for room when full. Returns early (dropping the rest)
    /// once the queue is closed.
    pub fn push_blocking(&self, samples: &[f32]) {
        let mut offset = 0;
        while offset < samples.len() {
            let mut state = self.lock();
            while state.samples.len() >= self.capacity && !state.done {
                state = self.wait(state);
            }
            if state.done {
                return;
            }
            let room = self.capacity - state.samples.len();
            let take = room.min(samples.len() - offset);
            state.samples.extend(&samples[offset..offset + take]);
            offset += take;
            drop(state);
            self.changed.notify_all();
        }
    }

    /// Pop whole frames according to `strategy`.
    pub fn pop(&self, strategy: PopStrategy) -> Option<Vec<f32>> {
        let mut state = self.lock();
        let frames = match strategy {
            PopStrategy::BlockingExact { frames } => {
                let want = frames * self.channels;
                while state.samples.len() < want && !state.done {
                    state = self.wait(state);
                }
                if state.samples.len() < want {
                    return None;
                }
                frames
            }
            PopStrategy::BlockingUpTo { max_frames } => {
                while state.samples.len() < self.channels && !state.done {
                    state = self.wait(state);
                }
                (state.samples.len() / self.channels).min(max_frames)
            }
            PopStrategy::NonBlocking { max_frames } => {
                (state.samples.len() / self.channels).min(max_frames)
            }
        };
        if frames == 0 {
            return None;
        }
        let out: Vec<f32> = state.samples.drain(..frames * self.channels).collect();
        drop(state);
        self.changed.notify_all();
        Some(out)
    }

    /// Block until the queue is closed and drained, or `cancel` is set.
    ///
    /// Returns `true` when the stream ran out normally.
    pub fn wait_drained_or_cancel(&self, cancel: &AtomicBool) -> bool {
        let mut state = self.lock();
        loop {
            if cancel.load(Ordering::Relaxed) {
                return false;
            }
            if state.done && state.samples.is_empty() {
                return true;
            }
            let (next, _timeout) = self
                .changed
                .wait_timeout(state, Duration::from_millis(50))
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = next;
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.changed
            .wait(guard)
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn capacity_for_falls_back_on_bad_seconds() {
        assert_eq!(capacity_for(48_000, 2, 2.0), 192_000);
        assert_eq!(capacity_for(48_000, 2, -1.0), 192_000);
        assert_eq!(capacity_for(48_000, 2, f32::NAN), 192_000);
        assert_eq!(capacity_for(44_100, 1, 0.5), 22_050);
    }

    #[test]
    fn non_blocking_pop_on_empty_queue_is_none() {
        let q = SampleQueue::new(2, 16);
        assert!(q.pop(PopStrategy::NonBlocking { max_frames: 4 }).is_none());
    }

    #[test]
    fn non_blocking_pop_takes_whole_frames_in_order() {
        let q = SampleQueue::new(2, 64);
        q.push_blocking(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let out = q.pop(PopStrategy::NonBlocking { max_frames: 2 }).unwrap();
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(q.len_frames(), 1);
    }

    #[test]
    fn blocking_exact_waits_for_enough_frames() {
        let q = Arc::new(SampleQueue::new(2, 64));
        let consumer = {
            let q = q.clone();
            thread::spawn(move || q.pop(PopStrategy::BlockingExact { frames: 3 }))
        };

        q.push_blocking(&[0.1, 0.2, 0.3, 0.4]);
        q.push_blocking(&[0.5, 0.6]);

        let out = consumer.join().unwrap().unwrap();
        assert_eq!(out.len(), 6);
    }

    #[test]
    fn blocking_exact_returns_none_when_closed_short() {
        let q = SampleQueue::new(2, 64);
        q.push_blocking(&[1.0, 2.0]);
        q.close();
        assert!(q.pop(PopStrategy::BlockingExact { frames: 2 }).is_none());
    }

    #[test]
    fn blocking_up_to_drains_tail_then_reports_close() {
        let q = SampleQueue::new(2, 64);
        q.push_blocking(&[1.0, 2.0, 3.0, 4.0]);
        q.close();

        let out = q.pop(PopStrategy::BlockingUpTo { max_frames: 8 }).unwrap();
        assert_eq!(out.len(), 4);
        assert!(q.pop(PopStrategy::BlockingUpTo { max_frames: 8 }).is_none());
    }

    #[test]
    fn push_blocks_until_consumer_makes_room() {
        let q = Arc::new(SampleQueue::new(1, 4));
        let producer = {
            let q = q.clone();
            thread::spawn(move || q.push_blocking(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
        };

        let mut got = Vec::new();
        while got.len() < 6 {
            if let Some(chunk) = q.pop(PopStrategy::BlockingUpTo { max_frames: 2 }) {
                got.extend(chunk);
            }
        }
        producer.join().unwrap();
        assert_eq!(got, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn close_releases_blocked_producer() {
        let q = Arc::new(SampleQueue::new(1, 2));
        let producer = {
            let q = q.clone();
            thread::spawn(move || q.push_blocking(&[1.0, 2.0, 3.0, 4.0]))
        };
        thread::sleep(Duration::from_millis(20));
        q.close();
        producer.join().unwrap();
        assert!(q.is_done());
    }

    #[test]
    fn wait_drained_reports_normal_end_and_cancel() {
        let q = SampleQueue::new(2, 64);
        let cancel = AtomicBool::new(false);
        q.close();
        assert!(q.wait_drained_or_cancel(&cancel));

        let q = SampleQueue::new(2, 64);
        q.push_blocking(&[1.0, 2.0]);
        cancel.store(true, Ordering::Relaxed);
        assert!(!q.wait_drained_or_cancel(&cancel));
    }
}
