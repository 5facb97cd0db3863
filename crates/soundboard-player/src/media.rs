//! Native [`MediaElement`] implementation.
//!
//! Handles live on the host's main thread. Audio threads never touch them directly:
//! they post [`Notice`]s on a channel that [`NativeBackend::dispatch`] drains, so every
//! listener runs on the same thread as the rest of the soundboard.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, unbounded};
use soundboard::event::{OneShot, Subscription};
use soundboard::media::{MediaBackend, MediaElement};

use crate::config::PlaybackConfig;
use crate::decode::{self, SourceInfo};
use crate::device;
use crate::output::{OutputOptions, build_output_stream};
use crate::queue::SampleQueue;
use crate::resample::start_resampler;

/// Notification posted from audio threads (or `open`) for the main loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Notice {
    Metadata { id: u64 },
    Ended { id: u64, generation: u64 },
}

/// State every handle shares with the backend that opened it.
struct Output {
    device: cpal::Device,
    config: PlaybackConfig,
    notices: Sender<Notice>,
}

/// Opens sounds on one output device and delivers their notifications.
pub struct NativeBackend {
    output: Rc<Output>,
    notices: Receiver<Notice>,
    handles: RefCell<HashMap<u64, Weak<NativeMedia>>>,
    next_id: Cell<u64>,
}

impl NativeBackend {
    /// Use the output device whose name contains `device_needle`, or the default one.
    pub fn new(device_needle: Option<&str>, config: PlaybackConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = device::pick_device(&host, device_needle)?;
        match device.description() {
            Ok(desc) => tracing::info!(device = %desc, "output device selected"),
            Err(e) => tracing::warn!("output device has no description: {e}"),
        }
        let (tx, rx) = unbounded();
        Ok(Self {
            output: Rc::new(Output {
                device,
                config,
                notices: tx,
            }),
            notices: rx,
            handles: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        })
    }

    /// Output device names on the default host.
    pub fn list_devices() -> Result<Vec<String>> {
        device::device_names(&cpal::default_host())
    }

    /// Deliver queued notifications. Call from the main loop; returns how many were
    /// delivered to a live handle.
    pub fn dispatch(&self) -> usize {
        let mut delivered = 0;
        while let Ok(notice) = self.notices.try_recv() {
            let id = match notice {
                Notice::Metadata { id } | Notice::Ended { id, .. } => id,
            };
            let handle = self.handles.borrow().get(&id).and_then(Weak::upgrade);
            let Some(media) = handle else {
                self.handles.borrow_mut().remove(&id);
                continue;
            };
            let handled = match notice {
                Notice::Metadata { .. } => media.deliver_metadata(),
                Notice::Ended { generation, .. } => media.deliver_ended(generation),
            };
            if handled {
                delivered += 1;
            }
        }
        self.handles
            .borrow_mut()
            .retain(|_, handle| handle.strong_count() > 0);
        delivered
    }
}

impl MediaBackend for NativeBackend {
    fn open(&self, source: &str) -> Rc<dyn MediaElement> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let path = PathBuf::from(source);
        let info = match decode::probe(&path) {
            Ok(info) => {
                tracing::debug!(
                    source,
                    rate = info.sample_rate,
                    channels = info.channels,
                    duration = ?info.duration_secs,
                    codec = ?info.codec,
                    "probed"
                );
                // Deferred like a browser's loadedmetadata, so listeners attached
                // right after open still see it.
                let _ = self.output.notices.send(Notice::Metadata { id });
                Some(info)
            }
            Err(e) => {
                tracing::warn!(source, "cannot load sound: {e:#}");
                None
            }
        };

        let media = Rc::new(NativeMedia {
            id,
            path,
            info,
            output: self.output.clone(),
            paused: Cell::new(true),
            base_secs: Cell::new(0.0),
            generation: Cell::new(0),
            pipeline: RefCell::new(None),
            metadata: Rc::default(),
            ended: Rc::default(),
        });
        self.handles
            .borrow_mut()
            .insert(id, Rc::downgrade(&media));
        media
    }
}

/// A sound file played through its own decode/resample/output pipeline.
///
/// The pipeline is rebuilt on every start and seek and torn down when the handle
/// pauses at the end or is dropped.
pub struct NativeMedia {
    id: u64,
    path: PathBuf,
    info: Option<SourceInfo>,
    output: Rc<Output>,
    paused: Cell<bool>,
    /// Position while no pipeline is running.
    base_secs: Cell<f64>,
    /// Bumped whenever a pipeline is discarded; stale ended notices carry an old value.
    generation: Cell<u64>,
    pipeline: RefCell<Option<Pipeline>>,
    metadata: Rc<Listeners<f64>>,
    ended: Rc<Listeners<()>>,
}

impl NativeMedia {
    fn known_duration(&self) -> Option<f64> {
        self.info
            .as_ref()
            .and_then(|i| i.duration_secs)
            .filter(|d| d.is_finite())
    }

    fn start_pipeline(&self, from_secs: f64) -> Result<Pipeline> {
        let mut queues = Vec::new();
        let started = self.build_pipeline(from_secs, &mut queues);
        if started.is_err() {
            // Unblock stage threads that were already spawned.
            for q in &queues {
                q.close();
            }
        }
        started
    }

    fn build_pipeline(
        &self,
        from_secs: f64,
        queues: &mut Vec<Arc<SampleQueue>>,
    ) -> Result<Pipeline> {
        let cfg = &self.output.config;
        let (spec, decoded) = decode::start_decode(&self.path, from_secs, cfg.buffer_seconds)?;
        queues.push(decoded.clone());

        let supported = device::pick_output_config(&self.output.device, Some(spec.rate))?;
        let mut stream_config: cpal::StreamConfig = supported.clone().into();
        if let Some(size) = device::pick_buffer_size(&supported) {
            stream_config.buffer_size = size;
        }
        let out_rate = stream_config.sample_rate;

        let playable = if spec.rate != out_rate {
            let resampled = start_resampler(
                decoded,
                spec.rate,
                out_rate,
                cfg.chunk_frames,
                cfg.buffer_seconds,
            )?;
            queues.push(resampled.clone());
            resampled
        } else {
            decoded
        };

        let paused = Arc::new(AtomicBool::new(false));
        let played_frames = Arc::new(AtomicU64::new(0));
        let stream = build_output_stream(
            &self.output.device,
            &stream_config,
            supported.sample_format(),
            playable.clone(),
            OutputOptions {
                refill_max_frames: cfg.refill_max_frames,
                paused: paused.clone(),
                played_frames: played_frames.clone(),
            },
        )?;
        stream.play().context("start output stream")?;

        let cancel = Arc::new(AtomicBool::new(false));
        spawn_end_watcher(
            playable,
            cancel.clone(),
            self.output.notices.clone(),
            self.id,
            self.generation.get(),
        );

        tracing::debug!(
            path = ?self.path,
            from_secs,
            src_rate = spec.rate,
            out_rate,
            "pipeline started"
        );
        Ok(Pipeline {
            _stream: stream,
            queues: std::mem::take(queues),
            paused,
            played_frames,
            cancel,
            out_rate,
            start_secs: from_secs,
        })
    }

    /// Drop the running pipeline, keeping the position it reached.
    fn discard_pipeline(&self) {
        let old = self.pipeline.borrow_mut().take();
        if let Some(old) = old {
            self.base_secs.set(self.clamp(old.position()));
            self.generation.set(self.generation.get() + 1);
        }
    }

    fn clamp(&self, secs: f64) -> f64 {
        clamp_position(secs, self.known_duration())
    }

    fn deliver_metadata(&self) -> bool {
        self.metadata.fire_all(self.duration()) > 0
    }

    fn deliver_ended(&self, generation: u64) -> bool {
        if generation != self.generation.get() {
            return false;
        }
        self.discard_pipeline();
        self.paused.set(true);
        if let Some(d) = self.known_duration() {
            self.base_secs.set(d);
        }
        tracing::debug!(path = ?self.path, "ended");
        self.ended.fire_all(()) > 0
    }
}

impl MediaElement for NativeMedia {
    fn duration(&self) -> f64 {
        self.known_duration().unwrap_or(f64::NAN)
    }

    fn current_time(&self) -> f64 {
        match self.pipeline.borrow().as_ref() {
            Some(p) => self.clamp(p.position()),
            None => self.base_secs.get(),
        }
    }

    fn set_current_time(&self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        let target = self.clamp(seconds);
        self.discard_pipeline();
        self.base_secs.set(target);
        if !self.paused.get() {
            match self.start_pipeline(target) {
                Ok(p) => *self.pipeline.borrow_mut() = Some(p),
                Err(e) => {
                    tracing::warn!(path = ?self.path, "restart after seek failed: {e:#}");
                    self.paused.set(true);
                }
            }
        }
    }

    fn paused(&self) -> bool {
        self.paused.get()
    }

    fn play(&self) {
        if self.info.is_none() {
            tracing::warn!(path = ?self.path, "play ignored, sound did not load");
            return;
        }
        let running = self.pipeline.borrow().is_some();
        if !running {
            match self.start_pipeline(self.base_secs.get()) {
                Ok(p) => *self.pipeline.borrow_mut() = Some(p),
                Err(e) => {
                    tracing::warn!(path = ?self.path, "playback failed: {e:#}");
                    return;
                }
            }
        }
        if let Some(p) = self.pipeline.borrow().as_ref() {
            p.paused.store(false, Ordering::Relaxed);
        }
        self.paused.set(false);
    }

    fn pause(&self) {
        if let Some(p) = self.pipeline.borrow().as_ref() {
            p.paused.store(true, Ordering::Relaxed);
        }
        self.paused.set(true);
    }

    fn on_loaded_metadata(&self, listener: OneShot<f64>) -> Subscription {
        self.metadata.add(listener)
    }

    fn on_ended(&self, listener: OneShot) -> Subscription {
        self.ended.add(listener)
    }
}

impl Drop for NativeMedia {
    fn drop(&mut self) {
        self.pipeline.get_mut().take();
    }
}

/// One run of decode, optional resample and output, started at `start_secs`.
struct Pipeline {
    _stream: cpal::Stream,
    queues: Vec<Arc<SampleQueue>>,
    paused: Arc<AtomicBool>,
    played_frames: Arc<AtomicU64>,
    cancel: Arc<AtomicBool>,
    out_rate: u32,
    start_secs: f64,
}

impl Pipeline {
    fn position(&self) -> f64 {
        position_after(
            self.start_secs,
            self.played_frames.load(Ordering::Relaxed),
            self.out_rate,
        )
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        for q in &self.queues {
            q.close();
        }
    }
}

fn spawn_end_watcher(
    queue: Arc<SampleQueue>,
    cancel: Arc<AtomicBool>,
    notices: Sender<Notice>,
    id: u64,
    generation: u64,
) {
    thread::spawn(move || {
        if queue.wait_drained_or_cancel(&cancel) {
            let _ = notices.send(Notice::Ended { id, generation });
        }
    });
}

fn position_after(start_secs: f64, played_frames: u64, rate: u32) -> f64 {
    start_secs + played_frames as f64 / rate.max(1) as f64
}

fn clamp_position(secs: f64, duration: Option<f64>) -> f64 {
    let secs = secs.max(0.0);
    match duration {
        Some(d) => secs.min(d),
        None => secs,
    }
}

/// One-shot listeners attached to a handle.
struct Listeners<T> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, OneShot<T>)>>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            next_id: Cell::new(0),
            entries: RefCell::new(Vec::new()),
        }
    }
}

impl<T: Clone + 'static> Listeners<T> {
    fn add(self: &Rc<Self>, shot: OneShot<T>) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push((id, shot));
        let weak = Rc::downgrade(self);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                listeners.entries.borrow_mut().retain(|(i, _)| *i != id);
            }
        })
    }

    /// Fire every registered listener, returning how many ran.
    fn fire_all(&self, value: T) -> usize {
        // Snapshot first: a listener may detach others while running.
        let shots: Vec<OneShot<T>> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, shot)| shot.clone())
            .collect();
        shots
            .iter()
            .filter(|shot| shot.fire(value.clone()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting<T: 'static>(hits: &Rc<Cell<u32>>) -> OneShot<T> {
        let hits = hits.clone();
        OneShot::new(move |_| hits.set(hits.get() + 1))
    }

    #[test]
    fn clamp_position_bounds_to_duration() {
        assert_eq!(clamp_position(-3.0, Some(10.0)), 0.0);
        assert_eq!(clamp_position(4.5, Some(10.0)), 4.5);
        assert_eq!(clamp_position(12.0, Some(10.0)), 10.0);
        assert_eq!(clamp_position(12.0, None), 12.0);
    }

    #[test]
    fn listeners_fire_once_each() {
        let listeners: Rc<Listeners<f64>> = Rc::default();
        let hits = Rc::new(Cell::new(0));
        let _a = listeners.add(counting(&hits));
        let _b = listeners.add(counting(&hits));

        assert_eq!(listeners.fire_all(3.0), 2);
        assert_eq!(listeners.fire_all(3.0), 0);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn detached_listener_is_skipped() {
        let listeners: Rc<Listeners<()>> = Rc::default();
        let hits = Rc::new(Cell::new(0));
        let sub = listeners.add(counting(&hits));
        let _kept = listeners.add(counting(&hits));
        sub.cancel();

        assert_eq!(listeners.fire_all(()), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn listener_may_detach_another_while_firing() {
        let listeners: Rc<Listeners<()>> = Rc::default();
        let hits = Rc::new(Cell::new(0));
        let second: Rc<RefCell<Option<Subscription>>> = Rc::default();
        let _first = {
            let second = second.clone();
            listeners.add(OneShot::new(move |()| {
                second.borrow_mut().take();
            }))
        };
        *second.borrow_mut() = Some(listeners.add(counting(&hits)));

        // The snapshot still holds the second shot, and it stays armed.
        assert_eq!(listeners.fire_all(()), 2);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn position_advances_with_played_frames() {
        assert_eq!(position_after(1.5, 48_000, 48_000), 2.5);
        assert_eq!(position_after(0.0, 22_050, 44_100), 0.5);
        assert_eq!(position_after(2.0, 0, 0), 2.0);
    }
}
