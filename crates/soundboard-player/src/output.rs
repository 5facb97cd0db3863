//! CPAL output stage.
//!
//! The real-time callback never blocks: it refills a local buffer from the queue with a
//! non-blocking pop, maps channels, converts to the device format, and fills underruns
//! with silence.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::{Result, anyhow};
use cpal::traits::DeviceTrait;

use crate::queue::{PopStrategy, SampleQueue};

/// Shared handles the callback reads and updates.
#[derive(Clone, Debug)]
pub struct OutputOptions {
    /// Max frames pulled per refill.
    pub refill_max_frames: usize,
    /// While set the callback outputs silence without draining the queue.
    pub paused: Arc<AtomicBool>,
    /// Incremented by the number of source frames actually played.
    pub played_frames: Arc<AtomicU64>,
}

/// Build a stream that plays interleaved `f32` audio from `queue`, already at the
/// device rate.
pub fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    queue: Arc<SampleQueue>,
    opts: OutputOptions,
) -> Result<cpal::Stream> {
    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, queue, opts),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, queue, opts),
        cpal::SampleFormat::I32 => build_stream::<i32>(device, config, queue, opts),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, queue, opts),
        other => Err(anyhow!("unsupported sample format {other:?}")),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    queue: Arc<SampleQueue>,
    opts: OutputOptions,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let dst_channels = (config.channels as usize).max(1);
    let refill = opts.refill_max_frames.max(1);
    let mut local = Pending::new(queue.channels());

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            let silence = <T as cpal::Sample>::from_sample::<f32>(0.0);
            if opts.paused.load(Ordering::Relaxed) {
                data.fill(silence);
                return;
            }
            let mut played = 0u64;
            for frame in data.chunks_mut(dst_channels) {
                if local.is_empty() {
                    match queue.pop(PopStrategy::NonBlocking { max_frames: refill }) {
                        Some(samples) => local.refill(samples),
                        None => {
                            frame.fill(silence);
                            continue;
                        }
                    }
                }
                for (ch, out) in frame.iter_mut().enumerate() {
                    *out = <T as cpal::Sample>::from_sample::<f32>(local.sample_for(ch, dst_channels));
                }
                local.advance();
                played += 1;
            }
            if played > 0 {
                opts.played_frames.fetch_add(played, Ordering::Relaxed);
            }
        },
        |err| tracing::warn!("output stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

/// Samples popped from the queue and not yet written to the device.
struct Pending {
    channels: usize,
    samples: Vec<f32>,
    pos: usize,
}

impl Pending {
    fn new(channels: usize) -> Self {
        Self {
            channels: channels.max(1),
            samples: Vec::new(),
            pos: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.pos + self.channels > self.samples.len()
    }

    fn refill(&mut self, samples: Vec<f32>) {
        self.samples = samples;
        self.pos = 0;
    }

    fn advance(&mut self) {
        self.pos += self.channels;
    }

    /// Current frame's sample for output channel `dst_ch`.
    ///
    /// Mono is duplicated, stereo folds to mono by averaging, other layouts clamp to
    /// the last available source channel.
    fn sample_for(&self, dst_ch: usize, dst_channels: usize) -> f32 {
        let frame = &self.samples[self.pos..self.pos + self.channels];
        match (self.channels, dst_channels) {
            (2, 1) => 0.5 * (frame[0] + frame[1]),
            (src, _) => frame[dst_ch.min(src - 1)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_source_is_duplicated() {
        let mut p = Pending::new(1);
        p.refill(vec![0.25, 0.5]);
        assert_eq!(p.sample_for(0, 2), 0.25);
        assert_eq!(p.sample_for(1, 2), 0.25);
        p.advance();
        assert_eq!(p.sample_for(1, 2), 0.5);
    }

    #[test]
    fn stereo_folds_to_mono() {
        let mut p = Pending::new(2);
        p.refill(vec![1.0, 0.0]);
        assert_eq!(p.sample_for(0, 1), 0.5);
    }

    #[test]
    fn wider_output_clamps_to_last_channel() {
        let mut p = Pending::new(2);
        p.refill(vec![0.1, 0.2]);
        assert_eq!(p.sample_for(0, 6), 0.1);
        assert_eq!(p.sample_for(1, 6), 0.2);
        assert_eq!(p.sample_for(5, 6), 0.2);
    }

    #[test]
    fn empties_after_last_whole_frame() {
        let mut p = Pending::new(2);
        assert!(p.is_empty());
        p.refill(vec![0.1, 0.2, 0.3, 0.4]);
        assert!(!p.is_empty());
        p.advance();
        assert!(!p.is_empty());
        p.advance();
        assert!(p.is_empty());
    }
}
