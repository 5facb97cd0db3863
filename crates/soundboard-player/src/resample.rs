//! Rate conversion stage.
//!
//! Converts decoded audio to the output device rate with Rubato's streaming sinc
//! resampler, on its own thread, into a fresh bounded queue.

use std::sync::Arc;
use std::thread;

use anyhow::{Result, anyhow};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{
    Async, FixedAsync, Indexing, Resampler, SincInterpolationParameters, SincInterpolationType,
    WindowFunction, calculate_cutoff,
};

use crate::queue::{PopStrategy, SampleQueue, capacity_for};

/// Spawn a resampler thread reading `src` at `src_rate` and writing `dst_rate` audio.
///
/// The returned queue closes once `src` is closed and drained, or when the consumer
/// closes it first.
pub fn start_resampler(
    src: Arc<SampleQueue>,
    src_rate: u32,
    dst_rate: u32,
    chunk_frames: usize,
    buffer_seconds: f32,
) -> Result<Arc<SampleQueue>> {
    if src_rate == 0 || dst_rate == 0 {
        return Err(anyhow!("invalid resample rates {src_rate} -> {dst_rate}"));
    }
    let channels = src.channels();
    let chunk = chunk_frames.max(1);
    let dst = Arc::new(SampleQueue::new(
        channels,
        capacity_for(dst_rate, channels, buffer_seconds),
    ));

    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: calculate_cutoff(128, window),
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window,
    };
    let ratio = dst_rate as f64 / src_rate as f64;
    tracing::debug!(src_rate, dst_rate, chunk, "resampler started");

    let out = dst.clone();
    thread::spawn(move || {
        let mut resampler =
            match Async::<f32>::new_sinc(ratio, 1.1, &params, chunk, channels, FixedAsync::Input) {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!("resampler init error: {e}");
                    src.close();
                    out.close();
                    return;
                }
            };
        let mut scratch = vec![0.0f32; channels * resampler.output_frames_max()];
        let mut full_chunks = true;
        loop {
            if out.is_done() {
                break;
            }
            let input = if full_chunks {
                match src.pop(PopStrategy::BlockingExact { frames: chunk }) {
                    Some(v) => v,
                    None => {
                        // Source ended mid-chunk; flush what is left as partial chunks.
                        full_chunks = false;
                        continue;
                    }
                }
            } else {
                match src.pop(PopStrategy::BlockingUpTo { max_frames: chunk }) {
                    Some(v) => v,
                    None => break,
                }
            };
            let partial = (!full_chunks).then(|| input.len() / channels);
            match process_chunk(&mut resampler, &input, &mut scratch, channels, partial) {
                Ok(produced) if produced > 0 => out.push_blocking(&scratch[..produced]),
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("resampler error: {e:#}");
                    break;
                }
            }
        }
        src.close();
        out.close();
    });

    Ok(dst)
}

/// Run one chunk through `resampler`, returning the number of output samples written
/// to `scratch`.
fn process_chunk(
    resampler: &mut Async<f32>,
    input: &[f32],
    scratch: &mut [f32],
    channels: usize,
    partial_frames: Option<usize>,
) -> Result<usize> {
    let in_frames = input.len() / channels;
    if in_frames == 0 {
        return Ok(0);
    }
    let input = InterleavedSlice::new(input, channels, in_frames)
        .map_err(|e| anyhow!("input adapter: {e}"))?;
    let out_frames = scratch.len() / channels;
    let mut output = InterleavedSlice::new_mut(scratch, channels, out_frames)
        .map_err(|e| anyhow!("output adapter: {e}"))?;
    let indexing = Indexing {
        input_offset: 0,
        output_offset: 0,
        active_channels_mask: None,
        partial_len: partial_frames,
    };
    let (_consumed, produced) = resampler
        .process_into_buffer(&input, &mut output, Some(&indexing))
        .map_err(|e| anyhow!("process: {e}"))?;
    Ok(produced * channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(src: &SampleQueue, frames: usize) {
        let samples: Vec<f32> = (0..frames * 2).map(|i| (i as f32 * 0.001).sin()).collect();
        src.push_blocking(&samples);
        src.close();
    }

    fn drain(q: &SampleQueue) -> usize {
        let mut total = 0;
        while let Some(chunk) = q.pop(PopStrategy::BlockingUpTo { max_frames: 4096 }) {
            total += chunk.len();
        }
        total
    }

    #[test]
    fn rejects_zero_rates() {
        let src = Arc::new(SampleQueue::new(2, 64));
        assert!(start_resampler(src.clone(), 0, 48_000, 256, 0.5).is_err());
        assert!(start_resampler(src, 44_100, 0, 256, 0.5).is_err());
    }

    #[test]
    fn upsampling_roughly_scales_frame_count() {
        let src = Arc::new(SampleQueue::new(2, 1 << 16));
        feed(&src, 8_000);
        let dst = start_resampler(src, 8_000, 16_000, 512, 2.0).unwrap();

        let frames = drain(&dst) / 2;
        assert!(frames > 12_000 && frames < 20_000, "frames {frames}");
        assert!(dst.is_done());
    }
}
