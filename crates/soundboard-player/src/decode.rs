//! Probe and streaming decode stage.
//!
//! Uses Symphonia to:
//! - probe a sound file for its stream layout and duration
//! - decode from an arbitrary offset into interleaved `f32` on a background thread

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, anyhow};
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions};
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;

use crate::queue::{SampleQueue, capacity_for};

/// What a probe learns about a sound file.
#[derive(Clone, Debug)]
pub struct SourceInfo {
    pub sample_rate: u32,
    pub channels: usize,
    /// Length in seconds, from the container or a packet scan.
    pub duration_secs: Option<f64>,
    pub codec: Option<String>,
}

fn open_format(path: &Path) -> Result<Box<dyn FormatReader>> {
    let file = File::open(path).with_context(|| format!("open {path:?}"))?;
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("probe {path:?}"))?;
    Ok(probed.format)
}

fn default_params(format: &dyn FormatReader) -> Result<(u32, CodecParameters)> {
    let track = format
        .default_track()
        .ok_or_else(|| anyhow!("no default audio track"))?;
    Ok((track.id, track.codec_params.clone()))
}

fn spec_from_params(params: &CodecParameters) -> Result<SignalSpec> {
    let rate = params
        .sample_rate
        .ok_or_else(|| anyhow!("unknown sample rate"))?;
    let channels = params.channels.ok_or_else(|| anyhow!("unknown channels"))?;
    Ok(SignalSpec::new(rate, channels))
}

/// Read stream layout and duration without decoding audio.
///
/// Containers that do not carry a frame count (plain MP3 without a Xing/Info header)
/// are measured by walking their packets.
pub fn probe(path: &Path) -> Result<SourceInfo> {
    let mut format = open_format(path)?;
    let (track_id, params) = default_params(&*format)?;
    let spec = spec_from_params(&params)?;

    let duration_secs = match duration_from_params(&params) {
        Some(secs) => Some(secs),
        None => scan_duration(&mut *format, track_id, &params),
    };

    Ok(SourceInfo {
        sample_rate: spec.rate,
        channels: spec.channels.count(),
        duration_secs,
        codec: codec_name(&params),
    })
}

fn duration_from_params(params: &CodecParameters) -> Option<f64> {
    let frames = params.n_frames?;
    let rate = params.sample_rate?;
    if rate == 0 {
        return None;
    }
    Some(frames as f64 / rate as f64)
}

fn scan_duration(
    format: &mut dyn FormatReader,
    track_id: u32,
    params: &CodecParameters,
) -> Option<f64> {
    let mut end_ts: u64 = 0;
    while let Ok(packet) = format.next_packet() {
        if packet.track_id() == track_id {
            end_ts = end_ts.max(packet.ts() + packet.dur());
        }
    }
    if end_ts == 0 {
        return None;
    }
    match params.time_base {
        Some(tb) => {
            let time = tb.calc_time(end_ts);
            Some(time.seconds as f64 + time.frac)
        }
        None => {
            let rate = params.sample_rate.filter(|r| *r > 0)?;
            Some(end_ts as f64 / rate as f64)
        }
    }
}

/// Start a decoder thread that streams `path` from `start_secs` into a new queue.
///
/// The queue is closed on EOF or error. Closing it from outside stops the thread.
pub fn start_decode(
    path: &Path,
    start_secs: f64,
    buffer_seconds: f32,
) -> Result<(SignalSpec, Arc<SampleQueue>)> {
    let mut format = open_format(path)?;
    let (track_id, params) = default_params(&*format)?;
    let spec = spec_from_params(&params)?;

    let mut skip_frames = 0u64;
    if start_secs > 0.0 {
        let time = Time::new(start_secs.trunc() as u64, start_secs.fract());
        match format.seek(
            SeekMode::Accurate,
            SeekTo::Time {
                time,
                track_id: Some(track_id),
            },
        ) {
            Ok(seeked) => skip_frames = seeked.required_ts.saturating_sub(seeked.actual_ts),
            Err(e) => tracing::warn!(path = ?path, start_secs, "seek failed, playing from start: {e}"),
        }
    }

    let decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .context("create decoder")?;

    let channels = spec.channels.count();
    let queue = Arc::new(SampleQueue::new(
        channels,
        capacity_for(spec.rate, channels, buffer_seconds),
    ));

    let queue_for_thread = queue.clone();
    thread::spawn(move || {
        if let Err(e) = decode_loop(format, decoder, track_id, skip_frames, &queue_for_thread) {
            tracing::error!("decoder thread error: {e:#}");
        }
        queue_for_thread.close();
    });

    Ok((spec, queue))
}

fn decode_loop(
    mut format: Box<dyn FormatReader>,
    mut decoder: Box<dyn Decoder>,
    track_id: u32,
    mut skip_frames: u64,
    queue: &SampleQueue,
) -> Result<()> {
    loop {
        if queue.is_done() {
            break;
        }
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(_) => break, // EOF
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(_) => continue,
        };

        let frames = decoded.frames() as u64;
        if skip_frames >= frames {
            skip_frames -= frames;
            continue;
        }

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let mut buf = SampleBuffer::<f32>::new(frames, spec);
        buf.copy_interleaved_ref(decoded);
        let start = skip_frames as usize * channels;
        skip_frames = 0;
        queue.push_blocking(&buf.samples()[start..]);
    }
    Ok(())
}

fn codec_name(params: &CodecParameters) -> Option<String> {
    use symphonia::core::codecs::*;
    let name = match params.codec {
        CODEC_TYPE_MP3 => "MP3",
        CODEC_TYPE_FLAC => "FLAC",
        CODEC_TYPE_AAC => "AAC",
        CODEC_TYPE_VORBIS => "VORBIS",
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => "PCM_S16",
        CODEC_TYPE_PCM_S24LE | CODEC_TYPE_PCM_S24BE => "PCM_S24",
        CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F32BE => "PCM_F32",
        _ => return None,
    };
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use symphonia::core::codecs::{CODEC_TYPE_MP3, CODEC_TYPE_NULL};

    /// Write a 16-bit PCM mono WAV of `frames` silent samples.
    fn write_wav(name: &str, rate: u32, frames: u32) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("soundboard-decode-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let data_len = frames * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&rate.to_le_bytes());
        bytes.extend_from_slice(&(rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(bytes.len() + data_len as usize, 0);
        File::create(&path).unwrap().write_all(&bytes).unwrap();
        path
    }

    #[test]
    fn duration_from_params_handles_zero_rate() {
        let mut params = CodecParameters::new();
        params.sample_rate = Some(0);
        params.n_frames = Some(100);
        assert!(duration_from_params(&params).is_none());
    }

    #[test]
    fn duration_from_params_divides_frames_by_rate() {
        let mut params = CodecParameters::new();
        params.sample_rate = Some(48_000);
        params.n_frames = Some(96_000);
        assert_eq!(duration_from_params(&params), Some(2.0));
    }

    #[test]
    fn codec_name_maps_known_and_unknown() {
        let mut params = CodecParameters::new();
        params.codec = CODEC_TYPE_MP3;
        assert_eq!(codec_name(&params).as_deref(), Some("MP3"));
        params.codec = CODEC_TYPE_NULL;
        assert!(codec_name(&params).is_none());
    }

    #[test]
    fn probe_reads_wav_layout_and_duration() {
        let path = write_wav("probe.wav", 8_000, 16_000);
        let info = probe(&path).unwrap();
        assert_eq!(info.sample_rate, 8_000);
        assert_eq!(info.channels, 1);
        let secs = info.duration_secs.unwrap();
        assert!((secs - 2.0).abs() < 1e-6, "duration {secs}");
    }

    #[test]
    fn probe_fails_for_missing_file() {
        let missing = std::env::temp_dir().join("soundboard-definitely-missing.mp3");
        assert!(probe(&missing).is_err());
    }

    #[test]
    fn decode_streams_all_frames_then_closes() {
        let path = write_wav("decode.wav", 8_000, 4_000);
        let (spec, queue) = start_decode(&path, 0.0, 0.5).unwrap();
        assert_eq!(spec.rate, 8_000);

        let mut total = 0;
        while let Some(chunk) = queue.pop(crate::queue::PopStrategy::BlockingUpTo { max_frames: 512 }) {
            total += chunk.len();
        }
        assert_eq!(total, 4_000);
        assert!(queue.is_done());
    }
}
