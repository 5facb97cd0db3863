//! Output device lookup and stream configuration.

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait};

/// Output device by case-insensitive substring, or the host default.
pub fn pick_device(host: &cpal::Host, needle: Option<&str>) -> Result<cpal::Device> {
    let Some(needle) = needle else {
        return host
            .default_output_device()
            .ok_or_else(|| anyhow!("no default output device"));
    };
    host.output_devices()
        .context("enumerate output devices")?
        .find(|d| {
            d.description()
                .map(|desc| matches_device_name(&desc.name(), needle))
                .unwrap_or(false)
        })
        .ok_or_else(|| anyhow!("no output device matched {needle:?}"))
}

/// Names of every output device the host reports.
pub fn device_names(host: &cpal::Host) -> Result<Vec<String>> {
    let devices = host.output_devices().context("enumerate output devices")?;
    let mut names = Vec::new();
    for d in devices {
        match d.description() {
            Ok(desc) => names.push(desc.to_string()),
            Err(e) => tracing::debug!("skipping device without description: {e}"),
        }
    }
    Ok(names)
}

/// Best supported output config for a source at `target_rate`.
///
/// Prefers a rate at or below the target (highest such), then the sample format
/// that needs the least conversion.
pub fn pick_output_config(
    device: &cpal::Device,
    target_rate: Option<u32>,
) -> Result<cpal::SupportedStreamConfig> {
    let mut best: Option<(Rank, cpal::SupportedStreamConfig)> = None;
    for range in device.supported_output_configs()? {
        let rate = rate_for_range(range.min_sample_rate(), range.max_sample_rate(), target_rate);
        let rank = Rank {
            within_target: target_rate.is_none_or(|t| rate <= t),
            rate,
            format: format_rank(range.sample_format()),
        };
        if best.as_ref().is_none_or(|(b, _)| rank.beats(b)) {
            best = Some((rank, range.with_sample_rate(rate)));
        }
    }
    best.map(|(_, cfg)| cfg)
        .ok_or_else(|| anyhow!("device has no supported output configs"))
}

/// Largest fixed buffer the device allows, capped to keep stop latency reasonable.
///
/// `None` leaves the choice to the driver.
pub fn pick_buffer_size(config: &cpal::SupportedStreamConfig) -> Option<cpal::BufferSize> {
    const MAX_FRAMES: u32 = 4_096;
    match config.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } => {
            Some(cpal::BufferSize::Fixed((*max).min(MAX_FRAMES).max(*min)))
        }
        cpal::SupportedBufferSize::Unknown => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Rank {
    within_target: bool,
    rate: u32,
    format: u8,
}

impl Rank {
    fn beats(&self, other: &Rank) -> bool {
        if self.within_target != other.within_target {
            self.within_target
        } else if self.rate != other.rate {
            // Above the target the closest rate wins; below it the highest does.
            if self.within_target {
                self.rate > other.rate
            } else {
                self.rate < other.rate
            }
        } else {
            self.format < other.format
        }
    }
}

fn rate_for_range(min: u32, max: u32, target: Option<u32>) -> u32 {
    match target {
        Some(t) => t.clamp(min, max.max(min)),
        None => max,
    }
}

fn format_rank(format: cpal::SampleFormat) -> u8 {
    match format {
        cpal::SampleFormat::F32 => 0,
        cpal::SampleFormat::I32 => 1,
        cpal::SampleFormat::I16 => 2,
        cpal::SampleFormat::U16 => 3,
        _ => 10,
    }
}

fn matches_device_name(name: &str, needle: &str) -> bool {
    let needle = needle.trim();
    !needle.is_empty() && name.to_lowercase().contains(&needle.to_lowercase())
}
