//! Native media backend for the soundboard.
//!
//! Each opened sound gets its own small pipeline, rebuilt on every start or seek:
//! 1. **Decode**: a background thread uses Symphonia to decode from the requested offset.
//! 2. **Resample**: when the device rate differs, a Rubato thread converts the stream.
//! 3. **Output**: the CPAL callback drains the queue and counts played frames.
//!
//! Stages communicate through bounded [`queue::SampleQueue`]s. Metadata-ready and ended
//! notifications are queued and only delivered by [`media::NativeBackend::dispatch`],
//! which the host calls from its main loop.

pub mod config;
pub mod decode;
pub mod device;
pub mod media;
pub mod output;
pub mod queue;
pub mod resample;

pub use config::PlaybackConfig;
pub use media::{NativeBackend, NativeMedia};
