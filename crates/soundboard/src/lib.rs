//! Soundboard core: one active sound at a time, a seek control that follows it,
//! and a remaining-time label.
//!
//! The crate is host-agnostic. Hosts (browser, terminal) implement the traits in
//! [`media`], [`widgets`] and [`page`] and drive everything from a single event loop:
//! - [`controller::PlaybackController`] owns the active handle (`play` / `stop`)
//! - [`seek::SeekSynchronizer`] binds the seek control and label to that handle
//! - [`session::Soundboard`] wires both together after widget provisioning

pub mod assets;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod format;
pub mod media;
pub mod page;
pub mod scheduler;
pub mod seek;
pub mod session;
pub mod widgets;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::SoundboardConfig;
pub use error::SoundboardError;
pub use format::{PLACEHOLDER, format_time};
pub use session::Soundboard;
