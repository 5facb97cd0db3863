//! Page discovery and widget provisioning.
//!
//! Two host-facing steps run once at startup, before any playback logic:
//! - classify every button as a play trigger or the stop control
//! - get-or-create the seek control and time label

use std::rc::Rc;

use crate::config::SoundboardConfig;
use crate::widgets::{SeekControl, TimeLabel, Widgets};

/// Where a provisioned element goes in the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Immediately after the element with this id.
    After(String),
    /// At the end of the page body.
    Append,
}

/// Page operations the core needs for provisioning.
pub trait WidgetHost {
    type Error;

    /// Whether an element with `id` exists.
    fn contains(&self, id: &str) -> bool;
    fn seek_control(&self, id: &str) -> Option<Rc<dyn SeekControl>>;
    /// Create a range control (min 0, the given step, initially disabled).
    fn create_seek_control(
        &self,
        id: &str,
        step: f64,
        placement: &Placement,
    ) -> Result<Rc<dyn SeekControl>, Self::Error>;
    fn time_label(&self, id: &str) -> Option<Rc<dyn TimeLabel>>;
    /// Create a text element showing the unknown-time placeholder.
    fn create_time_label(
        &self,
        id: &str,
        placement: &Placement,
    ) -> Result<Rc<dyn TimeLabel>, Self::Error>;
}

/// What clicking a button does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    Play(String),
    Stop,
}

/// Classify a button by its id and visible text.
///
/// The stop control is matched by id; every other button plays the sound named by
/// its trimmed text.
pub fn classify_button(id: Option<&str>, text: &str, stop_id: &str) -> Trigger {
    if id == Some(stop_id) {
        Trigger::Stop
    } else {
        Trigger::Play(text.trim().to_string())
    }
}

/// Find the seek control and time label, creating whichever is missing.
///
/// A new seek control goes right after the stop control (or at the end of the page
/// when there is none); a new label goes right after the seek control.
pub fn provision<H: WidgetHost>(
    host: &H,
    config: &SoundboardConfig,
) -> Result<Widgets, H::Error> {
    let seek = match host.seek_control(&config.seek_id) {
        Some(seek) => seek,
        None => {
            let placement = if host.contains(&config.stop_id) {
                Placement::After(config.stop_id.clone())
            } else {
                Placement::Append
            };
            tracing::debug!(id = %config.seek_id, ?placement, "provisioning seek control");
            host.create_seek_control(&config.seek_id, config.seek_step, &placement)?
        }
    };

    let label = match host.time_label(&config.label_id) {
        Some(label) => label,
        None => {
            let placement = Placement::After(config.seek_id.clone());
            tracing::debug!(id = %config.label_id, ?placement, "provisioning time label");
            host.create_time_label(&config.label_id, &placement)?
        }
    };

    Ok(Widgets { seek, label })
}
