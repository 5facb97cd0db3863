//! Seek control, time label, and poll scheduling.

use std::rc::Rc;
use std::time::Duration;

use crate::event::Subscription;

/// A numeric range control with a fixed minimum of zero.
pub trait SeekControl {
    fn set_max(&self, max: f64);
    fn set_value(&self, value: f64);
    fn set_disabled(&self, disabled: bool);
    /// Register a callback for user-initiated changes; receives the new value.
    fn on_input(&self, callback: Box<dyn FnMut(f64)>) -> Subscription;
}

/// Text element showing the remaining time.
pub trait TimeLabel {
    fn set_text(&self, text: &str);
}

/// Repeating timer.
pub trait Scheduler {
    /// Run `tick` every `period` until the returned handle is cancelled.
    fn every(&self, period: Duration, tick: Box<dyn FnMut()>) -> Subscription;
}

/// The two widgets the seek synchronizer drives.
#[derive(Clone)]
pub struct Widgets {
    pub seek: Rc<dyn SeekControl>,
    pub label: Rc<dyn TimeLabel>,
}
