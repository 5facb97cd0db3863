//! Media handle abstraction.
//!
//! Methods take `&self`: handles are shared between the controller, the poll task and
//! the seek input callback, and hosts keep their state behind interior mutability
//! (a DOM element, or atomics shared with an audio thread).

use std::rc::Rc;

use crate::event::{OneShot, Subscription};

/// A loaded (or loading) sound.
pub trait MediaElement {
    /// Length in seconds; NaN until metadata has loaded.
    fn duration(&self) -> f64;
    /// Playback position in seconds.
    fn current_time(&self) -> f64;
    fn set_current_time(&self, seconds: f64);
    fn paused(&self) -> bool;
    /// Start or resume playback. Failures are absorbed by the host.
    fn play(&self);
    fn pause(&self);
    /// Fire `listener` with the duration once metadata is available.
    fn on_loaded_metadata(&self, listener: OneShot<f64>) -> Subscription;
    /// Fire `listener` when playback reaches the end of the resource.
    fn on_ended(&self, listener: OneShot) -> Subscription;
}

/// Creates media handles from asset paths.
pub trait MediaBackend {
    fn open(&self, source: &str) -> Rc<dyn MediaElement>;
}
