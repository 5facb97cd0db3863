//! Seek synchronizer: keeps the seek control and remaining-time label in step with
//! the active media handle, and applies user drags back to it.
//!
//! Lifecycle per handle: `Unbound → Bound → Unbound`. `bind` starts a repeating poll
//! and registers the input callback; `unbind` cancels both and restores the idle
//! display. There are no other states.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::event::Subscription;
use crate::format::{PLACEHOLDER, format_remaining, format_time};
use crate::media::MediaElement;
use crate::widgets::{Scheduler, SeekControl, TimeLabel, Widgets};

/// Live association between one media handle and the widgets.
struct SeekBinding {
    poll: Subscription,
    input: Subscription,
}

impl SeekBinding {
    fn cancel(self) {
        self.poll.cancel();
        self.input.cancel();
    }
}

struct Inner {
    seek: Rc<dyn SeekControl>,
    label: Rc<dyn TimeLabel>,
    scheduler: Rc<dyn Scheduler>,
    period: Duration,
    binding: RefCell<Option<SeekBinding>>,
}

/// Shared handle to the synchronizer; clones drive the same widgets and binding.
#[derive(Clone)]
pub struct SeekSynchronizer {
    inner: Rc<Inner>,
}

/// Non-owning handle for callbacks stored inside media listeners.
#[derive(Clone)]
pub struct WeakSeekSynchronizer {
    inner: Weak<Inner>,
}

impl WeakSeekSynchronizer {
    pub fn upgrade(&self) -> Option<SeekSynchronizer> {
        self.inner.upgrade().map(|inner| SeekSynchronizer { inner })
    }
}

impl SeekSynchronizer {
    pub fn new(widgets: Widgets, scheduler: Rc<dyn Scheduler>, period: Duration) -> Self {
        Self {
            inner: Rc::new(Inner {
                seek: widgets.seek,
                label: widgets.label,
                scheduler,
                period,
                binding: RefCell::new(None),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakSeekSynchronizer {
        WeakSeekSynchronizer {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.inner.binding.borrow().is_some()
    }

    /// Start following `media`: poll its position and accept user seeks.
    ///
    /// Any previous binding is torn down first.
    pub fn bind(&self, media: Rc<dyn MediaElement>) {
        self.teardown();

        let poll = {
            let media = media.clone();
            let seek = self.inner.seek.clone();
            let label = self.inner.label.clone();
            self.inner.scheduler.every(
                self.inner.period,
                Box::new(move || {
                    if media.paused() {
                        return;
                    }
                    let position = media.current_time();
                    seek.set_value(position);
                    label.set_text(&format_remaining(media.duration(), position));
                }),
            )
        };

        let input = {
            let label = self.inner.label.clone();
            self.inner.seek.on_input(Box::new(move |value| {
                media.set_current_time(value);
                label.set_text(&format_remaining(media.duration(), value));
            }))
        };

        *self.inner.binding.borrow_mut() = Some(SeekBinding { poll, input });
        tracing::trace!("seek binding established");
    }

    /// Metadata arrived: open the range to `[0, duration]` and show the full length.
    ///
    /// A non-finite duration leaves the control disabled.
    pub fn show_duration(&self, duration: f64) {
        let seek = &self.inner.seek;
        if duration.is_finite() {
            seek.set_max(duration);
            seek.set_value(0.0);
            seek.set_disabled(false);
        }
        self.inner.label.set_text(&format_time(duration));
    }

    /// Stop following the current handle and restore the idle display.
    ///
    /// Safe to call when nothing is bound.
    pub fn unbind(&self) {
        if self.teardown() {
            tracing::trace!("seek binding released");
        }
        self.reset_display();
    }

    /// Idle display: disabled, zeroed, placeholder label.
    pub fn reset_display(&self) {
        let seek = &self.inner.seek;
        seek.set_disabled(true);
        seek.set_value(0.0);
        seek.set_max(0.0);
        self.inner.label.set_text(PLACEHOLDER);
    }

    fn teardown(&self) -> bool {
        // Take the binding out before cancelling so no borrow is held while hosts detach.
        let binding = self.inner.binding.borrow_mut().take();
        match binding {
            Some(binding) => {
                binding.cancel();
                true
            }
            None => false,
        }
    }
}
