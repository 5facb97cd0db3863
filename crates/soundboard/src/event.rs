//! One-shot notifications and unsubscribe handles.
//!
//! Hosts deliver media notifications (metadata-ready, ended) by calling
//! [`OneShot::fire`]. The core keeps its own clone of every `OneShot` it hands out
//! and disarms it on teardown, so a notification that arrives late from a
//! superseded handle is dropped even if the host already queued it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Callback<T> = Box<dyn FnOnce(T)>;

/// A callback that runs at most once.
///
/// Clones share the same slot: firing or disarming any clone affects all of them.
pub struct OneShot<T = ()> {
    slot: Rc<RefCell<Option<Callback<T>>>>,
}

impl<T> OneShot<T> {
    pub fn new(callback: impl FnOnce(T) + 'static) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(Box::new(callback)))),
        }
    }

    /// Run the callback if it is still armed. Returns whether it ran.
    pub fn fire(&self, value: T) -> bool {
        // Release the borrow before running: the callback may disarm other shots.
        let callback = self.slot.borrow_mut().take();
        match callback {
            Some(callback) => {
                callback(value);
                true
            }
            None => false,
        }
    }

    /// Drop the callback without running it.
    pub fn disarm(&self) {
        let callback = self.slot.borrow_mut().take();
        drop(callback);
    }

    pub fn is_armed(&self) -> bool {
        self.slot.borrow().is_some()
    }
}

impl<T> Clone for OneShot<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> fmt::Debug for OneShot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneShot")
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// Handle that detaches a listener or cancels a timer.
///
/// Cancel explicitly with [`cancel`](Self::cancel); dropping the handle cancels as well.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(detach: impl FnOnce() + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// A handle with nothing to detach.
    pub fn empty() -> Self {
        Self { detach: None }
    }

    pub fn cancel(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.detach.is_some())
            .finish()
    }
}

/// A one-shot listener paired with the host's unsubscribe handle.
pub(crate) struct Listener<T> {
    shot: OneShot<T>,
    subscription: Subscription,
}

impl<T> Listener<T> {
    pub(crate) fn new(shot: OneShot<T>, subscription: Subscription) -> Self {
        Self { shot, subscription }
    }

    /// Disarm first, then detach from the host.
    pub(crate) fn release(self) {
        self.shot.disarm();
        self.subscription.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn one_shot_fires_once() {
        let hits = Rc::new(Cell::new(0));
        let shot = {
            let hits = hits.clone();
            OneShot::new(move |n: u32| hits.set(hits.get() + n))
        };
        let other = shot.clone();

        assert!(shot.fire(2));
        assert!(!other.fire(5));
        assert_eq!(hits.get(), 2);
        assert!(!shot.is_armed());
    }

    #[test]
    fn disarmed_one_shot_never_runs() {
        let hits = Rc::new(Cell::new(0));
        let shot = {
            let hits = hits.clone();
            OneShot::new(move |()| hits.set(hits.get() + 1))
        };
        shot.clone().disarm();

        assert!(!shot.fire(()));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn subscription_detaches_on_cancel_and_drop() {
        let detached = Rc::new(Cell::new(0));

        let sub = {
            let detached = detached.clone();
            Subscription::new(move || detached.set(detached.get() + 1))
        };
        sub.cancel();
        assert_eq!(detached.get(), 1);

        {
            let detached = detached.clone();
            let _sub = Subscription::new(move || detached.set(detached.get() + 1));
        }
        assert_eq!(detached.get(), 2);

        Subscription::empty().cancel();
    }

    #[test]
    fn listener_release_disarms_before_detaching() {
        let shot = OneShot::new(|()| {});
        let observed = Rc::new(Cell::new(true));
        let sub = {
            let shot = shot.clone();
            let observed = observed.clone();
            Subscription::new(move || observed.set(shot.is_armed()))
        };

        Listener::new(shot, sub).release();
        assert!(!observed.get());
    }
}
