//! Loop-driven repeating timers.
//!
//! [`TickScheduler`] owns no thread: the host calls [`TickScheduler::run_due`] from its
//! event loop with the current monotonic time, and due tasks run right there. The
//! terminal host uses it as its real timer; tests drive it with synthetic time.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::event::Subscription;
use crate::widgets::Scheduler;

const MIN_PERIOD: Duration = Duration::from_millis(1);

struct Task {
    id: u64,
    period: Duration,
    due: Cell<Duration>,
    cancelled: Cell<bool>,
    tick: RefCell<Box<dyn FnMut()>>,
}

#[derive(Default)]
struct Inner {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    tasks: RefCell<Vec<Rc<Task>>>,
}

impl Inner {
    fn cancel(&self, id: u64) {
        let mut tasks = self.tasks.borrow_mut();
        if let Some(idx) = tasks.iter().position(|t| t.id == id) {
            let task = tasks.remove(idx);
            task.cancelled.set(true);
        }
    }
}

/// Repeating timers fired from the host's loop.
#[derive(Clone, Default)]
pub struct TickScheduler {
    inner: Rc<Inner>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time of the last [`run_due`](Self::run_due) call.
    pub fn now(&self) -> Duration {
        self.inner.now.get()
    }

    /// Number of live timers.
    pub fn active(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    /// Run every task due at `now`. Returns how many ticks ran.
    ///
    /// A task that fell behind runs once and is rescheduled one period from `now`;
    /// missed ticks are not replayed.
    pub fn run_due(&self, now: Duration) -> usize {
        self.inner.now.set(now);
        // Snapshot so ticks may register or cancel timers while we iterate.
        let snapshot: Vec<Rc<Task>> = self.inner.tasks.borrow().clone();
        let mut ran = 0;
        for task in snapshot {
            if task.cancelled.get() || task.due.get() > now {
                continue;
            }
            (&mut *task.tick.borrow_mut())();
            ran += 1;
            let next = task.due.get() + task.period;
            task.due.set(if next <= now { now + task.period } else { next });
        }
        ran
    }

    /// Advance time by `by`, firing every tick that falls inside the window in order.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut ran = 0;
        loop {
            let next_due = self
                .inner
                .tasks
                .borrow()
                .iter()
                .map(|t| t.due.get())
                .min();
            match next_due {
                Some(due) if due <= target => ran += self.run_due(due),
                _ => break,
            }
        }
        self.inner.now.set(target);
        ran
    }
}

impl Scheduler for TickScheduler {
    fn every(&self, period: Duration, tick: Box<dyn FnMut()>) -> Subscription {
        let period = period.max(MIN_PERIOD);
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.tasks.borrow_mut().push(Rc::new(Task {
            id,
            period,
            due: Cell::new(self.now() + period),
            cancelled: Cell::new(false),
            tick: RefCell::new(tick),
        }));

        let inner: Weak<Inner> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.cancel(id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(sched: &TickScheduler, period_ms: u64) -> (Rc<Cell<u32>>, Subscription) {
        let hits = Rc::new(Cell::new(0));
        let sub = {
            let hits = hits.clone();
            sched.every(
                Duration::from_millis(period_ms),
                Box::new(move || hits.set(hits.get() + 1)),
            )
        };
        (hits, sub)
    }

    #[test]
    fn ticks_once_per_period() {
        let sched = TickScheduler::new();
        let (hits, _sub) = counter(&sched, 200);

        sched.advance(Duration::from_millis(199));
        assert_eq!(hits.get(), 0);
        sched.advance(Duration::from_millis(1));
        assert_eq!(hits.get(), 1);
        sched.advance(Duration::from_millis(1000));
        assert_eq!(hits.get(), 6);
    }

    #[test]
    fn cancelled_timer_stops_ticking() {
        let sched = TickScheduler::new();
        let (hits, sub) = counter(&sched, 100);

        sched.advance(Duration::from_millis(250));
        assert_eq!(hits.get(), 2);
        sub.cancel();
        assert_eq!(sched.active(), 0);
        sched.advance(Duration::from_secs(5));
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn late_run_due_does_not_replay_missed_ticks() {
        let sched = TickScheduler::new();
        let (hits, _sub) = counter(&sched, 100);

        assert_eq!(sched.run_due(Duration::from_millis(1050)), 1);
        assert_eq!(hits.get(), 1);
        assert_eq!(sched.run_due(Duration::from_millis(1100)), 0);
        assert_eq!(sched.run_due(Duration::from_millis(1150)), 1);
    }

    #[test]
    fn cancel_after_scheduler_dropped_is_harmless() {
        let sched = TickScheduler::new();
        let (_hits, sub) = counter(&sched, 100);
        drop(sched);
        sub.cancel();
    }
}
