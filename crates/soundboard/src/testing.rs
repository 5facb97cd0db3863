//! In-memory media, widgets and page for exercising the core without a host.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::event::{OneShot, Subscription};
use crate::format::PLACEHOLDER;
use crate::media::{MediaBackend, MediaElement};
use crate::page::{Placement, WidgetHost};
use crate::widgets::{SeekControl, TimeLabel};

/// Listener registry keyed by subscription id.
struct Registry<T> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, T)>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            next_id: Cell::new(0),
            entries: RefCell::new(Vec::new()),
        }
    }
}

impl<T: 'static> Registry<T> {
    fn add(self: &Rc<Self>, entry: T) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push((id, entry));
        let registry: Weak<Self> = Rc::downgrade(self);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.entries.borrow_mut().retain(|(i, _)| *i != id);
            }
        })
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// Media handle whose clock and notifications are driven by the test.
pub struct FakeMedia {
    source: String,
    duration: Cell<f64>,
    time: Cell<f64>,
    paused: Cell<bool>,
    play_calls: Cell<u32>,
    metadata: Rc<Registry<OneShot<f64>>>,
    ended: Rc<Registry<OneShot>>,
    /// Every shot ever handed over, as a host event queue would hold them.
    queued_metadata: RefCell<Vec<OneShot<f64>>>,
    queued_ended: RefCell<Vec<OneShot>>,
}

impl FakeMedia {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            duration: Cell::new(f64::NAN),
            time: Cell::new(0.0),
            paused: Cell::new(true),
            play_calls: Cell::new(0),
            metadata: Rc::default(),
            ended: Rc::default(),
            queued_metadata: RefCell::default(),
            queued_ended: RefCell::default(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn play_calls(&self) -> u32 {
        self.play_calls.get()
    }

    /// Make the duration known and notify metadata listeners.
    pub fn load_metadata(&self, duration: f64) {
        self.duration.set(duration);
        let shots: Vec<OneShot<f64>> = self
            .metadata
            .entries
            .borrow()
            .iter()
            .map(|(_, s)| s.clone())
            .collect();
        for shot in shots {
            shot.fire(duration);
        }
    }

    /// Move the playhead as playback would, without a user seek.
    pub fn set_position(&self, seconds: f64) {
        self.time.set(seconds);
    }

    /// Reach the natural end: pause at the end and notify ended listeners.
    pub fn finish(&self) {
        let duration = self.duration.get();
        if duration.is_finite() {
            self.time.set(duration);
        }
        self.paused.set(true);
        let shots: Vec<OneShot> = self
            .ended
            .entries
            .borrow()
            .iter()
            .map(|(_, s)| s.clone())
            .collect();
        for shot in shots {
            shot.fire(());
        }
    }

    /// Fire every metadata shot ever registered, detached or not. Returns how many ran.
    pub fn deliver_queued_metadata(&self, duration: f64) -> usize {
        self.duration.set(duration);
        let shots = self.queued_metadata.borrow().clone();
        shots.iter().filter(|s| s.fire(duration)).count()
    }

    /// Fire every ended shot ever registered, detached or not. Returns how many ran.
    pub fn deliver_queued_ended(&self) -> usize {
        self.paused.set(true);
        let shots = self.queued_ended.borrow().clone();
        shots.iter().filter(|s| s.fire(())).count()
    }

    pub fn metadata_listeners(&self) -> usize {
        self.metadata.len()
    }

    pub fn ended_listeners(&self) -> usize {
        self.ended.len()
    }
}

impl MediaElement for FakeMedia {
    fn duration(&self) -> f64 {
        self.duration.get()
    }

    fn current_time(&self) -> f64 {
        self.time.get()
    }

    fn set_current_time(&self, seconds: f64) {
        self.time.set(seconds);
    }

    fn paused(&self) -> bool {
        self.paused.get()
    }

    fn play(&self) {
        self.play_calls.set(self.play_calls.get() + 1);
        self.paused.set(false);
    }

    fn pause(&self) {
        self.paused.set(true);
    }

    fn on_loaded_metadata(&self, listener: OneShot<f64>) -> Subscription {
        self.queued_metadata.borrow_mut().push(listener.clone());
        self.metadata.add(listener)
    }

    fn on_ended(&self, listener: OneShot) -> Subscription {
        self.queued_ended.borrow_mut().push(listener.clone());
        self.ended.add(listener)
    }
}

/// Backend that records every handle it opens.
#[derive(Default)]
pub struct FakeBackend {
    opened: RefCell<Vec<Rc<FakeMedia>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<Rc<FakeMedia>> {
        self.opened.borrow().clone()
    }

    pub fn last(&self) -> Option<Rc<FakeMedia>> {
        self.opened.borrow().last().cloned()
    }
}

impl MediaBackend for FakeBackend {
    fn open(&self, source: &str) -> Rc<dyn MediaElement> {
        let media = Rc::new(FakeMedia::new(source));
        self.opened.borrow_mut().push(media.clone());
        media
    }
}

/// Range control with observable state.
pub struct FakeSeek {
    id: String,
    value: Cell<f64>,
    max: Cell<f64>,
    step: Cell<f64>,
    disabled: Cell<bool>,
    writes: Cell<u32>,
    inputs: Rc<Registry<RefCell<Box<dyn FnMut(f64)>>>>,
}

impl FakeSeek {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            value: Cell::new(0.0),
            max: Cell::new(0.0),
            step: Cell::new(1.0),
            disabled: Cell::new(false),
            writes: Cell::new(0),
            inputs: Rc::default(),
        }
    }

    pub fn with_step(id: &str, step: f64) -> Self {
        let seek = Self::new(id);
        seek.step.set(step);
        seek.disabled.set(true);
        seek
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> f64 {
        self.value.get()
    }

    pub fn max(&self) -> f64 {
        self.max.get()
    }

    pub fn step(&self) -> f64 {
        self.step.get()
    }

    pub fn disabled(&self) -> bool {
        self.disabled.get()
    }

    /// Count of `set_value` calls, to detect writes after teardown.
    pub fn writes(&self) -> u32 {
        self.writes.get()
    }

    pub fn input_listeners(&self) -> usize {
        self.inputs.len()
    }

    /// Simulate the user dragging the thumb to `value`.
    pub fn drag(&self, value: f64) {
        self.value.set(value);
        for (_, callback) in self.inputs.entries.borrow().iter() {
            (&mut *callback.borrow_mut())(value);
        }
    }
}

impl SeekControl for FakeSeek {
    fn set_max(&self, max: f64) {
        self.max.set(max);
    }

    fn set_value(&self, value: f64) {
        self.writes.set(self.writes.get() + 1);
        self.value.set(value);
    }

    fn set_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
    }

    fn on_input(&self, callback: Box<dyn FnMut(f64)>) -> Subscription {
        self.inputs.add(RefCell::new(callback))
    }
}

pub struct FakeLabel {
    id: String,
    text: RefCell<String>,
}

impl FakeLabel {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            text: RefCell::new(String::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }
}

impl TimeLabel for FakeLabel {
    fn set_text(&self, text: &str) {
        *self.text.borrow_mut() = text.to_string();
    }
}

/// Page modelled as an ordered list of element ids plus the widgets it holds.
#[derive(Default)]
pub struct FakePage {
    order: RefCell<Vec<String>>,
    seeks: RefCell<Vec<Rc<FakeSeek>>>,
    labels: RefCell<Vec<Rc<FakeLabel>>>,
}

impl FakePage {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            order: RefCell::new(ids.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    /// Element ids in document order.
    pub fn order(&self) -> Vec<String> {
        self.order.borrow().clone()
    }

    pub fn add_seek(&self, seek: Rc<FakeSeek>) {
        self.order.borrow_mut().push(seek.id().to_string());
        self.seeks.borrow_mut().push(seek);
    }

    pub fn add_label(&self, label: Rc<FakeLabel>) {
        self.order.borrow_mut().push(label.id().to_string());
        self.labels.borrow_mut().push(label);
    }

    pub fn seek(&self, id: &str) -> Option<Rc<FakeSeek>> {
        self.seeks.borrow().iter().find(|s| s.id() == id).cloned()
    }

    pub fn label(&self, id: &str) -> Option<Rc<FakeLabel>> {
        self.labels.borrow().iter().find(|l| l.id() == id).cloned()
    }

    fn insert(&self, id: &str, placement: &Placement) {
        let mut order = self.order.borrow_mut();
        match placement {
            Placement::After(anchor) => match order.iter().position(|e| e == anchor) {
                Some(idx) => order.insert(idx + 1, id.to_string()),
                None => order.push(id.to_string()),
            },
            Placement::Append => order.push(id.to_string()),
        }
    }
}

impl WidgetHost for FakePage {
    type Error = std::convert::Infallible;

    fn contains(&self, id: &str) -> bool {
        self.order.borrow().iter().any(|e| e == id)
    }

    fn seek_control(&self, id: &str) -> Option<Rc<dyn SeekControl>> {
        self.seek(id).map(|s| s as Rc<dyn SeekControl>)
    }

    fn create_seek_control(
        &self,
        id: &str,
        step: f64,
        placement: &Placement,
    ) -> Result<Rc<dyn SeekControl>, Self::Error> {
        let seek = Rc::new(FakeSeek::with_step(id, step));
        self.insert(id, placement);
        self.seeks.borrow_mut().push(seek.clone());
        Ok(seek)
    }

    fn time_label(&self, id: &str) -> Option<Rc<dyn TimeLabel>> {
        self.label(id).map(|l| l as Rc<dyn TimeLabel>)
    }

    fn create_time_label(
        &self,
        id: &str,
        placement: &Placement,
    ) -> Result<Rc<dyn TimeLabel>, Self::Error> {
        let label = Rc::new(FakeLabel::new(id));
        label.set_text(PLACEHOLDER);
        self.insert(id, placement);
        self.labels.borrow_mut().push(label.clone());
        Ok(label)
    }
}
