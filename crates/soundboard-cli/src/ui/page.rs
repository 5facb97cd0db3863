//! Terminal stand-ins for the page elements the soundboard drives.

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::{Rc, Weak};

use soundboard::PLACEHOLDER;
use soundboard::event::Subscription;
use soundboard::page::{Placement, WidgetHost};
use soundboard::widgets::{SeekControl, TimeLabel};

type InputCallback = Rc<RefCell<Box<dyn FnMut(f64)>>>;

#[derive(Default)]
struct InputRegistry {
    next_id: Cell<u64>,
    callbacks: RefCell<Vec<(u64, InputCallback)>>,
}

/// Seek gauge; the user moves it with the seek keys.
pub(crate) struct TuiSeek {
    id: String,
    step: f64,
    value: Cell<f64>,
    max: Cell<f64>,
    disabled: Cell<bool>,
    inputs: Rc<InputRegistry>,
}

impl TuiSeek {
    fn new(id: &str, step: f64) -> Self {
        Self {
            id: id.to_string(),
            step,
            value: Cell::new(0.0),
            max: Cell::new(0.0),
            disabled: Cell::new(true),
            inputs: Rc::default(),
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn value(&self) -> f64 {
        self.value.get()
    }

    pub(crate) fn max(&self) -> f64 {
        self.max.get()
    }

    pub(crate) fn disabled(&self) -> bool {
        self.disabled.get()
    }

    /// Played fraction for the gauge, 0 when the range is empty.
    pub(crate) fn ratio(&self) -> f64 {
        let max = self.max.get();
        if max > 0.0 {
            (self.value.get() / max).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Move the thumb by `delta` seconds as a user input. Ignored while disabled.
    pub(crate) fn nudge(&self, delta: f64) -> bool {
        if self.disabled.get() {
            return false;
        }
        let max = self.max.get().max(0.0);
        let mut value = self.value.get() + delta;
        if self.step > 0.0 {
            value = (value / self.step).round() * self.step;
        }
        let value = value.clamp(0.0, max);
        self.value.set(value);
        let callbacks: Vec<InputCallback> = self
            .inputs
            .callbacks
            .borrow()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for cb in callbacks {
            (&mut *cb.borrow_mut())(value);
        }
        true
    }
}

impl SeekControl for TuiSeek {
    fn set_max(&self, max: f64) {
        self.max.set(max);
    }

    fn set_value(&self, value: f64) {
        self.value.set(value);
    }

    fn set_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
    }

    fn on_input(&self, callback: Box<dyn FnMut(f64)>) -> Subscription {
        let id = self.inputs.next_id.get();
        self.inputs.next_id.set(id + 1);
        self.inputs
            .callbacks
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(callback))));
        let registry: Weak<InputRegistry> = Rc::downgrade(&self.inputs);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.callbacks.borrow_mut().retain(|(i, _)| *i != id);
            }
        })
    }
}

pub(crate) struct TuiLabel {
    id: String,
    text: RefCell<String>,
}

impl TuiLabel {
    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn text(&self) -> String {
        self.text.borrow().clone()
    }
}

impl TimeLabel for TuiLabel {
    fn set_text(&self, text: &str) {
        *self.text.borrow_mut() = text.to_string();
    }
}

/// The terminal page: button ids in display order plus the provisioned widgets.
#[derive(Default)]
pub(crate) struct TuiPage {
    order: RefCell<Vec<String>>,
    seek: RefCell<Option<Rc<TuiSeek>>>,
    label: RefCell<Option<Rc<TuiLabel>>>,
}

impl TuiPage {
    pub(crate) fn new<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            order: RefCell::new(ids.into_iter().map(str::to_string).collect()),
            ..Default::default()
        }
    }

    pub(crate) fn order(&self) -> Vec<String> {
        self.order.borrow().clone()
    }

    pub(crate) fn seek(&self) -> Option<Rc<TuiSeek>> {
        self.seek.borrow().clone()
    }

    pub(crate) fn label(&self) -> Option<Rc<TuiLabel>> {
        self.label.borrow().clone()
    }

    fn place(&self, id: &str, placement: &Placement) {
        let mut order = self.order.borrow_mut();
        let at = match placement {
            Placement::After(anchor) => order.iter().position(|e| e == anchor).map(|i| i + 1),
            Placement::Append => None,
        };
        match at {
            Some(i) => order.insert(i, id.to_string()),
            None => order.push(id.to_string()),
        }
    }
}

impl WidgetHost for TuiPage {
    type Error = Infallible;

    fn contains(&self, id: &str) -> bool {
        self.order.borrow().iter().any(|e| e == id)
    }

    fn seek_control(&self, id: &str) -> Option<Rc<dyn SeekControl>> {
        self.seek()
            .filter(|s| s.id() == id)
            .map(|s| s as Rc<dyn SeekControl>)
    }

    fn create_seek_control(
        &self,
        id: &str,
        step: f64,
        placement: &Placement,
    ) -> Result<Rc<dyn SeekControl>, Infallible> {
        let seek = Rc::new(TuiSeek::new(id, step));
        self.place(id, placement);
        *self.seek.borrow_mut() = Some(seek.clone());
        Ok(seek)
    }

    fn time_label(&self, id: &str) -> Option<Rc<dyn TimeLabel>> {
        self.label()
            .filter(|l| l.id() == id)
            .map(|l| l as Rc<dyn TimeLabel>)
    }

    fn create_time_label(
        &self,
        id: &str,
        placement: &Placement,
    ) -> Result<Rc<dyn TimeLabel>, Infallible> {
        let label = Rc::new(TuiLabel {
            id: id.to_string(),
            text: RefCell::new(PLACEHOLDER.to_string()),
        });
        self.place(id, placement);
        *self.label.borrow_mut() = Some(label.clone());
        Ok(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nudge_is_ignored_while_disabled() {
        let seek = TuiSeek::new("seek", 0.01);
        seek.set_max(10.0);
        assert!(!seek.nudge(5.0));
        assert_eq!(seek.value(), 0.0);
    }

    #[test]
    fn nudge_clamps_and_reports_to_listeners() {
        let seek = TuiSeek::new("seek", 0.5);
        seek.set_max(7.5);
        seek.set_disabled(false);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _sub = {
            let seen = seen.clone();
            seek.on_input(Box::new(move |v| seen.borrow_mut().push(v)))
        };

        assert!(seek.nudge(5.0));
        assert!(seek.nudge(5.0));
        assert!(seek.nudge(-20.0));
        assert_eq!(*seen.borrow(), vec![5.0, 7.5, 0.0]);
    }

    #[test]
    fn cancelled_input_listener_stops_receiving() {
        let seek = TuiSeek::new("seek", 1.0);
        seek.set_max(10.0);
        seek.set_disabled(false);
        let hits = Rc::new(Cell::new(0));
        let sub = {
            let hits = hits.clone();
            seek.on_input(Box::new(move |_| hits.set(hits.get() + 1)))
        };
        seek.nudge(1.0);
        sub.cancel();
        seek.nudge(1.0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn widgets_are_placed_after_their_anchor() {
        let page = TuiPage::new(["bell", "stp", "horn"]);
        page.create_seek_control("seek", 0.01, &Placement::After("stp".into()))
            .unwrap();
        page.create_time_label("time-remaining", &Placement::After("seek".into()))
            .unwrap();

        assert_eq!(page.order(), vec!["bell", "stp", "seek", "time-remaining", "horn"]);
        assert!(page.seek_control("seek").is_some());
        assert!(page.seek_control("other").is_none());
        assert_eq!(page.label().unwrap().text(), PLACEHOLDER);
    }

    #[test]
    fn ratio_handles_empty_range() {
        let seek = TuiSeek::new("seek", 0.01);
        assert_eq!(seek.ratio(), 0.0);
        seek.set_max(4.0);
        seek.set_value(1.0);
        assert_eq!(seek.ratio(), 0.25);
    }
}
