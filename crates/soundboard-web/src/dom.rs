//! DOM-backed seek control, time label and page.

use std::rc::Rc;

use soundboard::PLACEHOLDER;
use soundboard::event::Subscription;
use soundboard::page::{Placement, WidgetHost};
use soundboard::widgets::{SeekControl, TimeLabel};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::JsValue;
use web_sys::{Document, Element, HtmlElement, HtmlInputElement};

/// `<input type="range">` seek control.
pub struct DomSeek {
    input: HtmlInputElement,
}

impl DomSeek {
    pub fn new(input: HtmlInputElement) -> Self {
        Self { input }
    }
}

impl SeekControl for DomSeek {
    fn set_max(&self, max: f64) {
        self.input.set_max(&number_attr(max));
    }

    fn set_value(&self, value: f64) {
        self.input.set_value_as_number(value);
    }

    fn set_disabled(&self, disabled: bool) {
        self.input.set_disabled(disabled);
    }

    fn on_input(&self, mut callback: Box<dyn FnMut(f64)>) -> Subscription {
        let input = self.input.clone();
        let handler = Closure::<dyn FnMut()>::new(move || callback(input.value_as_number()));
        if let Err(e) = self
            .input
            .add_event_listener_with_callback("input", handler.as_ref().unchecked_ref())
        {
            tracing::warn!(error = ?e, "cannot listen for seek input");
            return Subscription::empty();
        }
        let input = self.input.clone();
        Subscription::new(move || {
            let _ = input
                .remove_event_listener_with_callback("input", handler.as_ref().unchecked_ref());
        })
    }
}

/// Any element whose text content shows the remaining time.
pub struct DomLabel {
    element: HtmlElement,
}

impl DomLabel {
    pub fn new(element: HtmlElement) -> Self {
        Self { element }
    }
}

impl TimeLabel for DomLabel {
    fn set_text(&self, text: &str) {
        self.element.set_text_content(Some(text));
    }
}

/// The live document.
pub struct DomPage {
    document: Document,
}

impl DomPage {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn place(&self, element: &Element, placement: &Placement) -> Result<(), JsValue> {
        if let Placement::After(anchor) = placement {
            if let Some(anchor) = self.document.get_element_by_id(anchor) {
                return anchor.after_with_node_1(element);
            }
        }
        let body = self
            .document
            .body()
            .ok_or_else(|| JsValue::from_str("document has no body"))?;
        body.append_child(element)?;
        Ok(())
    }
}

impl WidgetHost for DomPage {
    type Error = JsValue;

    fn contains(&self, id: &str) -> bool {
        self.document.get_element_by_id(id).is_some()
    }

    fn seek_control(&self, id: &str) -> Option<Rc<dyn SeekControl>> {
        let input = self
            .document
            .get_element_by_id(id)?
            .dyn_into::<HtmlInputElement>()
            .ok()?;
        Some(Rc::new(DomSeek::new(input)))
    }

    fn create_seek_control(
        &self,
        id: &str,
        step: f64,
        placement: &Placement,
    ) -> Result<Rc<dyn SeekControl>, JsValue> {
        let input: HtmlInputElement = self.document.create_element("input")?.dyn_into()?;
        input.set_type("range");
        input.set_id(id);
        input.set_min("0");
        input.set_step(&number_attr(step));
        input.set_value("0");
        input.set_disabled(true);
        self.place(&input, placement)?;
        Ok(Rc::new(DomSeek::new(input)))
    }

    fn time_label(&self, id: &str) -> Option<Rc<dyn TimeLabel>> {
        let element = self
            .document
            .get_element_by_id(id)?
            .dyn_into::<HtmlElement>()
            .ok()?;
        Some(Rc::new(DomLabel::new(element)))
    }

    fn create_time_label(
        &self,
        id: &str,
        placement: &Placement,
    ) -> Result<Rc<dyn TimeLabel>, JsValue> {
        let element: HtmlElement = self.document.create_element("span")?.dyn_into()?;
        element.set_id(id);
        element.set_text_content(Some(PLACEHOLDER));
        self.place(&element, placement)?;
        Ok(Rc::new(DomLabel::new(element)))
    }
}

/// Attribute text for a number: integers without a trailing `.0`.
fn number_attr(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_attr_formats_integers_and_fractions() {
        assert_eq!(number_attr(0.0), "0");
        assert_eq!(number_attr(42.0), "42");
        assert_eq!(number_attr(0.01), "0.01");
        assert_eq!(number_attr(12.75), "12.75");
    }
}
