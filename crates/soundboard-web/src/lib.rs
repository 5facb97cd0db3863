//! Browser host for the soundboard.
//!
//! Implements the core traits with `web-sys`:
//! - [`media::WebBackend`]: one detached `Audio` object per play
//! - [`dom::DomPage`]: get-or-create the seek `<input type="range">` and time `<span>`
//! - [`timer::IntervalScheduler`]: `setInterval` / `clearInterval`
//!
//! On load every `<button>` on the page is wired up: the stop control stops, every other
//! button plays the sound named by its text.

pub mod console;
pub mod dom;
pub mod media;
pub mod timer;

use std::cell::RefCell;
use std::rc::Rc;

use soundboard::{Soundboard, SoundboardConfig};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlElement};

use crate::dom::DomPage;
use crate::media::WebBackend;
use crate::timer::IntervalScheduler;

/// Module entry point: mount now, or once the DOM has been parsed.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console::init(tracing::Level::INFO);
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    if !still_loading(&document.ready_state()) {
        return mount(&document, &SoundboardConfig::default());
    }
    let target = document.clone();
    let on_ready = Closure::once_into_js(move || {
        if let Err(e) = mount(&target, &SoundboardConfig::default()) {
            tracing::error!(error = ?e, "soundboard mount failed");
        }
    });
    document.add_event_listener_with_callback("DOMContentLoaded", on_ready.unchecked_ref())
}

/// Provision the widgets on `document` and wire its buttons to a new session.
///
/// The session lives as long as the page: click handlers own it.
pub fn mount(document: &Document, config: &SoundboardConfig) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let page = DomPage::new(document.clone());
    let board = Soundboard::mount(
        &page,
        Rc::new(WebBackend),
        Rc::new(IntervalScheduler::new(window)),
        config,
    )?;
    let board = Rc::new(RefCell::new(board));

    let buttons = document.query_selector_all("button")?;
    let mut wired = 0;
    for i in 0..buttons.length() {
        let Some(button) = buttons.item(i).and_then(|n| n.dyn_into::<HtmlElement>().ok()) else {
            continue;
        };
        let id = non_empty(button.id());
        let text = button.text_content().unwrap_or_default();
        let trigger = board.borrow().trigger_for(id.as_deref(), &text);

        let board = board.clone();
        let on_click = Closure::<dyn FnMut()>::new(move || match board.try_borrow_mut() {
            Ok(mut board) => board.activate(&trigger),
            Err(_) => tracing::warn!("click ignored, soundboard busy"),
        });
        button.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
        on_click.forget();
        wired += 1;
    }
    tracing::info!(buttons = wired, sounds_dir = %config.sounds_dir, "soundboard ready");
    Ok(())
}

/// `document.readyState` before `DOMContentLoaded`.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn still_loading(ready_state: &str) -> bool {
    ready_state == "loading"
}

/// Element ids come back as `""` when unset.
fn non_empty(id: String) -> Option<String> {
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_id_means_no_id() {
        assert_eq!(non_empty(String::new()), None);
        assert_eq!(non_empty("stp".to_string()), Some("stp".to_string()));
    }

    #[test]
    fn only_loading_state_defers_mount() {
        assert!(still_loading("loading"));
        assert!(!still_loading("interactive"));
        assert!(!still_loading("complete"));
    }
}
