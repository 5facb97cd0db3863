//! `<audio>`-backed media handles.

use std::fmt;
use std::rc::Rc;

use soundboard::event::{OneShot, Subscription};
use soundboard::media::{MediaBackend, MediaElement};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen_futures::JsFuture;
use web_sys::{EventTarget, HtmlAudioElement};

/// Opens a detached `Audio` object per sound.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebBackend;

impl MediaBackend for WebBackend {
    fn open(&self, source: &str) -> Rc<dyn MediaElement> {
        match HtmlAudioElement::new_with_src(source) {
            Ok(audio) => Rc::new(WebMedia::new(audio)),
            Err(e) => {
                tracing::warn!(source, error = ?e, "cannot create audio element");
                Rc::new(InertMedia)
            }
        }
    }
}

pub struct WebMedia {
    audio: HtmlAudioElement,
}

impl WebMedia {
    pub fn new(audio: HtmlAudioElement) -> Self {
        Self { audio }
    }

    fn listen(&self, event: &'static str, callback: Closure<dyn FnMut()>) -> Subscription {
        let target: EventTarget = self.audio.clone().unchecked_into();
        if let Err(e) =
            target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
        {
            tracing::warn!(event, error = ?e, "add_event_listener failed");
            return Subscription::empty();
        }
        Subscription::new(move || {
            let _ = target
                .remove_event_listener_with_callback(event, callback.as_ref().unchecked_ref());
        })
    }
}

impl MediaElement for WebMedia {
    fn duration(&self) -> f64 {
        self.audio.duration()
    }

    fn current_time(&self) -> f64 {
        self.audio.current_time()
    }

    fn set_current_time(&self, seconds: f64) {
        self.audio.set_current_time(seconds);
    }

    fn paused(&self) -> bool {
        self.audio.paused()
    }

    fn play(&self) {
        match self.audio.play() {
            Ok(promise) => {
                // The promise often settles after this handle has been replaced and dropped.
                let src = self.audio.src();
                wasm_bindgen_futures::spawn_local(async move {
                    settle_play(src, JsFuture::from(promise)).await;
                });
            }
            Err(e) => tracing::warn!(error = ?e, "play() threw"),
        }
    }

    fn pause(&self) {
        if let Err(e) = self.audio.pause() {
            tracing::debug!(error = ?e, "pause() threw");
        }
    }

    fn on_loaded_metadata(&self, listener: OneShot<f64>) -> Subscription {
        let audio = self.audio.clone();
        self.listen(
            "loadedmetadata",
            Closure::<dyn FnMut()>::new(move || {
                listener.fire(audio.duration());
            }),
        )
    }

    fn on_ended(&self, listener: OneShot) -> Subscription {
        self.listen(
            "ended",
            Closure::<dyn FnMut()>::new(move || {
                listener.fire(());
            }),
        )
    }
}

/// Wait for a `play()` outcome and log a rejection. Returns whether playback started.
async fn settle_play<T, E: fmt::Debug>(
    src: String,
    outcome: impl Future<Output = Result<T, E>>,
) -> bool {
    match outcome.await {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(src = %src, error = ?err, "play() rejected");
            false
        }
    }
}

/// Stand-in when the browser refuses to create an element: never loads, never plays.
struct InertMedia;

impl MediaElement for InertMedia {
    fn duration(&self) -> f64 {
        f64::NAN
    }

    fn current_time(&self) -> f64 {
        0.0
    }

    fn set_current_time(&self, _seconds: f64) {}

    fn paused(&self) -> bool {
        true
    }

    fn play(&self) {}

    fn pause(&self) {}

    fn on_loaded_metadata(&self, _listener: OneShot<f64>) -> Subscription {
        Subscription::empty()
    }

    fn on_ended(&self, _listener: OneShot) -> Subscription {
        Subscription::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::future;
    use std::pin::pin;
    use std::task::{Context, Poll, Waker};

    fn poll_once<F: Future>(fut: F) -> Poll<F::Output> {
        let mut cx = Context::from_waker(Waker::noop());
        pin!(fut).poll(&mut cx)
    }

    /// Spawned futures must not borrow from the handle that started them.
    fn detached<F: Future + 'static>(fut: F) -> F {
        fut
    }

    #[test]
    fn rejected_play_is_absorbed_without_the_handle() {
        let fut = {
            let src = String::from("sounds/gone.mp3");
            detached(settle_play(src, future::ready(Err::<(), _>("AbortError"))))
        };
        assert_eq!(poll_once(fut), Poll::Ready(false));
    }

    #[test]
    fn started_play_settles_true() {
        let fut = detached(settle_play(
            String::from("sounds/ok.mp3"),
            future::ready(Ok::<_, ()>(())),
        ));
        assert_eq!(poll_once(fut), Poll::Ready(true));
    }

    #[test]
    fn inert_media_stays_idle() {
        let media = InertMedia;
        let fired = Rc::new(Cell::new(false));
        let _sub = {
            let fired = fired.clone();
            media.on_loaded_metadata(OneShot::new(move |_| fired.set(true)))
        };
        media.play();
        media.set_current_time(3.0);

        assert!(media.duration().is_nan());
        assert!(media.paused());
        assert_eq!(media.current_time(), 0.0);
        assert!(!fired.get());
    }
}
