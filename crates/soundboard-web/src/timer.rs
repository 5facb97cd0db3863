use std::time::Duration;

use soundboard::event::Subscription;
use soundboard::widgets::Scheduler;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::Window;

/// `setInterval`-backed repeating timer.
pub struct IntervalScheduler {
    window: Window,
}

impl IntervalScheduler {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl Scheduler for IntervalScheduler {
    fn every(&self, period: Duration, tick: Box<dyn FnMut()>) -> Subscription {
        let callback = Closure::wrap(tick);
        let handle = match self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                interval_ms(period),
            ) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(error = ?e, "setInterval failed");
                return Subscription::empty();
            }
        };
        let window = self.window.clone();
        Subscription::new(move || {
            window.clear_interval_with_handle(handle);
            drop(callback);
        })
    }
}

/// Browser timeout argument: whole milliseconds, at least 1.
fn interval_ms(period: Duration) -> i32 {
    i32::try_from(period.as_millis()).unwrap_or(i32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_ms_clamps_to_browser_range() {
        assert_eq!(interval_ms(Duration::from_millis(200)), 200);
        assert_eq!(interval_ms(Duration::ZERO), 1);
        assert_eq!(interval_ms(Duration::from_secs(u64::MAX / 1000)), i32::MAX);
    }
}
