//! Playback controller: owns the single active media handle.

use std::rc::Rc;

use crate::assets::AssetResolver;
use crate::event::{Listener, OneShot};
use crate::media::{MediaBackend, MediaElement};
use crate::seek::SeekSynchronizer;

/// The sound currently considered playing, with its notification subscriptions.
struct ActiveHandle {
    name: String,
    media: Rc<dyn MediaElement>,
    metadata: Listener<f64>,
    ended: Listener<()>,
}

impl ActiveHandle {
    /// Silence the handle and detach its notifications.
    fn halt(self) {
        self.metadata.release();
        self.ended.release();
        self.media.pause();
        self.media.set_current_time(0.0);
    }
}

/// Starts, stops and replaces playback. At most one handle is current.
pub struct PlaybackController {
    backend: Rc<dyn MediaBackend>,
    assets: AssetResolver,
    sync: SeekSynchronizer,
    current: Option<ActiveHandle>,
}

impl PlaybackController {
    pub fn new(backend: Rc<dyn MediaBackend>, assets: AssetResolver, sync: SeekSynchronizer) -> Self {
        Self {
            backend,
            assets,
            sync,
            current: None,
        }
    }

    /// Identifier of the current sound, if any.
    pub fn current(&self) -> Option<&str> {
        self.current.as_ref().map(|h| h.name.as_str())
    }

    pub fn synchronizer(&self) -> &SeekSynchronizer {
        &self.sync
    }

    /// Replace whatever is playing with `name`.
    ///
    /// The previous handle's listeners and the seek binding are released before the
    /// new handle is opened, so nothing from the superseded sound can reach the widgets.
    pub fn play(&mut self, name: &str) {
        if let Some(previous) = self.current.take() {
            tracing::debug!(name = %previous.name, "superseding sound");
            previous.halt();
        }
        self.sync.unbind();

        let source = self.assets.resolve(name);
        let media = self.backend.open(&source);

        let metadata = {
            let sync = self.sync.downgrade();
            let name = name.to_string();
            let shot = OneShot::new(move |duration: f64| {
                tracing::debug!(name = %name, duration, "metadata ready");
                if let Some(sync) = sync.upgrade() {
                    sync.show_duration(duration);
                }
            });
            let subscription = media.on_loaded_metadata(shot.clone());
            Listener::new(shot, subscription)
        };

        self.sync.bind(media.clone());

        let ended = {
            let sync = self.sync.downgrade();
            let name = name.to_string();
            let shot = OneShot::new(move |()| {
                tracing::debug!(name = %name, "playback ended");
                if let Some(sync) = sync.upgrade() {
                    sync.unbind();
                }
            });
            let subscription = media.on_ended(shot.clone());
            Listener::new(shot, subscription)
        };

        tracing::info!(name = %name, source = %source, "play");
        media.play();

        self.current = Some(ActiveHandle {
            name: name.to_string(),
            media,
            metadata,
            ended,
        });
    }

    /// Stop the current sound, if any, and restore the idle display. Idempotent.
    pub fn stop(&mut self) {
        if let Some(previous) = self.current.take() {
            tracing::info!(name = %previous.name, "stop");
            previous.halt();
        }
        self.sync.unbind();
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.halt();
        }
    }
}
