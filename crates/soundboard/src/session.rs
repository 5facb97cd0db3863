//! Startup wiring: provision widgets, build the synchronizer and controller.

use std::rc::Rc;

use crate::assets::AssetResolver;
use crate::config::SoundboardConfig;
use crate::controller::PlaybackController;
use crate::media::MediaBackend;
use crate::page::{self, Trigger, WidgetHost};
use crate::seek::SeekSynchronizer;
use crate::widgets::Scheduler;

/// A mounted soundboard. Hosts keep one per page and route button clicks to it.
pub struct Soundboard {
    controller: PlaybackController,
    stop_id: String,
}

impl Soundboard {
    /// Provision the widgets on `host`, put them in the idle state, and build the session.
    pub fn mount<H: WidgetHost>(
        host: &H,
        backend: Rc<dyn MediaBackend>,
        scheduler: Rc<dyn Scheduler>,
        config: &SoundboardConfig,
    ) -> Result<Self, H::Error> {
        let widgets = page::provision(host, config)?;
        let sync = SeekSynchronizer::new(widgets, scheduler, config.poll_interval());
        sync.unbind();
        let controller =
            PlaybackController::new(backend, AssetResolver::from_config(config), sync);
        tracing::debug!(
            sounds_dir = %config.sounds_dir,
            poll_ms = config.poll_interval_ms,
            "soundboard mounted"
        );
        Ok(Self {
            controller,
            stop_id: config.stop_id.clone(),
        })
    }

    pub fn play(&mut self, name: &str) {
        self.controller.play(name);
    }

    pub fn stop(&mut self) {
        self.controller.stop();
    }

    pub fn current(&self) -> Option<&str> {
        self.controller.current()
    }

    pub fn is_bound(&self) -> bool {
        self.controller.synchronizer().is_bound()
    }

    /// Classify a button the way this session's page is laid out.
    pub fn trigger_for(&self, id: Option<&str>, text: &str) -> Trigger {
        page::classify_button(id, text, &self.stop_id)
    }

    pub fn activate(&mut self, trigger: &Trigger) {
        match trigger {
            Trigger::Play(name) => self.play(name),
            Trigger::Stop => self.stop(),
        }
    }
}
