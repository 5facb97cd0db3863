use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use soundboard::Soundboard;
use soundboard::media::MediaBackend;
use soundboard::page::Trigger;
use soundboard::scheduler::TickScheduler;
use soundboard::widgets::Scheduler;
use soundboard_player::NativeBackend;

use crate::config::Settings;

use super::page::TuiPage;
use super::render;

/// Seconds moved by one press of a seek key.
const SEEK_STEP_SECS: f64 = 5.0;
const LOG_CAP: usize = 500;

/// Launch the TUI on the native backend and run until the user quits.
pub(crate) fn run_tui(
    settings: Settings,
    sounds: Vec<String>,
    log_rx: Receiver<String>,
) -> Result<()> {
    let backend = Rc::new(
        NativeBackend::new(settings.device.as_deref(), settings.playback.clone())
            .context("open audio output")?,
    );
    let scheduler = TickScheduler::new();

    let mut app = App::new(
        &settings,
        sounds,
        backend.clone(),
        Rc::new(scheduler.clone()),
        log_rx,
    );

    let mut term = init_terminal()?;
    let result = ui_loop(&mut term, &mut app, &backend, &scheduler);
    restore_terminal(&mut term)?;
    result
}

/// One row entry: a sound, or the stop control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Button {
    pub(crate) id: String,
    pub(crate) text: String,
}

/// In-memory UI state for rendering + interaction.
pub(crate) struct App {
    pub(crate) buttons: Vec<Button>,
    pub(crate) selected: usize,
    pub(crate) page: Rc<TuiPage>,
    pub(crate) sounds_dir: String,
    board: Soundboard,

    pub(crate) logs_open: bool,
    pub(crate) logs: VecDeque<String>,
    pub(crate) logs_scroll: usize,
    log_rx: Receiver<String>,
}

impl App {
    fn new(
        settings: &Settings,
        sounds: Vec<String>,
        backend: Rc<dyn MediaBackend>,
        scheduler: Rc<dyn Scheduler>,
        log_rx: Receiver<String>,
    ) -> Self {
        let config = &settings.board;
        let mut buttons: Vec<Button> = sounds
            .into_iter()
            .enumerate()
            .map(|(n, name)| Button {
                id: format!("sound-{n}"),
                text: name,
            })
            .collect();
        buttons.push(Button {
            id: config.stop_id.clone(),
            text: "Stop".to_string(),
        });

        let page = Rc::new(TuiPage::new(buttons.iter().map(|b| b.id.as_str())));
        let board = Soundboard::mount(page.as_ref(), backend, scheduler, config)
            .unwrap_or_else(|never| match never {});
        tracing::debug!(order = ?page.order(), "page laid out");

        Self {
            buttons,
            selected: 0,
            page,
            sounds_dir: config.sounds_dir.clone(),
            board,
            logs_open: false,
            logs: VecDeque::new(),
            logs_scroll: 0,
            log_rx,
        }
    }

    pub(crate) fn now_playing(&self) -> Option<&str> {
        self.board.current()
    }

    fn select_next(&mut self) {
        if !self.buttons.is_empty() {
            self.selected = (self.selected + 1) % self.buttons.len();
        }
    }

    fn select_prev(&mut self) {
        if !self.buttons.is_empty() {
            self.selected = self
                .selected
                .checked_sub(1)
                .unwrap_or(self.buttons.len() - 1);
        }
    }

    /// Act as if the selected button was clicked.
    fn click_selected(&mut self) {
        let Some(button) = self.buttons.get(self.selected) else {
            return;
        };
        let trigger = self.board.trigger_for(Some(&button.id), &button.text);
        self.board.activate(&trigger);
    }

    fn stop(&mut self) {
        self.board.activate(&Trigger::Stop);
    }

    fn seek_by(&mut self, delta: f64) {
        if let Some(seek) = self.page.seek() {
            seek.nudge(delta);
        }
    }

    fn toggle_logs(&mut self) {
        self.logs_open = !self.logs_open;
        if !self.logs_open {
            self.logs_scroll = 0;
        }
    }

    fn scroll_logs_up(&mut self) {
        let max = self.logs.len().saturating_sub(1);
        self.logs_scroll = (self.logs_scroll + 1).min(max);
    }

    fn scroll_logs_down(&mut self) {
        self.logs_scroll = self.logs_scroll.saturating_sub(1);
    }

    fn drain_logs(&mut self) {
        while let Ok(line) = self.log_rx.try_recv() {
            if self.logs.len() >= LOG_CAP {
                self.logs.pop_front();
            }
            self.logs.push_back(line);
        }
    }

    /// Apply one key press. Returns `false` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.logs_open {
            match code {
                KeyCode::Char('q') => return false,
                KeyCode::Esc | KeyCode::Char('l') => self.toggle_logs(),
                KeyCode::Up => self.scroll_logs_up(),
                KeyCode::Down => self.scroll_logs_down(),
                _ => {}
            }
            return true;
        }
        match code {
            KeyCode::Char('q') => return false,
            KeyCode::Left | KeyCode::Up => self.select_prev(),
            KeyCode::Right | KeyCode::Down => self.select_next(),
            KeyCode::Enter | KeyCode::Char(' ') => self.click_selected(),
            KeyCode::Char('s') => self.stop(),
            KeyCode::Char('[') => self.seek_by(-SEEK_STEP_SECS),
            KeyCode::Char(']') => self.seek_by(SEEK_STEP_SECS),
            KeyCode::Char('l') => self.toggle_logs(),
            _ => {}
        }
        true
    }
}

fn ui_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    backend: &NativeBackend,
    scheduler: &TickScheduler,
) -> Result<()> {
    let tick = Duration::from_millis(33);
    let started = Instant::now();

    loop {
        backend.dispatch();
        scheduler.run_due(started.elapsed());
        app.drain_logs();
        terminal.draw(|f| render::draw(f, app))?;

        if event::poll(tick).context("poll terminal events")? {
            if let CEvent::Key(k) = event::read().context("read terminal event")? {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                // Raw mode delivers Ctrl+C as a key, not SIGINT.
                let interrupt = k.modifiers.contains(KeyModifiers::CONTROL)
                    && k.code == KeyCode::Char('c');
                if interrupt || !app.handle_key(k.code) {
                    app.stop();
                    return Ok(());
                }
            }
        }
    }
}

fn init_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("create terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use soundboard::PLACEHOLDER;
    use soundboard::SoundboardConfig;
    use soundboard::media::MediaElement;
    use soundboard::testing::FakeBackend;
    use soundboard_player::PlaybackConfig;

    fn settings() -> Settings {
        Settings {
            board: SoundboardConfig::default(),
            playback: PlaybackConfig::default(),
            device: None,
        }
    }

    fn app_with(sounds: &[&str]) -> (App, Rc<FakeBackend>, TickScheduler) {
        let backend = Rc::new(FakeBackend::new());
        let scheduler = TickScheduler::new();
        let (_log_tx, log_rx) = unbounded::<String>();
        let app = App::new(
            &settings(),
            sounds.iter().map(|s| s.to_string()).collect(),
            backend.clone(),
            Rc::new(scheduler.clone()),
            log_rx,
        );
        (app, backend, scheduler)
    }

    #[test]
    fn stop_button_is_last_and_widgets_follow_it() {
        let (app, _, _) = app_with(&["bell", "horn"]);
        let ids: Vec<&str> = app.buttons.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["sound-0", "sound-1", "stp"]);
        assert_eq!(
            app.page.order(),
            vec!["sound-0", "sound-1", "stp", "seek", "time-remaining"]
        );
        assert_eq!(app.page.label().unwrap().text(), PLACEHOLDER);
        assert!(app.page.seek().unwrap().disabled());
    }

    #[test]
    fn enter_plays_selected_sound() {
        let (mut app, backend, sched) = app_with(&["bell", "horn"]);
        app.handle_key(KeyCode::Down);
        assert!(app.handle_key(KeyCode::Enter));

        assert_eq!(app.now_playing(), Some("horn"));
        assert_eq!(backend.last().unwrap().source(), "sounds/horn.mp3");
        assert_eq!(sched.active(), 1);
    }

    #[test]
    fn sound_named_like_stop_control_still_plays() {
        let (mut app, backend, _) = app_with(&["stp"]);
        assert_eq!(app.buttons.len(), 2);
        assert!(app.handle_key(KeyCode::Enter));

        assert_eq!(app.now_playing(), Some("stp"));
        assert_eq!(backend.last().unwrap().source(), "sounds/stp.mp3");
    }

    #[test]
    fn selection_wraps_in_both_directions() {
        let (mut app, _, _) = app_with(&["bell"]);
        app.handle_key(KeyCode::Left);
        assert_eq!(app.selected, 1);
        app.handle_key(KeyCode::Right);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn clicking_stop_button_and_stop_key_both_stop() {
        let (mut app, _, sched) = app_with(&["bell"]);
        app.handle_key(KeyCode::Enter);
        app.handle_key(KeyCode::Right);
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.now_playing(), None);
        assert_eq!(sched.active(), 0);

        app.handle_key(KeyCode::Left);
        app.handle_key(KeyCode::Enter);
        assert!(app.handle_key(KeyCode::Char('s')));
        assert_eq!(app.now_playing(), None);
    }

    #[test]
    fn seek_keys_move_playback_once_metadata_is_known() {
        let (mut app, backend, sched) = app_with(&["bell"]);
        app.handle_key(KeyCode::Enter);
        let media = backend.last().unwrap();

        app.handle_key(KeyCode::Char(']'));
        assert_eq!(media.current_time(), 0.0);

        media.load_metadata(12.0);
        app.handle_key(KeyCode::Char(']'));
        assert_eq!(media.current_time(), 5.0);
        assert_eq!(app.page.label().unwrap().text(), "0:07");

        sched.advance(Duration::from_millis(200));
        assert_eq!(app.page.seek().unwrap().value(), 5.0);
    }

    #[test]
    fn log_panel_captures_keys_until_closed() {
        let (mut app, _, _) = app_with(&["bell"]);
        app.logs.extend(["a".to_string(), "b".to_string()]);
        app.handle_key(KeyCode::Char('l'));
        assert!(app.logs_open);

        app.handle_key(KeyCode::Up);
        app.handle_key(KeyCode::Up);
        assert_eq!(app.logs_scroll, 1);
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.now_playing(), None);

        app.handle_key(KeyCode::Esc);
        assert!(!app.logs_open);
        assert_eq!(app.logs_scroll, 0);
    }

    #[test]
    fn q_quits_from_any_mode() {
        let (mut app, _, _) = app_with(&[]);
        assert!(!app.handle_key(KeyCode::Char('q')));
        app.handle_key(KeyCode::Char('l'));
        assert!(!app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn drained_logs_are_capped() {
        let (tx, rx) = unbounded::<String>();
        let (mut app, _, _) = app_with(&[]);
        app.log_rx = rx;
        for i in 0..LOG_CAP + 10 {
            tx.send(format!("line {i}")).unwrap();
        }
        app.drain_logs();
        assert_eq!(app.logs.len(), LOG_CAP);
        assert_eq!(app.logs.front().map(String::as_str), Some("line 10"));
    }
}
