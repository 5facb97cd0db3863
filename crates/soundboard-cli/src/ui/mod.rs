//! Ratatui front end.
//!
//! Keys:
//! - Left/Right (or Up/Down): move selection
//! - Enter/Space: click the selected button
//! - s: stop
//! - [ / ]: seek back / forward five seconds
//! - l: toggle the log panel
//! - q: quit

mod app;
mod page;
mod render;

pub(crate) use app::run_tui;
