//! Tracing layer that forwards formatted events to the TUI log panel.
//!
//! The terminal is in raw mode while the UI runs, so events go over a channel
//! instead of stderr.

use crossbeam_channel::Sender;
use tracing::Subscriber;
use tracing::field::{Field, Visit};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

pub struct LogLayer {
    lines: Sender<String>,
}

impl LogLayer {
    pub fn new(lines: Sender<String>) -> Self {
        Self { lines }
    }
}

impl<S> Layer<S> for LogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let meta = event.metadata();
        let line = visitor.into_line(&meta.level().to_string(), meta.target());
        // UI gone: nothing left to show the line.
        let _ = self.lines.send(line);
    }
}

#[derive(Default)]
struct LineVisitor {
    message: Option<String>,
    fields: Vec<String>,
}

impl LineVisitor {
    fn into_line(self, level: &str, target: &str) -> String {
        let mut line = format!("{level:>5} {target}: {}", self.message.unwrap_or_default());
        for field in self.fields {
            line.push(' ');
            line.push_str(&field);
        }
        line
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let formatted = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(formatted.trim_matches('"').to_string());
        } else {
            self.fields.push(format!("{}={formatted}", field.name()));
        }
    }
}
