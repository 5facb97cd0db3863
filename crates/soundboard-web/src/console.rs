//! `tracing` output to the browser console.

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;

/// Which `console` method a line goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Method {
    Error,
    Warn,
    Info,
    Debug,
}

impl Method {
    fn for_level(level: &Level) -> Self {
        match *level {
            Level::ERROR => Method::Error,
            Level::WARN => Method::Warn,
            Level::INFO => Method::Info,
            _ => Method::Debug,
        }
    }
}

/// Buffers one formatted event and emits it when dropped.
pub struct ConsoleWriter {
    method: Method,
    buf: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let line = String::from_utf8_lossy(&self.buf);
        let line = line.trim_end();
        if line.is_empty() {
            return;
        }
        let value = line.into();
        match self.method {
            Method::Error => web_sys::console::error_1(&value),
            Method::Warn => web_sys::console::warn_1(&value),
            Method::Info => web_sys::console::info_1(&value),
            Method::Debug => web_sys::console::debug_1(&value),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            method: Method::Info,
            buf: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            method: Method::for_level(meta.level()),
            buf: Vec::new(),
        }
    }
}

/// Install a global subscriber writing to the console. Later calls are no-ops.
pub fn init(max_level: Level) {
    let installed = tracing_subscriber::fmt()
        .with_writer(ConsoleMakeWriter)
        .with_max_level(max_level)
        .without_time()
        .try_init();
    if installed.is_err() {
        tracing::debug!("console logging already installed");
    }
}
