//! Operator-facing console output
//!
//! Every status line of the tool goes through one [`Logger`]. The logger is
//! built once at startup and cloned into each component; clones share a
//! single sink guarded by a mutex, and each line is written with one
//! `write_all`, so lines from concurrent workers never interleave.

use colored::{Color, Colorize};
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Severity of a console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn prefix(&self, headless: bool) -> String {
        match (self, headless) {
            (Level::Info, true) => "INFO ".to_string(),
            (Level::Warn, true) => "WARN ".to_string(),
            (Level::Error, true) => "ERR ".to_string(),
            (Level::Info, false) => "INFO  ".cyan().to_string(),
            (Level::Warn, false) => "WARN  ".yellow().to_string(),
            (Level::Error, false) => "ERR   ".red().to_string(),
        }
    }
}

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Console logger with an optional headless (no color) mode
#[derive(Clone)]
pub struct Logger {
    headless: bool,
    sink: Sink,
}

impl Logger {
    /// Logger writing to standard output
    pub fn stdout(headless: bool) -> Self {
        Self::with_writer(headless, io::stdout())
    }

    /// Logger writing to an arbitrary sink
    pub fn with_writer<W: Write + Send + 'static>(headless: bool, writer: W) -> Self {
        Self {
            headless,
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Logger writing into memory, returned together with a handle to read it back
    pub fn buffered(headless: bool) -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::with_writer(headless, buffer.clone()), buffer)
    }

    pub fn is_headless(&self) -> bool {
        self.headless
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.emit(Some(Level::Info), message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.emit(Some(Level::Warn), message.as_ref());
    }

    pub fn err(&self, message: impl AsRef<str>) {
        self.emit(Some(Level::Error), message.as_ref());
    }

    /// Unprefixed line (banners, menus)
    pub fn line(&self, message: impl AsRef<str>) {
        self.emit(None, message.as_ref());
    }

    /// Color a fragment, or leave it plain in headless mode
    pub fn paint(&self, text: impl fmt::Display, color: Color) -> String {
        if self.headless {
            text.to_string()
        } else {
            text.to_string().color(color).to_string()
        }
    }

    /// Secondary information such as worker tags and bullets
    pub fn dim(&self, text: impl fmt::Display) -> String {
        self.paint(text, Color::BrightBlack)
    }

    /// Positive results, addresses, names
    pub fn good(&self, text: impl fmt::Display) -> String {
        self.paint(text, Color::BrightGreen)
    }

    /// Configuration values
    pub fn value(&self, text: impl fmt::Display) -> String {
        self.paint(text, Color::BrightBlue)
    }

    pub fn accent(&self, text: impl fmt::Display) -> String {
        self.paint(text, Color::Cyan)
    }

    pub fn bad(&self, text: impl fmt::Display) -> String {
        self.paint(text, Color::BrightRed)
    }

    pub fn notice(&self, text: impl fmt::Display) -> String {
        self.paint(text, Color::BrightYellow)
    }

    fn emit(&self, level: Option<Level>, message: &str) {
        if self.headless && message.is_empty() && level.is_some() {
            return;
        }

        let mut line = match level {
            Some(level) => level.prefix(self.headless),
            None => String::new(),
        };
        line.push_str(message);
        line.push('\n');

        let mut sink = lock(&self.sink);
        // A closed stdout is not worth crashing a worker over
        let _ = sink.write_all(line.as_bytes());
        let _ = sink.flush();
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("headless", &self.headless)
            .finish_non_exhaustive()
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory sink that can be read back while the logger is still in use
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&lock(&self.inner)).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.inner).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
