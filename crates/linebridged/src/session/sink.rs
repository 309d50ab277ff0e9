//! Output side of a session.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use linebridge_schema::{EventSet, TypeRegistry, render_event};
use tracing::trace;

use super::SESSION_TARGET;

/// Writes event lines to a client.
///
/// Clones share one writer. The session thread and upstream drain threads
/// both emit through it, so every line is written and flushed while the
/// lock is held and lines never interleave.
#[derive(Clone)]
pub struct EventSink {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    registry: Arc<TypeRegistry>,
}

impl EventSink {
    /// Wraps `writer`; events are encoded with descriptors from `registry`.
    pub fn new(writer: impl Write + Send + 'static, registry: Arc<TypeRegistry>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            registry,
        }
    }

    /// Renders and writes one event.
    ///
    /// # Errors
    ///
    /// Returns the write error when the client is gone.
    pub fn emit<E: EventSet>(&self, event: E) -> io::Result<()> {
        let line = render_event(event, &self.registry);
        self.write_line(&line)
    }

    /// Writes `line` followed by a newline and flushes.
    ///
    /// # Errors
    ///
    /// Returns the write error when the client is gone.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        trace!(target: SESSION_TARGET, line, "emitting");
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("EventSink").finish_non_exhaustive()
    }
}
