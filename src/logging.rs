//! Tracing setup.  The terminal is owned by the game while it runs, so log
//! output is held in memory and written to stderr once the screen has been
//! restored.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::error::GameResult;

const DEFAULT_FILTER: &str = "info";

/// Log lines captured while the terminal belongs to the game.  Cloned
/// handles share one buffer.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Drain everything captured so far.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.lock())
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install the global subscriber.  `RUST_LOG` overrides the default
/// `info` filter.  Returns the buffer to flush on exit.
pub fn init() -> GameResult<LogBuffer> {
    let writer = LogBuffer::default();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(writer.clone())
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    Ok(writer)
}
