use std::io::Write;
use std::sync::{Arc, PoisonError, RwLock};

use super::traits::WriteFn;
use super::types::StreamId;

/// Swappable write entry point of one output stream.
///
/// Everything written through a port (directly or via [`PortWriter`]) goes to
/// whichever entry point is currently installed. A fresh port forwards to the
/// real OS stream.
pub struct StreamPort {
    stream: StreamId,
    entry: RwLock<WriteFn>,
}

impl StreamPort {
    pub fn new(stream: StreamId) -> Arc<Self> {
        Self::with_entry(stream, os_entry(stream))
    }

    pub fn with_entry(stream: StreamId, entry: WriteFn) -> Arc<Self> {
        Arc::new(Self {
            stream,
            entry: RwLock::new(entry),
        })
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    /// Writes `buf` through the current entry point and returns the number of
    /// bytes it accepted.
    pub fn write(&self, buf: &[u8]) -> usize {
        // Clone the entry out so a concurrent swap never waits on a slow sink.
        let entry = self.current();
        entry(buf)
    }

    pub fn current(&self) -> WriteFn {
        self.entry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the entry point and returns the previous one.
    pub fn swap(&self, entry: WriteFn) -> WriteFn {
        let mut g = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *g, entry)
    }

    pub fn writer(self: &Arc<Self>) -> PortWriter {
        PortWriter { port: self.clone() }
    }
}

/// Entry point that hands bytes to the process's real stdout/stderr.
pub fn os_entry(stream: StreamId) -> WriteFn {
    Arc::new(move |buf: &[u8]| {
        let res = match stream {
            StreamId::Stdout => std::io::stdout().lock().write_all(buf),
            StreamId::Stderr => std::io::stderr().lock().write_all(buf),
        };
        match res {
            Ok(()) => buf.len(),
            Err(_) => 0,
        }
    })
}

/// `io::Write` adapter over a [`StreamPort`].
#[derive(Clone)]
pub struct PortWriter {
    port: Arc<StreamPort>,
}

impl Write for PortWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(self.port.write(buf))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.port.stream() {
            StreamId::Stdout => std::io::stdout().flush(),
            StreamId::Stderr => std::io::stderr().flush(),
        }
    }
}
