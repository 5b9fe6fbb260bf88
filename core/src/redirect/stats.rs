use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RedirectStats {
    captured_chunks: AtomicU64,
    captured_bytes: AtomicU64,
    dropped_chunks: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedirectStatsSnapshot {
    pub captured_chunks: u64,
    pub captured_bytes: u64,
    /// Chunks that failed to decode or could not be queued.
    pub dropped_chunks: u64,
}

impl RedirectStats {
    pub(crate) fn record_captured(&self, bytes: usize) {
        self.captured_chunks.fetch_add(1, Ordering::Relaxed);
        self.captured_bytes
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped_chunks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RedirectStatsSnapshot {
        RedirectStatsSnapshot {
            captured_chunks: self.captured_chunks.load(Ordering::Relaxed),
            captured_bytes: self.captured_bytes.load(Ordering::Relaxed),
            dropped_chunks: self.dropped_chunks.load(Ordering::Relaxed),
        }
    }
}
