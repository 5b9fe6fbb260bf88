use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::dispatch::DispatchQueue;
use crate::error::RedirectError;
use crate::stream::{StreamHook, StreamId, WriteFn};

use super::stats::{RedirectStats, RedirectStatsSnapshot};

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Token returned by [`StreamRedirector::add_listener`]; its only use is
/// [`StreamRedirector::remove_listener`].
///
/// Ids are unique for the whole process, so two listeners with identical
/// bodies are still distinct, and a handle from one stream is unknown to the
/// other. Dropping a handle does not unregister anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    id: u64,
    stream: StreamId,
}

impl ListenerHandle {
    fn next(stream: StreamId) -> Self {
        Self {
            id: NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed),
            stream,
        }
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }
}

pub type Listener = Arc<dyn Fn(&str) + Send + Sync>;

struct State {
    listeners: Vec<(ListenerHandle, Listener)>,
    hook: Box<dyn StreamHook>,
}

struct Shared {
    state: Mutex<State>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Captures everything written to one output stream and broadcasts it, as
/// text, to registered listeners on the designated execution context.
///
/// Interception is installed exactly while at least one listener is
/// registered.
pub struct StreamRedirector {
    stream: StreamId,
    shared: Arc<Shared>,
    capture: WriteFn,
    stats: Arc<RedirectStats>,
}

impl StreamRedirector {
    pub fn new(stream: StreamId, hook: Box<dyn StreamHook>, queue: DispatchQueue) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                listeners: Vec::new(),
                hook,
            }),
        });
        let stats = Arc::new(RedirectStats::default());
        let capture = capture_fn(stream, Arc::downgrade(&shared), queue, stats.clone());
        Self {
            stream,
            shared,
            capture,
            stats,
        }
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    /// Registers `f`; the first listener installs interception.
    ///
    /// Only fails when the hook cannot be installed (descriptor exhaustion
    /// and the like). The registry is left untouched in that case.
    pub fn add_listener<F>(&self, f: F) -> Result<ListenerHandle, RedirectError>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let handle = ListenerHandle::next(self.stream);
        let mut state = self.shared.lock();
        if state.listeners.is_empty() {
            state.hook.install(self.capture.clone())?;
            tracing::info!(target: "outfeed.redirect", stream = %self.stream, "interception installed");
        }
        state.listeners.push((handle, Arc::new(f)));
        tracing::debug!(
            target: "outfeed.redirect",
            stream = %self.stream,
            listener = handle.id,
            listeners = state.listeners.len(),
            "listener added"
        );
        Ok(handle)
    }

    /// Unregisters the listener behind `handle`; the last one out removes
    /// interception. Unknown handles are ignored.
    pub fn remove_listener(&self, handle: ListenerHandle) {
        let mut state = self.shared.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(h, _)| *h != handle);
        if state.listeners.len() == before {
            return;
        }
        tracing::debug!(
            target: "outfeed.redirect",
            stream = %self.stream,
            listener = handle.id,
            listeners = state.listeners.len(),
            "listener removed"
        );
        if state.listeners.is_empty() {
            match state.hook.uninstall() {
                Ok(()) => tracing::info!(
                    target: "outfeed.redirect",
                    stream = %self.stream,
                    "interception removed"
                ),
                Err(e) => tracing::warn!(
                    target: "outfeed.redirect",
                    stream = %self.stream,
                    error = %e,
                    "restoring original entry point failed"
                ),
            }
        }
    }

    pub fn is_redirecting(&self) -> bool {
        self.shared.lock().hook.is_installed()
    }

    pub fn listener_count(&self) -> usize {
        self.shared.lock().listeners.len()
    }

    pub fn stats(&self) -> RedirectStatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for StreamRedirector {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.listeners.clear();
        if let Err(e) = state.hook.uninstall() {
            tracing::warn!(
                target: "outfeed.redirect",
                stream = %self.stream,
                error = %e,
                "restoring original entry point on drop failed"
            );
        }
    }
}

/// The function installed at the stream's write entry point. Runs on the
/// producer's thread; never touches the registry lock.
fn capture_fn(
    stream: StreamId,
    shared: Weak<Shared>,
    queue: DispatchQueue,
    stats: Arc<RedirectStats>,
) -> WriteFn {
    Arc::new(move |buf: &[u8]| {
        if buf.is_empty() {
            return 0;
        }
        let Ok(text) = String::from_utf8(buf.to_vec()) else {
            stats.record_dropped();
            return buf.len();
        };
        stats.record_captured(buf.len());

        let shared = shared.clone();
        if !queue.dispatch(move || broadcast(stream, &shared, &text)) {
            stats.record_dropped();
        }
        buf.len()
    })
}

fn broadcast(stream: StreamId, shared: &Weak<Shared>, text: &str) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let snapshot: Vec<(ListenerHandle, Listener)> = shared.lock().listeners.clone();
    drop(shared);

    for (handle, listener) in snapshot {
        if catch_unwind(AssertUnwindSafe(|| listener(text))).is_err() {
            tracing::warn!(
                target: "outfeed.redirect",
                stream = %stream,
                listener = handle.id,
                "listener panicked"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::main_queue;

    struct FailingHook;

    impl StreamHook for FailingHook {
        fn install(&mut self, _capture: WriteFn) -> Result<(), RedirectError> {
            Err(RedirectError::Unsupported("no hook here".into()))
        }

        fn uninstall(&mut self) -> Result<(), RedirectError> {
            Ok(())
        }

        fn is_installed(&self) -> bool {
            false
        }
    }

    #[derive(Default)]
    struct FlagHook {
        installed: bool,
    }

    impl StreamHook for FlagHook {
        fn install(&mut self, _capture: WriteFn) -> Result<(), RedirectError> {
            self.installed = true;
            Ok(())
        }

        fn uninstall(&mut self) -> Result<(), RedirectError> {
            self.installed = false;
            Ok(())
        }

        fn is_installed(&self) -> bool {
            self.installed
        }
    }

    /// Installs fine but can never be removed.
    struct StuckHook {
        uninstall_calls: Arc<AtomicU64>,
    }

    impl StreamHook for StuckHook {
        fn install(&mut self, _capture: WriteFn) -> Result<(), RedirectError> {
            Ok(())
        }

        fn uninstall(&mut self) -> Result<(), RedirectError> {
            self.uninstall_calls.fetch_add(1, Ordering::Relaxed);
            Err(RedirectError::Unsupported("stuck".into()))
        }

        fn is_installed(&self) -> bool {
            true
        }
    }

    #[derive(Clone, Default)]
    struct LogBuf(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn drop_reports_failed_restore() {
        let logs = LogBuf::default();
        let sink = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .finish();

        let calls = Arc::new(AtomicU64::new(0));
        let (queue, _main) = main_queue();
        let hook = StuckHook {
            uninstall_calls: calls.clone(),
        };
        let r = StreamRedirector::new(StreamId::Stderr, Box::new(hook), queue);
        r.add_listener(|_| {}).unwrap();

        tracing::subscriber::with_default(subscriber, || drop(r));

        assert_eq!(calls.load(Ordering::Relaxed), 1);
        let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("restoring original entry point on drop failed"));
        assert!(text.contains("stuck"));
    }

    #[test]
    fn handles_are_distinct_for_identical_listeners() {
        let (queue, _main) = main_queue();
        let r = StreamRedirector::new(StreamId::Stdout, Box::<FlagHook>::default(), queue);
        let a = r.add_listener(|_| {}).unwrap();
        let b = r.add_listener(|_| {}).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.stream(), StreamId::Stdout);

        r.remove_listener(a);
        assert_eq!(r.listener_count(), 1);
        assert!(r.is_redirecting());
    }

    #[test]
    fn failed_install_leaves_registry_empty() {
        let (queue, _main) = main_queue();
        let r = StreamRedirector::new(StreamId::Stderr, Box::new(FailingHook), queue);
        let res = r.add_listener(|_| {});
        assert!(matches!(res, Err(RedirectError::Unsupported(_))));
        assert_eq!(r.listener_count(), 0);
        assert!(!r.is_redirecting());
    }

    #[test]
    fn empty_write_reports_zero_and_queues_nothing() {
        let (queue, mut main) = main_queue();
        let r = StreamRedirector::new(StreamId::Stdout, Box::<FlagHook>::default(), queue);
        r.add_listener(|_| panic!("must not be called")).unwrap();

        assert_eq!((r.capture)(&[]), 0);
        assert_eq!(main.run_pending(), 0);
        assert_eq!(r.stats(), RedirectStatsSnapshot::default());
    }

    #[test]
    fn invalid_utf8_is_dropped_but_reported_as_written() {
        let (queue, mut main) = main_queue();
        let r = StreamRedirector::new(StreamId::Stdout, Box::<FlagHook>::default(), queue);
        r.add_listener(|_| panic!("must not be called")).unwrap();

        assert_eq!((r.capture)(&[0xff, 0xfe, 0xfd]), 3);
        assert_eq!(main.run_pending(), 0);
        assert_eq!(r.stats().dropped_chunks, 1);
        assert_eq!(r.stats().captured_chunks, 0);
    }
}
