use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{JoinHandle, ThreadId};

use tokio::sync::{mpsc, oneshot};

use crate::error::RedirectError;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Owner {
    thread: Mutex<Option<ThreadId>>,
}

impl Owner {
    fn claim(&self) {
        let mut g = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        *g = Some(std::thread::current().id());
    }

    fn release(&self) {
        let mut g = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        *g = None;
    }

    fn is_current(&self) -> bool {
        let g = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        *g == Some(std::thread::current().id())
    }
}

/// Producer side of the designated execution context.
///
/// Tasks run one at a time, in the order they were dispatched, on whichever
/// thread drives the paired [`MainLoop`].
#[derive(Clone)]
pub struct DispatchQueue {
    tx: mpsc::UnboundedSender<Task>,
    owner: Arc<Owner>,
}

/// Consumer side of the designated execution context.
pub struct MainLoop {
    rx: mpsc::UnboundedReceiver<Task>,
    owner: Arc<Owner>,
}

/// Dedicated thread running a [`MainLoop`].
pub struct MainThread {
    handle: JoinHandle<()>,
}

pub fn main_queue() -> (DispatchQueue, MainLoop) {
    let (tx, rx) = mpsc::unbounded_channel();
    let owner = Arc::new(Owner::default());
    (
        DispatchQueue {
            tx,
            owner: owner.clone(),
        },
        MainLoop { rx, owner },
    )
}

impl DispatchQueue {
    /// Fire-and-forget. Returns false if the loop has gone away.
    pub fn dispatch<F>(&self, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send(Box::new(f)).is_ok()
    }

    /// True when called from the thread currently driving the loop.
    pub fn is_current(&self) -> bool {
        self.owner.is_current()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Runs `f` on the context and waits for its result. Runs inline when
    /// already on the context.
    ///
    /// Must not be called from inside an async runtime; use
    /// [`DispatchQueue::barrier_async`] there.
    pub fn sync<F, R>(&self, f: F) -> Result<R, RedirectError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_current() {
            return Ok(f());
        }
        let (tx, rx) = oneshot::channel();
        if !self.dispatch(move || {
            let _ = tx.send(f());
        }) {
            return Err(RedirectError::QueueClosed);
        }
        rx.blocking_recv().map_err(|_| RedirectError::QueueClosed)
    }

    /// Waits until every task dispatched before this call has run.
    pub fn barrier(&self) -> Result<(), RedirectError> {
        self.sync(|| ())
    }

    pub async fn barrier_async(&self) -> Result<(), RedirectError> {
        if self.is_current() {
            return Ok(());
        }
        let (tx, rx) = oneshot::channel();
        if !self.dispatch(move || {
            let _ = tx.send(());
        }) {
            return Err(RedirectError::QueueClosed);
        }
        rx.await.map_err(|_| RedirectError::QueueClosed)
    }
}

impl MainLoop {
    /// Runs tasks until every [`DispatchQueue`] handle has been dropped.
    pub fn run(mut self) {
        self.owner.claim();
        while let Some(task) = self.rx.blocking_recv() {
            run_task(task);
        }
        self.owner.release();
        tracing::debug!(target: "outfeed.dispatch", "main loop finished");
    }

    /// Async form of [`MainLoop::run`] for hosts whose designated context is
    /// a task on a current-thread runtime. The polling thread is treated as
    /// the context, so this must not run on a work-stealing runtime.
    pub async fn run_async(mut self) {
        self.owner.claim();
        while let Some(task) = self.rx.recv().await {
            run_task(task);
        }
        self.owner.release();
        tracing::debug!(target: "outfeed.dispatch", "main loop finished");
    }

    /// Runs whatever is queued right now without blocking. For hosts that
    /// own their event loop and pump the queue from it; the calling thread
    /// becomes the designated context.
    pub fn run_pending(&mut self) -> usize {
        self.owner.claim();
        let mut n = 0;
        while let Ok(task) = self.rx.try_recv() {
            run_task(task);
            n += 1;
        }
        n
    }

    pub fn spawn(self, name: &str) -> std::io::Result<MainThread> {
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || self.run())?;
        Ok(MainThread { handle })
    }
}

impl MainThread {
    pub fn thread_id(&self) -> ThreadId {
        self.handle.thread().id()
    }

    /// Waits for the loop to finish; it finishes once all queue handles are
    /// dropped.
    pub fn join(self) {
        if self.handle.join().is_err() {
            tracing::warn!(target: "outfeed.dispatch", "main loop thread panicked");
        }
    }
}

fn run_task(task: Task) {
    if catch_unwind(AssertUnwindSafe(task)).is_err() {
        tracing::warn!(target: "outfeed.dispatch", "dispatched task panicked");
    }
}
