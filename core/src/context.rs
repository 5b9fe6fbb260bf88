use std::sync::{Arc, OnceLock};

use crate::config::RedirectConfig;
use crate::dispatch::DispatchQueue;
use crate::error::RedirectError;
use crate::redirect::{PortHook, StreamRedirector};
use crate::stream::{HookKind, StreamHook, StreamId, StreamPort};

static GLOBAL: OnceLock<RedirectContext> = OnceLock::new();

/// The pair of stream redirectors (plus their ports and the dispatch queue)
/// a process works with.
///
/// Built once at start-up and shared by reference. Tests build their own
/// isolated instances; a process that wants ambient access can publish one
/// with [`RedirectContext::install_global`].
#[derive(Clone)]
pub struct RedirectContext {
    queue: DispatchQueue,
    stdout_port: Arc<StreamPort>,
    stderr_port: Arc<StreamPort>,
    stdout: Arc<StreamRedirector>,
    stderr: Arc<StreamRedirector>,
}

impl RedirectContext {
    pub fn new(cfg: &RedirectConfig, queue: DispatchQueue) -> Result<Self, RedirectError> {
        let stdout_port = StreamPort::new(StreamId::Stdout);
        let stderr_port = StreamPort::new(StreamId::Stderr);
        let stdout_hook = build_hook(cfg, StreamId::Stdout, &stdout_port)?;
        let stderr_hook = build_hook(cfg, StreamId::Stderr, &stderr_port)?;
        tracing::debug!(
            target: "outfeed.redirect",
            hook = ?cfg.hook,
            passthrough = ?cfg.passthrough,
            "redirect context created"
        );
        Ok(Self::assemble(
            queue,
            stdout_port,
            stderr_port,
            stdout_hook,
            stderr_hook,
        ))
    }

    /// Context over caller-supplied ports and hooks.
    pub fn with_hooks(
        queue: DispatchQueue,
        stdout_port: Arc<StreamPort>,
        stderr_port: Arc<StreamPort>,
        stdout_hook: Box<dyn StreamHook>,
        stderr_hook: Box<dyn StreamHook>,
    ) -> Self {
        Self::assemble(queue, stdout_port, stderr_port, stdout_hook, stderr_hook)
    }

    fn assemble(
        queue: DispatchQueue,
        stdout_port: Arc<StreamPort>,
        stderr_port: Arc<StreamPort>,
        stdout_hook: Box<dyn StreamHook>,
        stderr_hook: Box<dyn StreamHook>,
    ) -> Self {
        let stdout = Arc::new(StreamRedirector::new(
            StreamId::Stdout,
            stdout_hook,
            queue.clone(),
        ));
        let stderr = Arc::new(StreamRedirector::new(
            StreamId::Stderr,
            stderr_hook,
            queue.clone(),
        ));
        Self {
            queue,
            stdout_port,
            stderr_port,
            stdout,
            stderr,
        }
    }

    pub fn stdout(&self) -> &Arc<StreamRedirector> {
        &self.stdout
    }

    pub fn stderr(&self) -> &Arc<StreamRedirector> {
        &self.stderr
    }

    pub fn redirector(&self, stream: StreamId) -> &Arc<StreamRedirector> {
        match stream {
            StreamId::Stdout => &self.stdout,
            StreamId::Stderr => &self.stderr,
        }
    }

    pub fn port(&self, stream: StreamId) -> &Arc<StreamPort> {
        match stream {
            StreamId::Stdout => &self.stdout_port,
            StreamId::Stderr => &self.stderr_port,
        }
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.queue
    }

    /// Publishes this context for the rest of the process. Only the first
    /// call succeeds.
    pub fn install_global(self) -> Result<&'static RedirectContext, RedirectError> {
        GLOBAL
            .set(self)
            .map_err(|_| RedirectError::AlreadyInitialized)?;
        GLOBAL.get().ok_or(RedirectError::AlreadyInitialized)
    }

    pub fn global() -> Option<&'static RedirectContext> {
        GLOBAL.get()
    }
}

fn build_hook(
    cfg: &RedirectConfig,
    stream: StreamId,
    port: &Arc<StreamPort>,
) -> Result<Box<dyn StreamHook>, RedirectError> {
    match cfg.hook {
        HookKind::Writer => Ok(Box::new(PortHook::new(port.clone(), cfg.passthrough))),
        #[cfg(unix)]
        HookKind::Fd => Ok(Box::new(crate::redirect::FdHook::new(stream, cfg))),
        #[cfg(not(unix))]
        HookKind::Fd => Err(RedirectError::Unsupported(format!(
            "fd hook for {stream} is only available on unix"
        ))),
    }
}
