use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::context::RedirectContext;
use crate::error::RedirectError;
use crate::redirect::ListenerHandle;
use crate::util::ceil_char_boundary;

/// Bounded, append-only text buffer fed from captured output.
///
/// Once `cap` bytes are exceeded the oldest text is discarded, always on a
/// character boundary.
#[derive(Clone)]
pub struct ActivityLog {
    inner: Arc<Mutex<String>>,
    cap: usize,
}

/// Listener registrations made by [`ActivityLog::attach`].
#[derive(Debug, Clone, Copy)]
pub struct Attachment {
    pub stdout: ListenerHandle,
    pub stderr: ListenerHandle,
}

impl ActivityLog {
    pub fn new(cap: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(String::with_capacity(cap.min(64 * 1024)))),
            cap: cap.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, text: &str) {
        let mut g = self.lock();
        g.push_str(text);
        if g.len() > self.cap {
            let cut = ceil_char_boundary(&g, g.len() - self.cap);
            g.drain(..cut);
        }
    }

    pub fn snapshot(&self) -> String {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.snapshot())
    }

    /// `activity-<local timestamp>.log`
    pub fn default_file_name() -> String {
        format!(
            "activity-{}.log",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        )
    }

    /// Feeds both of the context's streams into this log.
    pub fn attach(&self, ctx: &RedirectContext) -> Result<Attachment, RedirectError> {
        let log = self.clone();
        let stdout = ctx.stdout().add_listener(move |s| log.append(s))?;

        let log = self.clone();
        let stderr = match ctx.stderr().add_listener(move |s| log.append(s)) {
            Ok(h) => h,
            Err(e) => {
                ctx.stdout().remove_listener(stdout);
                return Err(e);
            }
        };
        Ok(Attachment { stdout, stderr })
    }

    pub fn detach(ctx: &RedirectContext, attachment: Attachment) {
        ctx.stdout().remove_listener(attachment.stdout);
        ctx.stderr().remove_listener(attachment.stderr);
    }
}
