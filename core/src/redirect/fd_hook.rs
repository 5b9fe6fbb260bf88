use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::mpsc;
use std::time::Duration;

use crate::config::RedirectConfig;
use crate::error::RedirectError;
use crate::stream::{Passthrough, StreamHook, StreamId, WriteFn};
use crate::util::incomplete_utf8_tail;

/// Descriptor-level interception: the target fd is pointed at a pipe whose
/// reader thread feeds the capture function.
///
/// The original descriptor is kept as a private duplicate and put back with
/// `dup2` on uninstall, so the target fd number ends up referring to exactly
/// the same open file as before.
pub struct FdHook {
    label: &'static str,
    target: RawFd,
    passthrough: Passthrough,
    read_chunk: usize,
    drain_timeout: Duration,
    active: Option<Active>,
}

struct Active {
    saved: OwnedFd,
    flags: libc::c_int,
    done_rx: mpsc::Receiver<()>,
}

impl FdHook {
    pub fn new(stream: StreamId, cfg: &RedirectConfig) -> Self {
        Self::for_fd(stream.raw_fd(), stream.label())
            .with_passthrough(cfg.passthrough)
            .with_read_chunk(cfg.read_chunk_bytes)
            .with_drain_timeout(Duration::from_millis(cfg.drain_timeout_ms))
    }

    /// Hooks an arbitrary descriptor owned by the caller.
    pub fn for_fd(target: RawFd, label: &'static str) -> Self {
        Self {
            label,
            target,
            passthrough: Passthrough::Swallow,
            read_chunk: 16 * 1024,
            drain_timeout: Duration::from_millis(250),
            active: None,
        }
    }

    pub fn with_passthrough(mut self, passthrough: Passthrough) -> Self {
        self.passthrough = passthrough;
        self
    }

    pub fn with_read_chunk(mut self, bytes: usize) -> Self {
        self.read_chunk = bytes.max(64);
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    fn flush_std(&self) {
        // Rust's own stdout buffer must land on whichever file the fd points
        // at before the swap, not after it.
        match self.target {
            1 => {
                let _ = std::io::stdout().flush();
            }
            2 => {
                let _ = std::io::stderr().flush();
            }
            _ => {}
        }
    }
}

impl StreamHook for FdHook {
    fn install(&mut self, capture: WriteFn) -> Result<(), RedirectError> {
        if self.active.is_some() {
            return Ok(());
        }
        self.flush_std();

        // dup2 clears FD_CLOEXEC on the target; whatever it had is put back
        // after every swap so children inherit the target exactly as before.
        let flags = fd_flags(self.target, self.label)?;
        let saved = dup_cloexec(self.target, self.label)?;
        let (read_end, write_end) = pipe_cloexec(self.label)?;
        let tee = match self.passthrough {
            Passthrough::Tee => Some(File::from(dup_cloexec(saved.as_raw_fd(), self.label)?)),
            Passthrough::Swallow => None,
        };

        if let Err(e) = redirect_fd(write_end.as_raw_fd(), self.target, flags, self.label) {
            let _ = redirect_fd(saved.as_raw_fd(), self.target, flags, self.label);
            return Err(e);
        }
        // From here on the target fd is the only write end we hold.
        drop(write_end);

        let (done_tx, done_rx) = mpsc::channel();
        let chunk = self.read_chunk;
        let spawned = std::thread::Builder::new()
            .name(format!("outfeed-{}-reader", self.label))
            .spawn(move || {
                pump(File::from(read_end), capture, tee, chunk);
                let _ = done_tx.send(());
            });
        if let Err(source) = spawned {
            let _ = redirect_fd(saved.as_raw_fd(), self.target, flags, self.label);
            return Err(RedirectError::Io {
                op: "spawn reader",
                stream: self.label,
                source,
            });
        }

        tracing::debug!(
            target: "outfeed.redirect",
            stream = self.label,
            fd = self.target,
            "fd hook installed"
        );
        self.active = Some(Active {
            saved,
            flags,
            done_rx,
        });
        Ok(())
    }

    fn uninstall(&mut self) -> Result<(), RedirectError> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };
        self.flush_std();

        let res = redirect_fd(
            active.saved.as_raw_fd(),
            self.target,
            active.flags,
            self.label,
        );

        // The reader sees EOF once no write end is left. Inherited copies in
        // still-running children keep it alive; don't wait for those.
        if active.done_rx.recv_timeout(self.drain_timeout).is_err() {
            tracing::debug!(
                target: "outfeed.redirect",
                stream = self.label,
                "pipe still open after restore, reader left running"
            );
        }
        tracing::debug!(
            target: "outfeed.redirect",
            stream = self.label,
            fd = self.target,
            "fd hook removed"
        );
        res
    }

    fn is_installed(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for FdHook {
    fn drop(&mut self) {
        let _ = self.uninstall();
    }
}

fn pump(mut rd: File, capture: WriteFn, mut tee: Option<File>, chunk: usize) {
    let mut buf = vec![0u8; chunk];
    let mut pending: Vec<u8> = Vec::with_capacity(chunk + 4);
    loop {
        let n = match rd.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        if let Some(t) = tee.as_mut() {
            let _ = t.write_all(&buf[..n]);
        }

        pending.extend_from_slice(&buf[..n]);
        let ready = pending.len() - incomplete_utf8_tail(&pending);
        if ready > 0 {
            capture(&pending[..ready]);
            pending.drain(..ready);
        }
    }
    if !pending.is_empty() {
        capture(&pending);
    }
}

fn cvt(
    rc: libc::c_int,
    op: &'static str,
    label: &'static str,
) -> Result<libc::c_int, RedirectError> {
    if rc < 0 {
        Err(RedirectError::last_os(op, label))
    } else {
        Ok(rc)
    }
}

fn dup_cloexec(fd: RawFd, label: &'static str) -> Result<OwnedFd, RedirectError> {
    // SAFETY: fcntl only reads `fd`; on success the returned descriptor is
    // new and owned by nobody else.
    let new = cvt(unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 0) }, "dup", label)?;
    Ok(unsafe { OwnedFd::from_raw_fd(new) })
}

fn pipe_cloexec(label: &'static str) -> Result<(OwnedFd, OwnedFd), RedirectError> {
    let mut fds = [0 as libc::c_int; 2];
    // SAFETY: `fds` has room for the two descriptors pipe() writes.
    cvt(unsafe { libc::pipe(fds.as_mut_ptr()) }, "pipe", label)?;
    // SAFETY: pipe() succeeded, both descriptors are fresh.
    let (rd, wr) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    for fd in [&rd, &wr] {
        // SAFETY: `fd` is open for the duration of the call.
        cvt(
            unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) },
            "fcntl",
            label,
        )?;
    }
    Ok((rd, wr))
}

fn fd_flags(fd: RawFd, label: &'static str) -> Result<libc::c_int, RedirectError> {
    // SAFETY: F_GETFD only reads the descriptor flags.
    cvt(unsafe { libc::fcntl(fd, libc::F_GETFD) }, "fcntl", label)
}

/// Points `dst` at `src`'s open file and gives it descriptor flags `flags`.
fn redirect_fd(
    src: RawFd,
    dst: RawFd,
    flags: libc::c_int,
    label: &'static str,
) -> Result<(), RedirectError> {
    loop {
        // SAFETY: dup2 atomically re-points `dst`; both are valid descriptors.
        if unsafe { libc::dup2(src, dst) } >= 0 {
            break;
        }
        let source = std::io::Error::last_os_error();
        if source.kind() != std::io::ErrorKind::Interrupted {
            return Err(RedirectError::Io {
                op: "dup2",
                stream: label,
                source,
            });
        }
    }
    if flags & libc::FD_CLOEXEC != 0 {
        // SAFETY: `dst` was just made valid by dup2.
        cvt(unsafe { libc::fcntl(dst, libc::F_SETFD, flags) }, "fcntl", label)?;
    }
    Ok(())
}
