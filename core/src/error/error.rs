use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedirectError {
    #[error("{op} failed on {stream}: {source}")]
    Io {
        op: &'static str,
        stream: &'static str,
        source: std::io::Error,
    },
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("dispatch queue closed")]
    QueueClosed,
    #[error("redirect context already initialized")]
    AlreadyInitialized,
}

impl RedirectError {
    #[cfg_attr(not(unix), allow(dead_code))]
    pub(crate) fn last_os(op: &'static str, stream: &'static str) -> Self {
        Self::Io {
            op,
            stream,
            source: std::io::Error::last_os_error(),
        }
    }
}
