//! Stable re-exports for consumers (`cli` and external crates).
//!
//! Prefer importing from `outfeed_core::api` instead of reaching into internal modules.

pub use crate::activity::{ActivityLog, Attachment};
pub use crate::config::{
    load_default, load_from, ActivityLogConfig, AppConfig, LoggingConfig, RedirectConfig,
};
pub use crate::context::RedirectContext;
pub use crate::dispatch::{main_queue, DispatchQueue, MainLoop, MainThread};
pub use crate::error::RedirectError;
#[cfg(unix)]
pub use crate::redirect::FdHook;
pub use crate::redirect::{
    ListenerHandle, PortHook, RedirectStatsSnapshot, StreamRedirector,
};
pub use crate::stream::{
    HookKind, Passthrough, PortWriter, StreamHook, StreamId, StreamPort, WriteFn,
};
