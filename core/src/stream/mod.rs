mod port;
pub mod traits;
pub mod types;

pub use port::{os_entry, PortWriter, StreamPort};
pub use traits::{StreamHook, WriteFn};
pub use types::{HookKind, Passthrough, StreamId};
