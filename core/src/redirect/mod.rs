#[cfg(unix)]
mod fd_hook;
mod port_hook;
mod redirector;
mod stats;

#[cfg(unix)]
pub use fd_hook::FdHook;
pub use port_hook::PortHook;
pub use redirector::{Listener, ListenerHandle, StreamRedirector};
pub use stats::{RedirectStats, RedirectStatsSnapshot};
