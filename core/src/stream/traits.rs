use std::sync::Arc;

use crate::error::RedirectError;

/// A stream's write entry point: takes a raw buffer, returns the number of
/// bytes accepted.
pub type WriteFn = Arc<dyn Fn(&[u8]) -> usize + Send + Sync>;

/// Installs a capture function at a stream's write entry point and restores
/// the original entry point afterwards.
///
/// Implementations own the original entry point while installed. `install`
/// on an installed hook and `uninstall` on an idle one are no-ops.
pub trait StreamHook: Send {
    fn install(&mut self, capture: WriteFn) -> Result<(), RedirectError>;

    fn uninstall(&mut self) -> Result<(), RedirectError>;

    fn is_installed(&self) -> bool;
}
