use std::sync::Arc;

use crate::error::RedirectError;
use crate::stream::{Passthrough, StreamHook, StreamPort, WriteFn};

/// Installs the capture function as a [`StreamPort`]'s entry point.
pub struct PortHook {
    port: Arc<StreamPort>,
    passthrough: Passthrough,
    original: Option<WriteFn>,
}

impl PortHook {
    pub fn new(port: Arc<StreamPort>, passthrough: Passthrough) -> Self {
        Self {
            port,
            passthrough,
            original: None,
        }
    }
}

impl StreamHook for PortHook {
    fn install(&mut self, capture: WriteFn) -> Result<(), RedirectError> {
        if self.original.is_some() {
            return Ok(());
        }
        let entry: WriteFn = match self.passthrough {
            Passthrough::Swallow => capture,
            Passthrough::Tee => {
                let sink = self.port.current();
                Arc::new(move |buf: &[u8]| {
                    sink(buf);
                    capture(buf)
                })
            }
        };
        self.original = Some(self.port.swap(entry));
        Ok(())
    }

    fn uninstall(&mut self) -> Result<(), RedirectError> {
        if let Some(original) = self.original.take() {
            self.port.swap(original);
        }
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.original.is_some()
    }
}
