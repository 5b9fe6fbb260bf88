mod log;

pub use log::{ActivityLog, Attachment};
