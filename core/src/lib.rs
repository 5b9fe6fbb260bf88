//! Capture what a process writes to stdout/stderr and broadcast it, as text,
//! to listeners that all run on one designated execution context.

pub mod activity;
pub mod api;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod redirect;
pub mod stream;
pub mod util;
