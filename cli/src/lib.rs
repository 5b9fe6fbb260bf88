//! outfeed-cli library - modules exposed for unit tests

pub mod app;
pub mod commands;
pub mod error;
pub mod logging;
pub mod pump;
