use outfeed_core::api::RedirectError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("redirect failed: {0}")]
    Redirect(#[from] RedirectError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl CliError {
    // 0: success
    // 11: config error
    // 20: redirect / spawn / IO error
    // 50: internal/uncategorized
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 11,
            CliError::Redirect(RedirectError::Unsupported(_)) => 11,
            CliError::Redirect(_) => 20,
            CliError::Command(_) => 20,
            CliError::Io(_) => 20,
            CliError::Anyhow(_) => 50,
        }
    }
}
