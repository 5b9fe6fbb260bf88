//! Tracing setup for the binary.
use std::path::PathBuf;
use std::sync::OnceLock;

use outfeed_core::api::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Targets the core library logs its capture machinery under.
const CAPTURE_TARGETS: [&str; 2] = ["outfeed.redirect", "outfeed.dispatch"];

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Filter directives from config: the base `level`, then `capture_level`
/// for the capture targets.
pub fn filter_directives(logging: &LoggingConfig) -> String {
    let mut directives = logging.level.trim().to_string();
    if let Some(level) = logging
        .capture_level
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        for target in CAPTURE_TARGETS {
            if !directives.is_empty() {
                directives.push(',');
            }
            directives.push_str(&format!("{target}={level}"));
        }
    }
    directives
}

pub fn log_dir(logging: &LoggingConfig) -> PathBuf {
    logging
        .directory
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("outfeed"))
}

pub fn init_tracing(logging: &LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }
    if !logging.console && !logging.file {
        return Err("logging disabled for both console and file".to_string());
    }

    // RUST_LOG wins over the config file.
    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(filter_directives(logging)).map_err(|e| e.to_string())?,
    };

    let file_writer = if logging.file {
        let dir = log_dir(logging);
        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let appender =
            tracing_appender::rolling::never(dir, format!("outfeed.{}.log", std::process::id()));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        Some(writer)
    } else {
        None
    };

    // With an fd hook on stderr these lines are captured like any other output.
    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });
    let file_layer = file_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_level_adds_target_directives() {
        let logging = LoggingConfig {
            level: "warn".to_string(),
            capture_level: Some(" debug ".to_string()),
            ..LoggingConfig::default()
        };
        let directives = filter_directives(&logging);
        assert_eq!(
            directives,
            "warn,outfeed.redirect=debug,outfeed.dispatch=debug"
        );
        assert!(EnvFilter::try_new(directives).is_ok());
    }

    #[test]
    fn base_level_alone_without_capture_level() {
        let logging = LoggingConfig::default();
        assert_eq!(filter_directives(&logging), "info");

        let blank = LoggingConfig {
            capture_level: Some("  ".to_string()),
            ..LoggingConfig::default()
        };
        assert_eq!(filter_directives(&blank), "info");
    }

    #[test]
    fn log_dir_falls_back_to_temp() {
        let blank = LoggingConfig {
            directory: Some("   ".to_string()),
            ..LoggingConfig::default()
        };
        assert_eq!(log_dir(&blank), std::env::temp_dir().join("outfeed"));

        let set = LoggingConfig {
            directory: Some("/var/log/outfeed".to_string()),
            ..LoggingConfig::default()
        };
        assert_eq!(log_dir(&set), PathBuf::from("/var/log/outfeed"));
    }

    #[test]
    fn disabled_logging_is_a_noop() {
        let logging = LoggingConfig {
            enabled: false,
            ..LoggingConfig::default()
        };
        assert!(init_tracing(&logging).is_ok());
    }

    #[test]
    fn both_sinks_off_is_rejected() {
        let logging = LoggingConfig {
            console: false,
            file: false,
            ..LoggingConfig::default()
        };
        assert!(init_tracing(&logging).is_err());
    }
}
