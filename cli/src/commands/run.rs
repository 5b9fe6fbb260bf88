use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;

use outfeed_core::api::{ActivityLog, HookKind, StreamId};

use crate::app::App;
use crate::commands::cli::RunArgs;
use crate::error::CliError;
use crate::pump::pump_into_port;

#[tracing::instrument(name = "cli.run", skip(args, app), fields(program = %args.command.first().map(String::as_str).unwrap_or("")))]
pub async fn run_command(args: RunArgs, app: &App) -> Result<i32, CliError> {
    let ctx = app.ctx;
    let log = ActivityLog::new(app.cfg.activity_log.capacity_bytes);
    let attachment = log.attach(ctx)?;

    let outcome = spawn_and_wait(&args.command, app).await;

    // Everything captured while attached has to reach the log before the
    // hooks are removed, and whatever the fd reader drains on removal after.
    let settled = ctx.queue().barrier_async().await;
    ActivityLog::detach(ctx, attachment);
    settled?;
    ctx.queue().barrier_async().await?;

    let code = outcome?;
    finish(&log, args.save_log, app)?;
    Ok(code)
}

async fn spawn_and_wait(command: &[String], app: &App) -> Result<i32, CliError> {
    let (program, rest) = command
        .split_first()
        .ok_or_else(|| CliError::Command("empty command".to_string()))?;

    let mut cmd = tokio::process::Command::new(program);
    cmd.args(rest).stdin(Stdio::null());

    // With the fd hook the child inherits the hooked descriptors directly.
    let piped = app.cfg.redirect.hook == HookKind::Writer;
    if piped {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| CliError::Command(format!("spawn {program} failed: {e}")))?;
    tracing::debug!(pid = ?child.id(), piped, "child spawned");

    let mut pumps = Vec::new();
    if piped {
        if let Some(out) = child.stdout.take() {
            pumps.push(pump_into_port(out, app.ctx.port(StreamId::Stdout).clone()));
        }
        if let Some(err) = child.stderr.take() {
            pumps.push(pump_into_port(err, app.ctx.port(StreamId::Stderr).clone()));
        }
    }

    let status = child.wait().await?;
    for pump in pumps {
        let copied = pump
            .await
            .map_err(|e| CliError::Command(format!("output pump failed: {e}")))??;
        tracing::debug!(bytes = copied, "output pump finished");
    }

    tracing::info!(code = ?status.code(), "child exited");
    Ok(status.code().unwrap_or(1))
}

fn finish(log: &ActivityLog, save_log: Option<PathBuf>, app: &App) -> Result<(), CliError> {
    let save_path = save_log.or_else(|| app.cfg.activity_log.save_path.as_ref().map(PathBuf::from));
    if let Some(path) = save_path {
        let path = if path.is_dir() {
            path.join(ActivityLog::default_file_name())
        } else {
            path
        };
        log.save_to(&path)?;
        tracing::info!(path = %path.display(), bytes = log.len(), "activity log saved");
    }

    if !app.quiet {
        let mut out = std::io::stdout().lock();
        out.write_all(log.snapshot().as_bytes())?;
        out.flush()?;
    }

    let out = app.ctx.stdout().stats();
    let err = app.ctx.stderr().stats();
    tracing::info!(
        stdout_chunks = out.captured_chunks,
        stdout_bytes = out.captured_bytes,
        stdout_dropped = out.dropped_chunks,
        stderr_chunks = err.captured_chunks,
        stderr_bytes = err.captured_bytes,
        stderr_dropped = err.dropped_chunks,
        "capture stats"
    );
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use outfeed_core::api::{main_queue, AppConfig, RedirectContext};

    fn test_app() -> App {
        let (queue, main) = main_queue();
        // Detached: the leaked context keeps the queue, and so the loop, alive.
        let _main = main.spawn("test-main").unwrap();
        let cfg = AppConfig::default();
        let ctx = RedirectContext::new(&cfg.redirect, queue).unwrap();
        App {
            cfg,
            ctx: Box::leak(Box::new(ctx)),
            quiet: true,
        }
    }

    fn sh(script: &str) -> Vec<String> {
        ["sh", "-c", script].iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn child_exit_code_is_returned_and_log_saved() {
        let app = test_app();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.log");

        let args = RunArgs {
            save_log: Some(path.clone()),
            command: sh("echo from-stdout; echo from-stderr >&2; exit 3"),
        };
        let code = run_command(args, &app).await.unwrap();
        assert_eq!(code, 3);

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("from-stdout\n"));
        assert!(saved.contains("from-stderr\n"));
        assert_eq!(app.ctx.stdout().listener_count(), 0);
        assert_eq!(app.ctx.stderr().listener_count(), 0);
        assert!(!app.ctx.stdout().is_redirecting());
    }

    #[tokio::test]
    async fn save_into_directory_uses_generated_name() {
        let app = test_app();
        let dir = tempfile::tempdir().unwrap();

        let args = RunArgs {
            save_log: Some(dir.path().to_path_buf()),
            command: sh("echo hello"),
        };
        assert_eq!(run_command(args, &app).await.unwrap(), 0);

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(std::fs::read_to_string(&entries[0]).unwrap(), "hello\n");
    }

    #[tokio::test]
    async fn spawn_failure_detaches_the_log() {
        let app = test_app();
        let args = RunArgs {
            save_log: None,
            command: vec!["/nonexistent/outfeed-test-binary".to_string()],
        };
        let err = run_command(args, &app).await.unwrap_err();
        assert!(matches!(err, CliError::Command(_)));
        assert_eq!(err.exit_code(), 20);
        assert_eq!(app.ctx.stdout().listener_count(), 0);
        assert!(!app.ctx.stderr().is_redirecting());
    }
}
