use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use outfeed_core::api::{ActivityLog, StreamId};

use crate::app::App;
use crate::commands::cli::DemoArgs;
use crate::error::CliError;

#[derive(Default)]
struct Tally {
    progress: AtomicUsize,
    warnings: AtomicUsize,
    off_context: AtomicUsize,
}

#[tracing::instrument(name = "cli.demo", skip(app))]
pub async fn run_demo(args: DemoArgs, app: &App) -> Result<i32, CliError> {
    let ctx = app.ctx;
    let log = ActivityLog::new(app.cfg.activity_log.capacity_bytes);
    let tally = Arc::new(Tally::default());

    let attachment = log.attach(ctx)?;
    let t = tally.clone();
    let queue = ctx.queue().clone();
    let progress = ctx.stdout().add_listener(move |text| {
        if !queue.is_current() {
            t.off_context.fetch_add(1, Ordering::Relaxed);
        }
        t.progress
            .fetch_add(text.matches("progress:").count(), Ordering::Relaxed);
    })?;
    let t = tally.clone();
    let warnings = ctx.stderr().add_listener(move |text| {
        t.warnings
            .fetch_add(text.matches('\n').count(), Ordering::Relaxed);
    })?;

    let workers: Vec<_> = (0..args.threads)
        .map(|n| {
            let mut stdout = ctx.port(StreamId::Stdout).writer();
            let mut stderr = ctx.port(StreamId::Stderr).writer();
            let lines = args.lines;
            std::thread::spawn(move || -> std::io::Result<()> {
                for k in 1..=lines {
                    let pct = k * 100 / lines.max(1);
                    // One write per line so lines from different threads never interleave.
                    stdout.write_all(format!("worker {n}: progress: {pct}%\n").as_bytes())?;
                }
                stderr.write_all(format!("worker {n}: finished\n").as_bytes())?;
                stdout.flush()
            })
        })
        .collect();
    let joined = tokio::task::spawn_blocking(move || {
        workers
            .into_iter()
            .map(|w| w.join().unwrap_or_else(|_| Err(std::io::Error::other("worker panicked"))))
            .collect::<std::io::Result<Vec<()>>>()
    })
    .await
    .map_err(|e| CliError::Command(format!("demo workers failed: {e}")))?;

    let settled = ctx.queue().barrier_async().await;
    ctx.stdout().remove_listener(progress);
    ctx.stderr().remove_listener(warnings);
    ActivityLog::detach(ctx, attachment);
    settled?;
    ctx.queue().barrier_async().await?;
    joined?;

    if !app.quiet {
        let mut out = std::io::stdout().lock();
        out.write_all(log.snapshot().as_bytes())?;
        out.flush()?;
    }
    println!(
        "{} progress lines on stdout, {} lines on stderr, {} callbacks off the main context",
        tally.progress.load(Ordering::Relaxed),
        tally.warnings.load(Ordering::Relaxed),
        tally.off_context.load(Ordering::Relaxed),
    );
    Ok(0)
}
