//! Minimal log console: two worker threads write through the stdout/stderr
//! ports, a single listener per stream prints what it receives with a prefix.

use std::io::Write;

use outfeed_core::api::{main_queue, RedirectConfig, RedirectContext, StreamId};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let (queue, main) = main_queue();
    let main = main.spawn("console-main")?;
    let ctx = RedirectContext::new(&RedirectConfig::default(), queue)?;

    // Listeners print with eprintln!/println!, which bypass the ports, so
    // nothing feeds back into the capture path.
    let out = ctx
        .stdout()
        .add_listener(|text| print!("[out] {text}"))?;
    let err = ctx
        .stderr()
        .add_listener(|text| eprint!("[err] {text}"))?;

    let workers: Vec<_> = (0..2)
        .map(|n| {
            let mut stdout = ctx.port(StreamId::Stdout).writer();
            let mut stderr = ctx.port(StreamId::Stderr).writer();
            std::thread::spawn(move || {
                for pct in (0..=100).step_by(25) {
                    let line = format!("worker {n}: progress {pct}%\n");
                    let _ = stdout.write_all(line.as_bytes());
                }
                let _ = stderr.write_all(format!("worker {n}: done\n").as_bytes());
            })
        })
        .collect();
    for w in workers {
        let _ = w.join();
    }

    ctx.queue().barrier()?;
    ctx.stdout().remove_listener(out);
    ctx.stderr().remove_listener(err);

    drop(ctx);
    main.join();
    Ok(())
}
