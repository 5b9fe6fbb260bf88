//! Capture path throughput: producer-side cost of a write through a hooked
//! port, and end-to-end cost including listener dispatch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use outfeed_core::api::{
    main_queue, Passthrough, PortHook, RedirectContext, StreamId, StreamPort, WriteFn,
};

fn null_port(stream: StreamId) -> Arc<StreamPort> {
    let entry: WriteFn = Arc::new(|buf: &[u8]| buf.len());
    StreamPort::with_entry(stream, entry)
}

fn build_context() -> (RedirectContext, Arc<AtomicUsize>) {
    let (queue, main) = main_queue();
    main.spawn("bench-main").expect("spawn main loop");
    let out = null_port(StreamId::Stdout);
    let err = null_port(StreamId::Stderr);
    let ctx = RedirectContext::with_hooks(
        queue,
        out.clone(),
        err.clone(),
        Box::new(PortHook::new(out, Passthrough::Swallow)),
        Box::new(PortHook::new(err, Passthrough::Swallow)),
    );
    let bytes = Arc::new(AtomicUsize::new(0));
    let b = bytes.clone();
    ctx.stdout()
        .add_listener(move |s| {
            b.fetch_add(s.len(), Ordering::Relaxed);
        })
        .expect("add listener");
    (ctx, bytes)
}

fn bench_capture(c: &mut Criterion) {
    let (ctx, _bytes) = build_context();
    let port = ctx.port(StreamId::Stdout).clone();
    let mut group = c.benchmark_group("capture");

    for size in [16usize, 256, 4096].iter() {
        let line = "x".repeat(*size);
        group.bench_with_input(BenchmarkId::new("write", size), &line, |b, l| {
            b.iter(|| port.write(black_box(l.as_bytes())))
        });
    }
    group.finish();
}

fn bench_dispatch_round_trip(c: &mut Criterion) {
    let (ctx, _bytes) = build_context();
    let port = ctx.port(StreamId::Stdout).clone();

    c.bench_function("write_100_then_barrier", |b| {
        b.iter(|| {
            for _ in 0..100 {
                port.write(black_box(b"progress: 42%\n"));
            }
            ctx.queue().barrier().expect("barrier");
        })
    });
}

criterion_group!(benches, bench_capture, bench_dispatch_round_trip);
criterion_main!(benches);
