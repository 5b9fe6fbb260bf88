mod common;

use common::Harness;
use outfeed_core::api::{ActivityLog, Passthrough, StreamId};
use pretty_assertions::assert_eq;

#[test]
fn activity_log_collects_both_streams_in_capture_order() {
    let h = Harness::new(Passthrough::Swallow);
    let log = ActivityLog::new(1024);
    let attachment = log.attach(&h.ctx).unwrap();
    assert!(h.ctx.stdout().is_redirecting());
    assert!(h.ctx.stderr().is_redirecting());

    h.write(StreamId::Stdout, b"scan: title 1\n");
    h.write(StreamId::Stderr, b"warning: no audio\n");
    h.write(StreamId::Stdout, b"encode: 100%\n");
    h.settle();

    assert_eq!(
        log.snapshot(),
        "scan: title 1\nwarning: no audio\nencode: 100%\n"
    );

    ActivityLog::detach(&h.ctx, attachment);
    assert!(!h.ctx.stdout().is_redirecting());
    assert!(!h.ctx.stderr().is_redirecting());

    h.write(StreamId::Stdout, b"late\n");
    h.settle();
    assert!(!log.snapshot().contains("late"));
}

#[test]
fn activity_log_coexists_with_other_listeners() {
    let h = Harness::new(Passthrough::Swallow);
    let log = ActivityLog::new(1024);
    let extra = h.ctx.stdout().add_listener(|_| {}).unwrap();
    let attachment = log.attach(&h.ctx).unwrap();

    ActivityLog::detach(&h.ctx, attachment);
    // The unrelated listener keeps stdout intercepted.
    assert!(h.ctx.stdout().is_redirecting());
    assert!(!h.ctx.stderr().is_redirecting());

    h.ctx.stdout().remove_listener(extra);
    assert!(!h.ctx.stdout().is_redirecting());
}
