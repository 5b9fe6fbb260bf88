use std::sync::{Arc, Mutex};

use outfeed_core::api::{
    main_queue, MainThread, Passthrough, PortHook, RedirectContext, StreamId, StreamPort, WriteFn,
};

/// Bytes that reached a port's original entry point (the "terminal").
pub type Terminal = Arc<Mutex<Vec<u8>>>;

pub struct Harness {
    pub ctx: RedirectContext,
    pub main: MainThread,
    pub stdout_terminal: Terminal,
    pub stderr_terminal: Terminal,
}

impl Harness {
    pub fn new(passthrough: Passthrough) -> Self {
        let (queue, main) = main_queue();
        let main = main.spawn("test-main").expect("spawn main loop");

        let (stdout_entry, stdout_terminal) = terminal();
        let (stderr_entry, stderr_terminal) = terminal();
        let stdout_port = StreamPort::with_entry(StreamId::Stdout, stdout_entry);
        let stderr_port = StreamPort::with_entry(StreamId::Stderr, stderr_entry);

        let ctx = RedirectContext::with_hooks(
            queue,
            stdout_port.clone(),
            stderr_port.clone(),
            Box::new(PortHook::new(stdout_port, passthrough)),
            Box::new(PortHook::new(stderr_port, passthrough)),
        );
        Self {
            ctx,
            main,
            stdout_terminal,
            stderr_terminal,
        }
    }

    pub fn write(&self, stream: StreamId, bytes: &[u8]) -> usize {
        self.ctx.port(stream).write(bytes)
    }

    pub fn settle(&self) {
        self.ctx.queue().barrier().expect("main loop alive");
    }
}

fn terminal() -> (WriteFn, Terminal) {
    let sink: Terminal = Arc::new(Mutex::new(Vec::new()));
    let s = sink.clone();
    let entry: WriteFn = Arc::new(move |buf: &[u8]| {
        s.lock().unwrap().extend_from_slice(buf);
        buf.len()
    });
    (entry, sink)
}

/// Shared call log for listeners: `(listener tag, text)`.
pub type Calls = Arc<Mutex<Vec<(String, String)>>>;

pub fn recorder(calls: &Calls, tag: &str) -> impl Fn(&str) + Send + Sync + 'static {
    let calls = calls.clone();
    let tag = tag.to_string();
    move |text: &str| calls.lock().unwrap().push((tag.clone(), text.to_string()))
}
