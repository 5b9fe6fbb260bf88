mod queue;

pub use queue::{main_queue, DispatchQueue, MainLoop, MainThread, Task};
