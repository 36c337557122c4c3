use slog::{error, Logger};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

/// The queue a user's chosen "main thread" drains: the I/O and timeout
/// threads only ever enqueue work here, they never call user code
/// directly. FIFO, so callbacks observe events in the order they
/// actually happened.
pub struct DispatchQueue {
    jobs: Mutex<VecDeque<Box<dyn FnOnce() + Send>>>,
}

impl DispatchQueue {
    pub fn new() -> DispatchQueue {
        DispatchQueue {
            jobs: Mutex::new(VecDeque::new()),
        }
    }

    pub fn enqueue<F: FnOnce() + Send + 'static>(&self, job: F) {
        self.jobs.lock().unwrap().push_back(Box::new(job));
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().unwrap().is_empty()
    }

    /// Drains every job currently queued, in FIFO order, running each on
    /// the calling thread. A panicking callback is caught and logged
    /// rather than poisoning the rest of the drive (a single misbehaving
    /// user callback shouldn't stop delivery to every other pending
    /// request).
    pub fn drive(&self, log: &Logger) {
        loop {
            let job = self.jobs.lock().unwrap().pop_front();
            match job {
                Some(job) => {
                    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(job)) {
                        error!(log, "dispatch queue callback panicked"; "panic" => format_panic(&panic));
                    }
                }
                None => break,
            }
        }
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        DispatchQueue::new()
    }
}

fn format_panic(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
