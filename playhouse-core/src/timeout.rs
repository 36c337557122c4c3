use crate::dispatch::DispatchQueue;
use crate::error::ErrorCode;
use crate::packet::Packet;
use crate::pending::PendingTable;
use playhouse_support::time;
use slog::{debug, Logger};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Tick cadence for the reaper's sweep. Fixed rather than configurable:
/// the only externally visible effect is how late an expiry can be
/// noticed, and 100 ms keeps that comfortably under any reasonable
/// `request_timeout_ms`.
const TICK: Duration = Duration::from_millis(100);

/// Dedicated background thread that periodically expires overdue
/// pending requests. Owns nothing the session doesn't also own a
/// reference to: it only ever touches the pending table through
/// `collect_expired` and the dispatch queue through `enqueue`.
pub struct TimeoutReaper {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl TimeoutReaper {
    /// Spawns the reaper thread. It runs until `stop` is called or the
    /// reaper is dropped.
    pub fn start(pending: Arc<PendingTable>, dispatch: Arc<DispatchQueue>, log: Logger) -> TimeoutReaper {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = thread::spawn(move || {
            while thread_running.load(Ordering::Acquire) {
                thread::sleep(TICK);
                if !thread_running.load(Ordering::Acquire) {
                    break;
                }

                let expired = pending.collect_expired(time::now());
                for (msg_seq, sink) in expired {
                    debug!(log, "request timed out"; "msg_seq" => msg_seq);
                    let packet = Packet::synthetic_timeout(msg_seq, ErrorCode::RequestTimeout.code());
                    dispatch.enqueue(move || sink.resolve(Ok(packet)));
                }
            }
        });

        TimeoutReaper {
            handle: Some(handle),
            running,
        }
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TimeoutReaper {
    fn drop(&mut self) {
        self.stop();
    }
}
