use crate::error::ConnectorResult;
use crate::packet::Packet;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// A one-shot slot a blocking caller can wait on. Cloning shares the
/// same slot; only the first `resolve` has any effect.
pub struct Eventual<T> {
    state: Arc<(Mutex<Option<T>>, Condvar)>,
}

impl<T> Clone for Eventual<T> {
    fn clone(&self) -> Self {
        Eventual {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Eventual<T> {
    pub fn new() -> Eventual<T> {
        Eventual {
            state: Arc::new((Mutex::new(None), Condvar::new())),
        }
    }

    /// Stores `value` and wakes any waiter. A second call is a no-op:
    /// resolution happens at most once per pending table contract.
    pub fn resolve(&self, value: T) {
        let (lock, cvar) = &*self.state;
        let mut slot = lock.lock().unwrap();
        if slot.is_none() {
            *slot = Some(value);
            cvar.notify_all();
        }
    }

    /// Blocks the calling thread until `resolve` runs, or `timeout`
    /// elapses (returning `None`).
    pub fn wait(&self, timeout: Duration) -> Option<T> {
        let (lock, cvar) = &*self.state;
        let guard = lock.lock().unwrap();
        let (mut guard, result) = cvar
            .wait_timeout_while(guard, timeout, |slot| slot.is_none())
            .unwrap();
        result.timed_out();
        guard.take()
    }
}

impl<T> Default for Eventual<T> {
    fn default() -> Self {
        Eventual::new()
    }
}

/// Where a pending request's result goes once it resolves: a callback
/// run on the main-thread dispatch queue, or a handle a blocking caller
/// is waiting on. Unifying the two here means the pending table only
/// needs one resolution path regardless of which delivery style the
/// caller asked for.
pub enum Sink<T> {
    Callback(Box<dyn FnOnce(T) + Send>),
    Eventual(Eventual<T>),
}

impl<T> Sink<T> {
    pub fn resolve(self, value: T) {
        match self {
            Sink::Callback(callback) => callback(value),
            Sink::Eventual(eventual) => eventual.resolve(value),
        }
    }
}

pub type PacketSink = Sink<ConnectorResult<Packet>>;
