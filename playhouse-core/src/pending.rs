use crate::error::{ConnectorError, ErrorCode};
use crate::packet::Packet;
use crate::sink::PacketSink;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

struct PendingEntry {
    deadline: Instant,
    sink: PacketSink,
}

/// The set of outstanding requests, keyed by `msg_seq`. Guarded by a
/// single mutex: contention is low because a request only touches this
/// table at send, resolve, or timeout.
pub struct PendingTable {
    entries: Mutex<HashMap<u16, PendingEntry>>,
}

impl PendingTable {
    pub fn new() -> PendingTable {
        PendingTable {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, msg_seq: u16, deadline: Instant, sink: PacketSink) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(msg_seq, PendingEntry { deadline, sink });
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns the sink waiting on `msg_seq`, if any. The
    /// caller is responsible for delivering through the dispatch queue
    /// rather than resolving inline — inbound delivery always runs on
    /// the I/O thread, and only the dispatch queue marshals onto the
    /// user's chosen thread. Returns `None` for a late response after
    /// timeout, or a `msg_seq` this connector never sent; both cases
    /// are then treated as an unsolicited push by the caller.
    pub fn take(&self, msg_seq: u16) -> Option<PacketSink> {
        self.entries
            .lock()
            .unwrap()
            .remove(&msg_seq)
            .map(|entry| entry.sink)
    }

    /// Removes and returns every entry whose deadline is at or before
    /// `now`, for the timeout reaper to deliver as synthetic timeouts.
    pub fn collect_expired(&self, now: Instant) -> Vec<(u16, PacketSink)> {
        let mut entries = self.entries.lock().unwrap();
        let expired: Vec<u16> = entries
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(msg_seq, _)| *msg_seq)
            .collect();

        expired
            .into_iter()
            .map(|msg_seq| {
                let entry = entries.remove(&msg_seq).unwrap();
                (msg_seq, entry.sink)
            })
            .collect()
    }

    /// Empties the table, returning every sink so the caller can fail
    /// them all with the same reason — disconnect fails every
    /// outstanding request with `ConnectionClosed`.
    pub fn drain_all(&self) -> Vec<(u16, PacketSink)> {
        let mut entries = self.entries.lock().unwrap();
        entries
            .drain()
            .map(|(msg_seq, entry)| (msg_seq, entry.sink))
            .collect()
    }
}

impl Default for PendingTable {
    fn default() -> Self {
        PendingTable::new()
    }
}

/// Builds the error every drained sink is resolved with on disconnect.
pub fn disconnect_error() -> ConnectorError {
    ConnectorError::Fatal(ErrorCode::ConnectionClosed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::Sink;
    use std::sync::mpsc;
    use std::time::Duration;

    fn sink_pair() -> (PacketSink, mpsc::Receiver<crate::error::ConnectorResult<Packet>>) {
        let (tx, rx) = mpsc::channel();
        let sink = Sink::Callback(Box::new(move |result| {
            tx.send(result).unwrap();
        }));
        (sink, rx)
    }

    #[test]
    fn take_removes_and_returns_matching_entry() {
        let table = PendingTable::new();
        let (sink, rx) = sink_pair();
        table.insert(7, Instant::now() + Duration::from_secs(30), sink);

        let response = Packet::synthetic_timeout(7, 0);
        let sink = table.take(7).unwrap();
        sink.resolve(Ok(response.clone()));
        assert_eq!(rx.recv().unwrap().unwrap(), response);
        assert!(table.is_empty());
    }

    #[test]
    fn take_unknown_seq_returns_none() {
        let table = PendingTable::new();
        assert!(table.take(99).is_none());
    }

    #[test]
    fn collect_expired_only_takes_past_deadlines() {
        let table = PendingTable::new();
        let (sink_a, rx_a) = sink_pair();
        let (sink_b, _rx_b) = sink_pair();
        let now = Instant::now();
        table.insert(1, now, sink_a);
        table.insert(2, now + Duration::from_secs(60), sink_b);

        let expired = table.collect_expired(now);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, 1);
        assert_eq!(table.len(), 1);

        expired
            .into_iter()
            .for_each(|(seq, sink)| sink.resolve(Ok(Packet::synthetic_timeout(seq, ErrorCode::RequestTimeout.code()))));
        assert!(rx_a.recv().unwrap().unwrap().error_code == ErrorCode::RequestTimeout.code());
    }

    #[test]
    fn drain_all_empties_table_and_returns_every_sink() {
        let table = PendingTable::new();
        let (sink_a, rx_a) = sink_pair();
        let (sink_b, rx_b) = sink_pair();
        table.insert(1, Instant::now(), sink_a);
        table.insert(2, Instant::now(), sink_b);

        let drained = table.drain_all();
        assert_eq!(drained.len(), 2);
        assert!(table.is_empty());

        for (seq, sink) in drained {
            sink.resolve(Err(disconnect_error()));
            let _ = seq;
        }
        assert_eq!(rx_a.recv().unwrap().unwrap_err(), disconnect_error());
        assert_eq!(rx_b.recv().unwrap().unwrap_err(), disconnect_error());
    }
}
