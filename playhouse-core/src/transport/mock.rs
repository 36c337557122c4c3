use crate::error::{ConnectorError, ConnectorResult, ErrorCode};
use crate::sink::Eventual;
use crate::transport::{DisconnectCallback, ErrorCallback, ReceiveCallback, Transport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory test double: no real socket, just a byte sink the test can
/// inspect and a way to inject inbound bytes/disconnects/errors on
/// demand, driven entirely by the calling thread instead of a real I/O
/// thread.
pub struct MockTransport {
    connected: AtomicBool,
    sent: Mutex<Vec<u8>>,
    fail_connect: AtomicBool,
    receive: Mutex<Option<ReceiveCallback>>,
    disconnect: Mutex<Option<DisconnectCallback>>,
    error: Mutex<Option<ErrorCallback>>,
}

impl MockTransport {
    pub fn new() -> Arc<MockTransport> {
        Arc::new(MockTransport {
            connected: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            fail_connect: AtomicBool::new(false),
            receive: Mutex::new(None),
            disconnect: Mutex::new(None),
            error: Mutex::new(None),
        })
    }

    /// Makes the next `connect` call resolve to `false`, as if the peer
    /// refused the connection.
    pub fn fail_next_connect(&self) {
        self.fail_connect.store(true, Ordering::Release);
    }

    /// Everything passed to `send` so far, concatenated in call order.
    pub fn sent_bytes(&self) -> Vec<u8> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear_sent(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Simulates inbound bytes arriving on the (nonexistent) I/O
    /// thread. Runs the receive callback synchronously on the calling
    /// thread, matching how a real transport's I/O thread would call
    /// straight into the session's receive path.
    pub fn feed(&self, bytes: &[u8]) {
        if let Some(callback) = self.receive.lock().unwrap().as_ref() {
            callback(bytes);
        }
    }

    /// Simulates the peer closing the connection.
    pub fn simulate_disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        if let Some(callback) = self.disconnect.lock().unwrap().as_ref() {
            callback();
        }
    }

    pub fn simulate_error(&self, code: i16, message: &str) {
        if let Some(callback) = self.error.lock().unwrap().as_ref() {
            callback(code, message.to_string());
        }
    }
}

impl Transport for MockTransport {
    fn connect(&self, _host: &str, _port: u16) -> Eventual<bool> {
        let eventual = Eventual::new();
        if self.fail_connect.swap(false, Ordering::AcqRel) {
            eventual.resolve(false);
        } else {
            self.connected.store(true, Ordering::Release);
            eventual.resolve(true);
        }
        eventual
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn send(&self, bytes: &[u8]) -> ConnectorResult<()> {
        if !self.is_connected() {
            return Err(ConnectorError::Fatal(ErrorCode::ConnectionClosed));
        }
        self.sent.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }

    fn set_receive_callback(&self, callback: ReceiveCallback) {
        *self.receive.lock().unwrap() = Some(callback);
    }

    fn set_disconnect_callback(&self, callback: DisconnectCallback) {
        *self.disconnect.lock().unwrap() = Some(callback);
    }

    fn set_error_callback(&self, callback: ErrorCallback) {
        *self.error.lock().unwrap() = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn connect_resolves_true_by_default() {
        let transport = MockTransport::new();
        assert_eq!(transport.connect("h", 1).wait(Duration::from_secs(1)), Some(true));
        assert!(transport.is_connected());
    }

    #[test]
    fn fail_next_connect_resolves_false_once() {
        let transport = MockTransport::new();
        transport.fail_next_connect();
        assert_eq!(transport.connect("h", 1).wait(Duration::from_secs(1)), Some(false));
        assert!(!transport.is_connected());

        assert_eq!(transport.connect("h", 1).wait(Duration::from_secs(1)), Some(true));
    }

    #[test]
    fn send_records_bytes_when_connected() {
        let transport = MockTransport::new();
        transport.connect("h", 1).wait(Duration::from_secs(1));
        transport.send(b"abc").unwrap();
        transport.send(b"def").unwrap();
        assert_eq!(transport.sent_bytes(), b"abcdef");
    }

    #[test]
    fn send_fails_when_not_connected() {
        let transport = MockTransport::new();
        assert!(transport.send(b"abc").is_err());
    }

    #[test]
    fn feed_invokes_receive_callback() {
        let transport = MockTransport::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        transport.set_receive_callback(Box::new(move |bytes| {
            sink.lock().unwrap().extend_from_slice(bytes);
        }));

        transport.feed(b"hello");
        assert_eq!(*received.lock().unwrap(), b"hello");
    }
}
