use crate::error::{ConnectorError, ConnectorResult, ErrorCode};
use crate::sink::Eventual;
use crate::transport::{DisconnectCallback, ErrorCallback, ReceiveCallback, Transport};
use slog::{debug, error, Logger};
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

const READ_CHUNK: usize = 64 * 1024;

struct Callbacks {
    receive: Mutex<Option<ReceiveCallback>>,
    disconnect: Mutex<Option<DisconnectCallback>>,
    error: Mutex<Option<ErrorCallback>>,
}

impl Callbacks {
    fn new() -> Callbacks {
        Callbacks {
            receive: Mutex::new(None),
            disconnect: Mutex::new(None),
            error: Mutex::new(None),
        }
    }

    fn fire_receive(&self, bytes: &[u8]) {
        if let Some(callback) = self.receive.lock().unwrap().as_ref() {
            callback(bytes);
        }
    }

    fn fire_disconnect(&self) {
        if let Some(callback) = self.disconnect.lock().unwrap().as_ref() {
            callback();
        }
    }

    fn fire_error(&self, code: i16, message: String) {
        if let Some(callback) = self.error.lock().unwrap().as_ref() {
            callback(code, message);
        }
    }
}

struct Shared {
    stream: Mutex<Option<TcpStream>>,
    connected: AtomicBool,
    disconnect_notified: AtomicBool,
    callbacks: Callbacks,
    log: Logger,
}

/// Plain TCP transport: a `std::net::TcpStream` plus a dedicated
/// blocking-read I/O thread. The default and always-available
/// transport — TLS and WebSocket transports wrap the same pattern.
pub struct TcpTransport {
    shared: Arc<Shared>,
}

impl TcpTransport {
    pub fn new(log: Logger) -> TcpTransport {
        TcpTransport {
            shared: Arc::new(Shared {
                stream: Mutex::new(None),
                connected: AtomicBool::new(false),
                disconnect_notified: AtomicBool::new(false),
                callbacks: Callbacks::new(),
                log,
            }),
        }
    }
}

fn run_io_thread(shared: Arc<Shared>, mut stream: TcpStream) {
    let mut buf = [0u8; READ_CHUNK];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => {
                debug!(shared.log, "transport read returned eof");
                break;
            }
            Ok(n) => shared.callbacks.fire_receive(&buf[..n]),
            Err(err) => {
                error!(shared.log, "transport read failed"; "error" => %err);
                shared
                    .callbacks
                    .fire_error(ErrorCode::ConnectionClosed.code(), err.to_string());
                break;
            }
        }
    }

    shared.connected.store(false, Ordering::Release);
    *shared.stream.lock().unwrap() = None;
    if !shared.disconnect_notified.swap(true, Ordering::AcqRel) {
        shared.callbacks.fire_disconnect();
    }
}

impl Transport for TcpTransport {
    fn connect(&self, host: &str, port: u16) -> Eventual<bool> {
        let eventual = Eventual::new();
        let result_slot = eventual.clone();
        let shared = Arc::clone(&self.shared);
        let host = host.to_string();

        thread::spawn(move || match TcpStream::connect((host.as_str(), port)) {
            Ok(stream) => {
                let io_stream = stream.try_clone().expect("failed to clone tcp stream");
                *shared.stream.lock().unwrap() = Some(stream);
                shared.connected.store(true, Ordering::Release);
                shared.disconnect_notified.store(false, Ordering::Release);
                debug!(shared.log, "tcp connected"; "host" => %host, "port" => port);
                result_slot.resolve(true);

                run_io_thread(shared, io_stream);
            }
            Err(err) => {
                error!(shared.log, "tcp connect failed"; "host" => %host, "port" => port, "error" => %err);
                shared
                    .callbacks
                    .fire_error(ErrorCode::ConnectionFailed.code(), err.to_string());
                result_slot.resolve(false);
            }
        });

        eventual
    }

    fn disconnect(&self) {
        let stream = self.shared.stream.lock().unwrap().take();
        if let Some(stream) = stream {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.shared.connected.store(false, Ordering::Release);
        if !self.shared.disconnect_notified.swap(true, Ordering::AcqRel) {
            self.shared.callbacks.fire_disconnect();
        }
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    fn send(&self, bytes: &[u8]) -> ConnectorResult<()> {
        let mut guard = self.shared.stream.lock().unwrap();
        match guard.as_mut() {
            Some(stream) => stream.write_all(bytes).map_err(ConnectorError::from),
            None => Err(ConnectorError::Fatal(ErrorCode::ConnectionClosed)),
        }
    }

    fn set_receive_callback(&self, callback: ReceiveCallback) {
        *self.shared.callbacks.receive.lock().unwrap() = Some(callback);
    }

    fn set_disconnect_callback(&self, callback: DisconnectCallback) {
        *self.shared.callbacks.disconnect.lock().unwrap() = Some(callback);
    }

    fn set_error_callback(&self, callback: ErrorCallback) {
        *self.shared.callbacks.error.lock().unwrap() = Some(callback);
    }
}
