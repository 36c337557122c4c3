use crate::error::{ConnectorError, ConnectorResult, ErrorCode};
use crate::sink::Eventual;
use crate::transport::{DisconnectCallback, ErrorCallback, ReceiveCallback, Transport};
use native_tls::{TlsConnector, TlsStream};
use slog::{debug, error, Logger};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const READ_CHUNK: usize = 64 * 1024;

/// How often a blocked read wakes up to check for a pending
/// disconnect/send. Keeps one `Mutex<TlsStream<_>>` usable from both
/// the I/O thread and callers of `send` without splitting the session.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(200);

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
    stream: Mutex<Option<TlsStream<TcpStream>>>,
    connected: AtomicBool,
    disconnect_notified: AtomicBool,
    running: AtomicBool,
    callbacks: Callbacks,
    log: Logger,
}

/// TLS transport (`feature = "tls"`): a `TcpStream` wrapped in
/// `native_tls::TlsStream`. Honors `skip_server_certificate_validation`
/// from the connector's config via `danger_accept_invalid_certs`.
pub struct TlsTransport {
    shared: Arc<Shared>,
    skip_certificate_validation: bool,
}

impl TlsTransport {
    pub fn new(log: Logger, skip_certificate_validation: bool) -> TlsTransport {
        TlsTransport {
            shared: Arc::new(Shared {
                stream: Mutex::new(None),
                connected: AtomicBool::new(false),
                disconnect_notified: AtomicBool::new(false),
                running: AtomicBool::new(false),
                callbacks: Callbacks::new(),
                log,
            }),
            skip_certificate_validation,
        }
    }
}

fn run_io_thread(shared: Arc<Shared>) {
    let mut buf = [0u8; READ_CHUNK];
    while shared.running.load(Ordering::Acquire) {
        let read_result = {
            let mut guard = shared.stream.lock().unwrap();
            match guard.as_mut() {
                Some(stream) => stream.read(&mut buf),
                None => break,
            }
        };

        match read_result {
            Ok(0) => {
                debug!(shared.log, "tls stream returned eof");
                break;
            }
            Ok(n) => shared.callbacks.fire_receive(&buf[..n]),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock || err.kind() == io::ErrorKind::TimedOut => continue,
            Err(err) => {
                error!(shared.log, "tls read failed"; "error" => %err);
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

impl Transport for TlsTransport {
    fn connect(&self, host: &str, port: u16) -> Eventual<bool> {
        let eventual = Eventual::new();
        let result_slot = eventual.clone();
        let shared = Arc::clone(&self.shared);
        let host = host.to_string();
        let skip_validation = self.skip_certificate_validation;

        thread::spawn(move || {
            let outcome = (|| -> Result<TlsStream<TcpStream>, String> {
                let tcp = TcpStream::connect((host.as_str(), port)).map_err(|e| e.to_string())?;
                tcp.set_read_timeout(Some(READ_POLL_INTERVAL))
                    .map_err(|e| e.to_string())?;

                let connector = TlsConnector::builder()
                    .danger_accept_invalid_certs(skip_validation)
                    .build()
                    .map_err(|e| e.to_string())?;

                connector.connect(&host, tcp).map_err(|e| e.to_string())
            })();

            match outcome {
                Ok(stream) => {
                    *shared.stream.lock().unwrap() = Some(stream);
                    shared.connected.store(true, Ordering::Release);
                    shared.disconnect_notified.store(false, Ordering::Release);
                    shared.running.store(true, Ordering::Release);
                    debug!(shared.log, "tls connected"; "host" => %host, "port" => port);
                    result_slot.resolve(true);
                    run_io_thread(shared);
                }
                Err(message) => {
                    error!(shared.log, "tls connect failed"; "host" => %host, "port" => port, "error" => %message);
                    shared.callbacks.fire_error(ErrorCode::ConnectionFailed.code(), message);
                    result_slot.resolve(false);
                }
            }
        });

        eventual
    }

    fn disconnect(&self) {
        self.shared.running.store(false, Ordering::Release);
        *self.shared.stream.lock().unwrap() = None;
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
