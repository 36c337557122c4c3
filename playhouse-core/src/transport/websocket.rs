use crate::error::{ConnectorError, ConnectorResult, ErrorCode};
use crate::sink::Eventual;
use crate::transport::{DisconnectCallback, ErrorCallback, ReceiveCallback, Transport};
use native_tls::TlsConnector;
use slog::{debug, error, Logger};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tungstenite::protocol::WebSocket;
use tungstenite::Message;

const READ_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A plain or TLS-wrapped TCP stream, unified so the handshake and
/// framing code below doesn't need to know which one it has.
enum Stream {
    Plain(TcpStream),
    Tls(Box<native_tls::TlsStream<TcpStream>>),
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf),
            Stream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.write(buf),
            Stream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(s) => s.flush(),
            Stream::Tls(s) => s.flush(),
        }
    }
}

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
    socket: Mutex<Option<WebSocket<Stream>>>,
    connected: AtomicBool,
    disconnect_notified: AtomicBool,
    running: AtomicBool,
    callbacks: Callbacks,
    log: Logger,
}

/// WebSocket transport (`feature = "websocket"`): binary frames over
/// TCP (optionally TLS) via `tungstenite`. The session sees only the
/// decoded application byte stream — the upgrade handshake and frame
/// boundaries never leak past this module.
pub struct WebSocketTransport {
    shared: Arc<Shared>,
    path: String,
    use_ssl: bool,
    skip_certificate_validation: bool,
}

impl WebSocketTransport {
    pub fn new(log: Logger, path: String, use_ssl: bool, skip_certificate_validation: bool) -> WebSocketTransport {
        WebSocketTransport {
            shared: Arc::new(Shared {
                socket: Mutex::new(None),
                connected: AtomicBool::new(false),
                disconnect_notified: AtomicBool::new(false),
                running: AtomicBool::new(false),
                callbacks: Callbacks::new(),
                log,
            }),
            path,
            use_ssl,
            skip_certificate_validation,
        }
    }
}

fn run_io_thread(shared: Arc<Shared>) {
    loop {
        if !shared.running.load(Ordering::Acquire) {
            break;
        }

        let read_result = {
            let mut guard = shared.socket.lock().unwrap();
            match guard.as_mut() {
                Some(socket) => socket.read_message(),
                None => break,
            }
        };

        match read_result {
            Ok(Message::Binary(bytes)) => shared.callbacks.fire_receive(&bytes),
            Ok(Message::Close(_)) => {
                debug!(shared.log, "websocket peer closed");
                break;
            }
            Ok(_) => continue,
            Err(tungstenite::Error::Io(ref err))
                if err.kind() == io::ErrorKind::WouldBlock || err.kind() == io::ErrorKind::TimedOut =>
            {
                continue
            }
            Err(err) => {
                error!(shared.log, "websocket read failed"; "error" => %err);
                shared
                    .callbacks
                    .fire_error(ErrorCode::ConnectionClosed.code(), err.to_string());
                break;
            }
        }
    }

    shared.connected.store(false, Ordering::Release);
    *shared.socket.lock().unwrap() = None;
    if !shared.disconnect_notified.swap(true, Ordering::AcqRel) {
        shared.callbacks.fire_disconnect();
    }
}

impl Transport for WebSocketTransport {
    fn connect(&self, host: &str, port: u16) -> Eventual<bool> {
        let eventual = Eventual::new();
        let result_slot = eventual.clone();
        let shared = Arc::clone(&self.shared);
        let host = host.to_string();
        let path = self.path.clone();
        let use_ssl = self.use_ssl;
        let skip_validation = self.skip_certificate_validation;

        thread::spawn(move || {
            let scheme = if use_ssl { "wss" } else { "ws" };
            let url = format!("{}://{}:{}{}", scheme, host, port, path);

            let outcome = (|| -> Result<WebSocket<Stream>, String> {
                let tcp = TcpStream::connect((host.as_str(), port)).map_err(|e| e.to_string())?;
                tcp.set_read_timeout(Some(READ_POLL_INTERVAL)).map_err(|e| e.to_string())?;

                let stream = if use_ssl {
                    let connector = TlsConnector::builder()
                        .danger_accept_invalid_certs(skip_validation)
                        .build()
                        .map_err(|e| e.to_string())?;
                    let tls = connector.connect(&host, tcp).map_err(|e| e.to_string())?;
                    Stream::Tls(Box::new(tls))
                } else {
                    Stream::Plain(tcp)
                };

                let (socket, _response) = tungstenite::client(url, stream).map_err(|e| e.to_string())?;
                Ok(socket)
            })();

            match outcome {
                Ok(socket) => {
                    *shared.socket.lock().unwrap() = Some(socket);
                    shared.connected.store(true, Ordering::Release);
                    shared.disconnect_notified.store(false, Ordering::Release);
                    shared.running.store(true, Ordering::Release);
                    debug!(shared.log, "websocket connected"; "host" => %host, "port" => port);
                    result_slot.resolve(true);
                    run_io_thread(shared);
                }
                Err(message) => {
                    error!(shared.log, "websocket connect failed"; "host" => %host, "port" => port, "error" => %message);
                    shared.callbacks.fire_error(ErrorCode::ConnectionFailed.code(), message);
                    result_slot.resolve(false);
                }
            }
        });

        eventual
    }

    fn disconnect(&self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(mut socket) = self.shared.socket.lock().unwrap().take() {
            let _ = socket.close(None);
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
        let mut guard = self.shared.socket.lock().unwrap();
        match guard.as_mut() {
            Some(socket) => socket
                .write_message(Message::Binary(bytes.to_vec()))
                .map_err(|err| match err {
                    tungstenite::Error::Io(io_err) => ConnectorError::from(io_err),
                    _ => ConnectorError::Fatal(ErrorCode::ConnectionClosed),
                }),
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
