use crate::codec;
use crate::config::Config;
use crate::dispatch::DispatchQueue;
use crate::error::{ConnectorError, ErrorCode};
use crate::packet::{Packet, NO_SEQUENCE};
use crate::pending::PendingTable;
use crate::ring_buffer::RingBuffer;
use crate::sink::{Eventual, PacketSink, Sink};
use crate::timeout::TimeoutReaper;
use crate::transport::tcp::TcpTransport;
#[cfg(feature = "tls")]
use crate::transport::tls::TlsTransport;
#[cfg(feature = "websocket")]
use crate::transport::websocket::WebSocketTransport;
use crate::transport::Transport;
use playhouse_support::time;
use slog::{debug, o, warn, Logger};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum SessionState {
    Initialized,
    Connecting,
    Connected,
    Disconnected,
}

type ConnectCallback = Box<dyn Fn() + Send + Sync>;
type DisconnectCallback = Box<dyn Fn() + Send + Sync>;
type ReceiveCallback = Box<dyn Fn(Packet) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(i16, String) + Send + Sync>;

/// Builds the transport selected by `config`. `playhouse-core` always
/// provides plain TCP; TLS and WebSocket require their respective
/// feature flags.
pub fn select_transport(config: &Config, log: Logger) -> Arc<dyn Transport> {
    if config.use_websocket {
        #[cfg(feature = "websocket")]
        {
            return Arc::new(WebSocketTransport::new(
                log,
                config.websocket_path.clone(),
                config.use_ssl,
                config.skip_server_certificate_validation,
            ));
        }
        #[cfg(not(feature = "websocket"))]
        panic!("use_websocket requires the `websocket` feature");
    } else if config.use_ssl {
        #[cfg(feature = "tls")]
        {
            return Arc::new(TlsTransport::new(log, config.skip_server_certificate_validation));
        }
        #[cfg(not(feature = "tls"))]
        panic!("use_ssl requires the `tls` feature");
    }

    #[allow(unreachable_code)]
    Arc::new(TcpTransport::new(log))
}

/// Session core: owns configuration, transport, receive buffer, pending
/// table, dispatch queue and timeout reaper, and implements the
/// connection state machine. One connector manages one client-side
/// connection to one server.
pub struct Connector {
    config: Config,
    transport: Arc<dyn Transport>,
    ring_buffer: Mutex<RingBuffer>,
    pending: Arc<PendingTable>,
    dispatch: Arc<DispatchQueue>,
    reaper: Mutex<Option<TimeoutReaper>>,
    sequence: Mutex<u16>,
    state: Mutex<SessionState>,
    authenticated: AtomicBool,
    disconnect_notified: AtomicBool,
    endpoint: Mutex<Option<(String, u16)>>,
    reconnect_attempts: AtomicU32,
    on_connect: Mutex<Option<ConnectCallback>>,
    on_disconnect: Mutex<Option<DisconnectCallback>>,
    on_receive: Mutex<Option<ReceiveCallback>>,
    on_error: Mutex<Option<ErrorCallback>>,
    log: Logger,
}

impl Connector {
    /// Captures configuration, builds the ring buffer at the
    /// configured receive capacity, and registers the
    /// timeout reaper. The transport is supplied by the caller —
    /// typically via [`select_transport`] — so tests can inject
    /// [`crate::transport::mock::MockTransport`] instead.
    pub fn init(config: Config, transport: Arc<dyn Transport>, log: Logger) -> Arc<Connector> {
        let pending = Arc::new(PendingTable::new());
        let dispatch = Arc::new(DispatchQueue::new());
        let reaper = TimeoutReaper::start(
            Arc::clone(&pending),
            Arc::clone(&dispatch),
            log.new(o!("component" => "timeout_reaper")),
        );
        let ring_buffer = RingBuffer::new(config.receive_buffer_size);

        let connector = Arc::new(Connector {
            config,
            transport,
            ring_buffer: Mutex::new(ring_buffer),
            pending,
            dispatch,
            reaper: Mutex::new(Some(reaper)),
            sequence: Mutex::new(0),
            state: Mutex::new(SessionState::Initialized),
            authenticated: AtomicBool::new(false),
            disconnect_notified: AtomicBool::new(false),
            endpoint: Mutex::new(None),
            reconnect_attempts: AtomicU32::new(0),
            on_connect: Mutex::new(None),
            on_disconnect: Mutex::new(None),
            on_receive: Mutex::new(None),
            on_error: Mutex::new(None),
            log,
        });

        connector.wire_transport_callbacks();
        connector
    }

    fn wire_transport_callbacks(self: &Arc<Self>) {
        let receive_target = Arc::clone(self);
        self.transport.set_receive_callback(Box::new(move |bytes| {
            receive_target.handle_inbound(bytes);
        }));

        let disconnect_target = Arc::clone(self);
        self.transport
            .set_disconnect_callback(Box::new(move || disconnect_target.teardown(false)));

        let error_target = Arc::clone(self);
        self.transport.set_error_callback(Box::new(move |code, message| {
            error_target.dispatch_on_error(code, message);
        }));
    }

    pub fn set_on_connect<F: Fn() + Send + Sync + 'static>(&self, f: F) {
        *self.on_connect.lock().unwrap() = Some(Box::new(f));
    }

    pub fn set_on_disconnect<F: Fn() + Send + Sync + 'static>(&self, f: F) {
        *self.on_disconnect.lock().unwrap() = Some(Box::new(f));
    }

    pub fn set_on_receive<F: Fn(Packet) + Send + Sync + 'static>(&self, f: F) {
        *self.on_receive.lock().unwrap() = Some(Box::new(f));
    }

    pub fn set_on_error<F: Fn(i16, String) + Send + Sync + 'static>(&self, f: F) {
        *self.on_error.lock().unwrap() = Some(Box::new(f));
    }

    /// Valid only from `INITIALIZED` or `DISCONNECTED`. Never blocks the
    /// caller; the returned eventual resolves once the transport's
    /// handshake completes.
    pub fn connect(self: &Arc<Self>, host: &str, port: u16) -> Eventual<bool> {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                SessionState::Initialized | SessionState::Disconnected => *state = SessionState::Connecting,
                SessionState::Connecting | SessionState::Connected => {
                    let eventual = Eventual::new();
                    eventual.resolve(false);
                    return eventual;
                }
            }
        }

        *self.endpoint.lock().unwrap() = Some((host.to_string(), port));
        self.reconnect_attempts.store(0, Ordering::Release);

        let caller_result = Eventual::new();
        let returned = caller_result.clone();
        let transport_result = self.transport.connect(host, port);
        let me = Arc::clone(self);

        thread::spawn(move || {
            let connected = transport_result.wait(Duration::from_secs(3600)).unwrap_or(false);
            me.finish_connect(connected);
            caller_result.resolve(connected);
        });

        returned
    }

    fn finish_connect(self: &Arc<Self>, connected: bool) {
        let mut state = self.state.lock().unwrap();
        if connected {
            *state = SessionState::Connected;
            drop(state);
            self.disconnect_notified.store(false, Ordering::Release);
            debug!(self.log, "connector connected");
            self.dispatch_on_connect();
        } else {
            *state = SessionState::Disconnected;
            drop(state);
            warn!(self.log, "connector failed to connect");
            self.dispatch_on_error(ErrorCode::ConnectionFailed.code(), "connection failed".to_string());
        }
    }

    /// Idempotent, user-initiated. Does not trigger auto-reconnect even
    /// when enabled — only a transport-initiated disconnect does.
    pub fn disconnect(self: &Arc<Self>) {
        let already_done = matches!(
            *self.state.lock().unwrap(),
            SessionState::Disconnected
        );
        if already_done {
            return;
        }
        self.transport.disconnect();
        self.teardown(true);
    }

    fn teardown(self: &Arc<Self>, user_initiated: bool) {
        if self.disconnect_notified.swap(true, Ordering::AcqRel) {
            return;
        }

        *self.state.lock().unwrap() = SessionState::Disconnected;
        self.authenticated.store(false, Ordering::Release);

        let drained = self.pending.drain_all();
        for (msg_seq, sink) in drained {
            let packet = Packet::synthetic_timeout(msg_seq, ErrorCode::ConnectionClosed.code());
            self.dispatch.enqueue(move || sink.resolve(Ok(packet)));
        }

        let me = Arc::clone(self);
        self.dispatch.enqueue(move || {
            if let Some(callback) = me.on_disconnect.lock().unwrap().as_ref() {
                callback();
            }
        });

        if !user_initiated {
            self.maybe_reconnect();
        }
    }

    fn maybe_reconnect(self: &Arc<Self>) {
        if !self.config.enable_reconnect {
            return;
        }

        let attempts = self.reconnect_attempts.fetch_add(1, Ordering::AcqRel) + 1;
        if attempts > self.config.max_reconnect_attempts {
            return;
        }

        let endpoint = self.endpoint.lock().unwrap().clone();
        let (host, port) = match endpoint {
            Some(endpoint) => endpoint,
            None => return,
        };

        let me = Arc::clone(self);
        let delay = Duration::from_millis(self.config.reconnect_interval_ms);
        thread::spawn(move || {
            thread::sleep(delay);
            me.connect(&host, port);
        });
    }

    pub fn is_connected(&self) -> bool {
        *self.state.lock().unwrap() == SessionState::Connected
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// Fire-and-forget. Forces `msg_seq = 0`.
    pub fn send(self: &Arc<Self>, mut packet: Packet) {
        packet.msg_seq = NO_SEQUENCE;

        if !self.is_connected() {
            self.dispatch_on_error(ErrorCode::ConnectionClosed.code(), "not connected".to_string());
            return;
        }

        match codec::encode_request(&packet) {
            Ok(bytes) => self.transmit(bytes),
            Err(err) => self.dispatch_fatal(err),
        }
    }

    /// Allocates the next sequence, records the pending entry before
    /// sending so a response can never race ahead of the table insert,
    /// then encodes and sends.
    pub fn request(self: &Arc<Self>, mut packet: Packet, sink: PacketSink) {
        if !self.is_connected() {
            self.dispatch_on_error(ErrorCode::ConnectionClosed.code(), "not connected".to_string());
            return;
        }

        let msg_seq = self.allocate_sequence();
        packet.msg_seq = msg_seq;

        match codec::encode_request(&packet) {
            Ok(bytes) => {
                let deadline = time::deadline_after(time::now(), self.config.request_timeout_ms);
                self.pending.insert(msg_seq, deadline, sink);

                if let Err(err) = self.transport.send(&bytes) {
                    if let Some(sink) = self.pending.take(msg_seq) {
                        sink.resolve(Err(err));
                    }
                }
            }
            Err(err) => sink.resolve(Err(err)),
        }
    }

    /// A `request` wrapper whose sink extracts `error_code == 0`, sets
    /// the authenticated flag on success, and delivers the boolean.
    pub fn authenticate(self: &Arc<Self>, packet: Packet, sink: Sink<bool>) {
        let me = Arc::clone(self);
        let wrapped: PacketSink = Sink::Callback(Box::new(move |result| match result {
            Ok(response) => {
                let success = response.error_code == 0;
                if success {
                    me.authenticated.store(true, Ordering::Release);
                }
                sink.resolve(success);
            }
            Err(_) => sink.resolve(false),
        }));

        self.request(packet, wrapped);
    }

    /// Convenience wrapper over [`Connector::request`] for callers who
    /// want to block on the result rather than supply a callback.
    pub fn request_eventual(self: &Arc<Self>, packet: Packet) -> Eventual<crate::error::ConnectorResult<Packet>> {
        let eventual = Eventual::new();
        self.request(packet, Sink::Eventual(eventual.clone()));
        eventual
    }

    /// Convenience wrapper over [`Connector::authenticate`] for callers
    /// who want to block on the result rather than supply a callback.
    pub fn authenticate_eventual(self: &Arc<Self>, packet: Packet) -> Eventual<bool> {
        let eventual = Eventual::new();
        self.authenticate(packet, Sink::Eventual(eventual.clone()));
        eventual
    }

    /// Drains the dispatch queue on the calling thread.
    pub fn drive_main_thread(&self) {
        self.dispatch.drive(&self.log);
    }

    fn allocate_sequence(&self) -> u16 {
        let mut sequence = self.sequence.lock().unwrap();
        let mut next = sequence.wrapping_add(1);
        if next == 0 {
            next = next.wrapping_add(1);
        }
        *sequence = next;
        next
    }

    fn transmit(self: &Arc<Self>, bytes: Vec<u8>) {
        if let Err(err) = self.transport.send(&bytes) {
            self.dispatch_fatal(err);
        }
    }

    fn dispatch_fatal(self: &Arc<Self>, err: ConnectorError) {
        if let ConnectorError::Fatal(code) = err {
            self.dispatch_on_error(code.code(), code.to_string());
        }
    }

    fn dispatch_on_connect(self: &Arc<Self>) {
        let me = Arc::clone(self);
        self.dispatch.enqueue(move || {
            if let Some(callback) = me.on_connect.lock().unwrap().as_ref() {
                callback();
            }
        });
    }

    fn dispatch_on_error(self: &Arc<Self>, code: i16, message: String) {
        let me = Arc::clone(self);
        self.dispatch.enqueue(move || {
            if let Some(callback) = me.on_error.lock().unwrap().as_ref() {
                callback(code, message);
            }
        });
    }

    fn dispatch_on_receive(self: &Arc<Self>, packet: Packet) {
        let me = Arc::clone(self);
        self.dispatch.enqueue(move || {
            if let Some(callback) = me.on_receive.lock().unwrap().as_ref() {
                callback(packet);
            }
        });
    }

    /// Inbound frame handling. Runs on whichever thread the transport's
    /// receive callback calls from — the contract requires that to be a
    /// single, consistent thread per transport.
    fn handle_inbound(self: &Arc<Self>, bytes: &[u8]) {
        let mut buffer = self.ring_buffer.lock().unwrap();

        if buffer.write(bytes).is_err() {
            buffer.clear();
            drop(buffer);
            self.dispatch_on_error(ErrorCode::BufferOverflow.code(), "receive buffer overflow".to_string());
            self.disconnect();
            return;
        }

        loop {
            if buffer.len() < 4 {
                break;
            }

            let mut len_bytes = [0u8; 4];
            buffer.peek(&mut len_bytes, 0).expect("length already checked");
            let content_size = u32::from_le_bytes(len_bytes) as usize;

            if content_size > crate::packet::MAX_PAYLOAD_LEN {
                buffer.clear();
                drop(buffer);
                self.dispatch_on_error(ErrorCode::ProtocolViolation.code(), "content size exceeds maximum".to_string());
                self.disconnect();
                return;
            }

            if buffer.len() < 4 + content_size {
                break;
            }

            let mut frame = vec![0u8; 4 + content_size];
            buffer.read(&mut frame).expect("length already checked");

            match codec::decode_response(&frame) {
                Ok(packet) => self.route_decoded(packet),
                Err(_) => {
                    self.dispatch_on_error(ErrorCode::InvalidResponse.code(), "failed to decode frame".to_string());
                    continue;
                }
            }
        }
    }

    fn route_decoded(self: &Arc<Self>, packet: Packet) {
        if packet.msg_seq != NO_SEQUENCE {
            if let Some(sink) = self.pending.take(packet.msg_seq) {
                self.dispatch.enqueue(move || sink.resolve(Ok(packet)));
                return;
            }
        }

        self.dispatch_on_receive(packet);
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        if let Some(mut reaper) = self.reaper.lock().unwrap().take() {
            reaper.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use playhouse_support::logging;
    use std::sync::mpsc;

    fn init_connector() -> (Arc<Connector>, Arc<MockTransport>) {
        let transport = MockTransport::new();
        let connector = Connector::init(Config::default(), Arc::clone(&transport) as Arc<dyn Transport>, logging::discard());
        (connector, transport)
    }

    fn connect(connector: &Arc<Connector>) {
        let result = connector.connect("localhost", 9000).wait(Duration::from_secs(1));
        assert_eq!(result, Some(true));
        assert!(connector.is_connected());
    }

    #[test]
    fn echo_round_trip_via_request() {
        let (connector, transport) = init_connector();
        connect(&connector);

        let (tx, rx) = mpsc::channel();
        let sink: PacketSink = Sink::Callback(Box::new(move |result| tx.send(result).unwrap()));
        connector.request(Packet::request("EchoRequest", b"Hello World".to_vec()), sink);

        let sent = transport.sent_bytes();
        let allocated_seq = request_msg_seq(&sent);

        let mut response = Packet {
            msg_id: "EchoReply".to_string(),
            msg_seq: allocated_seq,
            stage_id: 0,
            error_code: 0,
            original_size: 0,
            payload: b"Hello World".to_vec(),
        };
        let response_frame = encode_as_response(&mut response);
        transport.feed(&response_frame);
        connector.drive_main_thread();

        let delivered = rx.recv_timeout(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(delivered.msg_id, "EchoReply");
        assert_eq!(delivered.payload, b"Hello World");
    }

    #[test]
    fn authenticate_success_sets_authenticated_flag() {
        let (connector, transport) = init_connector();
        connect(&connector);

        let (tx, rx) = mpsc::channel();
        let sink: Sink<bool> = Sink::Callback(Box::new(move |success| tx.send(success).unwrap()));
        connector.authenticate(Packet::request("Login", b"token".to_vec()), sink);

        let sent = transport.sent_bytes();
        let allocated_seq = request_msg_seq(&sent);

        let mut response = Packet {
            msg_id: "LoginReply".to_string(),
            msg_seq: allocated_seq,
            stage_id: 0,
            error_code: 0,
            original_size: 0,
            payload: Vec::new(),
        };
        transport.feed(&encode_as_response(&mut response));
        connector.drive_main_thread();

        let success = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(success, true);
        assert!(connector.is_authenticated());
    }

    #[test]
    fn authenticate_failure_leaves_authenticated_flag_unset() {
        let (connector, transport) = init_connector();
        connect(&connector);

        let (tx, rx) = mpsc::channel();
        let sink: Sink<bool> = Sink::Callback(Box::new(move |success| tx.send(success).unwrap()));
        connector.authenticate(Packet::request("Login", b"bad-token".to_vec()), sink);

        let sent = transport.sent_bytes();
        let allocated_seq = request_msg_seq(&sent);

        let mut response = Packet {
            msg_id: "LoginReply".to_string(),
            msg_seq: allocated_seq,
            stage_id: 0,
            error_code: ErrorCode::AuthenticationFailed.code(),
            original_size: 0,
            payload: Vec::new(),
        };
        transport.feed(&encode_as_response(&mut response));
        connector.drive_main_thread();

        let success = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(success, false);
        assert!(!connector.is_authenticated());
    }

    #[test]
    fn request_eventual_resolves_with_the_response() {
        let (connector, transport) = init_connector();
        connect(&connector);

        let pending = connector.request_eventual(Packet::request("EchoRequest", b"hi".to_vec()));

        let sent = transport.sent_bytes();
        let allocated_seq = request_msg_seq(&sent);

        let mut response = Packet {
            msg_id: "EchoReply".to_string(),
            msg_seq: allocated_seq,
            stage_id: 0,
            error_code: 0,
            original_size: 0,
            payload: b"hi".to_vec(),
        };
        transport.feed(&encode_as_response(&mut response));
        connector.drive_main_thread();

        let delivered = pending.wait(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(delivered.msg_id, "EchoReply");
        assert_eq!(delivered.payload, b"hi".to_vec());
    }

    #[test]
    fn authenticate_eventual_resolves_with_the_outcome() {
        let (connector, transport) = init_connector();
        connect(&connector);

        let pending = connector.authenticate_eventual(Packet::request("Login", b"token".to_vec()));

        let sent = transport.sent_bytes();
        let allocated_seq = request_msg_seq(&sent);

        let mut response = Packet {
            msg_id: "LoginReply".to_string(),
            msg_seq: allocated_seq,
            stage_id: 0,
            error_code: 0,
            original_size: 0,
            payload: Vec::new(),
        };
        transport.feed(&encode_as_response(&mut response));
        connector.drive_main_thread();

        assert_eq!(pending.wait(Duration::from_secs(1)), Some(true));
        assert!(connector.is_authenticated());
    }

    #[test]
    fn push_with_zero_sequence_reaches_on_receive() {
        let (connector, transport) = init_connector();
        connect(&connector);

        let (tx, rx) = mpsc::channel();
        connector.set_on_receive(move |packet| tx.send(packet).unwrap());

        let mut push = Packet {
            msg_id: "BroadcastNotify".to_string(),
            msg_seq: NO_SEQUENCE,
            stage_id: 0,
            error_code: 0,
            original_size: 0,
            payload: b"hi".to_vec(),
        };
        transport.feed(&encode_as_response(&mut push));
        connector.drive_main_thread();

        let delivered = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(delivered.msg_id, "BroadcastNotify");
        assert_eq!(delivered.msg_seq, NO_SEQUENCE);
    }

    #[test]
    fn request_times_out_when_no_response_arrives() {
        let mut config = Config::default();
        config.request_timeout_ms = 100;
        let transport = MockTransport::new();
        let connector = Connector::init(config, Arc::clone(&transport) as Arc<dyn Transport>, logging::discard());
        connect(&connector);

        let (tx, rx) = mpsc::channel();
        let sink: PacketSink = Sink::Callback(Box::new(move |result| tx.send(result).unwrap()));
        connector.request(Packet::request("NoResponseRequest", Vec::new()), sink);

        let result = rx.recv_timeout(Duration::from_millis(500)).unwrap().unwrap();
        assert_eq!(result.msg_id, crate::packet::TIMEOUT_MSG_ID);
        assert_eq!(result.error_code, ErrorCode::RequestTimeout.code());
    }

    #[test]
    fn disconnect_drains_every_pending_request() {
        let (connector, _transport) = init_connector();
        connect(&connector);

        let mut receivers = Vec::new();
        for i in 0..3 {
            let (tx, rx) = mpsc::channel();
            let sink: PacketSink = Sink::Callback(Box::new(move |result| tx.send(result).unwrap()));
            connector.request(Packet::request(format!("Req{}", i), Vec::new()), sink);
            receivers.push(rx);
        }

        let (disc_tx, disc_rx) = mpsc::channel();
        connector.set_on_disconnect(move || disc_tx.send(()).unwrap());

        connector.disconnect();
        connector.drive_main_thread();

        for rx in receivers {
            let result = rx.recv_timeout(Duration::from_secs(1)).unwrap().unwrap();
            assert_eq!(result.msg_id, crate::packet::TIMEOUT_MSG_ID);
            assert_eq!(result.error_code, ErrorCode::ConnectionClosed.code());
        }
        assert_eq!(disc_rx.try_recv().is_ok(), true);
        assert_eq!(disc_rx.try_recv().is_err(), true);
    }

    #[test]
    fn oversize_payload_never_reaches_transport() {
        let (connector, transport) = init_connector();
        connect(&connector);

        let (tx, rx) = mpsc::channel();
        let sink: PacketSink = Sink::Callback(Box::new(move |result| tx.send(result).unwrap()));
        let oversized = vec![0u8; crate::packet::MAX_PAYLOAD_LEN + 1];
        connector.request(Packet::request("TooBig", oversized), sink);

        let err = rx.recv_timeout(Duration::from_secs(1)).unwrap().unwrap_err();
        assert_eq!(err, ConnectorError::Fatal(ErrorCode::ProtocolViolation));
        assert!(transport.sent_bytes().is_empty());
    }

    #[test]
    fn buffer_desync_clears_buffer_and_disconnects() {
        let (connector, _transport) = init_connector();
        connect(&connector);

        let (tx, rx) = mpsc::channel();
        connector.set_on_error(move |code, _message| tx.send(code).unwrap());

        let poisoned_frame = 0xFFFF_FFFFu32.to_le_bytes();
        connector.handle_inbound(&poisoned_frame);
        connector.drive_main_thread();

        let code = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(code, ErrorCode::ProtocolViolation.code());
        assert!(!connector.is_connected());
    }

    /// Pulls `MsgSeq` back out of an encoded request frame: `ContentSize(4)
    /// | MsgIdLen(1) | MsgId | MsgSeq(2) | ...`.
    fn request_msg_seq(frame: &[u8]) -> u16 {
        let msg_id_len = frame[4] as usize;
        let seq_offset = 4 + 1 + msg_id_len;
        u16::from_le_bytes([frame[seq_offset], frame[seq_offset + 1]])
    }

    fn encode_as_response(packet: &mut Packet) -> Vec<u8> {
        use byteorder::{LittleEndian, WriteBytesExt};

        let msg_id = packet.msg_id.as_bytes();
        let content_size = 1 + msg_id.len() + 2 + 8 + 2 + 4 + packet.payload.len();

        let mut buffer = Vec::new();
        buffer.write_u32::<LittleEndian>(content_size as u32).unwrap();
        buffer.write_u8(msg_id.len() as u8).unwrap();
        buffer.extend_from_slice(msg_id);
        buffer.write_u16::<LittleEndian>(packet.msg_seq).unwrap();
        buffer.write_i64::<LittleEndian>(packet.stage_id).unwrap();
        buffer.write_i16::<LittleEndian>(packet.error_code).unwrap();
        buffer.write_u32::<LittleEndian>(packet.original_size).unwrap();
        buffer.extend_from_slice(&packet.payload);
        buffer
    }
}
