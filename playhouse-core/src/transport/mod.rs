pub mod mock;
pub mod tcp;
#[cfg(feature = "tls")]
pub mod tls;
#[cfg(feature = "websocket")]
pub mod websocket;

use crate::error::ConnectorResult;
use crate::sink::Eventual;

pub type ReceiveCallback = Box<dyn Fn(&[u8]) + Send + Sync>;
pub type DisconnectCallback = Box<dyn Fn() + Send + Sync>;
pub type ErrorCallback = Box<dyn Fn(i16, String) + Send + Sync>;

/// The byte-pipe contract every concrete transport satisfies. The
/// session core talks to one of these, never to a socket or TLS/
/// WebSocket library directly — swapping transports never touches
/// `playhouse_core::session`.
pub trait Transport: Send + Sync {
    /// Initiates the connection. The returned eventual resolves to
    /// `true` once the transport's handshake (TCP connect, TLS
    /// handshake, WebSocket upgrade) completes, `false` otherwise.
    /// Never blocks the caller.
    fn connect(&self, host: &str, port: u16) -> Eventual<bool>;

    /// Idempotent close. Safe to call from any state.
    fn disconnect(&self);

    fn is_connected(&self) -> bool;

    /// Best-effort enqueue; must preserve call-order across calls.
    fn send(&self, bytes: &[u8]) -> ConnectorResult<()>;

    /// `f(bytes)` runs on the transport's I/O thread whenever new bytes
    /// arrive. The slice is only valid for the duration of the call.
    fn set_receive_callback(&self, callback: ReceiveCallback);

    /// `f()` runs at most once, when either side closes the connection.
    fn set_disconnect_callback(&self, callback: DisconnectCallback);

    /// `f(code, message)` runs for transport-visible errors that aren't
    /// already reported through the disconnect callback.
    fn set_error_callback(&self, callback: ErrorCallback);
}
