use serde_derive::{Deserialize, Serialize};

/// Connector configuration. The connector itself never reads files; an
/// embedding application loads this from wherever it likes (TOML,
/// environment, hardcoded) and passes it to `Connector::init`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Advisory capacity for the transport's outbound buffering.
    pub send_buffer_size: usize,
    /// Capacity of the receive ring buffer.
    pub receive_buffer_size: usize,
    /// Period at which the session may emit `@Heart@Beat@`. Emitting it
    /// at all is an optional responsibility outside core correctness.
    pub heartbeat_interval_ms: u64,
    /// Per-request deadline from send to response.
    pub request_timeout_ms: u64,
    /// Auto-reconnect is disabled by default and not required for
    /// conformance; when enabled, only a single configurable retry
    /// policy is in scope.
    pub enable_reconnect: bool,
    pub reconnect_interval_ms: u64,
    pub max_reconnect_attempts: u32,
    pub use_websocket: bool,
    pub use_ssl: bool,
    pub skip_server_certificate_validation: bool,
    pub websocket_path: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            send_buffer_size: 64 * 1024,
            receive_buffer_size: 256 * 1024,
            heartbeat_interval_ms: 10_000,
            request_timeout_ms: 30_000,
            enable_reconnect: false,
            reconnect_interval_ms: 5_000,
            max_reconnect_attempts: 3,
            use_websocket: false,
            use_ssl: false,
            skip_server_certificate_validation: false,
            websocket_path: "/ws".to_string(),
        }
    }
}
