/// Maximum encoded length of `Packet::msg_id`, in bytes. The wire field
/// is a single byte, so 255 is the largest value it can carry.
pub const MAX_MSG_ID_LEN: usize = 255;

/// Maximum encoded length of `Packet::payload`, in bytes: 2 MiB.
pub const MAX_PAYLOAD_LEN: usize = 2 * 1024 * 1024;

/// `msg_seq == 0` is reserved: outbound it means fire-and-forget, inbound
/// it means a server-initiated push.
pub const NO_SEQUENCE: u16 = 0;

/// Reserved message ids. Emitting `HEARTBEAT` is an optional responsibility
/// left to the embedding application; the connector only ever synthesizes
/// `TIMEOUT` packets itself.
pub const HEARTBEAT_MSG_ID: &str = "@Heart@Beat@";
pub const DEBUG_MSG_ID: &str = "@Debug@";
pub const TIMEOUT_MSG_ID: &str = "@Timeout@";

/// One framed message record. Request and response wire formats are
/// asymmetric: `error_code` and `original_size` only ever carry real
/// values on packets that came off the wire as responses. On an outbound
/// packet constructed via [`Packet::request`] or [`Packet::fire_and_forget`]
/// they are left at their zero defaults and the codec never writes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub msg_id: String,
    pub msg_seq: u16,
    pub stage_id: i64,
    pub error_code: i16,
    pub original_size: u32,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Builds an outbound, fire-and-forget packet (`msg_seq` forced to 0
    /// by the session core regardless of what's passed here).
    pub fn fire_and_forget<S: Into<String>>(msg_id: S, payload: Vec<u8>) -> Packet {
        Packet {
            msg_id: msg_id.into(),
            msg_seq: NO_SEQUENCE,
            stage_id: 0,
            error_code: 0,
            original_size: 0,
            payload,
        }
    }

    /// Builds an outbound request packet. `msg_seq` is overwritten by the
    /// session core's sequence allocator when the request is actually
    /// sent — the value here is a placeholder.
    pub fn request<S: Into<String>>(msg_id: S, payload: Vec<u8>) -> Packet {
        Packet {
            msg_id: msg_id.into(),
            msg_seq: NO_SEQUENCE,
            stage_id: 0,
            error_code: 0,
            original_size: 0,
            payload,
        }
    }

    /// A synthetic packet delivered to a pending sink on timeout or
    /// disconnect: `msg_id = @Timeout@`, the given error code, empty
    /// payload.
    pub fn synthetic_timeout(msg_seq: u16, error_code: i16) -> Packet {
        Packet {
            msg_id: TIMEOUT_MSG_ID.to_string(),
            msg_seq,
            stage_id: 0,
            error_code,
            original_size: 0,
            payload: Vec::new(),
        }
    }

    #[inline]
    pub fn is_push(&self) -> bool {
        self.msg_seq == NO_SEQUENCE
    }
}
