pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod packet;
pub mod pending;
pub mod ring_buffer;
pub mod session;
pub mod sink;
pub mod timeout;
pub mod transport;

pub use config::Config;
pub use error::{ConnectorError, ConnectorResult, ErrorCode, ErrorUtils};
pub use packet::Packet;
pub use session::{select_transport, Connector};
pub use sink::{Eventual, PacketSink, Sink};
pub use transport::Transport;
