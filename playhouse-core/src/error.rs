use std::fmt;
use std::io;

/// Wire-visible error codes. `Success` never appears inside a
/// `ConnectorError` — it is only ever seen as `Packet::error_code == 0`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(i16)]
pub enum ErrorCode {
    Success = 0,
    ConnectionFailed = 1001,
    ConnectionTimeout = 1002,
    ConnectionClosed = 1003,
    RequestTimeout = 2001,
    InvalidResponse = 2002,
    ProtocolViolation = 2003,
    BufferOverflow = 2004,
    AuthenticationFailed = 3001,
}

impl ErrorCode {
    #[inline]
    pub fn code(self) -> i16 {
        self as i16
    }

    /// Recovers an `ErrorCode` from a wire value, when the value is one
    /// of the constants this connector emits. A server-reported error
    /// code that doesn't match any constant here is not an error: it's
    /// delivered to the caller as-is on `Packet::error_code`, never
    /// reinterpreted.
    pub fn from_code(code: i16) -> Option<ErrorCode> {
        match code {
            0 => Some(ErrorCode::Success),
            1001 => Some(ErrorCode::ConnectionFailed),
            1002 => Some(ErrorCode::ConnectionTimeout),
            1003 => Some(ErrorCode::ConnectionClosed),
            2001 => Some(ErrorCode::RequestTimeout),
            2002 => Some(ErrorCode::InvalidResponse),
            2003 => Some(ErrorCode::ProtocolViolation),
            2004 => Some(ErrorCode::BufferOverflow),
            3001 => Some(ErrorCode::AuthenticationFailed),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let message = match self {
            ErrorCode::Success => "success",
            ErrorCode::ConnectionFailed => "connection failed",
            ErrorCode::ConnectionTimeout => "connection timeout",
            ErrorCode::ConnectionClosed => "connection closed",
            ErrorCode::RequestTimeout => "request timeout",
            ErrorCode::InvalidResponse => "invalid response",
            ErrorCode::ProtocolViolation => "protocol violation",
            ErrorCode::BufferOverflow => "buffer overflow",
            ErrorCode::AuthenticationFailed => "authentication failed",
        };
        write!(f, "{} ({})", message, self.code())
    }
}

/// `Wait` means "not an error, just not enough data/capacity yet" and is
/// filtered out by `has_failed`; `Fatal` carries one of the wire-visible
/// codes above.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ConnectorError {
    Wait,
    Fatal(ErrorCode),
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConnectorError::Wait => write!(f, "wait"),
            ConnectorError::Fatal(code) => write!(f, "{}", code),
        }
    }
}

impl std::error::Error for ConnectorError {}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

impl From<io::Error> for ConnectorError {
    #[inline]
    fn from(io_error: io::Error) -> Self {
        match io_error.kind() {
            io::ErrorKind::WouldBlock => ConnectorError::Wait,
            _ => ConnectorError::Fatal(ErrorCode::ConnectionClosed),
        }
    }
}

/// Lets call sites treat `Wait` as "nothing went wrong yet" without a
/// manual match on every `ConnectorResult`.
pub trait ErrorUtils {
    fn has_failed(&self) -> bool;
}

impl<T> ErrorUtils for ConnectorResult<T> {
    fn has_failed(&self) -> bool {
        match self {
            Ok(_) => false,
            Err(ConnectorError::Wait) => false,
            Err(ConnectorError::Fatal(_)) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_code_round_trips_known_constants() {
        for code in &[0, 1001, 1002, 1003, 2001, 2002, 2003, 2004, 3001] {
            let parsed = ErrorCode::from_code(*code).unwrap();
            assert_eq!(parsed.code(), *code);
        }
    }

    #[test]
    fn unknown_code_is_none() {
        assert!(ErrorCode::from_code(123).is_none());
    }

    #[test]
    fn would_block_is_wait_not_fatal() {
        let err: ConnectorError = io::Error::from(io::ErrorKind::WouldBlock).into();
        assert_eq!(err, ConnectorError::Wait);
        let result: ConnectorResult<()> = Err(err);
        assert!(!result.has_failed());
    }

    #[test]
    fn other_io_errors_are_fatal() {
        let err: ConnectorError = io::Error::from(io::ErrorKind::ConnectionReset).into();
        assert_eq!(err, ConnectorError::Fatal(ErrorCode::ConnectionClosed));
        let result: ConnectorResult<()> = Err(err);
        assert!(result.has_failed());
    }
}
