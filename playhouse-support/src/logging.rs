use serde_derive::{Deserialize, Serialize};
use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;

/// Where a `Logger` built by [`build`] writes its output.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum LogDestination {
    Stdout,
    Stderr,
}

/// Logging configuration accepted by [`build`]. Kept separate from the
/// connector's own `Config` so embedding applications can point connector
/// logs anywhere independent of connector behavior.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub destination: LogDestination,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

impl Default for LogConfig {
    fn default() -> LogConfig {
        LogConfig {
            level: LogLevel::Info,
            destination: LogDestination::Stderr,
        }
    }
}

/// Builds a root `slog::Logger` from the supplied configuration. Callers
/// thread the result into `Connector::init` and every subsystem takes a
/// scoped child with `log.new(slog::o!(...))`.
pub fn build(config: LogConfig) -> slog::Logger {
    let mut builder = TerminalLoggerBuilder::new();

    builder.destination(match config.destination {
        LogDestination::Stdout => Destination::Stdout,
        LogDestination::Stderr => Destination::Stderr,
    });

    builder.level(match config.level {
        LogLevel::Trace => Severity::Trace,
        LogLevel::Debug => Severity::Debug,
        LogLevel::Info => Severity::Info,
        LogLevel::Warning => Severity::Warning,
        LogLevel::Error => Severity::Error,
    });

    builder.build().expect("failed to build terminal logger")
}

/// A logger that discards everything. Used by default in tests and by
/// callers who have not wired up their own sink yet.
pub fn discard() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}
