//! Errors raised by connection handles and the wire clients behind them.

use std::io;
use std::net::SocketAddrV4;

use thiserror::Error;

/// Failures surfaced by [`RconConnection`](super::RconConnection)
/// operations.
#[derive(Error, Debug)]
pub enum ConnectionError {
  /// The TCP connection to the server could not be established.
  #[error("failed to connect to {addr}")]
  Connect {
    addr: SocketAddrV4,
    #[source]
    source: io::Error,
  },

  /// The server refused the configured password.
  #[error("authentication rejected by {addr}")]
  Authentication { addr: SocketAddrV4 },

  /// Socket-level failure or a malformed frame on an established session.
  #[error("{context}")]
  Transport {
    context: String,
    #[source]
    source: Option<io::Error>,
  },

  /// No response arrived within the configured window.
  #[error("{operation} timed out after {seconds} s")]
  Timeout { operation: String, seconds: u64 },

  /// The command cannot be framed; nothing was sent.
  #[error("command of {length} bytes exceeds the {limit} byte limit")]
  CommandTooLong { length: usize, limit: usize },

  /// The handle was used after `dispose`.
  #[error("connection handle used after it was disposed")]
  Disposed,
}

impl ConnectionError {
  pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
    Self::Transport {
      context: context.into(),
      source: Some(source),
    }
  }

  pub(crate) fn protocol(context: impl Into<String>) -> Self {
    Self::Transport {
      context: format!("protocol violation: {}", context.into()),
      source: None,
    }
  }

  pub(crate) fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
    Self::Timeout {
      operation: operation.into(),
      seconds,
    }
  }

  /// Short label used when reporting the error to the operator.
  pub fn label(&self) -> &'static str {
    match self {
      Self::Connect { .. } => "connection failed",
      Self::Authentication { .. } => "authentication failed",
      Self::Transport { .. } => "transport error",
      Self::Timeout { .. } => "timed out",
      Self::CommandTooLong { .. } => "invalid command",
      Self::Disposed => "internal error",
    }
  }

  /// Whether the wire session behind the handle is unusable after this
  /// error.
  pub fn breaks_session(&self) -> bool {
    matches!(self, Self::Transport { .. } | Self::Timeout { .. })
  }

  /// Whether the session can keep going after this error.
  pub fn is_recoverable(&self) -> bool {
    !matches!(self, Self::Disposed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::net::Ipv4Addr;

  #[test]
  fn connect_error_keeps_io_source() {
    let err = ConnectionError::Connect {
      addr: SocketAddrV4::new(Ipv4Addr::LOCALHOST, 25_575),
      source: io::Error::from(io::ErrorKind::ConnectionRefused),
    };

    assert_eq!(err.to_string(), "failed to connect to 127.0.0.1:25575");
    assert!(std::error::Error::source(&err).is_some());
    assert_eq!(err.label(), "connection failed");
  }

  #[test]
  fn disposed_is_not_recoverable() {
    assert!(!ConnectionError::Disposed.is_recoverable());
    assert!(ConnectionError::timeout("reading reply", 3).is_recoverable());
    assert_eq!(
      ConnectionError::timeout("reading reply", 3).to_string(),
      "reading reply timed out after 3 s"
    );
  }

  #[test]
  fn only_wire_failures_break_the_session() {
    let too_long = ConnectionError::CommandTooLong {
      length: 5_000,
      limit: 4_086,
    };

    assert!(!too_long.breaks_session());
    assert!(too_long.is_recoverable());
    assert!(ConnectionError::timeout("reading reply", 3).breaks_session());
    assert!(ConnectionError::protocol("bad frame").breaks_session());
    assert!(!ConnectionError::Disposed.breaks_session());
  }
}
