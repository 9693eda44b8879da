use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Source RCON client implementations a connection can be bound to.
///
/// Both speak the same protocol, so a live session can switch between them.
/// `Backend::Channel` fixes its timeout when the client is built and picks
/// multi-packet handling per command; `Backend::Dispatch` is the reverse.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub enum Backend {
  /// Sequential client with fixed per-operation I/O timeouts.
  #[default]
  Channel,
  /// Client routing replies by request id from a background reader.
  Dispatch,
}

impl Backend {
  /// Every selectable backend, in the order shown to the operator.
  pub const ALL: [Backend; 2] = [Backend::Channel, Backend::Dispatch];

  /// Returns the canonical name, as stored in the profile file.
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Channel => "Channel",
      Self::Dispatch => "Dispatch",
    }
  }
}

impl fmt::Display for Backend {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Error returned when parsing a [`Backend`] from text fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseBackendError {
  input: String,
}

impl ParseBackendError {
  pub fn new(input: impl Into<String>) -> Self {
    Self {
      input: input.into(),
    }
  }

  /// Returns the original input that failed to parse.
  pub fn input(&self) -> &str {
    &self.input
  }
}

impl fmt::Display for ParseBackendError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "unsupported backend `{}` (expected `channel` or `dispatch`)",
      self.input
    )
  }
}

impl std::error::Error for ParseBackendError {}

impl FromStr for Backend {
  type Err = ParseBackendError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_ascii_lowercase();
    match normalized.as_str() {
      "channel" => Ok(Self::Channel),
      "dispatch" => Ok(Self::Dispatch),
      _ => Err(ParseBackendError::new(s)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_is_channel() {
    assert_eq!(Backend::default(), Backend::Channel);
  }

  #[test]
  fn parse_ignores_case_and_padding() {
    assert_eq!("channel".parse::<Backend>(), Ok(Backend::Channel));
    assert_eq!(" Dispatch ".parse::<Backend>(), Ok(Backend::Dispatch));
    assert_eq!("DISPATCH".parse::<Backend>(), Ok(Backend::Dispatch));
  }

  #[test]
  fn parse_rejects_unknown_values() {
    let err = "minecraft".parse::<Backend>().unwrap_err();
    assert_eq!(err.input(), "minecraft");
    assert!(err.to_string().starts_with("unsupported backend `minecraft`"));
  }

  #[test]
  fn serializes_as_its_name() {
    assert_eq!(
      serde_json::to_string(&Backend::Dispatch).unwrap(),
      "\"Dispatch\""
    );
    assert_eq!(
      serde_json::from_str::<Backend>("\"Channel\"").unwrap(),
      Backend::Channel
    );
  }
}
