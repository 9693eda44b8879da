//! Uniform handle over the two Source RCON backends.
//!
//! A handle starts [`ConnectionState::Uninitialized`], connects lazily on the
//! first command, drops back to `Uninitialized` whenever its backend client
//! has to be rebuilt or the transport fails, and ends in the terminal
//! [`ConnectionState::Disposed`].

use std::fmt;
use std::net::SocketAddrV4;
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::Backend;

mod channel;
mod dispatch;
mod error;

pub use channel::ChannelConnection;
pub use dispatch::DispatchConnection;
pub use error::ConnectionError;

/// Timeout applied when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u32 = 10;

/// Lifecycle position of a connection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
  Uninitialized,
  Connected,
  Disposed,
}

impl fmt::Display for ConnectionState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Uninitialized => "not connected",
      Self::Connected => "connected",
      Self::Disposed => "disposed",
    })
  }
}

/// Tunables a handle is built with and can be reconfigured to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
  pub backend: Backend,
  /// Response timeout in seconds.
  pub timeout: u32,
  pub multi_packet: bool,
}

impl Default for ConnectionSettings {
  fn default() -> Self {
    Self {
      backend: Backend::default(),
      timeout: DEFAULT_TIMEOUT_SECS,
      multi_packet: false,
    }
  }
}

/// Resolved server endpoint plus credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Target {
  pub address: SocketAddrV4,
  pub password: String,
}

impl Target {
  pub fn new(address: SocketAddrV4, password: impl Into<String>) -> Self {
    Self {
      address,
      password: password.into(),
    }
  }
}

impl fmt::Debug for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Target")
      .field("address", &self.address)
      .field("password", &"<redacted>")
      .finish()
  }
}

/// Capability set shared by both backends.
///
/// Reconfiguration may rebuild the backend client; either way a successful
/// `set_timeout` or `set_multi_packet_response` returns with the handle
/// connected, and a failed one leaves it `Uninitialized` with the new value
/// retained.
#[async_trait]
pub trait RconConnection: Send {
  /// Connect and authenticate unless already connected.
  async fn connect(&mut self) -> Result<(), ConnectionError>;

  /// Send one command, connecting first if needed, and return the raw reply.
  async fn send_command(
    &mut self,
    command: &str,
  ) -> Result<String, ConnectionError>;

  async fn set_timeout(&mut self, seconds: u32) -> Result<(), ConnectionError>;

  async fn set_multi_packet_response(
    &mut self,
    enabled: bool,
  ) -> Result<(), ConnectionError>;

  /// Release the backend. Repeat calls are no-ops and errors are swallowed.
  async fn dispose(&mut self);

  fn state(&self) -> ConnectionState;

  fn settings(&self) -> ConnectionSettings;

  fn target(&self) -> &Target;
}

/// Builds connection handles; the session engine uses it to switch engines.
pub trait Connector: Send + Sync {
  fn open(
    &self,
    target: &Target,
    settings: ConnectionSettings,
  ) -> Box<dyn RconConnection>;
}

/// Connector producing real network-backed handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendConnector;

impl Connector for BackendConnector {
  fn open(
    &self,
    target: &Target,
    settings: ConnectionSettings,
  ) -> Box<dyn RconConnection> {
    open(target.clone(), settings)
  }
}

/// Build a handle for `settings.backend` without touching the network.
pub fn open(
  target: Target,
  settings: ConnectionSettings,
) -> Box<dyn RconConnection> {
  match settings.backend {
    Backend::Channel => Box::new(ChannelConnection::new(
      target,
      settings.timeout,
      settings.multi_packet,
    )),
    Backend::Dispatch => Box::new(DispatchConnection::new(
      target,
      settings.timeout,
      settings.multi_packet,
    )),
  }
}

/// Zero would time out every exchange immediately, so it is read as one.
pub(crate) fn timeout_duration(seconds: u32) -> Duration {
  Duration::from_secs(u64::from(seconds.max(1)))
}
