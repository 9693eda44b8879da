use async_trait::async_trait;

use super::{
  ConnectionError, ConnectionSettings, ConnectionState, RconConnection,
  Target, timeout_duration,
};
use crate::backend::Backend;
use crate::transport::DispatchClient;
use crate::transport::source::check_command;

/// Handle bound to the dispatch backend.
///
/// The timeout is passed with every command, so changing it keeps the
/// client. Multi-packet reassembly is fixed at client construction, so
/// toggling it rebuilds the client and reconnects. A client whose reader
/// has stopped counts as disconnected and is rebuilt on next use.
pub struct DispatchConnection {
  target: Target,
  timeout: u32,
  multi_packet: bool,
  client: Option<DispatchClient>,
  disposed: bool,
}

impl DispatchConnection {
  pub fn new(target: Target, timeout: u32, multi_packet: bool) -> Self {
    Self {
      target,
      timeout,
      multi_packet,
      client: None,
      disposed: false,
    }
  }

  fn ensure_live(&self) -> Result<(), ConnectionError> {
    if self.disposed {
      Err(ConnectionError::Disposed)
    } else {
      Ok(())
    }
  }

  async fn ensure_connected(
    &mut self,
  ) -> Result<&mut DispatchClient, ConnectionError> {
    let client = match self.client.take() {
      Some(client) if client.is_open() => client,
      stale => {
        if stale.is_some() {
          tracing::info!("server closed the session; reconnecting");
        }
        drop(stale);
        tracing::debug!(
          address = %self.target.address,
          "connecting (dispatch)"
        );
        DispatchClient::connect(
          self.target.address,
          &self.target.password,
          timeout_duration(self.timeout),
          self.multi_packet,
        )
        .await?
      }
    };
    Ok(self.client.insert(client))
  }

  async fn discard_client(&mut self) {
    if let Some(mut client) = self.client.take() {
      if let Err(err) = client.shutdown().await {
        tracing::debug!(error = %err, "ignoring error while closing client");
      }
    }
  }
}

#[async_trait]
impl RconConnection for DispatchConnection {
  async fn connect(&mut self) -> Result<(), ConnectionError> {
    self.ensure_live()?;
    self.ensure_connected().await.map(|_| ())
  }

  async fn send_command(
    &mut self,
    command: &str,
  ) -> Result<String, ConnectionError> {
    self.ensure_live()?;
    check_command(command)?;
    let deadline = timeout_duration(self.timeout);
    let client = self.ensure_connected().await?;

    let result = client.execute(command, deadline).await;
    if result.is_err() && !client.is_open() {
      tracing::warn!("dispatch transport failed; dropping client");
      self.client = None;
    }
    result
  }

  async fn set_timeout(&mut self, seconds: u32) -> Result<(), ConnectionError> {
    self.ensure_live()?;
    self.timeout = seconds;
    self.ensure_connected().await.map(|_| ())
  }

  async fn set_multi_packet_response(
    &mut self,
    enabled: bool,
  ) -> Result<(), ConnectionError> {
    self.ensure_live()?;
    self.multi_packet = enabled;
    self.discard_client().await;
    self.ensure_connected().await.map(|_| ())
  }

  async fn dispose(&mut self) {
    if self.disposed {
      return;
    }
    self.disposed = true;
    self.discard_client().await;
    tracing::debug!(
      address = %self.target.address,
      "dispatch connection disposed"
    );
  }

  fn state(&self) -> ConnectionState {
    match &self.client {
      _ if self.disposed => ConnectionState::Disposed,
      Some(client) if client.is_open() => ConnectionState::Connected,
      _ => ConnectionState::Uninitialized,
    }
  }

  fn settings(&self) -> ConnectionSettings {
    ConnectionSettings {
      backend: Backend::Dispatch,
      timeout: self.timeout,
      multi_packet: self.multi_packet,
    }
  }

  fn target(&self) -> &Target {
    &self.target
  }
}
