use async_trait::async_trait;

use super::{
  ConnectionError, ConnectionSettings, ConnectionState, RconConnection,
  Target, timeout_duration,
};
use crate::backend::Backend;
use crate::transport::ChannelClient;
use crate::transport::source::check_command;

/// Handle bound to the channel backend.
///
/// The client's I/O timeout is fixed when it is built, so changing the
/// timeout rebuilds the client and reconnects. Multi-packet reassembly is
/// chosen per command, so toggling it keeps the client.
pub struct ChannelConnection {
  target: Target,
  timeout: u32,
  multi_packet: bool,
  client: Option<ChannelClient>,
  disposed: bool,
}

impl ChannelConnection {
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
  ) -> Result<&mut ChannelClient, ConnectionError> {
    let client = match self.client.take() {
      Some(client) => client,
      None => {
        tracing::debug!(
          address = %self.target.address,
          "connecting (channel)"
        );
        ChannelClient::connect(
          self.target.address,
          &self.target.password,
          timeout_duration(self.timeout),
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
impl RconConnection for ChannelConnection {
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
    let multi_packet = self.multi_packet;
    let client = self.ensure_connected().await?;

    match client.execute(command, multi_packet).await {
      Ok(reply) => Ok(reply),
      Err(err) if err.breaks_session() => {
        // A late or partial reply would desynchronise the packet stream.
        tracing::warn!(
          error = %err,
          "channel transport failed; dropping client"
        );
        self.client = None;
        Err(err)
      }
      Err(err) => Err(err),
    }
  }

  async fn set_timeout(&mut self, seconds: u32) -> Result<(), ConnectionError> {
    self.ensure_live()?;
    self.timeout = seconds;
    self.discard_client().await;
    self.ensure_connected().await.map(|_| ())
  }

  async fn set_multi_packet_response(
    &mut self,
    enabled: bool,
  ) -> Result<(), ConnectionError> {
    self.ensure_live()?;
    self.multi_packet = enabled;
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
      "channel connection disposed"
    );
  }

  fn state(&self) -> ConnectionState {
    if self.disposed {
      ConnectionState::Disposed
    } else if self.client.is_some() {
      ConnectionState::Connected
    } else {
      ConnectionState::Uninitialized
    }
  }

  fn settings(&self) -> ConnectionSettings {
    ConnectionSettings {
      backend: Backend::Channel,
      timeout: self.timeout,
      multi_packet: self.multi_packet,
    }
  }

  fn target(&self) -> &Target {
    &self.target
  }
}
