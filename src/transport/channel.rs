use std::io;
use std::net::SocketAddrV4;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout as await_timeout;

use super::source::{
  Packet, RequestIds, authenticate, check_command, open_stream, read_packet,
  write_packet,
};
use crate::connection::ConnectionError;

/// Sequential Source RCON client over a socket with fixed I/O timeouts.
///
/// The timeout bounds every single read and write and is fixed when the
/// client is built. Whether a reply is reassembled from several packets is
/// chosen per command.
#[derive(Debug)]
pub struct ChannelClient {
  reader: BufReader<OwnedReadHalf>,
  writer: BufWriter<OwnedWriteHalf>,
  io_timeout: Duration,
  ids: RequestIds,
}

impl ChannelClient {
  /// Open a TCP connection and authenticate.
  pub async fn connect(
    address: SocketAddrV4,
    password: &str,
    io_timeout: Duration,
  ) -> Result<Self, ConnectionError> {
    let stream = open_stream(address, io_timeout).await?;
    let (read_half, write_half) = stream.into_split();
    let mut client = Self {
      reader: BufReader::new(read_half),
      writer: BufWriter::new(write_half),
      io_timeout,
      ids: RequestIds::new(),
    };

    let id = client.ids.allocate();
    let handshake = authenticate(
      &mut client.reader,
      &mut client.writer,
      id,
      password,
      address,
    );
    match await_timeout(io_timeout, handshake).await {
      Ok(result) => result?,
      Err(_) => {
        return Err(ConnectionError::timeout(
          "authentication",
          io_timeout.as_secs(),
        ));
      }
    }

    tracing::debug!(%address, ?io_timeout, "channel session established");
    Ok(client)
  }

  pub fn io_timeout(&self) -> Duration {
    self.io_timeout
  }

  /// Run one command and return the server's reply text.
  ///
  /// A transport error or timeout leaves the packet stream in an unknown
  /// position; the caller should drop the client.
  pub async fn execute(
    &mut self,
    command: &str,
    multi_packet: bool,
  ) -> Result<String, ConnectionError> {
    check_command(command)?;

    let id = self.ids.allocate();
    tracing::debug!("--> {}", command);
    self.write(&Packet::command(id, command)).await?;

    if !multi_packet {
      self.flush().await?;
      loop {
        let packet = self.read().await?;
        if packet.id == id {
          return Ok(packet.body_text());
        }
        tracing::trace!(id = packet.id, "skipping stale packet");
      }
    }

    let marker_id = self.ids.allocate();
    self.write(&Packet::marker(marker_id)).await?;
    self.flush().await?;

    let mut body = Vec::new();
    loop {
      let packet = self.read().await?;
      if packet.id == marker_id {
        break;
      }
      if packet.id == id {
        body.extend_from_slice(&packet.body);
      } else {
        tracing::trace!(id = packet.id, "skipping stale packet");
      }
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
  }

  /// Close the write side of the socket.
  pub async fn shutdown(&mut self) -> io::Result<()> {
    self.writer.shutdown().await
  }

  async fn read(&mut self) -> Result<Packet, ConnectionError> {
    match await_timeout(self.io_timeout, read_packet(&mut self.reader)).await {
      Ok(result) => result,
      Err(_) => Err(ConnectionError::timeout(
        "reading reply",
        self.io_timeout.as_secs(),
      )),
    }
  }

  async fn write(&mut self, packet: &Packet) -> Result<(), ConnectionError> {
    match await_timeout(self.io_timeout, write_packet(&mut self.writer, packet))
      .await
    {
      Ok(result) => {
        result.map_err(|err| ConnectionError::io("writing packet", err))
      }
      Err(_) => Err(ConnectionError::timeout(
        "writing packet",
        self.io_timeout.as_secs(),
      )),
    }
  }

  async fn flush(&mut self) -> Result<(), ConnectionError> {
    match await_timeout(self.io_timeout, self.writer.flush()).await {
      Ok(result) => {
        result.map_err(|err| ConnectionError::io("flushing packet", err))
      }
      Err(_) => Err(ConnectionError::timeout(
        "writing packet",
        self.io_timeout.as_secs(),
      )),
    }
  }
}
