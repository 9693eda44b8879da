//! Valve/Source RCON framing shared by both wire clients.
//!
//! Every frame is `size: i32le | id: i32le | type: i32le | body | 0x00 0x00`
//! where `size` counts everything after itself. Multi-packet replies are
//! reassembled by following each command with an empty
//! `SERVERDATA_RESPONSE_VALUE` marker: servers answer requests in order, so
//! the marker's echo marks the end of the command's output.

use std::io;
use std::net::SocketAddrV4;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout as await_timeout;

use crate::connection::ConnectionError;

pub const SERVERDATA_AUTH: i32 = 3;
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// Id the server uses in an auth response to signal a rejected password.
const AUTH_FAILURE_ID: i32 = -1;

/// Size of `id` + `type` + the two trailing NUL bytes.
const FRAME_OVERHEAD: usize = 10;

/// Largest request body accepted by Source servers.
pub const MAX_REQUEST_BODY: usize = 4096 - FRAME_OVERHEAD;

/// Upper bound for incoming frames. Some servers exceed the documented 4 KiB.
const MAX_RESPONSE_FRAME: usize = 64 * 1024;

/// One Source RCON frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
  pub id: i32,
  pub kind: i32,
  pub body: Vec<u8>,
}

impl Packet {
  pub fn new(id: i32, kind: i32, body: impl Into<Vec<u8>>) -> Self {
    Self {
      id,
      kind,
      body: body.into(),
    }
  }

  pub fn command(id: i32, command: &str) -> Self {
    Self::new(id, SERVERDATA_EXECCOMMAND, command.as_bytes())
  }

  /// Empty packet whose echo terminates a multi-packet reply.
  pub fn marker(id: i32) -> Self {
    Self::new(id, SERVERDATA_RESPONSE_VALUE, Vec::new())
  }

  /// Serialise the frame including its length prefix.
  pub fn encode(&self) -> Vec<u8> {
    let size = self.body.len() + FRAME_OVERHEAD;
    let mut frame = Vec::with_capacity(size + 4);
    frame.extend_from_slice(&(size as i32).to_le_bytes());
    frame.extend_from_slice(&self.id.to_le_bytes());
    frame.extend_from_slice(&self.kind.to_le_bytes());
    frame.extend_from_slice(&self.body);
    frame.extend_from_slice(&[0, 0]);
    frame
  }

  /// Parse a frame whose length prefix has already been consumed.
  pub fn decode(frame: &[u8]) -> Result<Self, ConnectionError> {
    if frame.len() < FRAME_OVERHEAD {
      return Err(ConnectionError::protocol(format!(
        "frame of {} bytes is shorter than the {FRAME_OVERHEAD} byte minimum",
        frame.len()
      )));
    }

    let id = i32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
    let kind = i32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]);

    // Servers disagree on the terminator layout; drop every trailing NUL.
    let mut body = frame[8..].to_vec();
    while body.last() == Some(&0) {
      body.pop();
    }

    Ok(Self { id, kind, body })
  }

  pub fn body_text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> io::Result<()>
where
  W: AsyncWrite + Unpin,
{
  writer.write_all(&packet.encode()).await
}

pub async fn read_packet<R>(reader: &mut R) -> Result<Packet, ConnectionError>
where
  R: AsyncRead + Unpin,
{
  let size = match reader.read_i32_le().await {
    Ok(size) => size,
    Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
      return Err(ConnectionError::io(
        "server closed the connection unexpectedly",
        err,
      ));
    }
    Err(err) => {
      return Err(ConnectionError::io("reading frame length", err));
    }
  };

  let size = usize::try_from(size).map_err(|_| {
    ConnectionError::protocol(format!("negative frame length {size}"))
  })?;
  if !(FRAME_OVERHEAD..=MAX_RESPONSE_FRAME).contains(&size) {
    return Err(ConnectionError::protocol(format!(
      "frame length {size} outside {FRAME_OVERHEAD}..={MAX_RESPONSE_FRAME}"
    )));
  }

  let mut frame = vec![0; size];
  reader
    .read_exact(&mut frame)
    .await
    .map_err(|err| ConnectionError::io("reading frame body", err))?;

  Packet::decode(&frame)
}

/// Reject commands that cannot be framed before anything touches a socket.
pub fn check_command(command: &str) -> Result<(), ConnectionError> {
  if command.len() > MAX_REQUEST_BODY {
    return Err(ConnectionError::CommandTooLong {
      length: command.len(),
      limit: MAX_REQUEST_BODY,
    });
  }
  Ok(())
}

/// Request ids handed out by a client; never negative, never zero.
#[derive(Debug)]
pub(crate) struct RequestIds {
  next: i32,
}

impl RequestIds {
  pub(crate) fn new() -> Self {
    Self { next: 1 }
  }

  pub(crate) fn allocate(&mut self) -> i32 {
    let id = self.next;
    self.next = if id == i32::MAX { 1 } else { id + 1 };
    id
  }
}

/// Open the TCP stream, bounded by `deadline`.
pub(crate) async fn open_stream(
  address: SocketAddrV4,
  deadline: Duration,
) -> Result<TcpStream, ConnectionError> {
  let stream = match await_timeout(deadline, TcpStream::connect(address)).await
  {
    Ok(Ok(stream)) => stream,
    Ok(Err(source)) => {
      return Err(ConnectionError::Connect {
        addr: address,
        source,
      });
    }
    Err(_) => {
      return Err(ConnectionError::Connect {
        addr: address,
        source: io::Error::new(
          io::ErrorKind::TimedOut,
          format!("no answer within {} s", deadline.as_secs()),
        ),
      });
    }
  };

  stream
    .set_nodelay(true)
    .map_err(|err| ConnectionError::io("configuring socket", err))?;
  Ok(stream)
}

/// Run the `SERVERDATA_AUTH` exchange on a fresh stream.
pub(crate) async fn authenticate<R, W>(
  reader: &mut R,
  writer: &mut W,
  id: i32,
  password: &str,
  address: SocketAddrV4,
) -> Result<(), ConnectionError>
where
  R: AsyncRead + Unpin,
  W: AsyncWrite + Unpin,
{
  tracing::debug!("--> AUTH <redacted>");
  write_packet(writer, &Packet::new(id, SERVERDATA_AUTH, password.as_bytes()))
    .await
    .map_err(|err| ConnectionError::io("writing auth packet", err))?;
  writer
    .flush()
    .await
    .map_err(|err| ConnectionError::io("flushing auth packet", err))?;

  loop {
    let packet = read_packet(reader).await?;
    if packet.kind != SERVERDATA_AUTH_RESPONSE {
      // Source servers send an empty RESPONSE_VALUE ahead of the verdict.
      continue;
    }
    if packet.id == AUTH_FAILURE_ID {
      return Err(ConnectionError::Authentication { addr: address });
    }
    if packet.id == id {
      return Ok(());
    }
    return Err(ConnectionError::protocol(format!(
      "auth response carried id {} instead of {id}",
      packet.id
    )));
  }
}
