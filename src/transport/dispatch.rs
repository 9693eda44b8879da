use std::collections::HashMap;
use std::io;
use std::net::SocketAddrV4;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout as await_timeout;

use super::source::{
  Packet, RequestIds, authenticate, check_command, open_stream, read_packet,
  write_packet,
};
use crate::connection::ConnectionError;

/// Request waiting for its reply.
struct Pending {
  responder: oneshot::Sender<String>,
  body: Vec<u8>,
  /// Set when the reply is reassembled until this marker is echoed.
  marker_id: Option<i32>,
}

/// Routing table shared with the reader task.
#[derive(Default)]
struct Routes {
  pending: HashMap<i32, Pending>,
  /// Marker id to the command id it terminates.
  markers: HashMap<i32, i32>,
  /// Why the reader stopped, once it has.
  closed: Option<String>,
}

impl Routes {
  fn deliver(&mut self, packet: Packet) {
    if let Some(command_id) = self.markers.remove(&packet.id) {
      if let Some(pending) = self.pending.remove(&command_id) {
        let body = String::from_utf8_lossy(&pending.body).into_owned();
        let _ = pending.responder.send(body);
      }
      return;
    }

    let Some(pending) = self.pending.get_mut(&packet.id) else {
      tracing::trace!(id = packet.id, "dropping packet with no waiter");
      return;
    };
    if pending.marker_id.is_some() {
      pending.body.extend_from_slice(&packet.body);
    } else if let Some(pending) = self.pending.remove(&packet.id) {
      let _ = pending.responder.send(packet.body_text());
    }
  }

  fn forget(&mut self, id: i32) {
    if let Some(pending) = self.pending.remove(&id) {
      if let Some(marker_id) = pending.marker_id {
        self.markers.remove(&marker_id);
      }
    }
  }

  /// Fail every waiter; dropping a responder wakes its receiver.
  fn close(&mut self, reason: String) {
    self.pending.clear();
    self.markers.clear();
    self.closed = Some(reason);
  }
}

/// Source RCON client whose replies are routed by a background reader task.
///
/// Each command registers a waiter keyed by its request id and waits for it
/// under the timeout passed to [`DispatchClient::execute`]. A reply that
/// arrives after its waiter gave up is discarded, so a timeout does not
/// desynchronise the stream. Multi-packet reassembly is fixed when the
/// client is built.
pub struct DispatchClient {
  writer: BufWriter<OwnedWriteHalf>,
  routes: Arc<Mutex<Routes>>,
  reader: JoinHandle<()>,
  multi_packet: bool,
  ids: RequestIds,
  /// A write was cut short, so the outgoing stream is corrupt.
  broken: bool,
}

impl DispatchClient {
  /// Open a TCP connection, authenticate and start the reader task.
  pub async fn connect(
    address: SocketAddrV4,
    password: &str,
    deadline: Duration,
    multi_packet: bool,
  ) -> Result<Self, ConnectionError> {
    let stream = open_stream(address, deadline).await?;
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut writer = BufWriter::new(write_half);
    let mut ids = RequestIds::new();

    let id = ids.allocate();
    let handshake =
      authenticate(&mut reader, &mut writer, id, password, address);
    match await_timeout(deadline, handshake).await {
      Ok(result) => result?,
      Err(_) => {
        return Err(ConnectionError::timeout(
          "authentication",
          deadline.as_secs(),
        ));
      }
    }

    let routes = Arc::new(Mutex::new(Routes::default()));
    let reader = tokio::spawn(route_replies(reader, Arc::clone(&routes)));

    tracing::debug!(%address, multi_packet, "dispatch session established");
    Ok(Self {
      writer,
      routes,
      reader,
      multi_packet,
      ids,
      broken: false,
    })
  }

  pub fn multi_packet(&self) -> bool {
    self.multi_packet
  }

  /// Whether the client can still carry commands.
  pub fn is_open(&self) -> bool {
    !self.broken && lock(&self.routes).closed.is_none()
  }

  /// Run one command, waiting at most `deadline` for its reply.
  pub async fn execute(
    &mut self,
    command: &str,
    deadline: Duration,
  ) -> Result<String, ConnectionError> {
    check_command(command)?;

    let id = self.ids.allocate();
    let marker_id = self.multi_packet.then(|| self.ids.allocate());
    let (responder, reply) = oneshot::channel();
    {
      let mut routes = lock(&self.routes);
      if let Some(reason) = &routes.closed {
        return Err(closed_error(reason));
      }
      routes.pending.insert(
        id,
        Pending {
          responder,
          body: Vec::new(),
          marker_id,
        },
      );
      if let Some(marker_id) = marker_id {
        routes.markers.insert(marker_id, id);
      }
    }

    tracing::debug!("--> {}", command);
    let mut flushed = false;
    let exchange = async {
      self.send(&Packet::command(id, command), marker_id).await?;
      flushed = true;
      reply.await.map_err(|_| {
        let routes = lock(&self.routes);
        closed_error(routes.closed.as_deref().unwrap_or("reader stopped"))
      })
    };

    let outcome = await_timeout(deadline, exchange).await;
    match outcome {
      Ok(Ok(reply)) => Ok(reply),
      Ok(Err(err)) => {
        lock(&self.routes).forget(id);
        if !flushed {
          self.broken = true;
        }
        Err(err)
      }
      Err(_) => {
        lock(&self.routes).forget(id);
        if !flushed {
          self.broken = true;
        }
        Err(ConnectionError::timeout(
          "waiting for command reply",
          deadline.as_secs(),
        ))
      }
    }
  }

  /// Stop the reader task and close the write side of the socket.
  pub async fn shutdown(&mut self) -> io::Result<()> {
    self.reader.abort();
    self.writer.shutdown().await
  }

  async fn send(
    &mut self,
    request: &Packet,
    marker_id: Option<i32>,
  ) -> Result<(), ConnectionError> {
    write_packet(&mut self.writer, request)
      .await
      .map_err(|err| ConnectionError::io("writing command", err))?;
    if let Some(marker_id) = marker_id {
      write_packet(&mut self.writer, &Packet::marker(marker_id))
        .await
        .map_err(|err| ConnectionError::io("writing end marker", err))?;
    }
    self
      .writer
      .flush()
      .await
      .map_err(|err| ConnectionError::io("flushing command", err))
  }
}

impl Drop for DispatchClient {
  fn drop(&mut self) {
    self.reader.abort();
  }
}

async fn route_replies(
  mut reader: BufReader<OwnedReadHalf>,
  routes: Arc<Mutex<Routes>>,
) {
  let reason = loop {
    match read_packet(&mut reader).await {
      Ok(packet) => {
        lock(&routes).deliver(packet);
      }
      Err(err) => break err.to_string(),
    }
  };
  tracing::debug!(%reason, "dispatch reader stopped");
  lock(&routes).close(reason);
}

fn lock(routes: &Mutex<Routes>) -> MutexGuard<'_, Routes> {
  routes.lock().unwrap_or_else(PoisonError::into_inner)
}

fn closed_error(reason: &str) -> ConnectionError {
  ConnectionError::Transport {
    context: format!("connection closed: {reason}"),
    source: None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn waiter(
    routes: &mut Routes,
    id: i32,
    marker_id: Option<i32>,
  ) -> oneshot::Receiver<String> {
    let (responder, reply) = oneshot::channel();
    routes.pending.insert(
      id,
      Pending {
        responder,
        body: Vec::new(),
        marker_id,
      },
    );
    if let Some(marker_id) = marker_id {
      routes.markers.insert(marker_id, id);
    }
    reply
  }

  #[test]
  fn single_packet_reply_completes_on_first_packet() {
    let mut routes = Routes::default();
    let mut reply = waiter(&mut routes, 1, None);

    routes.deliver(Packet::new(1, 0, "hello"));
    routes.deliver(Packet::new(1, 0, "late tail"));

    assert_eq!(reply.try_recv().expect("reply"), "hello");
    assert!(routes.pending.is_empty());
  }

  #[test]
  fn multi_packet_reply_waits_for_end_marker() {
    let mut routes = Routes::default();
    let mut reply = waiter(&mut routes, 1, Some(2));

    routes.deliver(Packet::new(1, 0, "part1-"));
    assert!(reply.try_recv().is_err());
    routes.deliver(Packet::new(1, 0, "part2"));
    routes.deliver(Packet::marker(2));

    assert_eq!(reply.try_recv().expect("reply"), "part1-part2");
    assert!(routes.markers.is_empty());
  }

  #[test]
  fn forgotten_waiter_drops_late_reply() {
    let mut routes = Routes::default();
    let _reply = waiter(&mut routes, 1, Some(2));

    routes.forget(1);
    routes.deliver(Packet::new(1, 0, "late"));
    routes.deliver(Packet::marker(2));

    assert!(routes.pending.is_empty());
    assert!(routes.markers.is_empty());
  }

  #[test]
  fn close_wakes_every_waiter() {
    let mut routes = Routes::default();
    let mut reply = waiter(&mut routes, 1, None);

    routes.close("server closed the connection unexpectedly".to_owned());

    assert!(matches!(
      reply.try_recv(),
      Err(oneshot::error::TryRecvError::Closed)
    ));
    assert!(routes.closed.is_some());
  }
}
