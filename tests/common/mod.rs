//! In-process fake RCON servers and a recording connection for tests.
//!
//! The servers listen on `127.0.0.1:0`, count accepted TCP connections and
//! record every command they receive, so tests can assert on reconnects
//! without a real game server.

#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rcon_cli::connection::{
  ConnectionError, ConnectionSettings, ConnectionState, Connector,
  RconConnection, Target,
};
use rcon_cli::transport::source::{
  Packet, SERVERDATA_AUTH, SERVERDATA_AUTH_RESPONSE, SERVERDATA_EXECCOMMAND,
  SERVERDATA_RESPONSE_VALUE, read_packet, write_packet,
};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

pub const PASSWORD: &str = "hunter2";

/// Shared observations of a fake server.
#[derive(Clone, Default)]
pub struct ServerLog {
  connections: Arc<AtomicUsize>,
  commands: Arc<Mutex<Vec<String>>>,
}

impl ServerLog {
  pub fn connections(&self) -> usize {
    self.connections.load(Ordering::SeqCst)
  }

  pub fn commands(&self) -> Vec<String> {
    self.commands.lock().unwrap().clone()
  }

  fn accepted(&self) {
    self.connections.fetch_add(1, Ordering::SeqCst);
  }

  fn record(&self, command: &str) {
    self.commands.lock().unwrap().push(command.to_owned());
  }
}

pub struct FakeServer {
  pub address: SocketAddrV4,
  pub log: ServerLog,
}

impl FakeServer {
  pub fn target(&self) -> Target {
    Target::new(self.address, PASSWORD)
  }

  pub fn target_with_password(&self, password: &str) -> Target {
    Target::new(self.address, password)
  }
}

async fn bind() -> (TcpListener, SocketAddrV4) {
  let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
    .await
    .expect("bind fake server");
  let port = listener.local_addr().expect("local addr").port();
  (listener, SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
}

/// Source RCON server.
///
/// * `split` answers in two packets: `part1-` and `part2`.
/// * `sleep` never answers.
/// * `late` answers `late reply` after 1.5 s.
/// * `kick` closes the connection without answering.
/// * anything else answers `echo: <command>`.
pub async fn source_server() -> FakeServer {
  let (listener, address) = bind().await;
  let log = ServerLog::default();

  let server_log = log.clone();
  tokio::spawn(async move {
    while let Ok((stream, _)) = listener.accept().await {
      server_log.accepted();
      tokio::spawn(serve_source(stream, server_log.clone()));
    }
  });

  FakeServer { address, log }
}

async fn serve_source(stream: TcpStream, log: ServerLog) {
  let (mut reader, mut writer) = stream.into_split();
  loop {
    let Ok(packet) = read_packet(&mut reader).await else {
      return;
    };

    let replies = match packet.kind {
      SERVERDATA_AUTH => {
        let verdict_id = if packet.body == PASSWORD.as_bytes() {
          packet.id
        } else {
          -1
        };
        vec![
          Packet::new(packet.id, SERVERDATA_RESPONSE_VALUE, Vec::new()),
          Packet::new(verdict_id, SERVERDATA_AUTH_RESPONSE, Vec::new()),
        ]
      }
      SERVERDATA_EXECCOMMAND => {
        let command = packet.body_text();
        log.record(&command);
        match command.as_str() {
          "split" => vec![
            Packet::new(packet.id, SERVERDATA_RESPONSE_VALUE, "part1-"),
            Packet::new(packet.id, SERVERDATA_RESPONSE_VALUE, "part2"),
          ],
          "sleep" => Vec::new(),
          "late" => {
            tokio::time::sleep(Duration::from_millis(1_500)).await;
            vec![Packet::new(
              packet.id,
              SERVERDATA_RESPONSE_VALUE,
              "late reply",
            )]
          }
          "kick" => return,
          other => vec![Packet::new(
            packet.id,
            SERVERDATA_RESPONSE_VALUE,
            format!("echo: {other}"),
          )],
        }
      }
      _ => vec![Packet::new(packet.id, SERVERDATA_RESPONSE_VALUE, Vec::new())],
    };

    for reply in replies {
      if write_packet(&mut writer, &reply).await.is_err() {
        return;
      }
    }
    if writer.flush().await.is_err() {
      return;
    }
  }
}

/// Observations shared by every [`RecordingConnection`] a connector opens.
#[derive(Default)]
pub struct Recording {
  pub opened: Vec<ConnectionSettings>,
  /// `(connection index, command)` for every command sent.
  pub sent: Vec<(usize, String)>,
  pub disposed: Vec<usize>,
}

impl Recording {
  pub fn commands(&self) -> Vec<String> {
    self.sent.iter().map(|(_, command)| command.clone()).collect()
  }
}

/// Connector producing [`RecordingConnection`]s.
#[derive(Clone, Default)]
pub struct RecordingConnector {
  pub recording: Arc<Mutex<Recording>>,
}

impl RecordingConnector {
  pub fn snapshot<T>(&self, read: impl FnOnce(&Recording) -> T) -> T {
    read(&self.recording.lock().unwrap())
  }
}

impl Connector for RecordingConnector {
  fn open(
    &self,
    target: &Target,
    settings: ConnectionSettings,
  ) -> Box<dyn RconConnection> {
    let index = {
      let mut recording = self.recording.lock().unwrap();
      recording.opened.push(settings);
      recording.opened.len() - 1
    };
    Box::new(RecordingConnection {
      index,
      target: target.clone(),
      settings,
      connected: false,
      disposed: false,
      recording: Arc::clone(&self.recording),
    })
  }
}

/// Connection that answers `ok: <command>`, fails on `boom` and reports a
/// disposed handle on `gone`.
pub struct RecordingConnection {
  index: usize,
  target: Target,
  settings: ConnectionSettings,
  connected: bool,
  disposed: bool,
  recording: Arc<Mutex<Recording>>,
}

impl RecordingConnection {
  fn ensure_live(&self) -> Result<(), ConnectionError> {
    if self.disposed {
      Err(ConnectionError::Disposed)
    } else {
      Ok(())
    }
  }
}

#[async_trait]
impl RconConnection for RecordingConnection {
  async fn connect(&mut self) -> Result<(), ConnectionError> {
    self.ensure_live()?;
    self.connected = true;
    Ok(())
  }

  async fn send_command(
    &mut self,
    command: &str,
  ) -> Result<String, ConnectionError> {
    self.ensure_live()?;
    self.connected = true;
    self
      .recording
      .lock()
      .unwrap()
      .sent
      .push((self.index, command.to_owned()));

    match command {
      "boom" => {
        self.connected = false;
        return Err(ConnectionError::Transport {
          context: "connection reset by peer".to_owned(),
          source: None,
        });
      }
      "gone" => return Err(ConnectionError::Disposed),
      _ => {}
    }
    Ok(format!("ok: {command}"))
  }

  async fn set_timeout(&mut self, seconds: u32) -> Result<(), ConnectionError> {
    self.ensure_live()?;
    self.settings.timeout = seconds;
    self.connected = true;
    Ok(())
  }

  async fn set_multi_packet_response(
    &mut self,
    enabled: bool,
  ) -> Result<(), ConnectionError> {
    self.ensure_live()?;
    self.settings.multi_packet = enabled;
    self.connected = true;
    Ok(())
  }

  async fn dispose(&mut self) {
    if self.disposed {
      return;
    }
    self.disposed = true;
    self.recording.lock().unwrap().disposed.push(self.index);
  }

  fn state(&self) -> ConnectionState {
    if self.disposed {
      ConnectionState::Disposed
    } else if self.connected {
      ConnectionState::Connected
    } else {
      ConnectionState::Uninitialized
    }
  }

  fn settings(&self) -> ConnectionSettings {
    self.settings
  }

  fn target(&self) -> &Target {
    &self.target
  }
}

pub fn local_target() -> Target {
  Target::new(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 25_575), PASSWORD)
}
