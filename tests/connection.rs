mod common;

use std::net::{Ipv4Addr, SocketAddrV4};

use common::source_server;
use rcon_cli::backend::Backend;
use rcon_cli::connection::{
  self, ChannelConnection, ConnectionError, ConnectionSettings,
  ConnectionState, DispatchConnection, RconConnection, Target,
};
use rcon_cli::transport::source::MAX_REQUEST_BODY;

fn handle(
  backend: Backend,
  target: Target,
  timeout: u32,
  multi_packet: bool,
) -> Box<dyn RconConnection> {
  connection::open(
    target,
    ConnectionSettings {
      backend,
      timeout,
      multi_packet,
    },
  )
}

#[tokio::test]
async fn both_backends_connect_lazily_on_first_command() {
  for backend in Backend::ALL {
    let server = source_server().await;
    let mut connection = handle(backend, server.target(), 2, false);

    assert_eq!(connection.state(), ConnectionState::Uninitialized);
    assert_eq!(server.log.connections(), 0);

    let reply = connection.send_command("list").await.expect("send");

    assert_eq!(reply, "echo: list", "{backend}");
    assert_eq!(connection.state(), ConnectionState::Connected);
    assert_eq!(server.log.connections(), 1, "{backend}");
  }
}

#[tokio::test]
async fn connect_is_idempotent() {
  for backend in Backend::ALL {
    let server = source_server().await;
    let mut connection = handle(backend, server.target(), 2, false);

    connection.connect().await.expect("connect");
    connection.connect().await.expect("connect again");
    connection.send_command("list").await.expect("send");

    assert_eq!(server.log.connections(), 1, "{backend}");
  }
}

#[tokio::test]
async fn switching_backend_keeps_talking_to_the_same_server() {
  let server = source_server().await;

  let mut first = handle(Backend::Channel, server.target(), 2, false);
  first.send_command("list").await.expect("send");
  first.dispose().await;

  let mut second = handle(Backend::Dispatch, server.target(), 2, false);
  assert_eq!(second.send_command("status").await.unwrap(), "echo: status");

  assert_eq!(server.log.commands(), vec!["list", "status"]);
  assert_eq!(server.log.connections(), 2);
}

#[tokio::test]
async fn reconfiguring_a_fresh_handle_leaves_it_connected() {
  for backend in Backend::ALL {
    let server = source_server().await;
    let mut connection = handle(backend, server.target(), 2, false);
    connection.set_timeout(3).await.expect("set timeout");

    assert_eq!(connection.state(), ConnectionState::Connected);

    let server = source_server().await;
    let mut connection = handle(backend, server.target(), 2, false);
    connection
      .set_multi_packet_response(true)
      .await
      .expect("enable multi-packet");

    assert_eq!(connection.state(), ConnectionState::Connected);
    assert_eq!(server.log.connections(), 1, "{backend}");
  }
}

#[tokio::test]
async fn channel_timeout_change_rebuilds_client() {
  let server = source_server().await;
  let mut connection = ChannelConnection::new(server.target(), 2, false);
  connection.send_command("list").await.expect("send");

  connection.set_timeout(4).await.expect("set timeout");

  assert_eq!(connection.state(), ConnectionState::Connected);
  assert_eq!(connection.settings().timeout, 4);
  assert_eq!(server.log.connections(), 2);

  connection.send_command("list").await.expect("send");
  assert_eq!(server.log.connections(), 2);
}

#[tokio::test]
async fn channel_multi_packet_toggle_keeps_client() {
  let server = source_server().await;
  let mut connection = ChannelConnection::new(server.target(), 2, false);
  connection.send_command("list").await.expect("send");

  connection
    .set_multi_packet_response(true)
    .await
    .expect("enable multi-packet");

  assert_eq!(connection.state(), ConnectionState::Connected);
  assert_eq!(connection.send_command("split").await.unwrap(), "part1-part2");
  assert_eq!(server.log.connections(), 1);
}

#[tokio::test]
async fn dispatch_timeout_change_keeps_client() {
  let server = source_server().await;
  let mut connection = DispatchConnection::new(server.target(), 2, false);
  connection.send_command("list").await.expect("send");

  connection.set_timeout(5).await.expect("set timeout");

  assert_eq!(connection.state(), ConnectionState::Connected);
  assert_eq!(connection.settings().timeout, 5);
  connection.send_command("list").await.expect("send");
  assert_eq!(server.log.connections(), 1);
}

#[tokio::test]
async fn dispatch_multi_packet_toggle_rebuilds_client_once() {
  let server = source_server().await;
  let mut connection = DispatchConnection::new(server.target(), 2, false);
  connection.send_command("list").await.expect("send");

  connection
    .set_multi_packet_response(true)
    .await
    .expect("enable multi-packet");

  assert_eq!(connection.state(), ConnectionState::Connected);
  assert_eq!(server.log.connections(), 2);

  assert_eq!(connection.send_command("split").await.unwrap(), "part1-part2");
  assert_eq!(server.log.connections(), 2);
}

#[tokio::test]
async fn single_packet_mode_keeps_first_packet_only() {
  for backend in Backend::ALL {
    let server = source_server().await;
    let mut connection = handle(backend, server.target(), 2, false);

    assert_eq!(connection.send_command("split").await.unwrap(), "part1-");
    // The trailing `part2` packet belongs to the previous request.
    assert_eq!(
      connection.send_command("list").await.unwrap(),
      "echo: list",
      "{backend}"
    );
  }
}

#[tokio::test]
async fn wrong_password_is_an_authentication_error() {
  for backend in Backend::ALL {
    let server = source_server().await;
    let mut connection =
      handle(backend, server.target_with_password("nope"), 2, false);

    let err = connection.send_command("list").await.unwrap_err();

    assert!(matches!(err, ConnectionError::Authentication { .. }));
    assert_eq!(connection.state(), ConnectionState::Uninitialized);
    assert!(server.log.commands().is_empty());
  }
}

#[tokio::test]
async fn channel_timeout_drops_client_and_recovers() {
  let server = source_server().await;
  let mut connection = ChannelConnection::new(server.target(), 1, false);

  let err = connection.send_command("sleep").await.unwrap_err();
  assert!(matches!(err, ConnectionError::Timeout { .. }));
  assert_eq!(connection.state(), ConnectionState::Uninitialized);

  assert_eq!(connection.send_command("list").await.unwrap(), "echo: list");
  assert_eq!(server.log.connections(), 2);
}

#[tokio::test]
async fn dispatch_timeout_keeps_client_and_discards_late_reply() {
  let server = source_server().await;
  let mut connection = DispatchConnection::new(server.target(), 1, false);

  let err = connection.send_command("late").await.unwrap_err();
  assert!(matches!(err, ConnectionError::Timeout { .. }));
  assert_eq!(connection.state(), ConnectionState::Connected);

  assert_eq!(connection.send_command("list").await.unwrap(), "echo: list");
  assert_eq!(server.log.connections(), 1);
}

#[tokio::test]
async fn server_hangup_drops_back_to_uninitialized() {
  for backend in Backend::ALL {
    let server = source_server().await;
    let mut connection = handle(backend, server.target(), 2, false);

    let err = connection.send_command("kick").await.unwrap_err();
    assert!(matches!(err, ConnectionError::Transport { .. }), "{backend}");
    assert_eq!(connection.state(), ConnectionState::Uninitialized);

    assert_eq!(connection.send_command("list").await.unwrap(), "echo: list");
    assert_eq!(server.log.connections(), 2, "{backend}");
  }
}

#[tokio::test]
async fn oversized_command_is_rejected_without_touching_the_session() {
  let oversized = "x".repeat(MAX_REQUEST_BODY + 1);

  for backend in Backend::ALL {
    let server = source_server().await;
    let mut connection = handle(backend, server.target(), 2, false);

    let err = connection.send_command(&oversized).await.unwrap_err();
    assert!(matches!(err, ConnectionError::CommandTooLong { .. }));
    assert_eq!(server.log.connections(), 0, "{backend}");

    connection.send_command("list").await.expect("send");
    let err = connection.send_command(&oversized).await.unwrap_err();
    assert!(matches!(err, ConnectionError::CommandTooLong { .. }));

    assert_eq!(connection.state(), ConnectionState::Connected);
    connection.send_command("list").await.expect("send");
    assert_eq!(server.log.connections(), 1, "{backend}");
  }
}

#[tokio::test]
async fn unreachable_server_is_a_connect_error() {
  let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
    .expect("bind");
  let port = listener.local_addr().expect("addr").port();
  drop(listener);

  for backend in Backend::ALL {
    let target =
      Target::new(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port), "pw");
    let mut connection = handle(backend, target, 1, false);

    let err = connection.connect().await.unwrap_err();
    assert!(matches!(err, ConnectionError::Connect { .. }));
    assert_eq!(connection.state(), ConnectionState::Uninitialized);
  }
}

#[tokio::test]
async fn dispose_is_idempotent_and_terminal() {
  for backend in Backend::ALL {
    let server = source_server().await;
    let mut connection = handle(backend, server.target(), 2, false);
    connection.send_command("list").await.expect("send");

    connection.dispose().await;
    connection.dispose().await;
    connection.dispose().await;

    assert_eq!(connection.state(), ConnectionState::Disposed);
    assert!(matches!(
      connection.send_command("list").await,
      Err(ConnectionError::Disposed)
    ));
    assert!(matches!(
      connection.set_timeout(3).await,
      Err(ConnectionError::Disposed)
    ));
    assert!(matches!(
      connection.set_multi_packet_response(true).await,
      Err(ConnectionError::Disposed)
    ));
    assert!(matches!(
      connection.connect().await,
      Err(ConnectionError::Disposed)
    ));
    assert_eq!(server.log.connections(), 1, "{backend}");
  }
}

#[tokio::test]
async fn disposing_a_never_connected_handle_is_quiet() {
  for backend in Backend::ALL {
    let mut connection = handle(backend, common::local_target(), 1, false);

    connection.dispose().await;
    connection.dispose().await;

    assert_eq!(connection.state(), ConnectionState::Disposed);
  }
}
