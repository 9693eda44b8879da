//! One-shot execution and the interactive shell.

pub mod command;
mod history;
mod shell;

pub use command::{Input, MetaCommand, classify};
pub use history::{History, HistoryEntry};
pub use shell::Shell;

use crate::connection::{ConnectionError, RconConnection};
use crate::ui;

/// Send one command and print the reply. Shared by both modes.
pub async fn execute(
  connection: &mut dyn RconConnection,
  command: &str,
  use_color: bool,
) -> Result<String, ConnectionError> {
  ui::render_command(command, use_color);
  let response = connection.send_command(command).await?;
  ui::render_response(&response, use_color);
  Ok(response)
}

/// Run exactly one command, then dispose the handle whatever the outcome.
pub async fn run_one_shot(
  mut connection: Box<dyn RconConnection>,
  command: &str,
  use_color: bool,
) -> Result<String, ConnectionError> {
  let result = execute(connection.as_mut(), command, use_color).await;
  connection.dispose().await;
  result
}
