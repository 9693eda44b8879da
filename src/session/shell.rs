use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Stdout};

use super::command::{self, Input, MetaCommand};
use super::{History, execute};
use crate::backend::Backend;
use crate::connection::{
  ConnectionError, ConnectionSettings, Connector, RconConnection, Target,
};
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
  Continue,
  Exit,
}

/// Interactive REPL bound to one connection handle at a time.
///
/// The handle is disposed on every way out of [`Shell::run`]: `::exit`,
/// end of input, Ctrl-C at the prompt, or an error.
pub struct Shell<R, C> {
  input: R,
  stdout: Stdout,
  connector: C,
  connection: Box<dyn RconConnection>,
  history: History,
  /// Command picked from history, sent instead of reading a new line.
  pending: Option<String>,
  use_color: bool,
}

impl<R, C> Shell<R, C>
where
  R: AsyncBufRead + Unpin + Send,
  C: Connector,
{
  pub fn new(
    input: R,
    connector: C,
    target: Target,
    settings: ConnectionSettings,
    use_color: bool,
  ) -> Self {
    let connection = connector.open(&target, settings);
    Self {
      input,
      stdout: tokio::io::stdout(),
      connector,
      connection,
      history: History::new(),
      pending: None,
      use_color,
    }
  }

  pub fn history(&self) -> &History {
    &self.history
  }

  pub fn connection(&self) -> &dyn RconConnection {
    self.connection.as_ref()
  }

  pub async fn run(&mut self) -> Result<()> {
    ui::render_banner(
      self.connection.target(),
      &self.connection.settings(),
      self.use_color,
    );
    ui::render_help(self.use_color);

    let result = self.run_loop().await;

    self.connection.dispose().await;
    ui::render_notice("RCON client disposed.", self.use_color);
    result
  }

  async fn run_loop(&mut self) -> Result<()> {
    loop {
      let command = match self.pending.take() {
        Some(command) => command,
        None => {
          ui::render_prompt(&mut self.stdout, self.use_color)
            .await
            .context("failed to render prompt")?;

          let Some(line) = self.read_line().await? else {
            println!();
            tracing::info!("input closed; terminating session");
            return Ok(());
          };

          match command::classify(&line) {
            Input::Meta(meta) => {
              if self.handle_meta(meta).await? == Flow::Exit {
                return Ok(());
              }
              continue;
            }
            Input::Server(command) => command,
          }
        }
      };

      self.history.record(command.as_str());
      if let Err(err) =
        execute(self.connection.as_mut(), &command, self.use_color).await
      {
        self.report(err)?;
      }
    }
  }

  async fn handle_meta(&mut self, meta: MetaCommand) -> Result<Flow> {
    match meta {
      MetaCommand::Exit => {
        ui::render_notice("Exiting RCON shell.", self.use_color);
        return Ok(Flow::Exit);
      }
      MetaCommand::Info => ui::render_session_info(
        self.connection.target(),
        &self.connection.settings(),
        self.connection.state(),
        &self.history,
        self.use_color,
      ),
      MetaCommand::Help => ui::render_help(self.use_color),
      MetaCommand::Timeout => self.change_timeout().await?,
      MetaCommand::MultiPacket => self.change_multi_packet().await?,
      MetaCommand::Engine => self.change_engine().await?,
      MetaCommand::History => self.pick_from_history().await?,
      MetaCommand::Unknown(name) => ui::render_notice(
        &format!("Unknown command: ::{name} (type ::help for the list)"),
        self.use_color,
      ),
    }
    Ok(Flow::Continue)
  }

  async fn change_timeout(&mut self) -> Result<()> {
    let current = self.connection.settings().timeout;
    let Some(answer) = self
      .ask(&format!("New timeout in seconds (current {current}):"))
      .await?
    else {
      return Ok(());
    };

    let seconds = match answer.trim().parse::<u32>() {
      Ok(seconds) if seconds > 0 => seconds,
      _ => {
        ui::render_notice(
          &format!("`{answer}` is not a positive number of seconds."),
          self.use_color,
        );
        return Ok(());
      }
    };

    match self.connection.set_timeout(seconds).await {
      Ok(()) => ui::render_notice(
        &format!("Timeout set to {seconds} s."),
        self.use_color,
      ),
      Err(err) => self.report(err)?,
    }
    Ok(())
  }

  async fn change_multi_packet(&mut self) -> Result<()> {
    let current = self.connection.settings().multi_packet;
    let Some(answer) = self
      .ask(&format!(
        "Enable multi-packet responses? [y/n] (currently {}):",
        if current { "on" } else { "off" }
      ))
      .await?
    else {
      return Ok(());
    };

    let Some(enabled) = command::parse_toggle(&answer) else {
      ui::render_notice(
        &format!("`{answer}` is not a yes/no answer."),
        self.use_color,
      );
      return Ok(());
    };

    match self.connection.set_multi_packet_response(enabled).await {
      Ok(()) => ui::render_notice(
        &format!(
          "Multi-packet responses {}.",
          if enabled { "enabled" } else { "disabled" }
        ),
        self.use_color,
      ),
      Err(err) => self.report(err)?,
    }
    Ok(())
  }

  async fn change_engine(&mut self) -> Result<()> {
    let settings = self.connection.settings();
    let choices = Backend::ALL
      .iter()
      .map(|backend| backend.as_str().to_ascii_lowercase())
      .collect::<Vec<_>>()
      .join("/");
    let Some(answer) = self
      .ask(&format!("Engine ({choices}, current {}):", settings.backend))
      .await?
    else {
      return Ok(());
    };

    let backend = match answer.parse::<Backend>() {
      Ok(backend) => backend,
      Err(err) => {
        ui::render_notice(&err.to_string(), self.use_color);
        return Ok(());
      }
    };

    if backend == settings.backend {
      ui::render_notice(&format!("Already using {backend}."), self.use_color);
      return Ok(());
    }

    let target = self.connection.target().clone();
    self.connection.dispose().await;
    self.connection = self.connector.open(
      &target,
      ConnectionSettings {
        backend,
        ..settings
      },
    );
    tracing::info!(from = %settings.backend, to = %backend, "switched engine");
    ui::render_notice(
      &format!("Switched engine to {backend}."),
      self.use_color,
    );

    if let Err(err) = self.connection.connect().await {
      self.report(err)?;
    }
    Ok(())
  }

  async fn pick_from_history(&mut self) -> Result<()> {
    if self.history.is_empty() {
      ui::render_notice("No commands recorded yet.", self.use_color);
      return Ok(());
    }

    ui::render_history(&self.history, self.use_color);
    let Some(answer) = self.ask("Entry to run again (empty to cancel):").await?
    else {
      return Ok(());
    };

    let picked = answer
      .trim()
      .parse::<usize>()
      .ok()
      .and_then(|position| self.history.nth_recent(position));
    match picked {
      Some(entry) => self.pending = Some(entry.command.clone()),
      None => ui::render_notice(
        &format!("`{answer}` is not an entry in the list."),
        self.use_color,
      ),
    }
    Ok(())
  }

  /// Print a recoverable error, or escalate a disposed-handle error.
  fn report(&self, err: ConnectionError) -> Result<()> {
    if err.is_recoverable() {
      ui::render_command_error(&err, self.use_color);
      Ok(())
    } else {
      ui::render_invariant_violation(&err, self.use_color);
      Err(err.into())
    }
  }

  /// Ask a follow-up question; `None` on empty answer or closed input.
  async fn ask(&mut self, question: &str) -> Result<Option<String>> {
    ui::render_question(&mut self.stdout, question, self.use_color)
      .await
      .context("failed to render prompt")?;
    Ok(
      self
        .read_line()
        .await?
        .filter(|answer| !answer.trim().is_empty()),
    )
  }

  /// Read one line without its terminator; `None` on EOF or Ctrl-C.
  async fn read_line(&mut self) -> Result<Option<String>> {
    let mut buffer = String::new();
    tokio::select! {
      read = self.input.read_line(&mut buffer) => {
        let bytes_read = read.context("failed to read line from stdin")?;
        if bytes_read == 0 {
          return Ok(None);
        }
      }
      _ = tokio::signal::ctrl_c() => {
        tracing::info!("interrupted");
        return Ok(None);
      }
    }
    Ok(Some(command::strip_line_ending(&buffer).to_owned()))
  }
}
