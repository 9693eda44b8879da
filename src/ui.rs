use chrono::Local;
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncWriteExt, Stdout};

use crate::connection::{
  ConnectionError, ConnectionSettings, ConnectionState, Target,
};
use crate::profile::Profile;
use crate::session::{History, MetaCommand};

/// Column-aligned plain-text table.
#[derive(Debug, Clone, Default)]
pub struct Table {
  title: String,
  headers: Vec<String>,
  rows: Vec<Vec<String>>,
}

impl Table {
  pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
    Self {
      title: title.into(),
      headers: headers.iter().map(|h| h.to_string()).collect(),
      rows: Vec::new(),
    }
  }

  pub fn add_row<I, S>(&mut self, cells: I)
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.rows.push(cells.into_iter().map(Into::into).collect());
  }

  fn widths(&self) -> Vec<usize> {
    let mut widths: Vec<usize> =
      self.headers.iter().map(|h| h.chars().count()).collect();
    for row in &self.rows {
      for (index, cell) in row.iter().enumerate() {
        let width = cell.chars().count();
        match widths.get_mut(index) {
          Some(current) => *current = (*current).max(width),
          None => widths.push(width),
        }
      }
    }
    widths
  }

  /// Render the table to a string, one line per row.
  pub fn render(&self, use_color: bool) -> String {
    let widths = self.widths();
    let line = |cells: &[String]| {
      cells
        .iter()
        .zip(&widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_owned()
    };

    let mut out = Vec::with_capacity(self.rows.len() + 3);
    if use_color {
      out.push(self.title.bold().underline().to_string());
      out.push(line(&self.headers[..]).bright_cyan().bold().to_string());
    } else {
      out.push(self.title.clone());
      out.push(line(&self.headers[..]));
    }

    let rule_width = widths.iter().sum::<usize>()
      + 2 * widths.len().saturating_sub(1);
    out.push("─".repeat(rule_width));

    for row in &self.rows {
      out.push(line(&row[..]));
    }
    out.join("\n")
  }

  pub fn print(&self, use_color: bool) {
    println!("{}", self.render(use_color));
    println!();
  }
}

fn timestamp() -> String {
  Local::now().format("%H:%M:%S").to_string()
}

/// Render the interactive prompt prefix to the provided stdout handle.
pub async fn render_prompt(
  stdout: &mut Stdout,
  use_color: bool,
) -> io::Result<()> {
  let prompt = if use_color {
    format!("{} ", "rcon>".bright_magenta().bold())
  } else {
    "rcon> ".to_owned()
  };

  stdout.write_all(prompt.as_bytes()).await?;
  stdout.flush().await
}

/// Ask a follow-up question inside a meta-command.
pub async fn render_question(
  stdout: &mut Stdout,
  question: &str,
  use_color: bool,
) -> io::Result<()> {
  let prompt = if use_color {
    format!("{} {} ", "?".bright_yellow().bold(), question.bold())
  } else {
    format!("? {question} ")
  };

  stdout.write_all(prompt.as_bytes()).await?;
  stdout.flush().await
}

pub fn render_banner(
  target: &Target,
  settings: &ConnectionSettings,
  use_color: bool,
) {
  let version = env!("CARGO_PKG_VERSION");
  if use_color {
    println!(
      "{} {}",
      "⇢".bright_cyan(),
      format!("RCON CLI v{version}").bold()
    );
    println!(
      "  {} {} via {}",
      "target".dimmed(),
      target.address.bright_white(),
      settings.backend.bright_white()
    );
  } else {
    println!("RCON CLI v{version}");
    println!("  target {} via {}", target.address, settings.backend);
  }
  println!();
}

pub fn render_help(use_color: bool) {
  let mut table =
    Table::new("RCON CLI shell mode commands", &["Command", "Description"]);
  for (name, description) in MetaCommand::HELP {
    table.add_row([format!("::{name}"), description.to_owned()]);
  }
  table.add_row([
    "$<text>".to_owned(),
    "Send <text> to the server even if it starts with `::` or `$`.".to_owned(),
  ]);
  table.print(use_color);
}

pub fn render_session_info(
  target: &Target,
  settings: &ConnectionSettings,
  state: ConnectionState,
  history: &History,
  use_color: bool,
) {
  let mut table = Table::new("Session", &["Property", "Value"]);
  table.add_row(["Target".to_owned(), target.address.to_string()]);
  table.add_row(["Engine".to_owned(), settings.backend.to_string()]);
  table.add_row(["Timeout".to_owned(), format!("{} s", settings.timeout)]);
  table.add_row([
    "Multi-packet".to_owned(),
    if settings.multi_packet { "enabled" } else { "disabled" }.to_owned(),
  ]);
  table.add_row(["State".to_owned(), state.to_string()]);
  table.add_row([
    "History".to_owned(),
    format!("{} command(s)", history.len()),
  ]);
  table.print(use_color);
}

pub fn render_history(history: &History, use_color: bool) {
  let mut table = Table::new("Command history", &["#", "Time", "Command"]);
  for (position, entry) in history.recent_first().enumerate() {
    table.add_row([
      (position + 1).to_string(),
      entry.at.format("%H:%M:%S").to_string(),
      entry.command.clone(),
    ]);
  }
  table.print(use_color);
}

/// Echo a command about to be sent.
pub fn render_command(command: &str, use_color: bool) {
  if use_color {
    println!("{} {} {}", timestamp().dimmed(), "[Command]".red(), command);
  } else {
    println!("{} [Command] {}", timestamp(), command);
  }
}

/// Print the raw server reply.
pub fn render_response(response: &str, use_color: bool) {
  if use_color {
    println!("{} {} {}", timestamp().dimmed(), "[Results]".green(), response);
  } else {
    println!("{} [Results] {}", timestamp(), response);
  }
}

/// Report a failed command without ending the session.
pub fn render_command_error(err: &ConnectionError, use_color: bool) {
  if use_color {
    println!(
      "{} {} {}",
      timestamp().dimmed(),
      format!("[{}]", err.label()).yellow().bold(),
      err.red()
    );
  } else {
    println!("{} [{}] {}", timestamp(), err.label(), err);
  }

  let mut source = std::error::Error::source(err);
  while let Some(cause) = source {
    if use_color {
      println!("  {} {}", "↳".yellow(), cause);
    } else {
      println!("  caused by: {cause}");
    }
    source = cause.source();
  }
}

/// A broken internal invariant; printed loudly on stderr.
pub fn render_invariant_violation(err: &ConnectionError, use_color: bool) {
  if use_color {
    eprintln!(
      "{} {}",
      "BUG:".on_red().white().bold(),
      err.to_string().red().bold()
    );
  } else {
    eprintln!("BUG: {err}");
  }
  eprintln!("  this indicates an internal error in rcon-cli; please report it");
}

pub fn render_notice(message: &str, use_color: bool) {
  if use_color {
    println!("{} {}", "ℹ".bright_blue(), message);
  } else {
    println!("{message}");
  }
}

pub fn render_success(message: &str, use_color: bool) {
  if use_color {
    println!("{}", message.green().bold());
  } else {
    println!("{message}");
  }
}

pub fn render_errors<I, S>(errors: I, use_color: bool)
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  println!("Oops! Something went wrong.");
  for error in errors {
    if use_color {
      println!("  > {}", error.as_ref().red());
    } else {
      println!("  > {}", error.as_ref());
    }
  }
}

pub fn render_profile(
  profile: &Profile,
  include_password: bool,
  use_color: bool,
) {
  let mut table = Table::new("Profile Detail", &["Property", "Value"]);
  table.add_row(["Name".to_owned(), profile.name.clone()]);
  table.add_row(["Host".to_owned(), profile.host.clone()]);
  table.add_row(["Port".to_owned(), profile.port.to_string()]);
  table.add_row(["Library".to_owned(), profile.library.to_string()]);
  if include_password {
    table.add_row(["Password".to_owned(), profile.password.clone()]);
  }
  table.add_row(["Description".to_owned(), profile.description.clone()]);
  table.print(use_color);
}

pub fn render_profiles(
  profiles: &[Profile],
  include_password: bool,
  use_color: bool,
) {
  let mut headers = vec!["Name", "Host", "Port", "Library"];
  if include_password {
    headers.push("Password");
  }
  headers.push("Description");

  let mut table = Table::new("Profile List", &headers);
  for profile in profiles {
    let mut row = vec![
      profile.name.clone(),
      profile.host.clone(),
      profile.port.to_string(),
      profile.library.to_string(),
    ];
    if include_password {
      row.push(profile.password.clone());
    }
    row.push(profile.description.clone());
    table.add_row(row);
  }
  table.print(use_color);
}

pub fn render_app_info(rows: &[(&str, String)], use_color: bool) {
  let mut table = Table::new("RCON CLI", &["Property", "Value"]);
  for (key, value) in rows {
    table.add_row([key.to_string(), value.clone()]);
  }
  table.print(use_color);
}
