//! Classification of interactive input lines.
//!
//! `::name` is a session meta-command. A leading `$` is an escape: exactly
//! one is stripped and the rest goes to the server untouched, so `$::exit`
//! sends `::exit` and `$$x` sends `$x`. Everything else, the empty line
//! included, is sent verbatim.

pub const META_PREFIX: &str = "::";
pub const ESCAPE_PREFIX: char = '$';

/// Session meta-commands recognised in interactive mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
  Exit,
  Info,
  Help,
  Timeout,
  MultiPacket,
  Engine,
  History,
  /// Anything else after `::`, kept for the error notice.
  Unknown(String),
}

impl MetaCommand {
  /// Name and description of every known meta-command, in help order.
  pub const HELP: [(&'static str, &'static str); 7] = [
    ("exit", "Exit the RCON shell."),
    ("info", "Show the current session parameters."),
    ("help", "Show this help table."),
    ("timeout", "Change the response timeout in seconds."),
    ("multipacket", "Toggle multi-packet response reassembly."),
    ("engine", "Switch the RCON backend (forces a reconnect)."),
    ("history", "Pick a previous command and run it again."),
  ];

  /// Parse the text following `::`. Names are matched literally.
  pub fn parse(name: &str) -> Self {
    match name {
      "exit" => Self::Exit,
      "info" => Self::Info,
      "help" => Self::Help,
      "timeout" => Self::Timeout,
      "multipacket" => Self::MultiPacket,
      "engine" => Self::Engine,
      "history" => Self::History,
      other => Self::Unknown(other.to_owned()),
    }
  }
}

/// What one line of operator input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
  Meta(MetaCommand),
  Server(String),
}

/// Remove the line terminator left by `read_line`, nothing else.
#[must_use]
pub fn strip_line_ending(raw: &str) -> &str {
  raw.trim_end_matches(['\r', '\n'])
}

/// Classify a line; the `::` check runs before the `$` escape.
#[must_use]
pub fn classify(line: &str) -> Input {
  let line = strip_line_ending(line);

  if let Some(name) = line.strip_prefix(META_PREFIX) {
    return Input::Meta(MetaCommand::parse(name));
  }

  match line.strip_prefix(ESCAPE_PREFIX) {
    Some(literal) => Input::Server(literal.to_owned()),
    None => Input::Server(line.to_owned()),
  }
}

/// Parse a yes/no style answer.
#[must_use]
pub fn parse_toggle(raw: &str) -> Option<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "y" | "yes" | "true" | "on" | "1" => Some(true),
    "n" | "no" | "false" | "off" | "0" => Some(false),
    _ => None,
  }
}
