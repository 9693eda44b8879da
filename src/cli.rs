use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use clap_complete::engine::ArgValueCompleter;

use crate::backend::Backend;
use crate::complete::complete_profile_name;
use crate::connection::DEFAULT_TIMEOUT_SECS;

/// Environment variable overriding the profile directory.
pub const DATA_DIR_ENV: &str = "RCON_CLI_DATA_DIR";

/// Command-line arguments for the RCON client.
#[derive(Parser, Debug, Clone)]
#[command(
  author,
  version,
  about = "Manage RCON server profiles and run remote console commands"
)]
pub struct Cli {
  /// Increase logging verbosity (repeat for more detail).
  #[arg(short, long, action = ArgAction::Count, global = true)]
  pub verbose: u8,

  /// Disable ANSI color output.
  #[arg(long, global = true)]
  pub plain: bool,

  /// Directory holding profiles.json (defaults to the per-user config dir).
  #[arg(long, env = "RCON_CLI_DATA_DIR", global = true, value_name = "DIR")]
  pub data_dir: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// Manage profiles.
  #[command(subcommand)]
  Profile(ProfileCommand),

  /// Connect to a server defined in a profile.
  Connect(ConnectArgs),

  /// Connect to a server directly.
  Direct(DirectArgs),

  /// Show version and data locations.
  Info,

  /// Print a shell completion script.
  Completions {
    /// Shell to generate the script for.
    shell: clap_complete::Shell,
  },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
  /// Add a new profile.
  Add(AddArgs),

  /// List all profiles.
  #[command(alias = "ls")]
  List {
    /// Show passwords in the output.
    #[arg(short = 's', long = "show-passwords")]
    show_passwords: bool,
  },

  /// Edit a profile.
  Edit(EditArgs),

  /// Remove a profile.
  #[command(alias = "rm")]
  Remove {
    /// The name of the profile.
    #[arg(add = ArgValueCompleter::new(complete_profile_name))]
    name: String,
  },
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
  /// Profile name; letters, numbers, underscores and dashes only.
  pub name: String,

  /// Server host: an IPv4 address or a name resolving to one.
  #[arg(short = 'H', long)]
  pub host: String,

  /// Server port.
  #[arg(short = 'p', long)]
  pub port: u16,

  /// Server password.
  #[arg(short = 'w', long)]
  pub password: String,

  /// RCON client to use (channel or dispatch).
  #[arg(short = 'e', long, default_value_t = Backend::default())]
  pub engine: Backend,

  /// Description message.
  #[arg(short = 'd', long)]
  pub description: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
  /// The name of the profile.
  #[arg(add = ArgValueCompleter::new(complete_profile_name))]
  pub name: String,

  #[arg(short = 'H', long)]
  pub host: Option<String>,

  #[arg(short = 'p', long)]
  pub port: Option<u16>,

  #[arg(short = 'w', long)]
  pub password: Option<String>,

  #[arg(short = 'e', long)]
  pub engine: Option<Backend>,

  #[arg(short = 'd', long)]
  pub description: Option<String>,
}

/// Options shared by `connect` and `direct`.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
  /// Execute the command and exit instead of starting the shell.
  #[arg(short = 'c', long)]
  pub command: Option<String>,

  /// Reassemble responses split over several packets.
  #[arg(short = 'm', long)]
  pub multi_packet: bool,

  /// Response timeout in seconds.
  #[arg(
    short = 't',
    long,
    default_value_t = DEFAULT_TIMEOUT_SECS,
    value_parser = clap::value_parser!(u32).range(1..),
    value_name = "SECONDS"
  )]
  pub timeout: u32,
}

#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
  /// The name of the profile.
  #[arg(add = ArgValueCompleter::new(complete_profile_name))]
  pub name: String,

  #[command(flatten)]
  pub session: SessionArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DirectArgs {
  /// Server host: an IPv4 address or a name resolving to one.
  #[arg(short = 'H', long, env = "RCON_HOST")]
  pub host: String,

  /// Server port.
  #[arg(short = 'p', long, env = "RCON_PORT")]
  pub port: u16,

  /// Server password.
  #[arg(short = 'w', long, env = "RCON_PASSWORD", hide_env_values = true)]
  pub password: String,

  /// RCON client to use (channel or dispatch).
  #[arg(short = 'e', long, default_value_t = Backend::default())]
  pub engine: Backend,

  #[command(flatten)]
  pub session: SessionArgs,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cli_definition_is_consistent() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
  }

  #[test]
  fn connect_parses_one_shot_options() {
    let cli = Cli::try_parse_from([
      "rcon-cli", "connect", "lobby", "-c", "list", "-m", "-t", "3",
    ])
    .expect("parse");

    let Command::Connect(args) = cli.command else {
      panic!("expected connect");
    };
    assert_eq!(args.name, "lobby");
    assert_eq!(args.session.command.as_deref(), Some("list"));
    assert!(args.session.multi_packet);
    assert_eq!(args.session.timeout, 3);
  }

  #[test]
  fn zero_timeout_is_rejected() {
    assert!(
      Cli::try_parse_from(["rcon-cli", "connect", "lobby", "-t", "0"]).is_err()
    );
  }

  #[test]
  fn profile_add_parses_engine() {
    let cli = Cli::try_parse_from([
      "rcon-cli", "profile", "add", "arena", "-H", "10.0.0.5", "-p", "5522",
      "-w", "pw", "-e", "dispatch",
    ])
    .expect("parse");

    let Command::Profile(ProfileCommand::Add(args)) = cli.command else {
      panic!("expected profile add");
    };
    assert_eq!(args.engine, Backend::Dispatch);
    assert_eq!(args.port, 5_522);
  }

  #[test]
  fn completions_takes_a_shell() {
    let cli =
      Cli::try_parse_from(["rcon-cli", "completions", "zsh"]).expect("parse");
    assert!(matches!(
      cli.command,
      Command::Completions {
        shell: clap_complete::Shell::Zsh
      }
    ));
    assert!(Cli::try_parse_from(["rcon-cli", "completions", "tcsh"]).is_err());
  }

  #[test]
  fn list_has_ls_alias() {
    let cli =
      Cli::try_parse_from(["rcon-cli", "profile", "ls", "-s"]).expect("parse");
    assert!(matches!(
      cli.command,
      Command::Profile(ProfileCommand::List {
        show_passwords: true
      })
    ));
  }
}
