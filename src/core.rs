use std::io::{self, IsTerminal};
use std::net::SocketAddrV4;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::BufReader;

use crate::{
  cli::{Cli, Command, ConnectArgs, DirectArgs, ProfileCommand, SessionArgs},
  complete,
  connection::{self, BackendConnector, ConnectionSettings, Target},
  logging,
  profile::{Profile, ProfileStore, validate},
  resolve::resolve_ipv4,
  session::{self, Shell},
  ui,
};

/// Name given to the throwaway profile built by `direct`.
const DIRECT_PROFILE_NAME: &str = "direct-connect";

/// Orchestrate the full client lifecycle for a single invocation.
pub async fn run(cli: Cli) -> Result<i32> {
  let use_color_stdout = !cli.plain && io::stdout().is_terminal();
  let use_color_logs = crate::runtime::stderr_color(cli.plain);

  logging::init(cli.verbose, use_color_logs);

  let data_dir = cli.data_dir.as_deref();
  match cli.command {
    Command::Profile(command) => {
      let store = open_store(data_dir)?;
      Ok(run_profile_command(&store, command, use_color_stdout))
    }
    Command::Connect(args) => {
      let store = open_store(data_dir)?;
      run_connect(&store, args, use_color_stdout).await
    }
    Command::Direct(args) => run_direct(args, use_color_stdout).await,
    Command::Info => {
      let store = open_store(data_dir)?;
      render_info(&store, use_color_stdout);
      Ok(0)
    }
    Command::Completions { shell } => {
      complete::write_script(shell, &mut io::stdout());
      Ok(0)
    }
  }
}

fn open_store(data_dir: Option<&Path>) -> Result<ProfileStore> {
  let store = match data_dir {
    Some(dir) => ProfileStore::open(dir),
    None => ProfileStore::open_default(),
  };
  let store = store.context("failed to open the profile store")?;
  tracing::debug!(path = %store.path().display(), "using profile store");
  Ok(store)
}

fn run_profile_command(
  store: &ProfileStore,
  command: ProfileCommand,
  use_color: bool,
) -> i32 {
  match command {
    ProfileCommand::Add(args) => {
      let profile = Profile::new(args.name, args.host, args.port, args.password)
        .with_backend(args.engine)
        .with_description(args.description.unwrap_or_default());

      match store.create(profile) {
        Ok(profile) => {
          ui::render_success(
            &format!("Profile '{}' added successfully.", profile.name),
            use_color,
          );
          ui::render_profile(&profile, false, use_color);
          0
        }
        Err(err) => {
          ui::render_errors(err.messages(), use_color);
          1
        }
      }
    }
    ProfileCommand::List { show_passwords } => match store.list() {
      Ok(profiles) => {
        ui::render_profiles(&profiles, show_passwords, use_color);
        0
      }
      Err(err) => {
        ui::render_errors(err.messages(), use_color);
        1
      }
    },
    ProfileCommand::Edit(args) => {
      let existing = match store.get(&args.name) {
        Ok(Some(profile)) => profile,
        Ok(None) => {
          ui::render_errors(
            [format!("Profile '{}' does not exist.", args.name)],
            use_color,
          );
          return 1;
        }
        Err(err) => {
          ui::render_errors(err.messages(), use_color);
          return 1;
        }
      };

      let password_changed = args.password.is_some();
      let edited = Profile {
        host: args.host.unwrap_or(existing.host),
        port: args.port.unwrap_or(existing.port),
        password: args.password.unwrap_or(existing.password),
        library: args.engine.unwrap_or(existing.library),
        description: args.description.unwrap_or(existing.description),
        name: existing.name,
      };

      match store.update(edited) {
        Ok(profile) => {
          ui::render_success(
            &format!("Profile '{}' updated successfully.", profile.name),
            use_color,
          );
          ui::render_profile(&profile, password_changed, use_color);
          0
        }
        Err(err) => {
          ui::render_errors(err.messages(), use_color);
          1
        }
      }
    }
    ProfileCommand::Remove { name } => match store.remove(&name) {
      Ok(profile) => {
        ui::render_success(
          &format!("Profile '{}' removed successfully.", profile.name),
          use_color,
        );
        ui::render_profile(&profile, false, use_color);
        0
      }
      Err(err) => {
        ui::render_errors(err.messages(), use_color);
        1
      }
    },
  }
}

async fn run_connect(
  store: &ProfileStore,
  args: ConnectArgs,
  use_color: bool,
) -> Result<i32> {
  let Some(profile) = store.get(&args.name)? else {
    ui::render_errors(
      [format!("Profile '{}' does not exist.", args.name)],
      use_color,
    );
    return Ok(1);
  };

  start_session(&profile, &args.session, use_color).await
}

async fn run_direct(args: DirectArgs, use_color: bool) -> Result<i32> {
  let profile = Profile::new(
    DIRECT_PROFILE_NAME,
    args.host,
    args.port,
    args.password,
  )
  .with_backend(args.engine);

  let validation = validate(&profile);
  if !validation.is_success() {
    ui::render_errors(validation.into_errors(), use_color);
    return Ok(1);
  }

  start_session(&profile, &args.session, use_color).await
}

/// Resolve the profile's host, then run one command or the shell.
async fn start_session(
  profile: &Profile,
  args: &SessionArgs,
  use_color: bool,
) -> Result<i32> {
  let ip = resolve_ipv4(&profile.host).await?;
  let target = Target::new(
    SocketAddrV4::new(ip, profile.port),
    profile.password.clone(),
  );
  let settings = ConnectionSettings {
    backend: profile.library,
    timeout: args.timeout,
    multi_packet: args.multi_packet,
  };

  tracing::info!(
    profile = %profile.name,
    address = %target.address,
    backend = %settings.backend,
    "starting session"
  );

  match args.command.as_deref() {
    Some(command) => {
      let connection = connection::open(target, settings);
      session::run_one_shot(connection, command, use_color)
        .await
        .with_context(|| format!("command `{command}` failed"))?;
      Ok(0)
    }
    None => {
      let input = BufReader::new(tokio::io::stdin());
      let mut shell =
        Shell::new(input, BackendConnector, target, settings, use_color);
      shell.run().await?;
      Ok(0)
    }
  }
}

fn render_info(store: &ProfileStore, use_color: bool) {
  let rows = [
    ("Version", env!("CARGO_PKG_VERSION").to_owned()),
    (
      "Platform",
      format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
    ),
    (
      "App data",
      store
        .path()
        .parent()
        .map(|dir| dir.display().to_string())
        .unwrap_or_default(),
    ),
    ("Profiles", store.path().display().to_string()),
  ];
  ui::render_app_info(&rows, use_color);
}
