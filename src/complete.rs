//! Shell completion.
//!
//! `rcon-cli completions <shell>` prints a static script. Profile names are
//! completed on the fly through `COMPLETE=<shell> rcon-cli`, which reads the
//! profile file each time the shell asks.

use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::engine::CompletionCandidate;
use clap_complete::{Shell, generate};

use crate::cli::{Cli, DATA_DIR_ENV};
use crate::profile::{PROFILE_FILE_NAME, Profile, ProfileStore};

pub const BIN_NAME: &str = "rcon-cli";

/// Write the completion script for `shell` to `out`.
pub fn write_script(shell: Shell, out: &mut dyn Write) {
  generate(shell, &mut Cli::command(), BIN_NAME, out);
}

/// Value completer for profile-name arguments.
pub fn complete_profile_name(current: &OsStr) -> Vec<CompletionCandidate> {
  let Some(current) = current.to_str() else {
    return Vec::new();
  };
  let dir = std::env::var_os(DATA_DIR_ENV)
    .map(PathBuf::from)
    .or_else(ProfileStore::default_dir);

  match dir {
    Some(dir) => profile_names_in(&dir, current),
    None => Vec::new(),
  }
}

/// Profile names stored under `dir` that start with `current`.
///
/// Never creates the profile file; a missing or unreadable one completes
/// nothing.
pub fn profile_names_in(dir: &Path, current: &str) -> Vec<CompletionCandidate> {
  if !dir.join(PROFILE_FILE_NAME).is_file() {
    return Vec::new();
  }

  match ProfileStore::open(dir).and_then(|store| store.list()) {
    Ok(profiles) => profile_candidates(&profiles, current),
    Err(err) => {
      tracing::debug!(error = %err, "profile completion unavailable");
      Vec::new()
    }
  }
}

/// Candidates for every profile whose name starts with `current`, ignoring
/// case. Descriptions become the candidates' help text.
pub fn profile_candidates(
  profiles: &[Profile],
  current: &str,
) -> Vec<CompletionCandidate> {
  let prefix = current.to_lowercase();
  profiles
    .iter()
    .filter(|profile| profile.name.to_lowercase().starts_with(&prefix))
    .map(|profile| {
      let candidate = CompletionCandidate::new(profile.name.clone());
      if profile.description.is_empty() {
        candidate
      } else {
        candidate.help(Some(profile.description.clone().into()))
      }
    })
    .collect()
}
