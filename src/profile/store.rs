use std::{
  fs, io,
  path::{Path, PathBuf},
};

use directories::ProjectDirs;
use thiserror::Error;

use super::{Profile, validate};

pub const PROFILE_FILE_NAME: &str = "profiles.json";

#[derive(Error, Debug)]
pub enum ProfileError {
  #[error("profile is invalid: {}", .0.join(" "))]
  Validation(Vec<String>),

  #[error("The profile with the same name already existed.")]
  Duplicate { name: String },

  #[error("Profile with name '{name}' does not exist")]
  NotFound { name: String },

  #[error("unable to locate a configuration directory for this user")]
  NoConfigDir,

  #[error("failed to access {}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("{} is not a valid profile list", path.display())]
  Json {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

impl ProfileError {
  /// Operator-facing messages; validation yields one per violated rule.
  pub fn messages(&self) -> Vec<String> {
    match self {
      Self::Validation(errors) => errors.clone(),
      Self::Io { source, .. } => vec![format!("{self}: {source}")],
      Self::Json { source, .. } => vec![format!("{self}: {source}")],
      other => vec![other.to_string()],
    }
  }
}

/// Profiles persisted as one JSON array.
///
/// Every mutation reads the whole file, applies the change in memory and
/// rewrites the whole file.
#[derive(Debug, Clone)]
pub struct ProfileStore {
  path: PathBuf,
}

impl ProfileStore {
  /// `~/.config/rcon-cli` on Linux, `%APPDATA%\rcon-cli\config` on
  /// Windows.
  pub fn default_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rcon-cli")
      .map(|dirs| dirs.config_dir().to_path_buf())
  }

  pub fn open_default() -> Result<Self, ProfileError> {
    let dir = Self::default_dir().ok_or(ProfileError::NoConfigDir)?;
    Self::open(dir)
  }

  /// Use `dir/profiles.json`, creating the directory and an empty list when
  /// missing.
  pub fn open(dir: impl AsRef<Path>) -> Result<Self, ProfileError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|source| ProfileError::Io {
      path: dir.to_path_buf(),
      source,
    })?;

    let path = dir.join(PROFILE_FILE_NAME);
    if !path.exists() {
      tracing::debug!(path = %path.display(), "creating empty profile list");
      fs::write(&path, "[]").map_err(|source| ProfileError::Io {
        path: path.clone(),
        source,
      })?;
    }

    Ok(Self { path })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn list(&self) -> Result<Vec<Profile>, ProfileError> {
    let json = fs::read_to_string(&self.path).map_err(|source| {
      ProfileError::Io {
        path: self.path.clone(),
        source,
      }
    })?;

    if json.trim().is_empty() {
      return Ok(Vec::new());
    }

    serde_json::from_str(&json).map_err(|source| ProfileError::Json {
      path: self.path.clone(),
      source,
    })
  }

  pub fn get(&self, name: &str) -> Result<Option<Profile>, ProfileError> {
    Ok(self.list()?.into_iter().find(|profile| profile.is_named(name)))
  }

  pub fn create(&self, profile: Profile) -> Result<Profile, ProfileError> {
    let validation = validate(&profile);
    if !validation.is_success() {
      return Err(ProfileError::Validation(validation.into_errors()));
    }

    let mut profiles = self.list()?;
    if profiles.iter().any(|existing| existing.is_named(&profile.name)) {
      return Err(ProfileError::Duplicate { name: profile.name });
    }

    profiles.push(profile.clone());
    self.write(&profiles)?;
    tracing::info!(name = %profile.name, "profile created");
    Ok(profile)
  }

  /// Replace the stored profile that shares `profile.name`.
  pub fn update(&self, profile: Profile) -> Result<Profile, ProfileError> {
    let mut profiles = self.list()?;
    let Some(index) = profiles
      .iter()
      .position(|existing| existing.is_named(&profile.name))
    else {
      return Err(ProfileError::NotFound { name: profile.name });
    };

    let validation = validate(&profile);
    if !validation.is_success() {
      return Err(ProfileError::Validation(validation.into_errors()));
    }

    profiles.remove(index);
    profiles.push(profile.clone());
    self.write(&profiles)?;
    tracing::info!(name = %profile.name, "profile updated");
    Ok(profile)
  }

  pub fn remove(&self, name: &str) -> Result<Profile, ProfileError> {
    let mut profiles = self.list()?;
    let Some(index) =
      profiles.iter().position(|existing| existing.is_named(name))
    else {
      return Err(ProfileError::NotFound {
        name: name.to_owned(),
      });
    };

    let removed = profiles.remove(index);
    self.write(&profiles)?;
    tracing::info!(name = %removed.name, "profile removed");
    Ok(removed)
  }

  fn write(&self, profiles: &[Profile]) -> Result<(), ProfileError> {
    let json =
      serde_json::to_string_pretty(profiles).map_err(|source| {
        ProfileError::Json {
          path: self.path.clone(),
          source,
        }
      })?;

    fs::write(&self.path, json).map_err(|source| ProfileError::Io {
      path: self.path.clone(),
      source,
    })
  }
}
