//! Named server connection profiles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backend::Backend;

mod store;
mod validate;

pub use store::{PROFILE_FILE_NAME, ProfileError, ProfileStore};
pub use validate::{ValidationResult, is_identifier, validate};

/// A stored server connection preset.
///
/// Serialised with the field names of the profile file:
/// `{ "Name": "lobby", "Host": "10.0.0.5", "Port": 25575, ... }`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Profile {
  pub name: String,
  pub host: String,
  pub port: u16,
  pub password: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub library: Backend,
}

impl Profile {
  pub fn new(
    name: impl Into<String>,
    host: impl Into<String>,
    port: u16,
    password: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      host: host.into(),
      port,
      password: password.into(),
      description: String::new(),
      library: Backend::default(),
    }
  }

  pub fn with_backend(mut self, backend: Backend) -> Self {
    self.library = backend;
    self
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  /// Case-insensitive name comparison used for lookups and uniqueness.
  pub fn is_named(&self, name: &str) -> bool {
    self.name.to_lowercase() == name.to_lowercase()
  }
}

impl fmt::Debug for Profile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Profile")
      .field("name", &self.name)
      .field("host", &self.host)
      .field("port", &self.port)
      .field("password", &"<redacted>")
      .field("description", &self.description)
      .field("library", &self.library)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn serialises_with_profile_file_field_names() {
    let profile = Profile::new("lobby", "10.0.0.5", 25_575, "secret")
      .with_backend(Backend::Dispatch)
      .with_description("main lobby");

    let json = serde_json::to_value(&profile).expect("serialise");

    assert_eq!(json["Name"], "lobby");
    assert_eq!(json["Host"], "10.0.0.5");
    assert_eq!(json["Port"], 25_575);
    assert_eq!(json["Password"], "secret");
    assert_eq!(json["Description"], "main lobby");
    assert_eq!(json["Library"], "Dispatch");
  }

  #[test]
  fn missing_optional_fields_take_defaults() {
    let profile: Profile = serde_json::from_str(
      r#"{"Name":"a","Host":"h","Port":1,"Password":"p"}"#,
    )
    .expect("deserialise");

    assert_eq!(profile.library, Backend::Channel);
    assert!(profile.description.is_empty());
  }

  #[test]
  fn names_match_case_insensitively() {
    let profile = Profile::new("Lobby", "h", 1, "p");
    assert!(profile.is_named("LOBBY"));
    assert!(!profile.is_named("lobby2"));
  }

  #[test]
  fn debug_hides_password() {
    let profile = Profile::new("a", "h", 1, "hunter2");
    assert!(!format!("{profile:?}").contains("hunter2"));
  }
}
