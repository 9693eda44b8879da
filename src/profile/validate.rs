use once_cell::sync::Lazy;
use regex::Regex;

use super::Profile;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^[A-Za-z0-9_-]+$").expect("identifier pattern is valid")
});

/// Outcome of [`validate`]: every violated rule, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
  pub errors: Vec<String>,
}

impl ValidationResult {
  pub fn is_success(&self) -> bool {
    self.errors.is_empty()
  }

  pub fn into_errors(self) -> Vec<String> {
    self.errors
  }
}

/// Whether `name` only uses letters, digits, underscores and dashes.
pub fn is_identifier(name: &str) -> bool {
  IDENTIFIER.is_match(name)
}

/// Check every profile rule and collect all violations at once.
pub fn validate(profile: &Profile) -> ValidationResult {
  let mut errors = Vec::new();

  if profile.name.trim().is_empty() {
    errors.push("Name is required.".to_owned());
  }
  if !is_identifier(&profile.name) {
    errors.push("Name is invalid.".to_owned());
  }
  if profile.host.trim().is_empty() {
    errors.push("Host is required.".to_owned());
  }
  if profile.port == 0 {
    errors.push("Port is required.".to_owned());
  }
  if profile.password.trim().is_empty() {
    errors.push("Password is required.".to_owned());
  }

  ValidationResult { errors }
}
