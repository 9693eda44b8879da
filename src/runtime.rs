use std::io::{self, IsTerminal};

use crate::{Cli, run};
use owo_colors::OwoColorize;

/// High-level wrapper that executes one CLI invocation and reports errors
/// uniformly.
pub struct Runtime {
  cli: Cli,
}

impl Runtime {
  /// Construct a new [`Runtime`] from parsed CLI arguments.
  #[must_use]
  pub fn new(cli: Cli) -> Self {
    Self { cli }
  }

  /// Execute the client and return the desired process exit code.
  ///
  /// Errors that escape `run` (DNS failures, one-shot command failures,
  /// unreadable profile files) are printed with their cause chain and
  /// mapped to exit code `1`.
  pub async fn execute(self) -> i32 {
    let use_color = stderr_color(self.cli.plain);
    match run(self.cli).await {
      Ok(code) => code,
      Err(err) => {
        log_error_chain(&err, use_color);
        1
      }
    }
  }
}

/// Colour only when not disabled and stderr is a terminal, as `core::run`
/// decides for log output.
pub(crate) fn stderr_color(plain: bool) -> bool {
  color_enabled(plain, io::stderr().is_terminal())
}

fn color_enabled(plain: bool, is_terminal: bool) -> bool {
  !plain && is_terminal
}

fn log_error_chain(err: &anyhow::Error, use_color: bool) {
  if use_color {
    eprintln!("{} {}", "error:".red().bold(), err.to_string().red().bold());
  } else {
    eprintln!("error: {err}");
  }

  for cause in err.chain().skip(1) {
    if use_color {
      eprintln!("  {} {}", "↳".red(), cause);
    } else {
      eprintln!("  caused by: {cause}");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_disables_color() {
    assert!(!stderr_color(true));
    assert!(!color_enabled(true, true));
  }

  #[test]
  fn piped_stderr_disables_color() {
    assert!(!color_enabled(false, false));
    assert!(color_enabled(false, true));
  }
}
