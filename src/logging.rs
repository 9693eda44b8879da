use tracing_subscriber::EnvFilter;

/// Initialise structured logging on stderr.
///
/// `verbosity` comes from the CLI `-v/--verbose` flag:
///   * `0` → WARN
///   * `1` → INFO
///   * `2` → DEBUG
///   * `3+` → TRACE
///
/// `use_color` controls whether ANSI colour codes are emitted.
pub fn init(verbosity: u8, use_color: bool) {
  let level = match verbosity {
    0 => tracing::Level::WARN,
    1 => tracing::Level::INFO,
    2 => tracing::Level::DEBUG,
    _ => tracing::Level::TRACE,
  };

  // `RUST_LOG` wins over the flag-derived level.
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(level.as_str()));

  // Stdout belongs to command output and the shell prompt.
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .with_level(true)
    .with_ansi(use_color)
    .compact()
    .try_init();
}
