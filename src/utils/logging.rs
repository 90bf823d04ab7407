// src/utils/logging.rs

use env_logger::{Builder, Env};

/// Environment variable holding the log filter, e.g. `PTY_RELAY_LOG=debug`.
pub const LOG_ENV: &str = "PTY_RELAY_LOG";

/// Initializes logging using `env_logger`.
///
/// The default level is `info`; `PTY_RELAY_LOG` accepts any `env_logger`
/// filter string. Calling this more than once is harmless: later calls are
/// reported on stderr and otherwise ignored.
///
/// # Examples
///
/// ```rust
/// pty_relay::utils::logging::initialize_logging();
/// log::info!("Logging has been initialized.");
/// ```
pub fn initialize_logging() {
  let env = Env::default().filter_or(LOG_ENV, "info");
  if let Err(e) = Builder::from_env(env).format_timestamp_millis().try_init() {
    eprintln!("Logger already initialized: {}", e);
  }
  log::debug!("Logging initialized");
}
