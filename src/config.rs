// src/config.rs

use crate::error::{PtyError, PtyResult};
use std::path::PathBuf;
use std::time::Duration;

/// Default shell launched for every session.
pub const DEFAULT_SHELL: &str = "/bin/bash";
/// Bytes read from the master per pump iteration.
pub const DEFAULT_READ_CHUNK: usize = 1024;
/// Upper bound on how long the pump waits for readability before re-checking the running flag.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Time a closed shell gets to exit after SIGHUP/SIGTERM before SIGKILL.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(2);

const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Settings applied to every PTY session spawned by a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyConfig {
  /// Shell binary to launch.
  pub shell: PathBuf,
  /// Launch the shell as a login shell (`-l`).
  pub login: bool,
  /// Value of `TERM` in the child environment.
  pub term: String,
  /// Initial window rows.
  pub rows: u16,
  /// Initial window columns.
  pub cols: u16,
  pub read_chunk: usize,
  pub poll_interval: Duration,
  pub kill_grace: Duration,
}

impl Default for PtyConfig {
  fn default() -> Self {
    PtyConfig {
      shell: PathBuf::from(DEFAULT_SHELL),
      login: true,
      term: "xterm-256color".to_string(),
      rows: 24,
      cols: 80,
      read_chunk: DEFAULT_READ_CHUNK,
      poll_interval: DEFAULT_POLL_INTERVAL,
      kill_grace: DEFAULT_KILL_GRACE,
    }
  }
}

impl PtyConfig {
  /// Returns a copy that launches `shell` instead of the default.
  pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
    self.shell = shell.into();
    self
  }

  /// Checks that the values can drive a working pump.
  ///
  /// # Errors
  ///
  /// Returns `PtyError::InvalidConfig` naming the first offending field.
  pub fn validate(&self) -> PtyResult<()> {
    if self.shell.as_os_str().is_empty() {
      return Err(PtyError::InvalidConfig("shell must not be empty".into()));
    }
    if self.rows == 0 || self.cols == 0 {
      return Err(PtyError::InvalidConfig(format!(
        "window size must be non-zero, got {}x{}",
        self.rows, self.cols
      )));
    }
    if self.read_chunk == 0 {
      return Err(PtyError::InvalidConfig("read_chunk must be positive".into()));
    }
    if self.poll_interval.is_zero() || self.poll_interval > MAX_POLL_INTERVAL {
      return Err(PtyError::InvalidConfig(format!(
        "poll_interval must be within 1..=1000 ms, got {} ms",
        self.poll_interval.as_millis()
      )));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config_is_valid() {
    let config = PtyConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.read_chunk, 1024);
    assert_eq!(config.poll_interval, Duration::from_millis(100));
  }

  #[test]
  fn rejects_zero_sized_window() {
    let config = PtyConfig {
      rows: 0,
      ..PtyConfig::default()
    };
    assert!(matches!(config.validate(), Err(PtyError::InvalidConfig(_))));
  }

  #[test]
  fn rejects_unbounded_poll_interval() {
    let config = PtyConfig {
      poll_interval: Duration::from_secs(5),
      ..PtyConfig::default()
    };
    assert!(config.validate().is_err());

    let config = PtyConfig {
      poll_interval: Duration::ZERO,
      ..PtyConfig::default()
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn with_shell_overrides_only_the_shell() {
    let config = PtyConfig::default().with_shell("/bin/sh");
    assert_eq!(config.shell, PathBuf::from("/bin/sh"));
    assert!(config.login);
  }
}
