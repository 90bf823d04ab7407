// src/path/mod.rs

use crate::config::DEFAULT_SHELL;
use log::{debug, warn};
use std::env;
use std::path::{Path, PathBuf};

const FALLBACK_SHELL: &str = "/bin/sh";

/// Picks the shell binary that sessions will launch.
///
/// Order of preference: the explicit value, `$SHELL` when it names an existing
/// file, `/bin/bash`, and finally `/bin/sh`.
///
/// # Examples
///
/// ```rust
/// let shell = pty_relay::path::resolve_shell(Some("/bin/sh"));
/// assert_eq!(shell, std::path::PathBuf::from("/bin/sh"));
/// ```
pub fn resolve_shell(explicit: Option<&str>) -> PathBuf {
  resolve_shell_from(explicit, env::var("SHELL").ok(), is_file)
}

fn resolve_shell_from(
  explicit: Option<&str>,
  env_shell: Option<String>,
  exists: impl Fn(&Path) -> bool,
) -> PathBuf {
  if let Some(shell) = explicit.filter(|s| !s.trim().is_empty()) {
    debug!("Using configured shell: {}", shell);
    return PathBuf::from(shell);
  }

  if let Some(shell) = env_shell.filter(|s| !s.trim().is_empty()) {
    let path = PathBuf::from(&shell);
    if exists(&path) {
      debug!("Using shell from SHELL: {:?}", path);
      return path;
    }
    warn!("SHELL points to a non-file, ignoring: {:?}", path);
  }

  let default = PathBuf::from(DEFAULT_SHELL);
  if exists(&default) {
    return default;
  }
  debug!("{} not found, falling back to {}", DEFAULT_SHELL, FALLBACK_SHELL);
  PathBuf::from(FALLBACK_SHELL)
}

fn is_file(path: &Path) -> bool {
  path.is_file()
}
