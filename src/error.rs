// src/error.rs

use crate::session_id::SessionId;
use std::io;
use thiserror::Error;

/// Errors raised by the PTY session layer.
///
/// A missing session is not an error here: input, resize and
/// close aimed at a session that is already gone are silent no-ops.
#[derive(Debug, Error)]
pub enum PtyError {
  /// The pseudo-terminal could not be allocated or the shell could not be launched.
  #[error("failed to spawn shell `{shell}`: {source}")]
  ProcessSpawn {
    shell: String,
    #[source]
    source: io::Error,
  },

  /// A single read, write or resize on the PTY master failed.
  #[error("PTY I/O error: {0}")]
  Io(#[from] io::Error),

  /// A second wrapper was requested for a session that already has one.
  #[error("session `{0}` already exists")]
  SessionExists(SessionId),

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("credential `{0}` is not accepted")]
  UnknownCredential(String),
}

/// Result alias used throughout the crate.
pub type PtyResult<T> = Result<T, PtyError>;

/// Returned by an output sink whose receiving side has gone away.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("output sink closed")]
pub struct SinkClosed;
