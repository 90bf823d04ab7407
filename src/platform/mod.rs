// src/platform/mod.rs

use serde::Serialize;

// Conditionally compile platform-specific modules
#[cfg(unix)]
pub mod unix;

#[cfg(not(unix))]
pub mod unsupported;

// Re-export the appropriate PTY types depending on the platform
#[cfg(unix)]
pub use unix::{reap, session_members, signal_session, PtyMaster, PtyProcess};

#[cfg(not(unix))]
pub use unsupported::{reap, session_members, signal_session, PtyMaster, PtyProcess};

/// Terminal window dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowSize {
  pub rows: u16,
  pub cols: u16,
}

/// Signals sent to a shell's session when it is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
  Hangup,
  Terminate,
  Kill,
}
