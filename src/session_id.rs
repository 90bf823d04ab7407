// src/session_id.rs

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Opaque identifier of one transport connection.
///
/// The transport layer mints these; the PTY layer only uses them as keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
  pub fn new(id: impl Into<String>) -> Self {
    SessionId(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for SessionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<String> for SessionId {
  fn from(id: String) -> Self {
    SessionId(id)
  }
}

impl From<&str> for SessionId {
  fn from(id: &str) -> Self {
    SessionId(id.to_owned())
  }
}

impl Borrow<str> for SessionId {
  fn borrow(&self) -> &str {
    &self.0
  }
}

impl AsRef<str> for SessionId {
  fn as_ref(&self) -> &str {
    &self.0
  }
}
