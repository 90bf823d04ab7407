// src/credentials.rs

use crate::error::{PtyError, PtyResult};
use crate::session_id::SessionId;
use dashmap::DashMap;
use log::debug;
use std::collections::BTreeMap;
use std::fmt;

/// Names a session may provision. Anything else is rejected.
pub const CREDENTIAL_KEYS: [&str; 6] = [
  "AWS_ACCESS_KEY_ID",
  "AWS_SECRET_ACCESS_KEY",
  "AWS_SESSION_TOKEN",
  "AWS_REGION",
  "AWS_DEFAULT_REGION",
  "AWS_PROFILE",
];

/// Named string values supplied by one session's client.
///
/// `Debug` output lists key names only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionCredentials {
  values: BTreeMap<String, String>,
}

impl SessionCredentials {
  /// Builds a credential set, skipping empty values.
  ///
  /// # Errors
  ///
  /// Returns `PtyError::UnknownCredential` for the first key outside
  /// [`CREDENTIAL_KEYS`].
  pub fn from_values<I, K, V>(values: I) -> PtyResult<Self>
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    let mut accepted = BTreeMap::new();
    for (key, value) in values {
      let key = key.into();
      let value = value.into();
      if !CREDENTIAL_KEYS.contains(&key.as_str()) {
        return Err(PtyError::UnknownCredential(key));
      }
      if value.trim().is_empty() {
        continue;
      }
      accepted.insert(key, value);
    }
    Ok(SessionCredentials { values: accepted })
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.values.get(key).map(String::as_str)
  }

  /// `AWS_REGION`, falling back to `AWS_DEFAULT_REGION`.
  pub fn region(&self) -> Option<&str> {
    self
      .get("AWS_REGION")
      .or_else(|| self.get("AWS_DEFAULT_REGION"))
  }

  pub fn profile(&self) -> Option<&str> {
    self.get("AWS_PROFILE")
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.values.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

impl fmt::Debug for SessionCredentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.keys()).finish()
  }
}

/// Per-session credential cache, keyed like the session registry.
#[derive(Debug, Default)]
pub struct CredentialStore {
  entries: DashMap<SessionId, SessionCredentials>,
}

impl CredentialStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replaces the credentials of `id`. Returns how many values were stored.
  pub fn provision(&self, id: SessionId, credentials: SessionCredentials) -> usize {
    let count = credentials.len();
    debug!("Provisioned {} credential values for session {}", count, id);
    self.entries.insert(id, credentials);
    count
  }

  pub fn get(&self, id: &SessionId) -> Option<SessionCredentials> {
    self.entries.get(id).map(|entry| entry.value().clone())
  }

  /// Forgets the credentials of `id`. Returns whether any were stored.
  pub fn clear(&self, id: &SessionId) -> bool {
    self.entries.remove(id).is_some()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
