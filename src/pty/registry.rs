// src/pty/registry.rs

use crate::config::PtyConfig;
use crate::error::{PtyError, PtyResult};
use crate::platform::WindowSize;
use crate::pty::output::OutputSink;
use crate::pty::session::PtySession;
use crate::session_id::SessionId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Point-in-time view of one registered session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
  pub session_id: SessionId,
  pub pid: u32,
  pub running: bool,
  pub rows: u16,
  pub cols: u16,
}

/// Maps session ids to their live PTY wrappers.
///
/// Every lookup clones the `Arc` out of the map and releases the shard lock
/// before touching the PTY, so a slow write never blocks other sessions.
#[derive(Debug)]
pub struct SessionRegistry {
  config: PtyConfig,
  sessions: DashMap<SessionId, Arc<PtySession>>,
  /// Removed sessions whose shells may still be shutting down.
  closing: Mutex<Vec<Arc<PtySession>>>,
}

impl SessionRegistry {
  pub fn new(config: PtyConfig) -> Self {
    SessionRegistry {
      config,
      sessions: DashMap::new(),
      closing: Mutex::new(Vec::new()),
    }
  }

  pub fn config(&self) -> &PtyConfig {
    &self.config
  }

  /// Spawns a shell for `id`, starts its pump and registers it.
  ///
  /// # Errors
  ///
  /// - `PtyError::ProcessSpawn` if the shell cannot be started; nothing is registered.
  /// - `PtyError::SessionExists` if `id` already has a wrapper; the existing
  ///   one is left untouched.
  pub fn open(&self, id: SessionId, sink: Arc<dyn OutputSink>) -> PtyResult<Arc<PtySession>> {
    if self.sessions.contains_key(&id) {
      return Err(PtyError::SessionExists(id));
    }

    let session = PtySession::spawn(id.clone(), &self.config, sink)?;
    // The shard guard is released at the end of this statement.
    let inserted = match self.sessions.entry(id) {
      Entry::Occupied(entry) => Err(entry.key().clone()),
      Entry::Vacant(entry) => {
        entry.insert(Arc::clone(&session));
        Ok(())
      }
    };

    match inserted {
      Ok(()) => {
        info!("Registered session {}", session.id());
        Ok(session)
      }
      Err(existing) => {
        session.close();
        Err(PtyError::SessionExists(existing))
      }
    }
  }

  /// Forwards client input to the session's shell.
  ///
  /// Input for a session that is not registered is dropped.
  ///
  /// # Errors
  ///
  /// Returns `PtyError::Io` if the write fails on a running session.
  pub fn dispatch_input(&self, id: &SessionId, data: &[u8]) -> PtyResult<()> {
    match self.get(id) {
      Some(session) => session.write(data),
      None => {
        debug!("Dropping {} bytes of input for unknown session {}", data.len(), id);
        Ok(())
      }
    }
  }

  /// Resizes the session's terminal. Unknown sessions are ignored.
  ///
  /// # Errors
  ///
  /// Returns `PtyError::Io` if the ioctl fails on a running session.
  pub fn dispatch_resize(&self, id: &SessionId, rows: u16, cols: u16) -> PtyResult<()> {
    match self.get(id) {
      Some(session) => session.resize(rows, cols),
      None => {
        debug!("Ignoring resize for unknown session {}", id);
        Ok(())
      }
    }
  }

  /// Removes the session and closes it. Returns whether it was registered.
  pub fn close(&self, id: &SessionId) -> bool {
    self.remove_and_close(id).is_some()
  }

  /// Closes every registered session and returns the closed wrappers.
  pub fn close_all(&self) -> Vec<Arc<PtySession>> {
    let ids = self.session_ids();
    info!("Closing {} sessions", ids.len());
    ids
      .iter()
      .filter_map(|id| self.remove_and_close(id))
      .collect()
  }

  /// Closes every session, then blocks until the shells and descendants of
  /// every session closed so far have been reaped or `wait` elapses. Returns
  /// whether all were reaped.
  pub fn shutdown(&self, wait: Duration) -> bool {
    self.close_all();
    let closing = std::mem::take(&mut *self.closing.lock());
    let deadline = Instant::now() + wait;
    let pending = closing
      .iter()
      .filter(|session| !session.wait_reaped(deadline.saturating_duration_since(Instant::now())))
      .count();
    if pending > 0 {
      warn!("{} sessions were still being torn down at shutdown", pending);
    }
    pending == 0
  }

  fn remove_and_close(&self, id: &SessionId) -> Option<Arc<PtySession>> {
    let (_, session) = self.sessions.remove(id)?;
    session.close();
    info!("Unregistered session {}", id);

    let mut closing = self.closing.lock();
    closing.retain(|s| !s.is_reaped());
    closing.push(Arc::clone(&session));
    Some(session)
  }

  pub fn get(&self, id: &SessionId) -> Option<Arc<PtySession>> {
    self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
  }

  pub fn contains(&self, id: &SessionId) -> bool {
    self.sessions.contains_key(id)
  }

  pub fn len(&self) -> usize {
    self.sessions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.sessions.is_empty()
  }

  pub fn session_ids(&self) -> Vec<SessionId> {
    self.sessions.iter().map(|entry| entry.key().clone()).collect()
  }

  /// Lists registered sessions ordered by id.
  pub fn snapshot(&self) -> Vec<SessionSnapshot> {
    let mut sessions: Vec<SessionSnapshot> = self
      .sessions
      .iter()
      .map(|entry| {
        let session = entry.value();
        let WindowSize { rows, cols } = session.size();
        SessionSnapshot {
          session_id: entry.key().clone(),
          pid: session.pid(),
          running: session.is_running(),
          rows,
          cols,
        }
      })
      .collect();
    sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
    sessions
  }
}
