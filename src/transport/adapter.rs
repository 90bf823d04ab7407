// src/transport/adapter.rs

use crate::credentials::{CredentialStore, SessionCredentials};
use crate::error::PtyResult;
use crate::pty::{OutputSink, SessionRegistry};
use crate::session_id::SessionId;
use crate::transport::protocol::{ClientMessage, ServerMessage};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Turns transport events into registry calls.
///
/// Every method handles its own failures: an error in one session is logged
/// here and never reaches the connection loop of another.
#[derive(Debug, Clone)]
pub struct TransportAdapter {
  registry: Arc<SessionRegistry>,
  credentials: Arc<CredentialStore>,
}

impl TransportAdapter {
  pub fn new(registry: Arc<SessionRegistry>, credentials: Arc<CredentialStore>) -> Self {
    TransportAdapter {
      registry,
      credentials,
    }
  }

  pub fn registry(&self) -> &Arc<SessionRegistry> {
    &self.registry
  }

  pub fn credentials(&self) -> &Arc<CredentialStore> {
    &self.credentials
  }

  /// A client connected: open its session.
  ///
  /// # Errors
  ///
  /// Passes spawn failures back so the caller can tell the client; they are
  /// already logged.
  pub fn connect(&self, id: SessionId, sink: Arc<dyn OutputSink>) -> PtyResult<()> {
    info!("Client connected as session {}", id);
    self.registry.open(id.clone(), sink).map(|_| ()).map_err(|e| {
      error!("Failed to open session {}: {}", id, e);
      e
    })
  }

  pub fn input(&self, id: &SessionId, data: &[u8]) {
    if let Err(e) = self.registry.dispatch_input(id, data) {
      warn!("Input for session {} failed: {}", id, e);
    }
  }

  pub fn resize(&self, id: &SessionId, rows: u16, cols: u16) {
    if let Err(e) = self.registry.dispatch_resize(id, rows, cols) {
      warn!("Resize of session {} to {}x{} failed: {}", id, rows, cols, e);
    }
  }

  /// Stores credentials for a registered session.
  ///
  /// Returns `Ok(None)` when the session is not registered.
  ///
  /// # Errors
  ///
  /// Returns `PtyError::UnknownCredential` if a key is not on the allow-list.
  pub fn provision_credentials(
    &self,
    id: &SessionId,
    values: BTreeMap<String, String>,
  ) -> PtyResult<Option<usize>> {
    if !self.registry.contains(id) {
      return Ok(None);
    }
    let credentials = SessionCredentials::from_values(values)?;
    let count = self.credentials.provision(id.clone(), credentials);

    // A disconnect may have cleared the store between the check and the insert.
    if !self.registry.contains(id) {
      self.credentials.clear(id);
      return Ok(None);
    }
    Ok(Some(count))
  }

  /// A client disconnected: close its session and drop its credentials.
  pub fn disconnect(&self, id: &SessionId) {
    let closed = self.registry.close(id);
    self.credentials.clear(id);
    if closed {
      info!("Client for session {} disconnected", id);
    }
  }

  /// Applies one client frame. Returns a reply frame when the client needs one.
  pub fn handle_message(&self, id: &SessionId, message: ClientMessage) -> Option<ServerMessage> {
    match message {
      ClientMessage::Input { data } => {
        self.input(id, data.as_bytes());
        None
      }
      ClientMessage::Resize { rows, cols } => {
        self.resize(id, rows, cols);
        None
      }
      ClientMessage::Credentials { values } => match self.provision_credentials(id, values) {
        Ok(Some(count)) => Some(ServerMessage::CredentialsSynced { count }),
        Ok(None) => None,
        Err(e) => {
          warn!("Rejected credentials for session {}: {}", id, e);
          Some(ServerMessage::Error {
            message: e.to_string(),
          })
        }
      },
    }
  }
}
