// src/transport/protocol.rs

use crate::pty::SessionEvent;
use crate::session_id::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Frames a terminal client sends over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
  /// Keystrokes for the shell.
  Input { data: String },
  Resize { rows: u16, cols: u16 },
  /// Named credential values for this session.
  Credentials { values: BTreeMap<String, String> },
}

/// Frames the server sends to a terminal client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
  Connected { session_id: SessionId },
  Output { data: String },
  Exit,
  Error { message: String },
  CredentialsSynced { count: usize },
}

impl From<SessionEvent> for ServerMessage {
  fn from(event: SessionEvent) -> Self {
    match event {
      SessionEvent::Output { data, .. } => ServerMessage::Output { data },
      SessionEvent::Exited { .. } => ServerMessage::Exit,
    }
  }
}
