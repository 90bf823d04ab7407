// src/pty/output.rs

use crate::error::SinkClosed;
use crate::session_id::SessionId;
use tokio::sync::mpsc::UnboundedSender;

/// Something a session reports to its transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
  /// Decoded terminal output, in the order it was read.
  Output { session_id: SessionId, data: String },
  /// The shell went away on its own; no more output will follow.
  Exited { session_id: SessionId },
}

impl SessionEvent {
  pub fn session_id(&self) -> &SessionId {
    match self {
      SessionEvent::Output { session_id, .. } | SessionEvent::Exited { session_id } => session_id,
    }
  }
}

/// Destination for the events of exactly one session.
///
/// Implementations must not block: the output pump calls `emit` from its own
/// thread between reads.
pub trait OutputSink: Send + Sync + 'static {
  /// Delivers one event.
  ///
  /// # Errors
  ///
  /// Returns `SinkClosed` when nobody is listening anymore; the pump stops on it.
  fn emit(&self, event: SessionEvent) -> Result<(), SinkClosed>;
}

impl OutputSink for UnboundedSender<SessionEvent> {
  fn emit(&self, event: SessionEvent) -> Result<(), SinkClosed> {
    self.send(event).map_err(|_| SinkClosed)
  }
}
