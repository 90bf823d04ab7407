// src/pty/pump.rs

use crate::platform::PtyMaster;
use crate::pty::decoder::Utf8Decoder;
use crate::pty::output::{OutputSink, SessionEvent};
use crate::pty::session::PtySession;
use log::{debug, info, trace};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub(crate) struct PumpSettings {
  pub read_chunk: usize,
  pub poll_interval: Duration,
}

/// Why the pump loop returned.
#[derive(Debug)]
enum PumpExit {
  /// The session was closed from outside.
  Stopped,
  /// The shell side of the terminal is gone.
  EndOfFile,
  /// Nobody is listening for output anymore.
  SinkClosed,
  Failed(io::Error),
}

/// Starts the output pump for `session` on a dedicated thread.
///
/// # Errors
///
/// Returns an `io::Error` if the thread cannot be spawned.
pub(crate) fn start(
  session: Arc<PtySession>,
  master: Arc<PtyMaster>,
  sink: Arc<dyn OutputSink>,
  settings: PumpSettings,
) -> io::Result<JoinHandle<()>> {
  thread::Builder::new()
    .name(format!("pty-pump-{}", session.id()))
    .spawn(move || run(session, master, sink, settings))
}

fn run(
  session: Arc<PtySession>,
  master: Arc<PtyMaster>,
  sink: Arc<dyn OutputSink>,
  settings: PumpSettings,
) {
  let mut buffer = vec![0u8; settings.read_chunk];
  let mut decoder = Utf8Decoder::new();

  let exit = loop {
    if !session.is_running() {
      break PumpExit::Stopped;
    }

    match master.wait_readable(settings.poll_interval) {
      Ok(true) => {}
      Ok(false) => continue,
      Err(e) => break PumpExit::Failed(e),
    }

    let n = match master.read_data(&mut buffer) {
      Ok(0) => break PumpExit::EndOfFile,
      Ok(n) => n,
      Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
      Err(e) => break PumpExit::Failed(e),
    };
    trace!("Session {} read {} bytes", session.id(), n);

    let data = decoder.decode(&buffer[..n]);
    if data.is_empty() {
      continue;
    }
    let event = SessionEvent::Output {
      session_id: session.id().clone(),
      data,
    };
    if sink.emit(event).is_err() {
      break PumpExit::SinkClosed;
    }
  };

  // Output still buffered at this point is a character cut off by the shell exiting.
  let tail = decoder.finish();
  if !tail.is_empty() && !matches!(exit, PumpExit::Stopped | PumpExit::SinkClosed) {
    let _ = sink.emit(SessionEvent::Output {
      session_id: session.id().clone(),
      data: tail,
    });
  }

  match exit {
    PumpExit::Stopped => debug!("Output pump for session {} stopped", session.id()),
    PumpExit::SinkClosed => {
      debug!("Output sink for session {} closed", session.id());
      session.close();
    }
    PumpExit::EndOfFile | PumpExit::Failed(_) => {
      if let PumpExit::Failed(e) = &exit {
        debug!("Output pump for session {} ended: {}", session.id(), e);
      }
      if session.close() {
        info!("Shell for session {} exited", session.id());
        let _ = sink.emit(SessionEvent::Exited {
          session_id: session.id().clone(),
        });
      }
    }
  }
}
