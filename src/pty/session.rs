// src/pty/session.rs

use crate::config::PtyConfig;
use crate::error::{PtyError, PtyResult};
use crate::platform::{self, PtyMaster, PtyProcess, SessionSignal, WindowSize};
use crate::pty::output::OutputSink;
use crate::pty::pump::{self, PumpSettings};
use crate::session_id::SessionId;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const REAP_WAIT_POLL: Duration = Duration::from_millis(20);

/// One shell process and the pseudo-terminal it is attached to.
///
/// The wrapper starts out running. `close` flips it to stopped exactly once;
/// from then on writes and resizes are ignored and the output pump winds down
/// within one poll interval.
#[derive(Debug)]
pub struct PtySession {
  id: SessionId,
  pid: u32,
  running: AtomicBool,
  master: RwLock<Option<Arc<PtyMaster>>>,
  child: Mutex<Option<Child>>,
  size: Mutex<WindowSize>,
  kill_grace: Duration,
  pump: Mutex<Option<JoinHandle<()>>>,
  reaper: Mutex<Option<JoinHandle<()>>>,
}

impl PtySession {
  /// Spawns the shell for `id` and starts the output pump feeding `sink`.
  ///
  /// # Errors
  ///
  /// Returns `PtyError::ProcessSpawn` if the PTY cannot be allocated, the shell
  /// cannot be launched, or the pump thread cannot be started. Nothing is left
  /// running in that case.
  pub fn spawn(
    id: SessionId,
    config: &PtyConfig,
    sink: Arc<dyn OutputSink>,
  ) -> PtyResult<Arc<Self>> {
    let spawn_error = |source| PtyError::ProcessSpawn {
      shell: config.shell.display().to_string(),
      source,
    };

    let process = PtyProcess::spawn(config).map_err(spawn_error)?;
    let pid = process.pid();
    let (master, child) = process.into_parts();
    let master = Arc::new(master);

    let session = Arc::new(PtySession {
      id,
      pid,
      running: AtomicBool::new(true),
      master: RwLock::new(Some(Arc::clone(&master))),
      child: Mutex::new(Some(child)),
      size: Mutex::new(WindowSize {
        rows: config.rows,
        cols: config.cols,
      }),
      kill_grace: config.kill_grace,
      pump: Mutex::new(None),
      reaper: Mutex::new(None),
    });

    let settings = PumpSettings {
      read_chunk: config.read_chunk,
      poll_interval: config.poll_interval,
    };
    match pump::start(Arc::clone(&session), master, sink, settings) {
      Ok(handle) => *session.pump.lock() = Some(handle),
      Err(e) => {
        session.close();
        return Err(spawn_error(e));
      }
    }

    info!("Session {} started shell pid {}", session.id, pid);
    Ok(session)
  }

  pub fn id(&self) -> &SessionId {
    &self.id
  }

  pub fn pid(&self) -> u32 {
    self.pid
  }

  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::Acquire)
  }

  /// Last size requested through `resize`, or the initial size.
  pub fn size(&self) -> WindowSize {
    *self.size.lock()
  }

  /// Whether the output pump thread has returned.
  pub fn pump_finished(&self) -> bool {
    self
      .pump
      .lock()
      .as_ref()
      .map_or(true, |handle| handle.is_finished())
  }

  /// Whether the reaper has finished, or there never was one.
  pub fn is_reaped(&self) -> bool {
    self
      .reaper
      .lock()
      .as_ref()
      .map_or(true, |handle| handle.is_finished())
  }

  /// Blocks until the shell and the rest of its session have been reaped, or
  /// `timeout` elapses. Returns whether teardown finished.
  ///
  /// A session that was never closed has nothing to wait for.
  pub fn wait_reaped(&self, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
      if self.is_reaped() {
        return true;
      }
      if Instant::now() >= deadline {
        return false;
      }
      thread::sleep(REAP_WAIT_POLL);
    }
  }

  /// Writes `data` to the terminal as keyboard input, byte for byte.
  ///
  /// A stopped session ignores the call.
  ///
  /// # Errors
  ///
  /// Returns `PtyError::Io` if the write fails while the session is still running.
  pub fn write(&self, data: &[u8]) -> PtyResult<()> {
    let Some(master) = self.live_master() else {
      return Ok(());
    };
    match master.write_data(data) {
      Ok(()) => Ok(()),
      Err(_) if !self.is_running() => Ok(()),
      Err(e) => Err(PtyError::Io(e)),
    }
  }

  /// Changes the terminal window size seen by programs in the shell.
  ///
  /// A stopped session ignores the call.
  ///
  /// # Errors
  ///
  /// Returns `PtyError::Io` if the ioctl fails while the session is still running.
  pub fn resize(&self, rows: u16, cols: u16) -> PtyResult<()> {
    let Some(master) = self.live_master() else {
      return Ok(());
    };
    let size = WindowSize { rows, cols };
    match master.resize(size) {
      Ok(()) => {
        *self.size.lock() = size;
        Ok(())
      }
      Err(_) if !self.is_running() => Ok(()),
      Err(e) => Err(PtyError::Io(e)),
    }
  }

  /// Stops the session: signals every process in the shell's session, drops
  /// the master and hands the child to a reaper.
  ///
  /// Safe to call any number of times; only the first call does anything.
  /// Does not wait for the pump. Returns whether this call performed the close.
  pub fn close(&self) -> bool {
    if self
      .running
      .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      return false;
    }

    // Interactive shells ignore SIGTERM; SIGHUP is what a closing terminal sends.
    for signal in [SessionSignal::Hangup, SessionSignal::Terminate] {
      if let Err(e) = platform::signal_session(self.pid, signal) {
        debug!("Signal {:?} to session {} failed: {}", signal, self.id, e);
      }
    }

    // The pump holds its own reference; the descriptor closes when it exits.
    self.master.write().take();

    match self.child.lock().take() {
      Some(child) => *self.reaper.lock() = platform::reap(child, self.kill_grace),
      None => warn!("Session {} had no child to reap", self.id),
    }

    info!("Session {} closed", self.id);
    true
  }

  fn live_master(&self) -> Option<Arc<PtyMaster>> {
    if !self.is_running() {
      return None;
    }
    self.master.read().as_ref().map(Arc::clone)
  }
}

impl Drop for PtySession {
  fn drop(&mut self) {
    self.close();
  }
}
