// src/platform/unsupported.rs

use crate::config::PtyConfig;
use crate::platform::{SessionSignal, WindowSize};
use std::io;
use std::process::Child;
use std::thread::JoinHandle;
use std::time::Duration;

fn unsupported() -> io::Error {
  io::Error::new(io::ErrorKind::Unsupported, "PTY sessions require a Unix platform")
}

/// Placeholder master; never constructed on this platform.
#[derive(Debug)]
pub struct PtyMaster;

impl PtyMaster {
  pub fn write_data(&self, _data: &[u8]) -> io::Result<()> {
    Err(unsupported())
  }

  pub fn read_data(&self, _buffer: &mut [u8]) -> io::Result<usize> {
    Err(unsupported())
  }

  pub fn wait_readable(&self, _timeout: Duration) -> io::Result<bool> {
    Err(unsupported())
  }

  pub fn resize(&self, _size: WindowSize) -> io::Result<()> {
    Err(unsupported())
  }

  pub fn window_size(&self) -> io::Result<WindowSize> {
    Err(unsupported())
  }
}

/// Represents an unsupported PTY process.
#[derive(Debug)]
pub struct PtyProcess {
  master: PtyMaster,
  child: Child,
}

impl PtyProcess {
  /// Unsupported platform.
  pub fn spawn(_config: &PtyConfig) -> io::Result<Self> {
    Err(unsupported())
  }

  pub fn pid(&self) -> u32 {
    self.child.id()
  }

  pub fn into_parts(self) -> (PtyMaster, Child) {
    (self.master, self.child)
  }
}

pub fn signal_session(_sid: u32, _signal: SessionSignal) -> io::Result<()> {
  Err(unsupported())
}

pub fn session_members(_sid: u32) -> Vec<u32> {
  Vec::new()
}

pub fn reap(mut child: Child, _grace: Duration) -> Option<JoinHandle<()>> {
  let _ = child.kill();
  let _ = child.wait();
  None
}
