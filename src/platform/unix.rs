// src/platform/unix.rs

use crate::config::PtyConfig;
use crate::platform::{SessionSignal, WindowSize};
use libc::{ioctl, winsize, TIOCGWINSZ, TIOCSWINSZ};
use log::{debug, error, trace, warn};
use nix::pty::{openpty, Winsize};
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const REAP_POLL: Duration = Duration::from_millis(50);

/// Master side of a pseudo-terminal.
///
/// The descriptor is closed when the last owner drops it, so sharing it behind
/// an `Arc` keeps it valid for any read or write still in flight.
#[derive(Debug)]
pub struct PtyMaster {
  file: File,
}

impl PtyMaster {
  fn new(fd: OwnedFd) -> io::Result<Self> {
    set_cloexec(fd.as_raw_fd())?;
    Ok(PtyMaster {
      file: File::from(fd),
    })
  }

  /// Writes all of `data` to the master; the shell sees it as keyboard input.
  ///
  /// # Errors
  ///
  /// Returns an `io::Error` if the write fails.
  pub fn write_data(&self, data: &[u8]) -> io::Result<()> {
    (&self.file).write_all(data)?;
    (&self.file).flush()
  }

  /// Reads whatever output is available, up to `buffer.len()` bytes.
  ///
  /// # Errors
  ///
  /// Returns an `io::Error` if the read fails. On Linux this is `EIO` once the
  /// slave side has been closed by every process holding it.
  pub fn read_data(&self, buffer: &mut [u8]) -> io::Result<usize> {
    (&self.file).read(buffer)
  }

  /// Waits up to `timeout` for the master to become readable.
  ///
  /// Hang-up and error conditions count as readable so that the next read
  /// surfaces them.
  ///
  /// # Errors
  ///
  /// Returns an `io::Error` if `poll` fails or the descriptor is invalid.
  pub fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
      fd: self.file.as_raw_fd(),
      events: libc::POLLIN,
      revents: 0,
    };
    let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;

    let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if ret < 0 {
      let err = io::Error::last_os_error();
      if err.kind() == io::ErrorKind::Interrupted {
        return Ok(false);
      }
      return Err(err);
    }
    if ret == 0 {
      return Ok(false);
    }
    if pfd.revents & libc::POLLNVAL != 0 {
      return Err(io::Error::from_raw_os_error(libc::EBADF));
    }
    Ok(pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0)
  }

  /// Resizes the PTY window.
  ///
  /// # Errors
  ///
  /// Returns an `io::Error` if the `TIOCSWINSZ` ioctl fails.
  pub fn resize(&self, size: WindowSize) -> io::Result<()> {
    let ws = to_winsize(size);
    let ret = unsafe { ioctl(self.file.as_raw_fd(), TIOCSWINSZ, &ws) };
    if ret != 0 {
      return Err(io::Error::last_os_error());
    }
    debug!("Resized PTY to rows: {}, cols: {}", size.rows, size.cols);
    Ok(())
  }

  /// Reads the current window size back from the kernel.
  ///
  /// # Errors
  ///
  /// Returns an `io::Error` if the `TIOCGWINSZ` ioctl fails.
  pub fn window_size(&self) -> io::Result<WindowSize> {
    let mut ws: winsize = unsafe { std::mem::zeroed() };
    let ret = unsafe { ioctl(self.file.as_raw_fd(), TIOCGWINSZ, &mut ws) };
    if ret != 0 {
      return Err(io::Error::last_os_error());
    }
    Ok(WindowSize {
      rows: ws.ws_row,
      cols: ws.ws_col,
    })
  }
}

/// A freshly spawned shell together with the master side of its terminal.
#[derive(Debug)]
pub struct PtyProcess {
  master: PtyMaster,
  child: Child,
}

impl PtyProcess {
  /// Allocates a PTY pair and launches the configured shell on its slave side.
  ///
  /// The child calls `setsid()` and takes the slave as its controlling
  /// terminal, so it leads a new session and process group whose id equals its
  /// pid. The parent's copy of the slave is closed before returning.
  ///
  /// # Errors
  ///
  /// Returns an `io::Error` if the PTY cannot be opened or the shell cannot be
  /// executed.
  pub fn spawn(config: &PtyConfig) -> io::Result<Self> {
    let size = WindowSize {
      rows: config.rows,
      cols: config.cols,
    };
    let pty = openpty(Some(&to_winsize(size)), None).map_err(io::Error::from)?;
    let master = PtyMaster::new(pty.master)?;
    let slave = pty.slave;
    set_cloexec(slave.as_raw_fd())?;

    let mut command = Command::new(&config.shell);
    if config.login {
      command.arg("-l");
    }
    command
      .env("TERM", &config.term)
      .stdin(Stdio::from(slave.try_clone()?))
      .stdout(Stdio::from(slave.try_clone()?))
      .stderr(Stdio::from(slave));

    // Runs in the forked child after stdio has been bound to the slave.
    unsafe {
      command.pre_exec(|| {
        if libc::setsid() == -1 {
          return Err(io::Error::last_os_error());
        }
        if libc::ioctl(libc::STDIN_FILENO, libc::TIOCSCTTY as _, 0) == -1 {
          return Err(io::Error::last_os_error());
        }
        Ok(())
      });
    }

    let child = command.spawn().map_err(|e| {
      error!("Failed to launch {:?}: {}", config.shell, e);
      e
    })?;
    debug!("Spawned {:?} with pid {}", config.shell, child.id());

    // `command` still holds the parent's slave descriptors until it is dropped.
    drop(command);

    Ok(PtyProcess { master, child })
  }

  pub fn pid(&self) -> u32 {
    self.child.id()
  }

  pub fn into_parts(self) -> (PtyMaster, Child) {
    (self.master, self.child)
  }
}

/// Sends `signal` to every process in the session led by `sid`.
///
/// The leader's own process group is signalled first; on Linux every other
/// member found in `/proc` is signalled as well, which reaches background
/// jobs the shell moved into groups of their own.
///
/// # Errors
///
/// Returns an `io::Error` only if nothing could be signalled, typically
/// `ESRCH` once the whole session is gone.
pub fn signal_session(sid: u32, signal: SessionSignal) -> io::Result<()> {
  let signal = match signal {
    SessionSignal::Hangup => Signal::SIGHUP,
    SessionSignal::Terminate => Signal::SIGTERM,
    SessionSignal::Kill => Signal::SIGKILL,
  };
  let group = killpg(Pid::from_raw(sid as libc::pid_t), signal);

  let mut delivered = 0;
  for pid in session_members(sid) {
    match kill(Pid::from_raw(pid as libc::pid_t), signal) {
      Ok(()) => delivered += 1,
      Err(e) => trace!("{:?} to pid {} failed: {}", signal, pid, e),
    }
  }

  match group {
    Ok(()) => Ok(()),
    Err(_) if delivered > 0 => Ok(()),
    Err(e) => Err(io::Error::from(e)),
  }
}

/// Pids of the live (non-zombie) processes whose session id is `sid`.
#[cfg(target_os = "linux")]
pub fn session_members(sid: u32) -> Vec<u32> {
  let entries = match fs::read_dir("/proc") {
    Ok(entries) => entries,
    Err(e) => {
      warn!("Cannot scan /proc for session {}: {}", sid, e);
      return Vec::new();
    }
  };

  entries
    .filter_map(Result::ok)
    .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
    .filter(|pid| {
      // Processes can vanish between readdir and read.
      fs::read_to_string(format!("/proc/{}/stat", pid))
        .ok()
        .and_then(|stat| parse_stat(&stat))
        .is_some_and(|(state, session)| session == sid && state != 'Z')
    })
    .collect()
}

/// Without `/proc` only the leader's process group can be found.
#[cfg(not(target_os = "linux"))]
pub fn session_members(_sid: u32) -> Vec<u32> {
  Vec::new()
}

/// Extracts `(state, session)` from a `/proc/<pid>/stat` line.
///
/// The command name is parenthesised and may itself contain spaces or
/// parentheses, so fields are counted from the last `)`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_stat(stat: &str) -> Option<(char, u32)> {
  let rest = &stat[stat.rfind(')')? + 1..];
  let mut fields = rest.split_whitespace();
  let state = fields.next()?.chars().next()?;
  // ppid, pgrp
  fields.nth(1)?;
  let session = fields.next()?.parse().ok()?;
  Some((state, session))
}

/// Collects the exit status of `child` off the calling thread.
///
/// The shell and everything else in its session get `grace` to exit on their
/// own. Whatever is still alive after that is killed, including descendants
/// that outlived the shell. The returned handle finishes once the shell has
/// been waited for and the session is empty (or has been sent `SIGKILL`).
pub fn reap(mut child: Child, grace: Duration) -> Option<JoinHandle<()>> {
  let pid = child.id();
  let spawned = thread::Builder::new()
    .name(format!("pty-reap-{}", pid))
    .spawn(move || {
      let deadline = Instant::now() + grace;
      let mut exited = false;
      loop {
        if !exited {
          match child.try_wait() {
            Ok(Some(status)) => {
              debug!("Shell {} exited with {}", pid, status);
              exited = true;
            }
            Ok(None) => {}
            Err(e) => {
              warn!("Failed to poll shell {}: {}", pid, e);
              break;
            }
          }
        }
        if exited && session_members(pid).is_empty() {
          return;
        }
        if Instant::now() >= deadline {
          break;
        }
        thread::sleep(REAP_POLL);
      }

      debug!("Session {} still alive after {:?}, sending SIGKILL", pid, grace);
      if let Err(e) = signal_session(pid, SessionSignal::Kill) {
        debug!("SIGKILL to session {} failed: {}", pid, e);
      }
      if !exited {
        match child.wait() {
          Ok(status) => debug!("Shell {} exited with {}", pid, status),
          Err(e) => warn!("Failed to wait for shell {}: {}", pid, e),
        }
      }
    });

  match spawned {
    Ok(handle) => Some(handle),
    Err(e) => {
      error!("Failed to start reaper for shell {}: {}", pid, e);
      None
    }
  }
}

fn to_winsize(size: WindowSize) -> Winsize {
  Winsize {
    ws_row: size.rows,
    ws_col: size.cols,
    ws_xpixel: 0,
    ws_ypixel: 0,
  }
}

fn set_cloexec(fd: RawFd) -> io::Result<()> {
  let ret = unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) };
  if ret == -1 {
    return Err(io::Error::last_os_error());
  }
  Ok(())
}
