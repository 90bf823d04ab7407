// src/test/mod.rs

mod adapter_test;

use crate::config::PtyConfig;
use crate::pty::SessionEvent;
use crate::session_id::SessionId;
use once_cell::sync::OnceCell;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{timeout, Instant};

static INIT: OnceCell<()> = OnceCell::new();

pub(crate) const OUTPUT_TIMEOUT: Duration = Duration::from_secs(2);
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub(crate) fn init_logger() {
  INIT.get_or_init(|| {
    env_logger::builder()
      .filter_level(log::LevelFilter::Debug)
      .is_test(true)
      .try_init()
      .ok();
  });
}

/// `/bin/sh` without `-l`, so tests do not depend on profile scripts.
pub(crate) fn test_config() -> PtyConfig {
  PtyConfig {
    login: false,
    poll_interval: POLL_INTERVAL,
    kill_grace: Duration::from_millis(500),
    ..PtyConfig::default().with_shell("/bin/sh")
  }
}

/// Output a session produced before `deadline`, plus whether it exited.
#[derive(Debug, Default)]
pub(crate) struct Collected {
  pub text: String,
  pub exited: bool,
}

/// Drains `rx` until the accumulated output contains `needle`, the session
/// exits, or `wait` elapses.
pub(crate) async fn collect_until(
  rx: &mut UnboundedReceiver<SessionEvent>,
  expected_session: &SessionId,
  needle: &str,
  wait: Duration,
) -> Collected {
  let deadline = Instant::now() + wait;
  let mut collected = Collected::default();
  while !collected.text.contains(needle) {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match timeout(remaining, rx.recv()).await {
      Ok(Some(event)) => {
        assert_eq!(event.session_id(), expected_session, "event routed to wrong session");
        match event {
          SessionEvent::Output { data, .. } => collected.text.push_str(&data),
          SessionEvent::Exited { .. } => {
            collected.exited = true;
            break;
          }
        }
      }
      Ok(None) | Err(_) => break,
    }
  }
  collected
}

/// Whether `pid` names a process that has not exited yet. Zombies count as gone.
pub(crate) fn process_alive(pid: u32) -> bool {
  match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
    Ok(stat) => stat
      .rsplit_once(')')
      .and_then(|(_, rest)| rest.split_whitespace().next())
      .is_some_and(|state| state != "Z"),
    Err(_) => false,
  }
}

/// Polls `check` every 20 ms until it holds or `wait` elapses.
pub(crate) async fn eventually(wait: Duration, mut check: impl FnMut() -> bool) -> bool {
  let deadline = Instant::now() + wait;
  while Instant::now() < deadline {
    if check() {
      return true;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
  }
  check()
}
