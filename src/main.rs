// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use pty_relay::config::{PtyConfig, DEFAULT_READ_CHUNK};
use pty_relay::path::resolve_shell;
use pty_relay::server::{self, AppState};
use pty_relay::utils::logging::initialize_logging;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "pty-relay")]
#[command(about = "Serves an interactive shell per WebSocket connection")]
#[command(version)]
struct Cli {
  /// Address to bind to
  #[arg(long, env = "PTY_RELAY_HOST", default_value = "0.0.0.0")]
  host: IpAddr,

  /// Port to listen on
  #[arg(short, long, env = "PORT", default_value_t = 5001)]
  port: u16,

  /// Shell to launch (defaults to $SHELL, then /bin/bash)
  #[arg(long, env = "PTY_RELAY_SHELL")]
  shell: Option<String>,

  /// Start the shell without `-l`
  #[arg(long)]
  no_login: bool,

  /// Initial terminal rows
  #[arg(long, default_value_t = 24)]
  rows: u16,

  /// Initial terminal columns
  #[arg(long, default_value_t = 80)]
  cols: u16,

  /// Bytes read from the terminal per pump iteration
  #[arg(long, default_value_t = DEFAULT_READ_CHUNK)]
  read_chunk: usize,

  /// Longest the pump waits for output before re-checking for shutdown
  #[arg(long, default_value_t = 100)]
  poll_interval_ms: u64,

  /// Time a closed shell gets to exit before it is killed
  #[arg(long, default_value_t = 2000)]
  kill_grace_ms: u64,
}

impl Cli {
  fn pty_config(&self) -> PtyConfig {
    PtyConfig {
      shell: resolve_shell(self.shell.as_deref()),
      login: !self.no_login,
      rows: self.rows,
      cols: self.cols,
      read_chunk: self.read_chunk,
      poll_interval: Duration::from_millis(self.poll_interval_ms),
      kill_grace: Duration::from_millis(self.kill_grace_ms),
      ..PtyConfig::default()
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  initialize_logging();
  let cli = Cli::parse();

  let config = cli.pty_config();
  config.validate().context("Invalid terminal settings")?;
  info!("Sessions will run {:?}", config.shell);

  let addr = SocketAddr::new(cli.host, cli.port);
  server::serve(addr, AppState::new(config))
    .await
    .context("HTTP server error")?;

  info!("Shut down cleanly");
  Ok(())
}
