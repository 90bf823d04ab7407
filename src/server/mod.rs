// src/server/mod.rs

//! HTTP surface: the terminal socket plus a few JSON endpoints around it.
mod handlers;

use crate::config::PtyConfig;
use crate::credentials::CredentialStore;
use crate::pty::SessionRegistry;
use crate::transport::{ws, TransportAdapter};
use axum::extract::FromRef;
use axum::routing::get;
use axum::Router;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

pub use handlers::{CredentialStatus, HealthResponse, ProvisionRequest, ProvisionResponse};

/// Extra time on top of the kill grace for the final `SIGKILL` and `wait`.
const SHUTDOWN_MARGIN: Duration = Duration::from_millis(500);

/// Everything the handlers share. Owned by `serve`, never global.
#[derive(Debug, Clone)]
pub struct AppState {
  pub registry: Arc<SessionRegistry>,
  pub credentials: Arc<CredentialStore>,
  pub adapter: TransportAdapter,
}

impl AppState {
  pub fn new(config: PtyConfig) -> Self {
    let registry = Arc::new(SessionRegistry::new(config));
    let credentials = Arc::new(CredentialStore::new());
    let adapter = TransportAdapter::new(Arc::clone(&registry), Arc::clone(&credentials));
    AppState {
      registry,
      credentials,
      adapter,
    }
  }
}

impl FromRef<AppState> for TransportAdapter {
  fn from_ref(state: &AppState) -> Self {
    state.adapter.clone()
  }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/health", get(handlers::health))
    .route("/api/sessions", get(handlers::list_sessions))
    .route(
      "/api/sessions/:id/credentials",
      get(handlers::credential_status).post(handlers::provision_credentials),
    )
    .route("/ws", get(ws::terminal_socket))
    .layer(CorsLayer::permissive())
    .with_state(state)
}

/// Serves until Ctrl-C or SIGTERM, then closes every session and waits for
/// the shells to be reaped before returning.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
  let listener = tokio::net::TcpListener::bind(addr).await?;
  info!("Listening on http://{}", listener.local_addr()?);

  let registry = Arc::clone(&state.registry);
  let result = axum::serve(listener, router(state))
    .with_graceful_shutdown(wait_for_shutdown_signal())
    .await;

  // Process exit would cut the reapers' SIGKILL escalation short.
  let wait = registry.config().kill_grace + SHUTDOWN_MARGIN;
  match tokio::task::spawn_blocking(move || registry.shutdown(wait)).await {
    Ok(true) => info!("All sessions torn down"),
    Ok(false) => warn!("Gave up waiting for sessions after {:?}", wait),
    Err(e) => error!("Session teardown task failed: {}", e),
  }
  result
}

async fn wait_for_shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      error!("Failed to install Ctrl+C handler: {}", e);
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut signal) => {
        signal.recv().await;
      }
      Err(e) => {
        error!("Failed to install SIGTERM handler: {}", e);
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => info!("Received Ctrl+C signal"),
    _ = terminate => info!("Received SIGTERM signal"),
  }
}
