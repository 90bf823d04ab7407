// src/server/handlers.rs

use super::AppState;
use crate::pty::SessionSnapshot;
use crate::session_id::SessionId;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
  pub status: String,
  pub version: String,
  pub sessions: usize,
}

#[derive(Debug, Deserialize)]
pub struct ProvisionRequest {
  #[serde(default)]
  pub values: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionResponse {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub count: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl ProvisionResponse {
  fn failed(error: impl Into<String>) -> Self {
    ProvisionResponse {
      success: false,
      count: None,
      error: Some(error.into()),
    }
  }
}

/// Which credential names a session has; values never leave the server.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialStatus {
  pub synced: bool,
  pub count: usize,
  pub keys: Vec<String>,
}

pub(super) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
  Json(HealthResponse {
    status: "ok".to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
    sessions: state.registry.len(),
  })
}

pub(super) async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSnapshot>> {
  Json(state.registry.snapshot())
}

pub(super) async fn provision_credentials(
  State(state): State<AppState>,
  Path(id): Path<String>,
  Json(request): Json<ProvisionRequest>,
) -> (StatusCode, Json<ProvisionResponse>) {
  let id = SessionId::from(id);
  match state.adapter.provision_credentials(&id, request.values) {
    Ok(Some(count)) => (
      StatusCode::OK,
      Json(ProvisionResponse {
        success: true,
        count: Some(count),
        error: None,
      }),
    ),
    Ok(None) => (
      StatusCode::NOT_FOUND,
      Json(ProvisionResponse::failed("Terminal session not found")),
    ),
    Err(e) => (
      StatusCode::BAD_REQUEST,
      Json(ProvisionResponse::failed(e.to_string())),
    ),
  }
}

pub(super) async fn credential_status(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Json<CredentialStatus> {
  let credentials = state.credentials.get(&SessionId::from(id)).unwrap_or_default();
  Json(CredentialStatus {
    synced: !credentials.is_empty(),
    count: credentials.len(),
    keys: credentials.keys().map(str::to_owned).collect(),
  })
}
