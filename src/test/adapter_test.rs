// src/test/adapter_test.rs

use super::{collect_until, init_logger, test_config, OUTPUT_TIMEOUT};
use crate::credentials::CredentialStore;
use crate::pty::{SessionEvent, SessionRegistry};
use crate::server::{self, AppState, CredentialStatus, HealthResponse, ProvisionResponse};
use crate::session_id::SessionId;
use crate::transport::{ClientMessage, ServerMessage, TransportAdapter};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serial_test::serial;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;

fn adapter() -> TransportAdapter {
  TransportAdapter::new(
    Arc::new(SessionRegistry::new(test_config())),
    Arc::new(CredentialStore::new()),
  )
}

fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
  pairs
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
  let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
#[serial]
async fn messages_drive_the_connected_session() {
  init_logger();
  let adapter = adapter();
  let id = SessionId::from("client-1");
  let (tx, mut rx) = mpsc::unbounded_channel::<SessionEvent>();
  adapter.connect(id.clone(), Arc::new(tx)).unwrap();

  let reply = adapter.handle_message(&id, ClientMessage::Resize { rows: 33, cols: 99 });
  assert!(reply.is_none());
  let reply = adapter.handle_message(
    &id,
    ClientMessage::Input {
      data: "stty size\n".into(),
    },
  );
  assert!(reply.is_none());

  let collected = collect_until(&mut rx, &id, "33 99", OUTPUT_TIMEOUT).await;
  assert!(collected.text.contains("33 99"), "got: {:?}", collected.text);

  adapter.disconnect(&id);
  assert!(adapter.registry().is_empty());
}

#[tokio::test]
#[serial]
async fn credentials_are_validated_and_cleared_on_disconnect() {
  init_logger();
  let adapter = adapter();
  let id = SessionId::from("client-2");
  let (tx, _rx) = mpsc::unbounded_channel::<SessionEvent>();
  adapter.connect(id.clone(), Arc::new(tx)).unwrap();

  let reply = adapter.handle_message(
    &id,
    ClientMessage::Credentials {
      values: values(&[
        ("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE"),
        ("AWS_SECRET_ACCESS_KEY", "secret"),
        ("AWS_REGION", ""),
      ]),
    },
  );
  assert_eq!(reply, Some(ServerMessage::CredentialsSynced { count: 2 }));
  assert_eq!(adapter.credentials().len(), 1);

  let reply = adapter.handle_message(
    &id,
    ClientMessage::Credentials {
      values: values(&[("HOME", "/tmp")]),
    },
  );
  assert!(matches!(reply, Some(ServerMessage::Error { ref message }) if message.contains("HOME")));
  // A rejected update leaves the previous set in place.
  let stored = adapter.credentials().get(&id).unwrap();
  assert_eq!(stored.get("AWS_ACCESS_KEY_ID"), Some("AKIAEXAMPLE"));

  adapter.disconnect(&id);
  assert!(adapter.credentials().get(&id).is_none());
  assert!(adapter.credentials().is_empty());
}

#[tokio::test]
#[serial]
async fn credentials_for_unknown_session_are_not_stored() {
  init_logger();
  let adapter = adapter();
  let id = SessionId::from("nobody");

  let result = adapter
    .provision_credentials(&id, values(&[("AWS_PROFILE", "dev")]))
    .unwrap();
  assert_eq!(result, None);
  assert!(adapter.credentials().is_empty());
}

#[tokio::test]
#[serial]
async fn disconnect_of_unknown_session_is_harmless() {
  init_logger();
  let adapter = adapter();
  let id = SessionId::from("ghost");
  adapter.disconnect(&id);
  adapter.input(&id, b"ls\n");
  adapter.resize(&id, 10, 10);
  assert!(adapter.registry().is_empty());
}

#[tokio::test]
#[serial]
async fn failed_connect_leaves_nothing_behind() {
  init_logger();
  let adapter = TransportAdapter::new(
    Arc::new(SessionRegistry::new(
      test_config().with_shell("/nonexistent/pty-relay-shell"),
    )),
    Arc::new(CredentialStore::new()),
  );
  let (tx, _rx) = mpsc::unbounded_channel::<SessionEvent>();
  assert!(adapter.connect(SessionId::from("x"), Arc::new(tx)).is_err());
  assert!(adapter.registry().is_empty());
}

#[tokio::test]
#[serial]
async fn health_reports_session_count() {
  init_logger();
  let app = server::router(AppState::new(test_config()));

  let response = app
    .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::OK);

  let health: HealthResponse = body_json(response).await;
  assert_eq!(health.status, "ok");
  assert_eq!(health.sessions, 0);
}

#[tokio::test]
#[serial]
async fn provisioning_unknown_session_returns_not_found() {
  init_logger();
  let app = server::router(AppState::new(test_config()));

  let response = app
    .oneshot(
      Request::builder()
        .method("POST")
        .uri("/api/sessions/missing/credentials")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"values":{"AWS_REGION":"eu-west-1"}}"#))
        .unwrap(),
    )
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::NOT_FOUND);

  let body: ProvisionResponse = body_json(response).await;
  assert!(!body.success);
  assert_eq!(body.error.as_deref(), Some("Terminal session not found"));
}

#[tokio::test]
#[serial]
async fn http_endpoints_see_connected_sessions() {
  init_logger();
  let state = AppState::new(test_config());
  let id = SessionId::from("web-1");
  let (tx, _rx) = mpsc::unbounded_channel::<SessionEvent>();
  state.adapter.connect(id.clone(), Arc::new(tx)).unwrap();

  let response = server::router(state.clone())
    .oneshot(Request::builder().uri("/api/sessions").body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::OK);
  let sessions: serde_json::Value = body_json(response).await;
  assert_eq!(sessions[0]["session_id"], "web-1");
  assert_eq!(sessions[0]["running"], true);

  let response = server::router(state.clone())
    .oneshot(
      Request::builder()
        .method("POST")
        .uri("/api/sessions/web-1/credentials")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"values":{"AWS_PROFILE":"dev","AWS_REGION":"eu-west-1"}}"#))
        .unwrap(),
    )
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::OK);
  let body: ProvisionResponse = body_json(response).await;
  assert_eq!(body.count, Some(2));

  let response = server::router(state.clone())
    .oneshot(
      Request::builder()
        .method("POST")
        .uri("/api/sessions/web-1/credentials")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"values":{"PATH":"/evil"}}"#))
        .unwrap(),
    )
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::BAD_REQUEST);

  let response = server::router(state.clone())
    .oneshot(
      Request::builder()
        .uri("/api/sessions/web-1/credentials")
        .body(Body::empty())
        .unwrap(),
    )
    .await
    .unwrap();
  let status: CredentialStatus = body_json(response).await;
  assert!(status.synced);
  assert_eq!(status.keys, vec!["AWS_PROFILE", "AWS_REGION"]);

  state.adapter.disconnect(&id);
  assert!(state.registry.is_empty());
  assert!(state.credentials.is_empty());
}
