// src/transport/ws.rs

use crate::pty::SessionEvent;
use crate::session_id::SessionId;
use crate::transport::adapter::TransportAdapter;
use crate::transport::protocol::{ClientMessage, ServerMessage};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use log::{debug, error, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task;
use uuid::Uuid;

/// `GET /ws`: upgrades to a terminal socket backed by a fresh shell.
pub async fn terminal_socket(
  ws: WebSocketUpgrade,
  State(adapter): State<TransportAdapter>,
) -> impl IntoResponse {
  ws.on_upgrade(move |socket| handle_terminal(socket, adapter))
}

/// Runs one terminal connection until either side goes away.
///
/// Output events come from this connection's own channel, so a socket only
/// ever sees the shell it spawned.
pub async fn handle_terminal(socket: WebSocket, adapter: TransportAdapter) {
  let session_id = SessionId::from(Uuid::new_v4().to_string());
  let (mut ws_tx, mut ws_rx) = socket.split();
  let (event_tx, mut event_rx) = mpsc::unbounded_channel::<SessionEvent>();

  // openpty, fork and exec block; keep them off the async workers.
  let connect = {
    let adapter = adapter.clone();
    let session_id = session_id.clone();
    task::spawn_blocking(move || adapter.connect(session_id, Arc::new(event_tx)))
  };
  let failure = match connect.await {
    Ok(Ok(())) => None,
    Ok(Err(e)) => Some(e.to_string()),
    Err(e) => {
      error!("Session {} spawn task failed: {}", session_id, e);
      // A panic mid-spawn may have registered the session anyway.
      adapter.disconnect(&session_id);
      Some("failed to start terminal session".to_string())
    }
  };
  if let Some(message) = failure {
    let _ = send_frame(&mut ws_tx, &ServerMessage::Error { message }).await;
    let _ = ws_tx.send(Message::Close(None)).await;
    return;
  }

  let connected = ServerMessage::Connected {
    session_id: session_id.clone(),
  };
  if send_frame(&mut ws_tx, &connected).await.is_err() {
    adapter.disconnect(&session_id);
    return;
  }

  loop {
    tokio::select! {
      msg = ws_rx.next() => {
        match msg {
          Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
            Ok(message) => {
              if let Some(reply) = adapter.handle_message(&session_id, message) {
                if send_frame(&mut ws_tx, &reply).await.is_err() {
                  break;
                }
              }
            }
            Err(e) => warn!("Session {} sent an invalid frame: {}", session_id, e),
          },
          Some(Ok(Message::Binary(data))) => adapter.input(&session_id, &data),
          Some(Ok(Message::Close(_))) | None => break,
          Some(Ok(_)) => {}
          Some(Err(e)) => {
            warn!("Session {} socket error: {}", session_id, e);
            break;
          }
        }
      }
      event = event_rx.recv() => {
        let Some(event) = event else { break };
        let exited = matches!(event, SessionEvent::Exited { .. });
        if send_frame(&mut ws_tx, &ServerMessage::from(event)).await.is_err() {
          break;
        }
        if exited {
          let _ = ws_tx.send(Message::Close(None)).await;
          break;
        }
      }
    }
  }

  debug!("Terminal socket for session {} finished", session_id);
  adapter.disconnect(&session_id);
}

async fn send_frame(
  ws_tx: &mut SplitSink<WebSocket, Message>,
  frame: &ServerMessage,
) -> Result<(), axum::Error> {
  let json = serde_json::to_string(frame).map_err(axum::Error::new)?;
  ws_tx.send(Message::Text(json)).await
}
