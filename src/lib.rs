// src/lib.rs

//! Serves one interactive login shell per client connection.
//!
//! Each connection gets a pseudo-terminal, a shell in its own process group
//! and an output pump thread. The [`pty::SessionRegistry`] owns the live
//! sessions; [`transport`] turns WebSocket frames into registry calls and
//! pump output back into frames for the same socket.
pub mod config;
pub mod credentials;
pub mod error;
pub mod path;
pub mod platform;
pub mod pty;
pub mod server;
pub mod session_id;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod test;

pub use config::PtyConfig;
pub use credentials::{CredentialStore, SessionCredentials};
pub use error::{PtyError, PtyResult};
pub use pty::{OutputSink, PtySession, SessionEvent, SessionRegistry};
pub use session_id::SessionId;
pub use transport::TransportAdapter;
