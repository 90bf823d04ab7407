// src/transport/mod.rs

//! Bridges the WebSocket channel to the session registry.
pub mod adapter;
pub mod protocol;
pub mod ws;

pub use adapter::TransportAdapter;
pub use protocol::{ClientMessage, ServerMessage};
