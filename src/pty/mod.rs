// src/pty/mod.rs
pub mod decoder;
pub mod output;
pub(crate) mod pump;
pub mod registry;
pub mod session;

pub use output::{OutputSink, SessionEvent};
pub use registry::{SessionRegistry, SessionSnapshot};
pub use session::PtySession;
