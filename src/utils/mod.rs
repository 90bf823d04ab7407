// src/utils/mod.rs
pub mod logging;
