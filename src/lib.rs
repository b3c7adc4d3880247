//! Kanban board service with fractional order keys.
//!
//! Key generation lives in the `board-common` crate; this crate adds the
//! SQLite store, the move coordinator and the HTTP/WebSocket surface.

pub mod board;
pub mod config;
pub mod errors;
pub mod logging;
