//! Kanban board with fractional ordering.
//!
//! ## Overview
//!
//! Issues live in per-project columns. Their display order is the
//! lexicographic order of an `order_key` string, so moving an issue rewrites
//! exactly one row: the moved issue gets a fresh key between its new
//! neighbours and no sibling is renumbered.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │          │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! └──────────┘ WebSocket│         │                                        │
//!                       │         │ MoveCoordinator::move_item()            │
//!                       │         v                                        │
//!                       │  mover.rs  (validate → neighbours → generate)    │
//!                       │         │                                        │
//!                       │         │ ItemOrderStore trait                   │
//!                       │         v                                        │
//!                       │  db.rs  (BoardDb, UNIQUE(project, column, key))  │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module   | Responsibility                                            |
//! |----------|-----------------------------------------------------------|
//! | `models` | Shared types: `Issue`, `IssueColumn`, `MoveRequest`       |
//! | `store`  | `ItemOrderStore` contract and `CommitError`               |
//! | `ws`     | `WsMessage` enum + `broadcast_message()` helper           |
//!
//! Key generation itself lives in the `board-common` crate.

pub mod api;
pub mod db;
pub mod models;
pub mod mover;
pub mod server;
pub mod store;
pub mod ws;
