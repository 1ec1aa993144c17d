//! Inspector API server for FSM event streams.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Producer `WebSocket`** (`/ws/ingest`) through which an FSM runtime
//!   streams wire messages into a session
//! - **View `WebSocket`** (`/ws/events`) replaying the log and then
//!   forwarding each appended entry
//! - **REST endpoints** for the log, the active state of every region, and
//!   the latest snapshot of every data structure
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! Every route shares one [`Inspector`](fsm_inspect_core::Inspector)
//! behind a `tokio` `RwLock`. The ingest socket takes the write lock per
//! frame; REST reads take the read lock and so never observe a frame
//! half-applied.

pub mod error;
pub mod handlers;
pub mod ingest;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
