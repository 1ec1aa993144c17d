//! Shared application state for the inspector API server.
//!
//! [`AppState`] wraps the shared [`Inspector`](fsm_inspect_core::Inspector)
//! that the ingest socket writes to and every other route reads from,
//! plus the opaque FSM description document views fetch once.

use std::sync::Arc;

use fsm_inspect_core::config::IngestConfig;
use fsm_inspect_core::session::{self, SharedInspector};
use serde_json::Value;
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug)]
pub struct AppState {
    /// The inspector holding the log and derived indices.
    pub inspector: SharedInspector,
    /// Static FSM description uploaded by the producer, stored as-is.
    pub fsm_info: RwLock<Option<Value>>,
    /// Producer ingestion limits.
    pub ingest: IngestConfig,
    /// Single slot held by the connected producer.
    producer_slot: Arc<Semaphore>,
}

impl AppState {
    /// Create application state with an empty inspector and default limits.
    pub fn new() -> Self {
        Self::with_ingest(IngestConfig::default())
    }

    /// Create application state with the given ingestion limits.
    pub fn with_ingest(ingest: IngestConfig) -> Self {
        Self::with_inspector(session::shared(), ingest)
    }

    /// Create application state around an existing inspector.
    pub fn with_inspector(inspector: SharedInspector, ingest: IngestConfig) -> Self {
        Self {
            inspector,
            fsm_info: RwLock::new(None),
            ingest,
            producer_slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// Claim the producer slot.
    ///
    /// Returns `None` while another producer holds it. The slot is
    /// released when the permit is dropped.
    pub fn claim_producer(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.producer_slot).try_acquire_owned().ok()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
