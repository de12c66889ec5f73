//! Console application state.
//!
//! One `ConsoleState` per console, written only by [`reducer::reduce`]. The
//! store serialises dispatches behind a write lock so every transition is
//! applied by a single writer.

pub mod actions;
pub mod reducer;
pub mod state;

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::trace;

use crate::models::ocr::{OcrJob, OcrResult};
use crate::models::workflow::ValidationError;
use crate::validation::ValidationEngine;

pub use actions::{Action, Priority};
pub use state::{ConsoleState, QueueEntry};

/// Shared handle to the console state.
#[derive(Clone)]
pub struct ConsoleStore {
    state: Arc<RwLock<ConsoleState>>,
    engine: Arc<ValidationEngine>,
}

impl ConsoleStore {
    pub fn new(max_concurrent: usize) -> Self {
        Self::with_engine(max_concurrent, ValidationEngine::default())
    }

    pub fn with_engine(max_concurrent: usize, engine: ValidationEngine) -> Self {
        Self {
            state: Arc::new(RwLock::new(ConsoleState::new(max_concurrent))),
            engine: Arc::new(engine),
        }
    }

    pub async fn dispatch(&self, action: Action) {
        trace!(action = action.kind(), "Dispatching");
        let mut state = self.state.write().await;
        reducer::reduce(&mut state, action, &self.engine);
    }

    /// Activate the next queued document, if any and if there is capacity.
    pub async fn take_next(&self) -> Option<QueueEntry> {
        let mut state = self.state.write().await;
        let before = state.ocr_queue.active.len();
        reducer::reduce(&mut state, Action::Dequeue, &self.engine);
        if state.ocr_queue.active.len() > before {
            state.ocr_queue.active.last().cloned()
        } else {
            None
        }
    }

    pub async fn snapshot(&self) -> ConsoleState {
        self.state.read().await.clone()
    }

    pub async fn job(&self, job_id: &str) -> Option<OcrJob> {
        self.state.read().await.ocr_jobs.get(job_id).cloned()
    }

    pub async fn cached_result(&self, document_id: &str) -> Option<OcrResult> {
        self.state.read().await.ocr_results.get(document_id).cloned()
    }

    pub async fn validation(&self) -> Vec<ValidationError> {
        self.state.read().await.workflow.validation.clone()
    }

    pub async fn queue_drained(&self) -> bool {
        self.state.read().await.ocr_queue.is_drained()
    }
}
