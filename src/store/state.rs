use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::document::Document;
use crate::models::ocr::{OcrJob, OcrResult, ProcessingSettings};
use crate::models::workflow::{ValidationError, Workflow};
use crate::store::actions::Priority;

/// A document waiting for, or holding, an OCR slot.
#[derive(Debug, Clone, Serialize)]
pub struct QueueEntry {
    pub id: String,
    pub document: Document,
    pub settings: ProcessingSettings,
    pub priority: Priority,
    pub enqueued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OcrQueueState {
    /// Highest priority first, FIFO within a priority.
    pub pending: VecDeque<QueueEntry>,
    pub active: Vec<QueueEntry>,
    pub max_concurrent: usize,
}

impl OcrQueueState {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            active: Vec::new(),
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn contains(&self, document_id: &str) -> bool {
        self.pending.iter().any(|e| e.document.id == document_id)
            || self.active.iter().any(|e| e.document.id == document_id)
    }

    pub fn has_capacity(&self) -> bool {
        self.active.len() < self.max_concurrent
    }

    pub fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.active.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowState {
    pub current: Workflow,
    pub validation: Vec<ValidationError>,
    pub is_valid: bool,
}

/// The whole console state. Only `reduce` writes to it.
#[derive(Debug, Clone, Serialize)]
pub struct ConsoleState {
    pub ocr_queue: OcrQueueState,
    pub ocr_jobs: HashMap<String, OcrJob>,
    /// Keyed by document id.
    pub ocr_results: HashMap<String, OcrResult>,
    pub workflow: WorkflowState,
}

impl ConsoleState {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            ocr_queue: OcrQueueState::new(max_concurrent),
            ocr_jobs: HashMap::new(),
            ocr_results: HashMap::new(),
            workflow: WorkflowState::default(),
        }
    }

    pub fn jobs_for_document<'a>(&'a self, document_id: &'a str) -> impl Iterator<Item = &'a OcrJob> {
        self.ocr_jobs.values().filter(move |j| j.document_id == document_id)
    }
}

impl Default for ConsoleState {
    fn default() -> Self {
        Self::new(1)
    }
}
