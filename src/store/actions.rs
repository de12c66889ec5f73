use serde::{Deserialize, Serialize};

use crate::models::document::Document;
use crate::models::ocr::{OcrError, OcrResult, ProcessingSettings};
use crate::models::workflow::{Workflow, WorkflowConnection, WorkflowElement};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Every state transition of the console. Applied only through `reduce`.
#[derive(Debug, Clone)]
pub enum Action {
    // OCR queue
    Enqueue {
        document: Document,
        settings: ProcessingSettings,
        priority: Priority,
    },
    /// Move the head of the queue into the active set, if there is capacity.
    Dequeue,
    /// Drop a document from the queue, pending or active.
    RemoveFromQueue {
        document_id: String,
    },

    // OCR jobs
    JobStarted {
        job_id: String,
        document_id: String,
        settings: ProcessingSettings,
        max_retries: u32,
        retry_count: u32,
        estimated_time_secs: Option<u64>,
    },
    JobProgress {
        job_id: String,
        progress: u8,
    },
    JobCompleted {
        job_id: String,
        result: OcrResult,
    },
    JobFailed {
        job_id: String,
        error: OcrError,
    },
    JobRetrying {
        job_id: String,
    },
    JobCancelled {
        job_id: String,
    },
    ClearResult {
        document_id: String,
    },

    // Workflow canvas
    LoadWorkflow(Workflow),
    AddElement(WorkflowElement),
    UpdateElement(WorkflowElement),
    RemoveElement {
        element_id: String,
    },
    AddConnection(WorkflowConnection),
    RemoveConnection {
        connection_id: String,
    },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Enqueue { .. } => "enqueue",
            Action::Dequeue => "dequeue",
            Action::RemoveFromQueue { .. } => "remove_from_queue",
            Action::JobStarted { .. } => "job_started",
            Action::JobProgress { .. } => "job_progress",
            Action::JobCompleted { .. } => "job_completed",
            Action::JobFailed { .. } => "job_failed",
            Action::JobRetrying { .. } => "job_retrying",
            Action::JobCancelled { .. } => "job_cancelled",
            Action::ClearResult { .. } => "clear_result",
            Action::LoadWorkflow(_) => "load_workflow",
            Action::AddElement(_) => "add_element",
            Action::UpdateElement(_) => "update_element",
            Action::RemoveElement { .. } => "remove_element",
            Action::AddConnection(_) => "add_connection",
            Action::RemoveConnection { .. } => "remove_connection",
        }
    }

    pub fn touches_workflow(&self) -> bool {
        matches!(
            self,
            Action::LoadWorkflow(_)
                | Action::AddElement(_)
                | Action::UpdateElement(_)
                | Action::RemoveElement { .. }
                | Action::AddConnection(_)
                | Action::RemoveConnection { .. }
        )
    }
}
