use chrono::Utc;
use tracing::{debug, warn};

use crate::models::ocr::{new_local_id, OcrError, OcrErrorCode, OcrJob, OcrJobStatus};
use crate::store::actions::Action;
use crate::store::state::{ConsoleState, QueueEntry};
use crate::validation::ValidationEngine;

/// Apply one action to the state. Workflow changes re-run the full
/// validation battery.
pub fn reduce(state: &mut ConsoleState, action: Action, engine: &ValidationEngine) {
    let revalidate = action.touches_workflow();

    match action {
        Action::Enqueue {
            document,
            settings,
            priority,
        } => {
            if state.ocr_queue.contains(&document.id) {
                debug!(document_id = %document.id, "Document already queued, ignoring");
                return;
            }
            let entry = QueueEntry {
                id: new_local_id(),
                document,
                settings,
                priority,
                enqueued_at: Utc::now(),
            };
            let pending = &mut state.ocr_queue.pending;
            let at = pending
                .iter()
                .position(|e| e.priority < entry.priority)
                .unwrap_or(pending.len());
            pending.insert(at, entry);
        }
        Action::Dequeue => {
            if !state.ocr_queue.has_capacity() {
                return;
            }
            if let Some(entry) = state.ocr_queue.pending.pop_front() {
                state.ocr_queue.active.push(entry);
            }
        }
        Action::RemoveFromQueue { document_id } => {
            state.ocr_queue.pending.retain(|e| e.document.id != document_id);
            release(state, &document_id);
        }

        Action::JobStarted {
            job_id,
            document_id,
            settings,
            max_retries,
            retry_count,
            estimated_time_secs,
        } => {
            // a retried job is replaced by the job that retries it
            state.ocr_jobs.retain(|_, j| {
                !(j.document_id == document_id && j.status == OcrJobStatus::Retrying)
            });
            let mut job = OcrJob::new(job_id.clone(), document_id, settings, max_retries);
            job.retry_count = retry_count;
            job.estimated_time_secs = estimated_time_secs;
            state.ocr_jobs.insert(job_id, job);
        }
        Action::JobProgress { job_id, progress } => {
            if let Some(job) = live_job(state, &job_id) {
                job.status = OcrJobStatus::Processing;
                job.progress = progress.min(100);
                job.updated_at = Utc::now();
            }
        }
        Action::JobCompleted { job_id, result } => {
            let Some(job) = live_job(state, &job_id) else {
                return;
            };
            job.status = OcrJobStatus::Completed;
            job.progress = 100;
            job.error = None;
            job.updated_at = Utc::now();
            let document_id = job.document_id.clone();
            state.ocr_results.insert(document_id.clone(), result);
            release(state, &document_id);
        }
        Action::JobFailed { job_id, error } => {
            fail_job(state, &job_id, error);
        }
        Action::JobRetrying { job_id } => {
            // failed or superseded while running; completed jobs stay put
            if let Some(job) = state.ocr_jobs.get_mut(&job_id) {
                if !matches!(job.status, OcrJobStatus::Completed | OcrJobStatus::Retrying) {
                    job.status = OcrJobStatus::Retrying;
                    job.retry_count += 1;
                    job.updated_at = Utc::now();
                }
            }
        }
        Action::JobCancelled { job_id } => {
            let error = OcrError::new(OcrErrorCode::JobCancelled, "Job cancelled by user", false);
            fail_job(state, &job_id, error);
        }
        Action::ClearResult { document_id } => {
            state.ocr_results.remove(&document_id);
        }

        Action::LoadWorkflow(workflow) => {
            state.workflow.current = workflow;
        }
        Action::AddElement(element) => {
            state.workflow.current.add_element(element);
        }
        Action::UpdateElement(element) => {
            let id = element.id.clone();
            if !state.workflow.current.update_element(element) {
                warn!(element_id = %id, "Update for unknown workflow element");
            }
        }
        Action::RemoveElement { element_id } => {
            state.workflow.current.remove_element(&element_id);
        }
        Action::AddConnection(connection) => {
            state.workflow.current.add_connection(connection);
        }
        Action::RemoveConnection { connection_id } => {
            state.workflow.current.remove_connection(&connection_id);
        }
    }

    if revalidate {
        let findings = engine.validate(&state.workflow.current);
        state.workflow.is_valid = !findings.iter().any(|f| f.is_error());
        state.workflow.validation = findings;
    }
}

/// A job that still accepts updates.
fn live_job<'a>(state: &'a mut ConsoleState, job_id: &str) -> Option<&'a mut OcrJob> {
    match state.ocr_jobs.get_mut(job_id) {
        Some(job) if !job.status.is_terminal() => Some(job),
        Some(_) => {
            debug!(job_id = %job_id, "Ignoring update for finished job");
            None
        }
        None => {
            warn!(job_id = %job_id, "Update for unknown job");
            None
        }
    }
}

fn fail_job(state: &mut ConsoleState, job_id: &str, error: OcrError) {
    let Some(job) = live_job(state, job_id) else {
        return;
    };
    job.status = OcrJobStatus::Failed;
    job.error = Some(error);
    job.updated_at = Utc::now();
    let document_id = job.document_id.clone();
    release(state, &document_id);
}

fn release(state: &mut ConsoleState, document_id: &str) {
    state.ocr_queue.active.retain(|e| e.document.id != document_id);
}
