//! OCR job orchestration for a single document.
//!
//! The processor checks compatibility, short-circuits on a cached result,
//! starts the backend job and relays status ticks to an [`OcrEventHandler`]
//! while keeping the console store in step. It owns at most one polling
//! subscription; the previous one is torn down before a new one is created,
//! and the last one is torn down when the processor is unmounted or dropped.

use std::sync::Arc;
use std::time::Instant;

use garde::Validate;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::models::document::Document;
use crate::models::ocr::{
    JobStatusUpdate, OcrError, OcrErrorCode, OcrJob, OcrJobStatus, OcrResult, ProcessingSettings,
    SettingsOverrides, StartJobRequest,
};
use crate::services::compatibility::is_document_ocr_compatible;
use crate::services::ocr::{OcrService, ServiceError};
use crate::services::polling::PollingSubscription;
use crate::store::{Action, ConsoleStore};

/// Status ticks buffered between the poller and the processor.
const UPDATE_BUFFER: usize = 32;

/// Callbacks fired as an OCR job advances.
pub trait OcrEventHandler: Send + Sync {
    fn on_progress(&self, _progress: u8) {}

    fn on_complete(&self, result: &OcrResult);

    fn on_error(&self, error: &OcrError);
}

/// What `process` or `retry` did.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// A result already existed; no job was started.
    Cached(OcrResult),
    Started { job_id: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("Invalid processing settings: {0}")]
    InvalidSettings(#[from] garde::Report),

    #[error("{0}")]
    Ocr(OcrError),

    #[error("No OCR job to {0}")]
    NoActiveJob(&'static str),

    #[error("Failed to cancel OCR job: {0}")]
    Cancel(#[from] ServiceError),
}

impl ProcessorError {
    /// Whether an explicit retry can be expected to help.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ProcessorError::Ocr(e) => e.recoverable,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveJob {
    document: Document,
    settings: ProcessingSettings,
    retry_count: u32,
    job_id: Option<String>,
}

pub struct OcrProcessor {
    service: Arc<dyn OcrService>,
    store: ConsoleStore,
    events: Arc<dyn OcrEventHandler>,
    max_retries: u32,
    current: Option<ActiveJob>,
    subscription: Option<PollingSubscription>,
    pump: Option<JoinHandle<()>>,
}

impl OcrProcessor {
    pub fn new(
        service: Arc<dyn OcrService>,
        store: ConsoleStore,
        events: Arc<dyn OcrEventHandler>,
        max_retries: u32,
    ) -> Self {
        Self {
            service,
            store,
            events,
            max_retries,
            current: None,
            subscription: None,
            pump: None,
        }
    }

    /// Id of the backend job currently owned by this processor.
    pub fn job_id(&self) -> Option<&str> {
        self.current.as_ref()?.job_id.as_deref()
    }

    pub fn retry_count(&self) -> u32 {
        self.current.as_ref().map_or(0, |a| a.retry_count)
    }

    pub async fn process(
        &mut self,
        document: &Document,
        settings: ProcessingSettings,
    ) -> Result<ProcessOutcome, ProcessorError> {
        settings.validate()?;

        let report = is_document_ocr_compatible(document);
        if !report.is_compatible {
            let reason = report
                .reason
                .unwrap_or_else(|| "Document is not compatible with OCR".to_string());
            warn!(document_id = %document.id, reason = %reason, "Document rejected for OCR");
            let error = OcrError::new(OcrErrorCode::IncompatibleDocument, reason, false)
                .with_details(serde_json::json!({ "recommendations": report.recommendations }));
            return Err(self.fail(error));
        }

        if let Some(cached) = self.store.cached_result(&document.id).await {
            info!(document_id = %document.id, job_id = %cached.job_id, "Using cached OCR result");
            self.events.on_complete(&cached);
            return Ok(ProcessOutcome::Cached(cached));
        }

        self.current = Some(ActiveJob {
            document: document.clone(),
            settings,
            retry_count: 0,
            job_id: None,
        });
        self.launch().await
    }

    /// Start the current document again with `overrides` merged into its
    /// settings. Only ever triggered explicitly.
    pub async fn retry(
        &mut self,
        overrides: &SettingsOverrides,
    ) -> Result<ProcessOutcome, ProcessorError> {
        let Some(active) = self.current.clone() else {
            return Err(ProcessorError::NoActiveJob("retry"));
        };

        if active.retry_count >= self.max_retries {
            let error = OcrError::new(
                OcrErrorCode::MaxRetriesExceeded,
                format!("Giving up after {} retries", active.retry_count),
                false,
            );
            return Err(self.fail(error));
        }

        let settings = active.settings.merged(overrides);
        settings.validate()?;

        if let Some(job_id) = &active.job_id {
            let still_running = self
                .store
                .job(job_id)
                .await
                .is_some_and(|job| !job.status.is_terminal());
            if still_running {
                self.teardown();
                if let Err(e) = self.service.cancel_job(job_id).await {
                    warn!(job_id = %job_id, error = %e, "Could not cancel superseded OCR job");
                }
            }
            self.store
                .dispatch(Action::JobRetrying {
                    job_id: job_id.clone(),
                })
                .await;
        }

        info!(
            document_id = %active.document.id,
            retry = active.retry_count + 1,
            max_retries = self.max_retries,
            "Retrying OCR job"
        );

        self.current = Some(ActiveJob {
            settings,
            retry_count: active.retry_count + 1,
            ..active
        });
        self.launch().await
    }

    /// Wait until the current job reaches a terminal update (or its poll
    /// ends), then release the subscription. Returns the job as stored.
    pub async fn wait(&mut self) -> Option<OcrJob> {
        if let Some(pump) = self.pump.take() {
            if let Err(e) = pump.await {
                if !e.is_cancelled() {
                    error!(error = %e, "OCR update pump crashed");
                }
            }
        }
        self.teardown();

        let job_id = self.job_id()?.to_string();
        self.store.job(&job_id).await
    }

    /// Stop polling and ask the backend to cancel the current job.
    pub async fn cancel(&mut self) -> Result<(), ProcessorError> {
        let job_id = self
            .job_id()
            .map(str::to_string)
            .ok_or(ProcessorError::NoActiveJob("cancel"))?;

        self.teardown();
        let outcome = self.service.cancel_job(&job_id).await;
        self.store
            .dispatch(Action::JobCancelled {
                job_id: job_id.clone(),
            })
            .await;

        match outcome {
            Ok(()) => {
                info!(job_id = %job_id, "OCR job cancelled");
                Ok(())
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Backend did not confirm cancellation");
                Err(e.into())
            }
        }
    }

    /// Release the polling subscription and stop relaying updates.
    pub fn unmount(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }

    fn fail(&self, error: OcrError) -> ProcessorError {
        metrics::counter!("ocr_jobs_failed_total", "code" => error.code.to_string()).increment(1);
        self.events.on_error(&error);
        ProcessorError::Ocr(error)
    }

    async fn launch(&mut self) -> Result<ProcessOutcome, ProcessorError> {
        let Some(active) = self.current.clone() else {
            return Err(ProcessorError::NoActiveJob("start"));
        };

        self.teardown();

        let request = StartJobRequest {
            document_id: active.document.id.clone(),
            document_url: active.document.url.clone(),
            settings: active.settings.clone(),
        };

        let response = match self.service.start_job(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(document_id = %active.document.id, error = %e, "Failed to start OCR job");
                let error = OcrError::new(
                    OcrErrorCode::StartJobFailed,
                    format!("Failed to start OCR job: {}", e),
                    true,
                );
                if let Some(job_id) = &active.job_id {
                    self.store
                        .dispatch(Action::JobFailed {
                            job_id: job_id.clone(),
                            error: error.clone(),
                        })
                        .await;
                }
                return Err(self.fail(error));
            }
        };

        let job_id = response.job_id;
        metrics::counter!("ocr_jobs_started_total").increment(1);
        info!(
            job_id = %job_id,
            document_id = %active.document.id,
            estimated_secs = ?response.estimated_time,
            "OCR job started"
        );

        self.store
            .dispatch(Action::JobStarted {
                job_id: job_id.clone(),
                document_id: active.document.id.clone(),
                settings: active.settings.clone(),
                max_retries: self.max_retries,
                retry_count: active.retry_count,
                estimated_time_secs: response.estimated_time,
            })
            .await;

        if let Some(current) = self.current.as_mut() {
            current.job_id = Some(job_id.clone());
        }

        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        self.subscription = Some(self.service.create_status_polling(&job_id, tx));
        self.pump = Some(tokio::spawn(relay_updates(
            rx,
            self.store.clone(),
            self.events.clone(),
            job_id.clone(),
        )));

        Ok(ProcessOutcome::Started { job_id })
    }
}

impl Drop for OcrProcessor {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Apply status ticks to the store and the event handler until a terminal
/// update arrives or the poll ends.
async fn relay_updates(
    mut updates: mpsc::Receiver<JobStatusUpdate>,
    store: ConsoleStore,
    events: Arc<dyn OcrEventHandler>,
    job_id: String,
) {
    let started = Instant::now();

    while let Some(update) = updates.recv().await {
        match (update.status, update.result, update.error) {
            (OcrJobStatus::Completed, Some(result), _) => {
                metrics::counter!("ocr_jobs_completed_total").increment(1);
                metrics::histogram!("ocr_job_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                info!(
                    job_id = %job_id,
                    confidence = result.confidence,
                    words = result.quality.word_count,
                    "OCR job completed"
                );
                store
                    .dispatch(Action::JobCompleted {
                        job_id: job_id.clone(),
                        result: result.clone(),
                    })
                    .await;
                events.on_complete(&result);
                return;
            }
            (OcrJobStatus::Failed, _, Some(error)) => {
                metrics::counter!("ocr_jobs_failed_total", "code" => error.code.to_string())
                    .increment(1);
                warn!(
                    job_id = %job_id,
                    code = %error.code,
                    recoverable = error.recoverable,
                    "OCR job failed"
                );
                store
                    .dispatch(Action::JobFailed {
                        job_id: job_id.clone(),
                        error: error.clone(),
                    })
                    .await;
                events.on_error(&error);
                return;
            }
            (status, _, _) => {
                if status.is_terminal() {
                    warn!(job_id = %job_id, status = %status, "Terminal status without payload, treating as progress");
                }
                let progress = update.progress.min(100);
                store
                    .dispatch(Action::JobProgress {
                        job_id: job_id.clone(),
                        progress,
                    })
                    .await;
                events.on_progress(progress);
            }
        }
    }

    debug!(job_id = %job_id, "OCR status poll ended");
}
