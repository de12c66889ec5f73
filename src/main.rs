use std::net::SocketAddr;
use std::sync::Arc;

use docconsole::{
    app_state::AppState,
    config::AppConfig,
    models::{
        batch::BatchManifest,
        ocr::{OcrError, OcrJobStatus, OcrResult, SettingsOverrides},
    },
    services::{
        ocr::HttpOcrClient,
        processor::{OcrEventHandler, ProcessOutcome},
    },
    store::{Action, QueueEntry},
};
use garde::Validate;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

/// Logs the progress of one document's OCR job.
struct LogEvents {
    document_id: String,
}

impl OcrEventHandler for LogEvents {
    fn on_progress(&self, progress: u8) {
        tracing::debug!(document_id = %self.document_id, progress, "OCR progress");
    }

    fn on_complete(&self, result: &OcrResult) {
        tracing::info!(
            document_id = %self.document_id,
            confidence = result.confidence,
            chars = result.text.len(),
            "OCR result available"
        );
    }

    fn on_error(&self, error: &OcrError) {
        tracing::warn!(
            document_id = %self.document_id,
            code = %error.code,
            recoverable = error.recoverable,
            message = %error.message,
            "OCR error"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("Starting docconsole OCR worker");

    if let Some(addr) = &config.metrics_addr {
        let addr: SocketAddr = addr.parse()?;
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        tracing::info!("Prometheus exporter listening on {}", addr);
    }

    metrics::describe_counter!("ocr_jobs_started_total", "OCR jobs accepted by the backend");
    metrics::describe_counter!("ocr_jobs_completed_total", "OCR jobs that produced a result");
    metrics::describe_counter!("ocr_jobs_failed_total", "OCR jobs that failed, by error code");
    metrics::describe_histogram!(
        "ocr_job_duration_seconds",
        "Time from job start to OCR result"
    );
    metrics::describe_counter!(
        "workflow_validation_runs_total",
        "Full workflow validation passes"
    );

    let Some(batch_file) = config.batch_file.clone() else {
        tracing::warn!("BATCH_FILE is not set, nothing to process");
        return Ok(());
    };

    let manifest = BatchManifest::from_json(&tokio::fs::read_to_string(&batch_file).await?)?;
    manifest.validate()?;
    tracing::info!(file = %batch_file, documents = manifest.documents.len(), "Loaded batch manifest");

    let ocr = HttpOcrClient::from_config(&config)?;
    let state = AppState::new(config, Arc::new(ocr));

    for entry in manifest.documents {
        state
            .store
            .dispatch(Action::Enqueue {
                document: entry.document,
                settings: entry.settings.unwrap_or_default(),
                priority: entry.priority,
            })
            .await;
    }

    let mut tasks = JoinSet::new();
    let mut completed = 0usize;
    let mut failed = 0usize;

    loop {
        while let Some(entry) = state.store.take_next().await {
            tasks.spawn(process_entry(state.clone(), entry));
        }

        match tasks.join_next().await {
            Some(Ok(true)) => completed += 1,
            Some(Ok(false)) => failed += 1,
            Some(Err(e)) => {
                tracing::error!(error = %e, "OCR task crashed");
                failed += 1;
            }
            None => {
                if !state.store.queue_drained().await {
                    tracing::warn!("Queue has entries but no free OCR slot, stopping");
                }
                break;
            }
        }
    }

    tracing::info!(completed, failed, "Batch finished");
    Ok(())
}

/// Run one queued document to a terminal state.
/// Returns true when an OCR result is available for the document.
async fn process_entry(state: AppState, entry: QueueEntry) -> bool {
    let document_id = entry.document.id.clone();
    let events = Arc::new(LogEvents {
        document_id: document_id.clone(),
    });
    let mut processor = state.processor(events);

    let mut outcome = processor.process(&entry.document, entry.settings).await;
    let succeeded = loop {
        match outcome {
            Ok(ProcessOutcome::Cached(_)) => break true,
            Ok(ProcessOutcome::Started { .. }) => {
                let job = processor.wait().await;
                match job {
                    Some(job) if job.status == OcrJobStatus::Completed => break true,
                    Some(job) => {
                        let recoverable = job.error.as_ref().is_some_and(|e| e.recoverable);
                        if !(state.config.auto_retry && recoverable && job.can_retry()) {
                            break false;
                        }
                    }
                    None => break false,
                }
            }
            Err(e) => {
                if !(state.config.auto_retry && e.is_recoverable()) {
                    break false;
                }
            }
        }
        outcome = processor.retry(&SettingsOverrides::default()).await;
    };

    processor.unmount();
    state
        .store
        .dispatch(Action::RemoveFromQueue { document_id })
        .await;
    succeeded
}
