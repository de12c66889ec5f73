//! Test doubles for the OCR backend and the processor callbacks

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docconsole::models::ocr::{
    JobStatusUpdate, OcrError, OcrJobStatus, OcrResult, ProcessingSettings, StartJobRequest,
    StartJobResponse,
};
use docconsole::services::ocr::{OcrService, ServiceError};
use docconsole::services::polling::PollingSubscription;
use docconsole::services::processor::OcrEventHandler;
use tokio::sync::mpsc;

/// What the fake backend does for one `start_job` call.
pub enum Script {
    /// Accept the job and replay these status ticks. With `hold_open` the
    /// poll stays alive after the last tick until it is cancelled.
    Updates {
        updates: Vec<JobStatusUpdate>,
        hold_open: bool,
    },
    /// Reject the job with a 503.
    FailStart,
}

impl Script {
    pub fn replay(updates: Vec<JobStatusUpdate>) -> Self {
        Script::Updates {
            updates,
            hold_open: false,
        }
    }

    pub fn hold_open(updates: Vec<JobStatusUpdate>) -> Self {
        Script::Updates {
            updates,
            hold_open: true,
        }
    }
}

/// Scripted OCR backend that counts every interaction.
#[derive(Default)]
pub struct FakeOcrService {
    scripts: Mutex<VecDeque<Script>>,
    pub start_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub cleanup_calls: Arc<AtomicUsize>,
    pub started_settings: Mutex<Vec<ProcessingSettings>>,
}

impl FakeOcrService {
    pub fn with_scripts(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            ..Default::default()
        })
    }

    pub fn starts(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn cleanups(&self) -> usize {
        self.cleanup_calls.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn settings_sent(&self) -> Vec<ProcessingSettings> {
        self.started_settings.lock().unwrap().clone()
    }
}

#[async_trait]
impl OcrService for FakeOcrService {
    async fn start_job(&self, request: StartJobRequest) -> Result<StartJobResponse, ServiceError> {
        let n = self.start_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.started_settings.lock().unwrap().push(request.settings);

        let mut scripts = self.scripts.lock().unwrap();
        if matches!(scripts.front(), Some(Script::FailStart)) {
            scripts.pop_front();
            return Err(ServiceError::Status {
                status: 503,
                body: "ocr engine unavailable".to_string(),
            });
        }

        Ok(StartJobResponse {
            job_id: format!("job-{n}"),
            estimated_time: Some(30),
            status: OcrJobStatus::Pending,
        })
    }

    fn create_status_polling(
        &self,
        job_id: &str,
        updates: mpsc::Sender<JobStatusUpdate>,
    ) -> PollingSubscription {
        let script = self.scripts.lock().unwrap().pop_front();
        let Some(Script::Updates { updates: ticks, hold_open }) = script else {
            // no script left: the job already finished, the channel just closes
            return PollingSubscription::noop();
        };

        let job_id = job_id.to_string();
        let handle = tokio::spawn(async move {
            for mut tick in ticks {
                tick.job_id = job_id.clone();
                if updates.send(tick).await.is_err() {
                    return;
                }
            }
            if hold_open {
                std::future::pending::<()>().await;
            }
        });

        let cleanups = self.cleanup_calls.clone();
        PollingSubscription::new(move || {
            cleanups.fetch_add(1, Ordering::SeqCst);
            handle.abort();
        })
    }

    async fn cancel_job(&self, _job_id: &str) -> Result<(), ServiceError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Progress(u8),
    Complete(OcrResult),
    Error(OcrError),
}

/// Records every callback in arrival order.
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<Event>>,
}

impl RecordingEvents {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn completions(&self) -> Vec<OcrResult> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Complete(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<OcrError> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(err) => Some(err),
                _ => None,
            })
            .collect()
    }
}

impl OcrEventHandler for RecordingEvents {
    fn on_progress(&self, progress: u8) {
        self.events.lock().unwrap().push(Event::Progress(progress));
    }

    fn on_complete(&self, result: &OcrResult) {
        self.events.lock().unwrap().push(Event::Complete(result.clone()));
    }

    fn on_error(&self, error: &OcrError) {
        self.events.lock().unwrap().push(Event::Error(error.clone()));
    }
}
