use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::models::ocr::{
    JobStatusUpdate, OcrError, OcrErrorCode, StartJobRequest, StartJobResponse,
};
use crate::services::polling::PollingSubscription;

/// The OCR backend as the console sees it.
#[async_trait]
pub trait OcrService: Send + Sync {
    async fn start_job(&self, request: StartJobRequest) -> Result<StartJobResponse, ServiceError>;

    /// Begin polling `job_id`, sending every status tick to `updates`. The
    /// returned subscription stops the poll when cancelled.
    fn create_status_polling(
        &self,
        job_id: &str,
        updates: mpsc::Sender<JobStatusUpdate>,
    ) -> PollingSubscription;

    async fn cancel_job(&self, job_id: &str) -> Result<(), ServiceError>;
}

/// Client for the console backend's OCR endpoints (`/api/v1/ocr`).
#[derive(Clone)]
pub struct HttpOcrClient {
    http: Client,
    base_url: String,
    api_token: String,
    poll_interval: Duration,
    max_poll_errors: u32,
}

impl HttpOcrClient {
    pub fn new(
        base_url: &str,
        api_token: &str,
        timeout: Duration,
        poll_interval: Duration,
        max_poll_errors: u32,
    ) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ServiceError::Http)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            poll_interval,
            max_poll_errors: max_poll_errors.max(1),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(
            &config.api_base_url,
            &config.api_token,
            config.request_timeout(),
            config.poll_interval(),
            config.max_poll_errors,
        )
    }

    fn jobs_url(&self) -> String {
        format!("{}/api/v1/ocr/jobs", self.base_url)
    }

    fn job_url(&self, job_id: &str) -> String {
        format!("{}/{}", self.jobs_url(), job_id)
    }

    /// Fetch the current status of a job once.
    pub async fn fetch_status(&self, job_id: &str) -> Result<JobStatusUpdate, ServiceError> {
        let response = self
            .http
            .get(self.job_url(job_id))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(ServiceError::Http)?;

        let response = check_status(response).await?;
        response.json().await.map_err(ServiceError::Http)
    }

    async fn poll_loop(self, job_id: String, updates: mpsc::Sender<JobStatusUpdate>) {
        let mut ticker = poll_ticker(self.poll_interval);
        let mut consecutive_errors = 0u32;

        loop {
            ticker.tick().await;

            match self.fetch_status(&job_id).await {
                Ok(update) => {
                    consecutive_errors = 0;
                    let terminal = update.status.is_terminal();
                    debug!(job_id = %job_id, status = %update.status, progress = update.progress, "OCR status tick");
                    if updates.send(update).await.is_err() || terminal {
                        break;
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(job_id = %job_id, error = %e, attempt = consecutive_errors, "OCR status poll failed");
                    if consecutive_errors >= self.max_poll_errors {
                        let error = OcrError::new(
                            OcrErrorCode::PollingFailed,
                            format!("Status polling failed {} times: {}", consecutive_errors, e),
                            true,
                        );
                        let _ = updates.send(JobStatusUpdate::failed(job_id.clone(), error)).await;
                        break;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl OcrService for HttpOcrClient {
    async fn start_job(&self, request: StartJobRequest) -> Result<StartJobResponse, ServiceError> {
        let response = self
            .http
            .post(self.jobs_url())
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await
            .map_err(ServiceError::Http)?;

        let response = check_status(response).await?;
        response.json().await.map_err(ServiceError::Http)
    }

    fn create_status_polling(
        &self,
        job_id: &str,
        updates: mpsc::Sender<JobStatusUpdate>,
    ) -> PollingSubscription {
        let handle = tokio::spawn(self.clone().poll_loop(job_id.to_string(), updates));
        PollingSubscription::from_task(handle)
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), ServiceError> {
        let response = self
            .http
            .delete(self.job_url(job_id))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(ServiceError::Http)?;

        // a job that is already gone counts as cancelled
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }
}

/// A slow fetch delays the next poll instead of triggering catch-up ticks.
fn poll_ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Status {
        status: status.as_u16(),
        body,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },
}
