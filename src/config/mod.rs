use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base URL of the console backend (e.g., "https://dms.example.com").
    pub api_base_url: String,

    /// Bearer token sent with every backend request
    pub api_token: String,

    /// Interval between OCR status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Consecutive failed status fetches before polling gives up
    #[serde(default = "default_max_poll_errors")]
    pub max_poll_errors: u32,

    /// Retries allowed per OCR job
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// OCR jobs the worker runs at the same time
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Let the worker retry recoverable failures on the operator's behalf
    #[serde(default)]
    pub auto_retry: bool,

    /// JSON manifest of documents for the worker to process
    #[serde(default)]
    pub batch_file: Option<String>,

    /// Prometheus exporter address (e.g., "0.0.0.0:9000"). Disabled when unset.
    #[serde(default)]
    pub metrics_addr: Option<String>,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_poll_errors() -> u32 {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_concurrent_jobs() -> usize {
    2
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
