use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::ocr::OcrService;
use crate::services::processor::{OcrEventHandler, OcrProcessor};
use crate::store::ConsoleStore;

/// Shared handles passed to everything that drives the console.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub ocr: Arc<dyn OcrService>,
    pub store: ConsoleStore,
}

impl AppState {
    pub fn new(config: AppConfig, ocr: Arc<dyn OcrService>) -> Self {
        let store = ConsoleStore::new(config.max_concurrent_jobs);
        Self {
            config: Arc::new(config),
            ocr,
            store,
        }
    }

    /// A processor bound to this state's service and store.
    pub fn processor(&self, events: Arc<dyn OcrEventHandler>) -> OcrProcessor {
        OcrProcessor::new(
            self.ocr.clone(),
            self.store.clone(),
            events,
            self.config.max_retries,
        )
    }
}
