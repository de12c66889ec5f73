use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::models::document::Document;
use crate::models::ocr::ProcessingSettings;
use crate::store::Priority;

/// Documents handed to the OCR worker in one go.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchManifest {
    #[garde(dive)]
    pub documents: Vec<BatchEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchEntry {
    #[garde(skip)]
    pub document: Document,
    /// Falls back to the default settings when absent.
    #[garde(dive)]
    #[serde(default)]
    pub settings: Option<ProcessingSettings>,
    #[garde(skip)]
    #[serde(default)]
    pub priority: Priority,
}

impl BatchManifest {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
