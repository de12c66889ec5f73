use serde::{Deserialize, Serialize};

/// A document known to the console, as handed to the OCR pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub file_name: String,
    /// Location the OCR backend downloads the document from.
    pub url: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub size_bytes: u64,
    #[serde(default)]
    pub page_count: Option<u32>,
}

/// Outcome of the OCR compatibility heuristic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompatibilityReport {
    pub is_compatible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

impl CompatibilityReport {
    pub fn compatible() -> Self {
        Self {
            is_compatible: true,
            reason: None,
            recommendations: Vec::new(),
        }
    }

    pub fn incompatible(reason: impl Into<String>) -> Self {
        Self {
            is_compatible: false,
            reason: Some(reason.into()),
            recommendations: Vec::new(),
        }
    }
}
