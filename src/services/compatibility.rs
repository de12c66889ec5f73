//! Decides whether a document is worth sending to the OCR backend.

use crate::models::document::{CompatibilityReport, Document};

/// Largest file the OCR backend accepts (50 MiB).
pub const MAX_OCR_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Page count above which splitting the document is recommended.
const LARGE_DOCUMENT_PAGES: u32 = 200;

const SUPPORTED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/tiff",
    "image/bmp",
    "image/gif",
    "image/webp",
];

const SUPPORTED_EXTENSIONS: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("bmp", "image/bmp"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

/// Effective MIME type: the declared one without parameters, or a guess from
/// the file extension when the declaration is missing or generic.
pub fn effective_mime_type(document: &Document) -> Option<String> {
    let declared = document
        .mime_type
        .as_deref()
        .map(|m| m.split(';').next().unwrap_or_default().trim().to_ascii_lowercase());

    match declared.as_deref() {
        Some("image/jpg") | Some("image/pjpeg") => Some("image/jpeg".to_string()),
        Some(mime) if !mime.is_empty() && mime != "application/octet-stream" => {
            Some(mime.to_string())
        }
        _ => {
            let ext = document.file_name.rsplit_once('.')?.1.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS
                .iter()
                .find(|(e, _)| *e == ext)
                .map(|(_, mime)| mime.to_string())
        }
    }
}

pub fn is_document_ocr_compatible(document: &Document) -> CompatibilityReport {
    let Some(mime) = effective_mime_type(document) else {
        let mut report = CompatibilityReport::incompatible(format!(
            "Cannot determine the file type of {}",
            document.file_name
        ));
        report
            .recommendations
            .push("Upload the document as PDF or a common image format".to_string());
        return report;
    };

    if !SUPPORTED_MIME_TYPES.contains(&mime.as_str()) {
        let mut report =
            CompatibilityReport::incompatible(format!("File type {} is not supported by OCR", mime));
        report
            .recommendations
            .push("Convert the document to PDF, PNG, JPEG or TIFF".to_string());
        return report;
    }

    if document.size_bytes == 0 {
        return CompatibilityReport::incompatible("Document is empty");
    }

    if document.size_bytes > MAX_OCR_FILE_SIZE {
        let mut report = CompatibilityReport::incompatible(format!(
            "Document is {:.1} MiB, the OCR limit is {} MiB",
            document.size_bytes as f64 / (1024.0 * 1024.0),
            MAX_OCR_FILE_SIZE / (1024 * 1024)
        ));
        report
            .recommendations
            .push("Compress the document or split it into smaller files".to_string());
        return report;
    }

    let mut report = CompatibilityReport::compatible();
    if document.page_count.is_some_and(|p| p > LARGE_DOCUMENT_PAGES) {
        report.recommendations.push(format!(
            "Documents over {} pages process slowly; consider splitting",
            LARGE_DOCUMENT_PAGES
        ));
    }
    report
}
