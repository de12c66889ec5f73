//! Documents, OCR results and workflows shared by the integration tests

#![allow(dead_code)]

use chrono::Utc;
use docconsole::models::document::Document;
use docconsole::models::ocr::{
    BlockKind, BoundingBox, JobStatusUpdate, OcrError, OcrErrorCode, OcrResult, QualityMetrics,
    TextBlock,
};
use docconsole::models::workflow::{
    ElementConfig, ElementType, Workflow, WorkflowConnection, WorkflowElement,
};

pub fn invoice_document(id: &str) -> Document {
    Document {
        id: id.to_string(),
        file_name: format!("{id}.pdf"),
        url: format!("https://files.example.com/documents/{id}.pdf"),
        mime_type: Some("application/pdf".to_string()),
        size_bytes: 184_320,
        page_count: Some(2),
    }
}

pub fn spreadsheet_document(id: &str) -> Document {
    Document {
        id: id.to_string(),
        file_name: format!("{id}.xlsx"),
        url: format!("https://files.example.com/documents/{id}.xlsx"),
        mime_type: Some(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
        ),
        size_bytes: 40_960,
        page_count: None,
    }
}

pub fn ocr_result(document_id: &str, job_id: &str) -> OcrResult {
    OcrResult {
        document_id: document_id.to_string(),
        job_id: job_id.to_string(),
        text: "INVOICE 2024-118\nTotal due: 1,240.00 EUR".to_string(),
        confidence: 0.91,
        page_confidences: vec![0.94, 0.88],
        quality: QualityMetrics {
            readability: 0.9,
            text_density: 0.35,
            low_confidence_words: 3,
            word_count: 412,
        },
        blocks: vec![TextBlock {
            text: "INVOICE 2024-118".to_string(),
            confidence: 0.97,
            page: 1,
            bbox: BoundingBox {
                x: 40.0,
                y: 32.0,
                width: 310.0,
                height: 28.0,
            },
            kind: BlockKind::Line,
        }],
        language: "eng".to_string(),
        completed_at: Utc::now(),
    }
}

/// Progress ticks followed by a completion carrying `result`.
pub fn progress_then_complete(steps: &[u8], result: OcrResult) -> Vec<JobStatusUpdate> {
    let mut updates: Vec<JobStatusUpdate> = steps
        .iter()
        .map(|p| JobStatusUpdate::progress("", *p))
        .collect();
    updates.push(JobStatusUpdate::completed("", result));
    updates
}

pub fn processing_failure(recoverable: bool) -> JobStatusUpdate {
    JobStatusUpdate::failed(
        "",
        OcrError::new(
            OcrErrorCode::ProcessingFailed,
            "Text extraction crashed on page 2",
            recoverable,
        ),
    )
}

fn step(id: &str, element_type: ElementType, title: &str) -> WorkflowElement {
    let config = match element_type {
        ElementType::Approval | ElementType::Review => ElementConfig {
            assignees: vec!["legal-team".to_string()],
            ..Default::default()
        },
        ElementType::Notification => ElementConfig {
            recipients: vec!["requester".to_string()],
            ..Default::default()
        },
        ElementType::Decision => ElementConfig {
            condition: Some("contract.value > 50000".to_string()),
            ..Default::default()
        },
        ElementType::Timer => ElementConfig {
            duration_minutes: Some(1440),
            ..Default::default()
        },
    };
    WorkflowElement::new(id, element_type, title).with_config(config)
}

/// review -> decision -> (approval | notification), approval -> notification
pub fn contract_workflow() -> Workflow {
    let mut wf = Workflow::new("wf-contracts", "Contract approval");
    wf.add_element(step("review", ElementType::Review, "Legal review"));
    wf.add_element(step("decide", ElementType::Decision, "High value?"));
    wf.add_element(step("approve", ElementType::Approval, "CFO approval"));
    wf.add_element(step("notify", ElementType::Notification, "Notify requester"));
    wf.add_connection(WorkflowConnection::new("c1", "review", "decide"));
    wf.add_connection(WorkflowConnection::new("c2", "decide", "approve"));
    wf.add_connection(WorkflowConnection::new("c3", "decide", "notify"));
    wf.add_connection(WorkflowConnection::new("c4", "approve", "notify"));
    wf
}

/// a -> b -> c -> a
pub fn triangle_workflow() -> Workflow {
    let mut wf = Workflow::new("wf-triangle", "Escalation loop");
    wf.add_element(step("a", ElementType::Review, "Review"));
    wf.add_element(step("b", ElementType::Approval, "Approve"));
    wf.add_element(step("c", ElementType::Timer, "Wait a day"));
    wf.add_connection(WorkflowConnection::new("ab", "a", "b"));
    wf.add_connection(WorkflowConnection::new("bc", "b", "c"));
    wf.add_connection(WorkflowConnection::new("ca", "c", "a"));
    wf
}

pub fn decision(id: &str) -> WorkflowElement {
    step(id, ElementType::Decision, "Route")
}

pub fn approval(id: &str) -> WorkflowElement {
    step(id, ElementType::Approval, "Approve")
}
