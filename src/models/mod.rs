pub mod batch;
pub mod document;
pub mod ocr;
pub mod workflow;
