pub mod compatibility;
pub mod ocr;
pub mod polling;
pub mod processor;
