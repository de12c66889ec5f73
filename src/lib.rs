//! Document Console Core
//!
//! This library provides the state and orchestration core of the document
//! console: OCR job lifecycle management against the console backend, the
//! workflow validation engine, and the reducer-driven console store.

pub mod app_state;
pub mod config;
pub mod models;
pub mod services;
pub mod store;
pub mod validation;
