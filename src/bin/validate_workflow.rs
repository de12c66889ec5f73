//! Validate a workflow definition exported from the canvas.
//!
//! Usage:
//!   validate_workflow <workflow.json>
//!
//! Prints the validation report as JSON and exits non-zero when the workflow
//! has error-severity findings.

use std::process::ExitCode;

use docconsole::{models::workflow::Workflow, validation::ValidationEngine};
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: validate_workflow <workflow.json>")?;

    let workflow: Workflow = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    tracing::info!(
        file = %path,
        elements = workflow.elements.len(),
        connections = workflow.connections.len(),
        "Validating workflow"
    );

    let report = ValidationEngine::default().report(&workflow);
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
