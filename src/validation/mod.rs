//! Workflow validation engine.
//!
//! Every rule sees the whole workflow and reports zero or more findings. Rules
//! run independently: a rule that fails or panics is logged and skipped, and
//! the findings of the remaining rules are still returned. There is no
//! incremental validation; callers re-run the battery after every change.

pub mod rules;

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;
use tracing::{debug, warn};

use crate::models::workflow::{Severity, ValidationError, Workflow};

/// Failure inside a single rule. Never aborts the other rules.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("rule {rule} failed: {message}")]
    Failed { rule: String, message: String },
}

/// A pure check over the workflow graph.
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, workflow: &Workflow) -> Result<Vec<ValidationError>, RuleError>;
}

/// Runs a fixed battery of rules over a workflow.
pub struct ValidationEngine {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new(rules::default_rules())
    }
}

impl ValidationEngine {
    pub fn new(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every rule and concatenate their findings in rule order.
    pub fn validate(&self, workflow: &Workflow) -> Vec<ValidationError> {
        metrics::counter!("workflow_validation_runs_total").increment(1);

        let mut findings = Vec::new();
        for rule in &self.rules {
            match catch_unwind(AssertUnwindSafe(|| rule.check(workflow))) {
                Ok(Ok(mut found)) => findings.append(&mut found),
                Ok(Err(e)) => {
                    warn!(rule = rule.name(), error = %e, "Validation rule failed, skipping");
                }
                Err(_) => {
                    warn!(rule = rule.name(), "Validation rule panicked, skipping");
                }
            }
        }

        debug!(
            workflow_id = %workflow.id,
            elements = workflow.elements.len(),
            connections = workflow.connections.len(),
            findings = findings.len(),
            "Workflow validated"
        );

        findings
    }

    pub fn report(&self, workflow: &Workflow) -> ValidationReport {
        ValidationReport::from_findings(self.validate(workflow))
    }
}

/// Findings split by severity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn from_findings(findings: Vec<ValidationError>) -> Self {
        let (errors, warnings) = findings
            .into_iter()
            .partition(|f| f.severity == Severity::Error);
        Self { errors, warnings }
    }

    /// Warnings do not make a workflow invalid.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
