//! Workflow editing through the console store, validated on every change

mod fixtures;

use docconsole::models::workflow::{Severity, Workflow, WorkflowConnection};
use docconsole::store::{Action, ConsoleStore};
use docconsole::validation::ValidationEngine;
use fixtures::*;

#[test]
fn test_empty_workflow_yields_single_warning() {
    let findings = ValidationEngine::default().validate(&Workflow::new("wf", "Blank"));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].id, "empty-workflow");
    assert_eq!(findings[0].severity, Severity::Warning);
}

#[test]
fn test_contract_workflow_is_clean() {
    let report = ValidationEngine::default().report(&contract_workflow());
    assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
    assert!(report.warnings.is_empty(), "unexpected warnings: {:?}", report.warnings);
}

#[test]
fn test_triangle_reports_cycle_on_member_connection() {
    let report = ValidationEngine::default().report(&triangle_workflow());
    assert!(!report.is_valid());

    let cycle = report
        .errors
        .iter()
        .find(|e| e.id.starts_with("cycle-"))
        .expect("cycle error");
    let conn = cycle.connection_id.as_deref().unwrap();
    assert!(["ab", "bc", "ca"].contains(&conn));
    assert!(report.errors.iter().any(|e| e.id == "no-start-node"));
}

#[test]
fn test_one_branch_error_per_short_decision() {
    let mut wf = Workflow::new("wf", "Routing");
    wf.add_element(approval("intake"));
    wf.add_element(decision("d1"));
    wf.add_element(decision("d2"));
    wf.add_element(approval("done"));
    wf.add_connection(WorkflowConnection::new("c1", "intake", "d1"));
    wf.add_connection(WorkflowConnection::new("c2", "d1", "d2"));
    wf.add_connection(WorkflowConnection::new("c3", "d2", "done"));

    let findings = ValidationEngine::default().validate(&wf);
    let mut branch_errors: Vec<&str> = findings
        .iter()
        .filter(|f| f.id.starts_with("decision-branches-"))
        .map(|f| f.element_id.as_deref().unwrap())
        .collect();
    branch_errors.sort();
    assert_eq!(branch_errors, vec!["d1", "d2"]);
}

#[tokio::test]
async fn test_store_revalidates_after_each_edit() {
    let store = ConsoleStore::new(1);
    store.dispatch(Action::LoadWorkflow(contract_workflow())).await;
    assert!(store.snapshot().await.workflow.is_valid);

    store
        .dispatch(Action::AddConnection(WorkflowConnection::new(
            "loop", "notify", "review",
        )))
        .await;
    let snapshot = store.snapshot().await;
    assert!(!snapshot.workflow.is_valid);
    assert!(snapshot
        .workflow
        .validation
        .iter()
        .any(|f| f.id.starts_with("cycle-")));

    store
        .dispatch(Action::RemoveConnection {
            connection_id: "loop".to_string(),
        })
        .await;
    assert!(store.snapshot().await.workflow.is_valid);
}

#[tokio::test]
async fn test_removing_element_drops_its_connections() {
    let store = ConsoleStore::new(1);
    store.dispatch(Action::LoadWorkflow(contract_workflow())).await;
    store
        .dispatch(Action::RemoveElement {
            element_id: "approve".to_string(),
        })
        .await;

    let snapshot = store.snapshot().await;
    let wf = &snapshot.workflow.current;
    assert!(wf.element("approve").is_none());
    assert!(wf
        .connections
        .iter()
        .all(|c| c.source != "approve" && c.target != "approve"));
    // decide now has a single branch left
    assert!(snapshot
        .workflow
        .validation
        .iter()
        .any(|f| f.id == "decision-branches-decide"));
    assert!(store
        .validation()
        .await
        .iter()
        .all(|f| !f.id.starts_with("invalid-connection-")));
}
