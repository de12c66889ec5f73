//! The default workflow rule battery.

use std::collections::{HashMap, HashSet};

use crate::models::workflow::{ElementType, ValidationError, Workflow, WorkflowElement};
use crate::validation::{RuleError, ValidationRule};

/// Rules in the order the console reports them.
pub fn default_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(EmptyWorkflow),
        Box::new(DanglingConnections),
        Box::new(DisconnectedNodes),
        Box::new(Cycles),
        Box::new(StartNode),
        Box::new(EndNode),
        Box::new(DecisionBranches),
        Box::new(MissingTitle),
        Box::new(MissingConfig),
    ]
}

/// A workflow with no elements gets a single warning and nothing else.
pub struct EmptyWorkflow;

impl ValidationRule for EmptyWorkflow {
    fn name(&self) -> &'static str {
        "empty_workflow"
    }

    fn check(&self, workflow: &Workflow) -> Result<Vec<ValidationError>, RuleError> {
        if !workflow.elements.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![ValidationError::warning(
            "empty-workflow",
            self.name(),
            "Workflow has no elements",
        )])
    }
}

/// Connections whose source or target is not an element.
pub struct DanglingConnections;

impl ValidationRule for DanglingConnections {
    fn name(&self) -> &'static str {
        "dangling_connections"
    }

    fn check(&self, workflow: &Workflow) -> Result<Vec<ValidationError>, RuleError> {
        if workflow.elements.is_empty() {
            return Ok(Vec::new());
        }
        let ids: HashSet<&str> = workflow.elements.iter().map(|e| e.id.as_str()).collect();

        Ok(workflow
            .connections
            .iter()
            .filter(|c| !ids.contains(c.source.as_str()) || !ids.contains(c.target.as_str()))
            .map(|c| {
                ValidationError::error(
                    format!("invalid-connection-{}", c.id),
                    self.name(),
                    format!(
                        "Connection {} references a missing element ({} -> {})",
                        c.id, c.source, c.target
                    ),
                )
                .on_connection(&c.id)
            })
            .collect())
    }
}

/// Elements no connection touches. Only meaningful with more than one element.
pub struct DisconnectedNodes;

impl ValidationRule for DisconnectedNodes {
    fn name(&self) -> &'static str {
        "disconnected_nodes"
    }

    fn check(&self, workflow: &Workflow) -> Result<Vec<ValidationError>, RuleError> {
        if workflow.elements.len() <= 1 {
            return Ok(Vec::new());
        }
        let touched: HashSet<&str> = workflow
            .connections
            .iter()
            .flat_map(|c| [c.source.as_str(), c.target.as_str()])
            .collect();

        Ok(workflow
            .elements
            .iter()
            .filter(|e| !touched.contains(e.id.as_str()))
            .map(|e| {
                ValidationError::warning(
                    format!("disconnected-{}", e.id),
                    self.name(),
                    format!("\"{}\" is not connected to any other step", display_name(e)),
                )
                .on_element(&e.id)
            })
            .collect())
    }
}

/// Directed cycles. Reports every back edge found by a depth-first search.
pub struct Cycles;

impl ValidationRule for Cycles {
    fn name(&self) -> &'static str {
        "cycles"
    }

    fn check(&self, workflow: &Workflow) -> Result<Vec<ValidationError>, RuleError> {
        let graph = IndexedGraph::build(workflow);
        let mut visited = vec![false; graph.len()];
        let mut on_stack = vec![false; graph.len()];
        let mut back_edges = Vec::new();

        for start in 0..graph.len() {
            if !visited[start] {
                graph.dfs(start, &mut visited, &mut on_stack, &mut back_edges);
            }
        }

        Ok(back_edges
            .into_iter()
            .map(|conn_index| {
                let conn = &workflow.connections[conn_index];
                ValidationError::error(
                    format!("cycle-{}", conn.id),
                    self.name(),
                    format!(
                        "Connection {} -> {} closes a cycle",
                        conn.source, conn.target
                    ),
                )
                .on_connection(&conn.id)
                .on_element(&conn.target)
            })
            .collect())
    }
}

/// Elements in an arena, with adjacency stored as (target index, connection index).
struct IndexedGraph {
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl IndexedGraph {
    fn build(workflow: &Workflow) -> Self {
        let index: HashMap<&str, usize> = workflow
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.as_str(), i))
            .collect();

        let mut adjacency = vec![Vec::new(); workflow.elements.len()];
        for (conn_index, conn) in workflow.connections.iter().enumerate() {
            // dangling connections are reported by their own rule
            if let (Some(&from), Some(&to)) =
                (index.get(conn.source.as_str()), index.get(conn.target.as_str()))
            {
                adjacency[from].push((to, conn_index));
            }
        }
        Self { adjacency }
    }

    fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Depth-first walk from `start` with an explicit `(node, next edge)`
    /// stack, so long chains cannot exhaust the thread stack.
    fn dfs(
        &self,
        start: usize,
        visited: &mut [bool],
        on_stack: &mut [bool],
        back_edges: &mut Vec<usize>,
    ) {
        visited[start] = true;
        on_stack[start] = true;
        let mut stack = vec![(start, 0usize)];

        while let Some((node, edge)) = stack.last_mut() {
            let node = *node;
            let Some(&(next, conn_index)) = self.adjacency[node].get(*edge) else {
                on_stack[node] = false;
                stack.pop();
                continue;
            };
            *edge += 1;

            if on_stack[next] {
                back_edges.push(conn_index);
            } else if !visited[next] {
                visited[next] = true;
                on_stack[next] = true;
                stack.push((next, 0));
            }
        }
    }
}

/// A workflow needs exactly one entry point.
pub struct StartNode;

impl ValidationRule for StartNode {
    fn name(&self) -> &'static str {
        "start_node"
    }

    fn check(&self, workflow: &Workflow) -> Result<Vec<ValidationError>, RuleError> {
        if workflow.elements.is_empty() {
            return Ok(Vec::new());
        }
        let targets: HashSet<&str> = workflow.connections.iter().map(|c| c.target.as_str()).collect();
        let candidates: Vec<&WorkflowElement> = workflow
            .elements
            .iter()
            .filter(|e| !targets.contains(e.id.as_str()))
            .collect();

        let finding = match candidates.len() {
            0 => Some(ValidationError::error(
                "no-start-node",
                self.name(),
                "Every step has an incoming connection, so the workflow has no start",
            )),
            1 => None,
            n => Some(ValidationError::warning(
                "multiple-start-nodes",
                self.name(),
                format!(
                    "{} steps have no incoming connection: {}",
                    n,
                    candidates
                        .iter()
                        .map(|e| display_name(e))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )),
        };
        Ok(finding.into_iter().collect())
    }
}

/// A workflow should have at least one step where it ends.
pub struct EndNode;

impl ValidationRule for EndNode {
    fn name(&self) -> &'static str {
        "end_node"
    }

    fn check(&self, workflow: &Workflow) -> Result<Vec<ValidationError>, RuleError> {
        if workflow.elements.is_empty() {
            return Ok(Vec::new());
        }
        let sources: HashSet<&str> = workflow.connections.iter().map(|c| c.source.as_str()).collect();
        if workflow.elements.iter().any(|e| !sources.contains(e.id.as_str())) {
            return Ok(Vec::new());
        }
        Ok(vec![ValidationError::warning(
            "no-end-node",
            self.name(),
            "Every step has an outgoing connection, so the workflow never ends",
        )])
    }
}

/// Decision steps need at least two outgoing branches.
pub struct DecisionBranches;

impl ValidationRule for DecisionBranches {
    fn name(&self) -> &'static str {
        "decision_branches"
    }

    fn check(&self, workflow: &Workflow) -> Result<Vec<ValidationError>, RuleError> {
        Ok(workflow
            .elements
            .iter()
            .filter(|e| e.element_type == ElementType::Decision)
            .filter_map(|e| {
                let branches = workflow.outgoing(&e.id).count();
                (branches < 2).then(|| {
                    ValidationError::error(
                        format!("decision-branches-{}", e.id),
                        self.name(),
                        format!(
                            "Decision \"{}\" needs at least 2 outgoing connections, found {}",
                            display_name(e),
                            branches
                        ),
                    )
                    .on_element(&e.id)
                })
            })
            .collect())
    }
}

pub struct MissingTitle;

impl ValidationRule for MissingTitle {
    fn name(&self) -> &'static str {
        "missing_title"
    }

    fn check(&self, workflow: &Workflow) -> Result<Vec<ValidationError>, RuleError> {
        Ok(workflow
            .elements
            .iter()
            .filter(|e| e.title.trim().is_empty())
            .map(|e| {
                ValidationError::warning(
                    format!("missing-title-{}", e.id),
                    self.name(),
                    format!("{} step {} has no title", e.element_type, e.id),
                )
                .on_element(&e.id)
            })
            .collect())
    }
}

/// Each element type has one setting it cannot work without.
pub struct MissingConfig;

impl MissingConfig {
    fn missing(element: &WorkflowElement) -> Option<&'static str> {
        let config = &element.config;
        match element.element_type {
            ElementType::Approval if config.assignees.is_empty() => Some("approvers"),
            ElementType::Review if config.assignees.is_empty() => Some("reviewers"),
            ElementType::Notification if config.recipients.is_empty() => Some("recipients"),
            ElementType::Decision
                if config.condition.as_deref().map_or(true, |c| c.trim().is_empty()) =>
            {
                Some("a condition")
            }
            ElementType::Timer if config.duration_minutes.map_or(true, |d| d == 0) => {
                Some("a duration")
            }
            _ => None,
        }
    }
}

impl ValidationRule for MissingConfig {
    fn name(&self) -> &'static str {
        "missing_config"
    }

    fn check(&self, workflow: &Workflow) -> Result<Vec<ValidationError>, RuleError> {
        Ok(workflow
            .elements
            .iter()
            .filter_map(|e| {
                Self::missing(e).map(|what| {
                    ValidationError::warning(
                        format!("missing-config-{}", e.id),
                        self.name(),
                        format!("\"{}\" is missing {}", display_name(e), what),
                    )
                    .on_element(&e.id)
                })
            })
            .collect())
    }
}

fn display_name(element: &WorkflowElement) -> &str {
    if element.title.trim().is_empty() {
        &element.id
    } else {
        &element.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::workflow::{ElementConfig, Severity, WorkflowConnection};
    use crate::validation::ValidationEngine;

    fn approval(id: &str) -> WorkflowElement {
        WorkflowElement::new(id, ElementType::Approval, format!("Approve {id}")).with_config(
            ElementConfig {
                assignees: vec!["finance".to_string()],
                ..Default::default()
            },
        )
    }

    fn decision(id: &str) -> WorkflowElement {
        WorkflowElement::new(id, ElementType::Decision, "Amount check").with_config(ElementConfig {
            condition: Some("amount > 1000".to_string()),
            ..Default::default()
        })
    }

    fn linear(ids: &[&str]) -> Workflow {
        let mut wf = Workflow::new("wf", "Linear");
        for id in ids {
            wf.add_element(approval(id));
        }
        for pair in ids.windows(2) {
            wf.add_connection(WorkflowConnection::new(
                format!("{}-{}", pair[0], pair[1]),
                pair[0],
                pair[1],
            ));
        }
        wf
    }

    fn long_chain(len: usize) -> Workflow {
        let mut wf = Workflow::new("wf", "Long chain");
        wf.elements = (0..len).map(|i| approval(&format!("n{i}"))).collect();
        wf.connections = (1..len)
            .map(|i| WorkflowConnection::new(format!("c{i}"), format!("n{}", i - 1), format!("n{i}")))
            .collect();
        wf
    }

    #[test]
    fn test_long_chain_does_not_exhaust_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let mut wf = long_chain(100_000);
                let clean = ValidationEngine::default().validate(&wf);
                wf.connections
                    .push(WorkflowConnection::new("back", "n99999", "n0"));
                let cycles = Cycles.check(&wf).unwrap();
                (clean, cycles)
            })
            .unwrap();
        let (clean, cycles) = handle.join().unwrap();

        assert!(clean.is_empty(), "unexpected findings: {:?}", clean);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].id, "cycle-back");
    }

    #[test]
    fn test_empty_workflow_only_warns_once() {
        let mut wf = Workflow::default();
        // stray connections are ignored when there are no elements
        wf.add_connection(WorkflowConnection::new("x", "a", "b"));
        let findings = ValidationEngine::default().validate(&wf);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, "empty-workflow");
        assert_eq!(findings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_valid_linear_workflow_has_no_findings() {
        let findings = ValidationEngine::default().validate(&linear(&["a", "b", "c"]));
        assert!(findings.is_empty(), "unexpected findings: {findings:?}");
    }

    #[test]
    fn test_single_node_is_not_disconnected() {
        let findings = DisconnectedNodes.check(&linear(&["a"])).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_disconnected_node_warned() {
        let mut wf = linear(&["a", "b"]);
        wf.add_element(approval("lonely"));
        let findings = DisconnectedNodes.check(&wf).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, "disconnected-lonely");
        assert_eq!(findings[0].element_id.as_deref(), Some("lonely"));
    }

    #[test]
    fn test_cycle_reports_back_edge() {
        let mut wf = linear(&["a", "b", "c"]);
        wf.add_connection(WorkflowConnection::new("c-a", "c", "a"));

        let findings = Cycles.check(&wf).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
        assert_eq!(findings[0].connection_id.as_deref(), Some("c-a"));
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let mut wf = linear(&["a", "b"]);
        wf.add_connection(WorkflowConnection::new("b-b", "b", "b"));
        let findings = Cycles.check(&wf).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, "cycle-b-b");
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let mut wf = Workflow::new("wf", "Diamond");
        for id in ["a", "b", "c", "d"] {
            wf.add_element(approval(id));
        }
        wf.add_connection(WorkflowConnection::new("a-b", "a", "b"));
        wf.add_connection(WorkflowConnection::new("a-c", "a", "c"));
        wf.add_connection(WorkflowConnection::new("b-d", "b", "d"));
        wf.add_connection(WorkflowConnection::new("c-d", "c", "d"));
        assert!(Cycles.check(&wf).unwrap().is_empty());
    }

    #[test]
    fn test_full_cycle_has_no_start_and_no_end() {
        let mut wf = linear(&["a", "b", "c"]);
        wf.add_connection(WorkflowConnection::new("c-a", "c", "a"));

        let findings = ValidationEngine::default().validate(&wf);
        let ids: Vec<&str> = findings.iter().map(|f| f.id.as_str()).collect();
        assert!(ids.contains(&"no-start-node"));
        assert!(ids.contains(&"no-end-node"));
        assert!(ids.contains(&"cycle-c-a"));
    }

    #[test]
    fn test_multiple_start_candidates_warn() {
        let mut wf = linear(&["a", "c"]);
        wf.add_element(approval("b"));
        wf.add_connection(WorkflowConnection::new("b-c", "b", "c"));
        let findings = StartNode.check(&wf).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, "multiple-start-nodes");
        assert_eq!(findings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_decision_needs_two_branches() {
        let mut wf = linear(&["a", "b"]);
        wf.add_element(decision("d1"));
        wf.add_element(decision("d2"));
        wf.add_connection(WorkflowConnection::new("b-d1", "b", "d1"));
        wf.add_connection(WorkflowConnection::new("d1-a", "d1", "a"));
        wf.add_connection(WorkflowConnection::new("d2-a", "d2", "a"));
        wf.add_connection(WorkflowConnection::new("d2-b", "d2", "b"));

        let findings = DecisionBranches.check(&wf).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, "decision-branches-d1");
    }

    #[test]
    fn test_dangling_connection_is_error() {
        let mut wf = linear(&["a"]);
        wf.add_connection(WorkflowConnection::new("a-ghost", "a", "ghost"));
        let findings = DanglingConnections.check(&wf).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, "invalid-connection-a-ghost");
        assert!(findings[0].is_error());
    }

    #[test]
    fn test_missing_title_and_config() {
        let mut wf = Workflow::new("wf", "Notify");
        wf.add_element(WorkflowElement::new("n", ElementType::Notification, "  "));
        wf.add_element(WorkflowElement::new("t", ElementType::Timer, "Wait"));

        let titles = MissingTitle.check(&wf).unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].id, "missing-title-n");

        let configs = MissingConfig.check(&wf).unwrap();
        let ids: Vec<&str> = configs.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["missing-config-n", "missing-config-t"]);
    }
}
