use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kinds of step a user can drop onto the workflow canvas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ElementType {
    Approval,
    Review,
    Notification,
    Decision,
    Timer,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Type-specific settings of a workflow step. Which fields matter depends on
/// the element type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ElementConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

/// A node of the workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowElement {
    pub id: String,
    pub element_type: ElementType,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub config: ElementConfig,
}

impl WorkflowElement {
    pub fn new(id: impl Into<String>, element_type: ElementType, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            element_type,
            title: title.into(),
            description: None,
            position: Position::default(),
            config: ElementConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ElementConfig) -> Self {
        self.config = config;
        self
    }
}

/// A directed edge between two workflow elements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowConnection {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl WorkflowConnection {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: None,
        }
    }
}

/// The workflow currently being edited on the canvas.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Workflow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub elements: Vec<WorkflowElement>,
    #[serde(default)]
    pub connections: Vec<WorkflowConnection>,
}

impl Workflow {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            elements: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn element(&self, id: &str) -> Option<&WorkflowElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a WorkflowConnection> {
        self.connections.iter().filter(move |c| c.source == id)
    }

    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a WorkflowConnection> {
        self.connections.iter().filter(move |c| c.target == id)
    }

    /// Adds an element, replacing any existing element with the same id.
    pub fn add_element(&mut self, element: WorkflowElement) {
        match self.elements.iter_mut().find(|e| e.id == element.id) {
            Some(existing) => *existing = element,
            None => self.elements.push(element),
        }
    }

    /// Returns false if no element has the given id.
    pub fn update_element(&mut self, element: WorkflowElement) -> bool {
        match self.elements.iter_mut().find(|e| e.id == element.id) {
            Some(existing) => {
                *existing = element;
                true
            }
            None => false,
        }
    }

    /// Removes an element together with every connection touching it.
    pub fn remove_element(&mut self, id: &str) -> Option<WorkflowElement> {
        let index = self.elements.iter().position(|e| e.id == id)?;
        self.connections.retain(|c| c.source != id && c.target != id);
        Some(self.elements.remove(index))
    }

    /// Adds a connection, replacing any existing connection with the same id.
    pub fn add_connection(&mut self, connection: WorkflowConnection) {
        match self.connections.iter_mut().find(|c| c.id == connection.id) {
            Some(existing) => *existing = connection,
            None => self.connections.push(connection),
        }
    }

    pub fn remove_connection(&mut self, id: &str) -> Option<WorkflowConnection> {
        let index = self.connections.iter().position(|c| c.id == id)?;
        Some(self.connections.remove(index))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A finding of one validation rule. Recomputed on every workflow change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationError {
    pub id: String,
    pub severity: Severity,
    pub rule: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
}

impl ValidationError {
    pub fn error(id: impl Into<String>, rule: &str, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            severity: Severity::Error,
            rule: rule.to_string(),
            message: message.into(),
            element_id: None,
            connection_id: None,
        }
    }

    pub fn warning(id: impl Into<String>, rule: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(id, rule, message)
        }
    }

    pub fn on_element(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self
    }

    pub fn on_connection(mut self, connection_id: impl Into<String>) -> Self {
        self.connection_id = Some(connection_id.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
