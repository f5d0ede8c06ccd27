//! Planned and applied actions for managed resources

use crate::suppress::FieldChange;
use serde::Serialize;

/// A planned (or applied) action for one resource
#[derive(Debug, Clone, Serialize)]
pub struct Action {
    /// Unique identifier for the action, e.g. "update-target:audit-cos"
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource kind ("target", "route", "settings")
    pub resource_type: String,

    /// Logical name of the resource in the manifest
    pub resource_name: String,

    /// Remote identity, once known
    pub resource_id: Option<String>,

    /// Description of the action
    pub description: String,

    /// Fields that triggered an update
    pub changes: Vec<FieldChange>,
}

impl Action {
    pub fn new(
        action_type: ActionType,
        resource_type: impl Into<String>,
        resource_name: impl Into<String>,
    ) -> Self {
        let resource_type = resource_type.into();
        let resource_name = resource_name.into();
        Self {
            id: format!("{}-{}:{}", action_type, resource_type, resource_name),
            description: format!("{} {} {}", action_type, resource_type, resource_name),
            action_type,
            resource_type,
            resource_name,
            resource_id: None,
            changes: Vec::new(),
        }
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn with_changes(mut self, changes: Vec<FieldChange>) -> Self {
        self.changes = changes;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Replace an existing resource with the declared state
    Update,
    /// Delete a resource
    Delete,
    /// Reset a singleton to its default state
    Reset,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::Reset => write!(f, "reset"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of applying actions
#[derive(Debug, Clone, Serialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionResult>,

    /// Failed actions
    pub failed: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, action: &Action) {
        self.succeeded.push(ActionResult {
            action_id: action.id.clone(),
            action_type: action.action_type,
            success: true,
            message: action.description.clone(),
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: String, action_type: ActionType, error: String) {
        self.failed.push(ActionResult {
            action_id,
            action_type,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }

    /// Number of actions that changed remote state
    pub fn changed(&self) -> usize {
        self.succeeded
            .iter()
            .filter(|r| r.action_type != ActionType::NoOp)
            .count()
    }
}

impl Default for ApplyResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    /// ID of the action
    pub action_id: String,

    pub action_type: ActionType,

    /// Whether the action succeeded
    pub success: bool,

    /// Success message
    pub message: String,

    /// Error message if failed
    pub error: Option<String>,
}

/// Plan containing all actions to be applied
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    /// List of actions to perform
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            has_changes: false,
        }
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            reset: self.actions_by_type(ActionType::Reset).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub reset: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create,
            self.update,
            self.delete + self.reset,
            self.no_change
        )
    }
}
