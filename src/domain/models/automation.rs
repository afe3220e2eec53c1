//! Automation domain types: condition trees, actions and execution context.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Comparison operator for a condition leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    /// The field value is one of the values in the (array) operand.
    In,
    IsEmpty,
    IsNotEmpty,
}

impl ConditionOperator {
    /// Operators that take no operand.
    pub fn is_unary(&self) -> bool {
        matches!(self, Self::IsEmpty | Self::IsNotEmpty)
    }
}

/// How the members of a group combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

/// A node of a condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Compare the value at `field` (a dotted path) against `value`.
    Comparison {
        field: String,
        operator: ConditionOperator,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
    Group {
        #[serde(default)]
        logic: LogicalOperator,
        conditions: Vec<Condition>,
    },
}

impl Condition {
    /// Compare a field against a literal.
    pub fn compare(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self::Comparison {
            field: field.into(),
            operator,
            value: Some(value),
        }
    }

    /// A unary check such as `is_empty`.
    pub fn check(field: impl Into<String>, operator: ConditionOperator) -> Self {
        Self::Comparison {
            field: field.into(),
            operator,
            value: None,
        }
    }

    /// True when every child holds.
    pub fn all(conditions: Vec<Condition>) -> Self {
        Self::Group {
            logic: LogicalOperator::And,
            conditions,
        }
    }

    /// True when any child holds.
    pub fn any(conditions: Vec<Condition>) -> Self {
        Self::Group {
            logic: LogicalOperator::Or,
            conditions,
        }
    }
}

/// What an action does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Create a task under `step_id`, or under the running task's step.
    CreateTask {
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_id: Option<Uuid>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assigned_to: Option<Uuid>,
    },
    /// Update fields of a task (defaults to the running task).
    UpdateTask {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<Uuid>,
        fields: Map<String, Value>,
    },
    CreateNotification {
        /// Defaults to the actor of the run.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<Uuid>,
        title: String,
        #[serde(default)]
        body: String,
    },
    SendMessage {
        recipient: String,
        #[serde(default = "default_channel")]
        channel: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subject: Option<String>,
        body: String,
    },
    /// Write `value` at `field` in the context payload for later actions.
    SetField { field: String, value: Value },
}

fn default_channel() -> String {
    "email".to_string()
}

impl ActionKind {
    /// Action kind name as stored and logged.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateTask { .. } => "create_task",
            Self::UpdateTask { .. } => "update_task",
            Self::CreateNotification { .. } => "create_notification",
            Self::SendMessage { .. } => "send_message",
            Self::SetField { .. } => "set_field",
        }
    }
}

/// One entry of a task's ordered action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: ActionKind,
    /// Per-action gate, evaluated against the context as it stands when
    /// this action is reached.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl AutomationAction {
    /// An unnamed action with no conditions.
    pub fn new(kind: ActionKind) -> Self {
        Self {
            name: None,
            kind,
            conditions: Vec::new(),
        }
    }

    /// Set a display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Gate the action on `conditions`.
    pub fn when(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Display label: the explicit name, or the kind.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.kind.name())
    }
}

/// Outcome of one action.
///
/// A skipped action counts as successful for the purpose of completing the
/// owning task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub index: usize,
    pub action: String,
    pub success: bool,
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    /// A completed action.
    pub fn succeeded(index: usize, action: impl Into<String>, output: Option<Value>) -> Self {
        Self {
            index,
            action: action.into(),
            success: true,
            skipped: false,
            output,
            error: None,
        }
    }

    /// A failed action.
    pub fn failed(index: usize, action: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            index,
            action: action.into(),
            success: false,
            skipped: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// An action whose conditions did not hold.
    pub fn skipped(index: usize, action: impl Into<String>) -> Self {
        Self {
            index,
            action: action.into(),
            success: true,
            skipped: true,
            output: None,
            error: None,
        }
    }
}

/// Whether every result allows the owning task to complete.
pub fn all_succeeded(results: &[ActionResult]) -> bool {
    results.iter().all(|r| r.success)
}

/// Ids of the hierarchy around a task run plus a mutable data payload that
/// actions read from and write to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub task_id: Uuid,
    pub step_id: Uuid,
    pub stage_id: Uuid,
    pub workflow_id: Uuid,
    pub organization_id: Uuid,
    pub actor_id: Uuid,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl ExecutionContext {
    /// Resolve a dotted path: the data payload first, then the id envelope.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        if let Some(v) = lookup_path(&self.data, path) {
            return Some(v.clone());
        }
        let id = match path {
            "task_id" => self.task_id,
            "step_id" => self.step_id,
            "stage_id" => self.stage_id,
            "workflow_id" => self.workflow_id,
            "organization_id" => self.organization_id,
            "actor_id" => self.actor_id,
            _ => return None,
        };
        Some(Value::String(id.to_string()))
    }

    /// Write `value` at a dotted path in the payload, creating intermediate
    /// objects. Fails if an intermediate segment holds a non-object.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), String> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(format!("Invalid field path '{path}'"));
        }
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| format!("Invalid field path '{path}'"))?;

        let mut current = &mut self.data;
        for segment in parents {
            let entry = current
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match entry {
                Value::Object(map) => map,
                _ => return Err(format!("Field '{segment}' in '{path}' is not an object")),
            };
        }
        current.insert((*last).to_string(), value);
        Ok(())
    }
}

/// Walk a dotted path through nested objects (and numeric array indices).
pub fn lookup_path<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = root.get(first)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> ExecutionContext {
        ExecutionContext {
            task_id: Uuid::new_v4(),
            step_id: Uuid::new_v4(),
            stage_id: Uuid::new_v4(),
            workflow_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
            data: Map::new(),
        }
    }

    #[test]
    fn test_action_serde_shape() {
        let yaml = r"
name: notify preparer
type: create_notification
title: Documents received
conditions:
  - type: comparison
    field: client.tier
    operator: equals
    value: gold
";
        let action: AutomationAction = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(action.label(), "notify preparer");
        assert_eq!(action.kind.name(), "create_notification");
        assert_eq!(action.conditions.len(), 1);
    }

    #[test]
    fn test_set_and_lookup_nested() {
        let mut ctx = context();
        ctx.set("client.name", json!("Acme")).unwrap();
        ctx.set("client.years", json!([2022, 2023])).unwrap();
        assert_eq!(ctx.lookup("client.name"), Some(json!("Acme")));
        assert_eq!(ctx.lookup("client.years.1"), Some(json!(2023)));
        assert_eq!(ctx.lookup("client.missing"), None);
    }

    #[test]
    fn test_set_rejects_scalar_parent() {
        let mut ctx = context();
        ctx.set("status", json!("open")).unwrap();
        assert!(ctx.set("status.code", json!(1)).is_err());
        assert!(ctx.set("a..b", json!(1)).is_err());
    }

    #[test]
    fn test_lookup_falls_back_to_ids() {
        let ctx = context();
        assert_eq!(
            ctx.lookup("task_id"),
            Some(Value::String(ctx.task_id.to_string()))
        );
    }

    #[test]
    fn test_skipped_counts_as_success() {
        let results = vec![
            ActionResult::succeeded(0, "set_field", None),
            ActionResult::skipped(1, "send_message"),
        ];
        assert!(all_succeeded(&results));
        let mut with_failure = results;
        with_failure.push(ActionResult::failed(2, "create_task", "boom"));
        assert!(!all_succeeded(&with_failure));
    }
}
