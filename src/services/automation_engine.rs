//! Task automation: condition evaluation and ordered action execution.
//!
//! Condition evaluation is pure. A leaf whose field cannot be resolved is
//! false, whatever its operator, and an empty condition list is true.
//!
//! Actions run in list order with partial-failure semantics: every action
//! produces one [`ActionResult`] and a failure never stops the actions after
//! it.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::automation::lookup_path;
use crate::domain::models::{
    is_blank_value, ActionKind, ActionResult, AutomationAction, Condition, ConditionOperator,
    ExecutionContext, LogicalOperator,
};
use crate::domain::ports::{AutomationGateway, NewNotification, NewTask, OutgoingMessage};

/// Anything a condition tree can be evaluated against.
pub trait FieldSource {
    fn resolve(&self, path: &str) -> Option<Value>;
}

impl FieldSource for ExecutionContext {
    fn resolve(&self, path: &str) -> Option<Value> {
        self.lookup(path)
    }
}

impl FieldSource for Map<String, Value> {
    fn resolve(&self, path: &str) -> Option<Value> {
        lookup_path(self, path).cloned()
    }
}

/// Evaluate a condition list as an implicit AND.
pub fn evaluate_conditions(conditions: &[Condition], source: &impl FieldSource) -> bool {
    conditions.iter().all(|c| evaluate_condition(c, source))
}

/// Evaluate one condition against `source`. A field that does not resolve fails.
pub fn evaluate_condition(condition: &Condition, source: &impl FieldSource) -> bool {
    match condition {
        Condition::Comparison {
            field,
            operator,
            value,
        } => match source.resolve(field) {
            Some(actual) => compare(&actual, *operator, value.as_ref()),
            None => false,
        },
        Condition::Group { logic, conditions } => match logic {
            LogicalOperator::And => conditions.iter().all(|c| evaluate_condition(c, source)),
            LogicalOperator::Or => conditions.iter().any(|c| evaluate_condition(c, source)),
        },
    }
}

fn compare(actual: &Value, operator: ConditionOperator, expected: Option<&Value>) -> bool {
    use ConditionOperator as Op;

    match operator {
        Op::IsEmpty => return is_blank_value(actual),
        Op::IsNotEmpty => return !is_blank_value(actual),
        _ => {}
    }

    let Some(expected) = expected else {
        return false;
    };

    match operator {
        Op::Equals => loose_eq(actual, expected),
        Op::NotEquals => !loose_eq(actual, expected),
        Op::GreaterThan => ordering(actual, expected).is_some_and(|o| o.is_gt()),
        Op::GreaterThanOrEqual => ordering(actual, expected).is_some_and(|o| o.is_ge()),
        Op::LessThan => ordering(actual, expected).is_some_and(|o| o.is_lt()),
        Op::LessThanOrEqual => ordering(actual, expected).is_some_and(|o| o.is_le()),
        Op::Contains => contains(actual, expected),
        Op::NotContains => !contains(actual, expected),
        Op::StartsWith => match (actual, expected) {
            (Value::String(a), Value::String(e)) => a.starts_with(e.as_str()),
            _ => false,
        },
        Op::EndsWith => match (actual, expected) {
            (Value::String(a), Value::String(e)) => a.ends_with(e.as_str()),
            _ => false,
        },
        Op::In => match expected {
            Value::Array(options) => options.iter().any(|o| loose_eq(actual, o)),
            _ => false,
        },
        Op::IsEmpty | Op::IsNotEmpty => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Equality that treats `3`, `3.0` and `"3"` as the same value.
fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Number(_), _) | (_, Value::Number(_)) => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
            _ => false,
        },
        _ => false,
    }
}

/// Numeric ordering when both sides are numbers, lexical ordering for two
/// strings (so RFC3339 dates compare correctly), otherwise incomparable.
fn ordering(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    if let (Value::String(x), Value::String(y)) = (a, b) {
        if let (Ok(x), Ok(y)) = (x.trim().parse::<f64>(), y.trim().parse::<f64>()) {
            return x.partial_cmp(&y);
        }
        return Some(x.cmp(y));
    }
    as_number(a)?.partial_cmp(&as_number(b)?)
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::String(h), Value::String(n)) => h.contains(n.as_str()),
        (Value::Array(items), n) => items.iter().any(|i| loose_eq(i, n)),
        (Value::Object(map), Value::String(key)) => map.contains_key(key),
        _ => false,
    }
}

/// Replace every `{{path}}` in `template` with the resolved value.
///
/// Strings are inserted verbatim, other values as JSON, unresolved paths as
/// the empty string. An unterminated `{{` is kept literally.
pub fn interpolate(template: &str, source: &impl FieldSource) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        match source.resolve(after[..end].trim()) {
            Some(Value::String(s)) => out.push_str(&s),
            Some(Value::Null) | None => {}
            Some(other) => out.push_str(&other.to_string()),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

/// Interpolate every string inside a JSON value. A string that is exactly
/// one placeholder resolves to the typed value (null when unresolved).
pub fn interpolate_value(value: &Value, source: &impl FieldSource) -> Value {
    match value {
        Value::String(s) => match sole_placeholder(s) {
            Some(path) => source.resolve(path).unwrap_or(Value::Null),
            None => Value::String(interpolate(s, source)),
        },
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| interpolate_value(v, source)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate_value(v, source)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn sole_placeholder(s: &str) -> Option<&str> {
    let inner = s.trim().strip_prefix("{{")?.strip_suffix("}}")?;
    (!inner.contains("{{") && !inner.contains("}}")).then(|| inner.trim())
}

/// Executes action lists against an [`AutomationGateway`].
pub struct AutomationEngine {
    gateway: Arc<dyn AutomationGateway>,
    max_actions: usize,
}

impl AutomationEngine {
    /// Create an engine that rejects lists longer than `max_actions`.
    pub fn new(gateway: Arc<dyn AutomationGateway>, max_actions: usize) -> Self {
        Self {
            gateway,
            max_actions,
        }
    }

    /// Per-task action limit.
    pub fn max_actions(&self) -> usize {
        self.max_actions
    }

    /// True when every condition holds. An empty list holds.
    pub fn evaluate_conditions(
        &self,
        conditions: &[Condition],
        context: &ExecutionContext,
    ) -> bool {
        evaluate_conditions(conditions, context)
    }

    /// Run `actions` in order, one result per action.
    ///
    /// Outputs of named actions are written to `outputs.<name>` in the
    /// context payload so later actions can reference them.
    #[tracing::instrument(skip_all, fields(task_id = %context.task_id, actions = actions.len()))]
    pub async fn execute_actions(
        &self,
        actions: &[AutomationAction],
        context: &mut ExecutionContext,
    ) -> DomainResult<Vec<ActionResult>> {
        if actions.len() > self.max_actions {
            return Err(DomainError::Validation(format!(
                "Task has {} actions, more than the limit of {}",
                actions.len(),
                self.max_actions
            )));
        }

        let mut results = Vec::with_capacity(actions.len());
        for (index, action) in actions.iter().enumerate() {
            let label = action.label().to_string();

            if !evaluate_conditions(&action.conditions, context) {
                tracing::debug!(index, action = %label, "Action conditions not met, skipping");
                results.push(ActionResult::skipped(index, label));
                continue;
            }

            match self.execute_action(&action.kind, context).await {
                Ok(output) => {
                    if let (Some(name), Some(out)) = (&action.name, &output) {
                        if let Err(e) = context.set(&format!("outputs.{name}"), out.clone()) {
                            tracing::debug!(
                                index,
                                action = %label,
                                error = %e,
                                "Could not record action output"
                            );
                        }
                    }
                    tracing::debug!(index, action = %label, "Action succeeded");
                    results.push(ActionResult::succeeded(index, label, output));
                }
                Err(e) => {
                    tracing::warn!(index, action = %label, error = %e, "Action failed");
                    results.push(ActionResult::failed(index, label, e.to_string()));
                }
            }
        }

        Ok(results)
    }

    async fn execute_action(
        &self,
        kind: &ActionKind,
        context: &mut ExecutionContext,
    ) -> DomainResult<Option<Value>> {
        match kind {
            ActionKind::CreateTask {
                title,
                description,
                step_id,
                assigned_to,
            } => {
                let title = interpolate(title, context);
                if title.trim().is_empty() {
                    return Err(DomainError::Validation("create_task needs a title".to_string()));
                }
                let id = self
                    .gateway
                    .create_task(NewTask {
                        step_id: step_id.unwrap_or(context.step_id),
                        title,
                        description: interpolate(description, context),
                        assigned_to: *assigned_to,
                    })
                    .await?;
                Ok(Some(json!({ "task_id": id })))
            }
            ActionKind::UpdateTask { task_id, fields } => {
                let target = task_id.unwrap_or(context.task_id);
                let fields = match interpolate_value(&Value::Object(fields.clone()), context) {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                self.gateway.update_task_fields(target, &fields).await?;
                Ok(Some(json!({ "task_id": target })))
            }
            ActionKind::CreateNotification {
                user_id,
                title,
                body,
            } => {
                let id = self
                    .gateway
                    .create_notification(NewNotification {
                        organization_id: context.organization_id,
                        user_id: user_id.unwrap_or(context.actor_id),
                        task_id: Some(context.task_id),
                        title: interpolate(title, context),
                        body: interpolate(body, context),
                    })
                    .await?;
                Ok(Some(json!({ "notification_id": id })))
            }
            ActionKind::SendMessage {
                recipient,
                channel,
                subject,
                body,
            } => {
                let recipient = interpolate(recipient, context);
                if recipient.trim().is_empty() {
                    return Err(DomainError::Validation(
                        "send_message resolved to an empty recipient".to_string(),
                    ));
                }
                let id: Uuid = self
                    .gateway
                    .send_message(OutgoingMessage {
                        organization_id: context.organization_id,
                        task_id: Some(context.task_id),
                        recipient,
                        channel: channel.clone(),
                        subject: subject.as_deref().map(|s| interpolate(s, context)),
                        body: interpolate(body, context),
                    })
                    .await?;
                Ok(Some(json!({ "message_id": id })))
            }
            ActionKind::SetField { field, value } => {
                let resolved = interpolate_value(value, context);
                context
                    .set(field, resolved.clone())
                    .map_err(DomainError::Validation)?;
                Ok(Some(resolved))
            }
        }
    }
}
