//! Output formatting utilities for the CLI.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;
use uuid::Uuid;

use crate::services::{CascadeReport, HierarchyNode};

/// A command result that renders as a table or as JSON.
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Print `result` in the selected format.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to at most `max_len` characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// First eight characters of an id, for tables.
pub fn short_id(id: Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

/// A borderless table with upper-cased headers.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// One line per node a cascade completed; empty when nothing moved.
pub fn describe_cascade(cascade: &CascadeReport) -> Vec<String> {
    let mut lines: Vec<String> = cascade
        .completed
        .iter()
        .map(|node| match node {
            HierarchyNode::Task(id) => format!("  task {id} completed"),
            HierarchyNode::Step(id) => format!("  step {id} completed"),
            HierarchyNode::Stage(id) => format!("  stage {id} completed"),
            HierarchyNode::Workflow(id) => format!("  workflow {id} completed"),
        })
        .collect();
    if let Some(error) = &cascade.error {
        lines.push(format!("  cascade stopped: {error}"));
    }
    if !lines.is_empty() {
        lines.insert(0, "Auto-progression:".to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Prüfung der Unterlagen", 10), "Prüfung...");
    }

    #[test]
    fn test_describe_cascade() {
        assert!(describe_cascade(&CascadeReport::default()).is_empty());

        let step = Uuid::new_v4();
        let report = CascadeReport {
            completed: vec![HierarchyNode::Step(step)],
            error: None,
        };
        let lines = describe_cascade(&report);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains(&step.to_string()));
    }
}
