//! Pure functions for calculating table plans (Functional Core).

use serde::Serialize;

use crate::manifest::{IndexSpec, TableSpec};
use crate::provider::TableState;

/// Planned changes for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TablePlan {
    /// Table doesn't exist, needs to be created.
    Create { spec: TableSpec },
    /// Table exists, indexes need to be added.
    AddIndexes {
        table_name: String,
        indexes: Vec<IndexSpec>,
    },
    /// Table is up to date, no changes needed.
    NoChanges { table_name: String },
}

impl TablePlan {
    pub fn table_name(&self) -> &str {
        match self {
            TablePlan::Create { spec } => &spec.name,
            TablePlan::AddIndexes { table_name, .. } | TablePlan::NoChanges { table_name } => {
                table_name
            }
        }
    }

    pub fn has_changes(&self) -> bool {
        !matches!(self, TablePlan::NoChanges { .. })
    }
}

/// Pure function: Calculate what changes are needed to reach desired state.
pub fn plan_table(current: Option<&TableState>, desired: &TableSpec) -> TablePlan {
    match current {
        None => TablePlan::Create {
            spec: desired.clone(),
        },
        Some(state) => {
            let existing: Vec<&str> = state.indexes.iter().map(|i| i.name.as_str()).collect();

            let indexes: Vec<IndexSpec> = desired
                .indexes
                .iter()
                .filter(|index| !existing.contains(&index.name.as_str()))
                .cloned()
                .collect();

            if indexes.is_empty() {
                TablePlan::NoChanges {
                    table_name: desired.name.clone(),
                }
            } else {
                TablePlan::AddIndexes {
                    table_name: desired.name.clone(),
                    indexes,
                }
            }
        }
    }
}

/// Pure function: Format a table plan for display.
pub fn format_table_plan(plan: &TablePlan) -> Vec<String> {
    match plan {
        TablePlan::Create { spec } => {
            let mut lines = vec![
                format!("+ Create table: {}", spec.name),
                format!(
                    "  Partition key: {} ({})",
                    spec.partition_key.name,
                    spec.partition_key.attribute_type.code()
                ),
            ];
            if let Some(sk) = &spec.sort_key {
                lines.push(format!(
                    "  Sort key: {} ({})",
                    sk.name,
                    sk.attribute_type.code()
                ));
            }
            for index in &spec.indexes {
                lines.push(format!("  + GSI: {}", index.name));
                lines.push(format!(
                    "    Partition key: {} ({})",
                    index.partition_key.name,
                    index.partition_key.attribute_type.code()
                ));
                if let Some(sk) = &index.sort_key {
                    lines.push(format!(
                        "    Sort key: {} ({})",
                        sk.name,
                        sk.attribute_type.code()
                    ));
                }
            }
            lines.push(format!("  Billing: {}", spec.capacity));
            lines
        }
        TablePlan::AddIndexes {
            table_name,
            indexes,
        } => {
            let mut lines = vec![format!("~ Update table: {}", table_name)];
            for index in indexes {
                lines.push(format!("  + Add GSI: {}", index.name));
            }
            lines
        }
        TablePlan::NoChanges { table_name } => {
            vec![format!("= Table '{}' is up to date", table_name)]
        }
    }
}
