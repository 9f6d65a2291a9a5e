//! Pure functions for calculating function plans (Functional Core).

use serde::Serialize;

use crate::manifest::FunctionSpec;
use crate::provider::FunctionState;

/// Planned changes for one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FunctionPlan {
    /// Function doesn't exist, needs to be created.
    Create { name: String },
    /// Function exists. Code is always replaced; configuration only when
    /// `drift` is non-empty.
    Update { name: String, drift: Vec<String> },
}

impl FunctionPlan {
    pub fn name(&self) -> &str {
        match self {
            FunctionPlan::Create { name } | FunctionPlan::Update { name, .. } => name,
        }
    }

    /// True when the deployed configuration differs from the declared one.
    pub fn needs_configuration_update(&self) -> bool {
        matches!(self, FunctionPlan::Update { drift, .. } if !drift.is_empty())
    }
}

/// Pure function: Calculate what changes are needed for a function.
pub fn plan_function(current: Option<&FunctionState>, desired: &FunctionSpec) -> FunctionPlan {
    match current {
        None => FunctionPlan::Create {
            name: desired.name.clone(),
        },
        Some(state) => FunctionPlan::Update {
            name: desired.name.clone(),
            drift: configuration_drift(state, desired),
        },
    }
}

/// Pure function: List configuration fields that differ, one line each.
pub fn configuration_drift(current: &FunctionState, desired: &FunctionSpec) -> Vec<String> {
    let mut drift = Vec::new();

    if current.runtime != desired.runtime {
        drift.push(format!("runtime: {} -> {}", current.runtime, desired.runtime));
    }
    if current.handler != desired.handler {
        drift.push(format!("handler: {} -> {}", current.handler, desired.handler));
    }
    if current.description != desired.description {
        drift.push("description changed".to_string());
    }
    if current.memory_mb != desired.memory_mb {
        drift.push(format!(
            "memory: {} MB -> {} MB",
            current.memory_mb, desired.memory_mb
        ));
    }
    if current.timeout_secs != desired.timeout_secs {
        drift.push(format!(
            "timeout: {}s -> {}s",
            current.timeout_secs, desired.timeout_secs
        ));
    }

    for (key, value) in &desired.environment {
        match current.environment.get(key) {
            None => drift.push(format!("env +{key}")),
            Some(existing) if existing != value => drift.push(format!("env ~{key}")),
            Some(_) => {}
        }
    }
    for key in current.environment.keys() {
        if !desired.environment.contains_key(key) {
            drift.push(format!("env -{key}"));
        }
    }

    drift
}

/// Pure function: Format a function plan for display.
pub fn format_function_plan(plan: &FunctionPlan) -> Vec<String> {
    match plan {
        FunctionPlan::Create { name } => vec![format!("+ Create function: {}", name)],
        FunctionPlan::Update { name, drift } => {
            let mut lines = vec![format!("~ Update function code: {}", name)];
            for line in drift {
                lines.push(format!("  ~ {}", line));
            }
            lines
        }
    }
}
