//! Observed provider state, as reported by describe/list calls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Represents the current state of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    pub status: TableStatus,
    pub indexes: Vec<IndexState>,
}

impl TableState {
    /// A table is ready once it and every index are active.
    pub fn is_ready(&self) -> bool {
        self.status == TableStatus::Active
            && self.indexes.iter().all(|i| i.status == IndexStatus::Active)
    }
}

/// Table status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Active,
    Creating,
    Updating,
    Deleting,
    Other,
}

/// Index state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexState {
    pub name: String,
    pub status: IndexStatus,
}

/// Index status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Active,
    Creating,
    Updating,
    Deleting,
}

/// Deployed configuration of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionState {
    pub name: String,
    pub arn: String,
    pub role_arn: String,
    pub runtime: String,
    pub handler: String,
    pub description: String,
    pub environment: BTreeMap<String, String>,
    pub memory_mb: i32,
    pub timeout_secs: i32,
    pub status: FunctionStatus,
    pub last_update: UpdateStatus,
}

impl FunctionState {
    /// True when the function accepts further code or configuration updates.
    pub fn is_ready(&self) -> bool {
        self.status != FunctionStatus::Pending && self.last_update != UpdateStatus::InProgress
    }
}

/// Lifecycle state of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionStatus {
    Active,
    Pending,
    Inactive,
    Failed,
}

/// Outcome of the most recent code or configuration update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    Successful,
    InProgress,
    Failed,
}

/// Result of a synchronous function invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub status_code: i32,
    /// Set when the function itself raised, e.g. `Unhandled`.
    pub function_error: Option<String>,
}

/// Grants the gateway principal permission to invoke a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokePermission {
    pub function_name: String,
    pub statement_id: String,
    pub source_arn: String,
}

/// A REST API as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestApi {
    pub id: String,
    pub name: String,
}

/// A path resource as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResource {
    pub id: String,
    pub parent_id: Option<String>,
    /// Full path, `/` for the root.
    pub path: String,
    /// HTTP methods already attached, e.g. `GET`.
    pub methods: Vec<String>,
}

impl GatewayResource {
    /// True when the method is already attached to this resource.
    pub fn has_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_with_creating_index_is_not_ready() {
        let state = TableState {
            status: TableStatus::Active,
            indexes: vec![IndexState {
                name: "due-index".to_string(),
                status: IndexStatus::Creating,
            }],
        };
        assert!(!state.is_ready());
    }

    #[test]
    fn test_active_table_without_indexes_is_ready() {
        let state = TableState {
            status: TableStatus::Active,
            indexes: vec![],
        };
        assert!(state.is_ready());
    }

    #[test]
    fn test_resource_has_method() {
        let resource = GatewayResource {
            id: "abc".to_string(),
            parent_id: None,
            path: "/vocabulary".to_string(),
            methods: vec!["GET".to_string()],
        };
        assert!(resource.has_method("GET"));
        assert!(!resource.has_method("POST"));
    }
}
