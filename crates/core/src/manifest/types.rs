//! Declared resource types (Functional Core - pure data).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The complete desired state for one ExploreSpeak environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub tables: Vec<TableSpec>,
    pub functions: Vec<FunctionSpec>,
    /// Execution role shared by every declared function.
    pub role_name: String,
    pub api: ApiSpec,
}

/// Table schema configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub partition_key: KeyAttribute,
    #[serde(default)]
    pub sort_key: Option<KeyAttribute>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
    #[serde(default)]
    pub capacity: CapacityMode,
}

/// A key attribute definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
    pub name: String,
    #[serde(default)]
    pub attribute_type: AttributeType,
}

/// DynamoDB scalar attribute types usable in keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    #[default]
    #[serde(rename = "S")]
    String,
    #[serde(rename = "N")]
    Number,
    #[serde(rename = "B")]
    Binary,
}

impl AttributeType {
    /// Short DynamoDB notation used in plan output.
    pub fn code(&self) -> &'static str {
        match self {
            AttributeType::String => "S",
            AttributeType::Number => "N",
            AttributeType::Binary => "B",
        }
    }
}

/// Global secondary index configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub partition_key: KeyAttribute,
    #[serde(default)]
    pub sort_key: Option<KeyAttribute>,
    #[serde(default)]
    pub projection: Projection,
}

/// Index projection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    #[default]
    All,
    KeysOnly,
    Include(Vec<String>),
}

/// Capacity mode for a table and its indexes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityMode {
    #[default]
    PayPerRequest,
    Provisioned { read_units: i64, write_units: i64 },
}

impl fmt::Display for CapacityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityMode::PayPerRequest => write!(f, "PAY_PER_REQUEST"),
            CapacityMode::Provisioned {
                read_units,
                write_units,
            } => write!(f, "PROVISIONED (read {read_units}, write {write_units})"),
        }
    }
}

impl TableSpec {
    /// Sets the table name.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Every key attribute the table and its indexes reference, deduplicated
    /// by name in declaration order.
    pub fn key_attributes(&self) -> Vec<&KeyAttribute> {
        let mut attributes: Vec<&KeyAttribute> = Vec::new();
        let candidates = std::iter::once(&self.partition_key)
            .chain(self.sort_key.iter())
            .chain(
                self.indexes
                    .iter()
                    .flat_map(|index| std::iter::once(&index.partition_key).chain(&index.sort_key)),
            );
        for attribute in candidates {
            if !attributes.iter().any(|a| a.name == attribute.name) {
                attributes.push(attribute);
            }
        }
        attributes
    }
}

impl IndexSpec {
    /// Key attributes of this index alone.
    pub fn key_attributes(&self) -> Vec<&KeyAttribute> {
        std::iter::once(&self.partition_key)
            .chain(self.sort_key.iter())
            .collect()
    }
}

/// Serverless function configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    /// Directory packaged into the deployment archive. Relative paths are
    /// resolved against the source root given on the command line.
    pub source_dir: String,
    pub runtime: String,
    pub handler: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    pub memory_mb: i32,
    pub timeout_secs: i32,
}

/// REST API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub stage: String,
    pub resources: Vec<ResourceSpec>,
}

/// A path resource and the methods bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Single URL path segment, e.g. `vocabulary` or `{wordId}`.
    pub path_part: String,
    /// Full path of the parent resource; `None` attaches to the API root.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub methods: Vec<MethodBinding>,
}

impl ResourceSpec {
    /// Full path of this resource, e.g. `/vocabulary/{wordId}`.
    pub fn full_path(&self) -> String {
        join_path(self.parent.as_deref().unwrap_or("/"), &self.path_part)
    }
}

/// Binds an HTTP method to the function that serves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodBinding {
    pub method: HttpMethod,
    pub function: String,
}

/// HTTP methods a resource can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Any,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Any => "ANY",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Joins a parent path and a single segment.
pub fn join_path(parent: &str, segment: &str) -> String {
    if parent == "/" {
        format!("/{segment}")
    } else {
        format!("{parent}/{segment}")
    }
}

/// Returns the parent of a full path, `None` for the root itself.
pub fn parent_path(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> KeyAttribute {
        KeyAttribute {
            name: name.to_string(),
            attribute_type: AttributeType::String,
        }
    }

    #[test]
    fn test_key_attributes_are_deduplicated() {
        let table = TableSpec {
            name: "reviews".to_string(),
            partition_key: key("userId"),
            sort_key: Some(key("wordId")),
            indexes: vec![IndexSpec {
                name: "due-index".to_string(),
                partition_key: key("userId"),
                sort_key: Some(key("nextReviewAt")),
                projection: Projection::All,
            }],
            capacity: CapacityMode::PayPerRequest,
        };

        let names: Vec<&str> = table
            .key_attributes()
            .iter()
            .map(|a| a.name.as_str())
            .collect();

        assert_eq!(names, vec!["userId", "wordId", "nextReviewAt"]);
    }

    #[test]
    fn test_full_path_for_root_child() {
        let resource = ResourceSpec {
            path_part: "vocabulary".to_string(),
            parent: None,
            methods: vec![],
        };
        assert_eq!(resource.full_path(), "/vocabulary");
    }

    #[test]
    fn test_full_path_for_nested_resource() {
        let resource = ResourceSpec {
            path_part: "{wordId}".to_string(),
            parent: Some("/vocabulary".to_string()),
            methods: vec![],
        };
        assert_eq!(resource.full_path(), "/vocabulary/{wordId}");
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("/"), None);
        assert_eq!(parent_path("/srs"), Some("/"));
        assert_eq!(parent_path("/srs/due"), Some("/srs"));
    }

    #[test]
    fn test_capacity_mode_display() {
        assert_eq!(CapacityMode::PayPerRequest.to_string(), "PAY_PER_REQUEST");
        assert_eq!(
            CapacityMode::Provisioned {
                read_units: 5,
                write_units: 2
            }
            .to_string(),
            "PROVISIONED (read 5, write 2)"
        );
    }

    #[test]
    fn test_manifest_deserializes_from_json() {
        let json = r#"{
            "tables": [{
                "name": "words",
                "partition_key": { "name": "id" },
                "capacity": { "provisioned": { "read_units": 5, "write_units": 5 } }
            }],
            "functions": [],
            "role_name": "role",
            "api": { "name": "api", "stage": "dev", "resources": [
                { "path_part": "words", "methods": [{ "method": "GET", "function": "words" }] }
            ]}
        }"#;

        let manifest: Manifest = serde_json::from_str(json).unwrap();

        assert_eq!(manifest.tables[0].partition_key.attribute_type, AttributeType::String);
        assert_eq!(
            manifest.tables[0].capacity,
            CapacityMode::Provisioned {
                read_units: 5,
                write_units: 5
            }
        );
        assert_eq!(manifest.api.resources[0].methods[0].method, HttpMethod::Get);
    }
}
