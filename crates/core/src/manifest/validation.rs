//! Manifest loading, overrides and validation.

use std::collections::{HashMap, HashSet};

use super::error::{ManifestError, Result};
use super::types::{CapacityMode, FunctionSpec, Manifest, ResourceSpec, TableSpec};

const MEMORY_RANGE_MB: std::ops::RangeInclusive<i32> = 128..=10_240;
const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<i32> = 1..=900;

impl Manifest {
    /// Parses a JSON manifest and validates it.
    pub fn from_json(source: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_json::from_str(source).map_err(|e| ManifestError::Parse(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Sets the execution role name.
    pub fn with_role_name(mut self, name: &str) -> Self {
        self.role_name = name.to_string();
        self
    }

    /// Sets the deployment stage name.
    pub fn with_stage(mut self, stage: &str) -> Self {
        self.api.stage = stage.to_string();
        self
    }

    /// Sets the REST API name used for lookup and creation.
    pub fn with_api_name(mut self, name: &str) -> Self {
        self.api.name = name.to_string();
        self
    }

    /// Looks up a declared function by name.
    pub fn function(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Checks every structural rule of the manifest.
    pub fn validate(&self) -> Result<()> {
        non_empty("role_name", &self.role_name)?;
        non_empty("api.name", &self.api.name)?;
        non_empty("api.stage", &self.api.stage)?;

        let mut table_names = HashSet::new();
        for table in &self.tables {
            validate_table(table)?;
            if !table_names.insert(table.name.as_str()) {
                return Err(duplicate("table", &table.name));
            }
        }

        let mut function_names = HashSet::new();
        for function in &self.functions {
            validate_function(function)?;
            if !function_names.insert(function.name.as_str()) {
                return Err(duplicate("function", &function.name));
            }
        }

        let mut paths = HashSet::new();
        for resource in &self.api.resources {
            validate_resource(resource, &function_names)?;
            let path = resource.full_path();
            if !paths.insert(path.clone()) {
                return Err(duplicate("resource", &path));
            }
        }

        Ok(())
    }
}

fn validate_table(table: &TableSpec) -> Result<()> {
    non_empty("table name", &table.name)?;
    non_empty("partition key", &table.partition_key.name)?;

    if let CapacityMode::Provisioned {
        read_units,
        write_units,
    } = table.capacity
    {
        if read_units <= 0 || write_units <= 0 {
            return Err(ManifestError::ZeroCapacity {
                table: table.name.clone(),
            });
        }
    }

    let mut attribute_types = HashMap::new();
    let keys = std::iter::once(&table.partition_key)
        .chain(table.sort_key.iter())
        .chain(table.indexes.iter().flat_map(|index| index.key_attributes()));
    for key in keys {
        let declared = attribute_types.entry(key.name.as_str()).or_insert(key.attribute_type);
        if *declared != key.attribute_type {
            return Err(ManifestError::ConflictingAttribute {
                table: table.name.clone(),
                attribute: key.name.clone(),
            });
        }
    }

    let mut index_names = HashSet::new();
    for index in &table.indexes {
        non_empty("index name", &index.name)?;
        if !index_names.insert(index.name.as_str()) {
            return Err(duplicate("index", &format!("{}.{}", table.name, index.name)));
        }
    }
    Ok(())
}

fn validate_function(function: &FunctionSpec) -> Result<()> {
    non_empty("function name", &function.name)?;
    let invalid = |reason: String| ManifestError::InvalidFunction {
        function: function.name.clone(),
        reason,
    };

    if function.source_dir.trim().is_empty() {
        return Err(invalid("source_dir must not be empty".to_string()));
    }
    if function.runtime.trim().is_empty() || function.handler.trim().is_empty() {
        return Err(invalid("runtime and handler are required".to_string()));
    }
    if !MEMORY_RANGE_MB.contains(&function.memory_mb) {
        return Err(invalid(format!(
            "memory {} MB outside {}..={}",
            function.memory_mb,
            MEMORY_RANGE_MB.start(),
            MEMORY_RANGE_MB.end()
        )));
    }
    if !TIMEOUT_RANGE_SECS.contains(&function.timeout_secs) {
        return Err(invalid(format!(
            "timeout {}s outside {}..={}",
            function.timeout_secs,
            TIMEOUT_RANGE_SECS.start(),
            TIMEOUT_RANGE_SECS.end()
        )));
    }
    Ok(())
}

fn validate_resource(resource: &ResourceSpec, functions: &HashSet<&str>) -> Result<()> {
    let path = resource.full_path();
    let invalid = |reason: &str| ManifestError::InvalidPath {
        path: path.clone(),
        reason: reason.to_string(),
    };

    if resource.path_part.is_empty() {
        return Err(invalid("empty path segment"));
    }
    if resource.path_part.contains('/') {
        return Err(invalid("path segment must not contain '/'"));
    }
    if let Some(parent) = &resource.parent {
        if !parent.starts_with('/') {
            return Err(invalid("parent must be an absolute path"));
        }
        if parent.len() > 1 && (parent.ends_with('/') || parent.contains("//")) {
            return Err(invalid("parent contains an empty segment"));
        }
    }

    let mut methods = HashSet::new();
    for binding in &resource.methods {
        if !methods.insert(binding.method) {
            return Err(duplicate("method", &format!("{} {}", binding.method, path)));
        }
        if !functions.contains(binding.function.as_str()) {
            return Err(ManifestError::UnknownFunction {
                method: binding.method.to_string(),
                path: path.clone(),
                function: binding.function.clone(),
            });
        }
    }
    Ok(())
}

fn non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ManifestError::EmptyField { field });
    }
    Ok(())
}

fn duplicate(kind: &'static str, name: &str) -> ManifestError {
    ManifestError::Duplicate {
        kind,
        name: name.to_string(),
    }
}
