//! Pure functions for gateway resource trees and ARNs (Functional Core).

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::manifest::{parent_path, HttpMethod, ResourceSpec};
use crate::provider::GatewayResource;

/// Method and integration responses declared for every proxied method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseMapping {
    pub status_code: &'static str,
    pub selection_pattern: Option<&'static str>,
}

/// Success plus the client and server error classes.
pub const PROXY_RESPONSES: [ResponseMapping; 3] = [
    ResponseMapping {
        status_code: "200",
        selection_pattern: None,
    },
    ResponseMapping {
        status_code: "400",
        selection_pattern: Some(r".*4\d{2}.*"),
    },
    ResponseMapping {
        status_code: "500",
        selection_pattern: Some(r".*5\d{2}.*"),
    },
];

const STATEMENT_ID_MAX: usize = 100;
const STATEMENT_DIGEST_LEN: usize = 12;

/// A path resource that has to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedResource {
    pub path: String,
    pub parent_path: String,
    pub path_part: String,
}

/// Resource tree changes for one API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourcePlan {
    /// Id of the `/` resource, if the API reported one.
    pub root_id: Option<String>,
    /// Paths that already exist, mapped to their resource id.
    pub existing: BTreeMap<String, String>,
    /// Missing paths, parents before children.
    pub to_create: Vec<PlannedResource>,
}

/// What happens to one declared method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodAction {
    /// Method is missing and will be created.
    Create,
    /// Method exists; its integration, responses and permission are re-applied.
    Refresh,
}

/// Planned change for one declared method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodPlan {
    pub path: String,
    pub method: HttpMethod,
    pub function: String,
    pub action: MethodAction,
}

/// Pure function: every path the declared resources need, ancestors
/// included, ordered so parents come before children.
pub fn required_paths(resources: &[ResourceSpec]) -> Vec<String> {
    let mut paths = BTreeSet::new();
    for resource in resources {
        let mut current = resource.full_path();
        while current != "/" {
            let parent = parent_path(&current).unwrap_or("/").to_string();
            paths.insert(current);
            current = parent;
        }
    }

    let mut ordered: Vec<String> = paths.into_iter().collect();
    ordered.sort_by_key(|path| path.matches('/').count());
    ordered
}

/// Pure function: Calculate which path resources must be created.
pub fn plan_resources(desired: &[ResourceSpec], current: &[GatewayResource]) -> ResourcePlan {
    let existing: BTreeMap<String, String> = current
        .iter()
        .map(|r| (r.path.clone(), r.id.clone()))
        .collect();
    let root_id = existing.get("/").cloned();

    let to_create = required_paths(desired)
        .into_iter()
        .filter(|path| !existing.contains_key(path))
        .map(|path| {
            let parent_path = parent_path(&path).unwrap_or("/").to_string();
            let path_part = path.rsplit('/').next().unwrap_or_default().to_string();
            PlannedResource {
                path,
                parent_path,
                path_part,
            }
        })
        .collect();

    ResourcePlan {
        root_id,
        existing,
        to_create,
    }
}

/// Pure function: Calculate which methods are new and which are refreshed.
pub fn plan_methods(desired: &[ResourceSpec], current: &[GatewayResource]) -> Vec<MethodPlan> {
    desired
        .iter()
        .flat_map(|resource| {
            let path = resource.full_path();
            let remote = current.iter().find(|r| r.path == path);
            resource.methods.iter().map(move |binding| MethodPlan {
                path: path.clone(),
                method: binding.method,
                function: binding.function.clone(),
                action: match remote {
                    Some(r) if r.has_method(binding.method.as_str()) => MethodAction::Refresh,
                    _ => MethodAction::Create,
                },
            })
        })
        .collect()
}

/// Components of an ARN: `arn:partition:service:region:account:resource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArnParts<'a> {
    pub partition: &'a str,
    pub service: &'a str,
    pub region: &'a str,
    pub account: &'a str,
    pub resource: &'a str,
}

impl<'a> ArnParts<'a> {
    /// Parses an ARN, returns None when it is malformed.
    pub fn parse(arn: &'a str) -> Option<Self> {
        let mut parts = arn.splitn(6, ':');
        if parts.next()? != "arn" {
            return None;
        }
        let parsed = Self {
            partition: parts.next()?,
            service: parts.next()?,
            region: parts.next()?,
            account: parts.next()?,
            resource: parts.next()?,
        };
        if parsed.partition.is_empty() || parsed.service.is_empty() || parsed.resource.is_empty()
        {
            return None;
        }
        Some(parsed)
    }
}

/// Pure function: Lambda proxy integration URI for a function ARN.
pub fn integration_uri(function_arn: &str) -> Option<String> {
    let arn = ArnParts::parse(function_arn)?;
    Some(format!(
        "arn:{}:apigateway:{}:lambda:path/2015-03-31/functions/{}/invocations",
        arn.partition, arn.region, function_arn
    ))
}

/// Pure function: execute-api ARN scoping an invoke permission to one
/// method and path. Path parameters become wildcards.
pub fn execute_api_source_arn(
    function_arn: &str,
    api_id: &str,
    method: HttpMethod,
    path: &str,
) -> Option<String> {
    let arn = ArnParts::parse(function_arn)?;
    let method = match method {
        HttpMethod::Any => "*",
        other => other.as_str(),
    };
    let path: String = path
        .split('/')
        .map(|segment| if segment.starts_with('{') { "*" } else { segment })
        .collect::<Vec<_>>()
        .join("/");
    Some(format!(
        "arn:{}:execute-api:{}:{}:{}/*/{}{}",
        arn.partition, arn.region, arn.account, api_id, method, path
    ))
}

/// Pure function: deterministic statement id for an invoke permission, so
/// re-runs hit the existing statement instead of adding a new one.
///
/// The readable prefix is lossy, so a digest of the exact method and path
/// keeps ids distinct per route.
pub fn permission_statement_id(api_id: &str, method: HttpMethod, path: &str) -> String {
    let raw = format!("apigateway-{}-{}-{}", api_id, method, path);
    let mut prefix = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' { c } else { '-' };
        if !(c == '-' && prefix.ends_with('-')) {
            prefix.push(c);
        }
    }
    let prefix: String = prefix
        .trim_end_matches('-')
        .chars()
        .take(STATEMENT_ID_MAX - STATEMENT_DIGEST_LEN - 1)
        .collect();

    let digest = hex::encode(Sha256::digest(format!("{} {}", method, path).as_bytes()));
    format!("{}-{}", prefix, &digest[..STATEMENT_DIGEST_LEN])
}

/// Pure function: Format the resource and method plans for display.
pub fn format_gateway_plan(plan: &ResourcePlan, methods: &[MethodPlan]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut paths: Vec<&str> = plan.to_create.iter().map(|r| r.path.as_str()).collect();
    for method in methods {
        if !paths.contains(&method.path.as_str()) {
            paths.push(&method.path);
        }
    }

    for path in paths {
        if plan.to_create.iter().any(|r| r.path == path) {
            lines.push(format!("+ Create resource: {}", path));
        } else {
            lines.push(format!("= Resource '{}' exists", path));
        }
        for method in methods.iter().filter(|m| m.path == path) {
            match method.action {
                MethodAction::Create => {
                    lines.push(format!("  + {} -> {}", method.method, method.function))
                }
                MethodAction::Refresh => lines.push(format!(
                    "  ~ {} -> {} (refresh integration)",
                    method.method, method.function
                )),
            }
        }
    }
    lines
}
