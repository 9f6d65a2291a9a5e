//! The built-in ExploreSpeak environment.

use std::collections::BTreeMap;

use super::types::{
    ApiSpec, AttributeType, CapacityMode, FunctionSpec, HttpMethod, IndexSpec, KeyAttribute,
    Manifest, MethodBinding, Projection, ResourceSpec, TableSpec,
};

const VOCABULARY_TABLE: &str = "explorespeak-vocabulary";
const REVIEWS_TABLE: &str = "explorespeak-srs-reviews";
const PROGRESS_TABLE: &str = "explorespeak-learning-progress";
const PROFILES_TABLE: &str = "explorespeak-user-profiles";

const VOCABULARY_FUNCTION: &str = "explorespeak-vocabulary";
const SRS_FUNCTION: &str = "explorespeak-srs";
const ADAPTIVE_FUNCTION: &str = "explorespeak-adaptive-learning";

const NODE_RUNTIME: &str = "nodejs18.x";

/// Returns the canonical manifest for ExploreSpeak.
/// This is a pure function - no I/O.
pub fn explorespeak_manifest() -> Manifest {
    Manifest {
        tables: vec![
            TableSpec {
                name: VOCABULARY_TABLE.to_string(),
                partition_key: string_key("userId"),
                sort_key: Some(string_key("wordId")),
                indexes: vec![IndexSpec {
                    name: "language-index".to_string(),
                    partition_key: string_key("userId"),
                    sort_key: Some(string_key("language")),
                    projection: Projection::All,
                }],
                capacity: CapacityMode::PayPerRequest,
            },
            TableSpec {
                name: REVIEWS_TABLE.to_string(),
                partition_key: string_key("userId"),
                sort_key: Some(string_key("wordId")),
                indexes: vec![IndexSpec {
                    name: "due-index".to_string(),
                    partition_key: string_key("userId"),
                    sort_key: Some(KeyAttribute {
                        name: "nextReviewAt".to_string(),
                        attribute_type: AttributeType::Number,
                    }),
                    projection: Projection::All,
                }],
                capacity: CapacityMode::PayPerRequest,
            },
            TableSpec {
                name: PROGRESS_TABLE.to_string(),
                partition_key: string_key("userId"),
                sort_key: Some(string_key("skillId")),
                indexes: vec![],
                capacity: CapacityMode::PayPerRequest,
            },
            TableSpec {
                name: PROFILES_TABLE.to_string(),
                partition_key: string_key("userId"),
                sort_key: None,
                indexes: vec![],
                capacity: CapacityMode::PayPerRequest,
            },
        ],
        functions: vec![
            FunctionSpec {
                name: VOCABULARY_FUNCTION.to_string(),
                source_dir: "lambda/vocabulary".to_string(),
                runtime: NODE_RUNTIME.to_string(),
                handler: "index.handler".to_string(),
                description: "ExploreSpeak vocabulary management".to_string(),
                environment: env(&[("VOCABULARY_TABLE", VOCABULARY_TABLE)]),
                memory_mb: 256,
                timeout_secs: 30,
            },
            FunctionSpec {
                name: SRS_FUNCTION.to_string(),
                source_dir: "lambda/srs".to_string(),
                runtime: NODE_RUNTIME.to_string(),
                handler: "index.handler".to_string(),
                description: "ExploreSpeak spaced repetition scheduling".to_string(),
                environment: env(&[
                    ("VOCABULARY_TABLE", VOCABULARY_TABLE),
                    ("REVIEWS_TABLE", REVIEWS_TABLE),
                ]),
                memory_mb: 256,
                timeout_secs: 30,
            },
            FunctionSpec {
                name: ADAPTIVE_FUNCTION.to_string(),
                source_dir: "lambda/adaptive-learning".to_string(),
                runtime: NODE_RUNTIME.to_string(),
                handler: "index.handler".to_string(),
                description: "ExploreSpeak adaptive learning recommendations".to_string(),
                environment: env(&[
                    ("VOCABULARY_TABLE", VOCABULARY_TABLE),
                    ("REVIEWS_TABLE", REVIEWS_TABLE),
                    ("PROGRESS_TABLE", PROGRESS_TABLE),
                    ("PROFILES_TABLE", PROFILES_TABLE),
                ]),
                memory_mb: 512,
                timeout_secs: 60,
            },
        ],
        role_name: "explorespeak-lambda-execution-role".to_string(),
        api: ApiSpec {
            name: "explorespeak-api".to_string(),
            description: "ExploreSpeak learning API".to_string(),
            stage: "prod".to_string(),
            resources: vec![
                resource(
                    "vocabulary",
                    None,
                    &[
                        (HttpMethod::Get, VOCABULARY_FUNCTION),
                        (HttpMethod::Post, VOCABULARY_FUNCTION),
                    ],
                ),
                resource(
                    "{wordId}",
                    Some("/vocabulary"),
                    &[
                        (HttpMethod::Get, VOCABULARY_FUNCTION),
                        (HttpMethod::Put, VOCABULARY_FUNCTION),
                        (HttpMethod::Delete, VOCABULARY_FUNCTION),
                    ],
                ),
                resource("due", Some("/srs"), &[(HttpMethod::Get, SRS_FUNCTION)]),
                resource("review", Some("/srs"), &[(HttpMethod::Post, SRS_FUNCTION)]),
                resource(
                    "progress",
                    Some("/learning"),
                    &[(HttpMethod::Get, ADAPTIVE_FUNCTION)],
                ),
                resource(
                    "recommendations",
                    Some("/learning"),
                    &[(HttpMethod::Get, ADAPTIVE_FUNCTION)],
                ),
                resource(
                    "assessment",
                    Some("/learning"),
                    &[(HttpMethod::Post, ADAPTIVE_FUNCTION)],
                ),
            ],
        },
    }
}

fn string_key(name: &str) -> KeyAttribute {
    KeyAttribute {
        name: name.to_string(),
        attribute_type: AttributeType::String,
    }
}

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn resource(path_part: &str, parent: Option<&str>, methods: &[(HttpMethod, &str)]) -> ResourceSpec {
    ResourceSpec {
        path_part: path_part.to_string(),
        parent: parent.map(str::to_string),
        methods: methods
            .iter()
            .map(|(method, function)| MethodBinding {
                method: *method,
                function: function.to_string(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_binding_targets_a_declared_function() {
        let manifest = explorespeak_manifest();
        for resource in &manifest.api.resources {
            for binding in &resource.methods {
                assert!(
                    manifest.function(&binding.function).is_some(),
                    "{} has no function",
                    binding.function
                );
            }
        }
    }

    #[test]
    fn test_intermediate_paths_are_implicit() {
        let manifest = explorespeak_manifest();
        let paths: Vec<String> = manifest
            .api
            .resources
            .iter()
            .map(ResourceSpec::full_path)
            .collect();

        assert!(paths.contains(&"/srs/due".to_string()));
        assert!(!paths.contains(&"/srs".to_string()));
    }
}
