//! Declared desired state: the resources one provisioning run reconciles.

mod defaults;
mod error;
mod types;
mod validation;

pub use defaults::explorespeak_manifest;
pub use error::{ManifestError, Result};
pub use types::{
    join_path, parent_path, ApiSpec, AttributeType, CapacityMode, FunctionSpec, HttpMethod,
    IndexSpec, KeyAttribute, Manifest, MethodBinding, Projection, ResourceSpec, TableSpec,
};
