use async_trait::async_trait;

use crate::manifest::{FunctionSpec, HttpMethod, IndexSpec, TableSpec};

use super::{
    FunctionState, GatewayResource, Invocation, InvokePermission, RestApi, Result, TableState,
};

/// Table management operations.
#[async_trait]
pub trait TableProvider: Send + Sync {
    /// Fetches current table state, returns None if the table doesn't exist.
    async fn describe_table(&self, name: &str) -> Result<Option<TableState>>;

    /// Creates a table with its key schema and indexes.
    async fn create_table(&self, spec: &TableSpec) -> Result<()>;

    /// Adds one global secondary index to an existing table.
    async fn add_index(&self, table: &TableSpec, index: &IndexSpec) -> Result<()>;
}

/// Execution role lookups.
#[async_trait]
pub trait RoleProvider: Send + Sync {
    /// Resolves a role name to its ARN, returns None if the role doesn't exist.
    async fn role_arn(&self, role_name: &str) -> Result<Option<String>>;
}

/// Serverless function operations.
#[async_trait]
pub trait FunctionProvider: Send + Sync {
    /// Fetches the deployed function, returns None if it doesn't exist.
    async fn get_function(&self, name: &str) -> Result<Option<FunctionState>>;

    /// Creates a function from a zip archive with the full configuration.
    async fn create_function(
        &self,
        spec: &FunctionSpec,
        role_arn: &str,
        archive: &[u8],
    ) -> Result<FunctionState>;

    /// Replaces the code of an existing function.
    async fn update_function_code(&self, name: &str, archive: &[u8]) -> Result<()>;

    /// Updates runtime, handler, description, memory, timeout and environment.
    /// The role binding is left untouched.
    async fn update_function_configuration(&self, spec: &FunctionSpec) -> Result<()>;

    /// Invokes the function synchronously with the given payload.
    async fn invoke(&self, name: &str, payload: &[u8]) -> Result<Invocation>;

    /// Adds a resource-based permission statement to the function.
    async fn add_permission(&self, permission: &InvokePermission) -> Result<()>;
}

/// REST API gateway operations.
#[async_trait]
pub trait GatewayProvider: Send + Sync {
    /// Fetches an API by id, returns None if it doesn't exist.
    async fn get_api(&self, api_id: &str) -> Result<Option<RestApi>>;

    /// Finds the first API with the given name.
    async fn find_api_by_name(&self, name: &str) -> Result<Option<RestApi>>;

    /// Creates a regional REST API.
    async fn create_api(&self, name: &str, description: &str) -> Result<RestApi>;

    /// Lists every path resource of the API, root included.
    async fn get_resources(&self, api_id: &str) -> Result<Vec<GatewayResource>>;

    /// Creates a child path resource.
    async fn create_resource(
        &self,
        api_id: &str,
        parent_id: &str,
        path_part: &str,
    ) -> Result<GatewayResource>;

    /// Attaches a method with open authorization.
    async fn put_method(&self, api_id: &str, resource_id: &str, method: HttpMethod) -> Result<()>;

    /// Attaches (or replaces) a proxy integration to a function invocation URI.
    async fn put_proxy_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        method: HttpMethod,
        uri: &str,
    ) -> Result<()>;

    /// Declares a method response for a status code.
    async fn put_method_response(
        &self,
        api_id: &str,
        resource_id: &str,
        method: HttpMethod,
        status_code: &str,
    ) -> Result<()>;

    /// Declares an integration response for a status code.
    async fn put_integration_response(
        &self,
        api_id: &str,
        resource_id: &str,
        method: HttpMethod,
        status_code: &str,
        selection_pattern: Option<&str>,
    ) -> Result<()>;

    /// Creates a deployment snapshot under a stage, returns the deployment id.
    async fn create_deployment(&self, api_id: &str, stage: &str, description: &str)
        -> Result<String>;
}

/// Everything a full provisioning run needs.
pub trait CloudProvider: TableProvider + RoleProvider + FunctionProvider + GatewayProvider {}

impl<T> CloudProvider for T where
    T: TableProvider + RoleProvider + FunctionProvider + GatewayProvider
{
}
