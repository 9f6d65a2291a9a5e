//! In-memory cloud implementation.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use explorespeak_core::manifest::{join_path, FunctionSpec, HttpMethod, IndexSpec, TableSpec};
use explorespeak_core::provider::{
    FunctionProvider, FunctionState, FunctionStatus, GatewayProvider, GatewayResource, IndexState,
    IndexStatus, Invocation, InvokePermission, ProviderError, Result, RestApi, RoleProvider,
    TableProvider, TableState, TableStatus, UpdateStatus,
};

const ACCOUNT: &str = "123456789012";
const REGION: &str = "us-east-1";

#[derive(Debug, Clone)]
struct StoredTable {
    /// Describes left before the table reports ACTIVE.
    pending: u32,
    indexes: Vec<(String, u32)>,
}

#[derive(Debug, Clone)]
struct StoredFunction {
    state: FunctionState,
    code: Vec<u8>,
    code_updates: u32,
    /// Reads left before the last update reports as finished.
    pending: u32,
    permissions: BTreeMap<String, InvokePermission>,
    function_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct StoredApi {
    name: String,
    resources: Vec<GatewayResource>,
    integrations: HashMap<(String, HttpMethod), String>,
    method_responses: BTreeSet<(String, HttpMethod, String)>,
    integration_responses: BTreeMap<(String, HttpMethod, String), Option<String>>,
    deployments: Vec<(String, String)>,
}

impl StoredApi {
    fn resource_mut(&mut self, resource_id: &str) -> Result<&mut GatewayResource> {
        self.resources
            .iter_mut()
            .find(|r| r.id == resource_id)
            .ok_or_else(|| ProviderError::NotFound {
                kind: "Resource",
                id: resource_id.to_string(),
            })
    }

    fn require_method(&self, resource_id: &str, method: HttpMethod) -> Result<()> {
        let attached = self
            .resources
            .iter()
            .any(|r| r.id == resource_id && r.has_method(method.as_str()));
        if attached {
            Ok(())
        } else {
            Err(ProviderError::NotFound {
                kind: "Method",
                id: format!("{method} {resource_id}"),
            })
        }
    }
}

/// In-memory cloud backend for testing.
///
/// Every provider trait is served from maps wrapped in `Arc<RwLock<_>>`.
/// Tables and functions can be made to report "not ready" for a number of
/// polls, and any operation can be made to fail for a given resource id.
#[derive(Debug, Clone)]
pub struct InMemoryCloud {
    tables: Arc<RwLock<HashMap<String, StoredTable>>>,
    roles: Arc<RwLock<HashMap<String, String>>>,
    functions: Arc<RwLock<HashMap<String, StoredFunction>>>,
    apis: Arc<RwLock<BTreeMap<String, StoredApi>>>,
    failures: Arc<RwLock<HashSet<(&'static str, String)>>>,
    calls: Arc<RwLock<Vec<String>>>,
    next_id: Arc<AtomicU64>,
    settle_polls: u32,
}

impl Default for InMemoryCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCloud {
    /// Creates an empty cloud where everything becomes ready immediately.
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            roles: Arc::new(RwLock::new(HashMap::new())),
            functions: Arc::new(RwLock::new(HashMap::new())),
            apis: Arc::new(RwLock::new(BTreeMap::new())),
            failures: Arc::new(RwLock::new(HashSet::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            settle_polls: 0,
        }
    }

    /// New tables, indexes and function updates report "in progress" for
    /// this many reads before settling.
    pub fn with_settle_polls(mut self, polls: u32) -> Self {
        self.settle_polls = polls;
        self
    }

    /// Registers an execution role and returns its ARN.
    pub async fn add_role(&self, name: &str) -> String {
        let arn = format!("arn:aws:iam::{ACCOUNT}:role/{name}");
        self.roles.write().await.insert(name.to_string(), arn.clone());
        arn
    }

    /// Makes `operation` (a provider method name) fail for `id`.
    pub async fn fail_on(&self, operation: &'static str, id: &str) {
        self.failures
            .write()
            .await
            .insert((operation, id.to_string()));
    }

    /// Makes invocations of a function report a function error.
    pub async fn set_function_error(&self, name: &str, error: &str) {
        if let Some(function) = self.functions.write().await.get_mut(name) {
            function.function_error = Some(error.to_string());
        }
    }

    /// Sets a function's lifecycle state.
    pub async fn set_function_status(&self, name: &str, status: FunctionStatus) {
        if let Some(function) = self.functions.write().await.get_mut(name) {
            function.state.status = status;
        }
    }

    /// Removes a table as if it was deleted out of band.
    pub async fn remove_table(&self, name: &str) {
        self.tables.write().await.remove(name);
    }

    /// Every provider call so far, as `"operation id"`.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    /// Number of calls made to one operation.
    pub async fn calls_to(&self, operation: &str) -> usize {
        let prefix = format!("{operation} ");
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| call.starts_with(&prefix))
            .count()
    }

    pub async fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Index names of a stored table.
    pub async fn index_names(&self, table: &str) -> Vec<String> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.indexes.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    pub async fn function_state(&self, name: &str) -> Option<FunctionState> {
        self.functions
            .read()
            .await
            .get(name)
            .map(|f| f.state.clone())
    }

    /// Uploaded code and the number of code updates since creation.
    pub async fn function_code(&self, name: &str) -> Option<(Vec<u8>, u32)> {
        self.functions
            .read()
            .await
            .get(name)
            .map(|f| (f.code.clone(), f.code_updates))
    }

    pub async fn permissions(&self, function: &str) -> Vec<InvokePermission> {
        self.functions
            .read()
            .await
            .get(function)
            .map(|f| f.permissions.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn api_ids(&self) -> Vec<String> {
        self.apis.read().await.keys().cloned().collect()
    }

    /// Integration URI attached to a method, looked up by full path.
    pub async fn integration(
        &self,
        api_id: &str,
        path: &str,
        method: HttpMethod,
    ) -> Option<String> {
        let apis = self.apis.read().await;
        let api = apis.get(api_id)?;
        let resource = api.resources.iter().find(|r| r.path == path)?;
        api.integrations.get(&(resource.id.clone(), method)).cloned()
    }

    /// Status codes with both a method and an integration response.
    pub async fn response_codes(
        &self,
        api_id: &str,
        path: &str,
        method: HttpMethod,
    ) -> Vec<String> {
        let apis = self.apis.read().await;
        let Some(api) = apis.get(api_id) else {
            return Vec::new();
        };
        let Some(resource) = api.resources.iter().find(|r| r.path == path) else {
            return Vec::new();
        };
        api.method_responses
            .iter()
            .filter(|(id, m, _)| *id == resource.id && *m == method)
            .filter(|(id, m, code)| {
                api.integration_responses
                    .contains_key(&(id.clone(), *m, code.clone()))
            })
            .map(|(_, _, code)| code.clone())
            .collect()
    }

    /// Stage and description of every deployment of an API.
    pub async fn deployments(&self, api_id: &str) -> Vec<(String, String)> {
        self.apis
            .read()
            .await
            .get(api_id)
            .map(|api| api.deployments.clone())
            .unwrap_or_default()
    }

    async fn enter(&self, operation: &'static str, id: &str) -> Result<()> {
        self.calls.write().await.push(format!("{operation} {id}"));
        if self
            .failures
            .read()
            .await
            .contains(&(operation, id.to_string()))
        {
            return Err(ProviderError::Request(format!(
                "Injected failure: {operation} {id}"
            )));
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}{:06}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

#[async_trait]
impl TableProvider for InMemoryCloud {
    async fn describe_table(&self, name: &str) -> Result<Option<TableState>> {
        self.enter("describe_table", name).await?;
        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(name) else {
            return Ok(None);
        };

        let status = if table.pending > 0 {
            table.pending -= 1;
            TableStatus::Creating
        } else {
            TableStatus::Active
        };
        let indexes = table
            .indexes
            .iter_mut()
            .map(|(index, pending)| {
                let status = if *pending > 0 {
                    *pending -= 1;
                    IndexStatus::Creating
                } else {
                    IndexStatus::Active
                };
                IndexState {
                    name: index.clone(),
                    status,
                }
            })
            .collect();

        Ok(Some(TableState { status, indexes }))
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<()> {
        self.enter("create_table", &spec.name).await?;
        let mut tables = self.tables.write().await;
        if tables.contains_key(&spec.name) {
            return Err(ProviderError::AlreadyExists {
                kind: "Table",
                id: spec.name.clone(),
            });
        }
        tables.insert(
            spec.name.clone(),
            StoredTable {
                pending: self.settle_polls,
                indexes: spec
                    .indexes
                    .iter()
                    .map(|i| (i.name.clone(), self.settle_polls))
                    .collect(),
            },
        );
        Ok(())
    }

    async fn add_index(&self, table: &TableSpec, index: &IndexSpec) -> Result<()> {
        self.enter("add_index", &index.name).await?;
        let mut tables = self.tables.write().await;
        let stored = tables
            .get_mut(&table.name)
            .ok_or_else(|| ProviderError::NotFound {
                kind: "Table",
                id: table.name.clone(),
            })?;
        if stored.indexes.iter().any(|(name, _)| name == &index.name) {
            return Err(ProviderError::AlreadyExists {
                kind: "Index",
                id: index.name.clone(),
            });
        }
        stored.indexes.push((index.name.clone(), self.settle_polls));
        Ok(())
    }
}

#[async_trait]
impl RoleProvider for InMemoryCloud {
    async fn role_arn(&self, role_name: &str) -> Result<Option<String>> {
        self.enter("role_arn", role_name).await?;
        Ok(self.roles.read().await.get(role_name).cloned())
    }
}

#[async_trait]
impl FunctionProvider for InMemoryCloud {
    async fn get_function(&self, name: &str) -> Result<Option<FunctionState>> {
        self.enter("get_function", name).await?;
        let mut functions = self.functions.write().await;
        let Some(function) = functions.get_mut(name) else {
            return Ok(None);
        };

        let mut state = function.state.clone();
        if function.pending > 0 {
            function.pending -= 1;
            state.last_update = UpdateStatus::InProgress;
        }
        Ok(Some(state))
    }

    async fn create_function(
        &self,
        spec: &FunctionSpec,
        role_arn: &str,
        archive: &[u8],
    ) -> Result<FunctionState> {
        self.enter("create_function", &spec.name).await?;
        let mut functions = self.functions.write().await;
        if functions.contains_key(&spec.name) {
            return Err(ProviderError::AlreadyExists {
                kind: "Function",
                id: spec.name.clone(),
            });
        }

        let state = FunctionState {
            name: spec.name.clone(),
            arn: format!("arn:aws:lambda:{REGION}:{ACCOUNT}:function:{}", spec.name),
            role_arn: role_arn.to_string(),
            runtime: spec.runtime.clone(),
            handler: spec.handler.clone(),
            description: spec.description.clone(),
            environment: spec.environment.clone(),
            memory_mb: spec.memory_mb,
            timeout_secs: spec.timeout_secs,
            status: FunctionStatus::Active,
            last_update: UpdateStatus::Successful,
        };
        functions.insert(
            spec.name.clone(),
            StoredFunction {
                state: state.clone(),
                code: archive.to_vec(),
                code_updates: 0,
                pending: self.settle_polls,
                permissions: BTreeMap::new(),
                function_error: None,
            },
        );
        Ok(state)
    }

    async fn update_function_code(&self, name: &str, archive: &[u8]) -> Result<()> {
        self.enter("update_function_code", name).await?;
        let mut functions = self.functions.write().await;
        let function = functions.get_mut(name).ok_or_else(|| ProviderError::NotFound {
            kind: "Function",
            id: name.to_string(),
        })?;
        if function.pending > 0 {
            return Err(ProviderError::Conflict {
                kind: "Function",
                id: name.to_string(),
                message: "An update is in progress".to_string(),
            });
        }
        function.code = archive.to_vec();
        function.code_updates += 1;
        function.pending = self.settle_polls;
        Ok(())
    }

    async fn update_function_configuration(&self, spec: &FunctionSpec) -> Result<()> {
        self.enter("update_function_configuration", &spec.name).await?;
        let mut functions = self.functions.write().await;
        let function = functions
            .get_mut(&spec.name)
            .ok_or_else(|| ProviderError::NotFound {
                kind: "Function",
                id: spec.name.clone(),
            })?;
        if function.pending > 0 {
            return Err(ProviderError::Conflict {
                kind: "Function",
                id: spec.name.clone(),
                message: "An update is in progress".to_string(),
            });
        }
        let state = &mut function.state;
        state.runtime = spec.runtime.clone();
        state.handler = spec.handler.clone();
        state.description = spec.description.clone();
        state.environment = spec.environment.clone();
        state.memory_mb = spec.memory_mb;
        state.timeout_secs = spec.timeout_secs;
        function.pending = self.settle_polls;
        Ok(())
    }

    async fn invoke(&self, name: &str, _payload: &[u8]) -> Result<Invocation> {
        self.enter("invoke", name).await?;
        let functions = self.functions.read().await;
        let function = functions.get(name).ok_or_else(|| ProviderError::NotFound {
            kind: "Function",
            id: name.to_string(),
        })?;
        Ok(Invocation {
            status_code: 200,
            function_error: function.function_error.clone(),
        })
    }

    async fn add_permission(&self, permission: &InvokePermission) -> Result<()> {
        self.enter("add_permission", &permission.statement_id).await?;
        let mut functions = self.functions.write().await;
        let function = functions
            .get_mut(&permission.function_name)
            .ok_or_else(|| ProviderError::NotFound {
                kind: "Function",
                id: permission.function_name.clone(),
            })?;
        if function.permissions.contains_key(&permission.statement_id) {
            return Err(ProviderError::AlreadyExists {
                kind: "Permission",
                id: permission.statement_id.clone(),
            });
        }
        function
            .permissions
            .insert(permission.statement_id.clone(), permission.clone());
        Ok(())
    }
}

#[async_trait]
impl GatewayProvider for InMemoryCloud {
    async fn get_api(&self, api_id: &str) -> Result<Option<RestApi>> {
        self.enter("get_api", api_id).await?;
        Ok(self.apis.read().await.get(api_id).map(|api| RestApi {
            id: api_id.to_string(),
            name: api.name.clone(),
        }))
    }

    async fn find_api_by_name(&self, name: &str) -> Result<Option<RestApi>> {
        self.enter("find_api_by_name", name).await?;
        Ok(self
            .apis
            .read()
            .await
            .iter()
            .find(|(_, api)| api.name == name)
            .map(|(id, api)| RestApi {
                id: id.clone(),
                name: api.name.clone(),
            }))
    }

    async fn create_api(&self, name: &str, _description: &str) -> Result<RestApi> {
        self.enter("create_api", name).await?;
        let id = self.next_id("api");
        let root = GatewayResource {
            id: self.next_id("res"),
            parent_id: None,
            path: "/".to_string(),
            methods: Vec::new(),
        };
        self.apis.write().await.insert(
            id.clone(),
            StoredApi {
                name: name.to_string(),
                resources: vec![root],
                ..StoredApi::default()
            },
        );
        Ok(RestApi {
            id,
            name: name.to_string(),
        })
    }

    async fn get_resources(&self, api_id: &str) -> Result<Vec<GatewayResource>> {
        self.enter("get_resources", api_id).await?;
        self.apis
            .read()
            .await
            .get(api_id)
            .map(|api| api.resources.clone())
            .ok_or_else(|| ProviderError::NotFound {
                kind: "RestApi",
                id: api_id.to_string(),
            })
    }

    async fn create_resource(
        &self,
        api_id: &str,
        parent_id: &str,
        path_part: &str,
    ) -> Result<GatewayResource> {
        self.enter("create_resource", path_part).await?;
        let id = self.next_id("res");
        let mut apis = self.apis.write().await;
        let api = apis.get_mut(api_id).ok_or_else(|| ProviderError::NotFound {
            kind: "RestApi",
            id: api_id.to_string(),
        })?;

        let parent_path = api.resource_mut(parent_id)?.path.clone();
        let path = join_path(&parent_path, path_part);
        if api.resources.iter().any(|r| r.path == path) {
            return Err(ProviderError::AlreadyExists {
                kind: "Resource",
                id: path,
            });
        }

        let resource = GatewayResource {
            id,
            parent_id: Some(parent_id.to_string()),
            path,
            methods: Vec::new(),
        };
        api.resources.push(resource.clone());
        Ok(resource)
    }

    async fn put_method(&self, api_id: &str, resource_id: &str, method: HttpMethod) -> Result<()> {
        self.enter("put_method", &format!("{method} {resource_id}"))
            .await?;
        let mut apis = self.apis.write().await;
        let api = apis.get_mut(api_id).ok_or_else(|| ProviderError::NotFound {
            kind: "RestApi",
            id: api_id.to_string(),
        })?;
        let resource = api.resource_mut(resource_id)?;
        if resource.has_method(method.as_str()) {
            return Err(ProviderError::AlreadyExists {
                kind: "Method",
                id: format!("{method} {}", resource.path),
            });
        }
        resource.methods.push(method.as_str().to_string());
        Ok(())
    }

    async fn put_proxy_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        method: HttpMethod,
        uri: &str,
    ) -> Result<()> {
        self.enter("put_proxy_integration", &format!("{method} {resource_id}"))
            .await?;
        let mut apis = self.apis.write().await;
        let api = apis.get_mut(api_id).ok_or_else(|| ProviderError::NotFound {
            kind: "RestApi",
            id: api_id.to_string(),
        })?;
        api.require_method(resource_id, method)?;
        api.integrations
            .insert((resource_id.to_string(), method), uri.to_string());
        Ok(())
    }

    async fn put_method_response(
        &self,
        api_id: &str,
        resource_id: &str,
        method: HttpMethod,
        status_code: &str,
    ) -> Result<()> {
        self.enter(
            "put_method_response",
            &format!("{method} {resource_id} {status_code}"),
        )
        .await?;
        let mut apis = self.apis.write().await;
        let api = apis.get_mut(api_id).ok_or_else(|| ProviderError::NotFound {
            kind: "RestApi",
            id: api_id.to_string(),
        })?;
        api.require_method(resource_id, method)?;
        let key = (resource_id.to_string(), method, status_code.to_string());
        if !api.method_responses.insert(key) {
            return Err(ProviderError::AlreadyExists {
                kind: "MethodResponse",
                id: format!("{method} {resource_id} {status_code}"),
            });
        }
        Ok(())
    }

    async fn put_integration_response(
        &self,
        api_id: &str,
        resource_id: &str,
        method: HttpMethod,
        status_code: &str,
        selection_pattern: Option<&str>,
    ) -> Result<()> {
        self.enter(
            "put_integration_response",
            &format!("{method} {resource_id} {status_code}"),
        )
        .await?;
        let mut apis = self.apis.write().await;
        let api = apis.get_mut(api_id).ok_or_else(|| ProviderError::NotFound {
            kind: "RestApi",
            id: api_id.to_string(),
        })?;
        if !api
            .integrations
            .contains_key(&(resource_id.to_string(), method))
        {
            return Err(ProviderError::NotFound {
                kind: "Integration",
                id: format!("{method} {resource_id}"),
            });
        }
        api.integration_responses.insert(
            (resource_id.to_string(), method, status_code.to_string()),
            selection_pattern.map(str::to_string),
        );
        Ok(())
    }

    async fn create_deployment(
        &self,
        api_id: &str,
        stage: &str,
        description: &str,
    ) -> Result<String> {
        self.enter("create_deployment", api_id).await?;
        let id = self.next_id("dep");
        let mut apis = self.apis.write().await;
        let api = apis.get_mut(api_id).ok_or_else(|| ProviderError::NotFound {
            kind: "RestApi",
            id: api_id.to_string(),
        })?;
        api.deployments
            .push((stage.to_string(), description.to_string()));
        Ok(id)
    }
}
