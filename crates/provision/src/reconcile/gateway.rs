//! Gateway configurator.

use std::collections::BTreeMap;

use explorespeak_core::manifest::{ApiSpec, Manifest};
use explorespeak_core::planning::{
    execute_api_source_arn, format_gateway_plan, integration_uri, permission_statement_id,
    plan_methods, plan_resources, MethodAction, MethodPlan, ResourcePlan, PROXY_RESPONSES,
};
use explorespeak_core::provider::{
    self, FunctionProvider, GatewayProvider, InvokePermission, ProviderError, RestApi,
};
use explorespeak_core::report::{Outcome, Phase, PhaseReport, ResourceKind};
use serde::Serialize;

use crate::config::Config;
use crate::error::{ProvisionError, Result};

/// Read-only view of what the gateway configurator would do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayPreview {
    /// The API that would be configured, None when it would be created.
    pub api: Option<RestApi>,
    pub resources: ResourcePlan,
    pub methods: Vec<MethodPlan>,
}

impl GatewayPreview {
    /// Display lines: the API, its resource plan and the stage deployment.
    pub fn lines(&self, api_name: &str, stage: &str) -> Vec<String> {
        let mut lines = match &self.api {
            Some(api) => vec![format!("= REST API '{}' ({})", api.name, api.id)],
            None => vec![format!("+ Create REST API: {}", api_name)],
        };
        lines.extend(format_gateway_plan(&self.resources, &self.methods));
        lines.push(format!("+ Deploy stage: {}", stage));
        lines
    }

    pub fn has_changes(&self) -> bool {
        self.api.is_none()
            || !self.resources.to_create.is_empty()
            || self.methods.iter().any(|m| m.action == MethodAction::Create)
    }
}

/// Computes resource and method plans without changing anything.
pub async fn plan_gateway<P>(
    provider: &P,
    api: &ApiSpec,
    api_id: Option<&str>,
) -> Result<GatewayPreview>
where
    P: GatewayProvider + ?Sized,
{
    let existing = lookup_api(provider, api, api_id).await?;
    let current = match &existing {
        Some(found) => provider.get_resources(&found.id).await?,
        None => Vec::new(),
    };

    Ok(GatewayPreview {
        resources: plan_resources(&api.resources, &current),
        methods: plan_methods(&api.resources, &current),
        api: existing,
    })
}

/// Ensures the REST API, its path resources, methods, integrations and
/// invoke permissions exist, then deploys the stage.
///
/// Returns an error when a supplied API id does not exist or the API has no
/// root resource. Everything below the API fails soft.
pub async fn reconcile_gateway<P>(
    provider: &P,
    manifest: &Manifest,
    config: &Config,
) -> Result<PhaseReport>
where
    P: GatewayProvider + FunctionProvider + ?Sized,
{
    let spec = &manifest.api;
    let mut report = PhaseReport::new(Phase::Gateway);

    let api = match lookup_api(provider, spec, config.api_id.as_deref()).await? {
        Some(api) => {
            tracing::info!(api = %api.name, id = %api.id, "Using existing REST API");
            report.record(ResourceKind::Api, &api.name, Outcome::Unchanged);
            api
        }
        None => {
            tracing::info!(api = %spec.name, "Creating REST API");
            let api = provider.create_api(&spec.name, &spec.description).await?;
            report.record(ResourceKind::Api, &api.name, Outcome::Created);
            api
        }
    };

    let current = provider.get_resources(&api.id).await?;
    let plan = plan_resources(&spec.resources, &current);
    if plan.root_id.is_none() {
        return Err(ProvisionError::MissingRootResource { api_id: api.id });
    }
    let methods = plan_methods(&spec.resources, &current);

    let resource_ids = ensure_resources(provider, &api.id, plan, &mut report).await;

    for method in &methods {
        configure_method(provider, &api.id, method, &resource_ids, &mut report).await;
    }

    let description = format!("Deployed {}", chrono::Utc::now().to_rfc3339());
    match provider
        .create_deployment(&api.id, &spec.stage, &description)
        .await
    {
        Ok(deployment_id) => {
            tracing::info!(stage = %spec.stage, deployment = %deployment_id, "Deployed stage");
            report.record(ResourceKind::Deployment, &spec.stage, Outcome::Created);
        }
        Err(e) => {
            tracing::error!(stage = %spec.stage, error = %e, "Failed to deploy stage");
            report.record(
                ResourceKind::Deployment,
                &spec.stage,
                Outcome::Failed(e.to_string()),
            );
        }
    }

    Ok(report)
}

/// Resolves the API by id (which must exist) or by name (which may not).
async fn lookup_api<P>(
    provider: &P,
    spec: &ApiSpec,
    api_id: Option<&str>,
) -> Result<Option<RestApi>>
where
    P: GatewayProvider + ?Sized,
{
    match api_id {
        Some(id) => match provider.get_api(id).await? {
            Some(api) => Ok(Some(api)),
            None => Err(ProvisionError::ApiNotFound {
                api_id: id.to_string(),
            }),
        },
        None => Ok(provider.find_api_by_name(&spec.name).await?),
    }
}

/// Creates missing path resources, parents first. Returns every usable
/// path mapped to its resource id.
async fn ensure_resources<P>(
    provider: &P,
    api_id: &str,
    plan: ResourcePlan,
    report: &mut PhaseReport,
) -> BTreeMap<String, String>
where
    P: GatewayProvider + ?Sized,
{
    let mut ids = plan.existing;

    for path in ids.keys().filter(|path| path.as_str() != "/") {
        report.record(ResourceKind::Resource, path, Outcome::Unchanged);
    }

    for planned in plan.to_create {
        let Some(parent_id) = ids.get(&planned.parent_path).cloned() else {
            tracing::warn!(
                path = %planned.path,
                parent = %planned.parent_path,
                "Skipping resource"
            );
            report.record(
                ResourceKind::Resource,
                &planned.path,
                Outcome::Skipped(format!("parent '{}' is unavailable", planned.parent_path)),
            );
            continue;
        };

        tracing::info!(path = %planned.path, "Creating resource");
        match provider
            .create_resource(api_id, &parent_id, &planned.path_part)
            .await
        {
            Ok(resource) => {
                ids.insert(planned.path.clone(), resource.id);
                report.record(ResourceKind::Resource, &planned.path, Outcome::Created);
            }
            Err(e) if e.is_already_exists() => {
                match find_resource_id(provider, api_id, &planned.path).await {
                    Some(id) => {
                        ids.insert(planned.path.clone(), id);
                        report.record(ResourceKind::Resource, &planned.path, Outcome::Unchanged);
                    }
                    None => report.record(
                        ResourceKind::Resource,
                        &planned.path,
                        Outcome::Failed(e.to_string()),
                    ),
                }
            }
            Err(e) => {
                tracing::error!(path = %planned.path, error = %e, "Failed to create resource");
                report.record(
                    ResourceKind::Resource,
                    &planned.path,
                    Outcome::Failed(e.to_string()),
                );
            }
        }
    }

    ids
}

async fn find_resource_id<P>(provider: &P, api_id: &str, path: &str) -> Option<String>
where
    P: GatewayProvider + ?Sized,
{
    provider
        .get_resources(api_id)
        .await
        .ok()?
        .into_iter()
        .find(|r| r.path == path)
        .map(|r| r.id)
}

/// Attaches one method with its integration, responses and permission.
/// Records a method step and a permission step.
async fn configure_method<P>(
    provider: &P,
    api_id: &str,
    method: &MethodPlan,
    resource_ids: &BTreeMap<String, String>,
    report: &mut PhaseReport,
) where
    P: GatewayProvider + FunctionProvider + ?Sized,
{
    let step = format!("{} {}", method.method, method.path);

    let Some(resource_id) = resource_ids.get(&method.path) else {
        report.record(
            ResourceKind::Method,
            &step,
            Outcome::Skipped(format!("resource '{}' is unavailable", method.path)),
        );
        return;
    };

    let function_arn = match provider.get_function(&method.function).await {
        Ok(Some(function)) => function.arn,
        Ok(None) => {
            tracing::error!(method = %step, function = %method.function, "Function not deployed");
            report.record(
                ResourceKind::Method,
                &step,
                Outcome::Failed(format!("function '{}' is not deployed", method.function)),
            );
            return;
        }
        Err(e) => {
            report.record(ResourceKind::Method, &step, Outcome::Failed(e.to_string()));
            return;
        }
    };

    tracing::info!(method = %step, function = %method.function, "Configuring method");
    let outcome = match attach_method(provider, api_id, resource_id, method, &function_arn).await {
        Ok(()) if method.action == MethodAction::Create => Outcome::Created,
        Ok(()) => Outcome::Updated,
        Err(e) => {
            tracing::error!(method = %step, error = %e, "Failed to configure method");
            Outcome::Failed(e.to_string())
        }
    };
    report.record(ResourceKind::Method, &step, outcome);

    let outcome = match grant_invoke(provider, api_id, method, &function_arn).await {
        Ok(true) => Outcome::Created,
        Ok(false) => Outcome::Unchanged,
        Err(e) => {
            tracing::error!(method = %step, error = %e, "Failed to grant invoke permission");
            Outcome::Failed(e.to_string())
        }
    };
    report.record(ResourceKind::Permission, &step, outcome);
}

async fn attach_method<P>(
    provider: &P,
    api_id: &str,
    resource_id: &str,
    method: &MethodPlan,
    function_arn: &str,
) -> provider::Result<()>
where
    P: GatewayProvider + ?Sized,
{
    let uri = integration_uri(function_arn).ok_or_else(|| {
        ProviderError::Request(format!("Malformed function ARN '{function_arn}'"))
    })?;

    if method.action == MethodAction::Create {
        tolerate_existing(provider.put_method(api_id, resource_id, method.method).await)?;
    }
    provider
        .put_proxy_integration(api_id, resource_id, method.method, &uri)
        .await?;

    for response in PROXY_RESPONSES {
        tolerate_existing(
            provider
                .put_method_response(api_id, resource_id, method.method, response.status_code)
                .await,
        )?;
        provider
            .put_integration_response(
                api_id,
                resource_id,
                method.method,
                response.status_code,
                response.selection_pattern,
            )
            .await?;
    }
    Ok(())
}

/// Returns true when a new statement was added.
async fn grant_invoke<P>(
    provider: &P,
    api_id: &str,
    method: &MethodPlan,
    function_arn: &str,
) -> provider::Result<bool>
where
    P: FunctionProvider + ?Sized,
{
    let source_arn = execute_api_source_arn(function_arn, api_id, method.method, &method.path)
        .ok_or_else(|| {
            ProviderError::Request(format!("Malformed function ARN '{function_arn}'"))
        })?;
    let permission = InvokePermission {
        function_name: method.function.clone(),
        statement_id: permission_statement_id(api_id, method.method, &method.path),
        source_arn,
    };
    tolerate_existing(provider.add_permission(&permission).await)
}

/// Treats "already exists" as success. Returns true when something was added.
fn tolerate_existing(result: provider::Result<()>) -> provider::Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_already_exists() => Ok(false),
        Err(e) => Err(e),
    }
}
