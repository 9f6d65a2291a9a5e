//! Function deployer.

use explorespeak_core::manifest::{FunctionSpec, Manifest};
use explorespeak_core::planning::{plan_function, FunctionPlan};
use explorespeak_core::provider::{
    self, FunctionProvider, FunctionStatus, ProviderError, RoleProvider, UpdateStatus,
};
use explorespeak_core::report::{Outcome, Phase, PhaseReport, ResourceKind};

use super::poll_until;
use crate::archive::Archive;
use crate::config::{Config, WaitPolicy};
use crate::error::{ProvisionError, Result};

/// Computes the plan for every declared function without changing anything.
pub async fn plan_functions<P>(
    provider: &P,
    functions: &[FunctionSpec],
) -> provider::Result<Vec<FunctionPlan>>
where
    P: FunctionProvider + ?Sized,
{
    let mut plans = Vec::with_capacity(functions.len());
    for spec in functions {
        let current = provider.get_function(&spec.name).await?;
        plans.push(plan_function(current.as_ref(), spec));
    }
    Ok(plans)
}

/// Packages and deploys every declared function.
///
/// Returns an error without touching any function when the execution role
/// cannot be resolved. Per-function failures are recorded in the report.
pub async fn reconcile_functions<P>(
    provider: &P,
    manifest: &Manifest,
    config: &Config,
) -> Result<PhaseReport>
where
    P: RoleProvider + FunctionProvider + ?Sized,
{
    let role_arn = provider
        .role_arn(&manifest.role_name)
        .await?
        .ok_or_else(|| ProvisionError::RoleNotFound {
            role_name: manifest.role_name.clone(),
        })?;
    tracing::info!(role = %manifest.role_name, arn = %role_arn, "Resolved execution role");

    let mut report = PhaseReport::new(Phase::Functions);
    report.record(ResourceKind::Role, &manifest.role_name, Outcome::Unchanged);

    for spec in &manifest.functions {
        match deploy_function(provider, spec, &role_arn, config).await {
            Ok(outcome) => report.record(ResourceKind::Function, &spec.name, outcome),
            Err(e) => {
                tracing::error!(function = %spec.name, error = %e, "Failed to deploy function");
                report.record(
                    ResourceKind::Function,
                    &spec.name,
                    Outcome::Failed(e.to_string()),
                );
            }
        }
    }

    Ok(report)
}

/// Creates or updates one function. The archive is removed when this
/// returns, whatever the result.
async fn deploy_function<P>(
    provider: &P,
    spec: &FunctionSpec,
    role_arn: &str,
    config: &Config,
) -> Result<Outcome>
where
    P: FunctionProvider + ?Sized,
{
    let archive = Archive::from_dir(&config.source_path(&spec.source_dir), &config.archive_dir)?;
    let code = archive.bytes()?;
    tracing::debug!(function = %spec.name, bytes = code.len(), "Packaged function");

    let current = provider.get_function(&spec.name).await?;
    match plan_function(current.as_ref(), spec) {
        FunctionPlan::Create { .. } => {
            tracing::info!(function = %spec.name, "Creating function");
            provider.create_function(spec, role_arn, &code).await?;
            wait_for_function(provider, &spec.name, config.function_wait).await?;
            Ok(Outcome::Created)
        }
        FunctionPlan::Update { drift, .. } => {
            wait_for_function(provider, &spec.name, config.function_wait).await?;

            tracing::info!(function = %spec.name, "Updating function code");
            provider.update_function_code(&spec.name, &code).await?;
            wait_for_function(provider, &spec.name, config.function_wait).await?;

            if !drift.is_empty() {
                tracing::info!(
                    function = %spec.name,
                    drift = ?drift,
                    "Updating function configuration"
                );
                provider.update_function_configuration(spec).await?;
                wait_for_function(provider, &spec.name, config.function_wait).await?;
            }
            Ok(Outcome::Updated)
        }
    }
}

async fn wait_for_function<P>(provider: &P, name: &str, wait: WaitPolicy) -> provider::Result<()>
where
    P: FunctionProvider + ?Sized,
{
    poll_until(wait, "Function", name, || async move {
        match provider.get_function(name).await? {
            Some(state) if state.status == FunctionStatus::Failed => Err(ProviderError::Request(
                format!("Function '{name}' is in a failed state"),
            )),
            Some(state) if state.last_update == UpdateStatus::Failed => Err(
                ProviderError::Request(format!("Last update of function '{name}' failed")),
            ),
            Some(state) => Ok(state.is_ready()),
            None => Ok(false),
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::inmemory::InMemoryCloud;
    use crate::reconcile::fixtures::{cloud_with_role, Workspace};

    #[tokio::test]
    async fn test_creates_functions_with_shared_role() {
        let workspace = Workspace::new();
        let cloud = cloud_with_role(&workspace.manifest).await;

        let report = reconcile_functions(&cloud, &workspace.manifest, &workspace.config)
            .await
            .unwrap();

        assert_eq!(report.failures(), 0);
        for spec in &workspace.manifest.functions {
            assert_eq!(
                report.outcome_of(ResourceKind::Function, &spec.name),
                Some(&Outcome::Created)
            );
            let state = cloud.function_state(&spec.name).await.unwrap();
            assert!(state.role_arn.ends_with(&workspace.manifest.role_name));
            assert_eq!(state.environment, spec.environment);
        }
    }

    #[tokio::test]
    async fn test_missing_role_deploys_nothing() {
        let workspace = Workspace::new();
        let cloud = InMemoryCloud::new();

        let result = reconcile_functions(&cloud, &workspace.manifest, &workspace.config).await;

        assert!(matches!(result, Err(ProvisionError::RoleNotFound { .. })));
        assert_eq!(cloud.calls_to("create_function").await, 0);
        assert_eq!(cloud.calls_to("get_function").await, 0);
    }

    #[tokio::test]
    async fn test_update_keeps_name_and_role() {
        let workspace = Workspace::new();
        let cloud = cloud_with_role(&workspace.manifest).await;
        let spec = &workspace.manifest.functions[0];
        cloud
            .create_function(spec, "arn:aws:iam::123456789012:role/legacy-role", b"old")
            .await
            .unwrap();

        let report = reconcile_functions(&cloud, &workspace.manifest, &workspace.config)
            .await
            .unwrap();

        assert_eq!(
            report.outcome_of(ResourceKind::Function, &spec.name),
            Some(&Outcome::Updated)
        );
        let state = cloud.function_state(&spec.name).await.unwrap();
        assert_eq!(state.name, spec.name);
        assert_eq!(state.role_arn, "arn:aws:iam::123456789012:role/legacy-role");
        let (code, updates) = cloud.function_code(&spec.name).await.unwrap();
        assert_eq!(updates, 1);
        assert_ne!(code, b"old".to_vec());
        assert_eq!(cloud.calls_to("update_function_configuration").await, 0);
    }

    #[tokio::test]
    async fn test_configuration_drift_is_applied_after_code() {
        let workspace = Workspace::new();
        let cloud = cloud_with_role(&workspace.manifest)
            .await
            .with_settle_polls(1);
        let spec = &workspace.manifest.functions[0];
        let mut stale = spec.clone();
        stale.memory_mb = 128;
        cloud.create_function(&stale, "arn:role", b"old").await.unwrap();

        let report = reconcile_functions(&cloud, &workspace.manifest, &workspace.config)
            .await
            .unwrap();

        assert_eq!(report.failures(), 0);
        let state = cloud.function_state(&spec.name).await.unwrap();
        assert_eq!(state.memory_mb, spec.memory_mb);
        let calls = cloud.calls().await;
        let code_at = calls
            .iter()
            .position(|c| c == &format!("update_function_code {}", spec.name))
            .unwrap();
        let config_at = calls
            .iter()
            .position(|c| c == &format!("update_function_configuration {}", spec.name))
            .unwrap();
        assert!(code_at < config_at);
    }

    #[tokio::test]
    async fn test_failed_function_state_is_reported_as_failure() {
        let workspace = Workspace::new();
        let cloud = cloud_with_role(&workspace.manifest).await;
        let broken = &workspace.manifest.functions[0];
        cloud.create_function(broken, "arn:role", b"old").await.unwrap();
        cloud
            .set_function_status(&broken.name, FunctionStatus::Failed)
            .await;

        let report = reconcile_functions(&cloud, &workspace.manifest, &workspace.config)
            .await
            .unwrap();

        assert!(matches!(
            report.outcome_of(ResourceKind::Function, &broken.name),
            Some(Outcome::Failed(message)) if message.contains("failed state")
        ));
        assert_eq!(report.failures(), 1);
        for spec in &workspace.manifest.functions[1..] {
            assert_eq!(
                report.outcome_of(ResourceKind::Function, &spec.name),
                Some(&Outcome::Created)
            );
        }
    }

    #[tokio::test]
    async fn test_missing_source_fails_only_that_function() {
        let workspace = Workspace::new();
        let cloud = cloud_with_role(&workspace.manifest).await;
        let broken = &workspace.manifest.functions[0];
        fs::remove_dir_all(workspace.dir.path().join(&broken.source_dir)).unwrap();

        let report = reconcile_functions(&cloud, &workspace.manifest, &workspace.config)
            .await
            .unwrap();

        assert!(matches!(
            report.outcome_of(ResourceKind::Function, &broken.name),
            Some(Outcome::Failed(message)) if message.contains("does not exist")
        ));
        for spec in &workspace.manifest.functions[1..] {
            assert_eq!(
                report.outcome_of(ResourceKind::Function, &spec.name),
                Some(&Outcome::Created)
            );
        }
    }

    #[tokio::test]
    async fn test_archive_removed_after_failed_upload() {
        let workspace = Workspace::new();
        let cloud = cloud_with_role(&workspace.manifest).await;
        let spec = &workspace.manifest.functions[0];
        cloud.fail_on("create_function", &spec.name).await;

        let report = reconcile_functions(&cloud, &workspace.manifest, &workspace.config)
            .await
            .unwrap();

        assert!(matches!(
            report.outcome_of(ResourceKind::Function, &spec.name),
            Some(Outcome::Failed(_))
        ));
        assert_eq!(workspace.leftover_archives(), 0);
    }

    #[tokio::test]
    async fn test_plan_functions() {
        let workspace = Workspace::new();
        let cloud = InMemoryCloud::new();
        let spec = &workspace.manifest.functions[0];
        cloud.create_function(spec, "arn:role", b"v1").await.unwrap();

        let plans = plan_functions(&cloud, &workspace.manifest.functions)
            .await
            .unwrap();

        assert_eq!(
            plans[0],
            FunctionPlan::Update {
                name: spec.name.clone(),
                drift: vec![],
            }
        );
        assert!(matches!(plans[1], FunctionPlan::Create { .. }));
    }
}
