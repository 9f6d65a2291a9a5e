//! Smoke tester: re-queries every declared resource, never mutates.

use explorespeak_core::manifest::Manifest;
use explorespeak_core::provider::{
    FunctionProvider, FunctionStatus, GatewayProvider, TableProvider, TableStatus,
};
use explorespeak_core::report::{ResourceKind, SmokeReport};

use crate::config::Config;

const INVOKE_PAYLOAD: &[u8] = b"{}";

/// Checks that tables are active, functions are healthy and the API and its
/// path resources exist. Provider errors count as failed checks.
pub async fn run_smoke_tests<P>(provider: &P, manifest: &Manifest, config: &Config) -> SmokeReport
where
    P: TableProvider + FunctionProvider + GatewayProvider + ?Sized,
{
    let mut report = SmokeReport::default();

    for table in &manifest.tables {
        match provider.describe_table(&table.name).await {
            Ok(Some(state)) if state.status == TableStatus::Active => {
                report.pass(ResourceKind::Table, &table.name, "ACTIVE")
            }
            Ok(Some(state)) => report.fail(
                ResourceKind::Table,
                &table.name,
                format!("status {:?}", state.status),
            ),
            Ok(None) => report.fail(ResourceKind::Table, &table.name, "not found"),
            Err(e) => report.fail(ResourceKind::Table, &table.name, e.to_string()),
        }
    }

    for function in &manifest.functions {
        match provider.get_function(&function.name).await {
            Ok(Some(state)) if state.status != FunctionStatus::Failed => report.pass(
                ResourceKind::Function,
                &function.name,
                format!("{} ({})", state.runtime, state.arn),
            ),
            Ok(Some(_)) => report.fail(ResourceKind::Function, &function.name, "in failed state"),
            Ok(None) => report.fail(ResourceKind::Function, &function.name, "not found"),
            Err(e) => report.fail(ResourceKind::Function, &function.name, e.to_string()),
        }

        if config.invoke_functions {
            let name = format!("{} invoke", function.name);
            match provider.invoke(&function.name, INVOKE_PAYLOAD).await {
                Ok(invocation) => match invocation.function_error {
                    None => report.pass(
                        ResourceKind::Function,
                        name,
                        format!("status {}", invocation.status_code),
                    ),
                    Some(error) => report.fail(ResourceKind::Function, name, error),
                },
                Err(e) => report.fail(ResourceKind::Function, name, e.to_string()),
            }
        }
    }

    let api = match config.api_id.as_deref() {
        Some(id) => provider.get_api(id).await,
        None => provider.find_api_by_name(&manifest.api.name).await,
    };
    let api = match api {
        Ok(Some(api)) => {
            report.pass(ResourceKind::Api, &manifest.api.name, api.id.clone());
            Some(api)
        }
        Ok(None) => {
            report.fail(ResourceKind::Api, &manifest.api.name, "not found");
            None
        }
        Err(e) => {
            report.fail(ResourceKind::Api, &manifest.api.name, e.to_string());
            None
        }
    };

    let resources = match &api {
        Some(api) => provider.get_resources(&api.id).await.map_err(|e| e.to_string()),
        None => Err("API unavailable".to_string()),
    };
    for resource in &manifest.api.resources {
        let path = resource.full_path();
        match &resources {
            Ok(found) => match found.iter().find(|r| r.path == path) {
                Some(r) => report.pass(ResourceKind::Resource, path, r.id.clone()),
                None => report.fail(ResourceKind::Resource, path, "not found"),
            },
            Err(reason) => report.fail(ResourceKind::Resource, path, reason.clone()),
        }
    }

    tracing::info!(
        passed = report.passed(),
        total = report.total(),
        "Smoke tests finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::InMemoryCloud;
    use crate::reconcile::fixtures::{cloud_with_role, Workspace};
    use crate::reconcile::{reconcile_functions, reconcile_gateway, reconcile_tables};

    async fn provisioned(workspace: &Workspace) -> InMemoryCloud {
        let cloud = cloud_with_role(&workspace.manifest).await;
        reconcile_tables(&cloud, &workspace.manifest.tables, &workspace.config).await;
        reconcile_functions(&cloud, &workspace.manifest, &workspace.config)
            .await
            .unwrap();
        reconcile_gateway(&cloud, &workspace.manifest, &workspace.config)
            .await
            .unwrap();
        cloud
    }

    #[tokio::test]
    async fn test_everything_passes_after_provisioning() {
        let workspace = Workspace::new();
        let cloud = provisioned(&workspace).await;

        let report = run_smoke_tests(&cloud, &workspace.manifest, &workspace.config).await;

        assert!(report.all_passed(), "{:?}", report.checks);
        let manifest = &workspace.manifest;
        assert_eq!(
            report.total(),
            manifest.tables.len() + manifest.functions.len() + 1 + manifest.api.resources.len()
        );
    }

    #[tokio::test]
    async fn test_absent_resources_fail_without_error() {
        let workspace = Workspace::new();
        let cloud = InMemoryCloud::new();

        let report = run_smoke_tests(&cloud, &workspace.manifest, &workspace.config).await;

        assert_eq!(report.passed(), 0);
        let table = &workspace.manifest.tables[0].name;
        assert_eq!(
            report.check(ResourceKind::Table, table).unwrap().detail,
            "not found"
        );
        assert_eq!(
            report
                .check(ResourceKind::Resource, "/vocabulary")
                .unwrap()
                .detail,
            "API unavailable"
        );
    }

    #[tokio::test]
    async fn test_removed_table_fails_only_that_check() {
        let workspace = Workspace::new();
        let cloud = provisioned(&workspace).await;
        let removed = &workspace.manifest.tables[1].name;
        cloud.remove_table(removed).await;

        let report = run_smoke_tests(&cloud, &workspace.manifest, &workspace.config).await;

        assert!(!report.check(ResourceKind::Table, removed).unwrap().passed);
        assert_eq!(report.passed(), report.total() - 1);
    }

    #[tokio::test]
    async fn test_provider_errors_are_failed_checks() {
        let workspace = Workspace::new();
        let cloud = provisioned(&workspace).await;
        let function = &workspace.manifest.functions[0].name;
        cloud.fail_on("get_function", function).await;

        let report = run_smoke_tests(&cloud, &workspace.manifest, &workspace.config).await;

        let check = report.check(ResourceKind::Function, function).unwrap();
        assert!(!check.passed);
        assert!(check.detail.contains("Injected failure"));
    }

    #[tokio::test]
    async fn test_failed_function_state_fails() {
        let workspace = Workspace::new();
        let cloud = provisioned(&workspace).await;
        let function = &workspace.manifest.functions[2].name;
        cloud.set_function_status(function, FunctionStatus::Failed).await;

        let report = run_smoke_tests(&cloud, &workspace.manifest, &workspace.config).await;

        assert!(!report.check(ResourceKind::Function, function).unwrap().passed);
    }

    #[tokio::test]
    async fn test_invocations_report_function_errors() {
        let workspace = Workspace::new();
        let cloud = provisioned(&workspace).await;
        let config = workspace.config.clone().with_invocations(true);
        let broken = &workspace.manifest.functions[1].name;
        cloud.set_function_error(broken, "Unhandled").await;

        let report = run_smoke_tests(&cloud, &workspace.manifest, &config).await;

        assert_eq!(cloud.calls_to("invoke").await, workspace.manifest.functions.len());
        let check = report
            .check(ResourceKind::Function, &format!("{broken} invoke"))
            .unwrap();
        assert!(!check.passed);
        assert_eq!(check.detail, "Unhandled");
        assert_eq!(report.passed(), report.total() - 1);
    }

    #[tokio::test]
    async fn test_smoke_tests_do_not_mutate() {
        let workspace = Workspace::new();
        let cloud = provisioned(&workspace).await;
        let before = cloud.calls().await.len();

        run_smoke_tests(&cloud, &workspace.manifest, &workspace.config).await;

        let calls = cloud.calls().await;
        assert!(calls[before..].iter().all(|call| {
            ["describe_table", "get_function", "find_api_by_name", "get_resources"]
                .iter()
                .any(|read| call.starts_with(read))
        }));
    }
}
