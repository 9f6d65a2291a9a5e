//! Command execution: load the manifest, show the plan, confirm, apply.

use std::path::Path;

use dialoguer::Confirm;
use explorespeak_core::manifest::{explorespeak_manifest, Manifest};
use explorespeak_core::planning::{format_table_plan, TablePlan};
use explorespeak_core::provider::CloudProvider;
use explorespeak_core::report::{DeployReport, PhaseReport};
use serde::Serialize;

use crate::aws::AwsCloud;
use crate::cli::{Cli, Commands, DeployArgs, FunctionsArgs, GatewayArgs, Global, OutputFormat};
use crate::config::{AwsConfig, Config};
use crate::error::{ProvisionError, Result};
use crate::output::{format_output, pretty};
use crate::prelude::*;
use crate::reconcile::{
    deploy, function_lines, plan_all, plan_functions, plan_gateway, plan_tables,
    reconcile_functions, reconcile_gateway, reconcile_tables, run_smoke_tests, DeployOptions,
};

/// Main entry point for the CLI.
pub async fn run(cli: Cli) -> Result<()> {
    let global = cli.global;
    let manifest = load_manifest(global.manifest.as_deref())?;
    let config = Config::from_env();
    let aws_config = AwsConfig {
        endpoint_url: global.endpoint_url.clone(),
        region: global.region.clone(),
    };

    if is_chatty(&global) {
        aprintln!("{} {}", p_b("Target:"), aws_config.target_display());
        aprintln!();
    }

    let cloud = AwsCloud::connect(&aws_config).await;

    match cli.command {
        Commands::Plan { api_id } => run_plan(&cloud, &manifest, api_id.as_deref(), &global).await,
        Commands::Tables => run_tables(&cloud, &manifest, &config, &global).await,
        Commands::Functions(args) => {
            let (manifest, config) = apply_function_args(manifest, config, &args);
            run_functions(&cloud, &manifest, &config, &global).await
        }
        Commands::Gateway(args) => {
            let (manifest, config) = apply_gateway_args(manifest, config, &args);
            run_gateway(&cloud, &manifest, &config, &global).await
        }
        Commands::Smoke(args) => {
            let config = config.with_api_id(args.api_id).with_invocations(args.invoke);
            run_smoke(&cloud, &manifest, &config, &global).await
        }
        Commands::Deploy(args) => {
            let (manifest, config) = apply_deploy_args(manifest, config, &args);
            let options = DeployOptions {
                skip_smoke: args.skip_smoke,
            };
            run_deploy(&cloud, &manifest, &config, options, &global).await
        }
    }
}

/// Reads a JSON manifest, or returns the built-in one.
fn load_manifest(path: Option<&Path>) -> Result<Manifest> {
    match path {
        Some(path) => {
            let source = std::fs::read_to_string(path)?;
            tracing::debug!(path = %path.display(), "Loaded manifest");
            Ok(Manifest::from_json(&source)?)
        }
        None => Ok(explorespeak_manifest()),
    }
}

fn apply_function_args(
    mut manifest: Manifest,
    mut config: Config,
    args: &FunctionsArgs,
) -> (Manifest, Config) {
    if let Some(role_name) = &args.role_name {
        manifest = manifest.with_role_name(role_name);
    }
    if let Some(root) = &args.source_root {
        config = config.with_source_root(root);
    }
    (manifest, config)
}

fn apply_gateway_args(
    mut manifest: Manifest,
    config: Config,
    args: &GatewayArgs,
) -> (Manifest, Config) {
    if let Some(api_name) = &args.api_name {
        manifest = manifest.with_api_name(api_name);
    }
    if let Some(stage) = &args.stage {
        manifest = manifest.with_stage(stage);
    }
    (manifest, config.with_api_id(args.api_id.clone()))
}

fn apply_deploy_args(manifest: Manifest, config: Config, args: &DeployArgs) -> (Manifest, Config) {
    let (manifest, config) = apply_function_args(manifest, config, &args.functions);
    let (manifest, config) = apply_gateway_args(manifest, config, &args.gateway);
    (manifest, config.with_invocations(args.invoke))
}

/// Human-readable progress goes to stdout only in pretty mode.
fn is_chatty(global: &Global) -> bool {
    !global.is_silent() && global.format == OutputFormat::Pretty
}

fn print_plan(global: &Global, title: &str, lines: &[String]) {
    if !is_chatty(global) {
        return;
    }
    aprintln!("{}", p_c(title));
    for line in lines {
        aprintln!("  {}", p_plan(line));
    }
    aprintln!();
}

fn confirm(global: &Global) -> Result<()> {
    if global.force {
        return Ok(());
    }

    let confirmed = Confirm::new()
        .with_prompt("Apply these changes?")
        .default(true)
        .interact()
        .map_err(|e| ProvisionError::Prompt(e.to_string()))?;

    if !confirmed {
        if !global.is_silent() {
            aeprintln!("{}", p_r("Cancelled, nothing was changed."));
        }
        return Err(ProvisionError::UserCancelled);
    }
    Ok(())
}

fn emit<T, F>(global: &Global, value: &T, render: F)
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    if global.is_silent() && global.format == OutputFormat::Pretty {
        return;
    }
    aprintln!("{}", format_output(value, global.format, render));
}

fn check_phase(report: &PhaseReport) -> Result<()> {
    match report.failures() {
        0 => Ok(()),
        failures => Err(ProvisionError::Incomplete { failures }),
    }
}

fn check_deploy(report: &DeployReport) -> Result<()> {
    if let Some(reason) = &report.halted {
        tracing::warn!(reason = %reason, "Provisioning halted");
        return Err(ProvisionError::Halted {
            reason: reason.clone(),
        });
    }
    match report.failures() {
        0 => Ok(()),
        failures => Err(ProvisionError::Incomplete { failures }),
    }
}

async fn run_plan<C>(
    cloud: &C,
    manifest: &Manifest,
    api_id: Option<&str>,
    global: &Global,
) -> Result<()>
where
    C: CloudProvider + ?Sized,
{
    manifest.validate()?;
    let plan = plan_all(cloud, manifest, api_id).await?;
    emit(global, &plan, |plan| pretty::format_plan(plan, manifest));
    Ok(())
}

async fn run_tables<C>(
    cloud: &C,
    manifest: &Manifest,
    config: &Config,
    global: &Global,
) -> Result<()>
where
    C: CloudProvider + ?Sized,
{
    manifest.validate()?;
    let plans = plan_tables(cloud, &manifest.tables).await?;
    let lines: Vec<String> = plans.iter().flat_map(format_table_plan).collect();
    print_plan(global, "Table Plan:", &lines);

    if plans.iter().any(TablePlan::has_changes) {
        confirm(global)?;
    }

    let report = reconcile_tables(cloud, &manifest.tables, config).await;
    emit(global, &report, pretty::format_phase);
    check_phase(&report)
}

async fn run_functions<C>(
    cloud: &C,
    manifest: &Manifest,
    config: &Config,
    global: &Global,
) -> Result<()>
where
    C: CloudProvider + ?Sized,
{
    manifest.validate()?;
    let role_arn = cloud.role_arn(&manifest.role_name).await?;
    let plans = plan_functions(cloud, &manifest.functions).await?;
    print_plan(
        global,
        "Function Plan:",
        &function_lines(role_arn.as_deref(), &manifest.role_name, &plans),
    );
    confirm(global)?;

    let report = reconcile_functions(cloud, manifest, config).await?;
    emit(global, &report, pretty::format_phase);
    check_phase(&report)
}

async fn run_gateway<C>(
    cloud: &C,
    manifest: &Manifest,
    config: &Config,
    global: &Global,
) -> Result<()>
where
    C: CloudProvider + ?Sized,
{
    manifest.validate()?;
    let preview = plan_gateway(cloud, &manifest.api, config.api_id.as_deref()).await?;
    print_plan(
        global,
        "Gateway Plan:",
        &preview.lines(&manifest.api.name, &manifest.api.stage),
    );
    confirm(global)?;

    let report = reconcile_gateway(cloud, manifest, config).await?;
    emit(global, &report, pretty::format_phase);
    check_phase(&report)
}

async fn run_smoke<C>(
    cloud: &C,
    manifest: &Manifest,
    config: &Config,
    global: &Global,
) -> Result<()>
where
    C: CloudProvider + ?Sized,
{
    manifest.validate()?;
    let report = run_smoke_tests(cloud, manifest, config).await;
    emit(global, &report, pretty::format_smoke);
    match report.total() - report.passed() {
        0 => Ok(()),
        failures => Err(ProvisionError::Incomplete { failures }),
    }
}

async fn run_deploy<C>(
    cloud: &C,
    manifest: &Manifest,
    config: &Config,
    options: DeployOptions,
    global: &Global,
) -> Result<()>
where
    C: CloudProvider + ?Sized,
{
    manifest.validate()?;
    let plan = plan_all(cloud, manifest, config.api_id.as_deref()).await?;
    if is_chatty(global) {
        aprintln!("{}", pretty::format_plan(&plan, manifest));
        aprintln!();
    }
    if let Some(reason) = plan.halt_reason() {
        if !global.is_silent() {
            aeprintln!("{} {}", p_y("Warning:"), reason);
        }
    }
    confirm(global)?;

    if is_chatty(global) {
        aprintln!("{}", p_b("Applying changes..."));
    }
    let report = deploy(cloud, manifest, config, options).await;
    emit(global, &report, pretty::format_deploy);
    check_deploy(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::InMemoryCloud;
    use crate::reconcile::fixtures::{cloud_with_role, Workspace};

    fn forced() -> Global {
        Global {
            silent: true,
            verbose: false,
            format: OutputFormat::Pretty,
            region: "us-east-1".to_string(),
            endpoint_url: None,
            manifest: None,
            force: true,
        }
    }

    #[test]
    fn test_load_builtin_manifest() {
        let manifest = load_manifest(None).unwrap();
        assert_eq!(manifest, explorespeak_manifest());
    }

    #[test]
    fn test_load_manifest_file_is_validated() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut manifest = explorespeak_manifest();
        manifest.role_name = String::new();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, serde_json::to_string(&manifest).unwrap()).unwrap();

        let result = load_manifest(Some(&path));

        assert!(matches!(result, Err(ProvisionError::Manifest(_))));
    }

    #[test]
    fn test_deploy_args_override_manifest() {
        let args = DeployArgs {
            functions: FunctionsArgs {
                role_name: Some("other-role".to_string()),
                source_root: Some("/srv/app".into()),
            },
            gateway: GatewayArgs {
                api_id: Some("abc123".to_string()),
                api_name: None,
                stage: Some("dev".to_string()),
            },
            skip_smoke: false,
            invoke: true,
        };

        let (manifest, config) =
            apply_deploy_args(explorespeak_manifest(), Config::from_env(), &args);

        assert_eq!(manifest.role_name, "other-role");
        assert_eq!(manifest.api.stage, "dev");
        assert_eq!(manifest.api.name, explorespeak_manifest().api.name);
        assert_eq!(config.source_root, std::path::PathBuf::from("/srv/app"));
        assert_eq!(config.api_id.as_deref(), Some("abc123"));
        assert!(config.invoke_functions);
    }

    #[tokio::test]
    async fn test_run_deploy_succeeds_with_force() {
        let workspace = Workspace::new();
        let cloud = cloud_with_role(&workspace.manifest).await;

        let result = run_deploy(
            &cloud,
            &workspace.manifest,
            &workspace.config,
            DeployOptions::default(),
            &forced(),
        )
        .await;

        assert!(result.is_ok(), "{result:?}");
        assert_eq!(cloud.deployments(&cloud.api_ids().await[0]).await.len(), 1);
    }

    #[tokio::test]
    async fn test_run_deploy_reports_halt() {
        let workspace = Workspace::new();
        let cloud = InMemoryCloud::new();

        let result = run_deploy(
            &cloud,
            &workspace.manifest,
            &workspace.config,
            DeployOptions::default(),
            &forced(),
        )
        .await;

        assert!(matches!(result, Err(ProvisionError::Halted { .. })));
    }

    #[tokio::test]
    async fn test_run_deploy_unknown_api_id_halts_after_functions() {
        let workspace = Workspace::new();
        let cloud = cloud_with_role(&workspace.manifest).await;
        let config = workspace
            .config
            .clone()
            .with_api_id(Some("missing".to_string()));

        let result = run_deploy(
            &cloud,
            &workspace.manifest,
            &config,
            DeployOptions::default(),
            &forced(),
        )
        .await;

        assert!(matches!(
            result,
            Err(ProvisionError::Halted { ref reason }) if reason.contains("'missing' not found")
        ));
        assert_eq!(
            cloud.table_names().await.len(),
            workspace.manifest.tables.len()
        );
        assert_eq!(
            cloud.calls_to("create_function").await,
            workspace.manifest.functions.len()
        );
        assert_eq!(cloud.calls_to("create_deployment").await, 0);
    }

    #[tokio::test]
    async fn test_run_tables_reports_failures() {
        let workspace = Workspace::new();
        let cloud = InMemoryCloud::new();
        cloud
            .fail_on("create_table", &workspace.manifest.tables[0].name)
            .await;

        let result = run_tables(&cloud, &workspace.manifest, &workspace.config, &forced()).await;

        assert!(matches!(
            result,
            Err(ProvisionError::Incomplete { failures: 1 })
        ));
        assert_eq!(
            cloud.table_names().await.len(),
            workspace.manifest.tables.len() - 1
        );
    }

    #[tokio::test]
    async fn test_run_smoke_fails_on_empty_account() {
        let workspace = Workspace::new();
        let cloud = InMemoryCloud::new();

        let result = run_smoke(&cloud, &workspace.manifest, &workspace.config, &forced()).await;

        assert!(matches!(result, Err(ProvisionError::Incomplete { .. })));
    }

    #[tokio::test]
    async fn test_run_plan_is_read_only() {
        let workspace = Workspace::new();
        let cloud = cloud_with_role(&workspace.manifest).await;

        run_plan(&cloud, &workspace.manifest, None, &forced())
            .await
            .unwrap();

        assert!(cloud.calls().await.iter().all(|call| {
            ["describe_table", "role_arn", "get_function", "find_api_by_name"]
                .iter()
                .any(|read| call.starts_with(read))
        }));
    }
}
