//! Read-only preview of a full provisioning run.

use explorespeak_core::manifest::Manifest;
use explorespeak_core::planning::{format_function_plan, format_table_plan, FunctionPlan, TablePlan};
use explorespeak_core::provider::CloudProvider;
use serde::Serialize;

use super::{plan_functions, plan_gateway, plan_tables, GatewayPreview};
use crate::error::{ProvisionError, Result};

/// Planned changes for every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionPlan {
    /// ARN of the execution role, None when it does not exist.
    pub role_arn: Option<String>,
    pub tables: Vec<TablePlan>,
    pub functions: Vec<FunctionPlan>,
    pub gateway: GatewayPlan,
}

/// Gateway section of a plan. A supplied API id that does not resolve
/// halts the run at the gateway phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GatewayPlan {
    Ready(GatewayPreview),
    Halted { reason: String },
}

impl ProvisionPlan {
    /// Display lines for the table section.
    pub fn table_lines(&self) -> Vec<String> {
        self.tables.iter().flat_map(format_table_plan).collect()
    }

    /// Display lines for the function section, including the role check.
    pub fn function_lines(&self, role_name: &str) -> Vec<String> {
        function_lines(self.role_arn.as_deref(), role_name, &self.functions)
    }

    /// Display lines for the gateway section.
    pub fn gateway_lines(&self, api_name: &str, stage: &str) -> Vec<String> {
        match &self.gateway {
            GatewayPlan::Ready(preview) => preview.lines(api_name, stage),
            GatewayPlan::Halted { reason } => {
                vec![format!("- {}, provisioning halts here", reason)]
            }
        }
    }

    /// Reason the run would stop before the gateway is configured.
    pub fn halt_reason(&self) -> Option<&str> {
        match &self.gateway {
            GatewayPlan::Ready(_) => None,
            GatewayPlan::Halted { reason } => Some(reason),
        }
    }

    /// True when any table or gateway resource would be created or changed.
    /// Functions always get their code replaced.
    pub fn has_structural_changes(&self) -> bool {
        self.tables.iter().any(TablePlan::has_changes)
            || self
                .functions
                .iter()
                .any(|f| matches!(f, FunctionPlan::Create { .. }))
            || matches!(&self.gateway, GatewayPlan::Ready(preview) if preview.has_changes())
    }
}

/// Role check followed by one block per function plan.
pub fn function_lines(
    role_arn: Option<&str>,
    role_name: &str,
    functions: &[FunctionPlan],
) -> Vec<String> {
    let mut lines = match role_arn {
        Some(_) => vec![format!("= Role '{}' exists", role_name)],
        None => vec![format!("- Role '{}' not found, functions cannot deploy", role_name)],
    };
    lines.extend(functions.iter().flat_map(format_function_plan));
    lines
}

/// Computes every plan without changing anything.
pub async fn plan_all<C>(
    cloud: &C,
    manifest: &Manifest,
    api_id: Option<&str>,
) -> Result<ProvisionPlan>
where
    C: CloudProvider + ?Sized,
{
    Ok(ProvisionPlan {
        role_arn: cloud.role_arn(&manifest.role_name).await?,
        tables: plan_tables(cloud, &manifest.tables).await?,
        functions: plan_functions(cloud, &manifest.functions).await?,
        gateway: match plan_gateway(cloud, &manifest.api, api_id).await {
            Ok(preview) => GatewayPlan::Ready(preview),
            Err(e @ ProvisionError::ApiNotFound { .. }) => GatewayPlan::Halted {
                reason: e.to_string(),
            },
            Err(e) => return Err(e),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::InMemoryCloud;
    use crate::reconcile::fixtures::{cloud_with_role, Workspace};
    use crate::reconcile::{deploy, DeployOptions};

    #[tokio::test]
    async fn test_plan_for_empty_account() {
        let workspace = Workspace::new();
        let cloud = InMemoryCloud::new();

        let plan = plan_all(&cloud, &workspace.manifest, None).await.unwrap();

        assert_eq!(plan.role_arn, None);
        assert!(plan.has_structural_changes());
        let lines = plan.function_lines(&workspace.manifest.role_name);
        assert!(lines[0].starts_with("- Role"));
        let gateway = plan.gateway_lines("explorespeak-api", "prod");
        assert_eq!(gateway[0], "+ Create REST API: explorespeak-api");
        assert_eq!(gateway.last().unwrap(), "+ Deploy stage: prod");
        assert_eq!(cloud.calls_to("create_table").await, 0);
    }

    #[tokio::test]
    async fn test_unknown_api_id_is_planned_as_halt() {
        let workspace = Workspace::new();
        let cloud = cloud_with_role(&workspace.manifest).await;

        let plan = plan_all(&cloud, &workspace.manifest, Some("missing"))
            .await
            .unwrap();

        assert_eq!(plan.halt_reason(), Some("REST API 'missing' not found"));
        let lines = plan.gateway_lines("explorespeak-api", "prod");
        assert_eq!(lines, vec!["- REST API 'missing' not found, provisioning halts here"]);
        assert_eq!(plan.tables.len(), workspace.manifest.tables.len());
    }

    #[tokio::test]
    async fn test_plan_after_deploy_has_no_structural_changes() {
        let workspace = Workspace::new();
        let cloud = cloud_with_role(&workspace.manifest).await;
        deploy(
            &cloud,
            &workspace.manifest,
            &workspace.config,
            DeployOptions { skip_smoke: true },
        )
        .await;

        let plan = plan_all(&cloud, &workspace.manifest, None).await.unwrap();

        assert!(!plan.has_structural_changes());
        assert!(plan
            .table_lines()
            .iter()
            .all(|line| line.starts_with('=')));
    }
}
