//! Full pipeline: tables, functions, gateway, smoke tests.

use explorespeak_core::manifest::Manifest;
use explorespeak_core::provider::CloudProvider;
use explorespeak_core::report::DeployReport;

use super::{reconcile_functions, reconcile_gateway, reconcile_tables, run_smoke_tests};
use crate::config::Config;

/// Pipeline switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeployOptions {
    pub skip_smoke: bool,
}

/// Runs every phase in order. A hard stop in one phase halts the pipeline
/// and is recorded in [`DeployReport::halted`].
pub async fn deploy<C>(
    cloud: &C,
    manifest: &Manifest,
    config: &Config,
    options: DeployOptions,
) -> DeployReport
where
    C: CloudProvider + ?Sized,
{
    let mut report = DeployReport::default();

    report
        .phases
        .push(reconcile_tables(cloud, &manifest.tables, config).await);

    match reconcile_functions(cloud, manifest, config).await {
        Ok(phase) => report.phases.push(phase),
        Err(e) => {
            tracing::error!(error = %e, "Function deployment stopped, halting");
            report.halted = Some(e.to_string());
            return report;
        }
    }

    match reconcile_gateway(cloud, manifest, config).await {
        Ok(phase) => report.phases.push(phase),
        Err(e) => {
            tracing::error!(error = %e, "Gateway configuration stopped, halting");
            report.halted = Some(e.to_string());
            return report;
        }
    }

    if !options.skip_smoke {
        report.smoke = Some(run_smoke_tests(cloud, manifest, config).await);
    }

    report
}
