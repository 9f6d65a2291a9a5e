//! Pretty output formatting.

use explorespeak_core::manifest::Manifest;
use explorespeak_core::report::{DeployReport, Outcome, PhaseReport, SmokeReport, StepReport};

use crate::prelude::{p_b, p_c, p_g, p_m, p_plan, p_r, p_y};
use crate::reconcile::ProvisionPlan;

fn section(title: &str) -> String {
    format!("{}\n{}", p_c(title), "-".repeat(40))
}

fn plan_block(title: &str, lines: &[String]) -> String {
    let mut output = section(title);
    for line in lines {
        output.push('\n');
        output.push_str(&p_plan(line));
    }
    output
}

/// Format a full plan, one section per component.
pub fn format_plan(plan: &ProvisionPlan, manifest: &Manifest) -> String {
    [
        plan_block("TABLES", &plan.table_lines()),
        plan_block("FUNCTIONS", &plan.function_lines(&manifest.role_name)),
        plan_block(
            "GATEWAY",
            &plan.gateway_lines(&manifest.api.name, &manifest.api.stage),
        ),
    ]
    .join("\n\n")
}

/// Format one reconciled step.
pub fn format_step(step: &StepReport) -> String {
    let label = format!("{} {}", step.kind, step.name);
    match &step.outcome {
        Outcome::Created => format!("{} {}", p_g("+"), label),
        Outcome::Updated => format!("{} {}", p_y("~"), label),
        Outcome::Unchanged => format!("{} {}", p_b("="), label),
        Outcome::Skipped(reason) => format!("{} {} ({})", p_m("!"), label, reason),
        Outcome::Failed(reason) => format!("{} {}: {}", p_r("x"), label, p_r(reason)),
    }
}

/// Format a phase report with a closing tally.
pub fn format_phase(report: &PhaseReport) -> String {
    let mut output = section(&report.phase.to_string().to_uppercase());
    for step in &report.steps {
        output.push('\n');
        output.push_str(&format_step(step));
    }

    let failures = report.failures();
    let summary = format!(
        "{} created, {} updated, {} unchanged, {} failed",
        report.count(&Outcome::Created),
        report.count(&Outcome::Updated),
        report.count(&Outcome::Unchanged),
        failures
    );
    output.push('\n');
    output.push_str(&if failures == 0 {
        p_g(&summary)
    } else {
        p_r(&summary)
    });
    output
}

/// Format smoke test results.
pub fn format_smoke(report: &SmokeReport) -> String {
    let mut output = section("SMOKE TESTS");
    for check in &report.checks {
        let mark = if check.passed { p_g("PASS") } else { p_r("FAIL") };
        output.push_str(&format!(
            "\n{} {} {}: {}",
            mark, check.kind, check.name, check.detail
        ));
    }

    let summary = format!("{}/{} checks passed", report.passed(), report.total());
    output.push('\n');
    output.push_str(&if report.all_passed() {
        p_g(&summary)
    } else {
        p_r(&summary)
    });
    output
}

/// Format a full pipeline run.
pub fn format_deploy(report: &DeployReport) -> String {
    let mut blocks: Vec<String> = report.phases.iter().map(format_phase).collect();
    if let Some(smoke) = &report.smoke {
        blocks.push(format_smoke(smoke));
    }
    if let Some(reason) = &report.halted {
        blocks.push(p_r(&format!("Halted: {}", reason)));
    }
    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use explorespeak_core::report::{Phase, ResourceKind};

    #[test]
    fn test_format_phase_tally() {
        let mut report = PhaseReport::new(Phase::Tables);
        report.record(ResourceKind::Table, "vocabulary", Outcome::Created);
        report.record(ResourceKind::Table, "srs-reviews", Outcome::Unchanged);
        report.record(
            ResourceKind::Table,
            "user-profiles",
            Outcome::Failed("throttled".to_string()),
        );

        let output = format_phase(&report);

        assert!(output.starts_with(&p_c("TABLES")));
        assert!(output.contains("table vocabulary"));
        assert!(output.contains("table user-profiles: "));
        assert!(output.ends_with(&p_r("1 created, 0 updated, 1 unchanged, 1 failed")));
    }

    #[test]
    fn test_format_smoke_summary() {
        let mut report = SmokeReport::default();
        report.pass(ResourceKind::Table, "vocabulary", "ACTIVE");

        let output = format_smoke(&report);

        assert!(output.contains("table vocabulary: ACTIVE"));
        assert!(output.ends_with(&p_g("1/1 checks passed")));
    }

    #[test]
    fn test_format_deploy_shows_halt_reason() {
        let report = DeployReport {
            halted: Some("Execution role 'r' not found".to_string()),
            ..Default::default()
        };

        assert_eq!(
            format_deploy(&report),
            p_r("Halted: Execution role 'r' not found")
        );
    }
}
