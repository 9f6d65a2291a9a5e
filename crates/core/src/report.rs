//! Outcome reporting for provisioning phases and smoke checks.

use std::fmt;

use serde::Serialize;

/// Which component produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Tables,
    Functions,
    Gateway,
    Smoke,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Tables => "tables",
            Phase::Functions => "functions",
            Phase::Gateway => "gateway",
            Phase::Smoke => "smoke",
        };
        f.write_str(name)
    }
}

/// Kind of resource a step touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Table,
    Index,
    Role,
    Function,
    Api,
    Resource,
    Method,
    Permission,
    Deployment,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Table => "table",
            ResourceKind::Index => "index",
            ResourceKind::Role => "role",
            ResourceKind::Function => "function",
            ResourceKind::Api => "api",
            ResourceKind::Resource => "resource",
            ResourceKind::Method => "method",
            ResourceKind::Permission => "permission",
            ResourceKind::Deployment => "deployment",
        };
        f.write_str(name)
    }
}

/// Result of reconciling one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
    Skipped(String),
    Failed(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_) | Outcome::Skipped(_))
    }
}

/// One reconciled resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub kind: ResourceKind,
    pub name: String,
    pub outcome: Outcome,
}

/// Everything one phase did, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub steps: Vec<StepReport>,
}

impl PhaseReport {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, kind: ResourceKind, name: impl Into<String>, outcome: Outcome) {
        self.steps.push(StepReport {
            kind,
            name: name.into(),
            outcome,
        });
    }

    /// Outcome of the most recent step for a resource.
    pub fn outcome_of(&self, kind: ResourceKind, name: &str) -> Option<&Outcome> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.kind == kind && s.name == name)
            .map(|s| &s.outcome)
    }

    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_failure()).count()
    }

    pub fn count(&self, outcome: &Outcome) -> usize {
        self.steps.iter().filter(|s| &s.outcome == outcome).count()
    }
}

/// One smoke check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    pub kind: ResourceKind,
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// Aggregate smoke test result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SmokeReport {
    pub checks: Vec<Check>,
}

impl SmokeReport {
    pub fn pass(&mut self, kind: ResourceKind, name: impl Into<String>, detail: impl Into<String>) {
        self.push(kind, name.into(), true, detail.into());
    }

    pub fn fail(&mut self, kind: ResourceKind, name: impl Into<String>, detail: impl Into<String>) {
        self.push(kind, name.into(), false, detail.into());
    }

    fn push(&mut self, kind: ResourceKind, name: String, passed: bool, detail: String) {
        self.checks.push(Check {
            kind,
            name,
            passed,
            detail,
        });
    }

    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn total(&self) -> usize {
        self.checks.len()
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.total()
    }

    /// Result of the named check, if it ran.
    pub fn check(&self, kind: ResourceKind, name: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.kind == kind && c.name == name)
    }
}

/// Result of a full pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    pub phases: Vec<PhaseReport>,
    pub smoke: Option<SmokeReport>,
    /// Reason the pipeline stopped before running every phase.
    pub halted: Option<String>,
}

impl DeployReport {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    pub fn failures(&self) -> usize {
        let smoke_failures = self
            .smoke
            .as_ref()
            .map(|s| s.total() - s.passed())
            .unwrap_or(0);
        self.phases.iter().map(PhaseReport::failures).sum::<usize>() + smoke_failures
    }

    pub fn succeeded(&self) -> bool {
        self.halted.is_none() && self.failures() == 0
    }
}
