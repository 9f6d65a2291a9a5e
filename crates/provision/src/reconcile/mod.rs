//! Reconcilers: observe provider state, plan, apply (Imperative Shell).
//!
//! Each component reconciles one resource type and returns a
//! [`PhaseReport`](explorespeak_core::report::PhaseReport). Independent
//! resources fail soft and are recorded; missing prerequisites return an
//! error that stops the phase.

mod deploy;
mod functions;
mod gateway;
mod plan;
mod smoke;
mod tables;

pub use deploy::{deploy, DeployOptions};
pub use functions::{plan_functions, reconcile_functions};
pub use gateway::{plan_gateway, reconcile_gateway, GatewayPreview};
pub use plan::{function_lines, plan_all, GatewayPlan, ProvisionPlan};
pub use smoke::run_smoke_tests;
pub use tables::{plan_tables, reconcile_tables};

use std::future::Future;

use explorespeak_core::provider::{self, ProviderError};

use crate::config::WaitPolicy;

/// Polls `check` until it reports ready, sleeping `policy.delay` between
/// attempts. Times out after `policy.attempts` checks.
async fn poll_until<F, Fut>(
    policy: WaitPolicy,
    kind: &'static str,
    id: &str,
    mut check: F,
) -> provider::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = provider::Result<bool>>,
{
    for attempt in 1..=policy.attempts {
        if check().await? {
            return Ok(());
        }
        tracing::debug!(kind, id, attempt, "Not ready yet");
        if attempt < policy.attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }
    Err(ProviderError::Timeout {
        kind,
        id: id.to_string(),
    })
}
