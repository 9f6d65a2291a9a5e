//! Table provisioner.

use explorespeak_core::manifest::{IndexSpec, TableSpec};
use explorespeak_core::planning::{plan_table, TablePlan};
use explorespeak_core::provider::{self, TableProvider};
use explorespeak_core::report::{Outcome, Phase, PhaseReport, ResourceKind};

use super::poll_until;
use crate::config::{Config, WaitPolicy};

/// Computes the plan for every declared table without changing anything.
pub async fn plan_tables<P>(
    provider: &P,
    tables: &[TableSpec],
) -> provider::Result<Vec<TablePlan>>
where
    P: TableProvider + ?Sized,
{
    let mut plans = Vec::with_capacity(tables.len());
    for spec in tables {
        let current = provider.describe_table(&spec.name).await?;
        plans.push(plan_table(current.as_ref(), spec));
    }
    Ok(plans)
}

/// Ensures every declared table exists with its indexes.
///
/// Creates are issued for all missing tables first, then each created table
/// is awaited. A failure on one table is recorded and the rest continue.
pub async fn reconcile_tables<P>(
    provider: &P,
    tables: &[TableSpec],
    config: &Config,
) -> PhaseReport
where
    P: TableProvider + ?Sized,
{
    let mut report = PhaseReport::new(Phase::Tables);
    let mut created = Vec::new();

    for spec in tables {
        let current = match provider.describe_table(&spec.name).await {
            Ok(current) => current,
            Err(e) => {
                tracing::error!(table = %spec.name, error = %e, "Failed to describe table");
                report.record(
                    ResourceKind::Table,
                    &spec.name,
                    Outcome::Failed(e.to_string()),
                );
                continue;
            }
        };

        match plan_table(current.as_ref(), spec) {
            TablePlan::Create { .. } => {
                tracing::info!(table = %spec.name, "Creating table");
                match provider.create_table(spec).await {
                    Ok(()) => created.push(spec),
                    Err(e) if e.is_already_exists() => {
                        tracing::info!(table = %spec.name, "Table appeared concurrently");
                        report.record(ResourceKind::Table, &spec.name, Outcome::Unchanged);
                    }
                    Err(e) => {
                        tracing::error!(table = %spec.name, error = %e, "Failed to create table");
                        report.record(
                            ResourceKind::Table,
                            &spec.name,
                            Outcome::Failed(e.to_string()),
                        );
                    }
                }
            }
            TablePlan::AddIndexes { indexes, .. } => {
                let outcome =
                    add_indexes(provider, spec, &indexes, config.table_wait, &mut report).await;
                report.record(ResourceKind::Table, &spec.name, outcome);
            }
            TablePlan::NoChanges { .. } => {
                tracing::info!(table = %spec.name, "Table exists");
                report.record(ResourceKind::Table, &spec.name, Outcome::Unchanged);
            }
        }
    }

    for spec in created {
        match wait_for_table(provider, &spec.name, config.table_wait).await {
            Ok(()) => {
                tracing::info!(table = %spec.name, "Table is active");
                report.record(ResourceKind::Table, &spec.name, Outcome::Created);
            }
            Err(e) => {
                tracing::error!(table = %spec.name, error = %e, "Table did not become active");
                report.record(
                    ResourceKind::Table,
                    &spec.name,
                    Outcome::Failed(e.to_string()),
                );
            }
        }
    }

    report
}

/// Adds missing indexes one at a time, waiting for the table between each.
async fn add_indexes<P>(
    provider: &P,
    spec: &TableSpec,
    indexes: &[IndexSpec],
    wait: WaitPolicy,
    report: &mut PhaseReport,
) -> Outcome
where
    P: TableProvider + ?Sized,
{
    for index in indexes {
        let name = &index.name;
        tracing::info!(table = %spec.name, index = %name, "Adding index");
        let result = match provider.add_index(spec, index).await {
            Ok(()) => wait_for_table(provider, &spec.name, wait).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::error!(table = %spec.name, index = %name, error = %e, "Failed to add index");
            report.record(ResourceKind::Index, name, Outcome::Failed(e.to_string()));
            return Outcome::Failed(format!("index '{name}' was not added"));
        }
        report.record(ResourceKind::Index, name, Outcome::Created);
    }
    Outcome::Updated
}

async fn wait_for_table<P>(provider: &P, name: &str, wait: WaitPolicy) -> provider::Result<()>
where
    P: TableProvider + ?Sized,
{
    poll_until(wait, "Table", name, || async move {
        Ok(provider
            .describe_table(name)
            .await?
            .is_some_and(|state| state.is_ready()))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::InMemoryCloud;
    use crate::reconcile::fixtures::Workspace;

    #[tokio::test]
    async fn test_creates_every_missing_table() {
        let workspace = Workspace::new();
        let cloud = InMemoryCloud::new().with_settle_polls(2);
        let tables = &workspace.manifest.tables;

        let report = reconcile_tables(&cloud, tables, &workspace.config).await;

        assert_eq!(report.failures(), 0);
        assert_eq!(report.count(&Outcome::Created), tables.len());
        let mut expected: Vec<String> = tables.iter().map(|t| t.name.clone()).collect();
        expected.sort();
        assert_eq!(cloud.table_names().await, expected);
    }

    #[tokio::test]
    async fn test_second_run_is_unchanged_and_issues_no_create() {
        let workspace = Workspace::new();
        let cloud = InMemoryCloud::new();
        let tables = &workspace.manifest.tables;
        reconcile_tables(&cloud, tables, &workspace.config).await;
        let creates_after_first_run = cloud.calls_to("create_table").await;

        let report = reconcile_tables(&cloud, tables, &workspace.config).await;

        assert_eq!(report.count(&Outcome::Unchanged), tables.len());
        assert_eq!(cloud.calls_to("create_table").await, creates_after_first_run);
        assert_eq!(cloud.table_names().await.len(), tables.len());
    }

    #[tokio::test]
    async fn test_failed_create_does_not_stop_other_tables() {
        let workspace = Workspace::new();
        let cloud = InMemoryCloud::new();
        let tables = &workspace.manifest.tables;
        cloud.fail_on("create_table", &tables[0].name).await;

        let report = reconcile_tables(&cloud, tables, &workspace.config).await;

        assert!(matches!(
            report.outcome_of(ResourceKind::Table, &tables[0].name),
            Some(Outcome::Failed(_))
        ));
        for table in &tables[1..] {
            assert_eq!(
                report.outcome_of(ResourceKind::Table, &table.name),
                Some(&Outcome::Created)
            );
        }
        assert_eq!(cloud.table_names().await.len(), tables.len() - 1);
    }

    #[tokio::test]
    async fn test_table_that_never_activates_fails() {
        let workspace = Workspace::new();
        let cloud = InMemoryCloud::new().with_settle_polls(100);
        let tables = &workspace.manifest.tables[..1];

        let report = reconcile_tables(&cloud, tables, &workspace.config).await;

        assert!(matches!(
            report.outcome_of(ResourceKind::Table, &tables[0].name),
            Some(Outcome::Failed(message)) if message.contains("Timed out")
        ));
    }

    #[tokio::test]
    async fn test_missing_index_is_added_to_existing_table() {
        let workspace = Workspace::new();
        let cloud = InMemoryCloud::new();
        let mut bare = workspace.manifest.tables[0].clone();
        let declared = bare.clone();
        bare.indexes.clear();
        cloud.create_table(&bare).await.unwrap();

        let report = reconcile_tables(&cloud, &[declared.clone()], &workspace.config).await;

        assert_eq!(
            report.outcome_of(ResourceKind::Table, &declared.name),
            Some(&Outcome::Updated)
        );
        assert_eq!(
            report.outcome_of(ResourceKind::Index, &declared.indexes[0].name),
            Some(&Outcome::Created)
        );
        assert_eq!(
            cloud.index_names(&declared.name).await,
            vec![declared.indexes[0].name.clone()]
        );
    }

    #[tokio::test]
    async fn test_plan_reports_missing_and_existing_tables() {
        let workspace = Workspace::new();
        let cloud = InMemoryCloud::new();
        let tables = &workspace.manifest.tables;
        cloud.create_table(&tables[0]).await.unwrap();

        let plans = plan_tables(&cloud, tables).await.unwrap();

        assert!(!plans[0].has_changes());
        assert!(plans[1..].iter().all(TablePlan::has_changes));
        assert_eq!(cloud.calls_to("create_table").await, 1);
    }
}
