//! JSON output formatting.

/// Format a value as single-line JSON.
pub fn format_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use explorespeak_core::report::{Outcome, Phase, PhaseReport, ResourceKind};

    #[test]
    fn test_phase_report_json() {
        let mut report = PhaseReport::new(Phase::Tables);
        report.record(ResourceKind::Table, "vocabulary", Outcome::Created);

        let json = format_json(&report);

        assert_eq!(
            json,
            concat!(
                r#"{"phase":"tables","steps":[{"kind":"table","name":"vocabulary","#,
                r#""outcome":{"status":"created"}}]}"#
            )
        );
    }
}
