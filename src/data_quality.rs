// ✅ Data Quality Log - non-fatal issues absorbed during a run
//
// Dirty cells, unknown states and missing join partners never abort a
// run. Each one resolves to a documented fallback and leaves a trace here
// so the caller can tell "partial data, degraded scores" apart from a
// clean run.

use crate::sources::SourceKind;
use serde::{Deserialize, Serialize};

// ============================================================================
// ISSUE TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning, // Data was dropped or replaced; scores are degraded
    Info,    // Expected noise (rollup rows, territories, neutral fallbacks)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    /// A secondary source lacked a required column and was dropped
    MissingColumn,
    /// A row's join key did not normalize to a state
    UnrecognizedState,
    /// A cell failed normalization and was treated as absent
    UnparseableValue,
    /// A state had no row in a secondary source; fallback applied
    UnmatchedJoinKey,
    /// A metric column had a zero or undefined mean; neutral index applied
    DegenerateMean,
}

impl IssueKind {
    pub fn name(&self) -> &str {
        match self {
            IssueKind::MissingColumn => "MissingColumn",
            IssueKind::UnrecognizedState => "UnrecognizedState",
            IssueKind::UnparseableValue => "UnparseableValue",
            IssueKind::UnmatchedJoinKey => "UnmatchedJoinKey",
            IssueKind::DegenerateMean => "DegenerateMean",
        }
    }

    fn default_severity(&self) -> Severity {
        match self {
            IssueKind::MissingColumn | IssueKind::UnparseableValue => Severity::Warning,
            IssueKind::UnrecognizedState
            | IssueKind::UnmatchedJoinKey
            | IssueKind::DegenerateMean => Severity::Info,
        }
    }
}

/// One kind of problem on one field of one source.
///
/// Repeats are folded into `occurrences`; `example` keeps the first value
/// seen so the report stays small on large tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub source: Option<SourceKind>,
    pub field: String,
    pub example: String,
    pub occurrences: usize,
}

// ============================================================================
// QUALITY LOG
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityLog {
    issues: Vec<QualityIssue>,
}

impl QualityLog {
    pub fn new() -> Self {
        QualityLog { issues: Vec::new() }
    }

    pub fn record(
        &mut self,
        kind: IssueKind,
        source: Option<SourceKind>,
        field: &str,
        example: impl Into<String>,
    ) {
        if let Some(existing) = self
            .issues
            .iter_mut()
            .find(|i| i.kind == kind && i.source == source && i.field == field)
        {
            existing.occurrences += 1;
            return;
        }

        self.issues.push(QualityIssue {
            severity: kind.default_severity(),
            kind,
            source,
            field: field.to_string(),
            example: example.into(),
            occurrences: 1,
        });
    }

    pub fn issues(&self) -> &[QualityIssue] {
        &self.issues
    }

    /// Total occurrences of a kind across all sources and fields.
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues
            .iter()
            .filter(|i| i.kind == kind)
            .map(|i| i.occurrences)
            .sum()
    }

    pub fn find(
        &self,
        kind: IssueKind,
        source: Option<SourceKind>,
        field: &str,
    ) -> Option<&QualityIssue> {
        self.issues
            .iter()
            .find(|i| i.kind == kind && i.source == source && i.field == field)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn summary(&self) -> String {
        let warnings = self
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .map(|i| i.occurrences)
            .sum::<usize>();
        let infos = self
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Info)
            .map(|i| i.occurrences)
            .sum::<usize>();

        format!(
            "Data quality: {} warnings, {} notices across {} issue types",
            warnings,
            infos,
            self.issues.len()
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeats_fold_into_one_issue() {
        let mut log = QualityLog::new();
        log.record(IssueKind::UnparseableValue, Some(SourceKind::Auto), "avg_2022", "n.a.");
        log.record(IssueKind::UnparseableValue, Some(SourceKind::Auto), "avg_2022", "???");
        log.record(IssueKind::UnparseableValue, Some(SourceKind::Auto), "avg_2021", "x");

        assert_eq!(log.issues().len(), 2);
        assert_eq!(log.count(IssueKind::UnparseableValue), 3);

        let issue = log
            .find(IssueKind::UnparseableValue, Some(SourceKind::Auto), "avg_2022")
            .unwrap();
        assert_eq!(issue.occurrences, 2);
        assert_eq!(issue.example, "n.a.");
    }

    #[test]
    fn test_severity_by_kind() {
        let mut log = QualityLog::new();
        log.record(IssueKind::UnmatchedJoinKey, Some(SourceKind::Disaster), "disaster_count", "VT");
        assert!(!log.has_warnings());

        log.record(IssueKind::MissingColumn, Some(SourceKind::Weather), "state", "");
        assert!(log.has_warnings());
    }

    #[test]
    fn test_summary_counts() {
        let mut log = QualityLog::new();
        assert!(log.is_clean());

        log.record(IssueKind::UnrecognizedState, Some(SourceKind::Home), "state", "Guam");
        log.record(IssueKind::UnrecognizedState, Some(SourceKind::Home), "state", "Countrywide");
        log.record(IssueKind::UnparseableValue, Some(SourceKind::Home), "avg_annual_usd", "1.2.3");

        assert_eq!(
            log.summary(),
            "Data quality: 1 warnings, 2 notices across 2 issue types"
        );
    }
}
