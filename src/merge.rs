// 🔗 Dataset Merger - left join on the primary insurance source
//
// The primary premium table decides which states exist. Every other source
// is joined onto it; a state missing from a secondary source gets a
// documented fallback instead of dropping out:
//
//   disaster_count  → 0
//   severity_score  → mean of the matched severity scores (or neutral)
//   weather_score   → neutral, and the row is flagged so its index is too

use crate::aggregate::DisasterMetrics;
use crate::data_quality::{IssueKind, QualityLog};
use crate::sources::SourceKind;
use crate::states::StateCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// ============================================================================
// MERGED ROW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    pub state: StateCode,
    pub average_premium: f64,
    pub disaster_count: f64,
    pub severity_score: f64,
    pub weather_score: f64,

    /// False when the disaster source had no row for this state
    pub disaster_matched: bool,

    /// False when the weather score is the neutral fallback
    pub weather_matched: bool,
}

/// Aggregates to join, borrowed from the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct MergeInputs<'a> {
    pub primary: SourceKind,
    pub premiums: &'a BTreeMap<StateCode, f64>,
    pub disasters: Option<&'a BTreeMap<StateCode, DisasterMetrics>>,
    pub weather: Option<&'a BTreeMap<StateCode, f64>>,
}

// ============================================================================
// MERGER
// ============================================================================

pub struct DatasetMerger {
    /// Disaster count for states the disaster source never mentions
    pub disaster_count_fallback: f64,

    /// Weather score, and severity score when no state has one
    pub neutral_value: f64,
}

impl DatasetMerger {
    pub fn new() -> Self {
        DatasetMerger {
            disaster_count_fallback: 0.0,
            neutral_value: 1.0,
        }
    }

    pub fn with_neutral(neutral_value: f64) -> Self {
        DatasetMerger {
            neutral_value,
            ..DatasetMerger::new()
        }
    }

    /// Left-join every aggregate onto the primary premium table.
    ///
    /// Rows come back in StateCode order. States without a premium never
    /// appear: the premium map only holds states with a usable value.
    pub fn merge(&self, inputs: &MergeInputs<'_>, log: &mut QualityLog) -> Vec<MergedRow> {
        let severity_fallback = self.severity_fallback(inputs);

        let rows: Vec<MergedRow> = inputs
            .premiums
            .iter()
            .map(|(state, premium)| {
                let disaster = inputs.disasters.and_then(|d| d.get(state));
                let weather = inputs.weather.and_then(|w| w.get(state)).copied();

                if inputs.disasters.is_some() && disaster.is_none() {
                    log.record(
                        IssueKind::UnmatchedJoinKey,
                        Some(SourceKind::Disaster),
                        "disaster_count",
                        state.code(),
                    );
                }

                if inputs.weather.is_some() && weather.is_none() {
                    log.record(
                        IssueKind::UnmatchedJoinKey,
                        Some(SourceKind::Weather),
                        "weather_score",
                        state.code(),
                    );
                }

                MergedRow {
                    state: *state,
                    average_premium: *premium,
                    disaster_count: disaster
                        .map(|d| d.disaster_count as f64)
                        .unwrap_or(self.disaster_count_fallback),
                    severity_score: disaster
                        .and_then(|d| d.severity_score)
                        .unwrap_or(severity_fallback),
                    weather_score: weather.unwrap_or(self.neutral_value),
                    disaster_matched: disaster.is_some(),
                    weather_matched: weather.is_some(),
                }
            })
            .collect();

        debug!(
            "Merged {} rows on {} premiums ({} disaster matches, {} weather matches)",
            rows.len(),
            inputs.primary,
            rows.iter().filter(|r| r.disaster_matched).count(),
            rows.iter().filter(|r| r.weather_matched).count()
        );

        rows
    }

    /// Mean severity over the primary states that have one.
    fn severity_fallback(&self, inputs: &MergeInputs<'_>) -> f64 {
        let Some(disasters) = inputs.disasters else {
            return self.neutral_value;
        };

        let scores: Vec<f64> = inputs
            .premiums
            .keys()
            .filter_map(|state| disasters.get(state).and_then(|d| d.severity_score))
            .collect();

        crate::aggregate::mean_of(&scores).unwrap_or(self.neutral_value)
    }
}

impl Default for DatasetMerger {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(count: usize, severity: Option<f64>) -> DisasterMetrics {
        DisasterMetrics {
            disaster_count: count,
            severity_score: severity,
            categories: BTreeMap::new(),
        }
    }

    fn premiums() -> BTreeMap<StateCode, f64> {
        BTreeMap::from([
            (StateCode::TX, 2000.0),
            (StateCode::CA, 1000.0),
            (StateCode::VT, 800.0),
        ])
    }

    #[test]
    fn test_left_join_keeps_primary_universe() {
        let premiums = premiums();
        let disasters = BTreeMap::from([
            (StateCode::TX, metrics(4, Some(6.0))),
            (StateCode::CA, metrics(2, Some(3.0))),
            // Not in the primary table: ignored
            (StateCode::FL, metrics(9, Some(18.0))),
        ]);

        let mut log = QualityLog::new();
        let rows = DatasetMerger::new().merge(
            &MergeInputs {
                primary: SourceKind::Auto,
                premiums: &premiums,
                disasters: Some(&disasters),
                weather: None,
            },
            &mut log,
        );

        let states: Vec<StateCode> = rows.iter().map(|r| r.state).collect();
        assert_eq!(states, vec![StateCode::CA, StateCode::TX, StateCode::VT]);

        let vt = &rows[2];
        assert_eq!(vt.disaster_count, 0.0);
        assert!(!vt.disaster_matched);
        // Mean of TX and CA severities
        assert_eq!(vt.severity_score, 4.5);
        assert_eq!(vt.weather_score, 1.0);
        assert!(!vt.weather_matched);

        assert_eq!(log.count(IssueKind::UnmatchedJoinKey), 1);
    }

    #[test]
    fn test_severity_fallback_without_any_scores() {
        let premiums = premiums();
        let disasters = BTreeMap::from([(StateCode::TX, metrics(4, None))]);

        let mut log = QualityLog::new();
        let rows = DatasetMerger::new().merge(
            &MergeInputs {
                primary: SourceKind::Auto,
                premiums: &premiums,
                disasters: Some(&disasters),
                weather: None,
            },
            &mut log,
        );

        assert!(rows.iter().all(|r| r.severity_score == 1.0));
        assert_eq!(rows[1].disaster_count, 4.0);
    }

    #[test]
    fn test_weather_fallback_is_neutral() {
        let premiums = premiums();
        let weather = BTreeMap::from([(StateCode::TX, 72.5)]);

        let mut log = QualityLog::new();
        let rows = DatasetMerger::with_neutral(1.0).merge(
            &MergeInputs {
                primary: SourceKind::Home,
                premiums: &premiums,
                disasters: None,
                weather: Some(&weather),
            },
            &mut log,
        );

        let tx = rows.iter().find(|r| r.state == StateCode::TX).unwrap();
        assert_eq!(tx.weather_score, 72.5);
        assert!(tx.weather_matched);

        let ca = rows.iter().find(|r| r.state == StateCode::CA).unwrap();
        assert_eq!(ca.weather_score, 1.0);
        assert!(!ca.weather_matched);

        // Missing disaster source is not a per-state mismatch
        assert!(log
            .find(IssueKind::UnmatchedJoinKey, Some(SourceKind::Disaster), "disaster_count")
            .is_none());
        assert_eq!(log.count(IssueKind::UnmatchedJoinKey), 2);
    }
}
