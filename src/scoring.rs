// 🎯 Composite Risk Scorer - weighted sum of indices
//
// RiskScore = w_premium·P + w_disaster·D + w_severity·S + w_weather·W
//
// Weights come from the ScoringConfig and nowhere else. The auxiliary
// views (trend, breakdown, ranking) read the same aggregates the score is
// built from, so they never disagree with it.

use crate::aggregate::{mean_of, PremiumHistory};
use crate::config::RiskWeights;
use crate::incident::IncidentCategory;
use crate::index::IndexSet;
use crate::merge::MergedRow;
use crate::states::StateCode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Incident counts per category, per state.
pub type IncidentBreakdown = BTreeMap<StateCode, BTreeMap<IncidentCategory, usize>>;

// ============================================================================
// SCORED ROW
// ============================================================================

/// One output row: merged metrics, their indices and the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRow {
    pub state: StateCode,
    pub average_premium: f64,
    pub disaster_count: f64,
    pub severity_score: f64,
    pub weather_score: f64,
    pub premium_index: f64,
    pub disaster_index: f64,
    pub severity_index: f64,
    pub weather_index: f64,
    pub risk_score: f64,
    pub disaster_matched: bool,
    pub weather_matched: bool,
}

impl ScoredRow {
    pub fn new(row: &MergedRow, indices: &IndexSet, risk_score: f64) -> Self {
        ScoredRow {
            state: row.state,
            average_premium: row.average_premium,
            disaster_count: row.disaster_count,
            severity_score: row.severity_score,
            weather_score: row.weather_score,
            premium_index: indices.premium_index,
            disaster_index: indices.disaster_index,
            severity_index: indices.severity_index,
            weather_index: indices.weather_index,
            risk_score,
            disaster_matched: row.disaster_matched,
            weather_matched: row.weather_matched,
        }
    }
}

// ============================================================================
// RISK SCORER
// ============================================================================

pub struct RiskScorer {
    weights: RiskWeights,
}

impl RiskScorer {
    pub fn new(weights: RiskWeights) -> Self {
        RiskScorer { weights }
    }

    pub fn risk_score(&self, indices: &IndexSet) -> f64 {
        self.weights.premium * indices.premium_index
            + self.weights.disaster * indices.disaster_index
            + self.weights.severity * indices.severity_index
            + self.weights.weather * indices.weather_index
    }

    /// Score merged rows against their indices. Both slices are parallel;
    /// output keeps the merged (StateCode) order.
    pub fn score(&self, rows: &[MergedRow], indices: &[IndexSet]) -> Vec<ScoredRow> {
        rows.iter()
            .zip(indices)
            .map(|(row, set)| ScoredRow::new(row, set, self.risk_score(set)))
            .collect()
    }
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new(RiskWeights::default())
    }
}

// ============================================================================
// RANKING
// ============================================================================

/// Rows by risk descending; ties go to the lower StateCode.
pub fn ranked(rows: &[ScoredRow]) -> Vec<&ScoredRow> {
    let mut sorted: Vec<&ScoredRow> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        b.risk_score
            .total_cmp(&a.risk_score)
            .then_with(|| a.state.cmp(&b.state))
    });
    sorted
}

// ============================================================================
// TREND SERIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub year: i32,

    /// State premium relative to its own base-year premium
    pub state_index: Option<f64>,

    /// Mean premium across states relative to the base-year mean
    pub national_index: Option<f64>,
}

fn ratio(value: Option<f64>, base: Option<f64>) -> Option<f64> {
    match (value, base) {
        (Some(v), Some(b)) if b != 0.0 && b.is_finite() => Some(v / b),
        _ => None,
    }
}

/// Mean premium across every state observed in `year`.
pub fn national_mean(history: &PremiumHistory, year: i32) -> Option<f64> {
    let values: Vec<f64> = history
        .values()
        .filter_map(|years| years.get(&year).copied())
        .collect();
    mean_of(&values)
}

/// Premium trend of one state against the national trend, both indexed to
/// `base_year`. Covers every year observed anywhere in the history.
///
/// A ratio whose base is absent or zero is None.
pub fn trend_series(history: &PremiumHistory, state: StateCode, base_year: i32) -> Vec<TrendPoint> {
    let years: BTreeSet<i32> = history.values().flat_map(|y| y.keys().copied()).collect();

    let state_years = history.get(&state);
    let state_value = |year: i32| state_years.and_then(|y| y.get(&year).copied());

    let state_base = state_value(base_year);
    let national_base = national_mean(history, base_year);

    years
        .into_iter()
        .map(|year| TrendPoint {
            year,
            state_index: ratio(state_value(year), state_base),
            national_index: ratio(national_mean(history, year), national_base),
        })
        .collect()
}

// ============================================================================
// BREAKDOWN
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub category: IncidentCategory,
    pub count: usize,
}

/// Incident counts for one state over all six categories, zeros included.
pub fn breakdown(incidents: &IncidentBreakdown, state: StateCode) -> Vec<BreakdownEntry> {
    let counts = incidents.get(&state);

    IncidentCategory::all()
        .into_iter()
        .map(|category| BreakdownEntry {
            category,
            count: counts
                .and_then(|c| c.get(&category).copied())
                .unwrap_or(0),
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_quality::QualityLog;
    use crate::index::IndexCalculator;

    fn merged(state: StateCode, premium: f64, disasters: f64) -> MergedRow {
        MergedRow {
            state,
            average_premium: premium,
            disaster_count: disasters,
            severity_score: disasters,
            weather_score: 1.0,
            disaster_matched: disasters > 0.0,
            weather_matched: false,
        }
    }

    fn score_rows(rows: &[MergedRow], weights: RiskWeights) -> Vec<ScoredRow> {
        let mut log = QualityLog::new();
        let indices = IndexCalculator::default().compute(rows, &mut log);
        RiskScorer::new(weights).score(rows, &indices)
    }

    #[test]
    fn test_two_factor_end_to_end() {
        let rows = vec![
            merged(StateCode::CA, 1000.0, 2.0),
            merged(StateCode::TX, 2000.0, 4.0),
        ];
        let scored = score_rows(&rows, RiskWeights::two_factor());

        let tx = scored.iter().find(|r| r.state == StateCode::TX).unwrap();
        let ca = scored.iter().find(|r| r.state == StateCode::CA).unwrap();

        assert!((tx.premium_index - 1.33).abs() < 0.01);
        assert!((ca.premium_index - 0.67).abs() < 0.01);
        assert!((tx.disaster_index - 1.33).abs() < 0.01);
        assert!((tx.risk_score - 1.33).abs() < 0.01);
        assert!((ca.risk_score - 0.67).abs() < 0.01);
    }

    #[test]
    fn test_unmatched_disaster_state_scores_below_average() {
        let rows = vec![
            merged(StateCode::CA, 1000.0, 2.0),
            merged(StateCode::TX, 2000.0, 4.0),
            merged(StateCode::VT, 1500.0, 0.0),
        ];
        let scored = score_rows(&rows, RiskWeights::two_factor());

        let vt = scored.iter().find(|r| r.state == StateCode::VT).unwrap();
        assert_eq!(vt.disaster_count, 0.0);
        assert!(vt.disaster_index < 1.0);
    }

    #[test]
    fn test_neutral_indices_score_one() {
        let neutral = IndexSet {
            premium_index: 1.0,
            disaster_index: 1.0,
            severity_index: 1.0,
            weather_index: 1.0,
        };
        assert!((RiskScorer::default().risk_score(&neutral) - 1.0).abs() < 1e-12);
        let two_factor = RiskScorer::new(RiskWeights::two_factor());
        assert!((two_factor.risk_score(&neutral) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ranked_descending_with_state_tiebreak() {
        let rows = vec![
            merged(StateCode::CA, 1000.0, 1.0),
            merged(StateCode::NY, 1000.0, 1.0),
            merged(StateCode::TX, 3000.0, 1.0),
        ];
        let scored = score_rows(&rows, RiskWeights::two_factor());

        let order: Vec<StateCode> = ranked(&scored).iter().map(|r| r.state).collect();
        assert_eq!(order, vec![StateCode::TX, StateCode::CA, StateCode::NY]);
    }

    #[test]
    fn test_trend_series_against_national() {
        let history: PremiumHistory = BTreeMap::from([
            (StateCode::TX, BTreeMap::from([(2018, 1000.0), (2019, 1200.0)])),
            (StateCode::CA, BTreeMap::from([(2018, 3000.0), (2019, 3000.0), (2020, 3300.0)])),
        ]);

        let series = trend_series(&history, StateCode::TX, 2018);
        assert_eq!(series.len(), 3);

        assert_eq!(series[0].state_index, Some(1.0));
        assert_eq!(series[0].national_index, Some(1.0));
        assert!((series[1].state_index.unwrap() - 1.2).abs() < 1e-12);
        // national: (1200 + 3000) / 2 over (1000 + 3000) / 2
        assert!((series[1].national_index.unwrap() - 1.05).abs() < 1e-12);

        // TX has no 2020 figure
        assert_eq!(series[2].year, 2020);
        assert_eq!(series[2].state_index, None);
        assert!((series[2].national_index.unwrap() - 1.65).abs() < 1e-12);
    }

    #[test]
    fn test_trend_series_missing_base_year() {
        let history: PremiumHistory =
            BTreeMap::from([(StateCode::TX, BTreeMap::from([(2019, 1200.0)]))]);

        let series = trend_series(&history, StateCode::TX, 2018);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].state_index, None);
        assert_eq!(series[0].national_index, None);
    }

    #[test]
    fn test_trend_series_zero_base_is_absent() {
        let history: PremiumHistory =
            BTreeMap::from([(StateCode::TX, BTreeMap::from([(2018, 0.0), (2019, 1200.0)]))]);

        let series = trend_series(&history, StateCode::TX, 2018);
        assert!(series.iter().all(|p| p.state_index.is_none()));
    }

    #[test]
    fn test_breakdown_lists_all_categories() {
        let incidents: IncidentBreakdown = BTreeMap::from([(
            StateCode::FL,
            BTreeMap::from([(IncidentCategory::Hurricane, 3), (IncidentCategory::Flood, 1)]),
        )]);

        let fl = breakdown(&incidents, StateCode::FL);
        assert_eq!(fl.len(), 6);
        assert_eq!(
            fl[0],
            BreakdownEntry {
                category: IncidentCategory::Hurricane,
                count: 3,
            }
        );
        assert_eq!(fl.iter().map(|e| e.count).sum::<usize>(), 4);

        let unknown = breakdown(&incidents, StateCode::AK);
        assert!(unknown.iter().all(|e| e.count == 0));
    }
}
