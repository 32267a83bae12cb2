// 📐 Index Calculator - metric / national mean
//
// Each metric column is indexed on its own. The column mean is computed
// once, in row order, before the per-row pass. A degenerate column never
// leaks NaN or infinity into another column: it collapses to neutral.

use crate::data_quality::{IssueKind, QualityLog};
use crate::merge::MergedRow;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// INDEX SET
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSet {
    pub premium_index: f64,
    pub disaster_index: f64,
    pub severity_index: f64,
    pub weather_index: f64,
}

/// One indexed column and whether it fell back to neutral wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexColumn {
    pub values: Vec<f64>,
    pub degenerate: bool,
}

/// Mean over the present values; None when nothing usable is left.
pub fn column_mean(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }

    let mean = present.iter().sum::<f64>() / present.len() as f64;
    (mean != 0.0 && mean.is_finite()).then_some(mean)
}

/// `value / mean(values)` per row.
///
/// Absent entries take `neutral`. When the mean is zero or undefined the
/// whole column is `neutral`.
///
/// ```
/// use state_risk::index::to_index;
///
/// let column = to_index(&[Some(2000.0), Some(1000.0)], 1.0);
/// assert!((column.values[0] - 4.0 / 3.0).abs() < 1e-12);
///
/// let zeros = to_index(&[Some(0.0), Some(0.0)], 1.0);
/// assert_eq!(zeros.values, vec![1.0, 1.0]);
/// ```
pub fn to_index(values: &[Option<f64>], neutral: f64) -> IndexColumn {
    match column_mean(values) {
        Some(mean) => IndexColumn {
            values: values
                .iter()
                .map(|v| v.map(|x| x / mean).unwrap_or(neutral))
                .collect(),
            degenerate: false,
        },
        None => IndexColumn {
            values: vec![neutral; values.len()],
            degenerate: true,
        },
    }
}

// ============================================================================
// CALCULATOR
// ============================================================================

pub struct IndexCalculator {
    pub neutral: f64,
}

impl IndexCalculator {
    pub fn new(neutral: f64) -> Self {
        IndexCalculator { neutral }
    }

    /// Index every metric of every merged row. Output is parallel to `rows`.
    pub fn compute(&self, rows: &[MergedRow], log: &mut QualityLog) -> Vec<IndexSet> {
        let premium = self.column(rows, "premium_index", log, |r| Some(r.average_premium));
        let disaster = self.column(rows, "disaster_index", log, |r| Some(r.disaster_count));
        let severity = self.column(rows, "severity_index", log, |r| Some(r.severity_score));
        let weather = self.column(rows, "weather_index", log, |r| {
            r.weather_matched.then_some(r.weather_score)
        });

        (0..rows.len())
            .map(|i| IndexSet {
                premium_index: premium[i],
                disaster_index: disaster[i],
                severity_index: severity[i],
                weather_index: weather[i],
            })
            .collect()
    }

    fn column<F>(
        &self,
        rows: &[MergedRow],
        field: &str,
        log: &mut QualityLog,
        metric: F,
    ) -> Vec<f64>
    where
        F: Fn(&MergedRow) -> Option<f64>,
    {
        let values: Vec<Option<f64>> = rows.iter().map(metric).collect();
        let column = to_index(&values, self.neutral);

        if column.degenerate && !rows.is_empty() {
            debug!("{} has a degenerate mean; using neutral {}", field, self.neutral);
            log.record(IssueKind::DegenerateMean, None, field, "");
        }

        column.values
    }
}

impl Default for IndexCalculator {
    fn default() -> Self {
        Self::new(1.0)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::states::StateCode;
    use proptest::prelude::*;

    fn row(state: StateCode, premium: f64, disasters: f64, weather: Option<f64>) -> MergedRow {
        MergedRow {
            state,
            average_premium: premium,
            disaster_count: disasters,
            severity_score: disasters * 1.5,
            weather_score: weather.unwrap_or(1.0),
            disaster_matched: true,
            weather_matched: weather.is_some(),
        }
    }

    #[test]
    fn test_ratio_to_mean() {
        let column = to_index(&[Some(2000.0), Some(1000.0)], 1.0);
        assert!(!column.degenerate);
        assert!((column.values[0] - 1.3333333333).abs() < 1e-9);
        assert!((column.values[1] - 0.6666666667).abs() < 1e-9);
    }

    #[test]
    fn test_all_zero_column_is_neutral() {
        let column = to_index(&[Some(0.0), Some(0.0), Some(0.0)], 1.0);
        assert!(column.degenerate);
        assert!(column.values.iter().all(|v| *v == 1.0));
    }

    #[test]
    fn test_all_absent_column_is_neutral() {
        let column = to_index(&[None, None], 1.0);
        assert!(column.degenerate);
        assert_eq!(column.values, vec![1.0, 1.0]);
    }

    #[test]
    fn test_tiny_mean_is_still_a_mean() {
        let column = to_index(&[Some(1e-17), Some(3e-17)], 1.0);
        assert!(!column.degenerate);
        assert!((column.values[0] - 0.5).abs() < 1e-12);
        assert!((column.values[1] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_absent_entries_take_neutral() {
        let column = to_index(&[Some(10.0), None, Some(30.0)], 1.0);
        assert_eq!(column.values, vec![0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_degenerate_column_does_not_touch_others() {
        let rows = vec![
            row(StateCode::TX, 2000.0, 0.0, None),
            row(StateCode::CA, 1000.0, 0.0, None),
        ];

        let mut log = QualityLog::new();
        let indices = IndexCalculator::default().compute(&rows, &mut log);

        assert!((indices[0].premium_index - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(indices[0].disaster_index, 1.0);
        assert_eq!(indices[1].severity_index, 1.0);
        assert_eq!(indices[1].weather_index, 1.0);
        assert!(indices.iter().all(|i| i.premium_index.is_finite()));

        // disaster, severity and weather all collapsed
        assert_eq!(log.count(IssueKind::DegenerateMean), 3);
    }

    #[test]
    fn test_empty_rows_produce_no_indices() {
        let mut log = QualityLog::new();
        assert!(IndexCalculator::default().compute(&[], &mut log).is_empty());
        assert!(log.is_clean());
    }

    proptest! {
        #[test]
        fn index_column_averages_to_one(
            values in proptest::collection::vec(0.01f64..1.0e6, 1..60)
        ) {
            let present: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
            let column = to_index(&present, 1.0);
            let mean = column.values.iter().sum::<f64>() / column.values.len() as f64;
            prop_assert!((mean - 1.0).abs() < 1e-9);
        }

        #[test]
        fn zero_columns_never_produce_nan(len in 1usize..60) {
            let column = to_index(&vec![Some(0.0); len], 1.0);
            prop_assert!(column.values.iter().all(|v| *v == 1.0));
        }
    }
}
