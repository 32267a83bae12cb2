// 📊 Per-Source Aggregation - one row per state(/year)
//
// Reduces normalized records to ordered maps keyed by StateCode. Means are
// accumulated in record order and maps iterate in code order, so the same
// input always yields bit-identical output.

use crate::incident::{IncidentCategory, SeverityWeights};
use crate::sources::{AutoRecord, DisasterRecord, HomeRecord, WeatherRecords};
use crate::states::StateCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Average premium per state per year.
pub type PremiumHistory = BTreeMap<StateCode, BTreeMap<i32, f64>>;

// ============================================================================
// YEAR SCOPE
// ============================================================================

/// Which records of a year-indexed source take part in an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearScope {
    /// Pool every record, dated or not
    All,
    /// Only records dated in this year
    Year(i32),
}

impl YearScope {
    pub fn admits(&self, year: Option<i32>) -> bool {
        match self {
            YearScope::All => true,
            YearScope::Year(wanted) => year == Some(*wanted),
        }
    }
}

// ============================================================================
// MEAN ACCUMULATOR
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

fn finish(groups: BTreeMap<StateCode, Mean>) -> BTreeMap<StateCode, f64> {
    groups
        .into_iter()
        .filter_map(|(state, mean)| mean.value().map(|v| (state, v)))
        .collect()
}

/// Arithmetic mean of a slice, None when empty.
pub fn mean_of(values: &[f64]) -> Option<f64> {
    let mut mean = Mean::default();
    values.iter().for_each(|v| mean.add(*v));
    mean.value()
}

// ============================================================================
// INSURANCE
// ============================================================================

/// Mean Auto premium per state for one year. States whose every value for
/// that year is absent are left out.
pub fn aggregate_auto(records: &[AutoRecord], year: i32) -> BTreeMap<StateCode, f64> {
    let mut groups: BTreeMap<StateCode, Mean> = BTreeMap::new();

    for record in records {
        if let Some(Some(premium)) = record.premiums.get(&year) {
            groups.entry(record.state).or_default().add(*premium);
        }
    }

    finish(groups)
}

/// Mean Auto premium for every (state, year) pair present.
pub fn auto_history(records: &[AutoRecord]) -> PremiumHistory {
    let mut groups: BTreeMap<StateCode, BTreeMap<i32, Mean>> = BTreeMap::new();

    for record in records {
        for (year, premium) in &record.premiums {
            if let Some(premium) = premium {
                groups
                    .entry(record.state)
                    .or_default()
                    .entry(*year)
                    .or_default()
                    .add(*premium);
            }
        }
    }

    collect_history(groups)
}

/// Mean Home premium per state, pooling every source year.
pub fn aggregate_home(records: &[HomeRecord]) -> BTreeMap<StateCode, f64> {
    let mut groups: BTreeMap<StateCode, Mean> = BTreeMap::new();

    for record in records {
        if let Some(premium) = record.premium {
            groups.entry(record.state).or_default().add(premium);
        }
    }

    finish(groups)
}

/// Mean Home premium per (state, source year); undated rows are skipped.
pub fn home_history(records: &[HomeRecord]) -> PremiumHistory {
    let mut groups: BTreeMap<StateCode, BTreeMap<i32, Mean>> = BTreeMap::new();

    for record in records {
        if let (Some(year), Some(premium)) = (record.year, record.premium) {
            groups
                .entry(record.state)
                .or_default()
                .entry(year)
                .or_default()
                .add(premium);
        }
    }

    collect_history(groups)
}

fn collect_history(groups: BTreeMap<StateCode, BTreeMap<i32, Mean>>) -> PremiumHistory {
    groups
        .into_iter()
        .map(|(state, years)| {
            let years = years
                .into_iter()
                .filter_map(|(year, mean)| mean.value().map(|v| (year, v)))
                .collect();
            (state, years)
        })
        .collect()
}

// ============================================================================
// DISASTERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterMetrics {
    pub disaster_count: usize,

    /// Σ count(category) × weight(category); None when the source carried
    /// no incident types
    pub severity_score: Option<f64>,

    pub categories: BTreeMap<IncidentCategory, usize>,
}

pub fn aggregate_disasters(
    records: &[DisasterRecord],
    scope: YearScope,
    weights: &SeverityWeights,
) -> BTreeMap<StateCode, DisasterMetrics> {
    let mut counts: BTreeMap<StateCode, (usize, BTreeMap<IncidentCategory, usize>)> =
        BTreeMap::new();

    for record in records.iter().filter(|r| scope.admits(r.year)) {
        let entry = counts.entry(record.state).or_default();
        entry.0 += 1;
        if let Some(category) = record.category {
            *entry.1.entry(category).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|(state, (disaster_count, categories))| {
            let severity_score = (!categories.is_empty()).then(|| {
                categories
                    .iter()
                    .map(|(category, count)| *count as f64 * weights.weight(*category))
                    .sum::<f64>()
            });

            (
                state,
                DisasterMetrics {
                    disaster_count,
                    severity_score,
                    categories,
                },
            )
        })
        .collect()
}

// ============================================================================
// WEATHER
// ============================================================================

/// Mean of per-record measurement means, per state.
///
/// Returns None when the table has no numeric measurement column at all;
/// the merger then treats every state as unmatched rather than zero.
pub fn aggregate_weather(
    weather: &WeatherRecords,
    scope: YearScope,
) -> Option<BTreeMap<StateCode, f64>> {
    if !weather.has_measurements {
        return None;
    }

    let mut groups: BTreeMap<StateCode, Mean> = BTreeMap::new();

    for record in weather.records.iter().filter(|r| scope.admits(r.year)) {
        if let Some(record_mean) = mean_of(&record.measurements) {
            groups.entry(record.state).or_default().add(record_mean);
        }
    }

    Some(finish(groups))
}

// ============================================================================
// TESTS
// ============================================================================
