// 🚀 Risk Pipeline - raw tables in, scored report out
//
// raw tables → normalized records → per-source aggregates → merged rows
//            → indices → composite scores
//
// Each stage is a pure function of the previous stage's output. The only
// state carried through a run is the QualityLog.

use crate::aggregate::{
    aggregate_auto, aggregate_disasters, aggregate_home, aggregate_weather, auto_history,
    home_history, DisasterMetrics, PremiumHistory, YearScope,
};
use crate::config::ScoringConfig;
use crate::data_quality::{IssueKind, QualityLog};
use crate::error::{PipelineError, PipelineResult};
use crate::incident::IncidentClassifier;
use crate::index::IndexCalculator;
use crate::merge::{DatasetMerger, MergeInputs};
use crate::scoring::{
    breakdown, ranked, trend_series, BreakdownEntry, IncidentBreakdown, RiskScorer, ScoredRow,
    TrendPoint,
};
use crate::sources::{
    read_auto, read_disasters, read_home, read_weather, RawTable, SourceKind, SourceTables,
};
use crate::states::StateCode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

// ============================================================================
// INSURANCE SELECTION
// ============================================================================

/// Which insurance table drives the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "insurance", rename_all = "lowercase")]
pub enum InsuranceSelection {
    Auto { year: i32 },
    Home,
}

impl InsuranceSelection {
    pub fn source(&self) -> SourceKind {
        match self {
            InsuranceSelection::Auto { .. } => SourceKind::Auto,
            InsuranceSelection::Home => SourceKind::Home,
        }
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            InsuranceSelection::Auto { year } => Some(*year),
            InsuranceSelection::Home => None,
        }
    }
}

impl fmt::Display for InsuranceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsuranceSelection::Auto { year } => write!(f, "Auto {}", year),
            InsuranceSelection::Home => write!(f, "Home"),
        }
    }
}

// ============================================================================
// RISK REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub selection: InsuranceSelection,
    pub config_version: u32,

    /// One row per primary state, in StateCode order
    pub rows: Vec<ScoredRow>,

    /// Primary premiums per state per year, for trend views
    pub premium_history: PremiumHistory,

    /// Disaster counts by incident category, per state
    pub incident_breakdown: IncidentBreakdown,

    pub diagnostics: QualityLog,

    /// SHA-256 (hex) of the scored rows
    pub digest: String,
}

impl RiskReport {
    pub fn row(&self, state: StateCode) -> Option<&ScoredRow> {
        self.rows.iter().find(|r| r.state == state)
    }

    pub fn ranked(&self) -> Vec<&ScoredRow> {
        ranked(&self.rows)
    }

    pub fn trend_series(&self, state: StateCode, base_year: i32) -> Vec<TrendPoint> {
        trend_series(&self.premium_history, state, base_year)
    }

    pub fn breakdown(&self, state: StateCode) -> Vec<BreakdownEntry> {
        breakdown(&self.incident_breakdown, state)
    }
}

/// Hash of the scored rows. Floats are written in their shortest
/// round-trip form so equal rows always hash equal.
pub fn compute_digest(rows: &[ScoredRow]) -> String {
    let mut hasher = Sha256::new();

    for row in rows {
        hasher.update(format!(
            "{}|{:?}|{:?}|{:?}|{:?}|{:?}|{:?}|{:?}|{:?}|{:?}|{}|{}\n",
            row.state,
            row.average_premium,
            row.disaster_count,
            row.severity_score,
            row.weather_score,
            row.premium_index,
            row.disaster_index,
            row.severity_index,
            row.weather_index,
            row.risk_score,
            row.disaster_matched,
            row.weather_matched
        ));
    }

    format!("{:x}", hasher.finalize())
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct RiskPipeline {
    config: ScoringConfig,
    classifier: IncidentClassifier,
}

impl RiskPipeline {
    pub fn new(config: ScoringConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(RiskPipeline {
            config,
            classifier: IncidentClassifier::new(),
        })
    }

    pub fn run(
        &self,
        tables: &SourceTables,
        selection: InsuranceSelection,
    ) -> PipelineResult<RiskReport> {
        let mut log = QualityLog::new();

        info!("Scoring {} insurance", selection);

        // Primary: structural failures here are fatal
        let (premiums, premium_history) = self.primary(tables, selection, &mut log)?;
        if premiums.is_empty() {
            return Err(PipelineError::NoPremiumData(selection.source()));
        }
        debug!("{} states carry a {} premium", premiums.len(), selection);

        let scope = match (self.config.scope_secondary_to_year, selection.year()) {
            (true, Some(year)) => YearScope::Year(year),
            _ => YearScope::All,
        };

        // Secondary: structural failures drop the source
        let disasters = self.disasters(tables, scope, &mut log)?;
        let weather = self.weather(tables, scope, &mut log)?;

        let incident_breakdown: IncidentBreakdown = disasters
            .iter()
            .flatten()
            .map(|(state, metrics)| (*state, metrics.categories.clone()))
            .collect();

        let merged = DatasetMerger::with_neutral(self.config.neutral_index).merge(
            &MergeInputs {
                primary: selection.source(),
                premiums: &premiums,
                disasters: disasters.as_ref(),
                weather: weather.as_ref(),
            },
            &mut log,
        );

        let indices = IndexCalculator::new(self.config.neutral_index).compute(&merged, &mut log);
        let rows = RiskScorer::new(self.config.weights.clone()).score(&merged, &indices);
        let digest = compute_digest(&rows);

        if log.has_warnings() {
            warn!("{}", log.summary());
        } else {
            debug!("{}", log.summary());
        }
        info!("Scored {} states ({})", rows.len(), &digest[..12]);

        Ok(RiskReport {
            selection,
            config_version: self.config.version,
            rows,
            premium_history,
            incident_breakdown,
            diagnostics: log,
            digest,
        })
    }

    fn primary(
        &self,
        tables: &SourceTables,
        selection: InsuranceSelection,
        log: &mut QualityLog,
    ) -> PipelineResult<(BTreeMap<StateCode, f64>, PremiumHistory)> {
        match selection {
            InsuranceSelection::Auto { year } => {
                let range = self.config.auto_years;
                if !range.contains(year) {
                    return Err(PipelineError::YearOutOfRange {
                        year,
                        start: range.start,
                        end: range.end,
                    });
                }

                let table = required(tables.auto.as_ref(), SourceKind::Auto)?;
                let records = read_auto(table, &self.config.auto_years, log)?;
                Ok((aggregate_auto(&records, year), auto_history(&records)))
            }
            InsuranceSelection::Home => {
                let table = required(tables.home.as_ref(), SourceKind::Home)?;
                let records = read_home(table, log)?;
                Ok((aggregate_home(&records), home_history(&records)))
            }
        }
    }

    fn disasters(
        &self,
        tables: &SourceTables,
        scope: YearScope,
        log: &mut QualityLog,
    ) -> PipelineResult<Option<BTreeMap<StateCode, DisasterMetrics>>> {
        let Some(table) = tables.disasters.as_ref() else {
            debug!("No disaster table supplied; every state falls back");
            return Ok(None);
        };

        let records = secondary(read_disasters(table, &self.classifier, log), table, log)?;
        Ok(records.map(|records| {
            aggregate_disasters(&records, scope, &self.config.severity_weights)
        }))
    }

    fn weather(
        &self,
        tables: &SourceTables,
        scope: YearScope,
        log: &mut QualityLog,
    ) -> PipelineResult<Option<BTreeMap<StateCode, f64>>> {
        let Some(table) = tables.weather.as_ref() else {
            debug!("No weather table supplied; every state falls back");
            return Ok(None);
        };

        let Some(records) = secondary(read_weather(table, log), table, log)? else {
            return Ok(None);
        };

        let scores = aggregate_weather(&records, scope);
        if scores.is_none() {
            warn!("Weather table {} has no numeric measurement column", table.name);
            log.record(
                IssueKind::MissingColumn,
                Some(SourceKind::Weather),
                "measurements",
                table.name.as_str(),
            );
        }

        Ok(scores)
    }
}

fn required(table: Option<&RawTable>, source: SourceKind) -> PipelineResult<&RawTable> {
    table.ok_or(PipelineError::MissingSource(source))
}

/// A missing column in a secondary source drops that source with a
/// diagnostic. Anything else still aborts.
fn secondary<T>(
    result: PipelineResult<T>,
    table: &RawTable,
    log: &mut QualityLog,
) -> PipelineResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(PipelineError::MissingColumn { source, column }) => {
            warn!("Dropping {} table {}: missing column {}", source, table.name, column);
            log.record(IssueKind::MissingColumn, Some(source), &column, table.name.as_str());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// TESTS
// ============================================================================
