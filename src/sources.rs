// 📥 Source Tables - typed views over dirty input tables
//
// A RawTable is what the outside world hands us: headers plus classified
// cells. Each source type knows its required and optional columns, the
// aliases those columns go by, and how to turn a row into a normalized
// record. Rows without a recognizable state never leave this module.

use crate::config::YearRange;
use crate::data_quality::{IssueKind, QualityLog};
use crate::error::{PipelineError, PipelineResult};
use crate::incident::{IncidentCategory, IncidentClassifier};
use crate::normalize::{normalize_money, normalize_year, CellValue};
use crate::states::{normalize_state, StateCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

static ABSENT: CellValue = CellValue::Absent;

// ============================================================================
// SOURCE KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKind {
    Auto,
    Home,
    Disaster,
    Weather,
}

impl SourceKind {
    pub fn name(&self) -> &str {
        match self {
            SourceKind::Auto => "Auto",
            SourceKind::Home => "Home",
            SourceKind::Disaster => "Disaster",
            SourceKind::Weather => "Weather",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// RAW TABLE
// ============================================================================

/// Headers plus rows of classified cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        RawTable {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Build a table from raw strings, classifying every cell.
    pub fn from_strings(name: impl Into<String>, headers: &[&str], rows: &[Vec<&str>]) -> Self {
        let mut table = RawTable::new(name, headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            table.push_raw_row(row.iter().copied());
        }
        table
    }

    pub fn push_raw_row<'a>(&mut self, cells: impl IntoIterator<Item = &'a str>) {
        self.rows
            .push(cells.into_iter().map(CellValue::classify).collect());
    }

    /// Column position by header, ignoring case and surrounding whitespace.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.headers
            .iter()
            .position(|h| h.trim().to_lowercase() == wanted)
    }

    /// First header matching any alias, in alias order.
    pub fn find_column(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|alias| self.column_index(alias))
    }

    /// Cell at (row, column); short rows read as Absent.
    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&ABSENT)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The four inputs of a run. Any may be missing; which one is required
/// depends on the insurance selection.
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub auto: Option<RawTable>,
    pub home: Option<RawTable>,
    pub disasters: Option<RawTable>,
    pub weather: Option<RawTable>,
}

impl SourceTables {
    pub fn new() -> Self {
        SourceTables::default()
    }

    pub fn with_auto(mut self, table: RawTable) -> Self {
        self.auto = Some(table);
        self
    }

    pub fn with_home(mut self, table: RawTable) -> Self {
        self.home = Some(table);
        self
    }

    pub fn with_disasters(mut self, table: RawTable) -> Self {
        self.disasters = Some(table);
        self
    }

    pub fn with_weather(mut self, table: RawTable) -> Self {
        self.weather = Some(table);
        self
    }
}

// ============================================================================
// COLUMN NAMES
// ============================================================================

const STATE_COLUMNS: [&str; 1] = ["state"];
const DISASTER_STATE_COLUMNS: [&str; 2] = ["state", "stateCode"];
const HOME_PREMIUM_COLUMNS: [&str; 2] = ["avg_annual_usd", "avg_home_premium"];
const HOME_YEAR_COLUMNS: [&str; 2] = ["source_year", "year"];
const DISASTER_DATE_COLUMNS: [&str; 3] = ["declarationDate", "declaration_date", "year"];
const INCIDENT_COLUMNS: [&str; 2] = ["incidentType", "incident_type"];
const WEATHER_YEAR_COLUMNS: [&str; 1] = ["year"];

/// Columns in a weather table that are never measurements, even if numeric.
const NON_MEASUREMENT_COLUMNS: [&str; 9] = [
    "id", "station", "station_id", "fips", "month", "day", "date", "lat", "lon",
];

pub fn auto_year_column(year: i32) -> String {
    format!("avg_{}", year)
}

// ============================================================================
// NORMALIZED RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AutoRecord {
    pub state: StateCode,
    /// One entry per configured year whose column exists
    pub premiums: BTreeMap<i32, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomeRecord {
    pub state: StateCode,
    pub year: Option<i32>,
    pub premium: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisasterRecord {
    pub state: StateCode,
    pub year: Option<i32>,
    /// None when the table carries no incident-type column
    pub category: Option<IncidentCategory>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    pub state: StateCode,
    pub year: Option<i32>,
    /// Numeric measurement cells present on this row
    pub measurements: Vec<f64>,
}

/// Weather records plus whether the table had any measurement column.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecords {
    pub records: Vec<WeatherRecord>,
    pub has_measurements: bool,
}

// ============================================================================
// ROW HELPERS
// ============================================================================

fn require_column(
    table: &RawTable,
    source: SourceKind,
    aliases: &[&str],
) -> PipelineResult<usize> {
    table
        .find_column(aliases)
        .ok_or_else(|| PipelineError::MissingColumn {
            source,
            column: aliases.join(" | "),
        })
}

/// Resolve the join key of a row, logging rows that cannot be placed.
fn row_state(
    table: &RawTable,
    row: usize,
    column: usize,
    source: SourceKind,
    log: &mut QualityLog,
) -> Option<StateCode> {
    let cell = table.cell(row, column);
    let state = cell.as_text().and_then(normalize_state);

    if state.is_none() {
        log.record(
            IssueKind::UnrecognizedState,
            Some(source),
            &table.headers[column],
            cell.to_string(),
        );
    }

    state
}

fn money_cell(
    table: &RawTable,
    row: usize,
    column: usize,
    source: SourceKind,
    log: &mut QualityLog,
) -> Option<f64> {
    let cell = table.cell(row, column);
    let amount = normalize_money(cell);

    if amount.is_none() && !cell.is_absent() {
        log.record(
            IssueKind::UnparseableValue,
            Some(source),
            &table.headers[column],
            cell.to_string(),
        );
    }

    amount
}

fn year_cell(
    table: &RawTable,
    row: usize,
    column: Option<usize>,
    source: SourceKind,
    log: &mut QualityLog,
) -> Option<i32> {
    let column = column?;
    let cell = table.cell(row, column);
    let year = normalize_year(cell);

    if year.is_none() && !cell.is_absent() {
        log.record(
            IssueKind::UnparseableValue,
            Some(source),
            &table.headers[column],
            cell.to_string(),
        );
    }

    year
}

// ============================================================================
// INGESTION
// ============================================================================

/// Auto insurance: `state` plus `avg_<year>` for each configured year.
///
/// At least one year column must exist; individual missing years are
/// simply left out of every record.
pub fn read_auto(
    table: &RawTable,
    years: &YearRange,
    log: &mut QualityLog,
) -> PipelineResult<Vec<AutoRecord>> {
    let source = SourceKind::Auto;
    let state_col = require_column(table, source, &STATE_COLUMNS)?;

    let year_cols: Vec<(i32, usize)> = years
        .years()
        .filter_map(|year| {
            table
                .column_index(&auto_year_column(year))
                .map(|col| (year, col))
        })
        .collect();

    if year_cols.is_empty() {
        return Err(PipelineError::MissingColumn {
            source,
            column: format!(
                "{}..{}",
                auto_year_column(years.start),
                auto_year_column(years.end)
            ),
        });
    }

    let mut records = Vec::new();
    for row in 0..table.len() {
        let Some(state) = row_state(table, row, state_col, source, log) else {
            continue;
        };

        let premiums = year_cols
            .iter()
            .map(|(year, col)| (*year, money_cell(table, row, *col, source, log)))
            .collect();

        records.push(AutoRecord { state, premiums });
    }

    Ok(records)
}

/// Home insurance: `state`, `avg_annual_usd`, optional `source_year`.
pub fn read_home(table: &RawTable, log: &mut QualityLog) -> PipelineResult<Vec<HomeRecord>> {
    let source = SourceKind::Home;
    let state_col = require_column(table, source, &STATE_COLUMNS)?;
    let premium_col = require_column(table, source, &HOME_PREMIUM_COLUMNS)?;
    let year_col = table.find_column(&HOME_YEAR_COLUMNS);

    let mut records = Vec::new();
    for row in 0..table.len() {
        let Some(state) = row_state(table, row, state_col, source, log) else {
            continue;
        };

        records.push(HomeRecord {
            state,
            year: year_cell(table, row, year_col, source, log),
            premium: money_cell(table, row, premium_col, source, log),
        });
    }

    Ok(records)
}

/// Disaster declarations: state key, optional declaration date, optional
/// incident type. Each record is classified once here.
pub fn read_disasters(
    table: &RawTable,
    classifier: &IncidentClassifier,
    log: &mut QualityLog,
) -> PipelineResult<Vec<DisasterRecord>> {
    let source = SourceKind::Disaster;
    let state_col = require_column(table, source, &DISASTER_STATE_COLUMNS)?;
    let date_col = table.find_column(&DISASTER_DATE_COLUMNS);
    let incident_col = table.find_column(&INCIDENT_COLUMNS);

    let mut records = Vec::new();
    for row in 0..table.len() {
        let Some(state) = row_state(table, row, state_col, source, log) else {
            continue;
        };

        let category = incident_col.map(|col| {
            table
                .cell(row, col)
                .as_text()
                .map_or(IncidentCategory::Other, |text| classifier.classify(text))
        });

        records.push(DisasterRecord {
            state,
            year: year_cell(table, row, date_col, source, log),
            category,
        });
    }

    Ok(records)
}

/// Weather observations: `state`, optional `year`, and every other column
/// holding at least one numeric cell counts as a measurement.
pub fn read_weather(table: &RawTable, log: &mut QualityLog) -> PipelineResult<WeatherRecords> {
    let source = SourceKind::Weather;
    let state_col = require_column(table, source, &STATE_COLUMNS)?;
    let year_col = table.find_column(&WEATHER_YEAR_COLUMNS);

    let measurement_cols: Vec<usize> = (0..table.headers.len())
        .filter(|col| *col != state_col && Some(*col) != year_col)
        .filter(|col| {
            let header = table.headers[*col].trim().to_lowercase();
            !NON_MEASUREMENT_COLUMNS.contains(&header.as_str())
        })
        .filter(|col| (0..table.len()).any(|row| table.cell(row, *col).is_numeric()))
        .collect();

    let mut records = Vec::new();
    for row in 0..table.len() {
        let Some(state) = row_state(table, row, state_col, source, log) else {
            continue;
        };

        let mut measurements = Vec::new();
        for col in &measurement_cols {
            let cell = table.cell(row, *col);
            match cell.as_f64() {
                Some(value) => measurements.push(value),
                None if !cell.is_absent() => log.record(
                    IssueKind::UnparseableValue,
                    Some(source),
                    &table.headers[*col],
                    cell.to_string(),
                ),
                None => {}
            }
        }

        records.push(WeatherRecord {
            state,
            year: year_cell(table, row, year_col, source, log),
            measurements,
        });
    }

    Ok(WeatherRecords {
        records,
        has_measurements: !measurement_cols.is_empty(),
    })
}

// ============================================================================
// TESTS
// ============================================================================
