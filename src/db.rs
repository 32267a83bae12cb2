// 🗄️ Snapshot Store - scored runs in SQLite
//
// A snapshot is one RiskReport keyed by its digest. Saving the same report
// twice is a no-op: the digest column is UNIQUE and a constraint violation
// means "already stored".

use crate::pipeline::RiskReport;
use crate::scoring::ScoredRow;
use crate::states::StateCode;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

/// Open (or create) a snapshot database and make sure its tables exist.
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Runs (one per distinct report)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS risk_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            digest TEXT UNIQUE NOT NULL,
            selection TEXT NOT NULL,
            config_version INTEGER NOT NULL,
            row_count INTEGER NOT NULL,
            diagnostics TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Scores (one per state per run)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS risk_scores (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            digest TEXT NOT NULL,
            state TEXT NOT NULL,
            average_premium REAL NOT NULL,
            disaster_count REAL NOT NULL,
            severity_score REAL NOT NULL,
            weather_score REAL NOT NULL,
            premium_index REAL NOT NULL,
            disaster_index REAL NOT NULL,
            severity_index REAL NOT NULL,
            weather_index REAL NOT NULL,
            risk_score REAL NOT NULL,
            disaster_matched INTEGER NOT NULL,
            weather_matched INTEGER NOT NULL,
            UNIQUE(digest, state)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scores_digest ON risk_scores(digest)",
        [],
    )?;

    Ok(())
}

/// Store a report. Returns false when a snapshot with the same digest was
/// already there.
pub fn save_report(conn: &Connection, report: &RiskReport) -> Result<bool> {
    let selection_json = serde_json::to_string(&report.selection)?;
    let diagnostics_json = serde_json::to_string(&report.diagnostics)?;

    let tx = conn.unchecked_transaction()?;

    let result = tx.execute(
        "INSERT INTO risk_runs (digest, selection, config_version, row_count, diagnostics, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            report.digest,
            selection_json,
            report.config_version,
            report.rows.len() as i64,
            diagnostics_json,
            Utc::now().to_rfc3339(),
        ],
    );

    match result {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            debug!("Snapshot {} already stored", report.digest);
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    }

    for row in &report.rows {
        tx.execute(
            "INSERT INTO risk_scores (
                digest, state, average_premium, disaster_count, severity_score,
                weather_score, premium_index, disaster_index, severity_index,
                weather_index, risk_score, disaster_matched, weather_matched
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                report.digest,
                row.state.code(),
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
                row.weather_matched,
            ],
        )?;
    }

    tx.commit()?;
    info!("Saved snapshot {} ({} rows)", report.digest, report.rows.len());

    Ok(true)
}

/// Scored rows of one snapshot, in the order they were scored.
pub fn load_scores(conn: &Connection, digest: &str) -> Result<Vec<ScoredRow>> {
    let mut stmt = conn.prepare(
        "SELECT state, average_premium, disaster_count, severity_score, weather_score,
                premium_index, disaster_index, severity_index, weather_index,
                risk_score, disaster_matched, weather_matched
         FROM risk_scores
         WHERE digest = ?1
         ORDER BY id",
    )?;

    let rows = stmt
        .query_map([digest], |row| {
            let code: String = row.get(0)?;
            let state = code.parse::<StateCode>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into())
            })?;

            Ok(ScoredRow {
                state,
                average_premium: row.get(1)?,
                disaster_count: row.get(2)?,
                severity_score: row.get(3)?,
                weather_score: row.get(4)?,
                premium_index: row.get(5)?,
                disaster_index: row.get(6)?,
                severity_index: row.get(7)?,
                weather_index: row.get(8)?,
                risk_score: row.get(9)?,
                disaster_matched: row.get(10)?,
                weather_matched: row.get(11)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read snapshot {}", digest))?;

    Ok(rows)
}

pub fn latest_digest(conn: &Connection) -> Result<Option<String>> {
    let digest = conn
        .query_row(
            "SELECT digest FROM risk_runs ORDER BY id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(digest)
}

pub fn snapshot_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM risk_runs", [], |row| row.get(0))?;

    Ok(count)
}
