// State Risk Index - Core Library
// Exposes all modules for use in the CLI and tests

pub mod states;       // State identifiers and name normalization
pub mod normalize;    // Cell classification, years, money
pub mod incident;     // Disaster incident taxonomy
pub mod sources;      // Source tables and record ingestion
pub mod aggregate;    // Per-source aggregation
pub mod merge;        // Left join on the primary premium table
pub mod index;        // Metric / national mean
pub mod scoring;      // Composite score, trend, breakdown, ranking
pub mod config;       // Versioned scoring configuration
pub mod pipeline;     // End-to-end run and report
pub mod error;        // Fatal pipeline errors
pub mod data_quality; // Non-fatal diagnostics
pub mod loader;       // CSV files → RawTables
pub mod db;           // SQLite snapshot store

// Re-export commonly used types
pub use states::{normalize_state, StateCode};
pub use normalize::{normalize_money, normalize_year, CellValue};
pub use incident::{classify_incident, IncidentCategory, IncidentClassifier, SeverityWeights};
pub use sources::{RawTable, SourceKind, SourceTables};
pub use aggregate::{DisasterMetrics, PremiumHistory, YearScope};
pub use merge::{DatasetMerger, MergedRow};
pub use index::{to_index, IndexCalculator, IndexSet};
pub use scoring::{BreakdownEntry, RiskScorer, ScoredRow, TrendPoint};
pub use config::{RiskWeights, ScoringConfig, YearRange};
pub use pipeline::{InsuranceSelection, RiskPipeline, RiskReport};
pub use error::{PipelineError, PipelineResult};
pub use data_quality::{IssueKind, QualityIssue, QualityLog, Severity};
pub use loader::{load_sources, load_table, SourcePaths};
pub use db::{
    latest_digest, load_scores, open_database, save_report, setup_database, snapshot_count,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
