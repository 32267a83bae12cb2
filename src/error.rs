// 🚨 Pipeline Errors - structural failures only
// Cell-level and row-level problems never land here; they are absorbed
// and reported through data_quality. These abort the run.

use crate::sources::SourceKind;

// ============================================================================
// PIPELINE ERROR
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A required column is absent from a source table.
    MissingColumn { source: SourceKind, column: String },

    /// The primary insurance table selected for the run was not supplied.
    MissingSource(SourceKind),

    /// The primary table exists but not a single row carries a usable premium.
    NoPremiumData(SourceKind),

    /// The scoring configuration failed validation.
    InvalidConfig(String),

    /// An Auto run asked for a year the configuration has no column for.
    YearOutOfRange { year: i32, start: i32, end: i32 },
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::MissingColumn { source, column } => {
                write!(f, "Missing column in {} table: {}", source.name(), column)
            }
            PipelineError::MissingSource(source) => {
                write!(f, "Primary source not supplied: {}", source.name())
            }
            PipelineError::NoPremiumData(source) => {
                write!(f, "No usable premium values in {} table", source.name())
            }
            PipelineError::InvalidConfig(reason) => write!(f, "Invalid configuration: {}", reason),
            PipelineError::YearOutOfRange { year, start, end } => {
                write!(f, "Year {} is outside the configured range {}..={}", year, start, end)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

pub type PipelineResult<T> = Result<T, PipelineError>;
