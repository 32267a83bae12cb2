// ⚙️ Scoring Configuration - one versioned structure
// Every weight and threshold the scorer uses lives here, loaded once and
// passed down. Nothing below this module carries its own constants.

use crate::error::{PipelineError, PipelineResult};
use crate::incident::SeverityWeights;
use crate::normalize::{MAX_YEAR, MIN_YEAR};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_VERSION: u32 = 1;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// ============================================================================
// RISK WEIGHTS
// ============================================================================

/// Weight of each index in the composite score. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub premium: f64,
    pub disaster: f64,
    pub severity: f64,
    pub weather: f64,
}

impl RiskWeights {
    /// Canonical scheme: premium 0.5, severity 0.3, weather 0.2.
    pub fn three_factor() -> Self {
        RiskWeights {
            premium: 0.5,
            disaster: 0.0,
            severity: 0.3,
            weather: 0.2,
        }
    }

    /// For runs without severity data: premium 0.6, disaster count 0.4.
    pub fn two_factor() -> Self {
        RiskWeights {
            premium: 0.6,
            disaster: 0.4,
            severity: 0.0,
            weather: 0.0,
        }
    }

    pub fn sum(&self) -> f64 {
        self.premium + self.disaster + self.severity + self.weather
    }

    fn values(&self) -> [f64; 4] {
        [self.premium, self.disaster, self.severity, self.weather]
    }
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self::three_factor()
    }
}

// ============================================================================
// YEAR RANGE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        YearRange { start, end }
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

impl Default for YearRange {
    fn default() -> Self {
        YearRange::new(2018, 2022)
    }
}

// ============================================================================
// SCORING CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub version: u32,
    pub weights: RiskWeights,
    pub severity_weights: SeverityWeights,

    /// Index assigned when a metric cannot be compared (degenerate mean,
    /// unmatched weather row)
    pub neutral_index: f64,

    /// Years with an `avg_<year>` column in the Auto table
    pub auto_years: YearRange,

    /// Baseline year of the premium trend series
    pub trend_base_year: i32,

    /// Restrict disaster and weather records to the selected insurance
    /// year instead of pooling every year
    pub scope_secondary_to_year: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            version: CONFIG_VERSION,
            weights: RiskWeights::three_factor(),
            severity_weights: SeverityWeights::default(),
            neutral_index: 1.0,
            auto_years: YearRange::default(),
            trend_base_year: 2018,
            scope_secondary_to_year: false,
        }
    }
}

impl ScoringConfig {
    /// Default config with the two-factor premium/disaster weights.
    pub fn two_factor() -> Self {
        ScoringConfig {
            weights: RiskWeights::two_factor(),
            ..ScoringConfig::default()
        }
    }

    /// Load a config from a JSON file. Fields left out keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: ScoringConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        let weights = self.weights.values();

        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(PipelineError::InvalidConfig(
                "risk weights must be finite and non-negative".to_string(),
            ));
        }

        if (self.weights.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(PipelineError::InvalidConfig(format!(
                "risk weights must sum to 1.0, got {}",
                self.weights.sum()
            )));
        }

        if self
            .severity_weights
            .values()
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(PipelineError::InvalidConfig(
                "severity weights must be finite and non-negative".to_string(),
            ));
        }

        if !self.neutral_index.is_finite() {
            return Err(PipelineError::InvalidConfig(
                "neutral index must be finite".to_string(),
            ));
        }

        if self.auto_years.start > self.auto_years.end {
            return Err(PipelineError::InvalidConfig(format!(
                "auto year range is inverted: {}..{}",
                self.auto_years.start, self.auto_years.end
            )));
        }

        let in_bounds = |y: i32| (MIN_YEAR..=MAX_YEAR).contains(&y);
        if !in_bounds(self.auto_years.start)
            || !in_bounds(self.auto_years.end)
            || !in_bounds(self.trend_base_year)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "years must lie within {}..={}",
                MIN_YEAR, MAX_YEAR
            )));
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
