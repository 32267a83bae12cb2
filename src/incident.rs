// 🌪️ Incident Classification - Rules as Data
// Keyword rules that bucket free-text disaster descriptions into a fixed
// taxonomy. First matching rule (by priority) wins.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

// ============================================================================
// INCIDENT CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IncidentCategory {
    Hurricane,
    Flood,
    Fire,
    SevereStorm,
    Winter,
    Other,
}

impl IncidentCategory {
    pub fn all() -> [IncidentCategory; 6] {
        [
            IncidentCategory::Hurricane,
            IncidentCategory::Flood,
            IncidentCategory::Fire,
            IncidentCategory::SevereStorm,
            IncidentCategory::Winter,
            IncidentCategory::Other,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            IncidentCategory::Hurricane => "Hurricane",
            IncidentCategory::Flood => "Flood",
            IncidentCategory::Fire => "Fire",
            IncidentCategory::SevereStorm => "Severe Storm",
            IncidentCategory::Winter => "Winter",
            IncidentCategory::Other => "Other",
        }
    }
}

impl fmt::Display for IncidentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// SEVERITY WEIGHTS
// ============================================================================

/// Multiplier applied to each category's record count when building a
/// state's severity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityWeights {
    pub hurricane: f64,
    pub fire: f64,
    pub flood: f64,
    pub severe_storm: f64,
    pub winter: f64,
    pub other: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        SeverityWeights {
            hurricane: 2.0,
            fire: 1.8,
            flood: 1.7,
            severe_storm: 1.4,
            winter: 1.2,
            other: 1.0,
        }
    }
}

impl SeverityWeights {
    pub fn weight(&self, category: IncidentCategory) -> f64 {
        match category {
            IncidentCategory::Hurricane => self.hurricane,
            IncidentCategory::Fire => self.fire,
            IncidentCategory::Flood => self.flood,
            IncidentCategory::SevereStorm => self.severe_storm,
            IncidentCategory::Winter => self.winter,
            IncidentCategory::Other => self.other,
        }
    }

    pub fn values(&self) -> [f64; 6] {
        [
            self.hurricane,
            self.fire,
            self.flood,
            self.severe_storm,
            self.winter,
            self.other,
        ]
    }
}

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentRule {
    pub category: IncidentCategory,

    /// Upper-case keywords; any one contained in the text is a match
    pub keywords: Vec<String>,

    /// Higher = tested first
    pub priority: i32,
}

impl IncidentRule {
    pub fn new(category: IncidentCategory, keywords: &[&str], priority: i32) -> Self {
        IncidentRule {
            category,
            keywords: keywords.iter().map(|k| k.to_uppercase()).collect(),
            priority,
        }
    }

    /// `text` must already be upper-case.
    fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|keyword| text.contains(keyword.as_str()))
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

pub struct IncidentClassifier {
    rules: Vec<IncidentRule>,
}

impl IncidentClassifier {
    /// Default precedence: Hurricane, Flood, Fire, Winter, SevereStorm.
    ///
    /// Winter is tested before SevereStorm so "SEVERE WINTER STORM" and
    /// "Severe Ice Storm" resolve to Winter.
    pub fn new() -> Self {
        IncidentClassifier::from_rules(vec![
            IncidentRule::new(
                IncidentCategory::Hurricane,
                &["HURRICANE", "TROPICAL", "TYPHOON"],
                50,
            ),
            IncidentRule::new(IncidentCategory::Flood, &["FLOOD"], 40),
            IncidentRule::new(IncidentCategory::Fire, &["FIRE", "WILDFIRE"], 30),
            IncidentRule::new(
                IncidentCategory::Winter,
                &["SNOW", "BLIZZARD", "FREEZE", "WINTER", "ICE"],
                20,
            ),
            IncidentRule::new(
                IncidentCategory::SevereStorm,
                &["STORM", "TORNADO", "WIND", "HAIL"],
                10,
            ),
        ])
    }

    pub fn from_rules(mut rules: Vec<IncidentRule>) -> Self {
        // Stable sort keeps insertion order among equal priorities
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        IncidentClassifier { rules }
    }

    pub fn classify(&self, raw_text: &str) -> IncidentCategory {
        let text = raw_text.to_uppercase();

        self.rules
            .iter()
            .find(|rule| rule.matches(&text))
            .map(|rule| rule.category)
            .unwrap_or(IncidentCategory::Other)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for IncidentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify with the default rule set.
pub fn classify_incident(raw_text: &str) -> IncidentCategory {
    static CLASSIFIER: OnceLock<IncidentClassifier> = OnceLock::new();
    CLASSIFIER.get_or_init(IncidentClassifier::new).classify(raw_text)
}

// ============================================================================
// TESTS
// ============================================================================
