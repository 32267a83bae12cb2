// 🗺️ State Registry - canonical two-letter codes
//
// Problem solved:
// - "Texas", "texas", "TX", "T.X." → all the same StateCode
// - "Countrywide" / "Nationwide" rollup rows → no state at all
//
// Every StateCode downstream of this module belongs to the fixed
// enumeration below; free text never survives normalization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// STATE CODE
// ============================================================================

/// Canonical identifier for the 50 states plus DC.
///
/// Ordering follows the two-letter code so every `BTreeMap<StateCode, _>`
/// iterates alphabetically by code.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StateCode {
    AK,
    AL,
    AR,
    AZ,
    CA,
    CO,
    CT,
    DC,
    DE,
    FL,
    GA,
    HI,
    IA,
    ID,
    IL,
    IN,
    KS,
    KY,
    LA,
    MA,
    MD,
    ME,
    MI,
    MN,
    MO,
    MS,
    MT,
    NC,
    ND,
    NE,
    NH,
    NJ,
    NM,
    NV,
    NY,
    OH,
    OK,
    OR,
    PA,
    RI,
    SC,
    SD,
    TN,
    TX,
    UT,
    VA,
    VT,
    WA,
    WI,
    WV,
    WY,
}

/// (code, full name) for every state, in code order.
const STATE_TABLE: [(StateCode, &str, &str); 51] = [
    (StateCode::AK, "AK", "ALASKA"),
    (StateCode::AL, "AL", "ALABAMA"),
    (StateCode::AR, "AR", "ARKANSAS"),
    (StateCode::AZ, "AZ", "ARIZONA"),
    (StateCode::CA, "CA", "CALIFORNIA"),
    (StateCode::CO, "CO", "COLORADO"),
    (StateCode::CT, "CT", "CONNECTICUT"),
    (StateCode::DC, "DC", "DISTRICT OF COLUMBIA"),
    (StateCode::DE, "DE", "DELAWARE"),
    (StateCode::FL, "FL", "FLORIDA"),
    (StateCode::GA, "GA", "GEORGIA"),
    (StateCode::HI, "HI", "HAWAII"),
    (StateCode::IA, "IA", "IOWA"),
    (StateCode::ID, "ID", "IDAHO"),
    (StateCode::IL, "IL", "ILLINOIS"),
    (StateCode::IN, "IN", "INDIANA"),
    (StateCode::KS, "KS", "KANSAS"),
    (StateCode::KY, "KY", "KENTUCKY"),
    (StateCode::LA, "LA", "LOUISIANA"),
    (StateCode::MA, "MA", "MASSACHUSETTS"),
    (StateCode::MD, "MD", "MARYLAND"),
    (StateCode::ME, "ME", "MAINE"),
    (StateCode::MI, "MI", "MICHIGAN"),
    (StateCode::MN, "MN", "MINNESOTA"),
    (StateCode::MO, "MO", "MISSOURI"),
    (StateCode::MS, "MS", "MISSISSIPPI"),
    (StateCode::MT, "MT", "MONTANA"),
    (StateCode::NC, "NC", "NORTH CAROLINA"),
    (StateCode::ND, "ND", "NORTH DAKOTA"),
    (StateCode::NE, "NE", "NEBRASKA"),
    (StateCode::NH, "NH", "NEW HAMPSHIRE"),
    (StateCode::NJ, "NJ", "NEW JERSEY"),
    (StateCode::NM, "NM", "NEW MEXICO"),
    (StateCode::NV, "NV", "NEVADA"),
    (StateCode::NY, "NY", "NEW YORK"),
    (StateCode::OH, "OH", "OHIO"),
    (StateCode::OK, "OK", "OKLAHOMA"),
    (StateCode::OR, "OR", "OREGON"),
    (StateCode::PA, "PA", "PENNSYLVANIA"),
    (StateCode::RI, "RI", "RHODE ISLAND"),
    (StateCode::SC, "SC", "SOUTH CAROLINA"),
    (StateCode::SD, "SD", "SOUTH DAKOTA"),
    (StateCode::TN, "TN", "TENNESSEE"),
    (StateCode::TX, "TX", "TEXAS"),
    (StateCode::UT, "UT", "UTAH"),
    (StateCode::VA, "VA", "VIRGINIA"),
    (StateCode::VT, "VT", "VERMONT"),
    (StateCode::WA, "WA", "WASHINGTON"),
    (StateCode::WI, "WI", "WISCONSIN"),
    (StateCode::WV, "WV", "WEST VIRGINIA"),
    (StateCode::WY, "WY", "WYOMING"),
];

/// Extra spellings seen in scraped tables that are not a code or full name.
const STATE_ALIASES: [(&str, StateCode); 2] = [
    ("WASHINGTON DC", StateCode::DC),
    ("DIST OF COLUMBIA", StateCode::DC),
];

/// Labels for nationwide rollup rows. Anything containing one is not a state.
const AGGREGATE_MARKERS: [&str; 4] = ["COUNTRYWIDE", "NATIONWIDE", "UNITED STATES", "TOTAL"];

impl StateCode {
    /// Every state in code order.
    pub fn all() -> impl Iterator<Item = StateCode> {
        STATE_TABLE.iter().map(|(state, _, _)| *state)
    }

    pub fn code(&self) -> &'static str {
        STATE_TABLE[self.position()].1
    }

    /// Upper-case full name, e.g. "NEW YORK".
    pub fn name(&self) -> &'static str {
        STATE_TABLE[self.position()].2
    }

    fn position(&self) -> usize {
        // Enum discriminants follow STATE_TABLE order
        *self as usize
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for StateCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_state(s).ok_or_else(|| format!("Unrecognized state: {}", s))
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Convert messy state text to a canonical code.
///
/// Uppercases, strips punctuation and collapses whitespace before looking
/// the key up against codes, full names and aliases.
///
/// ```
/// use state_risk::states::{normalize_state, StateCode};
///
/// assert_eq!(normalize_state("texas"), Some(StateCode::TX));
/// assert_eq!(normalize_state("N.Y."), Some(StateCode::NY));
/// assert_eq!(normalize_state("Countrywide"), None);
/// ```
pub fn normalize_state(raw: &str) -> Option<StateCode> {
    let stripped: String = raw
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .to_uppercase();
    let key = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    if key.is_empty() {
        return None;
    }

    if AGGREGATE_MARKERS.iter().any(|marker| key.contains(marker)) {
        return None;
    }

    STATE_TABLE
        .iter()
        .find(|(_, code, name)| *code == key || *name == key)
        .map(|(state, _, _)| *state)
        .or_else(|| {
            STATE_ALIASES
                .iter()
                .find(|(alias, _)| *alias == key)
                .map(|(_, state)| *state)
        })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_table_covers_fifty_one_codes() {
        assert_eq!(StateCode::all().count(), 51);
    }

    #[test]
    fn test_table_order_matches_discriminants() {
        for (position, (state, code, _)) in STATE_TABLE.iter().enumerate() {
            assert_eq!(*state as usize, position);
            assert_eq!(state.code(), *code);
        }
    }

    #[test]
    fn test_every_code_and_name_normalizes() {
        for (state, code, name) in STATE_TABLE.iter() {
            assert_eq!(normalize_state(code), Some(*state));
            assert_eq!(normalize_state(name), Some(*state));
            assert_eq!(normalize_state(&name.to_lowercase()), Some(*state));
        }
    }

    #[test]
    fn test_messy_spellings() {
        assert_eq!(normalize_state("  new   york "), Some(StateCode::NY));
        assert_eq!(normalize_state("D.C."), Some(StateCode::DC));
        assert_eq!(normalize_state("Washington, D.C."), Some(StateCode::DC));
        assert_eq!(normalize_state("tx."), Some(StateCode::TX));
    }

    #[test]
    fn test_aggregate_markers_map_to_none() {
        assert_eq!(normalize_state("Countrywide"), None);
        assert_eq!(normalize_state("Countrywide Total"), None);
        assert_eq!(normalize_state("NATIONWIDE"), None);
        assert_eq!(normalize_state("United States"), None);
    }

    #[test]
    fn test_unknown_values_map_to_none() {
        assert_eq!(normalize_state(""), None);
        assert_eq!(normalize_state("Puerto Rico"), None);
        assert_eq!(normalize_state("XX"), None);
        assert_eq!(normalize_state("Tex"), None);
    }

    #[test]
    fn test_from_str_and_display() {
        let state: StateCode = "California".parse().unwrap();
        assert_eq!(state, StateCode::CA);
        assert_eq!(state.to_string(), "CA");
        assert!("Atlantis".parse::<StateCode>().is_err());
    }

    #[test]
    fn test_serializes_as_code() {
        let json = serde_json::to_string(&StateCode::WV).unwrap();
        assert_eq!(json, "\"WV\"");
    }

    proptest! {
        #[test]
        fn normalize_state_is_idempotent(raw in ".{0,24}") {
            if let Some(state) = normalize_state(&raw) {
                prop_assert_eq!(normalize_state(state.code()), Some(state));
            }
        }
    }
}
