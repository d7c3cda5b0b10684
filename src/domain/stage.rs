//! Deal lifecycle stage with a normalizing parser.
//!
//! Upstream CRMs send the stage as free text ("Closed Won", "closed_won",
//! "CLOSED-WON"...). All spellings collapse to one canonical state here;
//! nothing downstream ever compares raw stage strings.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Canonical deal lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    /// Any in-flight stage: new, qualified, proposal, negotiation...
    Open,
    /// Deal won and counted toward attainment.
    ClosedWon,
    /// Deal lost; excluded from commission.
    ClosedLost,
}

impl DealStage {
    /// True when the deal counts toward attainment and earns commission.
    pub fn is_closed_won(&self) -> bool {
        matches!(self, DealStage::ClosedWon)
    }
}

impl std::fmt::Display for DealStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DealStage::Open => write!(f, "open"),
            DealStage::ClosedWon => write!(f, "closed_won"),
            DealStage::ClosedLost => write!(f, "closed_lost"),
        }
    }
}

/// Normalize a raw stage string: lowercase, strip whitespace/underscores/hyphens.
fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Parse a free-text stage string into the canonical state.
///
/// Unrecognized spellings map to `Open` with a logged warning so an upstream
/// rename never silently counts (or drops) a deal.
pub fn parse_stage(raw: &str) -> DealStage {
    match normalize(raw).as_str() {
        "closedwon" | "won" => DealStage::ClosedWon,
        "closedlost" | "lost" => DealStage::ClosedLost,
        "open" | "new" | "lead" | "qualify" | "qualified" | "qualifiedtobuy" | "proposal"
        | "negotiate" | "negotiation" | "contractsent" | "appointmentscheduled"
        | "presentationscheduled" | "decisionmakerboughtin" => DealStage::Open,
        other => {
            warn!(raw_stage = %raw, normalized = %other, "Unrecognized deal stage, treating as open");
            DealStage::Open
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_won_variants_normalize_identically() {
        for raw in ["closed_won", "Closed Won", "closedwon", "CLOSED-WON", " closed  won "] {
            assert_eq!(parse_stage(raw), DealStage::ClosedWon, "variant: {:?}", raw);
        }
    }

    #[test]
    fn test_closed_lost_variants() {
        for raw in ["closed_lost", "Closed Lost", "CLOSEDLOST", "lost"] {
            assert_eq!(parse_stage(raw), DealStage::ClosedLost, "variant: {:?}", raw);
        }
    }

    #[test]
    fn test_known_open_stages() {
        for raw in ["new", "Qualified To Buy", "contract_sent", "Appointment Scheduled"] {
            assert_eq!(parse_stage(raw), DealStage::Open, "variant: {:?}", raw);
        }
    }

    #[test]
    fn test_unknown_stage_defaults_to_open() {
        assert_eq!(parse_stage("totally mysterious"), DealStage::Open);
    }

    #[test]
    fn test_stage_display_roundtrip() {
        for stage in [DealStage::Open, DealStage::ClosedWon, DealStage::ClosedLost] {
            assert_eq!(parse_stage(&stage.to_string()), stage);
        }
    }

    #[test]
    fn test_stage_serialization() {
        let json = serde_json::to_string(&DealStage::ClosedWon).unwrap();
        assert_eq!(json, "\"closed_won\"");
    }
}
