//! Pure commission-structure evaluation: accelerators, decelerators, and the
//! tiered fallback.

use crate::domain::{CommissionStructure, Money};

/// Result of applying a commission structure at a given attainment level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureApplication {
    /// Multiplier to apply to the target's base rate.
    pub multiplier: Money,
    /// Set when a tiered structure was configured but could not be computed
    /// at period level and the base rate was used instead.
    pub tiered_fallback: bool,
}

impl StructureApplication {
    fn flat() -> Self {
        StructureApplication {
            multiplier: Money::one(),
            tiered_fallback: false,
        }
    }
}

/// Derive the rate multiplier for a structure at the given attainment percent.
///
/// - No structure: multiplier 1 (flat base rate).
/// - Accelerator: among tiers whose threshold <= attainment, the GREATEST
///   multiplier wins (not the greatest threshold).
/// - Decelerator: among tiers whose threshold > attainment (attainment is
///   below the tier's floor), the SMALLEST multiplier wins (most punitive).
/// - Tiered: needs per-deal amounts, which period-level recalculation does
///   not have; falls back to multiplier 1 and flags it for the caller to log.
pub fn evaluate_structure(
    structure: Option<&CommissionStructure>,
    attainment_percent: Money,
) -> StructureApplication {
    let Some(structure) = structure else {
        return StructureApplication::flat();
    };

    match structure {
        CommissionStructure::Accelerator { tiers } => {
            let multiplier = tiers
                .iter()
                .filter(|t| t.attainment_threshold <= attainment_percent)
                .map(|t| t.rate_multiplier)
                .max()
                .unwrap_or_else(Money::one);
            StructureApplication {
                multiplier,
                tiered_fallback: false,
            }
        }
        CommissionStructure::Decelerator { tiers } => {
            let multiplier = tiers
                .iter()
                .filter(|t| t.attainment_threshold > attainment_percent)
                .map(|t| t.rate_multiplier)
                .min()
                .unwrap_or_else(Money::one);
            StructureApplication {
                multiplier,
                tiered_fallback: false,
            }
        }
        CommissionStructure::Tiered { .. } => StructureApplication {
            multiplier: Money::one(),
            tiered_fallback: true,
        },
    }
}
