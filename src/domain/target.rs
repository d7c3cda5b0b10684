//! Target record: a quota assigned to a user for a period, plus its
//! commission structure and performance gate descriptors.

use crate::domain::{CategoryId, Money, TargetId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Granularity of a target's period. Ordered most-granular first: when two
/// targets tie on quota, the monthly target wins over the quarterly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    Monthly,
    Quarterly,
    Annual,
}

impl PeriodType {
    /// Granularity rank: lower is more granular.
    pub fn granularity(&self) -> u8 {
        match self {
            PeriodType::Monthly => 0,
            PeriodType::Quarterly => 1,
            PeriodType::Annual => 2,
        }
    }
}

/// One attainment tier of an accelerator or decelerator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTier {
    /// Attainment percentage threshold (e.g. 100 means 100%).
    pub attainment_threshold: Money,
    /// Multiplier applied to the base rate when the tier qualifies.
    pub rate_multiplier: Money,
}

/// One per-deal-amount tier of a tiered structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountTier {
    /// Deal amount threshold.
    pub amount_threshold: Money,
    /// Absolute rate (0-1 fraction) for deals at or above the threshold.
    pub rate: Money,
}

/// Rate-modification descriptor attached to a target. A flat base rate is the
/// absence of a structure (`Option<CommissionStructure>` = None).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommissionStructure {
    /// Boost the base rate once attainment reaches a tier threshold. Among
    /// qualifying tiers the greatest multiplier wins.
    Accelerator { tiers: Vec<RateTier> },
    /// Cut the base rate when attainment is below a tier's floor. Among
    /// qualifying tiers the smallest multiplier (most punitive) wins.
    Decelerator { tiers: Vec<RateTier> },
    /// Per-deal-amount tiering. Not computable at period level; the engine
    /// falls back to the base rate and logs the gap.
    Tiered { tiers: Vec<AmountTier> },
}

/// Which period-level aggregate a gate inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMetric {
    AttainmentPercent,
    TotalSales,
    QuotaAmount,
}

/// Comparison operator between the metric value and the gate threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOperator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

/// Whether a failed gate blocks the whole period or only adjusts the rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateEnforcement {
    Hard,
    Soft,
}

/// Penalty applied when a gate does not pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GatePenalty {
    ZeroCommission,
    /// Reduce the derived rate by this many percent.
    PercentageReduction { percent: Money },
}

/// A pass/fail rule over period aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceGate {
    pub name: String,
    pub metric: GateMetric,
    pub operator: GateOperator,
    pub threshold: Money,
    pub enforcement: GateEnforcement,
    pub penalty: GatePenalty,
}

/// A quota assigned to a user for a time period. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub user_id: UserId,
    pub is_active: bool,
    /// Inclusive period bounds.
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub period_type: PeriodType,
    pub quota_amount: Money,
    /// Base commission rate as a 0-1 fraction.
    pub commission_rate: Money,
    /// When set, only deals in this category are priced by this target.
    pub product_category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<CommissionStructure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gates: Vec<PerformanceGate>,
    pub created_at: DateTime<Utc>,
}

impl Target {
    /// True when `date` falls within the target's inclusive period bounds.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.period_start <= date && date <= self.period_end
    }

    /// True when this target can price a deal in the given category.
    ///
    /// A target with no category restriction accepts any deal; a restricted
    /// target accepts only its own category. A deal with no category is only
    /// accepted by unrestricted targets.
    pub fn accepts_category(&self, deal_category: Option<&CategoryId>) -> bool {
        match (&self.product_category_id, deal_category) {
            (None, _) => true,
            (Some(tc), Some(dc)) => tc == dc,
            (Some(_), None) => false,
        }
    }
}
