//! Deal record: a sales opportunity and its computed commission fields.

use crate::domain::{CategoryId, DealId, DealStage, Money, TargetId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Commission values computed by the engine for one deal.
///
/// Present if and only if the deal is closed-won and a qualifying target was
/// found for its period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionFields {
    /// Final rate applied (0-1 fraction, after gates and structure).
    pub rate: Money,
    /// Commission amount: deal amount x rate, rounded to 2 dp half-up.
    pub amount: Money,
    /// When the engine last computed these values.
    pub calculated_at: DateTime<Utc>,
    /// The target whose period and rules produced these values.
    pub target_id: TargetId,
}

/// A sales opportunity owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub user_id: UserId,
    /// Monetary value of the deal.
    pub amount: Money,
    /// Canonical lifecycle state, parsed from `raw_stage`.
    pub stage: DealStage,
    /// Stage string as the upstream CRM sent it. Kept for audit; never
    /// compared directly.
    pub raw_stage: String,
    pub close_date: NaiveDate,
    pub product_category_id: Option<CategoryId>,
    /// Engine-owned commission fields; None until calculated or when cleared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<CommissionFields>,
}

impl Deal {
    /// Create a new deal with no commission computed yet.
    pub fn new(
        id: DealId,
        user_id: UserId,
        amount: Money,
        raw_stage: impl Into<String>,
        close_date: NaiveDate,
        product_category_id: Option<CategoryId>,
    ) -> Self {
        let raw_stage = raw_stage.into();
        let stage = crate::domain::parse_stage(&raw_stage);
        Deal {
            id,
            user_id,
            amount,
            stage,
            raw_stage,
            close_date,
            product_category_id,
            commission: None,
        }
    }
}
