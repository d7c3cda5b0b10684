//! Domain types: ids, money, deal lifecycle stage, deal and target records.

pub mod deal;
pub mod money;
pub mod primitives;
pub mod stage;
pub mod target;

pub use deal::{CommissionFields, Deal};
pub use money::{Money, Rounding};
pub use primitives::{CategoryId, DealId, TargetId, UserId};
pub use stage::{parse_stage, DealStage};
pub use target::{
    AmountTier, CommissionStructure, GateEnforcement, GateMetric, GateOperator, GatePenalty,
    PerformanceGate, PeriodType, RateTier, Target,
};
