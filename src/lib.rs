pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod store;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    CategoryId, CommissionFields, CommissionStructure, Deal, DealId, DealStage, GateEnforcement,
    GateMetric, GateOperator, GatePenalty, Money, PerformanceGate, PeriodType, RateTier, Rounding,
    Target, TargetId, UserId,
};
pub use engine::{CommissionEngine, CommissionSummary, PeriodOutcome, RecalcOutcome, SweepReport};
pub use error::EngineError;
pub use store::{CommissionStore, CommissionUpdate, MemoryStore, StoreError};
