//! Commission computation engine: pure gate/rate evaluation plus the
//! period recalculation orchestrator.

use crate::domain::{Money, TargetId};

pub mod gates;
pub mod rates;
pub mod recalc;

pub use gates::{evaluate_gate, evaluate_gates, GateReport, GateResult, PeriodAggregates};
pub use rates::{evaluate_structure, StructureApplication};
pub use recalc::CommissionEngine;

/// Result of a recalculation request. The empty outcomes are expected,
/// logged, non-fatal cases, never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecalcOutcome {
    /// Commission was recomputed and written back for the whole period.
    Applied(PeriodOutcome),
    /// No active target covers the date; nothing to price against.
    NoActiveTarget,
    /// The chosen target's period contains no closed-won deals.
    NoDealsInPeriod,
    /// The originating deal is not closed-won; no-op.
    DealNotClosedWon,
    /// The target exists but is inactive; no-op.
    TargetInactive,
    /// A stage update that neither entered nor left closed-won; no-op.
    NoStageTransition,
}

/// What one applied period recalculation computed and persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodOutcome {
    pub target_id: TargetId,
    pub total_sales: Money,
    pub attainment_percent: Money,
    /// Final rate written onto every deal (0-1 fraction, post gates and
    /// structure).
    pub final_rate: Money,
    pub hard_gate_failed: bool,
    pub deals_updated: usize,
    pub gate_results: Vec<GateResult>,
}

/// Read-only period aggregation for dashboards and reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionSummary {
    pub total_deals: usize,
    pub closed_won_deals: usize,
    pub total_sales: Money,
    pub total_commission: Money,
    /// Closed-won deals still missing a commission value: a health-check
    /// signal that a real-time trigger was missed.
    pub missing_commission_count: usize,
}

/// Result of a reconciliation sweep over unpriced closed-won deals.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Closed-won deals with no commission at the start of the sweep.
    pub candidates: usize,
    /// Periods successfully recalculated.
    pub recalculated: usize,
    /// Deals found already priced by an earlier recalculation in this sweep.
    pub already_priced: usize,
    /// Deals whose period has no active target (left unpriced).
    pub without_target: usize,
}
