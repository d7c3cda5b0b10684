//! Pure performance-gate evaluation over period aggregates.
//!
//! Gates never see individual deals; they see only attainment percent, total
//! sales, and the quota amount for the period.

use crate::domain::{GateEnforcement, GateMetric, GateOperator, GatePenalty, Money, PerformanceGate};

/// Period-level aggregates fed to gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodAggregates {
    pub total_sales: Money,
    pub quota_amount: Money,
    pub attainment_percent: Money,
}

/// Outcome of evaluating one gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResult {
    pub name: String,
    /// Business-rule pass. For zero-commission gates this is the INVERSE of
    /// the numeric comparison: a gate phrased "fails below 50% attainment"
    /// numerically matches when attainment IS below 50, which means the
    /// business rule did not pass.
    pub passed: bool,
    pub enforcement: GateEnforcement,
    pub penalty: GatePenalty,
}

/// Outcome of evaluating every gate on a target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GateReport {
    pub results: Vec<GateResult>,
    /// True when any hard-enforcement gate did not pass. Short-circuits all
    /// rate-structure logic to a final rate of zero.
    pub hard_failed: bool,
}

fn metric_value(metric: GateMetric, aggregates: &PeriodAggregates) -> Money {
    match metric {
        GateMetric::AttainmentPercent => aggregates.attainment_percent,
        GateMetric::TotalSales => aggregates.total_sales,
        GateMetric::QuotaAmount => aggregates.quota_amount,
    }
}

fn compare(operator: GateOperator, value: Money, threshold: Money) -> bool {
    match operator {
        GateOperator::Gt => value > threshold,
        GateOperator::Gte => value >= threshold,
        GateOperator::Lt => value < threshold,
        GateOperator::Lte => value <= threshold,
        GateOperator::Eq => value == threshold,
    }
}

/// Evaluate a single gate against the period aggregates.
pub fn evaluate_gate(gate: &PerformanceGate, aggregates: &PeriodAggregates) -> GateResult {
    let value = metric_value(gate.metric, aggregates);
    let raw = compare(gate.operator, value, gate.threshold);

    // Zero-commission gates are phrased as failure conditions: matching the
    // numeric condition means the business rule failed. Do not "fix" this
    // inversion; it is the contract.
    let passed = match gate.penalty {
        GatePenalty::ZeroCommission => !raw,
        GatePenalty::PercentageReduction { .. } => raw,
    };

    GateResult {
        name: gate.name.clone(),
        passed,
        enforcement: gate.enforcement,
        penalty: gate.penalty.clone(),
    }
}

/// Evaluate every gate; `hard_failed` is set when any hard gate fails.
pub fn evaluate_gates(gates: &[PerformanceGate], aggregates: &PeriodAggregates) -> GateReport {
    let results: Vec<GateResult> = gates
        .iter()
        .map(|g| evaluate_gate(g, aggregates))
        .collect();
    let hard_failed = results
        .iter()
        .any(|r| r.enforcement == GateEnforcement::Hard && !r.passed);
    GateReport {
        results,
        hard_failed,
    }
}
