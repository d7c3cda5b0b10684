//! Period-based commission recalculation.
//!
//! Whenever any deal in a period changes, the whole period is recomputed:
//! attainment moves, which can move every other deal's accelerator tier, so
//! per-deal incremental updates would drift. Recomputation is idempotent and
//! order-independent given the same input deal set, which is what makes
//! last-writer-wins safe when two invocations race on the same period.

use crate::config::Config;
use crate::domain::{
    parse_stage, Deal, DealId, GateEnforcement, GatePenalty, Money, Rounding, Target, TargetId,
    UserId,
};
use crate::engine::gates::{evaluate_gates, PeriodAggregates};
use crate::engine::rates::evaluate_structure;
use crate::engine::{CommissionSummary, PeriodOutcome, RecalcOutcome, SweepReport};
use crate::error::EngineError;
use crate::store::{CommissionStore, CommissionUpdate};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

const DEFAULT_SWEEP_BATCH_SIZE: usize = 500;

/// The commission engine. Holds the store collaborator; issues no network
/// calls and keeps no state between invocations.
pub struct CommissionEngine {
    store: Arc<dyn CommissionStore>,
    sweep_batch_size: usize,
}

impl CommissionEngine {
    pub fn new(store: Arc<dyn CommissionStore>) -> Self {
        Self {
            store,
            sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
        }
    }

    /// Build an engine configured from the environment-driven `Config`.
    pub fn from_config(store: Arc<dyn CommissionStore>, config: &Config) -> Self {
        Self::new(store).with_sweep_batch_size(config.sweep_batch_size)
    }

    /// Override the reconciliation sweep batch size.
    pub fn with_sweep_batch_size(mut self, size: usize) -> Self {
        self.sweep_batch_size = size;
        self
    }

    /// Compute commission for the period containing one deal.
    ///
    /// A deal that is not closed-won is a no-op, not an error; an unknown
    /// deal id is `EngineError::DealNotFound`.
    pub async fn calculate_deal_commission(
        &self,
        deal_id: &DealId,
    ) -> Result<RecalcOutcome, EngineError> {
        let deal = self
            .store
            .get_deal(deal_id)
            .await?
            .ok_or_else(|| EngineError::DealNotFound(deal_id.clone()))?;

        if !deal.stage.is_closed_won() {
            debug!(deal_id = %deal.id, stage = %deal.stage, "Deal not closed-won, skipping commission calculation");
            return Ok(RecalcOutcome::DealNotClosedWon);
        }

        self.recalculate_period(&deal.user_id, deal.close_date, Some(&deal))
            .await
    }

    /// Recompute commission for every closed-won deal in the period covering
    /// `date_in_period`, and write the results back atomically.
    ///
    /// `originating_deal` carries the category context when the trigger was a
    /// specific deal; a categorized deal that no active target accepts is a
    /// hard `CategoryMismatch` error rather than a silent mis-attribution.
    pub async fn recalculate_period(
        &self,
        user_id: &UserId,
        date_in_period: NaiveDate,
        originating_deal: Option<&Deal>,
    ) -> Result<RecalcOutcome, EngineError> {
        // Step 1: target resolution.
        let candidates = self
            .store
            .active_targets_covering(user_id, date_in_period)
            .await?;
        if candidates.is_empty() {
            info!(user_id = %user_id, date = %date_in_period, "No active target covers date, skipping recalculation");
            return Ok(RecalcOutcome::NoActiveTarget);
        }

        let target = self.resolve_target(candidates, originating_deal)?;

        // Step 2: period deal collection (inclusive bounds, closed-won only).
        let period_deals = self
            .store
            .deals_in_period(user_id, target.period_start, target.period_end)
            .await?;
        let won_deals: Vec<&Deal> = period_deals
            .iter()
            .filter(|d| d.stage.is_closed_won())
            .collect();
        if won_deals.is_empty() {
            info!(user_id = %user_id, target_id = %target.id, "No closed-won deals in period");
            return Ok(RecalcOutcome::NoDealsInPeriod);
        }

        // Step 3: period aggregation. Summed with Money, never floats.
        let total_sales = won_deals
            .iter()
            .fold(Money::zero(), |acc, d| acc + d.amount);
        let attainment_percent = total_sales.attainment_percent(target.quota_amount);
        let aggregates = PeriodAggregates {
            total_sales,
            quota_amount: target.quota_amount,
            attainment_percent,
        };

        // Step 4: gate evaluation.
        let gate_report = evaluate_gates(&target.gates, &aggregates);

        // Step 5: rate derivation. A hard gate failure short-circuits
        // everything to zero.
        let final_rate = if gate_report.hard_failed {
            Money::zero()
        } else {
            let application = evaluate_structure(target.structure.as_ref(), attainment_percent);
            if application.tiered_fallback {
                warn!(
                    target_id = %target.id,
                    "Tiered commission structure is not computable at period level; using base rate"
                );
            }
            let mut rate = target.commission_rate * application.multiplier;

            // Failed soft gates adjust the rate without short-circuiting.
            for result in &gate_report.results {
                if result.enforcement == GateEnforcement::Soft && !result.passed {
                    match &result.penalty {
                        GatePenalty::ZeroCommission => rate = Money::zero(),
                        GatePenalty::PercentageReduction { percent } => {
                            rate = rate * ((Money::hundred() - *percent) / Money::hundred());
                        }
                    }
                }
            }
            rate
        };

        // Step 6: atomic write-back across every deal in the period.
        let calculated_at = Utc::now();
        let updates: Vec<CommissionUpdate> = won_deals
            .iter()
            .map(|deal| CommissionUpdate {
                deal_id: deal.id.clone(),
                rate: final_rate,
                amount: if gate_report.hard_failed {
                    Money::zero()
                } else {
                    deal.amount.apply_rate(final_rate, Rounding::HalfUp)
                },
                calculated_at,
                target_id: target.id.clone(),
            })
            .collect();

        self.store.apply_commission_updates(&updates).await?;

        info!(
            user_id = %user_id,
            target_id = %target.id,
            total_sales = %total_sales,
            attainment_percent = %attainment_percent,
            final_rate = %final_rate,
            deals_updated = updates.len(),
            hard_gate_failed = gate_report.hard_failed,
            "Period commission recalculated"
        );

        Ok(RecalcOutcome::Applied(PeriodOutcome {
            target_id: target.id.clone(),
            total_sales,
            attainment_percent,
            final_rate,
            hard_gate_failed: gate_report.hard_failed,
            deals_updated: updates.len(),
            gate_results: gate_report.results,
        }))
    }

    /// React to a deal stage change.
    ///
    /// Entering closed-won prices the period; leaving closed-won clears the
    /// deal's commission and re-prices the remaining deals, since removing a
    /// deal can change attainment and therefore everyone else's tier.
    pub async fn handle_deal_update(
        &self,
        deal_id: &DealId,
        old_stage: &str,
        new_stage: &str,
    ) -> Result<RecalcOutcome, EngineError> {
        let old = parse_stage(old_stage);
        let new = parse_stage(new_stage);

        if !old.is_closed_won() && new.is_closed_won() {
            return self.calculate_deal_commission(deal_id).await;
        }

        if old.is_closed_won() && !new.is_closed_won() {
            let deal = self
                .store
                .get_deal(deal_id)
                .await?
                .ok_or_else(|| EngineError::DealNotFound(deal_id.clone()))?;

            self.store.clear_deal_commission(deal_id).await?;
            info!(deal_id = %deal_id, old_stage, new_stage, "Deal left closed-won; commission cleared, re-pricing period");

            return self
                .recalculate_period(&deal.user_id, deal.close_date, None)
                .await;
        }

        debug!(deal_id = %deal_id, old_stage, new_stage, "Stage change does not cross closed-won boundary");
        Ok(RecalcOutcome::NoStageTransition)
    }

    /// Re-price a target's period after the target was created or edited.
    ///
    /// Editing a rate, gate, or structure retroactively re-prices every deal
    /// already closed in that period.
    pub async fn recalculate_for_target(
        &self,
        target_id: &TargetId,
    ) -> Result<RecalcOutcome, EngineError> {
        let target = self
            .store
            .get_target(target_id)
            .await?
            .ok_or_else(|| EngineError::TargetNotFound(target_id.clone()))?;

        if !target.is_active {
            debug!(target_id = %target_id, "Target inactive, skipping recalculation");
            return Ok(RecalcOutcome::TargetInactive);
        }

        self.recalculate_period(&target.user_id, target.period_start, None)
            .await
    }

    /// Read-only aggregation over a date range. No side effects.
    pub async fn commission_summary(
        &self,
        user_id: &UserId,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> Result<CommissionSummary, EngineError> {
        let deals = self
            .store
            .deals_in_period(user_id, period_start, period_end)
            .await?;

        let mut summary = CommissionSummary {
            total_deals: deals.len(),
            closed_won_deals: 0,
            total_sales: Money::zero(),
            total_commission: Money::zero(),
            missing_commission_count: 0,
        };

        for deal in &deals {
            if !deal.stage.is_closed_won() {
                continue;
            }
            summary.closed_won_deals += 1;
            summary.total_sales = summary.total_sales + deal.amount;
            match &deal.commission {
                Some(c) => summary.total_commission = summary.total_commission + c.amount,
                None => summary.missing_commission_count += 1,
            }
        }

        Ok(summary)
    }

    /// Reconciliation sweep: find closed-won deals that never got a
    /// commission (missed real-time trigger) and recalculate their periods.
    ///
    /// One recalculation prices every deal in its period, so deals already
    /// priced by an earlier iteration of the same sweep are skipped.
    pub async fn sweep_missing_commissions(
        &self,
        user_id: &UserId,
    ) -> Result<SweepReport, EngineError> {
        let candidates = self
            .store
            .closed_won_missing_commission(user_id, self.sweep_batch_size)
            .await?;

        let mut report = SweepReport {
            candidates: candidates.len(),
            ..SweepReport::default()
        };

        for candidate in &candidates {
            // Re-fetch: an earlier period recalculation in this sweep may
            // have priced this deal already.
            let current = self
                .store
                .get_deal(&candidate.id)
                .await?
                .ok_or_else(|| EngineError::DealNotFound(candidate.id.clone()))?;
            if current.commission.is_some() {
                report.already_priced += 1;
                continue;
            }

            match self.calculate_deal_commission(&candidate.id).await? {
                RecalcOutcome::Applied(_) => report.recalculated += 1,
                RecalcOutcome::NoActiveTarget => report.without_target += 1,
                other => {
                    debug!(deal_id = %candidate.id, outcome = ?other, "Sweep candidate produced no write");
                }
            }
        }

        info!(
            user_id = %user_id,
            candidates = report.candidates,
            recalculated = report.recalculated,
            already_priced = report.already_priced,
            without_target = report.without_target,
            "Missing-commission sweep complete"
        );

        Ok(report)
    }

    /// Pick exactly one target deterministically: highest quota first, then
    /// most granular period type, then most recently created, then id
    /// descending as an absolute tie-break.
    ///
    /// # Panics
    /// Panics if `candidates` is empty. Callers must check for the
    /// no-active-target case first.
    fn resolve_target(
        &self,
        candidates: Vec<Target>,
        originating_deal: Option<&Deal>,
    ) -> Result<Target, EngineError> {
        // The category filter only applies when a specific deal provides the
        // context; a bare period recalculation considers every candidate.
        let mut matching: Vec<Target> = match originating_deal {
            Some(deal) => {
                let filtered: Vec<Target> = candidates
                    .iter()
                    .filter(|t| t.accepts_category(deal.product_category_id.as_ref()))
                    .cloned()
                    .collect();
                if filtered.is_empty() {
                    // The deal's category (or lack of one) matches no active
                    // target. Surfacing this protects against silent
                    // mis-attribution of commission.
                    return Err(EngineError::CategoryMismatch {
                        deal_id: deal.id.clone(),
                        deal_category: deal.product_category_id.clone(),
                        available: candidates
                            .into_iter()
                            .map(|t| t.product_category_id)
                            .collect(),
                    });
                }
                filtered
            }
            None => candidates,
        };

        matching.sort_by(|a, b| {
            b.quota_amount
                .cmp(&a.quota_amount)
                .then(a.period_type.granularity().cmp(&b.period_type.granularity()))
                .then(b.created_at.cmp(&a.created_at))
                .then(b.id.cmp(&a.id))
        });

        let target = matching
            .into_iter()
            .next()
            .expect("non-empty candidate set survives the category filter");
        Ok(target)
    }
}
