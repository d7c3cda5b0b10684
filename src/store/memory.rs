//! In-memory store for tests and in-process mocking, no database required.

use super::{CommissionStore, CommissionUpdate, StoreError};
use crate::domain::{CommissionFields, Deal, DealId, Target, TargetId, UserId};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    deals: HashMap<DealId, Deal>,
    targets: HashMap<TargetId, Target>,
}

/// In-memory `CommissionStore`. Write-back applies every update under one
/// lock acquisition, matching the all-or-nothing contract.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a deal, builder-style.
    pub fn with_deal(self, deal: Deal) -> Self {
        self.inner.lock().unwrap().deals.insert(deal.id.clone(), deal);
        self
    }

    /// Seed a target, builder-style.
    pub fn with_target(self, target: Target) -> Self {
        self.inner
            .lock()
            .unwrap()
            .targets
            .insert(target.id.clone(), target);
        self
    }
}

#[async_trait]
impl CommissionStore for MemoryStore {
    async fn upsert_deal(&self, deal: &Deal) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .deals
            .insert(deal.id.clone(), deal.clone());
        Ok(())
    }

    async fn upsert_target(&self, target: &Target) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .targets
            .insert(target.id.clone(), target.clone());
        Ok(())
    }

    async fn get_deal(&self, id: &DealId) -> Result<Option<Deal>, StoreError> {
        Ok(self.inner.lock().unwrap().deals.get(id).cloned())
    }

    async fn get_target(&self, id: &TargetId) -> Result<Option<Target>, StoreError> {
        Ok(self.inner.lock().unwrap().targets.get(id).cloned())
    }

    async fn active_targets_covering(
        &self,
        user_id: &UserId,
        date: NaiveDate,
    ) -> Result<Vec<Target>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut targets: Vec<Target> = inner
            .targets
            .values()
            .filter(|t| t.is_active && &t.user_id == user_id && t.covers(date))
            .cloned()
            .collect();
        targets.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(targets)
    }

    async fn deals_in_period(
        &self,
        user_id: &UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Deal>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut deals: Vec<Deal> = inner
            .deals
            .values()
            .filter(|d| {
                &d.user_id == user_id && start <= d.close_date && d.close_date <= end
            })
            .cloned()
            .collect();
        deals.sort_by(|a, b| a.close_date.cmp(&b.close_date).then(a.id.cmp(&b.id)));
        Ok(deals)
    }

    async fn closed_won_missing_commission(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<Deal>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut deals: Vec<Deal> = inner
            .deals
            .values()
            .filter(|d| {
                &d.user_id == user_id && d.stage.is_closed_won() && d.commission.is_none()
            })
            .cloned()
            .collect();
        deals.sort_by(|a, b| a.close_date.cmp(&b.close_date).then(a.id.cmp(&b.id)));
        deals.truncate(limit);
        Ok(deals)
    }

    async fn apply_commission_updates(
        &self,
        updates: &[CommissionUpdate],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();

        // Validate every target deal exists before touching any of them.
        for update in updates {
            if !inner.deals.contains_key(&update.deal_id) {
                return Err(StoreError::Corrupt(format!(
                    "commission update references unknown deal {}",
                    update.deal_id
                )));
            }
        }

        for update in updates {
            if let Some(deal) = inner.deals.get_mut(&update.deal_id) {
                deal.commission = Some(CommissionFields {
                    rate: update.rate,
                    amount: update.amount,
                    calculated_at: update.calculated_at,
                    target_id: update.target_id.clone(),
                });
            }
        }
        Ok(())
    }

    async fn clear_deal_commission(&self, id: &DealId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(deal) = inner.deals.get_mut(id) {
            deal.commission = None;
        }
        Ok(())
    }
}
