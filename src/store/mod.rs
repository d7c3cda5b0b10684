//! Store abstraction over the deal and target collaborators.
//!
//! The engine talks to persistence exclusively through `CommissionStore`.
//! Implementations: `db::Repository` (SQLite) for production and
//! `MemoryStore` for tests. The one contract beyond plain reads is
//! `apply_commission_updates`: all updates for a period commit as a single
//! atomic unit, so a concurrent recalculation either fully precedes or fully
//! follows this one.

use crate::domain::{Deal, DealId, Money, Target, TargetId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

pub mod memory;

pub use memory::MemoryStore;

/// Commission values to write back onto one deal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionUpdate {
    pub deal_id: DealId,
    pub rate: Money,
    pub amount: Money,
    pub calculated_at: DateTime<Utc>,
    pub target_id: TargetId,
}

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("descriptor serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A persisted row failed to parse back into a domain value. Commission
    /// math must not proceed on defaulted amounts, so this is a hard error
    /// rather than a logged fallback.
    #[error("corrupt stored record: {0}")]
    Corrupt(String),
}

/// Persistence collaborator for deals and targets.
#[async_trait]
pub trait CommissionStore: Send + Sync {
    /// Insert or replace a deal.
    async fn upsert_deal(&self, deal: &Deal) -> Result<(), StoreError>;

    /// Insert or replace a target.
    async fn upsert_target(&self, target: &Target) -> Result<(), StoreError>;

    /// Fetch one deal by id, or None if it does not exist.
    async fn get_deal(&self, id: &DealId) -> Result<Option<Deal>, StoreError>;

    /// Fetch one target by id, or None if it does not exist.
    async fn get_target(&self, id: &TargetId) -> Result<Option<Target>, StoreError>;

    /// Active targets for a user whose inclusive period covers `date`.
    async fn active_targets_covering(
        &self,
        user_id: &UserId,
        date: NaiveDate,
    ) -> Result<Vec<Target>, StoreError>;

    /// All deals owned by a user with an inclusive close date in [start, end],
    /// ordered by close date then id for determinism.
    async fn deals_in_period(
        &self,
        user_id: &UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Deal>, StoreError>;

    /// Closed-won deals for a user with no commission computed yet, oldest
    /// close date first, bounded by `limit`.
    async fn closed_won_missing_commission(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<Deal>, StoreError>;

    /// Write commission fields onto every listed deal as one atomic unit.
    ///
    /// A partial write (some deals updated, others not) must never be
    /// observable, even if the process dies mid-call.
    async fn apply_commission_updates(
        &self,
        updates: &[CommissionUpdate],
    ) -> Result<(), StoreError>;

    /// Clear one deal's commission fields back to null.
    async fn clear_deal_commission(&self, id: &DealId) -> Result<(), StoreError>;
}
