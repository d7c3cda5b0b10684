//! Engine error taxonomy.
//!
//! Expected empty outcomes ("no active target", "no deals in period") are
//! `RecalcOutcome` variants, never errors. Everything here must surface to
//! the caller; the engine never retries and never suppresses an error into a
//! silent success.

use crate::domain::{CategoryId, DealId, TargetId};
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The deal id does not resolve. Distinct from "exists but not
    /// applicable", which is a no-op outcome.
    #[error("deal not found: {0}")]
    DealNotFound(DealId),

    /// The target id does not resolve.
    #[error("target not found: {0}")]
    TargetNotFound(TargetId),

    /// The deal's product category (or lack of one) matches no active
    /// target. Indicates missing setup, not a transient condition; must
    /// reach the caller rather than silently using a wrong rate.
    #[error(
        "no active target accepts deal {deal_id} (deal category: {deal_category:?}, \
         available target categories: {available:?})"
    )]
    CategoryMismatch {
        deal_id: DealId,
        deal_category: Option<CategoryId>,
        available: Vec<Option<CategoryId>>,
    },

    /// Persistence failure. The write-back transaction guarantees no partial
    /// state is left behind.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
