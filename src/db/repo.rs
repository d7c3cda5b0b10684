//! SQLite-backed store for deals and targets.
//!
//! Money values persist as canonical decimal strings and are summed in Rust,
//! never with SQL SUM (SQLite's SUM returns REAL and would reintroduce
//! floating-point drift). Dates persist as ISO-8601 text, which compares
//! correctly as strings.

use crate::domain::{
    CategoryId, CommissionFields, CommissionStructure, Deal, DealId, Money, PerformanceGate,
    PeriodType, Target, TargetId, UserId,
};
use crate::store::{CommissionStore, CommissionUpdate, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

/// Repository for deal and target persistence.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }
}

fn parse_money(column: &str, raw: &str) -> Result<Money, StoreError> {
    Money::from_str_canonical(raw)
        .map_err(|e| StoreError::Corrupt(format!("column {}: {} ({})", column, raw, e)))
}

fn parse_date(column: &str, raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| StoreError::Corrupt(format!("column {}: {} ({})", column, raw, e)))
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("column {}: {} ({})", column, raw, e)))
}

fn period_type_to_str(pt: PeriodType) -> &'static str {
    match pt {
        PeriodType::Monthly => "monthly",
        PeriodType::Quarterly => "quarterly",
        PeriodType::Annual => "annual",
    }
}

fn period_type_from_str(raw: &str) -> Result<PeriodType, StoreError> {
    match raw {
        "monthly" => Ok(PeriodType::Monthly),
        "quarterly" => Ok(PeriodType::Quarterly),
        "annual" => Ok(PeriodType::Annual),
        other => Err(StoreError::Corrupt(format!("unknown period_type: {}", other))),
    }
}

fn deal_from_row(row: &SqliteRow) -> Result<Deal, StoreError> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let amount_str: String = row.get("amount");
    let stage: String = row.get("stage");
    let close_date_str: String = row.get("close_date");
    let category: Option<String> = row.get("product_category_id");

    let rate_str: Option<String> = row.get("commission_rate");
    let comm_amount_str: Option<String> = row.get("commission_amount");
    let calculated_at_str: Option<String> = row.get("commission_calculated_at");
    let target_id: Option<String> = row.get("target_id");

    let commission = match (rate_str, comm_amount_str, calculated_at_str, target_id) {
        (None, None, None, None) => None,
        (Some(rate), Some(amount), Some(calculated_at), Some(target_id)) => {
            Some(CommissionFields {
                rate: parse_money("commission_rate", &rate)?,
                amount: parse_money("commission_amount", &amount)?,
                calculated_at: parse_timestamp("commission_calculated_at", &calculated_at)?,
                target_id: TargetId::new(target_id),
            })
        }
        _ => {
            return Err(StoreError::Corrupt(format!(
                "deal {} has partially populated commission fields",
                id
            )))
        }
    };

    let mut deal = Deal::new(
        DealId::new(id),
        UserId::new(user_id),
        parse_money("amount", &amount_str)?,
        stage,
        parse_date("close_date", &close_date_str)?,
        category.map(CategoryId::new),
    );
    deal.commission = commission;
    Ok(deal)
}

fn target_from_row(row: &SqliteRow) -> Result<Target, StoreError> {
    let structure_json: Option<String> = row.get("commission_structure");
    let structure: Option<CommissionStructure> = structure_json
        .map(|s| serde_json::from_str(&s))
        .transpose()?;

    let gates_json: Option<String> = row.get("performance_gates");
    let gates: Vec<PerformanceGate> = gates_json
        .map(|s| serde_json::from_str(&s))
        .transpose()?
        .unwrap_or_default();

    let period_type_str: String = row.get("period_type");
    let quota_str: String = row.get("quota_amount");
    let rate_str: String = row.get("commission_rate");
    let start_str: String = row.get("period_start");
    let end_str: String = row.get("period_end");
    let created_at_str: String = row.get("created_at");
    let category: Option<String> = row.get("product_category_id");

    Ok(Target {
        id: TargetId::new(row.get::<String, _>("id")),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        is_active: row.get::<i64, _>("is_active") != 0,
        period_start: parse_date("period_start", &start_str)?,
        period_end: parse_date("period_end", &end_str)?,
        period_type: period_type_from_str(&period_type_str)?,
        quota_amount: parse_money("quota_amount", &quota_str)?,
        commission_rate: parse_money("commission_rate", &rate_str)?,
        product_category_id: category.map(CategoryId::new),
        structure,
        gates,
        created_at: parse_timestamp("created_at", &created_at_str)?,
    })
}

#[async_trait]
impl CommissionStore for Repository {
    async fn upsert_deal(&self, deal: &Deal) -> Result<(), StoreError> {
        let (rate, amount, calculated_at, target_id) = match &deal.commission {
            Some(c) => (
                Some(c.rate.to_canonical_string()),
                Some(c.amount.to_canonical_string()),
                Some(c.calculated_at.to_rfc3339()),
                Some(c.target_id.as_str().to_string()),
            ),
            None => (None, None, None, None),
        };

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO deals
            (id, user_id, amount, stage, close_date, product_category_id,
             commission_rate, commission_amount, commission_calculated_at, target_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(deal.id.as_str())
        .bind(deal.user_id.as_str())
        .bind(deal.amount.to_canonical_string())
        .bind(&deal.raw_stage)
        .bind(deal.close_date.format("%Y-%m-%d").to_string())
        .bind(deal.product_category_id.as_ref().map(|c| c.as_str()))
        .bind(rate)
        .bind(amount)
        .bind(calculated_at)
        .bind(target_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_target(&self, target: &Target) -> Result<(), StoreError> {
        let structure_json = target
            .structure
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let gates_json = if target.gates.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&target.gates)?)
        };

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO targets
            (id, user_id, is_active, period_start, period_end, period_type,
             quota_amount, commission_rate, product_category_id,
             commission_structure, performance_gates, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(target.id.as_str())
        .bind(target.user_id.as_str())
        .bind(if target.is_active { 1i64 } else { 0i64 })
        .bind(target.period_start.format("%Y-%m-%d").to_string())
        .bind(target.period_end.format("%Y-%m-%d").to_string())
        .bind(period_type_to_str(target.period_type))
        .bind(target.quota_amount.to_canonical_string())
        .bind(target.commission_rate.to_canonical_string())
        .bind(target.product_category_id.as_ref().map(|c| c.as_str()))
        .bind(structure_json)
        .bind(gates_json)
        .bind(target.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_deal(&self, id: &DealId) -> Result<Option<Deal>, StoreError> {
        let row = sqlx::query("SELECT * FROM deals WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(deal_from_row).transpose()
    }

    async fn get_target(&self, id: &TargetId) -> Result<Option<Target>, StoreError> {
        let row = sqlx::query("SELECT * FROM targets WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(target_from_row).transpose()
    }

    async fn active_targets_covering(
        &self,
        user_id: &UserId,
        date: NaiveDate,
    ) -> Result<Vec<Target>, StoreError> {
        let date_str = date.format("%Y-%m-%d").to_string();
        let rows = sqlx::query(
            r#"
            SELECT * FROM targets
            WHERE user_id = ? AND is_active = 1
              AND period_start <= ? AND period_end >= ?
            ORDER BY id ASC
            "#,
        )
        .bind(user_id.as_str())
        .bind(&date_str)
        .bind(&date_str)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(target_from_row).collect()
    }

    async fn deals_in_period(
        &self,
        user_id: &UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Deal>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM deals
            WHERE user_id = ? AND close_date >= ? AND close_date <= ?
            ORDER BY close_date ASC, id ASC
            "#,
        )
        .bind(user_id.as_str())
        .bind(start.format("%Y-%m-%d").to_string())
        .bind(end.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(deal_from_row).collect()
    }

    async fn closed_won_missing_commission(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<Deal>, StoreError> {
        // Stage normalization happens in Rust, so the closed-won filter is
        // applied after fetching the null-commission candidates.
        let rows = sqlx::query(
            r#"
            SELECT * FROM deals
            WHERE user_id = ? AND commission_amount IS NULL
            ORDER BY close_date ASC, id ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut deals = Vec::new();
        for row in &rows {
            let deal = deal_from_row(row)?;
            if deal.stage.is_closed_won() {
                deals.push(deal);
                if deals.len() == limit {
                    break;
                }
            }
        }
        Ok(deals)
    }

    async fn apply_commission_updates(
        &self,
        updates: &[CommissionUpdate],
    ) -> Result<(), StoreError> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for update in updates {
            let result = sqlx::query(
                r#"
                UPDATE deals SET
                    commission_rate = ?,
                    commission_amount = ?,
                    commission_calculated_at = ?,
                    target_id = ?
                WHERE id = ?
                "#,
            )
            .bind(update.rate.to_canonical_string())
            .bind(update.amount.to_canonical_string())
            .bind(update.calculated_at.to_rfc3339())
            .bind(update.target_id.as_str())
            .bind(update.deal_id.as_str())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // Rolls back the whole transaction; no partial write survives.
                return Err(StoreError::Corrupt(format!(
                    "commission update references unknown deal {}",
                    update.deal_id
                )));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn clear_deal_commission(&self, id: &DealId) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE deals SET
                commission_rate = NULL,
                commission_amount = NULL,
                commission_calculated_at = NULL,
                target_id = NULL
            WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
