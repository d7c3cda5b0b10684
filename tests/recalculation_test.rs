//! Integration tests for period commission recalculation against SQLite.

use chrono::{NaiveDate, Utc};
use commission_engine::{
    db::init_db, CategoryId, CommissionEngine, CommissionStore, CommissionStructure, Deal, DealId,
    EngineError, GateEnforcement, GateMetric, GateOperator, GatePenalty, Money, PerformanceGate,
    PeriodType, RateTier, RecalcOutcome, Repository, Target, TargetId, UserId,
};
use std::sync::Arc;
use tempfile::TempDir;

async fn setup_engine() -> (CommissionEngine, Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let engine = CommissionEngine::new(repo.clone());
    (engine, repo, temp_dir)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn money(s: &str) -> Money {
    Money::from_str_canonical(s).unwrap()
}

fn deal(id: &str, amount: &str, stage: &str, close: NaiveDate) -> Deal {
    Deal::new(
        DealId::new(id),
        UserId::new("rep-1"),
        money(amount),
        stage,
        close,
        None,
    )
}

fn annual_target(id: &str, quota: &str, rate: &str) -> Target {
    Target {
        id: TargetId::new(id),
        user_id: UserId::new("rep-1"),
        is_active: true,
        period_start: date(2025, 1, 1),
        period_end: date(2025, 12, 31),
        period_type: PeriodType::Annual,
        quota_amount: money(quota),
        commission_rate: money(rate),
        product_category_id: None,
        structure: None,
        gates: Vec::new(),
        created_at: Utc::now(),
    }
}

fn accelerator(threshold: i64, multiplier: &str) -> CommissionStructure {
    CommissionStructure::Accelerator {
        tiers: vec![RateTier {
            attainment_threshold: Money::from_i64(threshold),
            rate_multiplier: money(multiplier),
        }],
    }
}

async fn commission_of(repo: &Repository, id: &str) -> Option<(String, String)> {
    repo.get_deal(&DealId::new(id))
        .await
        .unwrap()
        .unwrap()
        .commission
        .map(|c| (c.rate.to_canonical_string(), c.amount.to_canonical_string()))
}

#[tokio::test]
async fn test_accelerator_end_to_end_scenario() {
    // Annual target: quota 100,000, base rate 5%, accelerator {100% -> 1.5x}.
    // Deals 40,000 + 40,000 + 30,000 = 110,000 (110% attainment), so the
    // accelerated rate 7.5% applies to every deal.
    let (engine, repo, _temp) = setup_engine().await;

    let mut target = annual_target("t1", "100000", "0.05");
    target.structure = Some(accelerator(100, "1.5"));
    repo.upsert_target(&target).await.unwrap();

    for (id, amount, month) in [("d1", "40000", 2), ("d2", "40000", 5), ("d3", "30000", 8)] {
        repo.upsert_deal(&deal(id, amount, "closed_won", date(2025, month, 15)))
            .await
            .unwrap();
    }

    let outcome = engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .unwrap();

    match outcome {
        RecalcOutcome::Applied(period) => {
            assert_eq!(period.target_id.as_str(), "t1");
            assert_eq!(period.total_sales.to_canonical_string(), "110000");
            assert_eq!(period.attainment_percent.to_canonical_string(), "110");
            assert_eq!(period.final_rate.to_canonical_string(), "0.075");
            assert!(!period.hard_gate_failed);
            assert_eq!(period.deals_updated, 3);
        }
        other => panic!("expected Applied, got {:?}", other),
    }

    assert_eq!(
        commission_of(&repo, "d1").await,
        Some(("0.075".to_string(), "3000".to_string()))
    );
    assert_eq!(
        commission_of(&repo, "d2").await,
        Some(("0.075".to_string(), "3000".to_string()))
    );
    assert_eq!(
        commission_of(&repo, "d3").await,
        Some(("0.075".to_string(), "2250".to_string()))
    );
}

#[tokio::test]
async fn test_recalculation_is_idempotent() {
    let (engine, repo, _temp) = setup_engine().await;

    let mut target = annual_target("t1", "100000", "0.05");
    target.structure = Some(accelerator(100, "1.5"));
    repo.upsert_target(&target).await.unwrap();
    repo.upsert_deal(&deal("d1", "110000", "closed_won", date(2025, 3, 1)))
        .await
        .unwrap();

    engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .unwrap();
    let first = commission_of(&repo, "d1").await;

    engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .unwrap();
    let second = commission_of(&repo, "d1").await;

    assert_eq!(first, second);
    assert_eq!(first, Some(("0.075".to_string(), "8250".to_string())));
}

#[tokio::test]
async fn test_removal_reprices_remaining_deals() {
    // Losing the 30,000 deal drops attainment from 110% to 80%, below the
    // accelerator tier: the remaining deals fall back to the 5% base rate.
    let (engine, repo, _temp) = setup_engine().await;

    let mut target = annual_target("t1", "100000", "0.05");
    target.structure = Some(accelerator(100, "1.5"));
    repo.upsert_target(&target).await.unwrap();

    for (id, amount) in [("d1", "40000"), ("d2", "40000"), ("d3", "30000")] {
        repo.upsert_deal(&deal(id, amount, "closed_won", date(2025, 6, 1)))
            .await
            .unwrap();
    }
    engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .unwrap();
    assert_eq!(
        commission_of(&repo, "d1").await,
        Some(("0.075".to_string(), "3000".to_string()))
    );

    // External flow updates the stage, then notifies the engine.
    repo.upsert_deal(&deal("d3", "30000", "closed_lost", date(2025, 6, 1)))
        .await
        .unwrap();
    let outcome = engine
        .handle_deal_update(&DealId::new("d3"), "closed_won", "closed_lost")
        .await
        .unwrap();

    match outcome {
        RecalcOutcome::Applied(period) => {
            assert_eq!(period.total_sales.to_canonical_string(), "80000");
            assert_eq!(period.attainment_percent.to_canonical_string(), "80");
            assert_eq!(period.final_rate.to_canonical_string(), "0.05");
            assert_eq!(period.deals_updated, 2);
        }
        other => panic!("expected Applied, got {:?}", other),
    }

    assert_eq!(commission_of(&repo, "d3").await, None);
    assert_eq!(
        commission_of(&repo, "d1").await,
        Some(("0.05".to_string(), "2000".to_string()))
    );
    assert_eq!(
        commission_of(&repo, "d2").await,
        Some(("0.05".to_string(), "2000".to_string()))
    );
}

#[tokio::test]
async fn test_hard_gate_short_circuits_accelerator() {
    // Attainment 30% trips the hard zero-commission gate; every deal gets 0
    // even though an accelerator is configured.
    let (engine, repo, _temp) = setup_engine().await;

    let mut target = annual_target("t1", "100000", "0.05");
    target.structure = Some(accelerator(100, "1.5"));
    target.gates = vec![PerformanceGate {
        name: "minimum attainment".to_string(),
        metric: GateMetric::AttainmentPercent,
        operator: GateOperator::Lte,
        threshold: Money::from_i64(50),
        enforcement: GateEnforcement::Hard,
        penalty: GatePenalty::ZeroCommission,
    }];
    repo.upsert_target(&target).await.unwrap();

    for (id, amount) in [("d1", "20000"), ("d2", "10000")] {
        repo.upsert_deal(&deal(id, amount, "closed_won", date(2025, 4, 1)))
            .await
            .unwrap();
    }

    let outcome = engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .unwrap();
    match outcome {
        RecalcOutcome::Applied(period) => {
            assert!(period.hard_gate_failed);
            assert_eq!(period.final_rate, Money::zero());
        }
        other => panic!("expected Applied, got {:?}", other),
    }

    assert_eq!(
        commission_of(&repo, "d1").await,
        Some(("0".to_string(), "0".to_string()))
    );
    assert_eq!(
        commission_of(&repo, "d2").await,
        Some(("0".to_string(), "0".to_string()))
    );
}

#[tokio::test]
async fn test_gate_passes_at_high_attainment() {
    let (engine, repo, _temp) = setup_engine().await;

    let mut target = annual_target("t1", "100000", "0.05");
    target.gates = vec![PerformanceGate {
        name: "minimum attainment".to_string(),
        metric: GateMetric::AttainmentPercent,
        operator: GateOperator::Lte,
        threshold: Money::from_i64(50),
        enforcement: GateEnforcement::Hard,
        penalty: GatePenalty::ZeroCommission,
    }];
    repo.upsert_target(&target).await.unwrap();
    repo.upsert_deal(&deal("d1", "80000", "closed_won", date(2025, 4, 1)))
        .await
        .unwrap();

    let outcome = engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .unwrap();
    match outcome {
        RecalcOutcome::Applied(period) => {
            assert!(!period.hard_gate_failed);
            assert!(period.gate_results[0].passed);
            assert_eq!(period.final_rate.to_canonical_string(), "0.05");
        }
        other => panic!("expected Applied, got {:?}", other),
    }
}

#[tokio::test]
async fn test_soft_gate_reduces_rate_without_zeroing() {
    let (engine, repo, _temp) = setup_engine().await;

    let mut target = annual_target("t1", "100000", "0.05");
    target.gates = vec![PerformanceGate {
        name: "soft floor".to_string(),
        metric: GateMetric::AttainmentPercent,
        operator: GateOperator::Gte,
        threshold: Money::from_i64(60),
        enforcement: GateEnforcement::Soft,
        penalty: GatePenalty::PercentageReduction {
            percent: Money::from_i64(25),
        },
    }];
    repo.upsert_target(&target).await.unwrap();
    repo.upsert_deal(&deal("d1", "30000", "closed_won", date(2025, 4, 1)))
        .await
        .unwrap();

    let outcome = engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .unwrap();
    match outcome {
        RecalcOutcome::Applied(period) => {
            assert!(!period.hard_gate_failed);
            // 0.05 reduced by 25% = 0.0375.
            assert_eq!(period.final_rate.to_canonical_string(), "0.0375");
        }
        other => panic!("expected Applied, got {:?}", other),
    }
    assert_eq!(
        commission_of(&repo, "d1").await,
        Some(("0.0375".to_string(), "1125".to_string()))
    );
}

#[tokio::test]
async fn test_decelerator_cuts_rate_below_floor() {
    let (engine, repo, _temp) = setup_engine().await;

    let mut target = annual_target("t1", "100000", "0.05");
    target.structure = Some(CommissionStructure::Decelerator {
        tiers: vec![RateTier {
            attainment_threshold: Money::from_i64(50),
            rate_multiplier: money("0.5"),
        }],
    });
    repo.upsert_target(&target).await.unwrap();
    repo.upsert_deal(&deal("d1", "40000", "closed_won", date(2025, 4, 1)))
        .await
        .unwrap();

    let outcome = engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .unwrap();
    match outcome {
        RecalcOutcome::Applied(period) => {
            assert_eq!(period.final_rate.to_canonical_string(), "0.025");
        }
        other => panic!("expected Applied, got {:?}", other),
    }
    assert_eq!(
        commission_of(&repo, "d1").await,
        Some(("0.025".to_string(), "1000".to_string()))
    );
}

#[tokio::test]
async fn test_stage_variants_all_count_toward_period() {
    let (engine, repo, _temp) = setup_engine().await;

    repo.upsert_target(&annual_target("t1", "100000", "0.05"))
        .await
        .unwrap();

    let variants = [
        ("d1", "closed_won"),
        ("d2", "Closed Won"),
        ("d3", "closedwon"),
        ("d4", "CLOSED-WON"),
    ];
    for (id, stage) in variants {
        repo.upsert_deal(&deal(id, "10000", stage, date(2025, 4, 1)))
            .await
            .unwrap();
    }
    // An open deal in the same period must not be counted or priced.
    repo.upsert_deal(&deal("d5", "50000", "proposal", date(2025, 4, 2)))
        .await
        .unwrap();

    let outcome = engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .unwrap();
    match outcome {
        RecalcOutcome::Applied(period) => {
            assert_eq!(period.total_sales.to_canonical_string(), "40000");
            assert_eq!(period.deals_updated, 4);
        }
        other => panic!("expected Applied, got {:?}", other),
    }

    for (id, _) in variants {
        assert!(commission_of(&repo, id).await.is_some(), "deal {}", id);
    }
    assert_eq!(commission_of(&repo, "d5").await, None);
}

#[tokio::test]
async fn test_monetary_rounding_is_exact_across_small_deals() {
    let (engine, repo, _temp) = setup_engine().await;

    repo.upsert_target(&annual_target("t1", "100", "0.1"))
        .await
        .unwrap();
    for (id, amount) in [("d1", "33.33"), ("d2", "33.33"), ("d3", "33.34")] {
        repo.upsert_deal(&deal(id, amount, "closed_won", date(2025, 4, 1)))
            .await
            .unwrap();
    }

    engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .unwrap();

    let mut total = Money::zero();
    for id in ["d1", "d2", "d3"] {
        let (_, amount) = commission_of(&repo, id).await.unwrap();
        assert_eq!(amount, "3.33");
        total = total + money(&amount);
    }
    // Exactly 9.99: decimal arithmetic, no binary-float drift.
    assert_eq!(total, money("9.99"));
}

#[tokio::test]
async fn test_category_mismatch_is_a_hard_error() {
    let (engine, repo, _temp) = setup_engine().await;

    let mut target = annual_target("t1", "100000", "0.05");
    target.product_category_id = Some(CategoryId::new("hardware"));
    repo.upsert_target(&target).await.unwrap();

    let mut d = deal("d1", "10000", "closed_won", date(2025, 4, 1));
    d.product_category_id = Some(CategoryId::new("software"));
    repo.upsert_deal(&d).await.unwrap();

    let err = engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .expect_err("category mismatch must surface");

    match err {
        EngineError::CategoryMismatch {
            deal_id,
            deal_category,
            available,
        } => {
            assert_eq!(deal_id.as_str(), "d1");
            assert_eq!(deal_category, Some(CategoryId::new("software")));
            assert_eq!(available, vec![Some(CategoryId::new("hardware"))]);
        }
        other => panic!("expected CategoryMismatch, got {}", other),
    }

    assert_eq!(commission_of(&repo, "d1").await, None);
}

#[tokio::test]
async fn test_categorized_deal_uses_matching_target() {
    let (engine, repo, _temp) = setup_engine().await;

    let mut hardware = annual_target("t1", "200000", "0.04");
    hardware.product_category_id = Some(CategoryId::new("hardware"));
    repo.upsert_target(&hardware).await.unwrap();

    let mut software = annual_target("t2", "100000", "0.06");
    software.product_category_id = Some(CategoryId::new("software"));
    repo.upsert_target(&software).await.unwrap();

    let mut d = deal("d1", "10000", "closed_won", date(2025, 4, 1));
    d.product_category_id = Some(CategoryId::new("software"));
    repo.upsert_deal(&d).await.unwrap();

    let outcome = engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .unwrap();
    match outcome {
        RecalcOutcome::Applied(period) => {
            assert_eq!(period.target_id.as_str(), "t2");
            assert_eq!(period.final_rate.to_canonical_string(), "0.06");
        }
        other => panic!("expected Applied, got {:?}", other),
    }
}

#[tokio::test]
async fn test_no_active_target_is_a_non_fatal_outcome() {
    let (engine, repo, _temp) = setup_engine().await;

    repo.upsert_deal(&deal("d1", "10000", "closed_won", date(2025, 4, 1)))
        .await
        .unwrap();

    let outcome = engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .unwrap();
    assert_eq!(outcome, RecalcOutcome::NoActiveTarget);
    assert_eq!(commission_of(&repo, "d1").await, None);
}

#[tokio::test]
async fn test_open_deal_is_a_noop() {
    let (engine, repo, _temp) = setup_engine().await;

    repo.upsert_target(&annual_target("t1", "100000", "0.05"))
        .await
        .unwrap();
    repo.upsert_deal(&deal("d1", "10000", "proposal", date(2025, 4, 1)))
        .await
        .unwrap();

    let outcome = engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .unwrap();
    assert_eq!(outcome, RecalcOutcome::DealNotClosedWon);
}

#[tokio::test]
async fn test_unknown_deal_is_not_found() {
    let (engine, _repo, _temp) = setup_engine().await;

    let err = engine
        .calculate_deal_commission(&DealId::new("ghost"))
        .await
        .expect_err("unknown deal must error");
    assert!(matches!(err, EngineError::DealNotFound(_)));
}

#[tokio::test]
async fn test_zero_quota_never_divides_by_zero() {
    let (engine, repo, _temp) = setup_engine().await;

    repo.upsert_target(&annual_target("t1", "0", "0.05"))
        .await
        .unwrap();
    repo.upsert_deal(&deal("d1", "10000", "closed_won", date(2025, 4, 1)))
        .await
        .unwrap();

    let outcome = engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .unwrap();
    match outcome {
        RecalcOutcome::Applied(period) => {
            assert_eq!(period.attainment_percent, Money::zero());
            assert_eq!(period.final_rate.to_canonical_string(), "0.05");
        }
        other => panic!("expected Applied, got {:?}", other),
    }
}

#[tokio::test]
async fn test_tiered_structure_falls_back_to_base_rate() {
    let (engine, repo, _temp) = setup_engine().await;

    let mut target = annual_target("t1", "100000", "0.05");
    target.structure = Some(CommissionStructure::Tiered {
        tiers: vec![commission_engine::domain::AmountTier {
            amount_threshold: Money::from_i64(50_000),
            rate: money("0.08"),
        }],
    });
    repo.upsert_target(&target).await.unwrap();
    repo.upsert_deal(&deal("d1", "120000", "closed_won", date(2025, 4, 1)))
        .await
        .unwrap();

    let outcome = engine
        .calculate_deal_commission(&DealId::new("d1"))
        .await
        .unwrap();
    match outcome {
        RecalcOutcome::Applied(period) => {
            assert_eq!(period.final_rate.to_canonical_string(), "0.05");
        }
        other => panic!("expected Applied, got {:?}", other),
    }
}
