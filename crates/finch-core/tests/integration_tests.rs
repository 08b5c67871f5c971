//! Integration tests for finch-core
//!
//! These tests exercise the register → seed → analyze → export workflow
//! and the offline recommendation path.

use chrono::{Datelike, Months, Utc};
use finch_core::models::{NewBudget, NewUser, TransactionFilter};
use finch_core::{
    Database, MarketAnalyzer, QuoteSource, RiskCategory, TransactionExportOptions, Watchlist,
};

fn register(db: &Database, email: &str) -> i64 {
    db.create_user(&NewUser {
        email: email.into(),
        name: "Integration".into(),
        password: "password123".into(),
    })
    .expect("Failed to create user")
    .id
}

// ===== Finance workflow =====

#[test]
fn test_seed_then_analyze() {
    let db = Database::in_memory().expect("Failed to create database");
    let user_id = register(&db, "flow@example.com");

    let seeded = db.seed_demo_data(user_id).expect("Seed failed");
    assert!(!seeded.skipped);
    assert!(seeded.accounts > 0);
    assert!(seeded.transactions > 0);

    // Last month is always fully populated
    let today = Utc::now().date_naive();
    let last_month = today
        .with_day(1)
        .and_then(|d| d.checked_sub_months(Months::new(1)))
        .unwrap();

    let summary = db.monthly_summary(user_id, last_month).unwrap();
    assert!(summary.income > 0.0);
    assert!(summary.expenses > 0.0);
    assert!((summary.net - (summary.income - summary.expenses)).abs() < 0.01);

    let categories = db.spending_by_category(user_id, last_month).unwrap();
    assert!(!categories.is_empty());
    let pct: f64 = categories.iter().map(|c| c.percentage).sum();
    assert!((pct - 100.0).abs() < 0.5, "percentages summed to {}", pct);
    let total: f64 = categories.iter().map(|c| c.total).sum();
    assert!((total - summary.expenses).abs() < 0.01);

    // Sorted largest first
    for pair in categories.windows(2) {
        assert!(pair[0].total >= pair[1].total);
    }

    let trend = db.monthly_trend(user_id, today, 3).unwrap();
    assert_eq!(trend.len(), 3);

    // Seeding twice is a no-op
    let again = db.seed_demo_data(user_id).unwrap();
    assert!(again.skipped);
}

#[test]
fn test_budget_status_follows_spending() {
    let db = Database::in_memory().expect("Failed to create database");
    let user_id = register(&db, "budget@example.com");
    db.seed_demo_data(user_id).unwrap();

    let today = Utc::now().date_naive();
    let last_month = today
        .with_day(1)
        .and_then(|d| d.checked_sub_months(Months::new(1)))
        .unwrap();
    let categories = db.spending_by_category(user_id, last_month).unwrap();
    let biggest = &categories[0];

    // A tiny limit on the biggest category must be exceeded
    let budget = match db.create_budget(
        user_id,
        &NewBudget {
            category: biggest.category.clone(),
            monthly_limit: 1.0,
            alert_threshold: None,
        },
    ) {
        Ok(budget) => budget,
        // Demo data may already budget this category
        Err(_) => db
            .list_budgets(user_id)
            .unwrap()
            .into_iter()
            .find(|b| b.category == biggest.category)
            .unwrap(),
    };

    let statuses = db.budget_statuses(user_id, last_month).unwrap();
    let status = statuses.iter().find(|s| s.budget.id == budget.id).unwrap();
    assert!((status.spent - biggest.total).abs() < 0.01);
    assert!(status.spent > 0.0);
}

#[test]
fn test_export_matches_listing() {
    let db = Database::in_memory().expect("Failed to create database");
    let user_id = register(&db, "export@example.com");
    db.seed_demo_data(user_id).unwrap();

    let filter = TransactionFilter {
        limit: 10_000,
        ..Default::default()
    };
    let listed = db.count_transactions(user_id, &filter).unwrap();

    let csv = db
        .export_transactions_csv(user_id, &TransactionExportOptions::default())
        .unwrap();
    // Header plus one line per transaction
    assert_eq!(csv.lines().count() as i64, listed + 1);

    // Another user's export is empty
    let other = register(&db, "other@example.com");
    let csv = db
        .export_transactions_csv(other, &TransactionExportOptions::default())
        .unwrap();
    assert_eq!(csv.lines().count(), 1);
}

// ===== Sessions =====

#[test]
fn test_session_round_trip() {
    let db = Database::in_memory().expect("Failed to create database");
    let user_id = register(&db, "session@example.com");

    let user = db
        .verify_password("SESSION@example.com", "password123")
        .unwrap()
        .expect("credentials should verify");
    assert_eq!(user.id, user_id);

    let token = db.create_session(user_id).unwrap();
    assert_eq!(db.user_for_token(&token).unwrap().unwrap().id, user_id);

    db.delete_session(&token).unwrap();
    assert!(db.user_for_token(&token).unwrap().is_none());
}

// ===== Recommendations =====

#[tokio::test]
async fn test_offline_recommendations() {
    let analyzer = MarketAnalyzer::offline(Watchlist::embedded()).with_seed(42);

    let recs = analyzer
        .get_recommendations(RiskCategory::Moderate.tolerance())
        .await;
    assert_eq!(recs.len(), analyzer.watchlist().top_n());
    assert!(recs.iter().all(|r| r.source == QuoteSource::Fallback));
    assert!(recs.iter().all(|r| r.score <= 100));
    for pair in recs.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    let snapshot = analyzer.snapshot().await;
    assert_eq!(snapshot.quotes.len(), analyzer.watchlist().len());
}

#[tokio::test]
async fn test_risk_tolerance_shifts_tech_scores() {
    let analyzer = MarketAnalyzer::offline(Watchlist::embedded());
    let nvda = analyzer.watchlist().get("NVDA").unwrap().clone();

    // Random RSI and sentiment differ per call; compare the average
    let mut conservative = 0.0;
    let mut aggressive = 0.0;
    for _ in 0..20 {
        conservative += analyzer.analyze(&nvda, 0.2).await.score as f64;
        aggressive += analyzer.analyze(&nvda, 0.8).await.score as f64;
    }
    assert!(aggressive > conservative);
}
