//! CLI command tests

use finch_core::db::Database;
use finch_core::models::{AccountType, NewAccount, NewUser, TransactionFilter};
use finch_core::test_utils::MockProviderServer;
use finch_core::{MarketAnalyzer, MarketConfig, Watchlist};

use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn seeded_db() -> (Database, i64) {
    let db = setup_test_db();
    let user = db.ensure_local_user().unwrap();
    db.seed_demo_data(user.id).unwrap();
    (db, user.id)
}

// ========== Core ==========

#[test]
fn test_cmd_init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("finch.db");

    commands::cmd_init(&path).unwrap();
    assert!(path.exists());

    // Idempotent
    commands::cmd_init(&path).unwrap();
}

#[test]
fn test_resolve_user_defaults_to_local() {
    let db = setup_test_db();
    let first = commands::resolve_user(&db, None).unwrap();
    let second = commands::resolve_user(&db, None).unwrap();
    assert_eq!(first.id, second.id);
}

#[test]
fn test_resolve_user_by_email() {
    let db = setup_test_db();
    let alice = db
        .create_user(&NewUser {
            email: "alice@example.com".into(),
            name: "Alice".into(),
            password: "password123".into(),
        })
        .unwrap();

    let resolved = commands::resolve_user(&db, Some("alice@example.com")).unwrap();
    assert_eq!(resolved.id, alice.id);

    assert!(commands::resolve_user(&db, Some("nobody@example.com")).is_err());
}

#[test]
fn test_cmd_seed_loads_once() {
    let db = setup_test_db();
    commands::cmd_seed(&db, None).unwrap();

    let user = db.ensure_local_user().unwrap();
    let accounts = db.list_accounts(user.id).unwrap().len();
    assert!(accounts > 0);

    // Second run is skipped
    commands::cmd_seed(&db, None).unwrap();
    assert_eq!(db.list_accounts(user.id).unwrap().len(), accounts);
}

// ========== Finance ==========

#[test]
fn test_cmd_accounts_empty_and_seeded() {
    let db = setup_test_db();
    assert!(commands::cmd_accounts(&db, None).is_ok());

    let (db, _) = seeded_db();
    assert!(commands::cmd_accounts(&db, None).is_ok());
}

#[test]
fn test_cmd_transactions_filters() {
    let (db, _) = seeded_db();
    assert!(commands::cmd_transactions(&db, None, 10, None, None, None).is_ok());
    assert!(
        commands::cmd_transactions(&db, None, 10, Some("groceries".into()), None, None).is_ok()
    );
    assert!(commands::cmd_transactions(&db, None, 10, None, None, Some("zzz".into())).is_ok());
}

#[test]
fn test_cmd_budgets_add_and_delete() {
    let db = setup_test_db();
    let user = db.ensure_local_user().unwrap();

    commands::cmd_budgets_add(&db, None, "coffee", 50.0, Some(0.9)).unwrap();
    let budgets = db.list_budgets(user.id).unwrap();
    assert_eq!(budgets.len(), 1);
    assert_eq!(budgets[0].category, "coffee");
    assert!((budgets[0].alert_threshold - 0.9).abs() < 1e-9);

    // Duplicate category is rejected
    assert!(commands::cmd_budgets_add(&db, None, "coffee", 60.0, None).is_err());

    // Invalid limit is rejected
    assert!(commands::cmd_budgets_add(&db, None, "books", -5.0, None).is_err());

    commands::cmd_budgets_delete(&db, None, budgets[0].id).unwrap();
    assert!(db.list_budgets(user.id).unwrap().is_empty());
}

#[test]
fn test_cmd_budgets_status() {
    let (db, _) = seeded_db();
    assert!(commands::cmd_budgets_list(&db, None).is_ok());
    assert!(commands::cmd_budgets_status(&db, None, None).is_ok());
    assert!(commands::cmd_budgets_status(&db, None, Some("2024-03")).is_ok());
    assert!(commands::cmd_budgets_status(&db, None, Some("March")).is_err());
}

#[test]
fn test_cmd_summary() {
    let (db, _) = seeded_db();
    assert!(commands::cmd_summary(&db, None, None, 6).is_ok());
    assert!(commands::cmd_summary(&db, None, Some("2024-01"), 1).is_ok());
    assert!(commands::cmd_summary(&db, None, Some("2024-13"), 6).is_err());
}

#[test]
fn test_month_or_current() {
    let month = commands::month_or_current(Some("2024-02")).unwrap();
    assert_eq!(month.to_string(), "2024-02-01");
    assert!(commands::month_or_current(None).is_ok());
}

// ========== Export ==========

#[test]
fn test_cmd_export_to_file() {
    let (db, user_id) = seeded_db();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("transactions.csv");

    commands::cmd_export(&db, None, Some(&path), None, None).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next().unwrap(),
        "date,account,description,merchant,category,amount,status"
    );

    let total = db
        .count_transactions(
            user_id,
            &TransactionFilter {
                limit: 10_000,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(lines.count() as i64, total);
}

#[test]
fn test_cmd_export_date_range() {
    let db = setup_test_db();
    let user = db.ensure_local_user().unwrap();
    let account = db
        .create_account(
            user.id,
            &NewAccount {
                institution: "Test Bank".into(),
                name: "Checking".into(),
                account_type: AccountType::Depository,
                subtype: None,
                current_balance: 100.0,
                available_balance: None,
                currency: None,
                external_id: None,
            },
        )
        .unwrap();
    for (date, desc) in [("2024-01-05", "January"), ("2024-02-05", "February")] {
        db.insert_transaction(
            user.id,
            &finch_core::models::NewTransaction {
                account_id: account.id,
                description: desc.into(),
                merchant: None,
                amount: -10.0,
                category: None,
                date: date.parse().unwrap(),
                status: Default::default(),
                external_id: None,
            },
        )
        .unwrap();
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feb.csv");
    commands::cmd_export(&db, None, Some(&path), Some("2024-02-01"), Some("2024-02-29")).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.contains("February"));
    assert!(!content.contains("January"));
}

#[test]
fn test_cmd_export_invalid_date() {
    let (db, _) = seeded_db();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    assert!(commands::cmd_export(&db, None, Some(&path), Some("01/02/2024"), None).is_err());
}

// ========== Market ==========

#[test]
fn test_resolve_risk() {
    assert_eq!(commands::resolve_risk(None, None).unwrap(), 0.5);
    assert_eq!(commands::resolve_risk(Some(3.0), None).unwrap(), 1.0);
    assert_eq!(commands::resolve_risk(Some(-1.0), None).unwrap(), 0.0);
    assert_eq!(
        commands::resolve_risk(None, Some("aggressive")).unwrap(),
        0.8
    );
    assert!(commands::resolve_risk(None, Some("yolo")).is_err());
}

#[tokio::test]
async fn test_market_commands_offline() {
    let analyzer = MarketAnalyzer::offline(Watchlist::embedded());
    assert!(commands::cmd_market_recommend(&analyzer, Some(0.3), None)
        .await
        .is_ok());
    assert!(commands::cmd_market_quote(&analyzer, "aapl").await.is_ok());
    assert!(commands::cmd_market_quote(&analyzer, "  ").await.is_err());
    assert!(commands::cmd_market_quote(&analyzer, "AAPL/../x").await.is_err());
    assert!(commands::cmd_market_quote(&analyzer, "brk.b").await.is_ok());
    assert!(commands::cmd_market_crypto(&analyzer).await.is_ok());
}

#[tokio::test]
async fn test_market_watch_stops_after_count() {
    let analyzer = MarketAnalyzer::offline(Watchlist::embedded());
    commands::cmd_market_watch(&analyzer, 1, Some(1))
        .await
        .unwrap();
    assert!(commands::cmd_market_watch(&analyzer, 0, Some(1))
        .await
        .is_err());
}

#[tokio::test]
async fn test_market_commands_against_mock_providers() {
    let mock = MockProviderServer::start().await;
    let config = MarketConfig::with_base_url(&mock.url(), None);
    let analyzer = MarketAnalyzer::new(&config, Watchlist::embedded()).unwrap();

    assert!(commands::cmd_market_recommend(&analyzer, None, Some("moderate"))
        .await
        .is_ok());
    assert!(commands::cmd_market_crypto(&analyzer).await.is_ok());

    mock.set_failing(true);
    assert!(commands::cmd_market_quote(&analyzer, "MSFT").await.is_ok());
}

// ========== Remote ==========

#[tokio::test]
async fn test_remote_commands_need_a_server() {
    // Nothing listens on port 9 locally
    let client = commands::remote_client("http://127.0.0.1:9", Some("token".into())).unwrap();
    assert!(client.is_authenticated());
    assert!(commands::cmd_remote_summary(&client, None).await.is_err());
    assert!(commands::cmd_remote_login(&client, "a@b.c", "password")
        .await
        .is_err());
}

// ========== Helpers ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a very long merchant name", 10), "a very ...");
    assert_eq!(truncate("café crème brûlée", 8), "café ...");
}
