//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rusqlite::params;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_user(db: &Database, email: &str) -> User {
        db.create_user(&NewUser {
            email: email.to_string(),
            name: "Test User".to_string(),
            password: "password123".to_string(),
        })
        .unwrap()
    }

    fn checking(name: &str) -> NewAccount {
        NewAccount {
            institution: "Test Bank".into(),
            name: name.into(),
            account_type: AccountType::Depository,
            subtype: Some("checking".into()),
            current_balance: 1000.0,
            available_balance: Some(950.0),
            currency: None,
            external_id: None,
        }
    }

    fn tx(account_id: i64, description: &str, amount: f64, category: &str, on: NaiveDate) -> NewTransaction {
        NewTransaction {
            account_id,
            description: description.into(),
            merchant: None,
            amount,
            category: Some(category.into()),
            date: on,
            status: TransactionStatus::Posted,
            external_id: None,
        }
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "empty@example.com");
        assert!(db.list_accounts(user.id).unwrap().is_empty());
        assert!(db.list_budgets(user.id).unwrap().is_empty());
    }

    #[test]
    fn test_schema_tables_exist() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'sessions', 'accounts', 'transactions', 'budgets', 'teller_enrollments')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 6);
    }

    #[test]
    fn test_register_and_verify_password() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "Alex@Example.com");
        assert_eq!(user.email, "alex@example.com");

        let ok = db.verify_password("alex@example.com", "password123").unwrap();
        assert_eq!(ok.map(|u| u.id), Some(user.id));

        assert!(db
            .verify_password("alex@example.com", "wrong-password")
            .unwrap()
            .is_none());
        assert!(db
            .verify_password("nobody@example.com", "password123")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let db = Database::in_memory().unwrap();
        test_user(&db, "dup@example.com");

        let err = db
            .create_user(&NewUser {
                email: "DUP@example.com".into(),
                name: "Other".into(),
                password: "password456".into(),
            })
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_password_not_stored_in_plaintext() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "hash@example.com");
        let conn = db.conn().unwrap();
        let stored: String = conn
            .query_row(
                "SELECT password_hash FROM users WHERE id = ?",
                params![user.id],
                |row| row.get(0),
            )
            .unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(!stored.contains("password123"));
    }

    #[test]
    fn test_session_lifecycle() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "session@example.com");

        let token = db.create_session(user.id).unwrap();
        assert_eq!(token.len(), 64);

        let resolved = db.user_for_token(&token).unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        // Only the digest is stored
        let conn = db.conn().unwrap();
        let raw: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sessions WHERE token_hash = ?",
                params![token],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(raw, 0);
        drop(conn);

        assert!(db.delete_session(&token).unwrap());
        assert!(!db.delete_session(&token).unwrap());
        assert!(db.user_for_token(&token).unwrap().is_none());
    }

    #[test]
    fn test_expired_sessions_are_rejected_and_purged() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "expired@example.com");
        let token = db.create_session(user.id).unwrap();

        let conn = db.conn().unwrap();
        conn.execute(
            "UPDATE sessions SET expires_at = '2000-01-01 00:00:00' WHERE user_id = ?",
            params![user.id],
        )
        .unwrap();
        drop(conn);

        assert!(db.user_for_token(&token).unwrap().is_none());
        assert_eq!(db.purge_expired_sessions().unwrap(), 1);
    }

    #[test]
    fn test_ensure_local_user_is_stable() {
        let db = Database::in_memory().unwrap();
        let first = db.ensure_local_user().unwrap();
        let second = db.ensure_local_user().unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_accounts_are_scoped_to_user() {
        let db = Database::in_memory().unwrap();
        let alice = test_user(&db, "alice@example.com");
        let bob = test_user(&db, "bob@example.com");

        let account = db.create_account(alice.id, &checking("Everyday")).unwrap();
        assert_eq!(account.currency, "USD");
        assert_eq!(account.account_type, AccountType::Depository);

        assert_eq!(db.list_accounts(alice.id).unwrap().len(), 1);
        assert!(db.list_accounts(bob.id).unwrap().is_empty());
        assert!(db.get_account(bob.id, account.id).unwrap().is_none());

        let err = db.delete_account(bob.id, account.id).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(db.get_account(alice.id, account.id).unwrap().is_some());
    }

    #[test]
    fn test_update_account_balance() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "balance@example.com");
        let account = db.create_account(user.id, &checking("Everyday")).unwrap();

        db.update_account_balance(user.id, account.id, 42.5, None)
            .unwrap();
        let updated = db.get_account(user.id, account.id).unwrap().unwrap();
        assert_eq!(updated.current_balance, 42.5);
        assert_eq!(updated.available_balance, None);

        assert!(db
            .update_account_balance(user.id, account.id, f64::INFINITY, None)
            .is_err());
        assert!(matches!(
            db.update_account_balance(user.id, 9999, 1.0, None),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_upsert_external_account() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "linked@example.com");

        let mut account = checking("Linked");
        account.external_id = Some("acc_123".into());

        let id = db.upsert_external_account(user.id, &account).unwrap();
        account.current_balance = 2000.0;
        let id2 = db.upsert_external_account(user.id, &account).unwrap();
        assert_eq!(id, id2);

        let stored = db.get_account(user.id, id).unwrap().unwrap();
        assert_eq!(stored.current_balance, 2000.0);
        assert!(stored.last_synced_at.is_some());

        db.create_account(user.id, &checking("Manual")).unwrap();
        assert_eq!(db.list_linked_accounts(user.id).unwrap().len(), 1);

        // Manual accounts need no external id, linked ones do
        assert!(db
            .upsert_external_account(user.id, &checking("Missing id"))
            .is_err());
    }

    #[test]
    fn test_delete_account_cascades_transactions() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "cascade@example.com");
        let account = db.create_account(user.id, &checking("Everyday")).unwrap();
        db.insert_transaction(
            user.id,
            &tx(account.id, "Coffee", -4.5, "dining", date(2024, 5, 2)),
        )
        .unwrap();

        db.delete_account(user.id, account.id).unwrap();

        let conn = db.conn().unwrap();
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_insert_transaction_requires_owned_account() {
        let db = Database::in_memory().unwrap();
        let alice = test_user(&db, "owner@example.com");
        let bob = test_user(&db, "intruder@example.com");
        let account = db.create_account(alice.id, &checking("Everyday")).unwrap();

        let err = db
            .insert_transaction(bob.id, &tx(account.id, "Sneaky", -10.0, "misc", date(2024, 5, 1)))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_list_transactions_filters() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "filters@example.com");
        let account = db.create_account(user.id, &checking("Everyday")).unwrap();
        let other = db.create_account(user.id, &checking("Second")).unwrap();

        db.insert_transaction(user.id, &tx(account.id, "WHOLE FOODS", -80.0, "groceries", date(2024, 4, 28)))
            .unwrap();
        db.insert_transaction(user.id, &tx(account.id, "CHIPOTLE", -12.0, "dining", date(2024, 5, 3)))
            .unwrap();
        db.insert_transaction(user.id, &tx(other.id, "PAYROLL", 3000.0, "income", date(2024, 5, 1)))
            .unwrap();

        let all = db
            .list_transactions(user.id, &TransactionFilter::default())
            .unwrap();
        assert_eq!(all.len(), 3);
        // Newest first
        assert_eq!(all[0].description, "CHIPOTLE");
        assert_eq!(all[2].description, "WHOLE FOODS");

        let by_account = TransactionFilter {
            account_id: Some(other.id),
            ..Default::default()
        };
        assert_eq!(db.list_transactions(user.id, &by_account).unwrap().len(), 1);

        let by_category = TransactionFilter {
            category: Some("Dining".into()),
            ..Default::default()
        };
        assert_eq!(db.count_transactions(user.id, &by_category).unwrap(), 1);

        let in_may = TransactionFilter {
            from: Some(date(2024, 5, 1)),
            to: Some(date(2024, 5, 31)),
            ..Default::default()
        };
        assert_eq!(db.count_transactions(user.id, &in_may).unwrap(), 2);

        let search = TransactionFilter {
            search: Some("whole".into()),
            ..Default::default()
        };
        let found = db.list_transactions(user.id, &search).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, "groceries");

        let paged = TransactionFilter {
            limit: 2,
            offset: 2,
            ..Default::default()
        };
        assert_eq!(db.list_transactions(user.id, &paged).unwrap().len(), 1);
        assert_eq!(db.count_transactions(user.id, &paged).unwrap(), 3);
    }

    #[test]
    fn test_update_and_delete_transaction() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "recat@example.com");
        let stranger = test_user(&db, "stranger@example.com");
        let account = db.create_account(user.id, &checking("Everyday")).unwrap();
        let created = db
            .insert_transaction(user.id, &tx(account.id, "AMAZON", -25.0, "", date(2024, 5, 5)))
            .unwrap();
        assert_eq!(created.category, UNCATEGORIZED);

        db.update_transaction_category(user.id, created.id, " Shopping ")
            .unwrap();
        let updated = db.get_transaction(user.id, created.id).unwrap().unwrap();
        assert_eq!(updated.category, "shopping");

        assert!(matches!(
            db.update_transaction_category(stranger.id, created.id, "misc"),
            Err(Error::NotFound(_))
        ));
        assert!(db.update_transaction_category(user.id, created.id, "  ").is_err());

        assert!(matches!(
            db.delete_transaction(stranger.id, created.id),
            Err(Error::NotFound(_))
        ));
        db.delete_transaction(user.id, created.id).unwrap();
        assert!(db.get_transaction(user.id, created.id).unwrap().is_none());
    }

    #[test]
    fn test_upsert_external_transaction_keeps_category() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "sync@example.com");
        let account = db.create_account(user.id, &checking("Everyday")).unwrap();

        let mut incoming = tx(account.id, "STARBUCKS", -5.25, "dining", date(2024, 5, 6));
        incoming.external_id = Some("txn_1".into());
        incoming.status = TransactionStatus::Pending;

        assert!(db.upsert_external_transaction(&incoming).unwrap());

        let stored = db
            .list_transactions(user.id, &TransactionFilter::default())
            .unwrap()
            .remove(0);
        db.update_transaction_category(user.id, stored.id, "coffee")
            .unwrap();

        incoming.status = TransactionStatus::Posted;
        assert!(!db.upsert_external_transaction(&incoming).unwrap());

        let refreshed = db.get_transaction(user.id, stored.id).unwrap().unwrap();
        assert_eq!(refreshed.status, TransactionStatus::Posted);
        assert_eq!(refreshed.category, "coffee");
        assert_eq!(db.count_transactions(user.id, &TransactionFilter::default()).unwrap(), 1);
    }

    #[test]
    fn test_budget_crud_and_conflict() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "budget@example.com");

        let budget = db
            .create_budget(
                user.id,
                &NewBudget {
                    category: "Dining".into(),
                    monthly_limit: 200.0,
                    alert_threshold: None,
                },
            )
            .unwrap();
        assert_eq!(budget.category, "dining");
        assert_eq!(budget.alert_threshold, DEFAULT_ALERT_THRESHOLD);

        let dup = db.create_budget(
            user.id,
            &NewBudget {
                category: "dining".into(),
                monthly_limit: 100.0,
                alert_threshold: None,
            },
        );
        assert!(matches!(dup, Err(Error::Conflict(_))));

        let updated = db
            .update_budget(
                user.id,
                budget.id,
                &BudgetUpdate {
                    monthly_limit: Some(300.0),
                    alert_threshold: None,
                },
            )
            .unwrap();
        assert_eq!(updated.monthly_limit, 300.0);
        assert_eq!(updated.alert_threshold, DEFAULT_ALERT_THRESHOLD);

        let invalid = db.update_budget(
            user.id,
            budget.id,
            &BudgetUpdate {
                monthly_limit: Some(-1.0),
                alert_threshold: None,
            },
        );
        assert!(matches!(invalid, Err(Error::InvalidData(_))));

        db.delete_budget(user.id, budget.id).unwrap();
        assert!(matches!(
            db.delete_budget(user.id, budget.id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_budget_statuses_count_only_debits_in_month() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "status@example.com");
        let account = db.create_account(user.id, &checking("Everyday")).unwrap();

        db.create_budget(
            user.id,
            &NewBudget {
                category: "groceries".into(),
                monthly_limit: 100.0,
                alert_threshold: Some(0.8),
            },
        )
        .unwrap();

        db.insert_transaction(user.id, &tx(account.id, "Market", -60.0, "groceries", date(2024, 5, 2)))
            .unwrap();
        db.insert_transaction(user.id, &tx(account.id, "Market", -25.0, "groceries", date(2024, 5, 20)))
            .unwrap();
        // Refund, previous month and other category are all ignored
        db.insert_transaction(user.id, &tx(account.id, "Refund", 30.0, "groceries", date(2024, 5, 21)))
            .unwrap();
        db.insert_transaction(user.id, &tx(account.id, "Market", -90.0, "groceries", date(2024, 4, 30)))
            .unwrap();
        db.insert_transaction(user.id, &tx(account.id, "Diner", -40.0, "dining", date(2024, 5, 3)))
            .unwrap();

        let statuses = db.budget_statuses(user.id, date(2024, 5, 15)).unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].spent, 85.0);
        assert_eq!(statuses[0].alert, BudgetAlert::Warning);

        db.insert_transaction(user.id, &tx(account.id, "Market", -20.0, "groceries", date(2024, 5, 25)))
            .unwrap();
        let statuses = db.budget_statuses(user.id, date(2024, 5, 1)).unwrap();
        assert_eq!(statuses[0].alert, BudgetAlert::Exceeded);
        assert!(statuses[0].remaining < 0.0);
    }

    #[test]
    fn test_monthly_summary_and_categories() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "summary@example.com");
        let account = db.create_account(user.id, &checking("Everyday")).unwrap();

        db.insert_transaction(user.id, &tx(account.id, "Payroll", 4000.0, "income", date(2024, 5, 1)))
            .unwrap();
        db.insert_transaction(user.id, &tx(account.id, "Rent", -1500.0, "housing", date(2024, 5, 1)))
            .unwrap();
        db.insert_transaction(user.id, &tx(account.id, "Groceries", -500.0, "groceries", date(2024, 5, 10)))
            .unwrap();
        db.insert_transaction(user.id, &tx(account.id, "Old", -999.0, "housing", date(2024, 4, 30)))
            .unwrap();

        let summary = db.monthly_summary(user.id, date(2024, 5, 31)).unwrap();
        assert_eq!(summary.month, date(2024, 5, 1));
        assert_eq!(summary.income, 4000.0);
        assert_eq!(summary.expenses, 2000.0);
        assert_eq!(summary.net, 2000.0);
        assert!((summary.savings_rate - 50.0).abs() < 1e-9);
        assert_eq!(summary.transaction_count, 3);

        let categories = db.spending_by_category(user.id, date(2024, 5, 1)).unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].category, "housing");
        assert!((categories[0].percentage - 75.0).abs() < 1e-9);
        assert!((categories[1].percentage - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_month_has_zero_savings_rate() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "quiet@example.com");
        let summary = db.monthly_summary(user.id, date(2024, 2, 1)).unwrap();
        assert_eq!(summary.income, 0.0);
        assert_eq!(summary.savings_rate, 0.0);
        assert!(db.spending_by_category(user.id, date(2024, 2, 1)).unwrap().is_empty());
    }

    #[test]
    fn test_monthly_trend_oldest_first() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "trend@example.com");
        let account = db.create_account(user.id, &checking("Everyday")).unwrap();
        db.insert_transaction(user.id, &tx(account.id, "Payroll", 100.0, "income", date(2024, 1, 15)))
            .unwrap();
        db.insert_transaction(user.id, &tx(account.id, "Payroll", 300.0, "income", date(2024, 3, 15)))
            .unwrap();

        let trend = db.monthly_trend(user.id, date(2024, 3, 20), 3).unwrap();
        let months: Vec<_> = trend.iter().map(|s| s.month).collect();
        assert_eq!(months, vec![date(2024, 1, 1), date(2024, 2, 1), date(2024, 3, 1)]);
        assert_eq!(trend[0].income, 100.0);
        assert_eq!(trend[1].income, 0.0);
        assert_eq!(trend[2].income, 300.0);
    }

    #[test]
    fn test_top_merchants_falls_back_to_description() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "merchants@example.com");
        let account = db.create_account(user.id, &checking("Everyday")).unwrap();

        let mut coffee = tx(account.id, "SBUX 123", -5.0, "dining", date(2024, 5, 1));
        coffee.merchant = Some("Starbucks".into());
        db.insert_transaction(user.id, &coffee).unwrap();
        db.insert_transaction(user.id, &coffee).unwrap();
        db.insert_transaction(user.id, &tx(account.id, "LOCAL HARDWARE", -40.0, "home", date(2024, 5, 2)))
            .unwrap();

        let merchants = db.top_merchants(user.id, date(2024, 5, 1), 10).unwrap();
        assert_eq!(merchants.len(), 2);
        assert_eq!(merchants[0].merchant, "LOCAL HARDWARE");
        assert_eq!(merchants[1].merchant, "Starbucks");
        assert_eq!(merchants[1].count, 2);

        assert_eq!(db.top_merchants(user.id, date(2024, 5, 1), 1).unwrap().len(), 1);
    }

    #[test]
    fn test_account_overview_net_worth() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "networth@example.com");
        db.create_account(user.id, &checking("Everyday")).unwrap();
        db.create_account(
            user.id,
            &NewAccount {
                institution: "Card Co".into(),
                name: "Rewards".into(),
                account_type: AccountType::Credit,
                subtype: Some("credit_card".into()),
                current_balance: -250.0,
                available_balance: None,
                currency: None,
                external_id: None,
            },
        )
        .unwrap();

        let overview = db.account_overview(user.id).unwrap();
        assert_eq!(overview.account_count, 2);
        assert_eq!(overview.total_assets, 1000.0);
        assert_eq!(overview.total_liabilities, 250.0);
        assert_eq!(overview.net_worth, 750.0);
        assert!(overview.last_synced_at.is_none());
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-05").unwrap(), date(2024, 5, 1));
        assert!(matches!(parse_month("May 2024"), Err(Error::InvalidData(_))));
        assert_eq!(month_bounds(date(2024, 12, 9)), (date(2024, 12, 1), date(2025, 1, 1)));
    }

    #[test]
    fn test_seed_demo_data_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "demo@example.com");

        let first = db.seed_demo_data(user.id).unwrap();
        assert!(!first.skipped);
        assert_eq!(first.accounts, 3);
        assert_eq!(first.budgets, 6);
        assert!(first.transactions > 0);

        let count = db
            .count_transactions(user.id, &TransactionFilter::default())
            .unwrap();
        assert_eq!(count as usize, first.transactions);

        // Nothing is dated in the future
        let today = chrono::Utc::now().date_naive();
        let newest = db
            .list_transactions(user.id, &TransactionFilter::default())
            .unwrap();
        assert!(newest.iter().all(|t| t.date <= today));

        let second = db.seed_demo_data(user.id).unwrap();
        assert!(second.skipped);
        assert_eq!(db.list_accounts(user.id).unwrap().len(), 3);
    }

    #[test]
    fn test_teller_enrollments() {
        let db = Database::in_memory().unwrap();
        let user = test_user(&db, "teller@example.com");
        let other = test_user(&db, "other@example.com");

        let id = db
            .save_enrollment(user.id, "enr_1", "Chase", "token_a")
            .unwrap();
        let id2 = db
            .save_enrollment(user.id, "enr_1", "Chase", "token_b")
            .unwrap();
        assert_eq!(id, id2);

        let enrollments = db.list_enrollments(user.id).unwrap();
        assert_eq!(enrollments.len(), 1);
        assert_eq!(enrollments[0].access_token, "token_b");
        assert!(db.list_enrollments(other.id).unwrap().is_empty());

        assert!(db.save_enrollment(user.id, "", "Chase", "tok").is_err());
    }
}
