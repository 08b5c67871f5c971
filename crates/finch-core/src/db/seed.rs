//! Demo data fixtures
//!
//! Loads a consistent set of accounts, roughly three months of transactions
//! relative to today, and budgets, so a fresh install has something to show.

use chrono::{Datelike, Months, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{AccountType, NewAccount, NewBudget, NewTransaction, TransactionStatus};

#[derive(Debug, Clone, Default, Serialize)]
pub struct DemoSeedResult {
    pub accounts: usize,
    pub transactions: usize,
    pub budgets: usize,
    /// True when the user already had accounts and nothing was loaded
    pub skipped: bool,
}

/// (day of month, description, merchant, amount, category, account index)
type Recurring = (u32, &'static str, Option<&'static str>, f64, &'static str, usize);

const CHECKING: usize = 0;
const CREDIT: usize = 2;

const MONTHLY: &[Recurring] = &[
    (1, "ACME CORP PAYROLL", Some("Acme Corp"), 3200.00, "income", CHECKING),
    (15, "ACME CORP PAYROLL", Some("Acme Corp"), 3200.00, "income", CHECKING),
    (1, "MAPLE RIDGE APTS RENT", Some("Maple Ridge Apartments"), -1650.00, "housing", CHECKING),
    (5, "CITY POWER & LIGHT", Some("City Power & Light"), -96.40, "utilities", CHECKING),
    (8, "COMCAST INTERNET", Some("Comcast"), -79.99, "utilities", CHECKING),
    (12, "NETFLIX.COM", Some("Netflix"), -15.49, "entertainment", CREDIT),
    (18, "SPOTIFY USA", Some("Spotify"), -10.99, "entertainment", CREDIT),
    (20, "CHASE CARD AUTOPAY", None, -850.00, "transfer", CHECKING),
    (20, "PAYMENT THANK YOU", None, 850.00, "transfer", CREDIT),
    (25, "TRANSFER TO SAVINGS", None, -500.00, "transfer", CHECKING),
];

/// Spread across the month: (day, description, merchant, amount, category)
const VARIABLE: &[(u32, &str, &str, f64, &str)] = &[
    (3, "WHOLEFDS MKT #10234", "Whole Foods", -112.37, "groceries"),
    (10, "TRADER JOE'S #552", "Trader Joe's", -86.12, "groceries"),
    (17, "WHOLEFDS MKT #10234", "Whole Foods", -134.90, "groceries"),
    (24, "SAFEWAY #1877", "Safeway", -92.55, "groceries"),
    (4, "STARBUCKS STORE 4410", "Starbucks", -6.45, "dining"),
    (9, "CHIPOTLE 1123", "Chipotle", -14.20, "dining"),
    (14, "THE LOCAL BISTRO", "The Local Bistro", -68.75, "dining"),
    (22, "DOORDASH*THAI HOUSE", "DoorDash", -41.30, "dining"),
    (6, "SHELL OIL 5741", "Shell", -48.10, "transportation"),
    (19, "UBER TRIP", "Uber", -23.60, "transportation"),
    (27, "SHELL OIL 5741", "Shell", -45.85, "transportation"),
    (11, "AMAZON.COM*MK2LP", "Amazon", -57.99, "shopping"),
    (23, "TARGET 00019", "Target", -83.42, "shopping"),
    (16, "CVS PHARMACY", "CVS", -24.18, "health"),
];

const BUDGETS: &[(&str, f64)] = &[
    ("groceries", 600.0),
    ("dining", 250.0),
    ("entertainment", 60.0),
    ("transportation", 200.0),
    ("shopping", 250.0),
    ("utilities", 200.0),
];

fn demo_accounts() -> Vec<NewAccount> {
    vec![
        NewAccount {
            institution: "Chase".into(),
            name: "Total Checking".into(),
            account_type: AccountType::Depository,
            subtype: Some("checking".into()),
            current_balance: 4250.75,
            available_balance: Some(4180.75),
            currency: None,
            external_id: None,
        },
        NewAccount {
            institution: "Ally Bank".into(),
            name: "Online Savings".into(),
            account_type: AccountType::Depository,
            subtype: Some("savings".into()),
            current_balance: 12500.00,
            available_balance: Some(12500.00),
            currency: None,
            external_id: None,
        },
        NewAccount {
            institution: "Chase".into(),
            name: "Sapphire Preferred".into(),
            account_type: AccountType::Credit,
            subtype: Some("credit_card".into()),
            current_balance: 1234.56,
            available_balance: Some(8765.44),
            currency: None,
            external_id: None,
        },
    ]
}

fn day_in_month(month: NaiveDate, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(month.year(), month.month(), day)
}

impl Database {
    /// Load demo data for a user unless they already have accounts
    pub fn seed_demo_data(&self, user_id: i64) -> Result<DemoSeedResult> {
        if !self.list_accounts(user_id)?.is_empty() {
            info!(user_id, "User already has accounts, skipping demo data");
            return Ok(DemoSeedResult {
                skipped: true,
                ..Default::default()
            });
        }

        let mut result = DemoSeedResult::default();

        let mut account_ids = Vec::new();
        for account in demo_accounts() {
            account_ids.push(self.create_account(user_id, &account)?.id);
            result.accounts += 1;
        }

        let today = Utc::now().date_naive();
        let this_month = today.with_day(1).unwrap_or(today);

        for back in (0..3).rev() {
            let Some(month) = this_month.checked_sub_months(Months::new(back)) else {
                continue;
            };

            for &(day, description, merchant, amount, category, account) in MONTHLY {
                let Some(date) = day_in_month(month, day).filter(|d| *d <= today) else {
                    continue;
                };
                self.insert_transaction(
                    user_id,
                    &NewTransaction {
                        account_id: account_ids[account],
                        description: description.to_string(),
                        merchant: merchant.map(String::from),
                        amount,
                        category: Some(category.to_string()),
                        date,
                        status: TransactionStatus::Posted,
                        external_id: None,
                    },
                )?;
                result.transactions += 1;
            }

            for &(day, description, merchant, amount, category) in VARIABLE {
                let Some(date) = day_in_month(month, day).filter(|d| *d <= today) else {
                    continue;
                };
                // Recent card activity shows as pending
                let status = if (today - date).num_days() <= 2 {
                    TransactionStatus::Pending
                } else {
                    TransactionStatus::Posted
                };
                self.insert_transaction(
                    user_id,
                    &NewTransaction {
                        account_id: account_ids[CREDIT],
                        description: description.to_string(),
                        merchant: Some(merchant.to_string()),
                        amount,
                        category: Some(category.to_string()),
                        date,
                        status,
                        external_id: None,
                    },
                )?;
                result.transactions += 1;
            }
        }

        for &(category, limit) in BUDGETS {
            let budget = NewBudget {
                category: category.to_string(),
                monthly_limit: limit,
                alert_threshold: None,
            };
            match self.create_budget(user_id, &budget) {
                Ok(_) => result.budgets += 1,
                // Keep budgets the user already set up
                Err(Error::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }

        info!(
            user_id,
            accounts = result.accounts,
            transactions = result.transactions,
            budgets = result.budgets,
            "Seeded demo data"
        );
        Ok(result)
    }
}
