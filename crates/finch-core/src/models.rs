//! Domain models for Finch

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Category assigned to transactions that arrive without one
pub const UNCATEGORIZED: &str = "uncategorized";

/// A dashboard user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Registration input
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::InvalidData("A valid email is required".into()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::InvalidData("Name is required".into()));
        }
        if self.password.chars().count() < 8 {
            return Err(Error::InvalidData(
                "Password must be at least 8 characters".into(),
            ));
        }
        Ok(())
    }
}

/// A linked or manually created bank account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    /// Identifier at the aggregator (Teller), if linked
    pub external_id: Option<String>,
    pub institution: String,
    pub name: String,
    pub account_type: AccountType,
    /// Finer-grained type, e.g. "checking", "savings", "credit_card"
    pub subtype: Option<String>,
    pub current_balance: f64,
    pub available_balance: Option<f64>,
    pub currency: String,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Account types as reported by the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Depository,
    Credit,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Depository => "depository",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "depository" | "checking" | "savings" => Ok(Self::Depository),
            "credit" | "credit_card" => Ok(Self::Credit),
            _ => Err(format!("Unknown account type: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating an account
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub institution: String,
    pub name: String,
    pub account_type: AccountType,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub current_balance: f64,
    #[serde(default)]
    pub available_balance: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl NewAccount {
    pub fn validate(&self) -> Result<()> {
        if self.institution.trim().is_empty() {
            return Err(Error::InvalidData("Institution is required".into()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::InvalidData("Account name is required".into()));
        }
        if !self.current_balance.is_finite() {
            return Err(Error::InvalidData("Balance must be a number".into()));
        }
        Ok(())
    }
}

/// Posting status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Posted,
    Pending,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Posted => "posted",
            Self::Pending => "pending",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "posted" => Ok(Self::Posted),
            "pending" => Ok(Self::Pending),
            _ => Err(format!("Unknown transaction status: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction on an account
///
/// `amount` is signed: negative for debits (money out), positive for credits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub external_id: Option<String>,
    pub description: String,
    pub merchant: Option<String>,
    pub amount: f64,
    pub category: String,
    pub date: NaiveDate,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_debit(&self) -> bool {
        self.amount < 0.0
    }

    /// Merchant name for display, falling back to the raw description
    pub fn display_merchant(&self) -> &str {
        self.merchant.as_deref().unwrap_or(&self.description)
    }
}

/// Input for recording a transaction
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    pub account_id: i64,
    pub description: String,
    #[serde(default)]
    pub merchant: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl NewTransaction {
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(Error::InvalidData("Description is required".into()));
        }
        if !self.amount.is_finite() || self.amount == 0.0 {
            return Err(Error::InvalidData(
                "Amount must be a non-zero number".into(),
            ));
        }
        Ok(())
    }

    /// Category with surrounding whitespace removed, defaulting to uncategorized
    pub fn category_or_default(&self) -> String {
        self.category
            .as_deref()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string())
    }
}

/// Filters for listing transactions
#[derive(Debug, Clone)]
pub struct TransactionFilter {
    pub account_id: Option<i64>,
    pub category: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Substring match on description or merchant
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            account_id: None,
            category: None,
            from: None,
            to: None,
            search: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Monthly spending limit for a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub category: String,
    pub monthly_limit: f64,
    /// Fraction of the limit at which a warning is raised
    pub alert_threshold: f64,
    pub created_at: DateTime<Utc>,
}

pub const DEFAULT_ALERT_THRESHOLD: f64 = 0.8;

fn validate_limit_and_threshold(limit: f64, threshold: f64) -> Result<()> {
    if !limit.is_finite() || limit <= 0.0 {
        return Err(Error::InvalidData(
            "Monthly limit must be a positive number".into(),
        ));
    }
    if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
        return Err(Error::InvalidData(
            "Alert threshold must be between 0 and 1".into(),
        ));
    }
    Ok(())
}

/// Input for creating a budget
#[derive(Debug, Clone, Deserialize)]
pub struct NewBudget {
    pub category: String,
    pub monthly_limit: f64,
    #[serde(default)]
    pub alert_threshold: Option<f64>,
}

impl NewBudget {
    pub fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            return Err(Error::InvalidData("Category is required".into()));
        }
        validate_limit_and_threshold(self.monthly_limit, self.threshold())
    }

    pub fn threshold(&self) -> f64 {
        self.alert_threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD)
    }
}

/// Partial update for a budget
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BudgetUpdate {
    pub monthly_limit: Option<f64>,
    pub alert_threshold: Option<f64>,
}

impl BudgetUpdate {
    /// Validate the update against the budget it will be applied to
    pub fn validate_against(&self, budget: &Budget) -> Result<()> {
        validate_limit_and_threshold(
            self.monthly_limit.unwrap_or(budget.monthly_limit),
            self.alert_threshold.unwrap_or(budget.alert_threshold),
        )
    }
}

/// Budget alert level for the current month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetAlert {
    Ok,
    Warning,
    Exceeded,
}

/// A budget together with the month's spending against it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub budget: Budget,
    pub spent: f64,
    pub remaining: f64,
    pub percent_used: f64,
    pub alert: BudgetAlert,
}

impl BudgetStatus {
    pub fn new(budget: Budget, spent: f64) -> Self {
        let percent_used = if budget.monthly_limit > 0.0 {
            spent / budget.monthly_limit * 100.0
        } else {
            0.0
        };
        let alert = if spent > budget.monthly_limit {
            BudgetAlert::Exceeded
        } else if spent >= budget.monthly_limit * budget.alert_threshold {
            BudgetAlert::Warning
        } else {
            BudgetAlert::Ok
        };

        Self {
            remaining: budget.monthly_limit - spent,
            percent_used,
            alert,
            spent,
            budget,
        }
    }
}

/// Stored aggregator enrollment (the token the Teller Connect widget returns)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TellerEnrollment {
    pub id: i64,
    pub user_id: i64,
    pub enrollment_id: String,
    pub institution: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub created_at: DateTime<Utc>,
}

/// Income and expenses for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    /// First day of the month
    pub month: NaiveDate,
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
    pub savings_rate: f64,
    pub transaction_count: i64,
}

/// Spending total for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySpending {
    pub category: String,
    pub total: f64,
    pub count: i64,
    pub percentage: f64,
}

/// Spending total for one merchant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantSpending {
    pub merchant: String,
    pub total: f64,
    pub count: i64,
}

/// Assets, liabilities and net worth across all accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountOverview {
    pub account_count: i64,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub net_worth: f64,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Returned by register and login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// A month's summary together with its category breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub summary: MonthlySummary,
    pub categories: Vec<CategorySpending>,
}
