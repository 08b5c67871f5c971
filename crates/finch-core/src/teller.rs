//! Teller bank aggregation
//!
//! The browser runs Teller Connect and posts the resulting access token to
//! the server, which stores it as an enrollment. Syncing pulls accounts,
//! balances and transactions for every enrollment and upserts them by
//! Teller id.
//!
//! Teller authenticates with HTTP basic auth: the access token is the
//! username and the password is empty.
//!
//! # Configuration
//!
//! - `TELLER_API_URL`: API base URL (default: https://api.teller.io)

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{AccountType, NewAccount, NewTransaction, TransactionStatus};

pub const DEFAULT_TELLER_URL: &str = "https://api.teller.io";

#[derive(Debug, Clone)]
pub struct TellerConfig {
    pub api_url: String,
    pub timeout: Duration,
}

impl Default for TellerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_TELLER_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl TellerConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("TELLER_API_URL")
                .ok()
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TELLER_URL.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TellerInstitution {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TellerAccount {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub subtype: Option<String>,
    pub currency: Option<String>,
    pub institution: TellerInstitution,
    pub last_four: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TellerBalance {
    pub ledger: Option<String>,
    pub available: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TellerCounterparty {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TellerDetails {
    pub category: Option<String>,
    pub counterparty: Option<TellerCounterparty>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TellerTransaction {
    pub id: String,
    pub amount: String,
    pub date: String,
    pub description: String,
    pub status: Option<String>,
    #[serde(default)]
    pub details: Option<TellerDetails>,
}

fn parse_amount(value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::InvalidData(format!("Invalid Teller amount: {}", value)))
}

impl TellerAccount {
    /// Map into a local account, with balances from the balances endpoint
    pub fn to_new_account(&self, balance: Option<&TellerBalance>) -> Result<NewAccount> {
        let account_type = match self.account_type.as_str() {
            "credit" => AccountType::Credit,
            _ => AccountType::Depository,
        };

        let ledger = balance
            .and_then(|b| b.ledger.as_deref())
            .map(parse_amount)
            .transpose()?
            .unwrap_or(0.0);
        let available = balance
            .and_then(|b| b.available.as_deref())
            .map(parse_amount)
            .transpose()?;

        let name = match self.last_four {
            Some(ref last_four) if !last_four.is_empty() => {
                format!("{} ({})", self.name, last_four)
            }
            _ => self.name.clone(),
        };

        Ok(NewAccount {
            institution: self.institution.name.clone(),
            name,
            account_type,
            subtype: self.subtype.clone(),
            current_balance: ledger,
            available_balance: available,
            currency: self.currency.clone(),
            external_id: Some(self.id.clone()),
        })
    }
}

impl TellerTransaction {
    /// Map into a local transaction. Amounts keep Teller's sign.
    pub fn to_new_transaction(&self, account_id: i64) -> Result<NewTransaction> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|_| Error::InvalidData(format!("Invalid Teller date: {}", self.date)))?;
        let status = match self.status.as_deref() {
            Some("pending") => TransactionStatus::Pending,
            _ => TransactionStatus::Posted,
        };
        let details = self.details.clone().unwrap_or_default();

        Ok(NewTransaction {
            account_id,
            description: self.description.clone(),
            merchant: details.counterparty.and_then(|c| c.name),
            amount: parse_amount(&self.amount)?,
            category: details.category,
            date,
            status,
            external_id: Some(self.id.clone()),
        })
    }
}

/// Counts from a sync run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TellerSyncResult {
    pub enrollments: usize,
    pub accounts: usize,
    pub transactions_added: usize,
    pub transactions_updated: usize,
    /// Enrollments whose fetch failed (token revoked, bank down)
    pub failed_enrollments: usize,
}

/// HTTP client for the Teller API
#[derive(Clone)]
pub struct TellerClient {
    client: Client,
    base_url: String,
}

impl TellerClient {
    pub fn new(config: &TellerConfig) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(config.timeout).build()?,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, token: &str, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .basic_auth(token, None::<&str>)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Auth("Teller rejected the access token".into()));
        }

        Ok(response.error_for_status()?.json().await?)
    }

    pub async fn accounts(&self, token: &str) -> Result<Vec<TellerAccount>> {
        self.get(token, "/accounts").await
    }

    pub async fn balances(&self, token: &str, account_id: &str) -> Result<TellerBalance> {
        self.get(token, &format!("/accounts/{}/balances", account_id))
            .await
    }

    pub async fn transactions(
        &self,
        token: &str,
        account_id: &str,
    ) -> Result<Vec<TellerTransaction>> {
        self.get(token, &format!("/accounts/{}/transactions", account_id))
            .await
    }

    /// Pull everything for one user's enrollments into the database
    ///
    /// A failing enrollment is logged and counted; the others still sync.
    pub async fn sync_user(&self, db: &Database, user_id: i64) -> Result<TellerSyncResult> {
        let enrollments = db.list_enrollments(user_id)?;
        let mut result = TellerSyncResult {
            enrollments: enrollments.len(),
            ..Default::default()
        };

        for enrollment in &enrollments {
            if let Err(e) = self
                .sync_enrollment(db, user_id, &enrollment.access_token, &mut result)
                .await
            {
                warn!(
                    user_id,
                    enrollment = %enrollment.enrollment_id,
                    error = %e,
                    "Teller sync failed for enrollment"
                );
                result.failed_enrollments += 1;
            }
        }

        info!(
            user_id,
            accounts = result.accounts,
            added = result.transactions_added,
            updated = result.transactions_updated,
            failed = result.failed_enrollments,
            "Teller sync complete"
        );
        Ok(result)
    }

    async fn sync_enrollment(
        &self,
        db: &Database,
        user_id: i64,
        token: &str,
        result: &mut TellerSyncResult,
    ) -> Result<()> {
        for account in self.accounts(token).await? {
            let balance = match self.balances(token, &account.id).await {
                Ok(balance) => Some(balance),
                Err(e) => {
                    warn!(account = %account.id, error = %e, "Teller balance fetch failed");
                    None
                }
            };

            let local_id =
                db.upsert_external_account(user_id, &account.to_new_account(balance.as_ref())?)?;
            result.accounts += 1;

            for tx in self.transactions(token, &account.id).await? {
                let new_tx = match tx.to_new_transaction(local_id) {
                    Ok(new_tx) => new_tx,
                    Err(e) => {
                        debug!(transaction = %tx.id, error = %e, "Skipping malformed Teller transaction");
                        continue;
                    }
                };
                // Zero-amount holds fail validation and are skipped
                if new_tx.validate().is_err() {
                    continue;
                }
                if db.upsert_external_transaction(&new_tx)? {
                    result.transactions_added += 1;
                } else {
                    result.transactions_updated += 1;
                }
            }
        }
        Ok(())
    }
}
