//! Account operations

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Account, AccountType, NewAccount};

const ACCOUNT_COLUMNS: &str = "id, user_id, external_id, institution, name, account_type, subtype, \
     current_balance, available_balance, currency, last_synced_at, created_at";

fn row_to_account(row: &rusqlite::Row) -> rusqlite::Result<Account> {
    let account_type_str: String = row.get(5)?;
    let last_synced: Option<String> = row.get(10)?;
    let created_at: String = row.get(11)?;

    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        external_id: row.get(2)?,
        institution: row.get(3)?,
        name: row.get(4)?,
        account_type: account_type_str.parse().unwrap_or(AccountType::Depository),
        subtype: row.get(6)?,
        current_balance: row.get(7)?,
        available_balance: row.get(8)?,
        currency: row.get(9)?,
        last_synced_at: last_synced.as_deref().map(parse_datetime),
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Create a manually tracked account
    pub fn create_account(&self, user_id: i64, account: &NewAccount) -> Result<Account> {
        account.validate()?;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO accounts (user_id, external_id, institution, name, account_type, subtype,
                                  current_balance, available_balance, currency)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                account.external_id,
                account.institution.trim(),
                account.name.trim(),
                account.account_type.as_str(),
                account.subtype,
                account.current_balance,
                account.available_balance,
                account.currency.as_deref().unwrap_or("USD"),
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_account(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Account {}", id)))
    }

    /// Insert or refresh an aggregator-linked account, keyed by external id
    ///
    /// Stamps `last_synced_at`. Returns the local account id.
    pub fn upsert_external_account(&self, user_id: i64, account: &NewAccount) -> Result<i64> {
        account.validate()?;
        let external_id = account
            .external_id
            .as_deref()
            .ok_or_else(|| Error::InvalidData("External account id is required".into()))?;

        let conn = self.conn()?;
        let now = format_datetime(&Utc::now());

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM accounts WHERE user_id = ? AND external_id = ?",
                params![user_id, external_id],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            conn.execute(
                r#"
                UPDATE accounts
                SET institution = ?, name = ?, account_type = ?, subtype = ?,
                    current_balance = ?, available_balance = ?, last_synced_at = ?
                WHERE id = ?
                "#,
                params![
                    account.institution,
                    account.name,
                    account.account_type.as_str(),
                    account.subtype,
                    account.current_balance,
                    account.available_balance,
                    now,
                    id
                ],
            )?;
            return Ok(id);
        }

        conn.execute(
            r#"
            INSERT INTO accounts (user_id, external_id, institution, name, account_type, subtype,
                                  current_balance, available_balance, currency, last_synced_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                external_id,
                account.institution,
                account.name,
                account.account_type.as_str(),
                account.subtype,
                account.current_balance,
                account.available_balance,
                account.currency.as_deref().unwrap_or("USD"),
                now
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List all accounts for a user
    pub fn list_accounts(&self, user_id: i64) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts WHERE user_id = ? ORDER BY institution, name",
            ACCOUNT_COLUMNS
        ))?;

        let accounts = stmt
            .query_map(params![user_id], row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// List only aggregator-linked accounts
    pub fn list_linked_accounts(&self, user_id: i64) -> Result<Vec<Account>> {
        Ok(self
            .list_accounts(user_id)?
            .into_iter()
            .filter(|a| a.external_id.is_some())
            .collect())
    }

    /// Get an account by ID, scoped to its owner
    pub fn get_account(&self, user_id: i64, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                &format!(
                    "SELECT {} FROM accounts WHERE id = ? AND user_id = ?",
                    ACCOUNT_COLUMNS
                ),
                params![id, user_id],
                row_to_account,
            )
            .optional()?;

        Ok(account)
    }

    /// Overwrite an account's balances
    pub fn update_account_balance(
        &self,
        user_id: i64,
        id: i64,
        current_balance: f64,
        available_balance: Option<f64>,
    ) -> Result<()> {
        if !current_balance.is_finite() {
            return Err(Error::InvalidData("Balance must be a number".into()));
        }

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE accounts SET current_balance = ?, available_balance = ? WHERE id = ? AND user_id = ?",
            params![current_balance, available_balance, id, user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Account {}", id)));
        }
        Ok(())
    }

    /// Delete an account and its transactions
    pub fn delete_account(&self, user_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM accounts WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Account {}", id)));
        }
        Ok(())
    }
}
