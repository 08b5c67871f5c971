//! Transaction operations

use rusqlite::{params, params_from_iter, types::Value, OptionalExtension};

use super::{parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction, TransactionFilter, TransactionStatus};

const TRANSACTION_COLUMNS: &str = "t.id, t.account_id, t.external_id, t.description, t.merchant, \
     t.amount, t.category, t.date, t.status, t.created_at";

fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
    let date_str: String = row.get(7)?;
    let status_str: String = row.get(8)?;
    let created_at: String = row.get(9)?;

    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        external_id: row.get(2)?,
        description: row.get(3)?,
        merchant: row.get(4)?,
        amount: row.get(5)?,
        category: row.get(6)?,
        date: parse_date(&date_str),
        status: status_str.parse().unwrap_or(TransactionStatus::Posted),
        created_at: parse_datetime(&created_at),
    })
}

/// Build the WHERE clause shared by listing and counting
fn filter_clause(user_id: i64, filter: &TransactionFilter) -> (String, Vec<Value>) {
    let mut clause = String::from("WHERE a.user_id = ?");
    let mut values: Vec<Value> = vec![Value::Integer(user_id)];

    if let Some(account_id) = filter.account_id {
        clause.push_str(" AND t.account_id = ?");
        values.push(Value::Integer(account_id));
    }
    if let Some(ref category) = filter.category {
        clause.push_str(" AND t.category = ?");
        values.push(Value::Text(category.trim().to_lowercase()));
    }
    if let Some(from) = filter.from {
        clause.push_str(" AND t.date >= ?");
        values.push(Value::Text(from.format("%Y-%m-%d").to_string()));
    }
    if let Some(to) = filter.to {
        clause.push_str(" AND t.date <= ?");
        values.push(Value::Text(to.format("%Y-%m-%d").to_string()));
    }
    if let Some(ref search) = filter.search {
        let pattern = format!("%{}%", search.trim());
        clause.push_str(" AND (t.description LIKE ? OR t.merchant LIKE ?)");
        values.push(Value::Text(pattern.clone()));
        values.push(Value::Text(pattern));
    }

    (clause, values)
}

impl Database {
    /// Record a transaction on one of the user's accounts
    pub fn insert_transaction(&self, user_id: i64, tx: &NewTransaction) -> Result<Transaction> {
        tx.validate()?;
        self.get_account(user_id, tx.account_id)?
            .ok_or_else(|| Error::NotFound(format!("Account {}", tx.account_id)))?;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO transactions (account_id, external_id, description, merchant, amount,
                                      category, date, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.account_id,
                tx.external_id,
                tx.description.trim(),
                tx.merchant,
                tx.amount,
                tx.category_or_default(),
                tx.date.format("%Y-%m-%d").to_string(),
                tx.status.as_str(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_transaction(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Transaction {}", id)))
    }

    /// Insert or refresh an aggregator transaction, keyed by (account, external id)
    ///
    /// Returns true when a new row was inserted. Existing rows keep their
    /// user-assigned category.
    pub fn upsert_external_transaction(&self, tx: &NewTransaction) -> Result<bool> {
        tx.validate()?;
        let external_id = tx
            .external_id
            .as_deref()
            .ok_or_else(|| Error::InvalidData("External transaction id is required".into()))?;

        let conn = self.conn()?;
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE account_id = ? AND external_id = ?",
                params![tx.account_id, external_id],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            conn.execute(
                "UPDATE transactions SET description = ?, merchant = ?, amount = ?, date = ?, status = ? WHERE id = ?",
                params![
                    tx.description,
                    tx.merchant,
                    tx.amount,
                    tx.date.format("%Y-%m-%d").to_string(),
                    tx.status.as_str(),
                    id
                ],
            )?;
            return Ok(false);
        }

        conn.execute(
            r#"
            INSERT INTO transactions (account_id, external_id, description, merchant, amount,
                                      category, date, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.account_id,
                external_id,
                tx.description,
                tx.merchant,
                tx.amount,
                tx.category_or_default(),
                tx.date.format("%Y-%m-%d").to_string(),
                tx.status.as_str(),
            ],
        )?;
        Ok(true)
    }

    /// List transactions newest first
    pub fn list_transactions(
        &self,
        user_id: i64,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        let (clause, mut values) = filter_clause(user_id, filter);
        values.push(Value::Integer(filter.limit));
        values.push(Value::Integer(filter.offset));

        let sql = format!(
            r#"
            SELECT {}
            FROM transactions t
            JOIN accounts a ON a.id = t.account_id
            {}
            ORDER BY t.date DESC, t.id DESC
            LIMIT ? OFFSET ?
            "#,
            TRANSACTION_COLUMNS, clause
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params_from_iter(values), row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Count transactions matching a filter (ignores limit/offset)
    pub fn count_transactions(&self, user_id: i64, filter: &TransactionFilter) -> Result<i64> {
        let (clause, values) = filter_clause(user_id, filter);
        let sql = format!(
            "SELECT COUNT(*) FROM transactions t JOIN accounts a ON a.id = t.account_id {}",
            clause
        );

        let conn = self.conn()?;
        let count = conn.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(count)
    }

    pub fn get_transaction(&self, user_id: i64, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!(
                    r#"
                    SELECT {}
                    FROM transactions t
                    JOIN accounts a ON a.id = t.account_id
                    WHERE t.id = ? AND a.user_id = ?
                    "#,
                    TRANSACTION_COLUMNS
                ),
                params![id, user_id],
                row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// Recategorize a transaction
    pub fn update_transaction_category(&self, user_id: i64, id: i64, category: &str) -> Result<()> {
        let category = category.trim().to_lowercase();
        if category.is_empty() {
            return Err(Error::InvalidData("Category is required".into()));
        }

        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE transactions SET category = ?
            WHERE id = ? AND account_id IN (SELECT id FROM accounts WHERE user_id = ?)
            "#,
            params![category, id, user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Transaction {}", id)));
        }
        Ok(())
    }

    pub fn delete_transaction(&self, user_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM transactions WHERE id = ? AND account_id IN (SELECT id FROM accounts WHERE user_id = ?)",
            params![id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Transaction {}", id)));
        }
        Ok(())
    }
}
