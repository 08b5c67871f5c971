//! Transaction CSV export

use std::io::Write;

use chrono::NaiveDate;
use rusqlite::{params_from_iter, types::Value};
use serde::Serialize;

use crate::db::Database;
use crate::error::Result;

/// Options for transaction export
#[derive(Debug, Clone, Default)]
pub struct TransactionExportOptions {
    /// Start date filter (inclusive)
    pub from: Option<NaiveDate>,
    /// End date filter (inclusive)
    pub to: Option<NaiveDate>,
}

/// One CSV row
#[derive(Debug, Clone, Serialize)]
pub struct TransactionExportRow {
    pub date: String,
    pub account: String,
    pub description: String,
    pub merchant: String,
    pub category: String,
    pub amount: f64,
    pub status: String,
}

impl Database {
    /// Transactions for export, oldest first
    pub fn export_transactions(
        &self,
        user_id: i64,
        opts: &TransactionExportOptions,
    ) -> Result<Vec<TransactionExportRow>> {
        let mut sql = String::from(
            r#"
            SELECT t.date, a.institution || ' ' || a.name, t.description,
                   COALESCE(t.merchant, ''), t.category, t.amount, t.status
            FROM transactions t
            JOIN accounts a ON a.id = t.account_id
            WHERE a.user_id = ?
            "#,
        );
        let mut values: Vec<Value> = vec![Value::Integer(user_id)];

        if let Some(from) = opts.from {
            sql.push_str(" AND t.date >= ?");
            values.push(Value::Text(from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = opts.to {
            sql.push_str(" AND t.date <= ?");
            values.push(Value::Text(to.format("%Y-%m-%d").to_string()));
        }
        sql.push_str(" ORDER BY t.date, t.id");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(TransactionExportRow {
                    date: row.get(0)?,
                    account: row.get(1)?,
                    description: row.get(2)?,
                    merchant: row.get(3)?,
                    category: row.get(4)?,
                    amount: row.get(5)?,
                    status: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Write transactions as CSV with a header row
    pub fn write_transactions_csv<W: Write>(
        &self,
        user_id: i64,
        opts: &TransactionExportOptions,
        writer: W,
    ) -> Result<usize> {
        let rows = self.export_transactions(user_id, opts)?;
        let mut csv_writer = csv::Writer::from_writer(writer);
        // serialize() only writes headers on the first record
        if rows.is_empty() {
            csv_writer.write_record([
                "date",
                "account",
                "description",
                "merchant",
                "category",
                "amount",
                "status",
            ])?;
        }
        for row in &rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(rows.len())
    }

    /// Transactions as a CSV string
    pub fn export_transactions_csv(
        &self,
        user_id: i64,
        opts: &TransactionExportOptions,
    ) -> Result<String> {
        let mut buf = Vec::new();
        self.write_transactions_csv(user_id, opts, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountType, NewAccount, NewTransaction, NewUser, TransactionStatus};

    fn setup() -> (Database, i64, i64) {
        let db = Database::in_memory().unwrap();
        let user = db
            .create_user(&NewUser {
                email: "export@example.com".into(),
                name: "Export".into(),
                password: "password123".into(),
            })
            .unwrap();
        let account = db
            .create_account(
                user.id,
                &NewAccount {
                    institution: "Chase".into(),
                    name: "Checking".into(),
                    account_type: AccountType::Depository,
                    subtype: None,
                    current_balance: 0.0,
                    available_balance: None,
                    currency: None,
                    external_id: None,
                },
            )
            .unwrap();
        (db, user.id, account.id)
    }

    fn add(db: &Database, user_id: i64, account_id: i64, desc: &str, amount: f64, day: u32) {
        db.insert_transaction(
            user_id,
            &NewTransaction {
                account_id,
                description: desc.into(),
                merchant: None,
                amount,
                category: Some("misc".into()),
                date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
                status: TransactionStatus::Posted,
                external_id: None,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_export_transactions_empty() {
        let (db, user_id, _) = setup();
        let csv = db
            .export_transactions_csv(user_id, &TransactionExportOptions::default())
            .unwrap();
        assert_eq!(
            csv.trim(),
            "date,account,description,merchant,category,amount,status"
        );
    }

    #[test]
    fn test_export_transactions_csv() {
        let (db, user_id, account_id) = setup();
        add(&db, user_id, account_id, "Coffee, large", -5.5, 2);
        add(&db, user_id, account_id, "Paycheck", 2000.0, 1);

        let csv = db
            .export_transactions_csv(user_id, &TransactionExportOptions::default())
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("date,account"));
        // Oldest first, fields with commas quoted
        assert!(lines[1].starts_with("2024-05-01,Chase Checking,Paycheck"));
        assert!(lines[2].contains("\"Coffee, large\""));
        assert!(lines[2].ends_with("-5.5,posted"));
    }

    #[test]
    fn test_export_with_date_filter() {
        let (db, user_id, account_id) = setup();
        add(&db, user_id, account_id, "Early", -1.0, 1);
        add(&db, user_id, account_id, "Middle", -2.0, 15);
        add(&db, user_id, account_id, "Late", -3.0, 30);

        let opts = TransactionExportOptions {
            from: NaiveDate::from_ymd_opt(2024, 5, 10),
            to: NaiveDate::from_ymd_opt(2024, 5, 20),
        };
        let rows = db.export_transactions(user_id, &opts).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "Middle");

        // Other users see nothing
        let stranger = db
            .create_user(&NewUser {
                email: "nobody@example.com".into(),
                name: "Nobody".into(),
                password: "password123".into(),
            })
            .unwrap();
        assert!(db
            .export_transactions(stranger.id, &TransactionExportOptions::default())
            .unwrap()
            .is_empty());
    }
}
