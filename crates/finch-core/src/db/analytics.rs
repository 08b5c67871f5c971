//! Aggregations behind the analytics endpoints
//!
//! All amounts follow the transaction sign convention: income is the sum of
//! positive amounts, expenses the sum of negative amounts reported as a
//! positive number.

use chrono::{Datelike, Months, NaiveDate};
use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{AccountOverview, CategorySpending, MerchantSpending, MonthlySummary};

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Half-open range `[first day of month, first day of next month)`
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = month_start(date);
    let end = start
        .checked_add_months(Months::new(1))
        .unwrap_or(NaiveDate::MAX);
    (start, end)
}

/// Parse `YYYY-MM` into the first day of that month
pub fn parse_month(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .map_err(|_| Error::InvalidData(format!("Invalid month '{}', expected YYYY-MM", s)))
}

fn fmt(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl Database {
    /// Income, expenses and savings rate for one month
    pub fn monthly_summary(&self, user_id: i64, month: NaiveDate) -> Result<MonthlySummary> {
        let (start, end) = month_bounds(month);
        let conn = self.conn()?;

        let (income, expenses, count): (f64, f64, i64) = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN t.amount > 0 THEN t.amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN t.amount < 0 THEN -t.amount ELSE 0 END), 0),
                COUNT(*)
            FROM transactions t
            JOIN accounts a ON a.id = t.account_id
            WHERE a.user_id = ? AND t.date >= ? AND t.date < ?
            "#,
            params![user_id, fmt(start), fmt(end)],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let net = income - expenses;
        let savings_rate = if income > 0.0 {
            net / income * 100.0
        } else {
            0.0
        };

        Ok(MonthlySummary {
            month: start,
            income,
            expenses,
            net,
            savings_rate,
            transaction_count: count,
        })
    }

    /// Debit totals per category, largest first
    pub fn spending_by_category(
        &self,
        user_id: i64,
        month: NaiveDate,
    ) -> Result<Vec<CategorySpending>> {
        let (start, end) = month_bounds(month);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT t.category, SUM(-t.amount) AS total, COUNT(*)
            FROM transactions t
            JOIN accounts a ON a.id = t.account_id
            WHERE a.user_id = ? AND t.amount < 0 AND t.date >= ? AND t.date < ?
            GROUP BY t.category
            ORDER BY total DESC, t.category
            "#,
        )?;

        let rows: Vec<(String, f64, i64)> = stmt
            .query_map(params![user_id, fmt(start), fmt(end)], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let grand_total: f64 = rows.iter().map(|(_, total, _)| total).sum();

        Ok(rows
            .into_iter()
            .map(|(category, total, count)| CategorySpending {
                percentage: if grand_total > 0.0 {
                    total / grand_total * 100.0
                } else {
                    0.0
                },
                category,
                total,
                count,
            })
            .collect())
    }

    /// Summaries for the `months` months ending with the month containing `until`,
    /// oldest first
    pub fn monthly_trend(
        &self,
        user_id: i64,
        until: NaiveDate,
        months: u32,
    ) -> Result<Vec<MonthlySummary>> {
        let last = month_start(until);
        let mut trend = Vec::with_capacity(months as usize);

        for back in (0..months).rev() {
            let Some(month) = last.checked_sub_months(Months::new(back)) else {
                continue;
            };
            trend.push(self.monthly_summary(user_id, month)?);
        }

        Ok(trend)
    }

    /// Merchants with the highest debit totals in a month
    pub fn top_merchants(
        &self,
        user_id: i64,
        month: NaiveDate,
        limit: i64,
    ) -> Result<Vec<MerchantSpending>> {
        let (start, end) = month_bounds(month);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT COALESCE(t.merchant, t.description) AS m, SUM(-t.amount) AS total, COUNT(*)
            FROM transactions t
            JOIN accounts a ON a.id = t.account_id
            WHERE a.user_id = ? AND t.amount < 0 AND t.date >= ? AND t.date < ?
            GROUP BY m
            ORDER BY total DESC, m
            LIMIT ?
            "#,
        )?;

        let merchants = stmt
            .query_map(params![user_id, fmt(start), fmt(end), limit], |row| {
                Ok(MerchantSpending {
                    merchant: row.get(0)?,
                    total: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(merchants)
    }

    /// Assets, liabilities and net worth from current balances
    ///
    /// Credit balances are treated as amounts owed regardless of sign.
    pub fn account_overview(&self, user_id: i64) -> Result<AccountOverview> {
        let conn = self.conn()?;
        let (count, assets, liabilities, last_synced): (i64, f64, f64, Option<String>) = conn
            .query_row(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN account_type = 'depository' THEN current_balance ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN account_type = 'credit' THEN ABS(current_balance) ELSE 0 END), 0),
                    MAX(last_synced_at)
                FROM accounts
                WHERE user_id = ?
                "#,
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

        Ok(AccountOverview {
            account_count: count,
            total_assets: assets,
            total_liabilities: liabilities,
            net_worth: assets - liabilities,
            last_synced_at: last_synced.as_deref().map(parse_datetime),
        })
    }
}
