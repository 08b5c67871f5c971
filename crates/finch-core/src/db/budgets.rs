//! Budget operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::analytics::month_bounds;
use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Budget, BudgetStatus, BudgetUpdate, NewBudget};

fn row_to_budget(row: &rusqlite::Row) -> rusqlite::Result<Budget> {
    let created_at: String = row.get(5)?;
    Ok(Budget {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category: row.get(2)?,
        monthly_limit: row.get(3)?,
        alert_threshold: row.get(4)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Create a budget. Fails with Conflict if the category already has one.
    pub fn create_budget(&self, user_id: i64, budget: &NewBudget) -> Result<Budget> {
        budget.validate()?;
        let category = budget.category.trim().to_lowercase();

        let conn = self.conn()?;
        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM budgets WHERE user_id = ? AND category = ?",
                params![user_id, category],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(Error::Conflict(format!(
                "Budget for '{}' already exists",
                category
            )));
        }

        conn.execute(
            "INSERT INTO budgets (user_id, category, monthly_limit, alert_threshold) VALUES (?, ?, ?, ?)",
            params![user_id, category, budget.monthly_limit, budget.threshold()],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_budget(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Budget {}", id)))
    }

    pub fn list_budgets(&self, user_id: i64) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, category, monthly_limit, alert_threshold, created_at FROM budgets WHERE user_id = ? ORDER BY category",
        )?;
        let budgets = stmt
            .query_map(params![user_id], row_to_budget)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(budgets)
    }

    pub fn get_budget(&self, user_id: i64, id: i64) -> Result<Option<Budget>> {
        let conn = self.conn()?;
        let budget = conn
            .query_row(
                "SELECT id, user_id, category, monthly_limit, alert_threshold, created_at FROM budgets WHERE id = ? AND user_id = ?",
                params![id, user_id],
                row_to_budget,
            )
            .optional()?;
        Ok(budget)
    }

    pub fn update_budget(&self, user_id: i64, id: i64, update: &BudgetUpdate) -> Result<Budget> {
        let budget = self
            .get_budget(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Budget {}", id)))?;
        update.validate_against(&budget)?;

        let conn = self.conn()?;
        conn.execute(
            "UPDATE budgets SET monthly_limit = ?, alert_threshold = ? WHERE id = ?",
            params![
                update.monthly_limit.unwrap_or(budget.monthly_limit),
                update.alert_threshold.unwrap_or(budget.alert_threshold),
                id
            ],
        )?;
        drop(conn);

        self.get_budget(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Budget {}", id)))
    }

    pub fn delete_budget(&self, user_id: i64, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM budgets WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Budget {}", id)));
        }
        Ok(())
    }

    /// Spending against every budget for the month containing `month`
    ///
    /// Only debits count as spending; refunds in the category don't reduce it.
    pub fn budget_statuses(&self, user_id: i64, month: NaiveDate) -> Result<Vec<BudgetStatus>> {
        let (start, end) = month_bounds(month);
        let budgets = self.list_budgets(user_id)?;

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT COALESCE(SUM(-t.amount), 0)
            FROM transactions t
            JOIN accounts a ON a.id = t.account_id
            WHERE a.user_id = ? AND t.category = ? AND t.amount < 0
              AND t.date >= ? AND t.date < ?
            "#,
        )?;

        let mut statuses = Vec::with_capacity(budgets.len());
        for budget in budgets {
            let spent: f64 = stmt.query_row(
                params![
                    user_id,
                    budget.category,
                    start.format("%Y-%m-%d").to_string(),
                    end.format("%Y-%m-%d").to_string()
                ],
                |row| row.get(0),
            )?;
            statuses.push(BudgetStatus::new(budget, spent));
        }

        Ok(statuses)
    }
}
