//! Accounts, transactions, budgets and the monthly summary

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use finch_core::db::{parse_month, Database};
use finch_core::models::{BudgetAlert, NewBudget, TransactionFilter};

use super::{format_amount, resolve_user, truncate};

/// `YYYY-MM` month, or the current month
pub fn month_or_current(month: Option<&str>) -> Result<NaiveDate> {
    match month {
        Some(month) => parse_month(month).context("Invalid month (use YYYY-MM)"),
        None => Ok(Utc::now().date_naive()),
    }
}

pub fn cmd_accounts(db: &Database, email: Option<&str>) -> Result<()> {
    let user = resolve_user(db, email)?;
    let accounts = db.list_accounts(user.id)?;

    if accounts.is_empty() {
        println!("No accounts found. Load demo data with:");
        println!("  finch seed");
        return Ok(());
    }

    println!();
    println!("📁 Accounts");
    println!("   ─────────────────────────────────────────────────────────────");

    for account in &accounts {
        let linked = if account.external_id.is_some() { " 🔗" } else { "" };
        println!(
            "   [{}] {:<28} │ {:<10} │ {:>12}{}",
            account.id,
            truncate(&format!("{} {}", account.institution, account.name), 28),
            account.account_type,
            format!("${:.2}", account.current_balance),
            linked
        );
    }

    let overview = db.account_overview(user.id)?;
    println!();
    println!("   Assets:      ${:.2}", overview.total_assets);
    println!("   Liabilities: ${:.2}", overview.total_liabilities);
    println!("   Net worth:   ${:.2}", overview.net_worth);

    Ok(())
}

pub fn cmd_transactions(
    db: &Database,
    email: Option<&str>,
    limit: i64,
    category: Option<String>,
    account_id: Option<i64>,
    search: Option<String>,
) -> Result<()> {
    let user = resolve_user(db, email)?;
    let filter = TransactionFilter {
        account_id,
        category,
        search,
        limit: limit.max(1),
        ..Default::default()
    };
    let transactions = db.list_transactions(user.id, &filter)?;

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    let total = db.count_transactions(user.id, &filter)?;

    println!();
    println!(
        "📝 Transactions (showing {} of {})",
        transactions.len(),
        total
    );
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        println!(
            "   [{}] {} │ {:>20} │ {:<14} │ {}",
            tx.id,
            tx.date,
            format_amount(tx.amount),
            truncate(&tx.category, 14),
            truncate(tx.display_merchant(), 35)
        );
    }

    Ok(())
}

pub fn cmd_budgets_list(db: &Database, email: Option<&str>) -> Result<()> {
    let user = resolve_user(db, email)?;
    let budgets = db.list_budgets(user.id)?;

    if budgets.is_empty() {
        println!("No budgets. Create one with:");
        println!("  finch budgets add groceries 400");
        return Ok(());
    }

    println!();
    println!("🎯 Budgets");
    println!("   ─────────────────────────────");

    for budget in budgets {
        println!(
            "   [{}] {:<16} ${:>9.2}/mo  (warn at {:.0}%)",
            budget.id,
            budget.category,
            budget.monthly_limit,
            budget.alert_threshold * 100.0
        );
    }

    Ok(())
}

pub fn cmd_budgets_status(db: &Database, email: Option<&str>, month: Option<&str>) -> Result<()> {
    let user = resolve_user(db, email)?;
    let month = month_or_current(month)?;
    let statuses = db.budget_statuses(user.id, month)?;

    if statuses.is_empty() {
        println!("No budgets.");
        return Ok(());
    }

    println!();
    println!("🎯 Budget status for {}", month.format("%B %Y"));
    println!("   ─────────────────────────────────────────────────");

    for status in statuses {
        let icon = match status.alert {
            BudgetAlert::Ok => "✅",
            BudgetAlert::Warning => "⚠️ ",
            BudgetAlert::Exceeded => "🚨",
        };
        println!(
            "   {} {:<16} ${:>9.2} of ${:>9.2}  ({:.0}%)",
            icon,
            status.budget.category,
            status.spent,
            status.budget.monthly_limit,
            status.percent_used
        );
    }

    Ok(())
}

pub fn cmd_budgets_add(
    db: &Database,
    email: Option<&str>,
    category: &str,
    limit: f64,
    threshold: Option<f64>,
) -> Result<()> {
    let user = resolve_user(db, email)?;
    let budget = db
        .create_budget(
            user.id,
            &NewBudget {
                category: category.to_string(),
                monthly_limit: limit,
                alert_threshold: threshold,
            },
        )
        .context("Failed to create budget")?;

    println!(
        "✅ Budget {} created: {} ${:.2}/mo",
        budget.id, budget.category, budget.monthly_limit
    );
    Ok(())
}

pub fn cmd_budgets_delete(db: &Database, email: Option<&str>, id: i64) -> Result<()> {
    let user = resolve_user(db, email)?;
    db.delete_budget(user.id, id)
        .with_context(|| format!("Failed to delete budget {}", id))?;
    println!("🗑️  Budget {} deleted", id);
    Ok(())
}

pub fn cmd_summary(
    db: &Database,
    email: Option<&str>,
    month: Option<&str>,
    trend_months: u32,
) -> Result<()> {
    let user = resolve_user(db, email)?;
    let month = month_or_current(month)?;
    let summary = db.monthly_summary(user.id, month)?;

    println!();
    println!("📊 {}", summary.month.format("%B %Y"));
    println!("   ─────────────────────────────");
    println!("   Income:       ${:.2}", summary.income);
    println!("   Expenses:     ${:.2}", summary.expenses);
    println!("   Net:          {}", format_amount(summary.net));
    println!("   Savings rate: {:.1}%", summary.savings_rate);
    println!("   Transactions: {}", summary.transaction_count);

    let categories = db.spending_by_category(user.id, month)?;
    if !categories.is_empty() {
        println!();
        println!("   By category:");
        for cat in categories.iter().take(8) {
            println!(
                "     {:<16} ${:>9.2}  {:>5.1}%",
                cat.category, cat.total, cat.percentage
            );
        }
    }

    let merchants = db.top_merchants(user.id, month, 5)?;
    if !merchants.is_empty() {
        println!();
        println!("   Top merchants:");
        for m in merchants {
            println!("     {:<24} ${:>9.2}", truncate(&m.merchant, 24), m.total);
        }
    }

    if trend_months > 1 {
        let trend = db.monthly_trend(user.id, month, trend_months.min(24))?;
        println!();
        println!("   Trend:");
        for m in trend {
            println!(
                "     {}  in ${:>9.2}  out ${:>9.2}",
                m.month.format("%Y-%m"),
                m.income,
                m.expenses
            );
        }
    }

    Ok(())
}
