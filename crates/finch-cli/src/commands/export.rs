//! Export command implementation

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use finch_core::db::Database;
use finch_core::TransactionExportOptions;

use super::resolve_user;

fn parse_date(value: Option<&str>, name: &str) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("Invalid {} date '{}' (use YYYY-MM-DD)", name, s))
        })
        .transpose()
}

pub fn cmd_export(
    db: &Database,
    email: Option<&str>,
    output: Option<&Path>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<()> {
    let user = resolve_user(db, email)?;
    let opts = TransactionExportOptions {
        from: parse_date(from, "from")?,
        to: parse_date(to, "to")?,
    };

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let count = db
                .write_transactions_csv(user.id, &opts, BufWriter::new(file))
                .context("Failed to export transactions")?;
            println!("✅ Exported {} transactions to {}", count, path.display());
        }
        None => {
            db.write_transactions_csv(user.id, &opts, std::io::stdout().lock())
                .context("Failed to export transactions")?;
        }
    }

    Ok(())
}
