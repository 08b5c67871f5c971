//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `resolve_user` - The user a command acts as
//! - `cmd_init` - Initialize the database
//! - `cmd_seed` - Load demo data

use std::path::Path;

use anyhow::{Context, Result};
use finch_core::db::Database;
use finch_core::models::User;

pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

/// The `--user` account if given, otherwise the local user
pub fn resolve_user(db: &Database, email: Option<&str>) -> Result<User> {
    match email {
        Some(email) => db
            .get_user_by_email(email)?
            .with_context(|| format!("No user with email {}", email)),
        None => db
            .ensure_local_user()
            .context("Failed to load the local user"),
    }
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;
    let user = db
        .ensure_local_user()
        .context("Failed to create the local user")?;
    println!("   Local user: {}", user.email);

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Load demo data: finch seed");
    println!("  2. Start web UI: finch serve");

    Ok(())
}

pub fn cmd_seed(db: &Database, email: Option<&str>) -> Result<()> {
    let user = resolve_user(db, email)?;
    println!("🌱 Seeding demo data for {}...", user.email);

    let result = db
        .seed_demo_data(user.id)
        .context("Failed to seed demo data")?;

    if result.skipped {
        println!("   User already has accounts, nothing loaded");
        return Ok(());
    }

    println!("   Accounts:     {}", result.accounts);
    println!("   Transactions: {}", result.transactions);
    println!("   Budgets:      {}", result.budgets);
    println!("✅ Demo data loaded");

    Ok(())
}
