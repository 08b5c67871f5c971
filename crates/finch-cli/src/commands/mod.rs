//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init, seed and shared utilities (open_db, resolve_user)
//! - `export` - Transaction CSV export
//! - `finance` - Accounts, transactions, budgets and the monthly summary
//! - `market` - Quotes, recommendations, watch loop and crypto
//! - `remote` - Commands that go through a running server's API
//! - `serve` - Web server command

pub mod core;
pub mod export;
pub mod finance;
pub mod market;
pub mod remote;
pub mod serve;

// Re-export command functions for main.rs
pub use core::*;
pub use export::*;
pub use finance::*;
pub use market::*;
pub use remote::*;
pub use serve::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Signed dollar amount, red for debits and green for credits
pub fn format_amount(amount: f64) -> String {
    if amount < 0.0 {
        format!("\x1b[31m-${:.2}\x1b[0m", amount.abs())
    } else {
        format!("\x1b[32m+${:.2}\x1b[0m", amount)
    }
}
