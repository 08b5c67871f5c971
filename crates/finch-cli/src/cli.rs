//! CLI argument definitions using clap
//!
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Finch - Personal finance dashboard
#[derive(Parser)]
#[command(name = "finch")]
#[command(about = "Personal finance dashboard: budgets, analytics and market picks", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "finch.db", global = true)]
    pub db: PathBuf,

    /// Act as this user (defaults to the local user)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Load demo accounts, transactions and budgets
    Seed,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// Every request acts as the local user.
        /// WARNING: Do not use this flag when exposing the server to a network.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing the built dashboard (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Seed demo data for the local user before starting
        #[arg(long)]
        demo: bool,
    },

    /// List accounts and balances
    Accounts,

    /// List transactions
    Transactions {
        /// Maximum number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Only this category
        #[arg(short, long)]
        category: Option<String>,

        /// Only this account ID
        #[arg(short, long)]
        account: Option<i64>,

        /// Match description or merchant
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Manage budgets
    Budgets {
        #[command(subcommand)]
        action: Option<BudgetsAction>,
    },

    /// Show income, expenses and top categories for a month
    Summary {
        /// Month (YYYY-MM), defaults to the current month
        #[arg(short, long)]
        month: Option<String>,

        /// Months of trend to show
        #[arg(long, default_value = "6")]
        trend: u32,
    },

    /// Market data and stock recommendations
    Market {
        #[command(subcommand)]
        action: MarketAction,
    },

    /// Export transactions to CSV
    Export {
        /// Output file (stdout if not given)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Talk to a running Finch server
    Remote {
        /// Server URL
        #[arg(long, default_value = "http://localhost:3000")]
        url: String,

        /// Session token (or set FINCH_TOKEN)
        #[arg(long)]
        token: Option<String>,

        #[command(subcommand)]
        action: RemoteAction,
    },
}

#[derive(Subcommand)]
pub enum BudgetsAction {
    /// List budgets
    List,

    /// Show spending against each budget
    Status {
        /// Month (YYYY-MM), defaults to the current month
        #[arg(short, long)]
        month: Option<String>,
    },

    /// Create a budget
    Add {
        /// Category to budget
        category: String,

        /// Monthly limit in dollars
        limit: f64,

        /// Warn at this fraction of the limit (0-1)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Delete a budget
    Delete {
        /// Budget ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum MarketAction {
    /// Rank the watchlist for a risk profile
    Recommend {
        /// Risk tolerance from 0 (conservative) to 1 (aggressive)
        #[arg(short, long, conflicts_with = "profile")]
        risk: Option<f64>,

        /// Named profile: conservative, moderate, aggressive
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Show a single quote
    Quote {
        /// Ticker symbol
        symbol: String,
    },

    /// Refresh watchlist quotes until interrupted
    Watch {
        /// Seconds between refreshes
        #[arg(short, long, default_value = "10")]
        interval: u64,

        /// Stop after this many refreshes
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Show crypto prices
    Crypto,
}

#[derive(Subcommand)]
pub enum RemoteAction {
    /// Log in and print a session token
    Login {
        /// Account email
        email: String,

        /// Password
        #[arg(long)]
        password: String,
    },

    /// Fetch recommendations from the server
    Recommendations {
        /// Risk tolerance from 0 to 1
        #[arg(short, long, default_value = "0.5")]
        risk: f64,
    },

    /// Fetch the monthly summary from the server
    Summary {
        /// Month (YYYY-MM)
        #[arg(short, long)]
        month: Option<String>,
    },
}
