//! Finch CLI - Personal finance dashboard
//!
//! Usage:
//!   finch init                    Initialize database
//!   finch seed                    Load demo data
//!   finch serve --port 3000       Start web server
//!   finch market recommend -r 0.7 Rank the watchlist

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let user = cli.user.as_deref();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Seed => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_seed(&db, user)
        }
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
            demo,
        } => commands::cmd_serve(&cli.db, &host, port, no_auth, static_dir.as_deref(), demo).await,
        Commands::Accounts => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_accounts(&db, user)
        }
        Commands::Transactions {
            limit,
            category,
            account,
            search,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_transactions(&db, user, limit, category, account, search)
        }
        Commands::Budgets { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(BudgetsAction::List) => commands::cmd_budgets_list(&db, user),
                Some(BudgetsAction::Status { month }) => {
                    commands::cmd_budgets_status(&db, user, month.as_deref())
                }
                Some(BudgetsAction::Add {
                    category,
                    limit,
                    threshold,
                }) => commands::cmd_budgets_add(&db, user, &category, limit, threshold),
                Some(BudgetsAction::Delete { id }) => commands::cmd_budgets_delete(&db, user, id),
            }
        }
        Commands::Summary { month, trend } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_summary(&db, user, month.as_deref(), trend)
        }
        Commands::Market { action } => {
            let analyzer = commands::market_analyzer();
            match action {
                MarketAction::Recommend { risk, profile } => {
                    commands::cmd_market_recommend(&analyzer, risk, profile.as_deref()).await
                }
                MarketAction::Quote { symbol } => {
                    commands::cmd_market_quote(&analyzer, &symbol).await
                }
                MarketAction::Watch { interval, count } => {
                    commands::cmd_market_watch(&analyzer, interval, count).await
                }
                MarketAction::Crypto => commands::cmd_market_crypto(&analyzer).await,
            }
        }
        Commands::Export { output, from, to } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_export(&db, user, output.as_deref(), from.as_deref(), to.as_deref())
        }
        Commands::Remote { url, token, action } => {
            let token = token.or_else(|| std::env::var("FINCH_TOKEN").ok());
            let client = commands::remote_client(&url, token)?;
            match action {
                RemoteAction::Login { email, password } => {
                    commands::cmd_remote_login(&client, &email, &password).await
                }
                RemoteAction::Recommendations { risk } => {
                    commands::cmd_remote_recommendations(&client, risk).await
                }
                RemoteAction::Summary { month } => {
                    commands::cmd_remote_summary(&client, month.as_deref()).await
                }
            }
        }
    }
}
