//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    static_dir: Option<&Path>,
    demo: bool,
) -> Result<()> {
    println!("🚀 Starting Finch web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    let mut config = finch_server::ServerConfig::from_env();
    config.require_auth = !no_auth;

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        println!("   🔒 Authentication: bearer sessions (/api/auth/login)");
    }
    if !config.allowed_origins.is_empty() {
        println!(
            "   🌐 Allowed origins: {} (FINCH_ALLOWED_ORIGINS)",
            config.allowed_origins.join(", ")
        );
    }
    match config.market_refresh {
        Some(every) => println!("   📈 Market refresh: every {}s", every.as_secs()),
        None => println!("   📈 Market refresh: disabled"),
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path)?;

    if demo {
        let user = db
            .ensure_local_user()
            .context("Failed to create the local user")?;
        let seeded = db
            .seed_demo_data(user.id)
            .context("Failed to seed demo data")?;
        if !seeded.skipped {
            println!(
                "   🌱 Demo data: {} accounts, {} transactions",
                seeded.accounts, seeded.transactions
            );
        }
    }

    let static_dir_str = match static_dir {
        Some(dir) => Some(
            dir.to_str()
                .context("Static directory path must be valid UTF-8")?,
        ),
        None => None,
    };
    finch_server::serve_with_config(db, host, port, static_dir_str, config).await?;

    Ok(())
}
