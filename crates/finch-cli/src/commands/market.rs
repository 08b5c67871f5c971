//! Market command implementations

use std::time::Duration;

use anyhow::{bail, Result};
use finch_core::market::{normalize_risk, validate_symbol};
use finch_core::market::scorer::DEFAULT_RISK_TOLERANCE;
use finch_core::{MarketAnalyzer, MarketSnapshot, RiskCategory, StockQuote, Watchlist};
use tokio::time::{interval, MissedTickBehavior};
use tracing::warn;

use super::truncate;

/// Live analyzer from the environment, or static quotes if providers can't be built
pub fn market_analyzer() -> MarketAnalyzer {
    match MarketAnalyzer::from_env() {
        Ok(analyzer) => analyzer,
        Err(e) => {
            warn!(error = %e, "Market providers unavailable, using static quotes");
            MarketAnalyzer::offline(Watchlist::default())
        }
    }
}

/// Resolve `--risk` / `--profile` into a tolerance in [0, 1]
pub fn resolve_risk(risk: Option<f64>, profile: Option<&str>) -> Result<f64> {
    if let Some(profile) = profile {
        return match profile.parse::<RiskCategory>() {
            Ok(category) => Ok(category.tolerance()),
            Err(e) => bail!(e),
        };
    }
    Ok(normalize_risk(risk.unwrap_or(DEFAULT_RISK_TOLERANCE)))
}

fn print_quote(quote: &StockQuote) {
    let change = if quote.change_percent < 0.0 {
        format!("\x1b[31m{:+.2}%\x1b[0m", quote.change_percent)
    } else {
        format!("\x1b[32m{:+.2}%\x1b[0m", quote.change_percent)
    };
    println!(
        "   {:<6} {:<24} ${:>10.2} {:>18}  [{}]",
        quote.symbol,
        truncate(&quote.name, 24),
        quote.price,
        change,
        quote.source
    );
}

pub async fn cmd_market_recommend(
    analyzer: &MarketAnalyzer,
    risk: Option<f64>,
    profile: Option<&str>,
) -> Result<()> {
    let risk = resolve_risk(risk, profile)?;
    let recs = analyzer.get_recommendations(risk).await;

    println!();
    println!("💡 Top picks for risk tolerance {:.2}", risk);
    println!("   ─────────────────────────────────────────────────────────────");

    for (rank, rec) in recs.iter().enumerate() {
        println!(
            "   {}. {:<6} {:<24} score {:>3}  {:<6}  ${:.2}",
            rank + 1,
            rec.symbol,
            truncate(&rec.name, 24),
            rec.score,
            rec.risk,
            rec.price
        );
        println!("      {}", rec.reasoning);
    }

    Ok(())
}

pub async fn cmd_market_quote(analyzer: &MarketAnalyzer, symbol: &str) -> Result<()> {
    let symbol = validate_symbol(symbol)?;

    let quote = analyzer.get_stock_quote(&symbol).await;
    println!();
    print_quote(&quote);
    println!("   Volume: {}", quote.volume);
    Ok(())
}

fn print_snapshot(snapshot: &MarketSnapshot) {
    println!();
    println!(
        "📈 Market at {}",
        snapshot.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("   ─────────────────────────────────────────────────────────────");
    for quote in &snapshot.quotes {
        print_quote(quote);
    }
}

/// Refresh the whole watchlist every `every_secs` until Ctrl+C or `count` rounds
pub async fn cmd_market_watch(
    analyzer: &MarketAnalyzer,
    every_secs: u64,
    count: Option<usize>,
) -> Result<()> {
    if every_secs == 0 {
        bail!("Interval must be at least one second");
    }

    let mut ticker = interval(Duration::from_secs(every_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut rounds = 0usize;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                print_snapshot(&analyzer.snapshot().await);
                rounds += 1;
                if count.is_some_and(|max| rounds >= max) {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Stopped after {} refreshes", rounds);
                return Ok(());
            }
        }
    }
}

pub async fn cmd_market_crypto(analyzer: &MarketAnalyzer) -> Result<()> {
    let quotes = analyzer.get_crypto_quotes().await;

    println!();
    println!("🪙 Crypto");
    println!("   ─────────────────────────────");
    for quote in quotes {
        println!(
            "   {:<5} {:<10} ${:>11.2} {:>+7.2}%  [{}]",
            quote.symbol, quote.name, quote.price_usd, quote.change_24h, quote.source
        );
    }

    Ok(())
}
