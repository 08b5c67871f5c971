//! Commands that go through a running server's REST API

use anyhow::{Context, Result};
use finch_core::FinchClient;

pub fn remote_client(url: &str, token: Option<String>) -> Result<FinchClient> {
    let client = FinchClient::new(url).context("Failed to build API client")?;
    Ok(match token {
        Some(token) => client.with_token(token),
        None => client,
    })
}

pub async fn cmd_remote_login(client: &FinchClient, email: &str, password: &str) -> Result<()> {
    let auth = client
        .login(email, password)
        .await
        .context("Login failed")?;

    println!("✅ Logged in as {} <{}>", auth.user.name, auth.user.email);
    println!();
    println!("   export FINCH_TOKEN={}", auth.token);
    Ok(())
}

pub async fn cmd_remote_recommendations(client: &FinchClient, risk: f64) -> Result<()> {
    let response = client
        .recommendations(risk)
        .await
        .context("Failed to fetch recommendations")?;

    println!();
    println!(
        "💡 Server picks for risk tolerance {:.2}",
        response.risk_tolerance
    );
    for rec in response.recommendations {
        println!(
            "   {:<6} score {:>3}  {:<6}  ${:.2}  [{}]",
            rec.symbol, rec.score, rec.risk, rec.price, rec.source
        );
    }
    Ok(())
}

pub async fn cmd_remote_summary(client: &FinchClient, month: Option<&str>) -> Result<()> {
    let summary = client
        .summary(month)
        .await
        .context("Failed to fetch summary")?;

    let s = &summary.summary;
    println!();
    println!("📊 {}", s.month.format("%B %Y"));
    println!("   Income:   ${:.2}", s.income);
    println!("   Expenses: ${:.2}", s.expenses);
    println!("   Net:      ${:.2}", s.net);
    for cat in summary.categories.iter().take(5) {
        println!("     {:<16} ${:>9.2}", cat.category, cat.total);
    }
    Ok(())
}
