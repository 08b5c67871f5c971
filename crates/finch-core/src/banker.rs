//! AI banker video conversations (Tavus)
//!
//! Finch only does the server half: it creates a conversation room seeded
//! with a summary of the user's finances and hands the URL to the browser.
//!
//! # Configuration
//!
//! - `TAVUS_API_KEY`: required, the banker is disabled without it
//! - `TAVUS_API_URL`: API base URL (default: https://tavusapi.com)
//! - `TAVUS_REPLICA_ID`, `TAVUS_PERSONA_ID`: which avatar and persona to use

use std::fmt::Write as _;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::BudgetAlert;

pub const DEFAULT_TAVUS_URL: &str = "https://tavusapi.com";

#[derive(Debug, Clone)]
pub struct BankerConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub replica_id: Option<String>,
    pub persona_id: Option<String>,
    pub timeout: Duration,
}

impl Default for BankerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_TAVUS_URL.to_string(),
            replica_id: None,
            persona_id: None,
            timeout: Duration::from_secs(20),
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl BankerConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            api_key: env_opt("TAVUS_API_KEY"),
            api_url: env_opt("TAVUS_API_URL").unwrap_or_else(|| DEFAULT_TAVUS_URL.to_string()),
            replica_id: env_opt("TAVUS_REPLICA_ID"),
            persona_id: env_opt("TAVUS_PERSONA_ID"),
            ..Default::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Debug, Serialize)]
struct CreateConversationRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    replica_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    persona_id: Option<&'a str>,
    conversation_name: &'a str,
    conversational_context: &'a str,
}

/// A created conversation room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: String,
    pub conversation_url: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Tavus conversation client
#[derive(Clone)]
pub struct BankerClient {
    client: Client,
    config: BankerConfig,
    api_key: String,
}

impl BankerClient {
    /// Fails with `NotConfigured` when no API key is set
    pub fn new(config: &BankerConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::NotConfigured("AI banker requires TAVUS_API_KEY".into()))?;

        Ok(Self {
            client: Client::builder().timeout(config.timeout).build()?,
            config: config.clone(),
            api_key,
        })
    }

    pub async fn create_conversation(&self, name: &str, context: &str) -> Result<Conversation> {
        let url = format!(
            "{}/v2/conversations",
            self.config.api_url.trim_end_matches('/')
        );
        let body = CreateConversationRequest {
            replica_id: self.config.replica_id.as_deref(),
            persona_id: self.config.persona_id.as_deref(),
            conversation_name: name,
            conversational_context: context,
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "Tavus returned {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let conversation: Conversation = response.json().await?;
        info!(conversation_id = %conversation.conversation_id, "Created banker conversation");
        Ok(conversation)
    }
}

/// Plain-text briefing the banker persona receives before the call
pub fn build_financial_context(db: &Database, user_id: i64, today: NaiveDate) -> Result<String> {
    let overview = db.account_overview(user_id)?;
    let summary = db.monthly_summary(user_id, today)?;
    let statuses = db.budget_statuses(user_id, today)?;
    let top = db.spending_by_category(user_id, today)?;

    let mut ctx = String::new();
    // Writing to a String can't fail
    let _ = writeln!(
        ctx,
        "The customer has {} linked accounts: ${:.2} in assets, ${:.2} in liabilities, net worth ${:.2}.",
        overview.account_count, overview.total_assets, overview.total_liabilities, overview.net_worth
    );
    let _ = writeln!(
        ctx,
        "This month ({}) they earned ${:.2} and spent ${:.2} (savings rate {:.1}%).",
        summary.month.format("%B %Y"),
        summary.income,
        summary.expenses,
        summary.savings_rate
    );

    if !top.is_empty() {
        let categories: Vec<String> = top
            .iter()
            .take(3)
            .map(|c| format!("{} ${:.2}", c.category, c.total))
            .collect();
        let _ = writeln!(ctx, "Largest spending categories: {}.", categories.join(", "));
    }

    for status in statuses.iter().filter(|s| s.alert != BudgetAlert::Ok) {
        let verb = match status.alert {
            BudgetAlert::Exceeded => "has exceeded",
            _ => "is close to",
        };
        let _ = writeln!(
            ctx,
            "The customer {} their {} budget: ${:.2} of ${:.2}.",
            verb, status.budget.category, status.spent, status.budget.monthly_limit
        );
    }

    ctx.push_str("Give friendly, practical advice. Do not recommend specific securities.");
    Ok(ctx)
}
