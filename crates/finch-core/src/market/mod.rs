//! Market data and the stock recommendation scorer
//!
//! `MarketAnalyzer` ranks a configured watchlist for a risk tolerance. For
//! each symbol it fetches a quote, RSI and news sentiment concurrently, each
//! through its own provider chain:
//!
//! - quotes: Yahoo Finance → Alpha Vantage (with key) → static table
//! - RSI: Alpha Vantage (with key) → Yahoo daily closes → random in [30, 70)
//! - sentiment: Alpha Vantage news (with key) → random in [0, 0.3)
//!
//! Provider failures are logged and replaced, never returned. Scoring itself
//! lives in `scorer` as pure functions.
//!
//! # Configuration
//!
//! Environment variables:
//! - `ALPHA_VANTAGE_API_KEY`: enables Alpha Vantage (optional)
//! - `ALPHA_VANTAGE_URL`, `YAHOO_FINANCE_URL`, `COINGECKO_URL`: base URL overrides
//!
//! The watchlist comes from `~/.local/share/finch/config/watchlist.toml` when
//! present, otherwise the embedded default.

mod crypto;
mod fallback;
pub mod indicators;
pub mod providers;
pub mod scorer;
pub mod watchlist;

pub use crypto::{CoinGecko, DEFAULT_COINGECKO_URL};
pub use fallback::{fallback_crypto, fallback_quote};
pub use providers::{
    AlphaVantage, IndicatorProvider, LiveQuote, QuoteProvider, SentimentProvider, YahooFinance,
};
pub use scorer::{
    calculate_ai_score, normalize_risk, risk_level, RiskCategory, RiskLevel, ScoreInput,
};
pub use watchlist::{Sector, Watchlist, WatchlistEntry};

use std::ops::Range;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Range used for RSI when no provider can supply one
const RANDOM_RSI: Range<f64> = 30.0..70.0;
/// Slightly bullish range used for sentiment when no provider can supply one
const RANDOM_SENTIMENT: Range<f64> = 0.0..0.3;

/// Longest ticker symbol accepted from users
pub const MAX_SYMBOL_LEN: usize = 12;

/// Trim and upper-case a user-supplied ticker, rejecting anything that
/// isn't a plausible symbol (letters, digits, `.`, `-`, `^`)
pub fn validate_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim();
    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^'));
    if !valid {
        return Err(Error::InvalidData(format!("Invalid symbol '{}'", symbol)));
    }
    Ok(symbol.to_uppercase())
}

/// Where a quote came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    Yahoo,
    AlphaVantage,
    #[serde(rename = "coingecko")]
    CoinGecko,
    Fallback,
}

impl QuoteSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo",
            Self::AlphaVantage => "alpha_vantage",
            Self::CoinGecko => "coingecko",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Latest price data for a stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub name: String,
    pub sector: Sector,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub source: QuoteSource,
}

/// A scored watchlist symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRecommendation {
    pub symbol: String,
    pub name: String,
    pub sector: Sector,
    pub price: f64,
    pub change_percent: f64,
    /// Composite score, 0 to 100
    pub score: u8,
    pub risk: RiskLevel,
    pub rsi: f64,
    pub sentiment: f64,
    pub reasoning: String,
    pub source: QuoteSource,
}

/// USD price for a tracked coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoQuote {
    /// CoinGecko id, e.g. "bitcoin"
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub price_usd: f64,
    pub change_24h: f64,
    pub source: QuoteSource,
}

/// Quotes for the whole watchlist at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub quotes: Vec<StockQuote>,
    pub updated_at: DateTime<Utc>,
}

/// Body of the recommendations endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub risk_tolerance: f64,
    pub recommendations: Vec<StockRecommendation>,
}

/// Provider endpoints and credentials
#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub yahoo_url: String,
    pub alpha_vantage_url: String,
    pub alpha_vantage_key: Option<String>,
    pub coingecko_url: String,
    /// Per-request timeout for every provider
    pub timeout: Duration,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            yahoo_url: providers::DEFAULT_YAHOO_URL.to_string(),
            alpha_vantage_url: providers::DEFAULT_ALPHA_VANTAGE_URL.to_string(),
            alpha_vantage_key: None,
            coingecko_url: DEFAULT_COINGECKO_URL.to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl MarketConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            yahoo_url: std::env::var("YAHOO_FINANCE_URL").unwrap_or(defaults.yahoo_url),
            alpha_vantage_url: std::env::var("ALPHA_VANTAGE_URL")
                .unwrap_or(defaults.alpha_vantage_url),
            alpha_vantage_key: std::env::var("ALPHA_VANTAGE_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            coingecko_url: std::env::var("COINGECKO_URL").unwrap_or(defaults.coingecko_url),
            timeout: defaults.timeout,
        }
    }

    /// Point every provider at one base URL (the mock provider server in tests)
    pub fn with_base_url(base_url: &str, alpha_vantage_key: Option<&str>) -> Self {
        Self {
            yahoo_url: base_url.to_string(),
            alpha_vantage_url: base_url.to_string(),
            alpha_vantage_key: alpha_vantage_key.map(String::from),
            coingecko_url: base_url.to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}

/// Scores the watchlist against live (or substitute) market data
pub struct MarketAnalyzer {
    watchlist: Watchlist,
    quote_providers: Vec<Arc<dyn QuoteProvider>>,
    indicator_providers: Vec<Arc<dyn IndicatorProvider>>,
    sentiment_provider: Option<Arc<dyn SentimentProvider>>,
    crypto: Option<CoinGecko>,
    rng: Mutex<StdRng>,
}

impl MarketAnalyzer {
    /// Build the provider chains from a config
    pub fn new(config: &MarketConfig, watchlist: Watchlist) -> Result<Self> {
        let yahoo = Arc::new(YahooFinance::new(&config.yahoo_url, config.timeout)?);
        let mut analyzer = Self::offline(watchlist);

        analyzer.quote_providers.push(yahoo.clone());

        if let Some(ref key) = config.alpha_vantage_key {
            let alpha = Arc::new(AlphaVantage::new(
                &config.alpha_vantage_url,
                key,
                config.timeout,
            )?);
            analyzer.quote_providers.push(alpha.clone());
            analyzer.indicator_providers.push(alpha.clone());
            analyzer.sentiment_provider = Some(alpha as Arc<dyn SentimentProvider>);
        }
        analyzer.indicator_providers.push(yahoo);

        analyzer.crypto = Some(CoinGecko::new(&config.coingecko_url, config.timeout)?);

        info!(
            symbols = analyzer.watchlist.len(),
            alpha_vantage = config.alpha_vantage_key.is_some(),
            "Market analyzer ready"
        );
        Ok(analyzer)
    }

    /// Create from environment variables and the configured watchlist
    pub fn from_env() -> Result<Self> {
        Self::new(&MarketConfig::from_env(), Watchlist::load()?)
    }

    /// No live providers: static quotes and randomized indicators only
    pub fn offline(watchlist: Watchlist) -> Self {
        Self {
            watchlist,
            quote_providers: Vec::new(),
            indicator_providers: Vec::new(),
            sentiment_provider: None,
            crypto: None,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Replace the provider chains (for testing)
    pub fn with_providers(
        mut self,
        quotes: Vec<Arc<dyn QuoteProvider>>,
        indicators: Vec<Arc<dyn IndicatorProvider>>,
        sentiment: Option<Arc<dyn SentimentProvider>>,
    ) -> Self {
        self.quote_providers = quotes;
        self.indicator_providers = indicators;
        self.sentiment_provider = sentiment;
        self
    }

    /// Make the randomized fallbacks reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn watchlist(&self) -> &Watchlist {
        &self.watchlist
    }

    fn random_in(&self, range: Range<f64>) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.random_range(range)
    }

    fn describe(&self, symbol: &str) -> (String, Sector) {
        match self.watchlist.get(symbol) {
            Some(entry) => (entry.name.clone(), entry.sector),
            None => (symbol.to_string(), Sector::Other),
        }
    }

    /// Latest quote, falling through providers to the static table
    pub async fn get_stock_quote(&self, symbol: &str) -> StockQuote {
        let symbol = symbol.trim().to_uppercase();

        for provider in &self.quote_providers {
            match provider.quote(&symbol).await {
                Ok(live) => {
                    let (name, sector) = self.describe(&symbol);
                    return StockQuote {
                        symbol,
                        name,
                        sector,
                        price: live.price,
                        change: live.change,
                        change_percent: live.change_percent,
                        volume: live.volume,
                        source: provider.source(),
                    };
                }
                Err(e) => {
                    warn!(symbol = %symbol, source = %provider.source(), error = %e, "Quote provider failed")
                }
            }
        }

        debug!(symbol = %symbol, "Using fallback quote");
        fallback_quote(&symbol)
    }

    /// 14-period RSI, randomized when no provider can supply it
    pub async fn get_rsi(&self, symbol: &str) -> f64 {
        let symbol = symbol.trim().to_uppercase();

        for provider in &self.indicator_providers {
            match provider.rsi(&symbol).await {
                Ok(rsi) if rsi.is_finite() => return rsi.clamp(0.0, 100.0),
                Ok(rsi) => {
                    warn!(symbol = %symbol, provider = provider.name(), rsi, "Discarding non-finite RSI")
                }
                Err(e) => {
                    warn!(symbol = %symbol, provider = provider.name(), error = %e, "RSI provider failed")
                }
            }
        }

        self.random_in(RANDOM_RSI)
    }

    /// News sentiment in [-1, 1], randomized (slightly bullish) when unavailable
    pub async fn get_sentiment(&self, symbol: &str) -> f64 {
        let symbol = symbol.trim().to_uppercase();

        if let Some(ref provider) = self.sentiment_provider {
            match provider.sentiment(&symbol).await {
                Ok(score) if score.is_finite() => return score.clamp(-1.0, 1.0),
                Ok(_) => warn!(symbol = %symbol, "Discarding non-finite sentiment"),
                Err(e) => {
                    warn!(symbol = %symbol, provider = provider.name(), error = %e, "Sentiment provider failed")
                }
            }
        }

        self.random_in(RANDOM_SENTIMENT)
    }

    /// Score one watchlist entry
    pub async fn analyze(&self, entry: &WatchlistEntry, risk_tolerance: f64) -> StockRecommendation {
        let risk = normalize_risk(risk_tolerance);
        let (quote, rsi, sentiment) = futures::join!(
            self.get_stock_quote(&entry.symbol),
            self.get_rsi(&entry.symbol),
            self.get_sentiment(&entry.symbol)
        );

        let input = ScoreInput {
            rsi,
            change_percent: quote.change_percent,
            sector: entry.sector,
        };
        let score = calculate_ai_score(&input, risk, sentiment);
        let level = risk_level(entry.sector, quote.change_percent);

        StockRecommendation {
            symbol: entry.symbol.clone(),
            name: entry.name.clone(),
            sector: entry.sector,
            price: quote.price,
            change_percent: quote.change_percent,
            score,
            risk: level,
            rsi,
            sentiment,
            reasoning: scorer::build_reasoning(&input, sentiment, risk, level),
            source: quote.source,
        }
    }

    /// Top watchlist symbols for a risk tolerance, best first
    ///
    /// Ties are broken by symbol so the ranking is stable.
    pub async fn get_recommendations(&self, risk_tolerance: f64) -> Vec<StockRecommendation> {
        let risk = normalize_risk(risk_tolerance);
        let mut scored = join_all(
            self.watchlist
                .entries()
                .iter()
                .map(|entry| self.analyze(entry, risk)),
        )
        .await;

        scored.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.symbol.cmp(&b.symbol)));
        scored.truncate(self.watchlist.top_n());

        debug!(risk, count = scored.len(), "Ranked watchlist");
        scored
    }

    /// Quotes for every watchlist symbol, in watchlist order
    pub async fn snapshot(&self) -> MarketSnapshot {
        let quotes = join_all(
            self.watchlist
                .entries()
                .iter()
                .map(|entry| self.get_stock_quote(&entry.symbol)),
        )
        .await;

        MarketSnapshot {
            quotes,
            updated_at: Utc::now(),
        }
    }

    /// Crypto prices, with static entries for any coin the API didn't return
    pub async fn get_crypto_quotes(&self) -> Vec<CryptoQuote> {
        let mut quotes = fallback_crypto();

        let Some(ref coingecko) = self.crypto else {
            return quotes;
        };

        match coingecko.quotes().await {
            Ok(live) => {
                for quote in quotes.iter_mut() {
                    if let Some(fresh) = live.iter().find(|l| l.id == quote.id) {
                        *quote = fresh.clone();
                    }
                }
            }
            Err(e) => warn!(error = %e, "CoinGecko failed, using fallback prices"),
        }

        quotes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::test_utils::{mock_price, MockProviderServer, MOCK_ALPHA_VANTAGE_KEY};
    use async_trait::async_trait;

    /// Quote provider returning the same move for every symbol
    struct FixedQuotes {
        change_percent: f64,
    }

    #[async_trait]
    impl QuoteProvider for FixedQuotes {
        fn source(&self) -> QuoteSource {
            QuoteSource::Yahoo
        }

        async fn quote(&self, _symbol: &str) -> Result<LiveQuote> {
            Ok(LiveQuote {
                price: 100.0,
                change: self.change_percent,
                change_percent: self.change_percent,
                volume: 1_000,
            })
        }
    }

    struct Failing;

    #[async_trait]
    impl QuoteProvider for Failing {
        fn source(&self) -> QuoteSource {
            QuoteSource::AlphaVantage
        }

        async fn quote(&self, _symbol: &str) -> Result<LiveQuote> {
            Err(Error::Provider("down".into()))
        }
    }

    #[async_trait]
    impl IndicatorProvider for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn rsi(&self, _symbol: &str) -> Result<f64> {
            Err(Error::Provider("down".into()))
        }
    }

    #[async_trait]
    impl SentimentProvider for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn sentiment(&self, _symbol: &str) -> Result<f64> {
            Err(Error::Provider("down".into()))
        }
    }

    struct FixedIndicators(f64);

    #[async_trait]
    impl IndicatorProvider for FixedIndicators {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn rsi(&self, _symbol: &str) -> Result<f64> {
            Ok(self.0)
        }
    }

    #[async_trait]
    impl SentimentProvider for FixedIndicators {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn sentiment(&self, _symbol: &str) -> Result<f64> {
            Ok(self.0)
        }
    }

    fn offline() -> MarketAnalyzer {
        MarketAnalyzer::offline(Watchlist::embedded()).with_seed(7)
    }

    #[tokio::test]
    async fn test_quote_falls_back_to_table() {
        let analyzer = offline().with_providers(vec![Arc::new(Failing)], vec![], None);

        let quote = analyzer.get_stock_quote("msft").await;
        assert_eq!(quote.symbol, "MSFT");
        assert_eq!(quote.source, QuoteSource::Fallback);

        let unknown = analyzer.get_stock_quote("NOPE").await;
        assert_eq!(unknown.symbol, "AAPL");
    }

    #[tokio::test]
    async fn test_quote_uses_first_working_provider() {
        let analyzer = offline().with_providers(
            vec![Arc::new(Failing), Arc::new(FixedQuotes { change_percent: 2.0 })],
            vec![],
            None,
        );
        let quote = analyzer.get_stock_quote("NVDA").await;
        assert_eq!(quote.source, QuoteSource::Yahoo);
        assert_eq!(quote.price, 100.0);
        assert_eq!(quote.sector, Sector::Technology);
        assert_eq!(quote.name, "NVIDIA Corporation");

        // Off-watchlist symbols keep their ticker as the name
        let other = analyzer.get_stock_quote("IBM").await;
        assert_eq!(other.name, "IBM");
        assert_eq!(other.sector, Sector::Other);
    }

    #[tokio::test]
    async fn test_random_fallbacks_stay_in_range() {
        let analyzer = offline().with_providers(
            vec![],
            vec![Arc::new(Failing)],
            Some(Arc::new(Failing)),
        );
        for _ in 0..50 {
            let rsi = analyzer.get_rsi("AAPL").await;
            assert!((30.0..70.0).contains(&rsi));
            let sentiment = analyzer.get_sentiment("AAPL").await;
            assert!((0.0..0.3).contains(&sentiment));
        }
    }

    #[tokio::test]
    async fn test_seeded_fallbacks_are_reproducible() {
        let a = offline().with_seed(42);
        let b = offline().with_seed(42);
        assert_eq!(a.get_rsi("KO").await, b.get_rsi("KO").await);
        assert_eq!(a.get_sentiment("KO").await, b.get_sentiment("KO").await);
    }

    #[tokio::test]
    async fn test_recommendations_sorted_and_truncated() {
        let analyzer = offline();
        let recs = analyzer.get_recommendations(0.5).await;
        assert_eq!(recs.len(), 5);
        for pair in recs.windows(2) {
            assert!(
                pair[0].score > pair[1].score
                    || (pair[0].score == pair[1].score && pair[0].symbol < pair[1].symbol)
            );
        }
        assert!(recs.iter().all(|r| r.score <= 100));
    }

    #[tokio::test]
    async fn test_risk_profile_moves_tech_rankings() {
        let build = || {
            offline().with_providers(
                vec![Arc::new(FixedQuotes { change_percent: 0.5 })],
                vec![Arc::new(FixedIndicators(50.0))],
                Some(Arc::new(FixedIndicators(0.1))),
            )
        };

        let aggressive = build().get_recommendations(0.9).await;
        let conservative = build().get_recommendations(0.1).await;

        // Every input is identical, so only the sector adjustment separates symbols
        assert!(aggressive.iter().all(|r| r.sector.is_high_beta()));
        assert!(conservative.iter().all(|r| !r.sector.is_high_beta()));
        assert_eq!(aggressive[0].score, 77);
        assert_eq!(conservative[0].score, 67);

        let tech_low = build()
            .analyze(Watchlist::embedded().get("AAPL").unwrap(), 0.2)
            .await;
        let tech_high = build()
            .analyze(Watchlist::embedded().get("AAPL").unwrap(), 0.8)
            .await;
        assert!(tech_low.score < tech_high.score);
        assert_eq!(tech_high.risk, RiskLevel::High);
    }

    #[tokio::test]
    async fn test_offline_crypto_uses_fallback() {
        let quotes = offline().get_crypto_quotes().await;
        assert_eq!(quotes.len(), 4);
        assert!(quotes.iter().all(|q| q.source == QuoteSource::Fallback));
    }

    #[tokio::test]
    async fn test_snapshot_covers_watchlist() {
        let snapshot = offline().snapshot().await;
        assert_eq!(snapshot.quotes.len(), 20);
        assert_eq!(snapshot.quotes[0].symbol, "AAPL");
    }

    #[tokio::test]
    async fn test_yahoo_chain_without_key() {
        let server = MockProviderServer::start().await;
        let analyzer = MarketAnalyzer::new(
            &MarketConfig::with_base_url(&server.url(), None),
            Watchlist::embedded(),
        )
        .unwrap()
        .with_seed(1);

        let quote = analyzer.get_stock_quote("aapl").await;
        assert_eq!(quote.source, QuoteSource::Yahoo);
        assert_eq!(quote.price, mock_price("AAPL"));
        // Daily move against the prior session, not the start of the range
        assert!((quote.change - 1.0).abs() < 1e-9);
        let expected_pct = 1.0 / (mock_price("AAPL") - 1.0) * 100.0;
        assert!((quote.change_percent - expected_pct).abs() < 1e-9);
        assert_eq!(quote.volume, 1_000_000);

        // Computed from alternating closes
        let rsi = analyzer.get_rsi("AAPL").await;
        assert!((40.0..=60.0).contains(&rsi), "rsi was {}", rsi);

        let sentiment = analyzer.get_sentiment("AAPL").await;
        assert!((0.0..0.3).contains(&sentiment));
    }

    #[tokio::test]
    async fn test_alpha_vantage_chain_with_key() {
        let server = MockProviderServer::start().await;
        let analyzer = MarketAnalyzer::new(
            &MarketConfig::with_base_url(&server.url(), Some(MOCK_ALPHA_VANTAGE_KEY)),
            Watchlist::embedded(),
        )
        .unwrap();

        assert_eq!(analyzer.get_rsi("MSFT").await, 55.5);
        assert!((analyzer.get_sentiment("MSFT").await - 0.3).abs() < 1e-9);

        // Yahoo doesn't know this symbol, Alpha Vantage does
        let quote = analyzer.get_stock_quote("UNKNOWN").await;
        assert_eq!(quote.source, QuoteSource::AlphaVantage);
        assert_eq!(quote.price, mock_price("UNKNOWN") + 0.5);
        assert!((quote.change_percent + 1.9608).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failing_providers_fall_back() {
        let server = MockProviderServer::start().await;
        server.set_failing(true);
        let analyzer = MarketAnalyzer::new(
            &MarketConfig::with_base_url(&server.url(), Some(MOCK_ALPHA_VANTAGE_KEY)),
            Watchlist::embedded(),
        )
        .unwrap()
        .with_seed(3);

        let quote = analyzer.get_stock_quote("JPM").await;
        assert_eq!(quote, fallback_quote("JPM"));

        let rsi = analyzer.get_rsi("JPM").await;
        assert!((30.0..70.0).contains(&rsi));

        let recs = analyzer.get_recommendations(0.5).await;
        assert_eq!(recs.len(), 5);
        assert!(recs.iter().all(|r| r.source == QuoteSource::Fallback));

        let coins = analyzer.get_crypto_quotes().await;
        assert!(coins.iter().all(|c| c.source == QuoteSource::Fallback));
    }

    #[tokio::test]
    async fn test_crypto_merges_live_and_fallback() {
        let server = MockProviderServer::start().await;
        let analyzer = MarketAnalyzer::new(
            &MarketConfig::with_base_url(&server.url(), None),
            Watchlist::embedded(),
        )
        .unwrap();

        let coins = analyzer.get_crypto_quotes().await;
        assert_eq!(coins.len(), 4);
        assert_eq!(coins[0].id, "bitcoin");
        assert_eq!(coins[0].price_usd, 70000.0);
        assert_eq!(coins[0].source, QuoteSource::CoinGecko);

        // The mock omits cardano
        let cardano = coins.iter().find(|c| c.id == "cardano").unwrap();
        assert_eq!(cardano.source, QuoteSource::Fallback);
    }

    #[test]
    fn test_validate_symbol() {
        assert_eq!(validate_symbol(" brk.b ").unwrap(), "BRK.B");
        assert_eq!(validate_symbol("^gspc").unwrap(), "^GSPC");
        assert!(matches!(validate_symbol(""), Err(Error::InvalidData(_))));
        assert!(validate_symbol("DROP TABLE").is_err());
        assert!(validate_symbol("AAPL/../v7").is_err());
        assert!(validate_symbol("ABCDEFGHIJKLM").is_err());
    }

    #[tokio::test]
    async fn test_recommendations_capped_by_oversized_top_n() {
        let entries = Watchlist::embedded().entries().to_vec();
        let analyzer = MarketAnalyzer::offline(Watchlist::from_entries(entries, 12)).with_seed(3);

        let recs = analyzer.get_recommendations(0.5).await;
        assert_eq!(recs.len(), 5);
    }

    #[test]
    fn test_quote_source_serialization() {
        assert_eq!(
            serde_json::to_string(&QuoteSource::CoinGecko).unwrap(),
            "\"coingecko\""
        );
        assert_eq!(
            serde_json::to_string(&QuoteSource::AlphaVantage).unwrap(),
            "\"alpha_vantage\""
        );
    }
}
