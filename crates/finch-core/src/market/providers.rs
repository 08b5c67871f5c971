//! Live market data providers
//!
//! Each data concern has a trait so the analyzer can try providers in order
//! and tests can swap in the mock server:
//!
//! - `QuoteProvider`: last price, change and volume
//! - `IndicatorProvider`: RSI
//! - `SentimentProvider`: news sentiment score in [-1, 1]
//!
//! Yahoo Finance needs no key and backs quotes and RSI (computed from daily
//! closes). Alpha Vantage needs a key and backs all three.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::indicators::{calculate_rsi, RSI_PERIOD};
use super::QuoteSource;
use crate::error::{Error, Result};

pub const DEFAULT_YAHOO_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_ALPHA_VANTAGE_URL: &str = "https://www.alphavantage.co";

/// Price data returned by a live provider, before watchlist metadata is attached
#[derive(Debug, Clone, PartialEq)]
pub struct LiveQuote {
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn source(&self) -> QuoteSource;

    async fn quote(&self, symbol: &str) -> Result<LiveQuote>;
}

#[async_trait]
pub trait IndicatorProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Latest 14-period daily RSI
    async fn rsi(&self, symbol: &str) -> Result<f64>;
}

#[async_trait]
pub trait SentimentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Average news sentiment for the ticker, in [-1, 1]
    async fn sentiment(&self, symbol: &str) -> Result<f64>;
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(concat!("finch/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

// ----------------------------------------------------------------------------
// Yahoo Finance
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    regular_market_volume: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Second-to-last non-null daily close
fn previous_session_close(indicators: Option<ChartIndicators>) -> Option<f64> {
    let closes: Vec<f64> = indicators?
        .quote
        .into_iter()
        .next()?
        .close
        .into_iter()
        .flatten()
        .collect();
    closes.len().checked_sub(2).map(|i| closes[i])
}

/// Yahoo Finance chart API (no key required)
#[derive(Clone)]
pub struct YahooFinance {
    client: Client,
    base_url: String,
}

impl YahooFinance {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn chart(&self, symbol: &str, range: &str) -> Result<ChartResult> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let response: ChartResponse = self
            .client
            .get(&url)
            .query(&[("interval", "1d"), ("range", range)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.chart.error.filter(|e| !e.is_null()) {
            return Err(Error::Provider(format!("Yahoo chart error: {}", error)));
        }

        response
            .chart
            .result
            .and_then(|mut results| results.pop())
            .ok_or_else(|| Error::Provider(format!("Yahoo returned no chart for {}", symbol)))
    }
}

#[async_trait]
impl QuoteProvider for YahooFinance {
    fn source(&self) -> QuoteSource {
        QuoteSource::Yahoo
    }

    async fn quote(&self, symbol: &str) -> Result<LiveQuote> {
        let chart = self.chart(symbol, "5d").await?;
        let meta = chart.meta;

        let price = meta
            .regular_market_price
            .ok_or_else(|| Error::Provider(format!("Yahoo returned no price for {}", symbol)))?;
        // chartPreviousClose is the close before the whole range, so take the
        // prior session from the daily closes instead
        let previous = previous_session_close(chart.indicators)
            .or(meta.previous_close)
            .unwrap_or(price);

        let change = price - previous;
        let change_percent = if previous != 0.0 {
            change / previous * 100.0
        } else {
            0.0
        };

        debug!(symbol, price, "Yahoo quote");
        Ok(LiveQuote {
            price,
            change,
            change_percent,
            volume: meta.regular_market_volume.unwrap_or(0),
        })
    }
}

#[async_trait]
impl IndicatorProvider for YahooFinance {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn rsi(&self, symbol: &str) -> Result<f64> {
        let chart = self.chart(symbol, "3mo").await?;
        let closes: Vec<f64> = chart
            .indicators
            .and_then(|i| i.quote.into_iter().next())
            .map(|q| q.close.into_iter().flatten().collect())
            .unwrap_or_default();

        calculate_rsi(&closes, RSI_PERIOD).ok_or_else(|| {
            Error::Provider(format!(
                "Not enough price history for {} ({} closes)",
                symbol,
                closes.len()
            ))
        })
    }
}

// ----------------------------------------------------------------------------
// Alpha Vantage
// ----------------------------------------------------------------------------

/// Rate-limit and error notices Alpha Vantage returns with HTTP 200
#[derive(Debug, Default, Deserialize)]
struct Notices {
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

impl Notices {
    fn check(&self) -> Result<()> {
        match self
            .error_message
            .as_ref()
            .or(self.note.as_ref())
            .or(self.information.as_ref())
        {
            Some(msg) => Err(Error::Provider(format!("Alpha Vantage: {}", msg))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(flatten)]
    notices: Notices,
    #[serde(rename = "Global Quote")]
    quote: Option<GlobalQuote>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RsiResponse {
    #[serde(flatten)]
    notices: Notices,
    #[serde(rename = "Technical Analysis: RSI", default)]
    values: BTreeMap<String, HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(flatten)]
    notices: Notices,
    #[serde(default)]
    feed: Vec<NewsItem>,
}

#[derive(Debug, Deserialize)]
struct NewsItem {
    #[serde(default)]
    ticker_sentiment: Vec<TickerSentiment>,
}

#[derive(Debug, Deserialize)]
struct TickerSentiment {
    ticker: String,
    ticker_sentiment_score: String,
}

fn parse_number(field: &str, value: Option<&str>) -> Result<f64> {
    value
        .map(|v| v.trim().trim_end_matches('%'))
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::Provider(format!("Alpha Vantage returned no {}", field)))
}

/// Alpha Vantage REST API (requires a key)
#[derive(Clone)]
pub struct AlphaVantage {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantage {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::NotConfigured("ALPHA_VANTAGE_API_KEY".into()));
        }
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
        })
    }

    async fn query<T: serde::de::DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/query", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantage {
    fn source(&self) -> QuoteSource {
        QuoteSource::AlphaVantage
    }

    async fn quote(&self, symbol: &str) -> Result<LiveQuote> {
        let response: GlobalQuoteResponse = self
            .query(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)])
            .await?;
        response.notices.check()?;

        let quote = response
            .quote
            .ok_or_else(|| Error::Provider(format!("Alpha Vantage has no quote for {}", symbol)))?;

        let price = parse_number("price", quote.price.as_deref())?;
        let change = parse_number("change", quote.change.as_deref()).unwrap_or(0.0);
        let change_percent =
            parse_number("change percent", quote.change_percent.as_deref()).unwrap_or(0.0);
        let volume = quote
            .volume
            .as_deref()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);

        debug!(symbol, price, "Alpha Vantage quote");
        Ok(LiveQuote {
            price,
            change,
            change_percent,
            volume,
        })
    }
}

#[async_trait]
impl IndicatorProvider for AlphaVantage {
    fn name(&self) -> &'static str {
        "alpha_vantage"
    }

    async fn rsi(&self, symbol: &str) -> Result<f64> {
        let period = RSI_PERIOD.to_string();
        let response: RsiResponse = self
            .query(&[
                ("function", "RSI"),
                ("symbol", symbol),
                ("interval", "daily"),
                ("time_period", period.as_str()),
                ("series_type", "close"),
            ])
            .await?;
        response.notices.check()?;

        // ISO dates sort chronologically, so the last key is the latest reading
        let latest = response
            .values
            .values()
            .next_back()
            .and_then(|v| v.get("RSI"))
            .map(String::as_str);
        parse_number("RSI", latest)
    }
}

#[async_trait]
impl SentimentProvider for AlphaVantage {
    fn name(&self) -> &'static str {
        "alpha_vantage"
    }

    async fn sentiment(&self, symbol: &str) -> Result<f64> {
        let response: NewsResponse = self
            .query(&[
                ("function", "NEWS_SENTIMENT"),
                ("tickers", symbol),
                ("limit", "50"),
            ])
            .await?;
        response.notices.check()?;

        let scores: Vec<f64> = response
            .feed
            .iter()
            .flat_map(|item| &item.ticker_sentiment)
            .filter(|t| t.ticker.eq_ignore_ascii_case(symbol))
            .filter_map(|t| t.ticker_sentiment_score.trim().parse::<f64>().ok())
            .filter(|s| s.is_finite())
            .collect();

        if scores.is_empty() {
            return Err(Error::Provider(format!("No news sentiment for {}", symbol)));
        }

        let average = scores.iter().sum::<f64>() / scores.len() as f64;
        Ok(average.clamp(-1.0, 1.0))
    }
}
