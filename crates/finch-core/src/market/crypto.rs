//! Crypto prices from CoinGecko

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use super::fallback::{crypto_meta, CRYPTO_IDS};
use super::providers::http_client;
use super::{CryptoQuote, QuoteSource};
use crate::error::{Error, Result};

pub const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com";

#[derive(Debug, Deserialize)]
struct SimplePrice {
    usd: Option<f64>,
    usd_24h_change: Option<f64>,
}

/// CoinGecko simple price API (no key required)
#[derive(Clone)]
pub struct CoinGecko {
    client: Client,
    base_url: String,
}

impl CoinGecko {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Prices for every tracked coin, in tracking order
    ///
    /// Coins missing from the response are skipped. An empty result is an error.
    pub async fn quotes(&self) -> Result<Vec<CryptoQuote>> {
        let url = format!("{}/api/v3/simple/price", self.base_url);
        let ids = CRYPTO_IDS.join(",");
        let prices: HashMap<String, SimplePrice> = self
            .client
            .get(&url)
            .query(&[
                ("ids", ids.as_str()),
                ("vs_currencies", "usd"),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let quotes: Vec<CryptoQuote> = CRYPTO_IDS
            .iter()
            .filter_map(|id| {
                let entry = prices.get(*id)?;
                let price = entry.usd?;
                let (symbol, name) = crypto_meta(id)?;
                Some(CryptoQuote {
                    id: id.to_string(),
                    symbol: symbol.to_string(),
                    name: name.to_string(),
                    price_usd: price,
                    change_24h: entry.usd_24h_change.unwrap_or(0.0),
                    source: QuoteSource::CoinGecko,
                })
            })
            .collect();

        if quotes.is_empty() {
            return Err(Error::Provider("CoinGecko returned no prices".into()));
        }
        Ok(quotes)
    }
}
