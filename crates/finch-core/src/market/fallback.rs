//! Static market data used when every live provider fails

use super::watchlist::Sector;
use super::{CryptoQuote, QuoteSource, StockQuote};

/// (symbol, name, sector, price, change, change %, volume)
type FallbackRow = (&'static str, &'static str, Sector, f64, f64, f64, u64);

const QUOTES: &[FallbackRow] = &[
    ("AAPL", "Apple Inc.", Sector::Technology, 189.84, 2.31, 1.23, 52_164_000),
    ("MSFT", "Microsoft Corporation", Sector::Technology, 415.26, -1.84, -0.44, 18_932_000),
    ("GOOGL", "Alphabet Inc.", Sector::CommunicationServices, 171.95, 1.12, 0.66, 24_418_000),
    ("AMZN", "Amazon.com Inc.", Sector::ConsumerDiscretionary, 183.63, 3.02, 1.67, 38_775_000),
    ("NVDA", "NVIDIA Corporation", Sector::Technology, 121.79, 4.25, 3.62, 289_433_000),
    ("META", "Meta Platforms Inc.", Sector::CommunicationServices, 493.5, -3.91, -0.79, 11_206_000),
    ("TSLA", "Tesla Inc.", Sector::ConsumerDiscretionary, 177.48, -6.12, -3.33, 86_354_000),
    ("JPM", "JPMorgan Chase & Co.", Sector::Financials, 198.88, 0.54, 0.27, 8_641_000),
    ("V", "Visa Inc.", Sector::Financials, 274.35, 1.08, 0.4, 6_203_000),
    ("JNJ", "Johnson & Johnson", Sector::Healthcare, 147.21, -0.33, -0.22, 7_118_000),
    ("WMT", "Walmart Inc.", Sector::ConsumerStaples, 67.92, 0.41, 0.61, 15_822_000),
    ("PG", "Procter & Gamble Co.", Sector::ConsumerStaples, 166.04, 0.72, 0.44, 5_987_000),
    ("UNH", "UnitedHealth Group Inc.", Sector::Healthcare, 495.67, -4.81, -0.96, 3_402_000),
    ("HD", "The Home Depot Inc.", Sector::ConsumerDiscretionary, 342.18, 2.66, 0.78, 3_871_000),
    ("MA", "Mastercard Inc.", Sector::Financials, 451.09, 1.95, 0.43, 2_644_000),
    ("XOM", "Exxon Mobil Corporation", Sector::Energy, 113.52, -1.27, -1.11, 14_390_000),
    ("KO", "The Coca-Cola Company", Sector::ConsumerStaples, 62.88, 0.19, 0.3, 11_054_000),
    ("PEP", "PepsiCo Inc.", Sector::ConsumerStaples, 171.43, -0.58, -0.34, 5_226_000),
    ("DIS", "The Walt Disney Company", Sector::CommunicationServices, 101.72, 1.46, 1.46, 9_517_000),
    ("NFLX", "Netflix Inc.", Sector::CommunicationServices, 641.32, 8.74, 1.38, 3_108_000),
];

/// (coin id, symbol, name, price, 24h change %)
const CRYPTO: &[(&str, &str, &str, f64, f64)] = &[
    ("bitcoin", "BTC", "Bitcoin", 67_250.0, 1.85),
    ("ethereum", "ETH", "Ethereum", 3_480.0, 2.41),
    ("solana", "SOL", "Solana", 158.2, -1.12),
    ("cardano", "ADA", "Cardano", 0.45, 0.63),
];

/// CoinGecko ids tracked by the dashboard
pub(crate) const CRYPTO_IDS: &[&str] = &["bitcoin", "ethereum", "solana", "cardano"];

fn to_quote(row: &FallbackRow) -> StockQuote {
    let (symbol, name, sector, price, change, change_percent, volume) = *row;
    StockQuote {
        symbol: symbol.to_string(),
        name: name.to_string(),
        sector,
        price,
        change,
        change_percent,
        volume,
        source: QuoteSource::Fallback,
    }
}

/// Static quote for a symbol, or the first table entry when it isn't listed
pub fn fallback_quote(symbol: &str) -> StockQuote {
    let row = QUOTES
        .iter()
        .find(|row| row.0.eq_ignore_ascii_case(symbol.trim()))
        .unwrap_or(&QUOTES[0]);
    to_quote(row)
}

/// Static quotes for every tracked coin
pub fn fallback_crypto() -> Vec<CryptoQuote> {
    CRYPTO
        .iter()
        .map(|&(id, symbol, name, price, change)| CryptoQuote {
            id: id.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            price_usd: price,
            change_24h: change,
            source: QuoteSource::Fallback,
        })
        .collect()
}

/// Display metadata for a CoinGecko id
pub(crate) fn crypto_meta(id: &str) -> Option<(&'static str, &'static str)> {
    CRYPTO
        .iter()
        .find(|row| row.0 == id)
        .map(|&(_, symbol, name, _, _)| (symbol, name))
}
