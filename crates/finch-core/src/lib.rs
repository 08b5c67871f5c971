//! Finch Core Library
//!
//! Shared functionality for the Finch personal finance dashboard:
//! - Database access and migrations (users, accounts, transactions, budgets)
//! - Spending analytics and demo data
//! - Market data providers and the stock recommendation scorer
//! - Teller bank aggregation and the Tavus AI banker
//! - Transaction CSV export
//! - Typed client for the REST API

pub mod banker;
pub mod client;
pub mod db;
pub mod error;
pub mod export;
pub mod market;
pub mod models;
pub mod teller;

/// Test utilities including the mock provider server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use banker::{build_financial_context, BankerClient, BankerConfig, Conversation};
pub use client::FinchClient;
pub use db::{Database, DemoSeedResult};
pub use error::{Error, Result};
pub use export::{TransactionExportOptions, TransactionExportRow};
pub use market::{
    calculate_ai_score, CryptoQuote, MarketAnalyzer, MarketConfig, MarketSnapshot, QuoteSource,
    RecommendationsResponse, RiskCategory, RiskLevel, ScoreInput, Sector, StockQuote,
    StockRecommendation, Watchlist,
};
pub use teller::{TellerClient, TellerConfig, TellerSyncResult};
