//! Test utilities for finch-core
//!
//! `MockProviderServer` emulates every external API Finch talks to on one
//! local port: Yahoo Finance, Alpha Vantage, CoinGecko, Teller and Tavus.
//! Point `MarketConfig::with_base_url`, `TellerConfig` and `BankerConfig` at
//! `url()`. `set_failing(true)` makes every endpoint answer 500.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// Alpha Vantage key the mock accepts
pub const MOCK_ALPHA_VANTAGE_KEY: &str = "test-key";
/// Teller access token the mock accepts
pub const MOCK_TELLER_TOKEN: &str = "teller-token";
/// Tavus API key the mock accepts
pub const MOCK_TAVUS_KEY: &str = "tavus-key";

/// `Basic base64("teller-token:")`
const TELLER_AUTH_HEADER: &str = "Basic dGVsbGVyLXRva2VuOg==";

#[derive(Clone, Default)]
struct MockState {
    failing: Arc<AtomicBool>,
    last_conversation: Arc<Mutex<Option<Value>>>,
}

impl MockState {
    fn failing(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }
}

fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "mock failure").into_response()
}

/// Mock external-provider server for tests
pub struct MockProviderServer {
    addr: SocketAddr,
    state: MockState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockProviderServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/v8/finance/chart/:symbol", get(handle_chart))
            .route("/query", get(handle_alpha_vantage))
            .route("/api/v3/simple/price", get(handle_coingecko))
            .route("/accounts", get(handle_teller_accounts))
            .route("/accounts/:id/balances", get(handle_teller_balances))
            .route("/accounts/:id/transactions", get(handle_teller_transactions))
            .route("/v2/conversations", post(handle_tavus))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make every endpoint fail (or recover)
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    /// Body of the most recent Tavus conversation request
    pub fn last_conversation_request(&self) -> Option<Value> {
        self.state
            .last_conversation
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockProviderServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Deterministic price for a symbol: 100 plus its length
pub fn mock_price(symbol: &str) -> f64 {
    100.0 + symbol.len() as f64
}

/// Yahoo chart endpoint
///
/// Quotes are always up 1.0 on the previous session. Closes alternate up and
/// down by the same amount, which gives an RSI near 50. `chartPreviousClose`
/// is the close before the range, as Yahoo reports it for multi-day ranges.
async fn handle_chart(
    State(state): State<MockState>,
    Path(symbol): Path<String>,
) -> Response {
    if state.failing() {
        return server_error();
    }
    if symbol.eq_ignore_ascii_case("UNKNOWN") {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"chart": {"result": null, "error": {"code": "Not Found"}}})),
        )
            .into_response();
    }

    let price = mock_price(&symbol);
    let closes: Vec<f64> = (0..40)
        .map(|i| if i % 2 == 1 { price } else { price - 1.0 })
        .collect();

    Json(json!({
        "chart": {
            "result": [{
                "meta": {
                    "symbol": symbol,
                    "regularMarketPrice": price,
                    "chartPreviousClose": price - 4.0,
                    "regularMarketVolume": 1_000_000u64,
                },
                "indicators": {"quote": [{"close": closes}]}
            }],
            "error": null
        }
    }))
    .into_response()
}

/// Alpha Vantage `/query` endpoint (GLOBAL_QUOTE, RSI, NEWS_SENTIMENT)
async fn handle_alpha_vantage(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if state.failing() {
        return server_error();
    }
    if params.get("apikey").map(String::as_str) != Some(MOCK_ALPHA_VANTAGE_KEY) {
        return Json(json!({"Information": "Invalid API key"})).into_response();
    }

    let symbol = params
        .get("symbol")
        .or_else(|| params.get("tickers"))
        .cloned()
        .unwrap_or_default();

    match params.get("function").map(String::as_str) {
        Some("GLOBAL_QUOTE") => Json(json!({
            "Global Quote": {
                "01. symbol": symbol,
                "05. price": format!("{:.4}", mock_price(&symbol) + 0.5),
                "06. volume": "250000",
                "09. change": "-2.0000",
                "10. change percent": "-1.9608%"
            }
        }))
        .into_response(),
        Some("RSI") => Json(json!({
            "Meta Data": {"1: Symbol": symbol},
            "Technical Analysis: RSI": {
                "2024-05-01": {"RSI": "25.0000"},
                "2024-05-02": {"RSI": "55.5000"}
            }
        }))
        .into_response(),
        Some("NEWS_SENTIMENT") => Json(json!({
            "feed": [
                {"ticker_sentiment": [
                    {"ticker": symbol, "ticker_sentiment_score": "0.2"},
                    {"ticker": "OTHER", "ticker_sentiment_score": "-0.9"}
                ]},
                {"ticker_sentiment": [
                    {"ticker": symbol, "ticker_sentiment_score": "0.4"}
                ]}
            ]
        }))
        .into_response(),
        _ => Json(json!({"Error Message": "Invalid API call"})).into_response(),
    }
}

/// CoinGecko simple price endpoint. Cardano is left out on purpose so
/// callers exercise the per-coin fallback.
async fn handle_coingecko(State(state): State<MockState>) -> Response {
    if state.failing() {
        return server_error();
    }
    Json(json!({
        "bitcoin": {"usd": 70000.0, "usd_24h_change": 2.5},
        "ethereum": {"usd": 3500.0, "usd_24h_change": -1.25},
        "solana": {"usd": 150.0, "usd_24h_change": 0.5}
    }))
    .into_response()
}

fn teller_authorized(state: &MockState, headers: &HeaderMap) -> Option<Response> {
    if state.failing() {
        return Some(server_error());
    }
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
    if auth != Some(TELLER_AUTH_HEADER) {
        return Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": {"code": "unauthorized"}})),
            )
                .into_response(),
        );
    }
    None
}

async fn handle_teller_accounts(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if let Some(rejection) = teller_authorized(&state, &headers) {
        return rejection;
    }
    Json(json!([
        {
            "id": "acc_checking",
            "enrollment_id": "enr_1",
            "name": "Everyday Checking",
            "type": "depository",
            "subtype": "checking",
            "currency": "USD",
            "last_four": "4321",
            "status": "open",
            "institution": {"id": "chase", "name": "Chase"}
        },
        {
            "id": "acc_card",
            "enrollment_id": "enr_1",
            "name": "Freedom",
            "type": "credit",
            "subtype": "credit_card",
            "currency": "USD",
            "last_four": "9876",
            "status": "open",
            "institution": {"id": "chase", "name": "Chase"}
        }
    ]))
    .into_response()
}

async fn handle_teller_balances(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Some(rejection) = teller_authorized(&state, &headers) {
        return rejection;
    }
    let (ledger, available) = match id.as_str() {
        "acc_card" => ("412.55", "4587.45"),
        _ => ("2500.00", "2450.00"),
    };
    Json(json!({"account_id": id, "ledger": ledger, "available": available})).into_response()
}

async fn handle_teller_transactions(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Some(rejection) = teller_authorized(&state, &headers) {
        return rejection;
    }
    let body = match id.as_str() {
        "acc_card" => json!([
            {
                "id": "txn_card_1",
                "account_id": id,
                "amount": "-54.20",
                "date": "2024-05-04",
                "description": "WHOLEFDS MKT",
                "status": "posted",
                "details": {"category": "groceries", "counterparty": {"name": "Whole Foods"}}
            }
        ]),
        _ => json!([
            {
                "id": "txn_chk_1",
                "account_id": id,
                "amount": "3200.00",
                "date": "2024-05-01",
                "description": "ACME PAYROLL",
                "status": "posted",
                "details": {"category": "income", "counterparty": {"name": "Acme"}}
            },
            {
                "id": "txn_chk_2",
                "account_id": id,
                "amount": "-18.75",
                "date": "2024-05-03",
                "description": "CHIPOTLE 1123",
                "status": "pending",
                "details": {"category": "dining", "counterparty": null}
            }
        ]),
    };
    Json(body).into_response()
}

async fn handle_tavus(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if state.failing() {
        return server_error();
    }
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some(MOCK_TAVUS_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid access token"})),
        )
            .into_response();
    }

    *state
        .last_conversation
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = Some(body);

    Json(json!({
        "conversation_id": "c_mock123",
        "conversation_url": "https://tavus.daily.co/c_mock123",
        "status": "active"
    }))
    .into_response()
}
