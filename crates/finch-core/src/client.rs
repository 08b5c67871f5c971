//! Typed client for the Finch REST API
//!
//! Keeps the bearer token from `login`/`register` and attaches it to every
//! request. A 401 clears the stored token and surfaces as
//! `Error::Unauthorized`, so callers can send the user back to login.

use std::sync::Mutex;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::market::{MarketSnapshot, RecommendationsResponse, RiskCategory};
use crate::models::{Account, AnalyticsSummary, AuthResponse, BudgetStatus, User};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct FinchClient {
    client: Client,
    base_url: String,
    token: Mutex<Option<String>>,
}

impl FinchClient {
    /// `base_url` is the server root, e.g. `http://localhost:3000`
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        })
    }

    /// Use an existing token
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.set_token(Some(token.into()));
        self
    }

    pub fn token(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = token;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let request = match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            if self.token().is_some() {
                warn!("Session rejected by server, clearing token");
            }
            self.set_token(None);
            return Err(Error::Unauthorized);
        }

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_else(|_| status.to_string());
            debug!(%status, %message, "API error");
            return Err(match status {
                StatusCode::BAD_REQUEST => Error::InvalidData(message),
                StatusCode::NOT_FOUND => Error::NotFound(message),
                StatusCode::CONFLICT => Error::Conflict(message),
                StatusCode::SERVICE_UNAVAILABLE => Error::NotConfigured(message),
                _ => Error::Provider(format!("Server returned {}: {}", status, message)),
            });
        }

        Ok(response.json().await?)
    }

    pub async fn health(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    pub async fn register(&self, email: &str, name: &str, password: &str) -> Result<AuthResponse> {
        let auth: AuthResponse = self
            .send(self.client.post(self.url("/auth/register")).json(&json!({
                "email": email,
                "name": name,
                "password": password,
            })))
            .await?;
        self.set_token(Some(auth.token.clone()));
        Ok(auth)
    }

    /// Log in and keep the returned token
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let auth: AuthResponse = self
            .send(self.client.post(self.url("/auth/login")).json(&json!({
                "email": email,
                "password": password,
            })))
            .await?;
        self.set_token(Some(auth.token.clone()));
        Ok(auth)
    }

    pub async fn logout(&self) -> Result<()> {
        let _: serde_json::Value = self.send(self.client.post(self.url("/auth/logout"))).await?;
        self.set_token(None);
        Ok(())
    }

    pub async fn me(&self) -> Result<User> {
        self.send(self.client.get(self.url("/auth/me"))).await
    }

    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.send(self.client.get(self.url("/accounts"))).await
    }

    /// Budget status for a `YYYY-MM` month (current month when `None`)
    pub async fn budget_statuses(&self, month: Option<&str>) -> Result<Vec<BudgetStatus>> {
        let mut request = self.client.get(self.url("/budgets/status"));
        if let Some(month) = month {
            request = request.query(&[("month", month)]);
        }
        self.send(request).await
    }

    pub async fn summary(&self, month: Option<&str>) -> Result<AnalyticsSummary> {
        let mut request = self.client.get(self.url("/analytics/summary"));
        if let Some(month) = month {
            request = request.query(&[("month", month)]);
        }
        self.send(request).await
    }

    pub async fn recommendations(&self, risk_tolerance: f64) -> Result<RecommendationsResponse> {
        self.send(
            self.client
                .get(self.url("/portfolio/recommendations"))
                .query(&[("risk", risk_tolerance)]),
        )
        .await
    }

    pub async fn recommendations_for(
        &self,
        category: RiskCategory,
    ) -> Result<RecommendationsResponse> {
        self.send(self.client.get(self.url(&format!(
            "/portfolio/recommendations/{}",
            category.as_str()
        ))))
        .await
    }

    pub async fn market(&self) -> Result<MarketSnapshot> {
        self.send(self.client.get(self.url("/portfolio/market")))
            .await
    }
}
