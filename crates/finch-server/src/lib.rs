//! Finch Web Server
//!
//! Axum-based REST API for the Finch personal finance dashboard.
//!
//! Security features:
//! - Bearer session tokens (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Input validation (pagination limits, body size limits)
//! - Sanitized error responses

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use finch_core::db::Database;
use finch_core::models::User;
use finch_core::{BankerConfig, MarketAnalyzer, MarketSnapshot, TellerConfig, Watchlist};

mod handlers;
mod refresher;

pub use refresher::{refresh_once, start_market_refresher, DEFAULT_REFRESH_SECS};

/// Maximum request body size (1 MB)
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 500;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Whether a session token is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Market snapshot refresh interval (None disables the refresher)
    pub market_refresh: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            market_refresh: Some(Duration::from_secs(DEFAULT_REFRESH_SECS)),
        }
    }
}

impl ServerConfig {
    /// Read `FINCH_ALLOWED_ORIGINS` and `FINCH_MARKET_REFRESH_SECS`
    pub fn from_env() -> Self {
        let allowed_origins = std::env::var("FINCH_ALLOWED_ORIGINS")
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let market_refresh = match std::env::var("FINCH_MARKET_REFRESH_SECS") {
            Ok(value) => match value.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    warn!(value = %value, "Invalid FINCH_MARKET_REFRESH_SECS, using default");
                    Some(Duration::from_secs(DEFAULT_REFRESH_SECS))
                }
            },
            Err(_) => Some(Duration::from_secs(DEFAULT_REFRESH_SECS)),
        };

        Self {
            require_auth: true,
            allowed_origins,
            market_refresh,
        }
    }
}

/// Split a comma-separated origin list
pub fn parse_origins(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub market: Arc<MarketAnalyzer>,
    /// Latest refresher snapshot
    pub snapshot: RwLock<Option<MarketSnapshot>>,
    pub teller: TellerConfig,
    pub banker: BankerConfig,
}

impl AppState {
    pub fn new(
        db: Database,
        config: ServerConfig,
        market: MarketAnalyzer,
        teller: TellerConfig,
        banker: BankerConfig,
    ) -> Self {
        Self {
            db,
            config,
            market: Arc::new(market),
            snapshot: RwLock::new(None),
            teller,
            banker,
        }
    }

    /// Providers and integrations configured from environment variables
    pub fn from_env(db: Database, config: ServerConfig) -> Self {
        let market = match MarketAnalyzer::from_env() {
            Ok(market) => market,
            Err(e) => {
                warn!(error = %e, "Market providers unavailable, serving static quotes");
                MarketAnalyzer::offline(Watchlist::default())
            }
        };

        let banker = BankerConfig::from_env();
        if banker.is_configured() {
            info!("AI banker configured");
        } else {
            info!("AI banker not configured (set TAVUS_API_KEY to enable)");
        }

        Self::new(db, config, market, TellerConfig::from_env(), banker)
    }
}

/// The user a request acts for, set by the auth middleware
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Token from an `Authorization: Bearer` header
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware - resolves the session token to a user
///
/// With auth disabled every request acts as the shared local user.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = if state.config.require_auth {
        let Some(token) = bearer_token(request.headers()) else {
            warn!(path = %request.uri().path(), "Unauthorized request - no token");
            return unauthorized();
        };
        match state.db.user_for_token(token) {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(path = %request.uri().path(), "Unauthorized request - invalid or expired token");
                return unauthorized();
            }
            Err(e) => return AppError::from(e).into_response(),
        }
    } else {
        match state.db.ensure_local_user() {
            Ok(user) => user,
            Err(e) => return AppError::from(e).into_response(),
        }
    };

    debug!(user_id = user.id, path = %request.uri().path(), "Authenticated");
    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router with providers configured from the environment
pub fn create_router(db: Database, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let state = Arc::new(AppState::from_env(db, config));
    create_router_with_state(state, static_dir)
}

/// Create the application router around existing state (for testing)
pub fn create_router_with_state(state: Arc<AppState>, static_dir: Option<&str>) -> Router {
    let config = state.config.clone();

    let public_routes = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login));

    let protected_routes = Router::new()
        // Auth
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::get_me))
        // Accounts
        .route(
            "/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route(
            "/accounts/:id",
            get(handlers::get_account).delete(handlers::delete_account),
        )
        .route("/accounts/:id/balance", put(handlers::update_account_balance))
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(handlers::get_transaction).delete(handlers::delete_transaction),
        )
        .route(
            "/transactions/:id/category",
            put(handlers::update_transaction_category),
        )
        // Budgets
        .route(
            "/budgets",
            get(handlers::list_budgets).post(handlers::create_budget),
        )
        .route("/budgets/status", get(handlers::budget_status))
        .route(
            "/budgets/:id",
            get(handlers::get_budget)
                .put(handlers::update_budget)
                .delete(handlers::delete_budget),
        )
        // Analytics
        .route("/analytics/summary", get(handlers::analytics_summary))
        .route("/analytics/trends", get(handlers::analytics_trends))
        .route("/analytics/merchants", get(handlers::analytics_merchants))
        .route("/analytics/overview", get(handlers::analytics_overview))
        // Portfolio
        .route(
            "/portfolio/recommendations",
            get(handlers::get_recommendations),
        )
        .route(
            "/portfolio/recommendations/:category",
            get(handlers::get_recommendations_for_category),
        )
        .route("/portfolio/quote/:symbol", get(handlers::get_quote))
        .route("/portfolio/market", get(handlers::get_market))
        .route("/portfolio/crypto", get(handlers::get_crypto))
        // Teller
        .route("/teller/enrollments", post(handlers::create_enrollment))
        .route("/teller/accounts", get(handlers::list_linked_accounts))
        .route("/teller/sync", post(handlers::sync_teller))
        // Banker
        .route("/banker/conversation", post(handlers::create_conversation))
        // Export
        .route("/export/transactions", get(handlers::export_transactions))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = public_routes.merge(protected_routes);

    // Build CORS layer
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    // CSP: the Tavus video call is embedded from daily.co
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; connect-src 'self' https://cdn.teller.io; frame-src https://*.daily.co https://teller.io; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes);

    // Serve the dashboard build, falling back to index.html for client routes
    if let Some(dir) = static_dir {
        let index = Path::new(dir).join("index.html");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    app.with_state(state).layer(
        ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::overriding(
                header::CONTENT_SECURITY_POLICY,
                csp_value,
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("DENY"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(DefaultBodyLimit::max(MAX_BODY_SIZE)),
    )
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    serve_with_config(db, host, port, static_dir, ServerConfig::from_env()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }

    match db.purge_expired_sessions() {
        Ok(count) if count > 0 => info!("Purged {} expired session(s)", count),
        Ok(_) => {}
        Err(e) => warn!("Failed to purge expired sessions: {}", e),
    }

    let state = Arc::new(AppState::from_env(db, config));

    if let Some(every) = state.config.market_refresh {
        start_market_refresher(state.clone(), every);
    } else {
        info!("Market refresher disabled");
    }

    let app = create_router_with_state(state, static_dir);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

/// Status and client-facing message for core errors the caller can act on
fn classify(err: &finch_core::Error) -> Option<(StatusCode, String)> {
    use finch_core::Error;

    let status = match err {
        Error::InvalidData(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::Unauthorized => StatusCode::UNAUTHORIZED,
        Error::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => return None,
    };
    Some((status, err.to_string()))
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();

        if let Some((status, message)) = err.downcast_ref::<finch_core::Error>().and_then(classify)
        {
            return Self {
                status,
                message,
                internal: None,
            };
        }

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
