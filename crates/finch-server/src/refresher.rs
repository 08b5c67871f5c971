//! Background market data refresher
//!
//! Re-fetches quotes for the whole watchlist on a fixed interval and keeps
//! the latest snapshot in `AppState`, so `GET /api/portfolio/market` never
//! waits on the providers. Controlled by `FINCH_MARKET_REFRESH_SECS`
//! (default 10, 0 disables).

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use finch_core::MarketSnapshot;

use crate::AppState;

/// Default refresh interval in seconds
pub const DEFAULT_REFRESH_SECS: u64 = 10;

/// Fetch one snapshot and store it
pub async fn refresh_once(state: &AppState) -> MarketSnapshot {
    let snapshot = state.market.snapshot().await;
    debug!(
        quotes = snapshot.quotes.len(),
        updated_at = %snapshot.updated_at,
        "Market snapshot refreshed"
    );
    *state.snapshot.write().await = Some(snapshot.clone());
    snapshot
}

/// Start the refresher as a background task
///
/// The first refresh runs immediately so the dashboard has data on load.
pub fn start_market_refresher(state: Arc<AppState>, every: Duration) {
    info!("Starting market refresher: every {}s", every.as_secs());

    tokio::spawn(async move {
        let mut ticker = interval(every);
        // A slow provider round shouldn't queue up a burst of refreshes
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            refresh_once(&state).await;
        }
    });
}
