//! Dashboard configuration.
//!
//! One `DashboardConfig` per mounted dashboard instance. The timing knobs
//! default to the production values (30 s fallback poll, 5 s flat reconnect,
//! 8 s new-order highlight) and are only overridden by tests.

use std::time::Duration;

use crate::error::SyncError;

/// Default page size for the active-order listing.
pub const DEFAULT_FETCH_LIMIT: u32 = 100;
/// Unconditional re-fetch cadence; bounds staleness when the push channel
/// is degraded.
pub const FALLBACK_POLL_INTERVAL: Duration = Duration::from_millis(30_000);
/// Flat delay between push-channel reconnect attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(5_000);
/// How long a just-arrived order stays visually flagged as new.
pub const HIGHLIGHT_TTL: Duration = Duration::from_millis(8_000);

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Normalized order-service base URL (scheme, no trailing slash).
    pub service_url: String,
    pub restaurant_id: String,
    /// Bearer token for the order service, when required.
    pub api_token: Option<String>,
    pub fetch_limit: u32,
    pub poll_interval: Duration,
    pub reconnect_delay: Duration,
    pub highlight_ttl: Duration,
}

impl DashboardConfig {
    pub fn new(service_url: &str, restaurant_id: &str) -> Self {
        Self {
            service_url: normalize_service_url(service_url),
            restaurant_id: restaurant_id.trim().to_string(),
            api_token: None,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            poll_interval: FALLBACK_POLL_INTERVAL,
            reconnect_delay: RECONNECT_DELAY,
            highlight_ttl: HIGHLIGHT_TTL,
        }
    }

    /// Read configuration from `DASHBOARD_SERVICE_URL`,
    /// `DASHBOARD_RESTAURANT_ID` and optionally `DASHBOARD_API_TOKEN`.
    pub fn from_env() -> Result<Self, SyncError> {
        let service_url = require_env("DASHBOARD_SERVICE_URL")?;
        let restaurant_id = require_env("DASHBOARD_RESTAURANT_ID")?;

        let mut config = Self::new(&service_url, &restaurant_id);
        config.api_token = std::env::var("DASHBOARD_API_TOKEN")
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        Ok(config)
    }
}

fn require_env(name: &str) -> Result<String, SyncError> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SyncError::Config(format!("missing {name}")))
}

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the order-service URL:
/// - strip trailing slashes
/// - strip a trailing `/api` segment
/// - ensure a scheme is present (https, or http for localhost)
pub fn normalize_service_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    // Ensure scheme
    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    // Strip trailing slashes
    while url.ends_with('/') {
        url.pop();
    }

    // Strip trailing /api
    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}
