//! Order service API client.
//!
//! Provides HTTP communication with the remote order service: active-order
//! listing, status transitions (optionally with a recorded payment method),
//! and sales-report retrieval. The [`OrderService`] trait is the seam the
//! sync core depends on, so tests can run against an in-memory fake.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::DashboardConfig;
use crate::error::SyncError;
use crate::orders::{Order, OrderStatus, PaymentMethod};
use crate::reports::{DateRange, SalesReport};

/// Default timeout for order-service requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Service seam
// ---------------------------------------------------------------------------

/// Remote order service as seen by the sync core.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Fetch the most recent orders for a restaurant.
    async fn list_orders(&self, restaurant_id: &str, limit: u32) -> Result<Vec<Order>, SyncError>;

    /// Request a status transition, with an optional payment method when
    /// moving to `completed`.
    async fn update_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        payment_method: Option<PaymentMethod>,
    ) -> Result<(), SyncError>;

    /// Fetch the sales report for an inclusive date range.
    async fn get_report(
        &self,
        restaurant_id: &str,
        range: &DateRange,
    ) -> Result<SalesReport, SyncError>;
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

fn orders_endpoint(base: &str, restaurant_id: &str, limit: u32) -> String {
    format!("{base}/api/restaurants/{restaurant_id}/orders?limit={limit}")
}

fn status_endpoint(base: &str, order_id: &str) -> String {
    format!("{base}/api/orders/{order_id}/status")
}

fn reports_endpoint(base: &str, restaurant_id: &str, range: &DateRange) -> String {
    format!(
        "{base}/api/restaurants/{restaurant_id}/reports?start_date={}&end_date={}",
        range.start_str(),
        range.end_str()
    )
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> String {
    if err.is_connect() {
        return format!("Cannot reach order service at {url}");
    }
    if err.is_timeout() {
        return format!("Connection to {url} timed out");
    }
    if err.is_builder() {
        return format!("Invalid order service URL: {url}");
    }
    format!("Network error communicating with {url}: {err}")
}

/// Convert an HTTP status code into a user-friendly message.
fn status_error(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "API token is invalid or expired".to_string(),
        403 => "Staff account not authorized for this restaurant".to_string(),
        404 => "Order service endpoint not found".to_string(),
        409 => "Order changed on the server; refresh and retry".to_string(),
        s if s >= 500 => format!("Order service error (HTTP {s})"),
        s => format!("Unexpected response from order service (HTTP {s})"),
    }
}

/// Some deployments wrap list/report responses in `{"data": ...}`;
/// unwrap that envelope when present.
fn unwrap_data(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) => match map.remove("data") {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        other => other,
    }
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

pub struct OrderServiceClient {
    base_url: String,
    api_token: Option<String>,
    client: Client,
}

impl OrderServiceClient {
    pub fn new(config: &DashboardConfig) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.service_url.clone(),
            api_token: config.api_token.clone(),
            client,
        })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, url);
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }
        req
    }
}

#[async_trait]
impl OrderService for OrderServiceClient {
    async fn list_orders(&self, restaurant_id: &str, limit: u32) -> Result<Vec<Order>, SyncError> {
        let url = orders_endpoint(&self.base_url, restaurant_id, limit);
        let resp = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| SyncError::Fetch(friendly_error(&url, &e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Fetch(status_error(status)));
        }

        let payload: Value = resp
            .json()
            .await
            .map_err(|e| SyncError::Fetch(format!("Invalid JSON from order service: {e}")))?;
        let orders: Vec<Order> = serde_json::from_value(unwrap_data(payload))
            .map_err(|e| SyncError::Fetch(format!("Invalid order list payload: {e}")))?;

        debug!(restaurant_id, count = orders.len(), "order list fetched");
        Ok(orders)
    }

    async fn update_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        payment_method: Option<PaymentMethod>,
    ) -> Result<(), SyncError> {
        let url = status_endpoint(&self.base_url, order_id);
        let mut body = serde_json::json!({ "status": status.as_str() });
        if let Some(method) = payment_method {
            body["payment_method"] = Value::String(method.as_str().to_string());
        }

        let resp = self
            .request(reqwest::Method::PATCH, &url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Update(friendly_error(&url, &e)))?;

        let http_status = resp.status();
        if !http_status.is_success() {
            return Err(SyncError::Update(status_error(http_status)));
        }

        debug!(order_id, status = status.as_str(), "order status updated");
        Ok(())
    }

    async fn get_report(
        &self,
        restaurant_id: &str,
        range: &DateRange,
    ) -> Result<SalesReport, SyncError> {
        let url = reports_endpoint(&self.base_url, restaurant_id, range);
        let resp = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| SyncError::Fetch(friendly_error(&url, &e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Fetch(status_error(status)));
        }

        let payload: Value = resp
            .json()
            .await
            .map_err(|e| SyncError::Fetch(format!("Invalid JSON from order service: {e}")))?;
        serde_json::from_value(unwrap_data(payload))
            .map_err(|e| SyncError::Fetch(format!("Invalid report payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_endpoint_includes_limit() {
        let url = orders_endpoint("https://orders.example.com", "rest-1", 100);
        assert_eq!(
            url,
            "https://orders.example.com/api/restaurants/rest-1/orders?limit=100"
        );
    }

    #[test]
    fn reports_endpoint_includes_inclusive_range() {
        let range = DateRange::parse("2026-08-01", "2026-08-25").unwrap();
        let url = reports_endpoint("https://orders.example.com", "rest-1", &range);
        assert!(url.contains("/api/restaurants/rest-1/reports"));
        assert!(url.contains("start_date=2026-08-01"));
        assert!(url.contains("end_date=2026-08-25"));
    }

    #[test]
    fn status_errors_are_user_friendly() {
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED),
            "API token is invalid or expired"
        );
        assert!(status_error(StatusCode::BAD_GATEWAY).contains("HTTP 502"));
        assert!(status_error(StatusCode::IM_A_TEAPOT).contains("Unexpected response"));
    }

    #[test]
    fn unwraps_data_envelope_when_present() {
        let wrapped = serde_json::json!({ "data": [1, 2, 3] });
        assert_eq!(unwrap_data(wrapped), serde_json::json!([1, 2, 3]));

        let bare = serde_json::json!([4, 5]);
        assert_eq!(unwrap_data(bare), serde_json::json!([4, 5]));
    }
}
