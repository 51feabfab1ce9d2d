//! Order data model and push-event envelopes.
//!
//! Orders are owned by the remote order service; these types are the
//! client-side view of them. The push channel delivers small JSON envelopes
//! that reference an order either by a nested snapshot or a flat `order_id`;
//! one of the two is always present on well-formed events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Order lifecycle
// ---------------------------------------------------------------------------

/// Order lifecycle status. Not strictly linear: cancellation is possible
/// from most states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Served,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Terminal statuses are excluded from the active-order view.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Served => "served",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Payment method captured when completing an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
        }
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// One line item on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Some service payloads name this field after the menu item.
    #[serde(alias = "menu_item_name")]
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// One customer order as tracked by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "table_number_compat"
    )]
    pub table_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_type: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Whether the order belongs in the active-order view.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// This dashboard is table-service only. An absent `order_type` is
    /// treated as table service; anything else must say "table"
    /// (case-insensitive) to be shown.
    pub fn is_table_service(&self) -> bool {
        match self.order_type.as_deref() {
            Some(kind) => kind.trim().eq_ignore_ascii_case("table"),
            None => true,
        }
    }

    /// Display total: derived from line items, falling back to the
    /// pre-computed `total_amount` only when items are unavailable.
    pub fn display_total(&self) -> f64 {
        if self.items.is_empty() {
            self.total_amount.unwrap_or(0.0)
        } else {
            self.items.iter().map(OrderItem::line_total).sum()
        }
    }
}

/// The service sends the table number as either a JSON string or a bare
/// number; accept both.
fn table_number_compat<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|value| match value {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Push events
// ---------------------------------------------------------------------------

/// Raw push-channel envelope: `{type, order?, order_id?}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub order: Option<Order>,
    #[serde(default)]
    pub order_id: Option<String>,
}

/// A recognized push event with its order ID resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    NewOrder {
        order_id: String,
        order: Option<Order>,
    },
    OrderUpdate {
        order_id: String,
        order: Option<Order>,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> &str {
        match self {
            Self::NewOrder { order_id, .. } | Self::OrderUpdate { order_id, .. } => order_id,
        }
    }

    /// Order snapshot carried on the event, when the envelope nested one.
    pub fn order(&self) -> Option<&Order> {
        match self {
            Self::NewOrder { order, .. } | Self::OrderUpdate { order, .. } => order.as_ref(),
        }
    }
}
