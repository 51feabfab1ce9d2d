//! Staff dashboard sync engine for a restaurant ordering platform.
//!
//! Keeps a local view of one restaurant's active table-service orders
//! consistent with the remote order service: a receive-only push channel
//! (WebSocket) triggers authoritative re-fetches, a fallback poll bounds
//! staleness when the channel is degraded, and a known-order registry
//! makes sure each genuinely new order alerts exactly once per session.
//!
//! Hosts embed [`sync::DashboardSync`] and render [`sync::DashboardSnapshot`];
//! all business logic stays in the order service behind [`api::OrderService`].

pub mod alerts;
pub mod api;
pub mod channel;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod logging;
pub mod orders;
pub mod registry;
pub mod reports;
pub mod sync;

pub use api::{OrderService, OrderServiceClient};
pub use config::DashboardConfig;
pub use error::SyncError;
pub use orders::{Order, OrderStatus, PaymentMethod};
pub use reports::{DateRange, SalesReport};
pub use sync::{CompletionFlow, DashboardSnapshot, DashboardSync};
