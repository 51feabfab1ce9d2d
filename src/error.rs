//! Error taxonomy for the dashboard sync engine.
//!
//! `Fetch` and `Update` surface to the caller (the UI shows them as transient
//! notifications and keeps the last good state). `Channel` and `Parse` are
//! recovered internally by reconnecting or forcing a reconciliation fetch and
//! never reach the user.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Order listing or report retrieval failed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Status or payment transition failed.
    #[error("status update failed: {0}")]
    Update(String),

    /// Push connection failed or dropped.
    #[error("push channel error: {0}")]
    Channel(Box<tokio_tungstenite::tungstenite::Error>),

    /// Malformed push payload.
    #[error("malformed push payload: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid or missing configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Report export failed.
    #[error("report export failed: {0}")]
    Export(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Channel(Box::new(value))
    }
}

impl SyncError {
    /// Whether this failure is handled inside the sync core (reconnect or
    /// re-sync) rather than surfaced to the caller.
    pub fn is_recovered_internally(&self) -> bool {
        matches!(self, Self::Channel(_) | Self::Parse(_))
    }
}
