//! Headless dashboard host.
//!
//! Runs the sync engine against a real order service and logs the live
//! view. Configuration comes from the environment:
//! `DASHBOARD_SERVICE_URL`, `DASHBOARD_RESTAURANT_ID`, and optionally
//! `DASHBOARD_API_TOKEN` and `DASHBOARD_LOG_DIR`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use staff_dashboard::alerts::TracingAlertSink;
use staff_dashboard::{logging, DashboardConfig, DashboardSync, OrderServiceClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_dir = std::env::var("DASHBOARD_LOG_DIR").ok().map(PathBuf::from);
    logging::init(log_dir.as_deref());

    let config = DashboardConfig::from_env().context("dashboard configuration")?;
    let client = OrderServiceClient::new(&config).context("order service client")?;

    let mut sync = DashboardSync::new(config, Arc::new(client), Arc::new(TracingAlertSink));
    sync.start().await;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutdown requested");

    sync.stop().await;

    let snapshot = sync.snapshot().await;
    info!(
        active_orders = snapshot.orders.len(),
        "dashboard host exiting"
    );
    Ok(())
}
