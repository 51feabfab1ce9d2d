//! Live order sync orchestrator.
//!
//! Owns the shared dashboard state and the background tasks that keep it
//! current: the push channel driver, the channel signal consumer, and the
//! unconditional fallback poll. `start`/`stop` bracket one dashboard
//! session; stopping cancels every task, pending reconnect, and highlight
//! timer, and is safe to call when nothing was started.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::alerts::{AlertSink, NewOrderAlerts};
use crate::api::OrderService;
use crate::channel::{run_push_channel, ChannelSignal, ConnectionState};
use crate::config::DashboardConfig;
use crate::error::SyncError;
use crate::fetcher::reconcile;
use crate::export::export_report;
use crate::orders::{Order, OrderStatus, PaymentMethod};
use crate::registry::{HighlightSet, KnownOrders};
use crate::reports::DateRange;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// All mutable dashboard state, shared between the orchestrator, the
/// channel driver, the fetcher, and highlight expiry timers.
#[derive(Debug, Default)]
pub struct DashboardState {
    orders: Vec<Order>,
    pub known: KnownOrders,
    pub highlights: HighlightSet,
    connection: ConnectionState,
    next_generation: u64,
    applied_generation: u64,
}

impl DashboardState {
    /// Claim a fetch generation before the request goes out.
    pub fn begin_fetch(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Whether a response for `generation` may still be applied. A newer
    /// response landing first wins permanently.
    pub fn try_apply_fetch(&mut self, generation: u64) -> bool {
        if generation <= self.applied_generation {
            return false;
        }
        self.applied_generation = generation;
        true
    }

    pub fn replace_orders(&mut self, orders: Vec<Order>) {
        self.orders = orders;
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn set_connection(&mut self, connection: ConnectionState) {
        self.connection = connection;
    }
}

pub type SharedState = Arc<Mutex<DashboardState>>;

// ---------------------------------------------------------------------------
// View snapshot
// ---------------------------------------------------------------------------

/// One order as presented, with its transient highlight flag.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub is_new: bool,
    pub display_total: f64,
}

/// Point-in-time copy of the dashboard view.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DashboardSnapshot {
    pub orders: Vec<OrderView>,
    pub connection: ConnectionState,
}

impl DashboardSnapshot {
    /// Orders waiting to be brought to the table.
    pub fn ready(&self) -> impl Iterator<Item = &OrderView> {
        self.orders
            .iter()
            .filter(|view| view.order.status == OrderStatus::Ready)
    }

    /// Everything still in the kitchen or already at the table.
    pub fn in_progress(&self) -> impl Iterator<Item = &OrderView> {
        self.orders
            .iter()
            .filter(|view| view.order.status != OrderStatus::Ready)
    }
}

/// How a staff member completes an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionFlow {
    /// Complete without recording a payment method.
    Direct,
    /// Capture the payment method, then complete.
    WithPayment(PaymentMethod),
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

struct SyncRuntime {
    cancel_token: CancellationToken,
    channel_task: JoinHandle<()>,
    consumer_task: JoinHandle<()>,
    poll_task: JoinHandle<()>,
}

pub struct DashboardSync {
    config: DashboardConfig,
    service: Arc<dyn OrderService>,
    state: SharedState,
    alerts: Arc<Mutex<NewOrderAlerts>>,
    runtime: Option<SyncRuntime>,
}

impl DashboardSync {
    pub fn new(
        config: DashboardConfig,
        service: Arc<dyn OrderService>,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        let alerts = NewOrderAlerts::new(sink, config.highlight_ttl);
        Self {
            config,
            service,
            state: SharedState::default(),
            alerts: Arc::new(Mutex::new(alerts)),
            runtime: None,
        }
    }

    /// Handle to the shared state, for hosts that render it directly.
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Start the session: immediate fetch, open the push channel, and run
    /// the fallback poll. Idempotent while already running.
    pub async fn start(&mut self) {
        if self.runtime.is_some() {
            debug!("sync already running, start ignored");
            return;
        }

        info!(
            restaurant_id = %self.config.restaurant_id,
            "starting order sync"
        );

        // The initial fetch populates the view and seeds the registry. A
        // failure here is not fatal; the poll retries on its cadence.
        if let Err(error) = self.refresh().await {
            warn!(%error, "initial order fetch failed");
        }

        let cancel_token = CancellationToken::new();
        let (signal_tx, signal_rx) = mpsc::channel(32);

        let channel_task = tokio::spawn(run_push_channel(
            self.config.clone(),
            Arc::clone(&self.state),
            signal_tx,
            cancel_token.clone(),
        ));
        let consumer_task = tokio::spawn(consume_signals(
            Arc::clone(&self.service),
            self.config.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.alerts),
            signal_rx,
            cancel_token.clone(),
        ));
        let poll_task = tokio::spawn(run_fallback_poll(
            Arc::clone(&self.service),
            self.config.clone(),
            Arc::clone(&self.state),
            cancel_token.clone(),
        ));

        self.runtime = Some(SyncRuntime {
            cancel_token,
            channel_task,
            consumer_task,
            poll_task,
        });
    }

    /// Stop the session and release everything: poll, channel, pending
    /// reconnect, and highlight timers. Safe when never started.
    pub async fn stop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };

        runtime.cancel_token.cancel();
        let _ = runtime.channel_task.await;
        let _ = runtime.consumer_task.await;
        let _ = runtime.poll_task.await;

        self.alerts.lock().await.clear();

        let mut guard = self.state.lock().await;
        guard.highlights.clear();
        guard.set_connection(ConnectionState::Disconnected);
        info!("order sync stopped");
    }

    /// Force an authoritative re-fetch now.
    pub async fn refresh(&self) -> Result<usize, SyncError> {
        reconcile(
            self.service.as_ref(),
            &self.config.restaurant_id,
            self.config.fetch_limit,
            &self.state,
        )
        .await
    }

    /// Mark an order as brought to the table.
    pub async fn mark_served(&self, order_id: &str) -> Result<(), SyncError> {
        self.service
            .update_status(order_id, OrderStatus::Served, None)
            .await?;
        self.refresh_after_update(order_id).await;
        Ok(())
    }

    /// Complete an order, optionally recording how it was paid.
    pub async fn mark_completed(
        &self,
        order_id: &str,
        flow: CompletionFlow,
    ) -> Result<(), SyncError> {
        let payment_method = match flow {
            CompletionFlow::Direct => None,
            CompletionFlow::WithPayment(method) => Some(method),
        };
        self.service
            .update_status(order_id, OrderStatus::Completed, payment_method)
            .await?;
        self.refresh_after_update(order_id).await;
        Ok(())
    }

    /// Fetch the sales report for a period and write it out as CSV.
    /// Returns the path of the exported file.
    pub async fn export_sales_report(
        &self,
        range: &DateRange,
        dir: &Path,
    ) -> Result<PathBuf, SyncError> {
        let report = self
            .service
            .get_report(&self.config.restaurant_id, range)
            .await?;
        let path = export_report(&report, range, dir)?;
        info!(path = %path.display(), "sales report exported");
        Ok(path)
    }

    async fn refresh_after_update(&self, order_id: &str) {
        if let Err(error) = self.refresh().await {
            warn!(%error, order_id, "re-fetch after status update failed");
        }
    }

    /// Current view, with highlight flags resolved.
    pub async fn snapshot(&self) -> DashboardSnapshot {
        let guard = self.state.lock().await;
        let orders = guard
            .orders()
            .iter()
            .map(|order| OrderView {
                is_new: guard.highlights.contains(&order.id),
                display_total: order.display_total(),
                order: order.clone(),
            })
            .collect();
        DashboardSnapshot {
            orders,
            connection: guard.connection(),
        }
    }

    #[cfg(test)]
    pub(crate) async fn handle_channel_signal(&self, signal: ChannelSignal) {
        handle_signal(
            self.service.as_ref(),
            &self.config,
            &self.state,
            &self.alerts,
            signal,
        )
        .await;
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

/// Drain channel signals until cancelled. Every recognized event goes
/// through the alert policy first and then triggers a reconciliation
/// fetch; unrecognized traffic triggers the fetch alone.
async fn consume_signals(
    service: Arc<dyn OrderService>,
    config: DashboardConfig,
    state: SharedState,
    alerts: Arc<Mutex<NewOrderAlerts>>,
    mut signals: mpsc::Receiver<ChannelSignal>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            signal = signals.recv() => {
                let Some(signal) = signal else { break };
                handle_signal(service.as_ref(), &config, &state, &alerts, signal).await;
            }
        }
    }
}

async fn handle_signal(
    service: &dyn OrderService,
    config: &DashboardConfig,
    state: &SharedState,
    alerts: &Mutex<NewOrderAlerts>,
    signal: ChannelSignal,
) {
    if let ChannelSignal::Event(event) = &signal {
        // The alert runs before the fetch: the fetch marks the order
        // known, which must not suppress this first notification.
        alerts
            .lock()
            .await
            .consider(state, event.order_id(), event.order())
            .await;
    }

    if let Err(error) = reconcile(service, &config.restaurant_id, config.fetch_limit, state).await
    {
        warn!(%error, "push-triggered fetch failed");
    }
}

/// Unconditional re-fetch cadence, independent of channel health. Bounds
/// staleness even when the push channel misses events silently.
async fn run_fallback_poll(
    service: Arc<dyn OrderService>,
    config: DashboardConfig,
    state: SharedState,
    cancel_token: CancellationToken,
) {
    let first_tick = tokio::time::Instant::now() + config.poll_interval;
    let mut ticker = tokio::time::interval_at(first_tick, config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(error) =
                    reconcile(service.as_ref(), &config.restaurant_id, config.fetch_limit, &state)
                        .await
                {
                    warn!(%error, "fallback poll fetch failed");
                }
            }
        }
    }
}
