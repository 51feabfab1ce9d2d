//! New-order alert policy.
//!
//! Decides when a push event represents a genuinely new order: unknown to
//! the registry and not already highlighted. The actual notification goes
//! through the [`AlertSink`] seam, fire-and-forget, so the policy stays
//! testable without audio or UI toasts.
//!
//! The policy never writes the known-order registry. Permanent "seen"
//! status is earned only by appearing in an authoritative fetch; the
//! highlight set alone absorbs duplicate events in the window before that
//! fetch resolves.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::orders::Order;
use crate::sync::SharedState;

/// Destination for new-order notifications.
pub trait AlertSink: Send + Sync {
    fn new_order(&self, order_id: &str, order: Option<&Order>);
}

/// Default sink: structured log line per alert.
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn new_order(&self, order_id: &str, order: Option<&Order>) {
        match order.and_then(|o| o.table_number.as_deref()) {
            Some(table) => info!(order_id, table, "new order arrived"),
            None => info!(order_id, "new order arrived"),
        }
    }
}

pub struct NewOrderAlerts {
    sink: Arc<dyn AlertSink>,
    ttl: Duration,
    expiry_tasks: HashMap<String, JoinHandle<()>>,
}

impl NewOrderAlerts {
    pub fn new(sink: Arc<dyn AlertSink>, ttl: Duration) -> Self {
        Self {
            sink,
            ttl,
            expiry_tasks: HashMap::new(),
        }
    }

    /// Consider one order ID seen on the push channel. Returns whether an
    /// alert fired. Re-entrant: a known or already-highlighted ID is a
    /// no-op, so a burst of duplicate events alerts at most once.
    ///
    /// A fresh highlight replaces any previous expiry timer for the same
    /// ID rather than stacking a second one.
    pub async fn consider(
        &mut self,
        state: &SharedState,
        order_id: &str,
        snapshot: Option<&Order>,
    ) -> bool {
        {
            let mut guard = state.lock().await;
            if guard.known.has_seen(order_id) || !guard.highlights.insert(order_id) {
                return false;
            }
        }

        self.sink.new_order(order_id, snapshot);

        if let Some(previous) = self.expiry_tasks.remove(order_id) {
            previous.abort();
        }

        let ttl = self.ttl;
        let state = Arc::clone(state);
        let expiring_id = order_id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            state.lock().await.highlights.remove(&expiring_id);
        });
        self.expiry_tasks.insert(order_id.to_string(), handle);
        true
    }

    /// Abort every pending expiry timer. Used on teardown.
    pub fn clear(&mut self) {
        for (_, handle) in self.expiry_tasks.drain() {
            handle.abort();
        }
    }
}

impl Drop for NewOrderAlerts {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        fired: AtomicUsize,
    }

    impl AlertSink for CountingSink {
        fn new_order(&self, _: &str, _: Option<&Order>) {
            self.fired.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn alerts_with_sink(ttl: Duration) -> (NewOrderAlerts, Arc<CountingSink>) {
        let sink = Arc::new(CountingSink::default());
        (NewOrderAlerts::new(Arc::clone(&sink) as _, ttl), sink)
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_events_alert_once_before_fetch_confirms() {
        let state = SharedState::default();
        let (mut alerts, sink) = alerts_with_sink(Duration::from_millis(8_000));

        assert!(alerts.consider(&state, "b", None).await);
        assert!(!alerts.consider(&state, "b", None).await);
        assert!(!alerts.consider(&state, "b", None).await);

        assert_eq!(sink.fired.load(Ordering::SeqCst), 1);
        // The policy must not have marked the registry.
        let guard = state.lock().await;
        assert!(!guard.known.has_seen("b"));
        assert!(guard.highlights.contains("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn known_orders_never_alert() {
        let state = SharedState::default();
        state.lock().await.known.mark_seen("a");
        let (mut alerts, sink) = alerts_with_sink(Duration::from_millis(8_000));

        assert!(!alerts.consider(&state, "a", None).await);
        assert_eq!(sink.fired.load(Ordering::SeqCst), 0);
        assert!(!state.lock().await.highlights.contains("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn highlight_expires_after_ttl_without_touching_others() {
        let state = SharedState::default();
        let (mut alerts, _sink) = alerts_with_sink(Duration::from_millis(8_000));

        alerts.consider(&state, "b", None).await;
        tokio::time::sleep(Duration::from_millis(4_000)).await;
        alerts.consider(&state, "c", None).await;

        // "b" expires at 8 s; "c" holds until 12 s.
        tokio::time::sleep(Duration::from_millis(4_100)).await;
        {
            let guard = state.lock().await;
            assert!(!guard.highlights.contains("b"));
            assert!(guard.highlights.contains("c"));
        }

        tokio::time::sleep(Duration::from_millis(4_000)).await;
        assert!(state.lock().await.highlights.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unconfirmed_order_can_alert_again_after_expiry() {
        let state = SharedState::default();
        let (mut alerts, sink) = alerts_with_sink(Duration::from_millis(8_000));

        assert!(alerts.consider(&state, "b", None).await);
        tokio::time::sleep(Duration::from_millis(8_100)).await;

        // Never confirmed by a fetch, so the registry still has no record
        // of it and a repeat event alerts again.
        assert!(alerts.consider(&state, "b", None).await);
        assert_eq!(sink.fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_aborts_pending_expiry_timers() {
        let state = SharedState::default();
        let (mut alerts, _sink) = alerts_with_sink(Duration::from_millis(8_000));

        alerts.consider(&state, "b", None).await;
        alerts.clear();

        // With the timer aborted, the highlight no longer expires; teardown
        // clears the set itself.
        tokio::time::sleep(Duration::from_millis(9_000)).await;
        assert!(state.lock().await.highlights.contains("b"));
    }
}
