//! Reconciliation fetcher.
//!
//! The list fetch is the single source of truth for the active-order view:
//! push events only ever *trigger* a fetch, they never mutate the list
//! directly. Every fetch also feeds the known-order registry, so the fetch
//! path de-duplicates on its own even when the push channel is down.

use tracing::debug;

use crate::api::OrderService;
use crate::error::SyncError;
use crate::orders::Order;
use crate::sync::SharedState;

/// Filter a raw listing down to what this dashboard shows: non-terminal,
/// table-service orders.
pub fn classify_active(orders: Vec<Order>) -> Vec<Order> {
    orders
        .into_iter()
        .filter(|order| order.is_active() && order.is_table_service())
        .collect()
}

/// Fetch the authoritative order list and replace the local view wholesale.
///
/// On failure the error propagates and state is untouched; the fallback
/// poll retries on its own cadence. On success every returned ID is marked
/// known *before* filtering, so completed and non-table orders still count
/// as seen. A generation counter claimed before the request guards against
/// an older in-flight response landing after a newer one.
pub async fn reconcile(
    service: &dyn OrderService,
    restaurant_id: &str,
    limit: u32,
    state: &SharedState,
) -> Result<usize, SyncError> {
    let generation = state.lock().await.begin_fetch();

    let orders = service.list_orders(restaurant_id, limit).await?;

    let mut guard = state.lock().await;
    guard
        .known
        .mark_seen_bulk(orders.iter().map(|order| order.id.as_str()));

    if !guard.try_apply_fetch(generation) {
        debug!(generation, "stale fetch response discarded");
        return Ok(guard.orders().len());
    }

    let active = classify_active(orders);
    let count = active.len();
    guard.replace_orders(active);
    debug!(generation, count, "active orders reconciled");
    Ok(count)
}
