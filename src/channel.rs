//! Push channel manager.
//!
//! Maintains one receive-only WebSocket connection per dashboard instance,
//! scoped to a restaurant. The connection lifecycle is an explicit state
//! machine: `transition` is a pure function from (state, event) to
//! (state, effects), exercisable without a network, and the async driver
//! loop executes the effects against a real socket.
//!
//! The reconnect delay is flat (no exponential backoff): even total channel
//! failure degrades to the fallback poll rather than silent staleness, so
//! reconnection sophistication buys nothing here.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::error::SyncError;
use crate::orders::{OrderEvent, PushEnvelope};
use crate::sync::SharedState;

// ---------------------------------------------------------------------------
// Connection state machine
// ---------------------------------------------------------------------------

/// Push channel connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Events fed into the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    ConnectRequested,
    Opened,
    Closed,
    TransportError,
    TeardownRequested,
}

/// Side effects a transition asks the driver to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEffect {
    OpenSocket,
    CloseSocket,
    ScheduleReconnect,
    CancelReconnect,
}

/// Pure transition function. The idempotent-connect guard lives here: a
/// `ConnectRequested` while connecting or connected produces no effects,
/// so concurrent connect calls can never open a second socket.
pub fn transition(
    state: ConnectionState,
    event: ChannelEvent,
) -> (ConnectionState, Vec<ChannelEffect>) {
    use ChannelEffect::*;
    use ConnectionState::*;

    match (state, event) {
        (Disconnected, ChannelEvent::ConnectRequested) => (Connecting, vec![OpenSocket]),
        (Connecting | Connected, ChannelEvent::ConnectRequested) => (state, Vec::new()),

        (Connecting, ChannelEvent::Opened) => (Connected, vec![CancelReconnect]),
        (Disconnected | Connected, ChannelEvent::Opened) => (state, Vec::new()),

        (Connecting | Connected, ChannelEvent::Closed) => (Disconnected, vec![ScheduleReconnect]),
        (Disconnected, ChannelEvent::Closed) => (Disconnected, Vec::new()),

        // An ambiguous transport failure forces the socket closed before
        // scheduling the reconnect.
        (Connecting | Connected, ChannelEvent::TransportError) => {
            (Disconnected, vec![CloseSocket, ScheduleReconnect])
        }
        (Disconnected, ChannelEvent::TransportError) => (Disconnected, Vec::new()),

        (_, ChannelEvent::TeardownRequested) => (Disconnected, vec![CancelReconnect, CloseSocket]),
    }
}

/// Apply an event to the shared connection state and return the effects.
async fn apply_event(state: &SharedState, event: ChannelEvent) -> Vec<ChannelEffect> {
    let mut guard = state.lock().await;
    let (next, effects) = transition(guard.connection(), event);
    guard.set_connection(next);
    effects
}

// ---------------------------------------------------------------------------
// Message classification
// ---------------------------------------------------------------------------

/// Signal handed from the channel driver to the sync orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal {
    /// A recognized order event; always followed by a reconciliation fetch.
    Event(OrderEvent),
    /// Unrecognized or malformed frame; re-sync instead of failing.
    Resync,
}

/// Classify one text frame. Parse failures and unknown event types degrade
/// to a re-sync signal; they must never crash the channel or stop later
/// messages from being processed.
pub fn classify_frame(payload: &str) -> ChannelSignal {
    let envelope: PushEnvelope = match serde_json::from_str(payload) {
        Ok(envelope) => envelope,
        Err(error) => {
            debug!(%error, "unparseable push frame, forcing re-sync");
            return ChannelSignal::Resync;
        }
    };

    let order_id = envelope
        .order
        .as_ref()
        .map(|order| order.id.clone())
        .or_else(|| envelope.order_id.clone());

    match (envelope.kind.as_str(), order_id) {
        ("new_order", Some(order_id)) => ChannelSignal::Event(OrderEvent::NewOrder {
            order_id,
            order: envelope.order,
        }),
        ("order_update", Some(order_id)) => ChannelSignal::Event(OrderEvent::OrderUpdate {
            order_id,
            order: envelope.order,
        }),
        (kind, _) => {
            debug!(kind, "unrecognized push frame, forcing re-sync");
            ChannelSignal::Resync
        }
    }
}

enum FrameDirective {
    Signal(ChannelSignal),
    Ignore,
    Closed,
}

fn frame_directive(message: Message) -> FrameDirective {
    match message {
        Message::Text(text) => FrameDirective::Signal(classify_frame(&text)),
        Message::Binary(bytes) => {
            FrameDirective::Signal(classify_frame(&String::from_utf8_lossy(&bytes)))
        }
        Message::Close(_) => FrameDirective::Closed,
        _ => FrameDirective::Ignore,
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Upper bound on the WebSocket handshake. A peer that accepts TCP but
/// never answers the handshake must not stall the driver.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket endpoint for a restaurant's order stream.
pub fn ws_endpoint(service_url: &str, restaurant_id: &str) -> String {
    let base = if let Some(rest) = service_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = service_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        format!("wss://{service_url}")
    };
    format!("{base}/ws/restaurants/{restaurant_id}/orders")
}

enum SocketExit {
    Teardown,
    Dropped,
    Errored,
}

/// Run the push channel until the token is cancelled. Owns the full
/// lifecycle: connect, read, classify, and flat-delay reconnect on any
/// disconnect. Exactly one reconnect is scheduled per closure.
pub async fn run_push_channel(
    config: DashboardConfig,
    state: SharedState,
    signals: mpsc::Sender<ChannelSignal>,
    cancel_token: CancellationToken,
) {
    let endpoint = ws_endpoint(&config.service_url, &config.restaurant_id);

    loop {
        if cancel_token.is_cancelled() {
            break;
        }

        let effects = apply_event(&state, ChannelEvent::ConnectRequested).await;
        if !effects.contains(&ChannelEffect::OpenSocket) {
            // Another driver already owns the connection.
            debug!("connect requested while channel already active");
            return;
        }

        // Teardown must interrupt a stalled connect, not wait it out.
        let connected = tokio::select! {
            _ = cancel_token.cancelled() => break,
            result = tokio::time::timeout(HANDSHAKE_TIMEOUT, connect_async(endpoint.clone())) => result,
        };

        match connected {
            Ok(Ok((mut stream, _))) => {
                apply_event(&state, ChannelEvent::Opened).await;
                info!(endpoint = %endpoint, "push channel connected");

                let exit = loop {
                    tokio::select! {
                        _ = cancel_token.cancelled() => {
                            let _ = stream.close(None).await;
                            apply_event(&state, ChannelEvent::TeardownRequested).await;
                            break SocketExit::Teardown;
                        }
                        frame = stream.next() => {
                            match frame {
                                Some(Ok(message)) => match frame_directive(message) {
                                    FrameDirective::Signal(signal) => {
                                        if signals.send(signal).await.is_err() {
                                            // Consumer gone; nothing left to drive.
                                            apply_event(&state, ChannelEvent::TeardownRequested).await;
                                            break SocketExit::Teardown;
                                        }
                                    }
                                    FrameDirective::Ignore => {}
                                    FrameDirective::Closed => break SocketExit::Dropped,
                                },
                                Some(Err(error)) => {
                                    let error = SyncError::from(error);
                                    warn!(%error, "push channel transport error, forcing close");
                                    let effects =
                                        apply_event(&state, ChannelEvent::TransportError).await;
                                    if effects.contains(&ChannelEffect::CloseSocket) {
                                        let _ = stream.close(None).await;
                                    }
                                    break SocketExit::Errored;
                                }
                                None => break SocketExit::Dropped,
                            }
                        }
                    }
                };

                match exit {
                    SocketExit::Teardown => break,
                    // TransportError already scheduled the reconnect.
                    SocketExit::Errored => {}
                    SocketExit::Dropped => {
                        let effects = apply_event(&state, ChannelEvent::Closed).await;
                        if !effects.contains(&ChannelEffect::ScheduleReconnect) {
                            break;
                        }
                        warn!("push channel closed, reconnecting after delay");
                    }
                }
            }
            Ok(Err(error)) => {
                let error = SyncError::from(error);
                warn!(%error, endpoint = %endpoint, "push channel connect failed");
                apply_event(&state, ChannelEvent::Closed).await;
            }
            Err(_) => {
                warn!(endpoint = %endpoint, "push channel handshake timed out");
                apply_event(&state, ChannelEvent::Closed).await;
            }
        }

        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }

    state
        .lock()
        .await
        .set_connection(ConnectionState::Disconnected);
}
