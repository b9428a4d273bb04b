//! Socket transport seam and the default WebSocket implementation.
//!
//! # Responsibilities
//! - Enqueue outbound events without awaiting the network
//! - Correlate acknowledgements with their requests
//! - Surface server-pushed events to subscribers
//!
//! # Data Flow
//! ```text
//! emit / emit_with_ack
//!     → mpsc queue → writer task → WebSocket text frame {"event","data","ack"?}
//!
//! WebSocket text frame → reader task
//!     → {"ack","data"}   → pending[ack] oneshot
//!     → {"event","data"} → broadcast subscribers
//! ```
//!
//! # Design Decisions
//! - Ack ids are v4 UUIDs; the pending map is a `DashMap`
//! - Pending entries whose receiver is gone are pruned on the next ack request
//! - When either task ends the transport is marked closed and every pending
//!   ack is dropped; waiters and later emits see `Closed`

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::schema::SocketConfig;
use crate::socket::types::{InboundFrame, OutboundFrame, ServerEvent, SocketError, SocketResult};

/// Duplex event channel used by the event dispatcher.
///
/// Both methods only enqueue; neither waits for the network.
pub trait SocketTransport: Send + Sync {
    /// Send an event without expecting a reply.
    fn emit(&self, event: &str, payload: Value) -> SocketResult<()>;

    /// Send an event and return a receiver for its acknowledgement payload.
    fn emit_with_ack(&self, event: &str, payload: Value) -> SocketResult<oneshot::Receiver<Value>>;
}

type PendingAcks = Arc<DashMap<String, oneshot::Sender<Value>>>;

/// WebSocket transport speaking JSON text frames.
pub struct WsTransport {
    outbound: mpsc::Sender<Message>,
    pending: PendingAcks,
    events: broadcast::Sender<ServerEvent>,
    closed: CancellationToken,
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("pending", &self.pending.len())
            .field("closed", &self.closed.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl WsTransport {
    /// Connect to `config.url` and spawn the reader and writer tasks.
    pub async fn connect(config: &SocketConfig) -> SocketResult<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| SocketError::Transport("socket url not configured".to_string()))?;

        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| SocketError::Transport(e.to_string()))?;
        tracing::info!(url = %url, "Socket connected");

        let (mut sink, mut source) = stream.split();
        let (outbound, mut queue) = mpsc::channel::<Message>(config.send_buffer.max(1));
        let pending: PendingAcks = Arc::new(DashMap::new());
        let (events, _) = broadcast::channel(config.send_buffer.max(1));
        let closed = CancellationToken::new();

        let writer_closed = closed.clone();
        let writer_pending = pending.clone();
        tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    biased;
                    _ = writer_closed.cancelled() => break,
                    message = queue.recv() => match message {
                        Some(message) => message,
                        None => break,
                    },
                };
                if let Err(e) = sink.send(message).await {
                    tracing::warn!(error = %e, "Socket write failed");
                    break;
                }
            }
            queue.close();
            let _ = sink.close().await;
            writer_closed.cancel();
            writer_pending.clear();
            tracing::debug!("Socket writer stopped");
        });

        let reader_closed = closed.clone();
        let reader_pending = pending.clone();
        let reader_events = events.clone();
        let pong = outbound.clone();
        tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        handle_inbound(text.as_str(), &reader_pending, &reader_events)
                    }
                    Ok(Message::Ping(data)) => {
                        let _ = pong.try_send(Message::Pong(data));
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Socket read failed");
                        break;
                    }
                }
            }
            reader_closed.cancel();
            reader_pending.clear();
            tracing::info!("Socket reader stopped");
        });

        Ok(Self {
            outbound,
            pending,
            events,
            closed,
        })
    }

    /// True once the connection has ended; every emit then fails with `Closed`.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Receive events the server pushes on its own.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// Number of acknowledgements still awaited.
    pub fn pending_acks(&self) -> usize {
        self.pending.len()
    }

    fn enqueue(&self, frame: &OutboundFrame) -> SocketResult<()> {
        if self.is_closed() {
            return Err(SocketError::Closed);
        }
        let text = serde_json::to_string(frame).map_err(|e| SocketError::Transport(e.to_string()))?;
        self.outbound
            .try_send(Message::text(text))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    SocketError::Transport("send buffer full".to_string())
                }
                mpsc::error::TrySendError::Closed(_) => SocketError::Closed,
            })
    }
}

impl SocketTransport for WsTransport {
    fn emit(&self, event: &str, payload: Value) -> SocketResult<()> {
        self.enqueue(&OutboundFrame {
            event: event.to_string(),
            data: payload,
            ack: None,
        })
    }

    fn emit_with_ack(&self, event: &str, payload: Value) -> SocketResult<oneshot::Receiver<Value>> {
        self.pending.retain(|_, tx| !tx.is_closed());

        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);
        // Closing sets the flag before draining; recheck after inserting.
        if self.is_closed() {
            self.pending.remove(&id);
            return Err(SocketError::Closed);
        }

        let frame = OutboundFrame {
            event: event.to_string(),
            data: payload,
            ack: Some(id.clone()),
        };
        if let Err(e) = self.enqueue(&frame) {
            self.pending.remove(&id);
            return Err(e);
        }
        Ok(rx)
    }
}

fn handle_inbound(text: &str, pending: &PendingAcks, events: &broadcast::Sender<ServerEvent>) {
    match serde_json::from_str::<InboundFrame>(text) {
        Ok(InboundFrame::Ack { ack, data }) => match pending.remove(&ack) {
            Some((_, tx)) => {
                let _ = tx.send(data);
            }
            None => tracing::debug!(ack = %ack, "Acknowledgement for unknown or expired request"),
        },
        Ok(InboundFrame::Event { event, data }) => {
            // No subscribers is fine.
            let _ = events.send(ServerEvent { event, data });
        }
        Err(e) => tracing::debug!(error = %e, "Ignoring malformed socket frame"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbound_ack_resolves_pending() {
        let pending: PendingAcks = Arc::new(DashMap::new());
        let (events, _) = broadcast::channel(4);
        let (tx, mut rx) = oneshot::channel();
        pending.insert("a1".to_string(), tx);

        handle_inbound(r#"{"ack":"a1","data":{"ok":true}}"#, &pending, &events);
        assert_eq!(rx.try_recv().unwrap(), json!({"ok": true}));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_inbound_event_broadcast() {
        let pending: PendingAcks = Arc::new(DashMap::new());
        let (events, mut sub) = broadcast::channel(4);

        handle_inbound(r#"{"event":"tick","data":1}"#, &pending, &events);
        handle_inbound("not json", &pending, &events);

        let got = sub.try_recv().unwrap();
        assert_eq!(got.event, "tick");
        assert_eq!(got.data, json!(1));
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn test_closed_transport_rejects_emits() {
        let (outbound, _queue) = mpsc::channel(4);
        let (events, _) = broadcast::channel(4);
        let transport = WsTransport {
            outbound,
            pending: Arc::new(DashMap::new()),
            events,
            closed: CancellationToken::new(),
        };

        assert!(transport.emit_with_ack("a", json!(1)).is_ok());
        assert_eq!(transport.pending_acks(), 1);

        transport.closed.cancel();
        transport.pending.clear();

        assert!(transport.is_closed());
        assert!(matches!(transport.emit("b", json!(2)), Err(SocketError::Closed)));
        assert!(matches!(
            transport.emit_with_ack("c", json!(3)),
            Err(SocketError::Closed)
        ));
        assert_eq!(transport.pending_acks(), 0);
    }
}
