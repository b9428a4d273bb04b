//! Socket event dispatcher.
//!
//! The strategy comes from the contract's declared return shape: `void`
//! methods are sent fire-and-forget, everything else waits for an
//! acknowledgement under a per-call timer.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::oneshot;

use crate::config::schema::SocketConfig;
use crate::contract::{Argument, EndpointContract, InvokeFn, ReturnShape, StubTable};
use crate::observability::metrics;
use crate::socket::payload::build_payload;
use crate::socket::transport::SocketTransport;
use crate::socket::types::{EventOptions, SocketError, SocketResult};

/// Stub table whose calls go through an [`EventDispatcher`].
pub type EventStubTable = StubTable<EventOptions, SocketResult<Value>>;

/// Result of emitting one event.
#[derive(Debug)]
pub enum EventCall {
    /// Fire-and-forget; the event is already queued.
    Sent,
    /// Awaiting an acknowledgement.
    Pending(AckHandle),
}

impl EventCall {
    /// Resolve to the acknowledgement payload, or `null` for fire-and-forget.
    pub async fn resolve(self) -> SocketResult<Value> {
        match self {
            EventCall::Sent => Ok(Value::Null),
            EventCall::Pending(handle) => handle.wait().await,
        }
    }
}

/// An acknowledgement being waited for. Owns its own timer.
#[derive(Debug)]
pub struct AckHandle {
    event: String,
    timeout: Duration,
    receiver: oneshot::Receiver<Value>,
}

impl AckHandle {
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Wait for the acknowledgement.
    ///
    /// An ack of the form `{ "error": "<message>" }` is a rejection.
    pub async fn wait(self) -> SocketResult<Value> {
        let outcome = match tokio::time::timeout(self.timeout, self.receiver).await {
            Err(_) => Err(SocketError::AckTimeout {
                event: self.event.clone(),
                timeout: self.timeout,
            }),
            Ok(Err(_)) => Err(SocketError::Closed),
            Ok(Ok(payload)) => match payload.get("error").and_then(Value::as_str) {
                Some(message) => Err(SocketError::AckPayload {
                    event: self.event.clone(),
                    message: message.to_string(),
                }),
                None => Ok(payload),
            },
        };

        let label = match &outcome {
            Ok(_) => "acked",
            Err(SocketError::AckTimeout { .. }) => "timeout",
            Err(SocketError::AckPayload { .. }) => "rejected",
            Err(_) => "closed",
        };
        metrics::record_emit("ack", label);
        if let Err(e) = &outcome {
            tracing::debug!(event = %self.event, error = %e, "Acknowledgement failed");
        }
        outcome
    }
}

/// Dispatches socket event contracts.
#[derive(Clone)]
pub struct EventDispatcher {
    transport: Arc<dyn SocketTransport>,
    config: SocketConfig,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EventDispatcher {
    pub fn new(transport: Arc<dyn SocketTransport>, config: SocketConfig) -> Self {
        Self { transport, config }
    }

    /// Emit one event. Never waits on the network.
    pub fn dispatch(
        &self,
        contract: &EndpointContract,
        args: &[Argument],
        options: &EventOptions,
    ) -> SocketResult<EventCall> {
        if !contract.verb.is_event() {
            return Err(SocketError::NotEvent(contract.id.clone()));
        }

        let event = contract.event_name();
        let payload = build_payload(contract, args);

        match contract.returns {
            ReturnShape::Void => {
                let sent = self.transport.emit(event, payload);
                metrics::record_emit("fire_and_forget", if sent.is_ok() { "sent" } else { "failed" });
                sent?;
                tracing::debug!(contract = %contract.id, event = %event, "Event sent");
                Ok(EventCall::Sent)
            }
            ReturnShape::Value => {
                let receiver = self.transport.emit_with_ack(event, payload).inspect_err(|_| {
                    metrics::record_emit("ack", "failed");
                })?;
                let timeout = options
                    .ack_timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| self.config.ack_timeout());
                tracing::debug!(
                    contract = %contract.id,
                    event = %event,
                    timeout_ms = timeout.as_millis() as u64,
                    "Event sent, awaiting acknowledgement"
                );
                Ok(EventCall::Pending(AckHandle {
                    event: event.to_string(),
                    timeout,
                    receiver,
                }))
            }
        }
    }

    /// Emit and, for non-void contracts, wait for the acknowledgement.
    pub async fn call(
        &self,
        contract: &EndpointContract,
        args: &[Argument],
        options: &EventOptions,
    ) -> SocketResult<Value> {
        self.dispatch(contract, args, options)?.resolve().await
    }

    /// Stub table for the event contracts among `contracts`.
    pub fn stub_table(&self, contracts: impl IntoIterator<Item = EndpointContract>) -> EventStubTable {
        let dispatcher = self.clone();
        let invoke: InvokeFn<EventOptions, SocketResult<Value>> = Arc::new(
            move |contract: Arc<EndpointContract>, options: EventOptions, args: Vec<Argument>| {
                // Emission happens now; only the ack wait is deferred.
                let call = dispatcher.dispatch(&contract, &args, &options);
                async move { call?.resolve().await }.boxed()
            },
        );
        StubTable::new(contracts.into_iter().filter(|c| c.verb.is_event()), invoke)
    }
}
