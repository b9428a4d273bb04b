//! HTTP request dispatcher.
//!
//! Turns a contract plus call arguments into one [`OutgoingRequest`], sends it
//! through the configured transport and returns the response unread.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;

use crate::config::defaults::{global_context, DefaultContext};
use crate::config::schema::RequestConfig;
use crate::contract::{Argument, EndpointContract, InvokeFn, StubTable, Verb};
use crate::http::path::resolve_path;
use crate::http::request::classify;
use crate::http::response::ResponseHandle;
use crate::http::transport::{HttpTransport, ReqwestTransport};
use crate::http::types::{DispatchError, DispatchResult, OutgoingRequest};
use crate::observability::metrics;

/// Stub table whose calls go through an [`HttpDispatcher`].
pub type HttpStubTable = StubTable<RequestConfig, DispatchResult<ResponseHandle>>;

/// Dispatches HTTP contracts.
///
/// Cheap to clone; clones share the transport and the default context.
#[derive(Clone)]
pub struct HttpDispatcher {
    transport: Arc<dyn HttpTransport>,
    instance: Arc<RequestConfig>,
    defaults: DefaultContext,
}

impl std::fmt::Debug for HttpDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDispatcher")
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

impl HttpDispatcher {
    /// Dispatcher over the given transport, reading the process-wide defaults.
    pub fn new(transport: Arc<dyn HttpTransport>, instance: RequestConfig) -> Self {
        Self {
            transport,
            instance: Arc::new(instance),
            defaults: global_context(),
        }
    }

    /// Dispatcher using a fresh reqwest client.
    pub fn reqwest(instance: RequestConfig) -> Self {
        Self::new(Arc::new(ReqwestTransport::new()), instance)
    }

    /// Read defaults from `context` instead of the process-wide one.
    pub fn with_default_context(mut self, context: DefaultContext) -> Self {
        self.defaults = context;
        self
    }

    pub fn instance_config(&self) -> &RequestConfig {
        &self.instance
    }

    /// Build the outgoing request without sending it.
    pub fn prepare(
        &self,
        contract: &EndpointContract,
        args: &[Argument],
        options: &RequestConfig,
    ) -> DispatchResult<OutgoingRequest> {
        if contract.verb.is_event() {
            return Err(DispatchError::NotHttp(contract.id.clone()));
        }

        let defaults = self.defaults.load_full();
        let classified = classify(contract, args);
        let verb_layer = verb_defaults(contract.verb);
        let argument_layer = RequestConfig {
            headers: classified.headers,
            ..RequestConfig::default()
        };

        let merged = RequestConfig::layered([
            &verb_layer,
            defaults.as_ref(),
            self.instance.as_ref(),
            &argument_layer,
            options,
        ]);

        let verb = merged.method.unwrap_or(contract.verb);
        let method = verb
            .http_method()
            .ok_or_else(|| DispatchError::NotHttp(contract.id.clone()))?;

        let base = merged
            .base_url
            .as_deref()
            .ok_or_else(|| DispatchError::MissingBaseUrl(contract.id.clone()))?;
        let url = join_url(base, &resolve_path(contract, args));
        url::Url::parse(&url).map_err(|e| DispatchError::InvalidUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        // Query: configured layers, then argument values, then call-site options.
        let configured = RequestConfig::layered([defaults.as_ref(), self.instance.as_ref()]);
        let mut query: BTreeMap<String, Vec<String>> = configured
            .query
            .into_iter()
            .map(|(k, v)| (k, vec![v]))
            .collect();
        query.extend(classified.query);
        query.extend(options.query.iter().map(|(k, v)| (k.clone(), vec![v.clone()])));
        let query = query
            .into_iter()
            .flat_map(|(k, values)| values.into_iter().map(move |v| (k.clone(), v)))
            .collect();

        let timeout = merged.timeout();
        Ok(OutgoingRequest {
            method,
            url,
            query,
            headers: merged.headers,
            body: classified.body,
            timeout,
        })
    }

    /// Send one call and return the response with its body unread.
    ///
    /// Non-2xx statuses are not errors here; see
    /// [`ResponseHandle::error_for_status`].
    pub async fn dispatch(
        &self,
        contract: &EndpointContract,
        args: &[Argument],
        options: &RequestConfig,
    ) -> DispatchResult<ResponseHandle> {
        let request = self.prepare(contract, args, options)?;
        let start = Instant::now();

        tracing::debug!(
            contract = %contract.id,
            method = %request.method,
            url = %request.url,
            "Dispatching request"
        );

        match self.transport.send(request).await {
            Ok(response) => {
                metrics::record_dispatch(contract.verb.as_str(), response.status().as_u16(), start);
                tracing::debug!(
                    contract = %contract.id,
                    status = response.status().as_u16(),
                    "Response received"
                );
                Ok(response)
            }
            Err(e) => {
                metrics::record_dispatch(contract.verb.as_str(), 0, start);
                tracing::warn!(contract = %contract.id, error = %e, "Dispatch failed");
                Err(e)
            }
        }
    }

    /// Call builder bound to one contract.
    pub fn endpoint(&self, contract: &EndpointContract) -> Endpoint {
        Endpoint {
            dispatcher: self.clone(),
            contract: Arc::new(contract.clone()),
        }
    }

    /// Stub table for a set of HTTP contracts.
    pub fn stub_table(&self, contracts: impl IntoIterator<Item = EndpointContract>) -> HttpStubTable {
        let dispatcher = self.clone();
        let invoke: InvokeFn<RequestConfig, DispatchResult<ResponseHandle>> = Arc::new(
            move |contract: Arc<EndpointContract>, options: RequestConfig, args: Vec<Argument>| {
                let dispatcher = dispatcher.clone();
                async move { dispatcher.dispatch(&contract, &args, &options).await }.boxed()
            },
        );
        StubTable::new(contracts.into_iter().filter(|c| !c.verb.is_event()), invoke)
    }
}

/// One contract bound to a dispatcher.
#[derive(Debug, Clone)]
pub struct Endpoint {
    dispatcher: HttpDispatcher,
    contract: Arc<EndpointContract>,
}

impl Endpoint {
    pub fn contract(&self) -> &EndpointContract {
        &self.contract
    }

    pub async fn call(
        &self,
        options: RequestConfig,
        args: Vec<Argument>,
    ) -> DispatchResult<ResponseHandle> {
        self.dispatcher.dispatch(&self.contract, &args, &options).await
    }
}

/// Lowest layer, implied by the verb itself.
fn verb_defaults(verb: Verb) -> RequestConfig {
    match verb {
        Verb::Sse => RequestConfig::new().with_header("accept", "text/event-stream"),
        _ => RequestConfig::default(),
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.is_empty() || path == "/" {
        format!("{}/", base)
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
