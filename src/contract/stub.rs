//! Runtime stub table.
//!
//! Each compiled contract gets one entry: the shared contract plus an invoke
//! closure that forwards `(options, args)` to a dispatcher. Lookup is by method
//! identifier (`"<Service>.<method>"`), never by reflection.

use futures_util::future::BoxFuture;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::contract::args::Argument;
use crate::contract::types::EndpointContract;

/// Invoke function shared by every stub of a table.
pub type InvokeFn<O, R> =
    Arc<dyn Fn(Arc<EndpointContract>, O, Vec<Argument>) -> BoxFuture<'static, R> + Send + Sync>;

/// One callable endpoint.
pub struct Stub<O, R> {
    contract: Arc<EndpointContract>,
    invoke: InvokeFn<O, R>,
}

impl<O, R> Stub<O, R> {
    pub fn contract(&self) -> &EndpointContract {
        &self.contract
    }

    /// Package the call-site arguments with the contract and forward them.
    ///
    /// Arguments are passed through in order; position is the only link to
    /// the parameter bindings.
    pub fn call(&self, options: O, args: Vec<Argument>) -> BoxFuture<'static, R> {
        (self.invoke)(self.contract.clone(), options, args)
    }
}

impl<O, R> Clone for Stub<O, R> {
    fn clone(&self) -> Self {
        Self {
            contract: self.contract.clone(),
            invoke: self.invoke.clone(),
        }
    }
}

impl<O, R> fmt::Debug for Stub<O, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("id", &self.contract.id)
            .field("verb", &self.contract.verb)
            .field("path", &self.contract.path_template)
            .finish()
    }
}

/// Closure table keyed by method identifier.
pub struct StubTable<O, R> {
    stubs: HashMap<String, Stub<O, R>>,
}

impl<O, R> StubTable<O, R> {
    /// Build one stub per contract, all sharing `invoke`.
    ///
    /// Identifiers are unique; for a repeated id the first contract is kept.
    pub fn new(contracts: impl IntoIterator<Item = EndpointContract>, invoke: InvokeFn<O, R>) -> Self {
        let mut stubs = HashMap::new();
        for contract in contracts {
            match stubs.entry(contract.id.clone()) {
                Entry::Occupied(_) => {
                    tracing::warn!(id = %contract.id, path = %contract.path_template, "Duplicate contract id ignored");
                }
                Entry::Vacant(slot) => {
                    slot.insert(Stub {
                        contract: Arc::new(contract),
                        invoke: invoke.clone(),
                    });
                }
            }
        }
        Self { stubs }
    }

    pub fn get(&self, id: &str) -> Option<&Stub<O, R>> {
        self.stubs.get(id)
    }

    /// Call a stub by identifier. Returns `None` for unknown identifiers.
    pub fn call(&self, id: &str, options: O, args: Vec<Argument>) -> Option<BoxFuture<'static, R>> {
        self.stubs.get(id).map(|stub| stub.call(options, args))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.stubs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.stubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }
}

impl<O, R> fmt::Debug for StubTable<O, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubTable")
            .field("stubs", &self.stubs.len())
            .finish()
    }
}

/// Parse the contract list embedded in generated stubs.
pub fn contracts_from_json(json: &str) -> serde_json::Result<Vec<EndpointContract>> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{BindingKind, ParameterBinding, ReturnShape, Verb};
    use futures_util::FutureExt;

    fn contract(id: &str) -> EndpointContract {
        EndpointContract {
            id: id.into(),
            service: "Svc".into(),
            method: id.rsplit('.').next().unwrap_or_default().into(),
            verb: Verb::Post,
            path_template: "/svc".into(),
            parameter_bindings: vec![
                ParameterBinding::spread(0, BindingKind::Body),
                ParameterBinding::keyed(1, BindingKind::Query, "q"),
            ],
            file_upload: None,
            returns: ReturnShape::Value,
        }
    }

    #[tokio::test]
    async fn test_stub_forwards_arguments_in_order() {
        let invoke: InvokeFn<&'static str, (String, &'static str, Vec<Argument>)> =
            Arc::new(
                |contract: Arc<EndpointContract>, options: &'static str, args: Vec<Argument>| {
                    async move { (contract.id.clone(), options, args) }.boxed()
                },
            );
        let table = StubTable::new(vec![contract("Svc.a"), contract("Svc.b")], invoke);
        assert_eq!(table.len(), 2);

        let (id, options, args) = table
            .call("Svc.b", "opts", vec!["first".into(), "second".into()])
            .unwrap()
            .await;
        assert_eq!(id, "Svc.b");
        assert_eq!(options, "opts");
        assert_eq!(args, vec![Argument::from("first"), Argument::from("second")]);
    }

    #[test]
    fn test_unknown_id() {
        let invoke: InvokeFn<(), ()> = Arc::new(|_: Arc<EndpointContract>, _: (), _: Vec<Argument>| async {}.boxed());
        let table = StubTable::new(vec![contract("Svc.a")], invoke);
        assert!(table.call("Svc.missing", (), Vec::new()).is_none());
    }

    #[test]
    fn test_duplicate_id_keeps_first() {
        let invoke: InvokeFn<(), ()> = Arc::new(|_: Arc<EndpointContract>, _: (), _: Vec<Argument>| async {}.boxed());
        let mut second = contract("Svc.a");
        second.path_template = "/other".into();
        let table = StubTable::new(vec![contract("Svc.a"), second], invoke);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("Svc.a").unwrap().contract().path_template, "/svc");
    }

    #[test]
    fn test_contracts_from_json() {
        let json = serde_json::to_string(&vec![contract("Svc.a")]).unwrap();
        let parsed = contracts_from_json(&json).unwrap();
        assert_eq!(parsed, vec![contract("Svc.a")]);
    }
}
