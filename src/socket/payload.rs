//! Event payload classification.
//!
//! Keyed body bindings set payload fields and keyless object bindings are
//! shallow-merged, later bindings winning. Without any body binding the
//! arguments themselves are the payload: one argument verbatim, several as
//! an array, none as `null`. Positions bound to server-side context never
//! reach the payload.

use serde_json::{Map, Value};

use crate::contract::{Argument, BindingKind, EndpointContract};

/// Build the payload of one outbound event.
pub fn build_payload(contract: &EndpointContract, args: &[Argument]) -> Value {
    let body: Vec<_> = contract
        .parameter_bindings
        .iter()
        .filter(|b| b.kind == BindingKind::Body)
        .collect();

    if body.is_empty() {
        return verbatim(contract, args);
    }

    let mut fields = Map::new();
    let mut whole: Option<Value> = None;

    for binding in body {
        let Some(arg) = args.get(binding.arg_position) else {
            continue;
        };
        let value = arg.to_json();

        match (&binding.key, value) {
            (Some(key), value) => {
                whole = None;
                fields.insert(key.clone(), value);
            }
            (None, Value::Object(entries)) => {
                whole = None;
                for (key, value) in entries {
                    if fields.insert(key.clone(), value).is_some() {
                        tracing::debug!(contract = %contract.id, key = %key, "Payload field overwritten");
                    }
                }
            }
            (None, other) => {
                fields.clear();
                whole = Some(other);
            }
        }
    }

    whole.unwrap_or(Value::Object(fields))
}

fn verbatim(contract: &EndpointContract, args: &[Argument]) -> Value {
    let mut values: Vec<Value> = args
        .iter()
        .enumerate()
        .filter(|(position, _)| {
            !contract
                .parameter_bindings
                .iter()
                .any(|b| b.arg_position == *position && b.kind == BindingKind::RequestContext)
        })
        .map(|(_, arg)| arg.to_json())
        .collect();

    match values.len() {
        0 => Value::Null,
        1 => values.remove(0),
        _ => Value::Array(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ParameterBinding, ReturnShape, Verb};
    use serde_json::json;

    fn contract(bindings: Vec<ParameterBinding>) -> EndpointContract {
        EndpointContract {
            id: "Chat.send".into(),
            service: "Chat".into(),
            method: "send".into(),
            verb: Verb::Event,
            path_template: "message".into(),
            parameter_bindings: bindings,
            file_upload: None,
            returns: ReturnShape::Value,
        }
    }

    #[test]
    fn test_keyed_and_merged_fields() {
        let c = contract(vec![
            ParameterBinding::keyed(0, BindingKind::Body, "room"),
            ParameterBinding::spread(1, BindingKind::Body),
        ]);
        let payload = build_payload(&c, &["lobby".into(), json!({"text": "hi", "room": "x"}).into()]);
        assert_eq!(payload, json!({"room": "x", "text": "hi"}));
    }

    #[test]
    fn test_without_bindings() {
        let c = contract(vec![]);
        assert_eq!(build_payload(&c, &[]), Value::Null);
        assert_eq!(build_payload(&c, &["a".into()]), json!("a"));
        assert_eq!(build_payload(&c, &["a".into(), 2i64.into()]), json!(["a", 2]));
    }

    #[test]
    fn test_context_positions_skipped() {
        let c = contract(vec![ParameterBinding::spread(0, BindingKind::RequestContext)]);
        assert_eq!(
            build_payload(&c, &[Value::Null.into(), json!({"x": 1}).into()]),
            json!({"x": 1})
        );
    }

    #[test]
    fn test_keyless_scalar_body_sent_as_is() {
        let c = contract(vec![ParameterBinding::spread(0, BindingKind::Body)]);
        assert_eq!(build_payload(&c, &["ping".into()]), json!("ping"));
    }
}
