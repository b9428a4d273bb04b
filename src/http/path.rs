//! Path template resolution.
//!
//! # Responsibilities
//! - Find `:name` placeholders in a template
//! - Substitute keyed path arguments and entries of object path arguments
//! - URL-encode every substituted value as a path component
//!
//! # Design Decisions
//! - A placeholder name is `[A-Za-z0-9_]+`, so `:id` never matches inside `:idx`
//! - Object entries without a matching placeholder are ignored here; the
//!   argument itself is untouched and stays available to other bindings
//! - Unresolved placeholders are left in place

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::contract::args::scalar_text;
use crate::contract::{Argument, BindingKind, EndpointContract};

/// Characters left as-is by component encoding.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode one path component.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Placeholder names in template order.
pub fn placeholders(template: &str) -> Vec<&str> {
    let bytes = template.as_bytes();
    let mut names = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b':' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && is_name_byte(bytes[end]) {
                end += 1;
            }
            if end > start {
                names.push(&template[start..end]);
            }
            i = end.max(i + 1);
        } else {
            i += 1;
        }
    }
    names
}

/// Replace placeholders for which `lookup` returns a value.
pub fn substitute(template: &str, mut lookup: impl FnMut(&str) -> Option<String>) -> String {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b':' {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && is_name_byte(bytes[end]) {
            end += 1;
        }
        if end > start {
            if let Some(value) = lookup(&template[start..end]) {
                out.push_str(&template[copied..i]);
                out.push_str(&value);
                copied = end;
            }
        }
        i = end.max(i + 1);
    }
    out.push_str(&template[copied..]);
    out
}

/// Resolve the contract's template against the call arguments.
pub fn resolve_path(contract: &EndpointContract, args: &[Argument]) -> String {
    let mut path = contract.path_template.clone();

    for binding in contract
        .parameter_bindings
        .iter()
        .filter(|b| b.kind == BindingKind::Path)
    {
        let Some(arg) = args.get(binding.arg_position) else {
            continue;
        };

        match &binding.key {
            Some(key) => {
                let Some(text) = arg.as_value().and_then(scalar_text) else {
                    continue;
                };
                path = substitute(&path, |name| (name == key).then(|| encode_component(&text)));
            }
            None => {
                let Some(entries) = arg.entries() else {
                    continue;
                };
                path = substitute(&path, |name| {
                    entries.get(name).and_then(scalar_text).map(|t| encode_component(&t))
                });
            }
        }
    }

    let unresolved = placeholders(&path);
    if !unresolved.is_empty() {
        tracing::debug!(
            contract = %contract.id,
            unresolved = ?unresolved,
            "Path placeholders left unresolved"
        );
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ParameterBinding, ReturnShape, Verb};
    use serde_json::json;

    fn contract(template: &str, bindings: Vec<ParameterBinding>) -> EndpointContract {
        EndpointContract {
            id: "T.t".into(),
            service: "T".into(),
            method: "t".into(),
            verb: Verb::Get,
            path_template: template.into(),
            parameter_bindings: bindings,
            file_upload: None,
            returns: ReturnShape::Value,
        }
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders("/a/:x/b/:y_2"), vec!["x", "y_2"]);
        assert_eq!(placeholders("/a/:/b"), Vec::<&str>::new());
    }

    #[test]
    fn test_keyed_and_object_bindings() {
        let c = contract(
            "/a/:x/b/:y",
            vec![
                ParameterBinding::keyed(0, BindingKind::Path, "x"),
                ParameterBinding::spread(1, BindingKind::Path),
            ],
        );
        let args = vec![Argument::from(json!(1)), Argument::from(json!({"y": 2, "z": 3}))];
        assert_eq!(resolve_path(&c, &args), "/a/1/b/2");
    }

    #[test]
    fn test_prefix_names_not_confused() {
        let c = contract(
            "/items/:idx/:id",
            vec![ParameterBinding::keyed(0, BindingKind::Path, "id")],
        );
        assert_eq!(resolve_path(&c, &["7".into()]), "/items/:idx/7");
    }

    #[test]
    fn test_values_are_encoded() {
        let c = contract(
            "/files/:name",
            vec![ParameterBinding::keyed(0, BindingKind::Path, "name")],
        );
        assert_eq!(
            resolve_path(&c, &["a b/c?d".into()]),
            "/files/a%20b%2Fc%3Fd"
        );
        assert_eq!(encode_component("it's-ok_(1)~"), "it's-ok_(1)~");
    }

    #[test]
    fn test_missing_argument_leaves_placeholder() {
        let c = contract(
            "/users/:id",
            vec![ParameterBinding::keyed(0, BindingKind::Path, "id")],
        );
        assert_eq!(resolve_path(&c, &[]), "/users/:id");
    }

    #[test]
    fn test_substituted_value_not_rescanned() {
        let c = contract(
            "/a/:x/:y",
            vec![
                ParameterBinding::keyed(0, BindingKind::Path, "x"),
                ParameterBinding::keyed(1, BindingKind::Path, "y"),
            ],
        );
        assert_eq!(resolve_path(&c, &[":y".into(), "2".into()]), "/a/%3Ay/2");
    }
}
