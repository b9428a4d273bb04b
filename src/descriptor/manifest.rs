//! Structured manifest front end.
//!
//! For services that have no decorated source, descriptors can be written by
//! hand in TOML using the same schema the parser produces.

use serde::Deserialize;

use crate::descriptor::types::{DescriptorError, DescriptorResult, ServiceDescriptor};

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default, rename = "service")]
    services: Vec<ServiceDescriptor>,
}

/// Parse a TOML descriptor manifest.
pub fn parse_manifest(content: &str) -> DescriptorResult<Vec<ServiceDescriptor>> {
    let manifest: Manifest =
        toml::from_str(content).map_err(|e| DescriptorError::Manifest(e.to_string()))?;
    Ok(manifest.services)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{BindingKind, ReturnShape, Verb};

    #[test]
    fn test_parse_manifest() {
        let services = parse_manifest(
            r#"
[[service]]
name = "Orders"
prefix = "/orders/"

[[service.method]]
name = "get"
verb = "GET"
path = ":id"

[[service.method.param]]
name = "id"
kind = "path"
key = "id"

[[service.method]]
name = "notify"
verb = "EVENT"
path = "orders:notify"
returns = "void"
"#,
        )
        .unwrap();

        assert_eq!(services.len(), 1);
        let methods = &services[0].methods;
        assert_eq!(methods[0].verb, Verb::Get);
        assert_eq!(methods[0].params[0].kind, BindingKind::Path);
        assert_eq!(methods[1].returns, ReturnShape::Void);
    }

    #[test]
    fn test_invalid_manifest() {
        let err = parse_manifest("[[service]]\nname = 1").unwrap_err();
        assert!(matches!(err, DescriptorError::Manifest(_)));
    }
}
