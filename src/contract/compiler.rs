//! Descriptor → contract compilation.
//!
//! # Responsibilities
//! - Join class prefix and method suffix into one path template
//! - Restate parameters as position-indexed bindings
//! - Keep event names verbatim for gateway handlers
//!
//! # Design Decisions
//! - Pure and deterministic: compiling twice yields equal contracts
//! - Argument position is the parameter's declaration index, nothing else

use crate::contract::types::{EndpointContract, ParameterBinding, Verb};
use crate::descriptor::{MethodDescriptor, ServiceDescriptor};

/// Join path pieces with exactly one `/` between them.
///
/// The result always starts with `/`, never ends with one (except root),
/// and has no empty segments.
pub fn join_path(prefix: Option<&str>, suffix: &str) -> String {
    let segments: Vec<&str> = prefix
        .unwrap_or_default()
        .split('/')
        .chain(suffix.split('/'))
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Compile one method of a service.
pub fn compile_method(service: &ServiceDescriptor, method: &MethodDescriptor) -> EndpointContract {
    let path_template = match method.verb {
        Verb::Event => method.path.clone(),
        _ => join_path(service.prefix.as_deref(), &method.path),
    };

    let parameter_bindings = method
        .params
        .iter()
        .enumerate()
        .map(|(arg_position, param)| ParameterBinding {
            arg_position,
            kind: param.kind,
            key: param.key.clone(),
            file_info: param.file_info.clone(),
        })
        .collect();

    EndpointContract {
        id: format!("{}.{}", service.name, method.name),
        service: service.name.clone(),
        method: method.name.clone(),
        verb: method.verb,
        path_template,
        parameter_bindings,
        file_upload: method.upload.clone(),
        returns: method.returns,
    }
}

/// Compile every method of a service.
pub fn compile_service(service: &ServiceDescriptor) -> Vec<EndpointContract> {
    service
        .methods
        .iter()
        .map(|m| compile_method(service, m))
        .collect()
}

/// Compile a batch of services, in order.
pub fn compile_all<'a>(services: impl IntoIterator<Item = &'a ServiceDescriptor>) -> Vec<EndpointContract> {
    let contracts: Vec<_> = services.into_iter().flat_map(compile_service).collect();
    tracing::debug!(contracts = contracts.len(), "Contracts compiled");
    contracts
}
