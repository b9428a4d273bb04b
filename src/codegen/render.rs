//! Rust stub rendering.
//!
//! Output is one self-contained module: the compiled contracts embedded as
//! JSON, a client struct per service with one async method per contract, and
//! helpers building runtime stub tables. Everything it needs comes from the
//! runtime crate's `prelude`.

use std::collections::HashSet;
use std::fmt::Write;

use crate::codegen::types::CodegenResult;
use crate::contract::{compile_service, BindingKind, EndpointContract};
use crate::descriptor::{MethodDescriptor, ServiceDescriptor, ServiceKind};

const RESERVED: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "new", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true",
    "try", "type", "unsafe", "use", "where", "while", "yield", "options",
];

/// `findOneByID` → `find_one_by_id`, made safe to use as an identifier.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_lower);
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }

    let mut out = out.trim_matches('_').to_string();
    if out.is_empty() {
        out.push_str("arg");
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if RESERVED.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

/// Client struct name for a service.
pub fn client_name(service: &str) -> String {
    let base = service
        .strip_suffix("Controller")
        .or_else(|| service.strip_suffix("Gateway"))
        .filter(|s| !s.is_empty())
        .unwrap_or(service);
    format!("{}Client", base)
}

/// Raw string literal that can hold `text` unescaped.
fn raw_string(text: &str) -> String {
    let mut longest = 0;
    let mut run = None;
    for c in text.chars() {
        match (c, run) {
            ('"', _) => run = Some(0),
            ('#', Some(n)) => {
                run = Some(n + 1);
                longest = longest.max(n + 1);
            }
            _ => run = None,
        }
    }
    let hashes = "#".repeat(longest + 1);
    format!("r{hashes}\"{text}\"{hashes}")
}

/// Services whose name and client struct name are not taken by an earlier one.
fn unique_services(services: &[ServiceDescriptor]) -> Vec<&ServiceDescriptor> {
    let mut names: HashSet<String> = HashSet::new();
    let mut clients: HashSet<String> = HashSet::new();
    services
        .iter()
        .filter(|service| {
            let client = client_name(&service.name);
            if names.contains(&service.name) || clients.contains(&client) {
                tracing::warn!(service = %service.name, client = %client, "Duplicate service not rendered");
                return false;
            }
            names.insert(service.name.clone());
            clients.insert(client);
            true
        })
        .collect()
}

/// Render the stub module for `services`.
///
/// A service whose name or client struct name repeats an earlier one is left
/// out, so every generated client indexes only its own contracts.
pub fn render_module(services: &[ServiceDescriptor], runtime_path: &str) -> CodegenResult<String> {
    let services = unique_services(services);
    let contracts: Vec<EndpointContract> = services.iter().flat_map(|s| compile_service(s)).collect();
    let json = serde_json::to_string_pretty(&contracts)?;

    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = render_into(&mut out, &services, runtime_path, &json);
    Ok(out)
}

fn render_into(
    out: &mut String,
    services: &[&ServiceDescriptor],
    runtime_path: &str,
    json: &str,
) -> std::fmt::Result {
    writeln!(out, "// @generated by wirecall-codegen. Do not edit.")?;
    writeln!(out, "#![allow(dead_code, clippy::too_many_arguments)]")?;
    writeln!(out)?;
    writeln!(out, "use {}::prelude::*;", runtime_path)?;
    writeln!(out)?;
    writeln!(out, "/// Compiled endpoint contracts.")?;
    writeln!(out, "pub const CONTRACTS_JSON: &str = {};", raw_string(json))?;
    writeln!(out)?;
    writeln!(out, "/// Parse the embedded contracts.")?;
    writeln!(out, "pub fn contracts() -> Result<Vec<EndpointContract>, JsonError> {{")?;
    writeln!(out, "    contracts_from_json(CONTRACTS_JSON)")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "/// Stub table over every HTTP contract.")?;
    writeln!(
        out,
        "pub fn http_stubs(dispatcher: &HttpDispatcher) -> Result<HttpStubTable, JsonError> {{"
    )?;
    writeln!(out, "    Ok(dispatcher.stub_table(contracts()?))")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "/// Stub table over every socket event contract.")?;
    writeln!(
        out,
        "pub fn event_stubs(dispatcher: &EventDispatcher) -> Result<EventStubTable, JsonError> {{"
    )?;
    writeln!(out, "    Ok(dispatcher.stub_table(contracts()?))")?;
    writeln!(out, "}}")?;

    for service in services {
        writeln!(out)?;
        render_service(out, service)?;
    }
    Ok(())
}

fn render_service(out: &mut String, service: &ServiceDescriptor) -> std::fmt::Result {
    let name = client_name(&service.name);
    let (dispatcher, options, result) = match service.kind {
        ServiceKind::Controller => ("HttpDispatcher", "RequestConfig", "DispatchResult<ResponseHandle>"),
        ServiceKind::Gateway => ("EventDispatcher", "EventOptions", "SocketResult<Value>"),
    };

    writeln!(out, "/// Client for `{}`.", service.name)?;
    writeln!(out, "#[derive(Debug, Clone)]")?;
    writeln!(out, "pub struct {} {{", name)?;
    writeln!(out, "    dispatcher: {},", dispatcher)?;
    writeln!(out, "    contracts: Vec<EndpointContract>,")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "impl {} {{", name)?;
    writeln!(out, "    pub fn new(dispatcher: {}) -> Result<Self, JsonError> {{", dispatcher)?;
    writeln!(out, "        let mut contracts = Vec::new();")?;
    writeln!(out, "        for contract in self::contracts()? {{")?;
    writeln!(out, "            if contract.service == {:?} {{", service.name)?;
    writeln!(out, "                contracts.push(contract);")?;
    writeln!(out, "            }}")?;
    writeln!(out, "        }}")?;
    writeln!(out, "        Ok(Self {{ dispatcher, contracts }})")?;
    writeln!(out, "    }}")?;

    for (index, method) in service.methods.iter().enumerate() {
        writeln!(out)?;
        render_method(out, service, method, index, options, result)?;
    }

    writeln!(out, "}}")?;
    Ok(())
}

fn render_method(
    out: &mut String,
    service: &ServiceDescriptor,
    method: &MethodDescriptor,
    index: usize,
    options: &str,
    result: &str,
) -> std::fmt::Result {
    let mut params = Vec::new();
    let mut args = Vec::new();
    for param in &method.params {
        if param.kind == BindingKind::RequestContext {
            args.push("Argument::from(Value::Null)".to_string());
            continue;
        }
        let mut ident = snake_case(&param.name);
        while params.iter().any(|p: &String| p.starts_with(&format!("{}:", ident))) {
            ident.push('_');
        }
        params.push(format!("{}: impl Into<Argument>", ident));
        args.push(format!("{}.into()", ident));
    }

    match service.kind {
        ServiceKind::Controller => writeln!(
            out,
            "    /// `{} {}`",
            method.verb,
            crate::contract::join_path(service.prefix.as_deref(), &method.path)
        )?,
        ServiceKind::Gateway => writeln!(out, "    /// Event `{}`", method.path)?,
    }

    let mut signature = format!("options: {}", options);
    for param in &params {
        signature.push_str(", ");
        signature.push_str(param);
    }

    writeln!(
        out,
        "    pub async fn {}(&self, {}) -> {} {{",
        snake_case(&method.name),
        signature,
        result
    )?;
    writeln!(out, "        let args = vec![{}];", args.join(", "))?;
    match service.kind {
        ServiceKind::Controller => writeln!(
            out,
            "        self.dispatcher.dispatch(&self.contracts[{}], &args, &options).await",
            index
        )?,
        ServiceKind::Gateway => writeln!(
            out,
            "        self.dispatcher.call(&self.contracts[{}], &args, &options).await",
            index
        )?,
    }
    writeln!(out, "    }}")?;
    Ok(())
}
