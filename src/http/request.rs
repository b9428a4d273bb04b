//! Argument classification.
//!
//! # Responsibilities
//! - Walk the contract's bindings in order
//! - Route each argument into query, headers, JSON body or multipart form
//! - Leave request context and ignored arguments untouched
//!
//! # Data Flow
//! ```text
//! args[arg_position]
//!     → query   (keyed: one key, keyless: spread entries)
//!     → header  (same, names lowercased)
//!     → body    (JSON object, or multipart text fields when uploading)
//!     → file    (multipart file parts, shape from FileUploadSpec)
//! ```

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::contract::args::scalar_text;
use crate::contract::{
    Argument, BindingKind, EndpointContract, FilePart, FileUploadSpec, ParameterBinding,
    UploadShape,
};
use crate::http::types::{FormPart, RequestBody};

/// Request parts derived from the call arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedArgs {
    /// Query values by key; one entry per repeated key.
    pub query: BTreeMap<String, Vec<String>>,

    /// Lowercased header names.
    pub headers: BTreeMap<String, String>,

    pub body: RequestBody,
}

/// Classify call arguments against the contract's bindings.
pub fn classify(contract: &EndpointContract, args: &[Argument]) -> ClassifiedArgs {
    let mut out = ClassifiedArgs::default();
    let mut json_body = JsonBody::default();
    let mut form: Vec<FormPart> = Vec::new();
    let uploading = contract.file_upload.as_ref();

    for binding in &contract.parameter_bindings {
        let Some(arg) = args.get(binding.arg_position) else {
            continue;
        };

        match binding.kind {
            BindingKind::Query => classify_query(contract, binding, arg, &mut out.query),
            BindingKind::Header => classify_header(contract, binding, arg, &mut out.headers),
            BindingKind::Body => match uploading {
                Some(_) => body_form_fields(binding, arg, &mut form),
                None => merge_json_body(contract, binding, arg, &mut json_body),
            },
            BindingKind::File => {
                let spec = uploading.cloned().unwrap_or_else(|| implied_upload(binding));
                file_parts(&spec, binding, arg, &mut form);
            }
            BindingKind::Path | BindingKind::RequestContext | BindingKind::Ignored => {}
        }
    }

    out.body = if uploading.is_some() || !form.is_empty() {
        RequestBody::Multipart(form)
    } else {
        match json_body.finish() {
            Some(value) => RequestBody::Json(value),
            None => RequestBody::Empty,
        }
    };

    out
}

fn classify_query(
    contract: &EndpointContract,
    binding: &ParameterBinding,
    arg: &Argument,
    query: &mut BTreeMap<String, Vec<String>>,
) {
    let Some(value) = arg.as_value() else {
        return;
    };

    match &binding.key {
        Some(key) => {
            let values = query_values(value);
            if !values.is_empty() {
                query.insert(key.clone(), values);
            }
        }
        None => {
            let Some(entries) = value.as_object() else {
                tracing::debug!(contract = %contract.id, "Keyless query argument is not an object");
                return;
            };
            for (key, value) in entries {
                let values = query_values(value);
                if values.is_empty() {
                    continue;
                }
                if query.insert(key.clone(), values).is_some() {
                    tracing::debug!(contract = %contract.id, key = %key, "Query key overwritten");
                }
            }
        }
    }
}

/// Arrays become repeated keys.
fn query_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

fn header_value(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => {
            let joined: Vec<String> = items.iter().filter_map(scalar_text).collect();
            (!joined.is_empty()).then(|| joined.join(", "))
        }
        other => scalar_text(other),
    }
}

fn classify_header(
    contract: &EndpointContract,
    binding: &ParameterBinding,
    arg: &Argument,
    headers: &mut BTreeMap<String, String>,
) {
    let Some(value) = arg.as_value() else {
        return;
    };

    match &binding.key {
        Some(key) => {
            if let Some(text) = header_value(value) {
                headers.insert(key.to_ascii_lowercase(), text);
            }
        }
        None => {
            let Some(entries) = value.as_object() else {
                tracing::debug!(contract = %contract.id, "Keyless header argument is not an object");
                return;
            };
            for (name, value) in entries {
                if let Some(text) = header_value(value) {
                    headers.insert(name.to_ascii_lowercase(), text);
                }
            }
        }
    }
}

/// JSON payload under construction.
#[derive(Default)]
struct JsonBody {
    fields: Option<Map<String, Value>>,
    whole: Option<Value>,
}

impl JsonBody {
    fn fields(&mut self) -> &mut Map<String, Value> {
        self.whole = None;
        self.fields.get_or_insert_with(Map::new)
    }

    fn finish(self) -> Option<Value> {
        self.whole.or_else(|| self.fields.map(Value::Object))
    }
}

fn merge_json_body(
    contract: &EndpointContract,
    binding: &ParameterBinding,
    arg: &Argument,
    body: &mut JsonBody,
) {
    let value = arg.to_json();

    match &binding.key {
        Some(key) => {
            body.fields().insert(key.clone(), value);
        }
        None => match value {
            Value::Object(entries) => {
                let map = body.fields();
                for (key, value) in entries {
                    if map.insert(key.clone(), value).is_some() {
                        tracing::debug!(contract = %contract.id, key = %key, "Body field overwritten");
                    }
                }
            }
            // Non-object keyless body replaces the payload.
            other => {
                body.fields = None;
                body.whole = Some(other);
            }
        },
    }
}

fn body_form_fields(binding: &ParameterBinding, arg: &Argument, form: &mut Vec<FormPart>) {
    let Some(value) = arg.as_value() else {
        return;
    };

    match (&binding.key, value) {
        (Some(key), value) => {
            if let Some(text) = scalar_text(value) {
                form.push(FormPart::text(key.clone(), text));
            }
        }
        (None, Value::Object(entries)) => {
            for (key, value) in entries {
                if let Some(text) = scalar_text(value) {
                    form.push(FormPart::text(key.clone(), text));
                }
            }
        }
        (None, _) => {}
    }
}

/// Upload spec for a file binding on a contract that declared none.
fn implied_upload(binding: &ParameterBinding) -> FileUploadSpec {
    let field = binding.file_info.clone();
    let shape = match &field {
        Some(info) if info.is_array => UploadShape::Multiple,
        _ => UploadShape::Single,
    };
    FileUploadSpec {
        shape,
        fields: field.into_iter().collect(),
    }
}

fn field_name(spec: &FileUploadSpec, binding: &ParameterBinding) -> String {
    binding
        .file_info
        .as_ref()
        .map(|f| f.name.clone())
        .or_else(|| binding.key.clone())
        .or_else(|| spec.fields.first().map(|f| f.name.clone()))
        .unwrap_or_else(|| "file".to_string())
}

fn file_parts(
    spec: &FileUploadSpec,
    binding: &ParameterBinding,
    arg: &Argument,
    form: &mut Vec<FormPart>,
) {
    let push_all = |name: &str, files: &[FilePart], form: &mut Vec<FormPart>| {
        form.extend(files.iter().map(|f| FormPart::file(name, f.clone())));
    };

    match spec.shape {
        UploadShape::Single | UploadShape::Multiple => {
            let name = field_name(spec, binding);
            match arg {
                Argument::File(file) => form.push(FormPart::file(name, file.clone())),
                Argument::Files(files) => push_all(&name, files, form),
                Argument::FileMap(map) => {
                    for files in map.values() {
                        push_all(&name, files, form);
                    }
                }
                Argument::Value(_) => {}
            }
        }
        UploadShape::NamedMultiple => match arg {
            Argument::FileMap(map) => {
                for field in &spec.fields {
                    if let Some(files) = map.get(&field.name) {
                        push_all(&field.name, files, form);
                    }
                }
                for (name, files) in map {
                    if spec.field(name).is_none() {
                        tracing::debug!(field = %name, "Upload field not declared, appending");
                        push_all(name, files, form);
                    }
                }
            }
            Argument::File(file) => form.push(FormPart::file(field_name(spec, binding), file.clone())),
            Argument::Files(files) => push_all(&field_name(spec, binding), files, form),
            Argument::Value(_) => {}
        },
    }
}
