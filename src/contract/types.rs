//! Endpoint contract definitions.
//!
//! A contract is the compiled, immutable description of one remote-callable
//! method. All types derive Serde traits so contracts can be written to disk at
//! build time and embedded into generated stubs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire verb of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    /// Server-sent events: a GET whose body is consumed as a stream.
    Sse,
    /// Socket gateway handler; the path template holds the event name.
    Event,
}

impl Verb {
    /// Parse a verb decorator name (`Get`, `Post`, ...).
    pub fn from_decorator(name: &str) -> Option<Self> {
        match name {
            "Get" => Some(Verb::Get),
            "Post" => Some(Verb::Post),
            "Put" => Some(Verb::Put),
            "Delete" => Some(Verb::Delete),
            "Patch" => Some(Verb::Patch),
            "Options" => Some(Verb::Options),
            "Head" => Some(Verb::Head),
            "Sse" => Some(Verb::Sse),
            "SubscribeMessage" => Some(Verb::Event),
            _ => None,
        }
    }

    /// The HTTP method actually sent on the wire.
    ///
    /// Returns `None` for socket events.
    pub fn http_method(self) -> Option<reqwest::Method> {
        match self {
            Verb::Get | Verb::Sse => Some(reqwest::Method::GET),
            Verb::Post => Some(reqwest::Method::POST),
            Verb::Put => Some(reqwest::Method::PUT),
            Verb::Delete => Some(reqwest::Method::DELETE),
            Verb::Patch => Some(reqwest::Method::PATCH),
            Verb::Options => Some(reqwest::Method::OPTIONS),
            Verb::Head => Some(reqwest::Method::HEAD),
            Verb::Event => None,
        }
    }

    pub fn is_event(self) -> bool {
        matches!(self, Verb::Event)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Patch => "PATCH",
            Verb::Options => "OPTIONS",
            Verb::Head => "HEAD",
            Verb::Sse => "SSE",
            Verb::Event => "EVENT",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target namespace of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    Path,
    Query,
    Header,
    Body,
    File,
    /// Server-only context object (request, socket, ...). No-op on the client.
    RequestContext,
    Ignored,
}

/// Declared field of a file upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileFieldInfo {
    /// Multipart field name.
    pub name: String,

    /// Whether the field carries several files.
    #[serde(default)]
    pub is_array: bool,

    /// Advisory upper bound; never enforced client-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u32>,
}

/// Maps one call-site argument position to a request part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterBinding {
    /// Zero-based argument position at the call site.
    pub arg_position: usize,

    pub kind: BindingKind,

    /// Target name. `None` means the argument's entries are spread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileFieldInfo>,
}

impl ParameterBinding {
    pub fn keyed(arg_position: usize, kind: BindingKind, key: impl Into<String>) -> Self {
        Self {
            arg_position,
            kind,
            key: Some(key.into()),
            file_info: None,
        }
    }

    pub fn spread(arg_position: usize, kind: BindingKind) -> Self {
        Self {
            arg_position,
            kind,
            key: None,
            file_info: None,
        }
    }
}

/// How files are laid out in the multipart body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadShape {
    Single,
    Multiple,
    NamedMultiple,
}

/// File upload description of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileUploadSpec {
    pub shape: UploadShape,
    pub fields: Vec<FileFieldInfo>,
}

impl FileUploadSpec {
    /// Look up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FileFieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Declared return shape of the remote method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReturnShape {
    Void,
    #[default]
    Value,
}

/// Compiled, immutable description of one remote-callable method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointContract {
    /// Method identifier, `"<Service>.<method>"`.
    pub id: String,

    pub service: String,

    pub method: String,

    pub verb: Verb,

    /// Resolved path template (`/users/:id`), or the event name for sockets.
    pub path_template: String,

    pub parameter_bindings: Vec<ParameterBinding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_upload: Option<FileUploadSpec>,

    #[serde(default)]
    pub returns: ReturnShape,
}

impl EndpointContract {
    /// True when the body is sent as multipart form data.
    pub fn has_file_upload(&self) -> bool {
        self.file_upload.is_some()
    }

    /// Event name for socket contracts.
    pub fn event_name(&self) -> &str {
        &self.path_template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_http_method() {
        assert_eq!(Verb::Sse.http_method(), Some(reqwest::Method::GET));
        assert_eq!(Verb::Patch.http_method(), Some(reqwest::Method::PATCH));
        assert_eq!(Verb::Event.http_method(), None);
    }

    #[test]
    fn test_verb_from_decorator() {
        assert_eq!(Verb::from_decorator("Delete"), Some(Verb::Delete));
        assert_eq!(Verb::from_decorator("SubscribeMessage"), Some(Verb::Event));
        assert_eq!(Verb::from_decorator("Controller"), None);
    }

    #[test]
    fn test_contract_json_shape() {
        let contract = EndpointContract {
            id: "Users.find".into(),
            service: "Users".into(),
            method: "find".into(),
            verb: Verb::Get,
            path_template: "/users/:id".into(),
            parameter_bindings: vec![ParameterBinding::keyed(0, BindingKind::Path, "id")],
            file_upload: None,
            returns: ReturnShape::Value,
        };

        let json = serde_json::to_value(&contract).unwrap();
        assert_eq!(json["verb"], "GET");
        assert_eq!(json["parameter_bindings"][0]["kind"], "path");
        assert!(json.get("file_upload").is_none());
    }
}
