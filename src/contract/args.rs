//! Call-site arguments.

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One file destined for a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A positional argument passed to a stub.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Value(Value),
    File(FilePart),
    Files(Vec<FilePart>),
    /// Field name to files, for named multiple uploads.
    FileMap(BTreeMap<String, Vec<FilePart>>),
}

impl Argument {
    /// Serialize any value into a JSON argument.
    pub fn json<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_value(value).map(Argument::Value)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Argument::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Own entries of an object argument; empty for anything else.
    pub fn entries(&self) -> Option<&Map<String, Value>> {
        match self {
            Argument::Value(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// JSON view used when the argument lands in a payload.
    pub fn to_json(&self) -> Value {
        match self {
            Argument::Value(v) => v.clone(),
            Argument::File(f) => Value::String(f.file_name.clone()),
            Argument::Files(files) => Value::Array(
                files
                    .iter()
                    .map(|f| Value::String(f.file_name.clone()))
                    .collect(),
            ),
            Argument::FileMap(map) => Value::Object(
                map.iter()
                    .map(|(k, files)| {
                        let names = files
                            .iter()
                            .map(|f| Value::String(f.file_name.clone()))
                            .collect();
                        (k.clone(), Value::Array(names))
                    })
                    .collect(),
            ),
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Value(value)
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Argument::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Argument::Value(Value::String(value))
    }
}

impl From<i64> for Argument {
    fn from(value: i64) -> Self {
        Argument::Value(Value::from(value))
    }
}

impl From<u64> for Argument {
    fn from(value: u64) -> Self {
        Argument::Value(Value::from(value))
    }
}

impl From<bool> for Argument {
    fn from(value: bool) -> Self {
        Argument::Value(Value::Bool(value))
    }
}

impl From<FilePart> for Argument {
    fn from(value: FilePart) -> Self {
        Argument::File(value)
    }
}

impl From<Vec<FilePart>> for Argument {
    fn from(value: Vec<FilePart>) -> Self {
        Argument::Files(value)
    }
}

impl From<BTreeMap<String, Vec<FilePart>>> for Argument {
    fn from(value: BTreeMap<String, Vec<FilePart>>) -> Self {
        Argument::FileMap(value)
    }
}

/// Render a scalar JSON value the way it appears in a query string or header.
///
/// `null` renders as nothing.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
