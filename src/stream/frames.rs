//! Typed data frames carried as event-stream data.

use serde::{Deserialize, Serialize};

/// One increment of a structured response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DataFrame {
    Start {
        #[serde(default, rename = "messageId", skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    TextStart {
        #[serde(default)]
        id: String,
    },
    TextDelta {
        #[serde(default)]
        id: String,
        delta: String,
    },
    TextEnd {
        #[serde(default)]
        id: String,
    },
    ReasoningDelta {
        #[serde(default)]
        id: String,
        delta: String,
    },
    Error {
        #[serde(rename = "errorText")]
        error_text: String,
    },
    Finish {},
}

impl DataFrame {
    /// Parse one frame. Unrecognized shapes yield `None`.
    pub fn parse(data: &str) -> Option<Self> {
        match serde_json::from_str(data) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::trace!(error = %e, "Ignoring unrecognized data frame");
                None
            }
        }
    }

    /// Text carried by a delta frame.
    pub fn text_delta(&self) -> Option<&str> {
        match self {
            DataFrame::TextDelta { delta, .. } => Some(delta),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_frames() {
        assert_eq!(
            DataFrame::parse(r#"{"type":"text-delta","id":"t1","delta":"Hel"}"#),
            Some(DataFrame::TextDelta {
                id: "t1".into(),
                delta: "Hel".into()
            })
        );
        assert_eq!(
            DataFrame::parse(r#"{"type":"start","messageId":"m1"}"#),
            Some(DataFrame::Start {
                message_id: Some("m1".into())
            })
        );
        assert_eq!(
            DataFrame::parse(r#"{"type":"error","errorText":"boom"}"#),
            Some(DataFrame::Error {
                error_text: "boom".into()
            })
        );
        assert_eq!(DataFrame::parse(r#"{"type":"finish"}"#), Some(DataFrame::Finish {}));
    }

    #[test]
    fn test_unrecognized_frames() {
        assert_eq!(DataFrame::parse(r#"{"type":"tool-call","x":1}"#), None);
        assert_eq!(DataFrame::parse("not json"), None);
        assert_eq!(DataFrame::parse(r#"{"type":"text-delta"}"#), None);
    }
}
