//! Event-stream field parsing.
//!
//! Lines go in, complete messages come out. An empty line ends a message.
//! Other lines split at the first colon into field and value, with one
//! leading space removed from the value.
//!
//! `retry` accepts ASCII digits only, read as milliseconds. Units, signs and
//! whitespace (`100ms`, `+5`, `1 000`) make the field invalid.

use crate::stream::types::{StreamError, StreamMessage, StreamResult};

/// Data value that marks logical completion and is never dispatched.
pub const DONE_SENTINEL: &str = "[DONE]";

/// What one line produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A blank line completed a message.
    Message(StreamMessage),
    /// An `id` field was seen.
    LastEventId(String),
    /// A valid `retry` field was seen.
    Retry(u64),
}

/// Accumulates fields of the message in progress.
#[derive(Debug, Default)]
pub struct EventParser {
    id: Option<String>,
    event: Option<String>,
    data: Option<String>,
    retry: Option<u64>,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line without its terminator.
    ///
    /// `Err(Protocol)` reports a malformed field; the parser stays usable.
    pub fn feed_line(&mut self, line: &[u8]) -> StreamResult<Option<LineEvent>> {
        if line.is_empty() {
            return Ok(self.flush().map(LineEvent::Message));
        }

        let line = String::from_utf8_lossy(line);
        if line.starts_with(':') {
            return Ok(None);
        }

        let (field, value) = match line.find(':') {
            Some(idx) => {
                let value = &line[idx + 1..];
                (&line[..idx], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (&*line, ""),
        };

        match field {
            "data" => {
                match &mut self.data {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => self.data = Some(value.to_string()),
                }
                Ok(None)
            }
            "event" => {
                self.event = Some(value.to_string());
                Ok(None)
            }
            "id" => {
                self.id = Some(value.to_string());
                Ok(Some(LineEvent::LastEventId(value.to_string())))
            }
            "retry" => match parse_retry(value) {
                Some(retry) => {
                    self.retry = Some(retry);
                    Ok(Some(LineEvent::Retry(retry)))
                }
                None => Err(StreamError::Protocol(format!(
                    "invalid retry value '{}'",
                    value
                ))),
            },
            _ => Ok(None),
        }
    }

    /// Take the message in progress. `None` when no field was set.
    pub fn flush(&mut self) -> Option<StreamMessage> {
        let fields = std::mem::take(self);
        if fields.id.is_none()
            && fields.event.is_none()
            && fields.data.is_none()
            && fields.retry.is_none()
        {
            return None;
        }
        Some(StreamMessage {
            id: fields.id.unwrap_or_default(),
            event: fields.event.unwrap_or_default(),
            data: fields.data.unwrap_or_default(),
            retry: fields.retry,
        })
    }
}

/// True for the completion sentinel.
pub fn is_done(message: &StreamMessage) -> bool {
    message.data == DONE_SENTINEL
}

/// Reconnection delay in milliseconds; digits only.
fn parse_retry(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut EventParser, lines: &[&str]) -> Vec<LineEvent> {
        lines
            .iter()
            .filter_map(|l| parser.feed_line(l.as_bytes()).ok().flatten())
            .collect()
    }

    #[test]
    fn test_multi_line_data() {
        let mut p = EventParser::new();
        let events = feed(&mut p, &["data: foo", "data: bar", ""]);
        assert_eq!(
            events,
            vec![LineEvent::Message(StreamMessage {
                data: "foo\nbar".into(),
                ..Default::default()
            })]
        );
    }

    #[test]
    fn test_fields_and_side_channels() {
        let mut p = EventParser::new();
        let events = feed(
            &mut p,
            &["event: update", "id: 42", "retry: 1500", "data:{\"a\":1}", ""],
        );
        assert_eq!(events[0], LineEvent::LastEventId("42".into()));
        assert_eq!(events[1], LineEvent::Retry(1500));
        assert_eq!(
            events[2],
            LineEvent::Message(StreamMessage {
                id: "42".into(),
                event: "update".into(),
                data: "{\"a\":1}".into(),
                retry: Some(1500),
            })
        );
    }

    #[test]
    fn test_only_one_space_stripped() {
        let mut p = EventParser::new();
        let events = feed(&mut p, &["data:  two", ""]);
        assert_eq!(
            events,
            vec![LineEvent::Message(StreamMessage {
                data: " two".into(),
                ..Default::default()
            })]
        );
    }

    #[test]
    fn test_comments_unknown_and_empty_messages() {
        let mut p = EventParser::new();
        let events = feed(&mut p, &[": keepalive", "", "foo: bar", "", ""]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_field_without_colon() {
        let mut p = EventParser::new();
        let events = feed(&mut p, &["data", ""]);
        assert_eq!(
            events,
            vec![LineEvent::Message(StreamMessage::default())]
        );
    }

    #[test]
    fn test_invalid_retry_is_protocol_error() {
        let mut p = EventParser::new();
        assert!(matches!(
            p.feed_line(b"retry: soon"),
            Err(StreamError::Protocol(_))
        ));
        p.feed_line(b"data: still fine").unwrap();
        let msg = p.flush().unwrap();
        assert_eq!(msg.data, "still fine");
        assert_eq!(msg.retry, None);
    }

    #[test]
    fn test_retry_requires_plain_digits() {
        let mut p = EventParser::new();
        let invalid: [&[u8]; 5] = [
            b"retry: 100ms",
            b"retry: +5",
            b"retry: 1 000",
            b"retry:",
            b"retry: 99999999999999999999999",
        ];
        for bad in invalid {
            assert!(
                matches!(p.feed_line(bad), Err(StreamError::Protocol(_))),
                "{}",
                String::from_utf8_lossy(bad)
            );
        }
        assert_eq!(p.feed_line(b"retry: 0250").unwrap(), Some(LineEvent::Retry(250)));
    }

    #[test]
    fn test_done_sentinel() {
        let msg = StreamMessage {
            data: DONE_SENTINEL.into(),
            ..Default::default()
        };
        assert!(is_done(&msg));
    }
}
