//! Stream consumer: drives one response body through the decoders.
//!
//! # Lifecycle
//! ```text
//! Idle
//!   → on_open(meta)            (may reject; nothing is read yet)
//! Opened
//!   → loop { next chunk | cancelled }
//! Streaming
//!   → body ends      → on_close → on_finish   (Finished)
//!   → token fires    → on_close → on_finish   (Aborted)
//!   → error          → on_error → on_finish   (Errored)
//!                      or on_finish, then Err to the caller
//! ```
//!
//! # Design Decisions
//! - Cancellation is raced only against the next chunk; a received chunk is
//!   always decoded completely
//! - Malformed fields and frames are logged and skipped
//! - JSON callbacks only see data that parses

use futures_util::{Stream, StreamExt};
use serde_json::Value;
use std::fmt::Display;
use tokio_util::sync::CancellationToken;

use crate::http::response::{ResponseHandle, ResponseMeta};
use crate::observability::metrics;
use crate::stream::event::{is_done, EventParser, LineEvent};
use crate::stream::frames::DataFrame;
use crate::stream::lines::LineSplitter;
use crate::stream::text::Utf8Decoder;
use crate::stream::types::{
    CallbackResult, StreamError, StreamMessage, StreamMode, StreamOutcome, StreamResult,
};

type Hook<'a, T> = Option<Box<dyn FnMut(T) -> CallbackResult + Send + 'a>>;
type Notify<'a> = Option<Box<dyn FnMut() + Send + 'a>>;

/// Callback-driven decoder for one response body.
///
/// ```no_run
/// # async fn run(handle: wirecall::http::ResponseHandle) -> wirecall::stream::StreamResult<()> {
/// use wirecall::stream::StreamConsumer;
///
/// StreamConsumer::events()
///     .on_message(|msg| {
///         println!("{}: {}", msg.event, msg.data);
///         Ok(())
///     })
///     .consume(handle)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct StreamConsumer<'a> {
    mode: StreamMode,
    on_open: Option<Box<dyn FnMut(&ResponseMeta) -> CallbackResult + Send + 'a>>,
    on_message: Option<Box<dyn FnMut(&StreamMessage) -> CallbackResult + Send + 'a>>,
    on_json: Hook<'a, Value>,
    on_text: Option<Box<dyn FnMut(&str) -> CallbackResult + Send + 'a>>,
    on_frame: Hook<'a, DataFrame>,
    on_last_event_id: Option<Box<dyn FnMut(&str) + Send + 'a>>,
    on_retry: Option<Box<dyn FnMut(u64) + Send + 'a>>,
    on_close: Notify<'a>,
    on_finish: Notify<'a>,
    on_error: Option<Box<dyn FnMut(&StreamError) + Send + 'a>>,
    cancel: Option<CancellationToken>,
}

impl<'a> StreamConsumer<'a> {
    pub fn new(mode: StreamMode) -> Self {
        Self {
            mode,
            on_open: None,
            on_message: None,
            on_json: None,
            on_text: None,
            on_frame: None,
            on_last_event_id: None,
            on_retry: None,
            on_close: None,
            on_finish: None,
            on_error: None,
            cancel: None,
        }
    }

    /// Event-stream framing.
    pub fn events() -> Self {
        Self::new(StreamMode::Events)
    }

    /// Raw text chunks.
    pub fn text() -> Self {
        Self::new(StreamMode::Text)
    }

    /// Event-stream framing with typed data frames.
    pub fn frames() -> Self {
        Self::new(StreamMode::Frames)
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    /// Inspect status and headers before reading; an error aborts the run.
    pub fn on_open(
        mut self,
        f: impl FnMut(&ResponseMeta) -> CallbackResult + Send + 'a,
    ) -> Self {
        self.on_open = Some(Box::new(f));
        self
    }

    pub fn on_message(
        mut self,
        f: impl FnMut(&StreamMessage) -> CallbackResult + Send + 'a,
    ) -> Self {
        self.on_message = Some(Box::new(f));
        self
    }

    /// Receives message data that parses as JSON.
    pub fn on_json(mut self, f: impl FnMut(Value) -> CallbackResult + Send + 'a) -> Self {
        self.on_json = Some(Box::new(f));
        self
    }

    /// Receives decoded text in text mode.
    pub fn on_text(mut self, f: impl FnMut(&str) -> CallbackResult + Send + 'a) -> Self {
        self.on_text = Some(Box::new(f));
        self
    }

    /// Receives recognized frames in frames mode.
    pub fn on_frame(mut self, f: impl FnMut(DataFrame) -> CallbackResult + Send + 'a) -> Self {
        self.on_frame = Some(Box::new(f));
        self
    }

    pub fn on_last_event_id(mut self, f: impl FnMut(&str) + Send + 'a) -> Self {
        self.on_last_event_id = Some(Box::new(f));
        self
    }

    pub fn on_retry(mut self, f: impl FnMut(u64) + Send + 'a) -> Self {
        self.on_retry = Some(Box::new(f));
        self
    }

    pub fn on_close(mut self, f: impl FnMut() + Send + 'a) -> Self {
        self.on_close = Some(Box::new(f));
        self
    }

    pub fn on_finish(mut self, f: impl FnMut() + Send + 'a) -> Self {
        self.on_finish = Some(Box::new(f));
        self
    }

    /// Handle errors here instead of returning them.
    pub fn on_error(mut self, f: impl FnMut(&StreamError) + Send + 'a) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Validate the response, then consume its body.
    pub async fn consume(mut self, response: ResponseHandle) -> StreamResult<StreamOutcome> {
        let (meta, body) = response.into_parts();

        if let Some(on_open) = self.on_open.as_mut() {
            if let Err(e) = on_open(&meta) {
                tracing::debug!(status = meta.status.as_u16(), error = %e, "Stream rejected on open");
                return self.fail(StreamError::Validation(e.to_string()));
            }
        }

        self.consume_stream(body).await
    }

    /// Consume a body stream directly, without an open hook.
    pub async fn consume_stream<S, E>(mut self, body: S) -> StreamResult<StreamOutcome>
    where
        S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
        E: Display,
    {
        let mut body = body;
        let mut decoder = Decoder::new(self.mode);
        let cancel = self.cancel.clone();

        loop {
            let next = match &cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::debug!(mode = self.mode.as_str(), "Stream cancelled");
                        metrics::record_stream_messages(self.mode.as_str(), decoder.messages);
                        return Ok(self.end(StreamOutcome::Aborted));
                    }
                    chunk = body.next() => chunk,
                },
                None => body.next().await,
            };

            match next {
                Some(Ok(chunk)) => {
                    if let Err(e) = decoder.chunk(&chunk, &mut self) {
                        metrics::record_stream_messages(self.mode.as_str(), decoder.messages);
                        return self.fail(e);
                    }
                }
                Some(Err(e)) => {
                    metrics::record_stream_messages(self.mode.as_str(), decoder.messages);
                    return self.fail(StreamError::Body(e.to_string()));
                }
                None => break,
            }
        }

        let flushed = decoder.finish(&mut self);
        metrics::record_stream_messages(self.mode.as_str(), decoder.messages);
        if let Err(e) = flushed {
            return self.fail(e);
        }
        Ok(self.end(StreamOutcome::Finished))
    }

    fn end(mut self, outcome: StreamOutcome) -> StreamOutcome {
        if let Some(on_close) = self.on_close.as_mut() {
            on_close();
        }
        if let Some(on_finish) = self.on_finish.as_mut() {
            on_finish();
        }
        outcome
    }

    fn fail(mut self, error: StreamError) -> StreamResult<StreamOutcome> {
        tracing::debug!(mode = self.mode.as_str(), error = %error, "Stream failed");
        let handled = match self.on_error.as_mut() {
            Some(on_error) => {
                on_error(&error);
                true
            }
            None => false,
        };
        if let Some(on_finish) = self.on_finish.as_mut() {
            on_finish();
        }
        if handled {
            Ok(StreamOutcome::Errored)
        } else {
            Err(error)
        }
    }

    fn dispatch_message(&mut self, message: StreamMessage) -> StreamResult<bool> {
        if is_done(&message) {
            tracing::trace!("Completion sentinel received");
            return Ok(false);
        }

        if let Some(on_message) = self.on_message.as_mut() {
            on_message(&message).map_err(|e| StreamError::Callback(e.to_string()))?;
        }

        if self.mode == StreamMode::Frames {
            if let Some(on_frame) = self.on_frame.as_mut() {
                if let Some(frame) = DataFrame::parse(&message.data) {
                    on_frame(frame).map_err(|e| StreamError::Callback(e.to_string()))?;
                }
            }
        }

        if let Some(on_json) = self.on_json.as_mut() {
            match serde_json::from_str::<Value>(&message.data) {
                Ok(value) => on_json(value).map_err(|e| StreamError::Callback(e.to_string()))?,
                Err(e) => tracing::trace!(error = %e, "Message data is not JSON"),
            }
        }

        Ok(true)
    }
}

/// Per-run decoding state.
struct Decoder {
    lines: LineSplitter,
    parser: EventParser,
    text: Utf8Decoder,
    mode: StreamMode,
    messages: u64,
}

impl Decoder {
    fn new(mode: StreamMode) -> Self {
        Self {
            lines: LineSplitter::new(),
            parser: EventParser::new(),
            text: Utf8Decoder::new(),
            mode,
            messages: 0,
        }
    }

    fn chunk(&mut self, chunk: &[u8], consumer: &mut StreamConsumer<'_>) -> StreamResult<()> {
        if self.mode == StreamMode::Text {
            let text = self.text.decode(chunk);
            return self.emit_text(&text, consumer);
        }

        for line in self.lines.push(chunk) {
            match self.parser.feed_line(&line) {
                Ok(Some(LineEvent::Message(message))) => {
                    if consumer.dispatch_message(message)? {
                        self.messages += 1;
                    }
                }
                Ok(Some(LineEvent::LastEventId(id))) => {
                    if let Some(f) = consumer.on_last_event_id.as_mut() {
                        f(&id);
                    }
                }
                Ok(Some(LineEvent::Retry(retry))) => {
                    if let Some(f) = consumer.on_retry.as_mut() {
                        f(retry);
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Skipping malformed stream field"),
            }
        }
        Ok(())
    }

    fn finish(&mut self, consumer: &mut StreamConsumer<'_>) -> StreamResult<()> {
        if self.mode == StreamMode::Text {
            let text = self.text.finish();
            return self.emit_text(&text, consumer);
        }

        let dropped = self.lines.finish();
        if dropped > 0 {
            tracing::debug!(bytes = dropped, "Discarding unterminated trailing line");
        }
        Ok(())
    }

    fn emit_text(&mut self, text: &str, consumer: &mut StreamConsumer<'_>) -> StreamResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.messages += 1;
        match consumer.on_text.as_mut() {
            Some(f) => f(text).map_err(|e| StreamError::Callback(e.to_string())),
            None => Ok(()),
        }
    }
}
