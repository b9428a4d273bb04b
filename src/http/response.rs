//! Unconsumed HTTP response handle.
//!
//! The dispatcher never reads the body. Callers either use one of the
//! buffering helpers or hand the body stream to the stream consumer.

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::http::types::{DispatchError, DispatchResult};

/// Chunked body stream.
pub type BodyStream = BoxStream<'static, Result<Bytes, DispatchError>>;

/// Status line and headers of a response whose body was taken.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseMeta {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Header value as text, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Response returned by the dispatcher, body still unread.
pub struct ResponseHandle {
    meta: ResponseMeta,
    body: BodyStream,
}

impl std::fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHandle")
            .field("status", &self.meta.status)
            .field("headers", &self.meta.headers)
            .finish_non_exhaustive()
    }
}

impl ResponseHandle {
    pub fn new(status: StatusCode, headers: HeaderMap, body: BodyStream) -> Self {
        Self {
            meta: ResponseMeta { status, headers },
            body,
        }
    }

    /// Wrap a reqwest response without reading its body.
    pub fn from_reqwest(response: reqwest::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(DispatchError::from))
            .boxed();
        Self::new(status, headers, body)
    }

    /// Build a handle from in-memory chunks.
    pub fn from_chunks<I, B>(status: StatusCode, headers: HeaderMap, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: Vec<Result<Bytes, DispatchError>> =
            chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::new(status, headers, stream::iter(chunks).boxed())
    }

    pub fn status(&self) -> StatusCode {
        self.meta.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.meta.headers
    }

    pub fn meta(&self) -> &ResponseMeta {
        &self.meta
    }

    pub fn is_success(&self) -> bool {
        self.meta.is_success()
    }

    /// Pass 2xx responses through; turn anything else into `DispatchError::Status`.
    ///
    /// The body of a failed response is read and kept in the error.
    pub async fn error_for_status(self) -> DispatchResult<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let status = self.status();
        let body = self.text().await.unwrap_or_default();
        Err(DispatchError::Status { status, body })
    }

    /// Read the whole body.
    pub async fn bytes(self) -> DispatchResult<Bytes> {
        let mut body = self.body;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Read the whole body as UTF-8, replacing invalid sequences.
    pub async fn text(self) -> DispatchResult<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read and deserialize a JSON body.
    pub async fn json<T: DeserializeOwned>(self) -> DispatchResult<T> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Take the body stream, dropping status and headers.
    pub fn into_body(self) -> BodyStream {
        self.body
    }

    pub fn into_parts(self) -> (ResponseMeta, BodyStream) {
        (self.meta, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_buffering_helpers() {
        let handle =
            ResponseHandle::from_chunks(StatusCode::OK, HeaderMap::new(), ["{\"a\":", "1}"]);
        let value: Value = handle.json().await.unwrap();
        assert_eq!(value["a"], 1);

        let handle = ResponseHandle::from_chunks(StatusCode::OK, HeaderMap::new(), ["he", "llo"]);
        assert_eq!(handle.text().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_error_for_status() {
        let handle = ResponseHandle::from_chunks(
            StatusCode::BAD_REQUEST,
            HeaderMap::new(),
            ["bad input"],
        );
        assert!(!handle.is_success());
        match handle.error_for_status().await {
            Err(DispatchError::Status { status, body }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body, "bad input");
            }
            other => panic!("unexpected: {:?}", other),
        }

        let ok = ResponseHandle::from_chunks(StatusCode::CREATED, HeaderMap::new(), [""]);
        assert!(ok.error_for_status().await.is_ok());
    }

    #[tokio::test]
    async fn test_body_error_propagates() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"x")),
            Err(DispatchError::Body("reset".into())),
        ])
        .boxed();
        let handle = ResponseHandle::new(StatusCode::OK, HeaderMap::new(), body);
        assert!(matches!(handle.bytes().await, Err(DispatchError::Body(_))));
    }
}
