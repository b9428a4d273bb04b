//! HTTP transport seam.
//!
//! The dispatcher hands a fully resolved [`OutgoingRequest`] to a transport
//! and gets back an unconsumed [`ResponseHandle`]. [`ReqwestTransport`] is the
//! default; tests plug in recording fakes.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};

use crate::http::response::ResponseHandle;
use crate::http::types::{
    DispatchError, DispatchResult, FormPart, FormValue, OutgoingRequest, RequestBody,
};

/// Sends one request and returns the response with its body unread.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: OutgoingRequest) -> DispatchResult<ResponseHandle>;
}

/// Transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn header_map(request: &OutgoingRequest) -> DispatchResult<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| DispatchError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| DispatchError::InvalidHeader(name.to_string()))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn form(parts: Vec<FormPart>) -> DispatchResult<Form> {
        let mut form = Form::new();
        for FormPart { name, value } in parts {
            form = match value {
                FormValue::Text(text) => form.text(name, text),
                FormValue::File(file) => {
                    let mut part = Part::bytes(file.bytes.to_vec()).file_name(file.file_name);
                    if let Some(content_type) = file.content_type {
                        part = part.mime_str(&content_type).map_err(|e| {
                            DispatchError::InvalidPart {
                                name: name.clone(),
                                reason: e.to_string(),
                            }
                        })?;
                    }
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> DispatchResult<ResponseHandle> {
        let headers = Self::header_map(&request)?;

        let mut builder = self
            .client
            .request(request.method, request.url.as_str())
            .headers(headers);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(parts) => builder.multipart(Self::form(parts)?),
        };

        let response = builder.send().await?;
        Ok(ResponseHandle::from_reqwest(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_invalid_header_rejected() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "v".to_string());
        let request = OutgoingRequest {
            method: reqwest::Method::GET,
            url: "http://localhost/".into(),
            query: vec![],
            headers,
            body: RequestBody::Empty,
            timeout: None,
        };
        assert!(matches!(
            ReqwestTransport::header_map(&request),
            Err(DispatchError::InvalidHeader(_))
        ));
    }
}
