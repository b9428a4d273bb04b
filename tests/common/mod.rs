//! Shared utilities for integration testing.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::Message;

/// A request as seen by a mock backend.
#[allow(dead_code)]
#[derive(Debug, Clone, Default)]
pub struct CapturedRequest {
    pub method: String,
    /// Path including the query string.
    pub target: String,
    /// Lowercased header names.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    #[allow(dead_code)]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Response written by a mock backend. The body is sent in pieces with an
/// optional pause before each, and ends when the connection closes.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub chunks: Vec<(Duration, Vec<u8>)>,
}

#[allow(dead_code)]
impl MockResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".into(), "application/json".into())],
            chunks: vec![(Duration::ZERO, body.as_bytes().to_vec())],
        }
    }

    pub fn event_stream(chunks: &[(u64, &str)]) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".into(), "text/event-stream".into())],
            chunks: chunks
                .iter()
                .map(|(ms, text)| (Duration::from_millis(*ms), text.as_bytes().to_vec()))
                .collect(),
        }
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let headers: BTreeMap<String, String> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < length {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&tmp[..n]);
    }

    Some(CapturedRequest {
        method,
        target,
        headers,
        body,
    })
}

/// Start a mock HTTP backend that records every request and answers each
/// with the response built by `respond`.
#[allow(dead_code)]
pub async fn start_mock_backend<F>(respond: F) -> (SocketAddr, Arc<Mutex<Vec<CapturedRequest>>>)
where
    F: Fn(&CapturedRequest) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let log = captured.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let respond = respond.clone();
                    let log = log.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let response = respond(&request);
                        log.lock().unwrap().push(request);

                        let mut head = format!(
                            "HTTP/1.1 {} {}\r\nConnection: close\r\n",
                            response.status,
                            status_text(response.status)
                        );
                        for (name, value) in &response.headers {
                            head.push_str(&format!("{}: {}\r\n", name, value));
                        }
                        head.push_str("\r\n");
                        if socket.write_all(head.as_bytes()).await.is_err() {
                            return;
                        }

                        for (pause, chunk) in response.chunks {
                            if !pause.is_zero() {
                                tokio::time::sleep(pause).await;
                            }
                            if socket.write_all(&chunk).await.is_err() {
                                return;
                            }
                            let _ = socket.flush().await;
                        }
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, captured)
}

/// Start a WebSocket backend speaking the `{"event","data","ack"}` frame format.
///
/// Every received frame is recorded. Frames carrying an ack id are answered
/// with `{"ack": id, "data": reply(event, data)}`; frames without one are
/// pushed back as `{"event": "echo", "data": data}`.
#[allow(dead_code)]
pub async fn start_ws_backend<F>(reply: F) -> (String, Arc<Mutex<Vec<serde_json::Value>>>)
where
    F: Fn(&str, &serde_json::Value) -> Option<serde_json::Value> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    let reply = Arc::new(reply);

    let log = received.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let reply = reply.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    let Message::Text(text) = message else {
                        continue;
                    };
                    let Ok(frame) = serde_json::from_str::<serde_json::Value>(text.as_str()) else {
                        continue;
                    };
                    log.lock().unwrap().push(frame.clone());

                    let Some(ack) = frame.get("ack").cloned() else {
                        let echo = serde_json::json!({"event": "echo", "data": frame["data"]});
                        let _ = ws.send(Message::text(echo.to_string())).await;
                        continue;
                    };
                    let event = frame["event"].as_str().unwrap_or_default().to_string();
                    if let Some(data) = reply(&event, &frame["data"]) {
                        let answer = serde_json::json!({"ack": ack, "data": data});
                        let _ = ws.send(Message::text(answer.to_string())).await;
                    }
                }
            });
        }
    });

    (format!("ws://{}", addr), received)
}

/// Start a WebSocket backend that completes the handshake and closes at once.
#[allow(dead_code)]
pub async fn start_closing_ws_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await else {
                    return;
                };
                let _ = ws.close(None).await;
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    format!("ws://{}", addr)
}
