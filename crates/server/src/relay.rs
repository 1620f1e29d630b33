//! Pass-through response bodies for the streaming routes.
//!
//! Upstream bytes are forwarded as they arrive, unmodified. Only the end of
//! the stream is touched: a failure becomes one in-band error record and a
//! clean SSE ending is guaranteed to carry `[DONE]`. Dropping the body
//! drops the upstream stream with it.

use axum::body::{Body, Bytes};
use futures_util::{Stream, StreamExt};
use shared_types::{sse_error_event, sse_event, SSE_DONE};
use std::convert::Infallible;

use crate::upstream::UpstreamError;

/// Enough trailing bytes to recognise `data: [DONE]` plus line endings.
const TAIL_LEN: usize = 32;

#[derive(Default)]
struct Tail(Vec<u8>);

impl Tail {
    fn push(&mut self, chunk: &[u8]) {
        self.0.extend_from_slice(chunk);
        if self.0.len() > TAIL_LEN {
            let excess = self.0.len() - TAIL_LEN;
            self.0.drain(..excess);
        }
    }

    fn normalized(&self) -> Vec<u8> {
        self.0.iter().copied().filter(|b| *b != b'\r').collect()
    }

    /// Newlines needed so that whatever follows starts a fresh line
    /// (`event == false`) or a fresh SSE event (`event == true`).
    fn separator(&self, event: bool) -> &'static str {
        let tail = self.normalized();
        if tail.is_empty() || tail.ends_with(b"\n\n") {
            ""
        } else if tail.ends_with(b"\n") {
            if event {
                "\n"
            } else {
                ""
            }
        } else if event {
            "\n\n"
        } else {
            "\n"
        }
    }

    fn ends_with_done(&self) -> bool {
        let tail = self.normalized();
        let text = String::from_utf8_lossy(&tail);
        let Some(last_line) = text.trim_end().rsplit('\n').next() else {
            return false;
        };
        last_line
            .strip_prefix("data:")
            .map(|payload| payload.trim() == SSE_DONE)
            .unwrap_or(false)
    }
}

/// Relay an NDJSON body. A read failure appends `{"error": "..."}` as the
/// final line.
pub fn ndjson_passthrough<S>(upstream: S, service: &'static str) -> Body
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let body = async_stream::stream! {
        let mut upstream = std::pin::pin!(upstream);
        let mut tail = Tail::default();
        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    tail.push(&bytes);
                    yield Ok::<Bytes, Infallible>(bytes);
                }
                Err(e) => {
                    let err = UpstreamError::from_reqwest(service, e);
                    tracing::error!(target: "upstream", service, error = %err, "NDJSON relay failed mid-stream");
                    let record = serde_json::json!({ "error": err.to_string() });
                    yield Ok(Bytes::from(format!("{}{record}\n", tail.separator(false))));
                    break;
                }
            }
        }
    };
    Body::from_stream(body)
}

/// Relay an SSE body, appending `data: [DONE]` on a clean end unless
/// upstream already sent it. A read failure appends an error event instead.
pub fn sse_passthrough<S>(upstream: S, service: &'static str) -> Body
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let body = async_stream::stream! {
        let mut upstream = std::pin::pin!(upstream);
        let mut tail = Tail::default();
        let mut failed = false;
        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    tail.push(&bytes);
                    yield Ok::<Bytes, Infallible>(bytes);
                }
                Err(e) => {
                    let err = UpstreamError::from_reqwest(service, e);
                    tracing::error!(target: "upstream", service, error = %err, "SSE relay failed mid-stream");
                    yield Ok(Bytes::from(format!(
                        "{}{}",
                        tail.separator(true),
                        sse_error_event(&err.to_string())
                    )));
                    failed = true;
                    break;
                }
            }
        }
        if !failed && !tail.ends_with_done() {
            yield Ok(Bytes::from(format!("{}{}", tail.separator(true), sse_event(SSE_DONE))));
        }
    };
    Body::from_stream(body)
}
