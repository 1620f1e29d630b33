//! Async adapters from a response byte stream to decoded items.
//!
//! The adapters own their source. It is dropped when the returned stream
//! finishes, stops early on `[DONE]` or an error, or is itself dropped by
//! the consumer, which releases the underlying connection.

use futures_util::{Stream, StreamExt};
use serde_json::Value;
use shared_types::{NdjsonFramer, NdjsonLine, SseFramer, SseItem, StreamRecord};
use std::fmt::Display;

use crate::error::RelayError;

/// Longest slice of a malformed line echoed into the log.
const LOG_PREVIEW_CHARS: usize = 120;

fn accept(line: NdjsonLine) -> Option<Value> {
    match line {
        NdjsonLine::Value(value) => Some(value),
        NdjsonLine::Malformed { line, error } => {
            let preview: String = line.chars().take(LOG_PREVIEW_CHARS).collect();
            tracing::warn!(%error, line = %preview, "Dropping malformed NDJSON line");
            None
        }
    }
}

/// Decode a newline-delimited JSON body into JSON values.
///
/// Malformed lines are logged and skipped. A read error ends the stream
/// with one `Err`. `None` means the response carried no body.
pub fn ndjson_values<S, B, E>(
    source: Option<S>,
) -> Result<impl Stream<Item = Result<Value, RelayError>> + Send + 'static, RelayError>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    let source = source.ok_or(RelayError::StreamUnreadable)?;

    Ok(async_stream::stream! {
        let mut source = std::pin::pin!(source);
        let mut framer = NdjsonFramer::new();

        while let Some(chunk) = source.next().await {
            match chunk {
                Ok(bytes) => {
                    for value in framer.push(bytes.as_ref()).into_iter().filter_map(accept) {
                        yield Ok(value);
                    }
                }
                Err(e) => {
                    yield Err(RelayError::Read(e.to_string()));
                    return;
                }
            }
        }

        if let Some(value) = framer.finish().and_then(accept) {
            yield Ok(value);
        }
    })
}

/// Decode the username search body into typed records.
pub fn search_records<S, B, E>(
    source: Option<S>,
) -> Result<impl Stream<Item = Result<StreamRecord, RelayError>> + Send + 'static, RelayError>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    Ok(ndjson_values(source)?.map(|item| item.map(StreamRecord::from_value)))
}

/// Decode a `text/event-stream` body into text deltas.
///
/// Ends at `[DONE]` without reading further. An in-band error event or a
/// read error ends the stream with one `Err`.
pub fn sse_deltas<S, B, E>(
    source: Option<S>,
) -> Result<impl Stream<Item = Result<String, RelayError>> + Send + 'static, RelayError>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    let source = source.ok_or(RelayError::StreamUnreadable)?;

    Ok(async_stream::stream! {
        let mut source = std::pin::pin!(source);
        let mut framer = SseFramer::new();

        while let Some(chunk) = source.next().await {
            let items = match chunk {
                Ok(bytes) => framer.push(bytes.as_ref()),
                Err(e) => {
                    yield Err(RelayError::Read(e.to_string()));
                    return;
                }
            };
            for item in items {
                match item {
                    SseItem::Delta(text) => {
                        yield Ok(text);
                    }
                    SseItem::Error(message) => {
                        yield Err(RelayError::Upstream(message));
                        return;
                    }
                    SseItem::Done => return,
                }
            }
        }

        for item in framer.finish() {
            match item {
                SseItem::Delta(text) => {
                    yield Ok(text);
                }
                SseItem::Error(message) => {
                    yield Err(RelayError::Upstream(message));
                    return;
                }
                SseItem::Done => return,
            }
        }
    })
}
