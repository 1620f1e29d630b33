//! Incremental framers for the two streaming wire formats.
//!
//! Both framers buffer raw bytes, so a frame (or a multi-byte character)
//! split across reads is reassembled before decoding. They do no I/O; the
//! async adapters that drive them live with the HTTP client.

use serde_json::Value;

/// Terminal SSE payload.
pub const SSE_DONE: &str = "[DONE]";

/// One complete NDJSON line.
#[derive(Debug, Clone, PartialEq)]
pub enum NdjsonLine {
    Value(Value),
    /// The line was not valid JSON. Callers log and drop it.
    Malformed { line: String, error: String },
}

fn parse_line(raw: &[u8]) -> Option<NdjsonLine> {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim();
    if line.is_empty() {
        return None;
    }
    Some(match serde_json::from_str::<Value>(line) {
        Ok(value) => NdjsonLine::Value(value),
        Err(e) => NdjsonLine::Malformed {
            line: line.to_string(),
            error: e.to_string(),
        },
    })
}

/// Splits a newline-delimited JSON byte stream into parsed lines.
#[derive(Debug, Default)]
pub struct NdjsonFramer {
    buffer: Vec<u8>,
}

impl NdjsonFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read's worth of bytes and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<NdjsonLine> {
        self.buffer.extend_from_slice(chunk);
        let Some(last_newline) = self.buffer.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);
        complete
            .split(|b| *b == b'\n')
            .filter_map(parse_line)
            .collect()
    }

    /// Flush whatever is left once the source is exhausted.
    pub fn finish(self) -> Option<NdjsonLine> {
        parse_line(&self.buffer)
    }

    /// Bytes waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// One meaningful item decoded from an SSE stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseItem {
    /// A text delta: the JSON `choices[0].delta.content` / `content` field,
    /// or the raw payload when it is not JSON.
    Delta(String),
    /// An in-band `{"error": "..."}` payload.
    Error(String),
    /// The `[DONE]` sentinel. Nothing follows it.
    Done,
}

fn extract_delta(value: &Value) -> Option<&str> {
    value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .or_else(|| value.get("content").and_then(Value::as_str))
}

fn extract_error(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::String(message) => Some(message.clone()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Splits a `text/event-stream` byte stream into deltas.
#[derive(Debug, Default)]
pub struct SseFramer {
    buffer: Vec<u8>,
    /// A `\r` ended the previous read; it is dropped if a `\n` follows.
    pending_cr: bool,
    done: bool,
}

impl SseFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one read's worth of bytes and return the items it completed.
    ///
    /// Once `[DONE]` is seen, the rest of the buffer and all later input
    /// are discarded.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseItem> {
        if self.done {
            return Vec::new();
        }
        self.extend_normalized(chunk);

        let mut items = Vec::new();
        while let Some(end) = find_delimiter(&self.buffer) {
            let event: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if self.process_event(&event[..end], &mut items) {
                self.buffer.clear();
                break;
            }
        }
        items
    }

    /// Append `chunk`, turning each `\r\n` into `\n`. Other `\r` bytes are
    /// payload and kept.
    fn extend_normalized(&mut self, chunk: &[u8]) {
        for &b in chunk {
            if std::mem::take(&mut self.pending_cr) && b != b'\n' {
                self.buffer.push(b'\r');
            }
            if b == b'\r' {
                self.pending_cr = true;
            } else {
                self.buffer.push(b);
            }
        }
    }

    /// Flush a final event that was not followed by a blank line.
    pub fn finish(mut self) -> Vec<SseItem> {
        let mut items = Vec::new();
        if !self.done && !self.buffer.is_empty() {
            let event = std::mem::take(&mut self.buffer);
            self.process_event(&event, &mut items);
        }
        items
    }

    /// Returns `true` when the event carried `[DONE]`.
    fn process_event(&mut self, event: &[u8], items: &mut Vec<SseItem>) -> bool {
        let text = String::from_utf8_lossy(event);
        for line in text.split('\n') {
            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };
            let payload = payload.strip_prefix(' ').unwrap_or(payload);
            if payload == SSE_DONE {
                self.done = true;
                items.push(SseItem::Done);
                return true;
            }
            if payload.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(payload) {
                Ok(value) => {
                    if let Some(delta) = extract_delta(&value) {
                        items.push(SseItem::Delta(delta.to_string()));
                    } else if let Some(message) = extract_error(&value) {
                        items.push(SseItem::Error(message));
                    }
                }
                Err(_) => items.push(SseItem::Delta(payload.to_string())),
            }
        }
        false
    }
}

fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Frame a payload as one SSE event.
pub fn sse_event(payload: &str) -> String {
    format!("data: {payload}\n\n")
}

/// The SSE event carrying an in-band error.
pub fn sse_error_event(message: &str) -> String {
    sse_event(&serde_json::json!({ "error": message }).to_string())
}
