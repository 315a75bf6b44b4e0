//! Server-Sent-Event decoding for OpenAI-compatible chat streams.
//!
//! Two layers, composed by the provider client:
//!
//! ```text
//!  bytes chunks ──► split_lines ──► text lines ──► decode_lines ──► content deltas
//!   (network)      (LineSplitter)                   (parse_data_line)
//! ```
//!
//! Frame rules:
//!
//! | Line                         | Result                        |
//! |------------------------------|-------------------------------|
//! | not starting with `data: `   | ignored (blank, keep-alive…)  |
//! | `data: [DONE]`               | end of stream, nothing after  |
//! | `data: <json>` with content  | one delta                     |
//! | `data: <bad json>`           | skipped, decoding continues   |

use bytes::BytesMut;
use futures::{Stream, StreamExt};
use switchyard_kernel::AdapterError;
use tracing::trace;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

// ─────────────────────────────────────────────────────────────────────────────
// Line splitting
// ─────────────────────────────────────────────────────────────────────────────

/// Reassembles text lines from arbitrarily fragmented byte chunks.
///
/// Bytes are buffered until a `\n` arrives, so frames (and multi-byte UTF-8
/// sequences) split across network reads come out whole. A trailing `\r` is
/// stripped from every line.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buf: BytesMut,
    /// Prefix of `buf` already known to hold no `\n`.
    scanned: usize,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(offset) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
            let pos = self.scanned + offset;
            let raw = self.buf.split_to(pos + 1);
            lines.push(to_line(&raw[..pos]));
            self.scanned = 0;
        }
        self.scanned = self.buf.len();
        lines
    }

    /// Flush the unterminated remainder, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        self.scanned = 0;
        let raw = self.buf.split();
        Some(to_line(&raw))
    }
}

fn to_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Turn a byte-chunk stream into a line stream.
///
/// Errors from the chunk stream are forwarded and end the line stream.
pub fn split_lines<S, B>(chunks: S) -> impl Stream<Item = Result<String, AdapterError>> + Send
where
    S: Stream<Item = Result<B, AdapterError>> + Send,
    B: AsRef<[u8]> + Send,
{
    async_stream::stream! {
        let mut splitter = LineSplitter::new();
        futures::pin_mut!(chunks);
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => {
                    for line in splitter.push(bytes.as_ref()) {
                        yield Ok(line);
                    }
                }
                Err(err) => {
                    yield Err(err);
                    return;
                }
            }
        }
        if let Some(rest) = splitter.finish() {
            yield Ok(rest);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame decoding
// ─────────────────────────────────────────────────────────────────────────────

/// Classification of one SSE line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Nothing to forward.
    Skip,
    /// `[DONE]` sentinel.
    Done,
    /// A non-empty content fragment.
    Delta(String),
}

/// Classify a single line.
pub fn parse_data_line(line: &str) -> Frame {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Skip;
    };
    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        return Frame::Done;
    }

    let chunk: serde_json::Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(err) => {
            trace!(error = %err, "skipping malformed SSE frame");
            return Frame::Skip;
        }
    };

    match chunk["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => Frame::Delta(content.to_string()),
        _ => Frame::Skip,
    }
}

/// Decode a line stream into content deltas.
///
/// Stops at `[DONE]` without pulling further lines; forwards (and stops at)
/// the first upstream error.
pub fn decode_lines<S>(lines: S) -> impl Stream<Item = Result<String, AdapterError>> + Send
where
    S: Stream<Item = Result<String, AdapterError>> + Send,
{
    async_stream::stream! {
        futures::pin_mut!(lines);
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };
            match parse_data_line(&line) {
                Frame::Skip => continue,
                Frame::Done => return,
                Frame::Delta(content) => yield Ok(content),
            }
        }
    }
}
