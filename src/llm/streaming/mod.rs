//! SSE (Server-Sent Events) decoding
//!
//! Reassembles newline-terminated lines from an arbitrary chunked byte stream
//! and feeds them to the per-family frame parser.

pub mod anthropic;
pub mod openai;

use std::fmt::Display;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::llm::{ContentDelta, FrameParser};

/// Extract the payload of a `data: ` line.
pub(crate) fn parse_sse_line(line: &str) -> Option<&str> {
    line.strip_prefix("data: ")
}

/// Holds the unterminated tail of the byte stream between reads.
///
/// Bytes are buffered rather than text so a multi-byte character split
/// across two reads is decoded only once its line is complete.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&line[..pos]));
        }
        lines
    }

    /// Returns the leftover text at end of stream, if any is non-blank.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let line = decode_line(&rest);
        if line.trim().is_empty() {
            None
        } else {
            Some(line)
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_suffix('\r').unwrap_or(&text).to_string()
}

enum Flow {
    Continue,
    /// Upstream signalled its own end of message.
    Finished,
    /// The receiving side went away.
    Closed,
}

async fn emit(line: &str, parser: FrameParser, tx: &mpsc::Sender<ContentDelta>) -> Flow {
    match parser(line) {
        Some(delta) if delta.done => Flow::Finished,
        Some(delta) => {
            if tx.send(delta).await.is_err() {
                Flow::Closed
            } else {
                Flow::Continue
            }
        }
        None => Flow::Continue,
    }
}

/// Decodes an upstream body into deltas on `tx`.
///
/// Stops reading at the upstream's own end marker, at end of input, or on a
/// mid-stream read error, then sends exactly one terminal delta. The upstream
/// terminal itself is never forwarded, so the terminal stays unique. If the
/// receiver is dropped, even while the body is idle, the body is released
/// without sending anything else.
pub async fn forward_frames<S, B, E>(body: S, parser: FrameParser, tx: mpsc::Sender<ContentDelta>)
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut body = std::pin::pin!(body);
    let mut lines = LineBuffer::new();
    let mut finished = false;
    let mut lines_seen = 0usize;

    'read: loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => {
                tracing::debug!("Delta receiver dropped while waiting on upstream, releasing body");
                return;
            }
            next = body.next() => next,
        };
        let Some(chunk) = next else {
            break;
        };
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!("Upstream stream broke after {} lines: {}", lines_seen, e);
                break;
            }
        };

        for line in lines.push(chunk.as_ref()) {
            match emit(&line, parser, &tx).await {
                Flow::Continue => lines_seen += 1,
                Flow::Finished => {
                    finished = true;
                    break 'read;
                }
                Flow::Closed => {
                    tracing::debug!("Delta receiver dropped, releasing upstream body");
                    return;
                }
            }
        }
    }

    if !finished && let Some(rest) = lines.finish() {
        tracing::debug!("Parsing unterminated trailing line");
        if let Flow::Closed = emit(&rest, parser, &tx).await {
            return;
        }
    }

    let _ = tx.send(ContentDelta::terminal()).await;
}
