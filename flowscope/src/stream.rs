//! Trace stream decoding.
//!
//! The execution service answers `POST /chat` with a chunked body of frames,
//! each a `data: <json>` line terminated by a blank line. Frames arrive in
//! two historical encodings:
//!
//!   (a) `{"node": <id>, "content": <value>}` — explicit node tag; null or
//!       the `"..."` placeholder means "no content yet" and emits nothing;
//!   (b) `{<nodeId>: <value>}` — the node id is the sole key.
//!
//! A frame that fails to parse is dropped without aborting the stream, and a
//! `{"done": true}` frame ends iteration. Frames are decoded as each chunk
//! arrives; only a trailing partial frame is buffered.

use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use serde_json::Value;

use flowscope_types::{NodeId, TraceEvent};

use crate::error::Result;

/// Placeholder the service streams before a node has produced content.
pub const NO_CONTENT_SENTINEL: &str = "...";

const FRAME_TAG: &str = "data:";

/// One decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Event(TraceEvent),
    Done,
}

fn frame_payload(body: &str) -> Option<String> {
    let data_lines: Vec<&str> = body
        .lines()
        .filter_map(|line| line.strip_prefix(FRAME_TAG))
        .map(str::trim)
        .collect();
    if data_lines.is_empty() {
        return None;
    }
    Some(data_lines.join("\n"))
}

fn is_no_content(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text == NO_CONTENT_SENTINEL,
        Some(_) => false,
    }
}

/// Decode one frame body. `None` means the frame produced nothing: an
/// unparseable body, a sentinel-content frame, or an unrecognized shape.
pub fn decode_frame(body: &str) -> Option<Frame> {
    let payload = frame_payload(body)?;
    let value: Value = match serde_json::from_str(&payload) {
        Ok(value) => value,
        Err(error) => {
            tracing::debug!(%error, frame = %payload, "dropping unparseable frame");
            return None;
        }
    };
    let Value::Object(map) = value else {
        tracing::debug!(frame = %payload, "dropping non-object frame");
        return None;
    };

    if map.get("done").and_then(Value::as_bool) == Some(true) {
        return Some(Frame::Done);
    }

    // Encoding (a): explicit node tag plus a single content value.
    if let Some(node) = map.get("node").and_then(Value::as_str) {
        let content = map.get("content");
        if is_no_content(content) {
            return None;
        }
        let mut updates = serde_json::Map::new();
        updates.insert(
            "content".to_string(),
            content.cloned().unwrap_or(Value::Null),
        );
        return Some(Frame::Event(TraceEvent {
            node_id: NodeId(node.to_string()),
            updates,
        }));
    }

    // Encoding (b): the node id is the sole key of the frame object.
    if map.len() == 1 {
        let (node, value) = map.into_iter().next()?;
        let updates = match value {
            Value::Object(channels) => channels,
            other => {
                let mut updates = serde_json::Map::new();
                updates.insert("output".to_string(), other);
                updates
            }
        };
        return Some(Frame::Event(TraceEvent {
            node_id: NodeId(node),
            updates,
        }));
    }

    tracing::debug!("dropping frame with ambiguous shape");
    None
}

/// Incremental splitter: bytes in, completed frames out. Carries a trailing
/// partial frame between chunks so decoding never waits for the whole body.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(split) = find_delimiter(&self.buffer) {
            let rest = self.buffer.split_off(split + 2);
            let frame_bytes = std::mem::replace(&mut self.buffer, rest);
            let body = String::from_utf8_lossy(&frame_bytes);
            if let Some(frame) = decode_frame(&body) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush a trailing frame that arrived without a final delimiter.
    pub fn finish(self) -> Option<Frame> {
        if self.buffer.is_empty() {
            return None;
        }
        decode_frame(&String::from_utf8_lossy(&self.buffer))
    }
}

fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|pair| pair == b"\n\n")
}

type ChunkStream = Pin<Box<dyn Stream<Item = reqwest::Result<bytes::Bytes>> + Send>>;

/// Lazy, ordered, finite sequence of [`TraceEvent`]s decoded from one run's
/// response body. Reading the next chunk is the only suspension point.
pub struct TraceStream {
    chunks: Option<ChunkStream>,
    decoder: FrameDecoder,
    ready: VecDeque<TraceEvent>,
}

impl TraceStream {
    pub fn new(chunks: ChunkStream) -> Self {
        Self {
            chunks: Some(chunks),
            decoder: FrameDecoder::default(),
            ready: VecDeque::new(),
        }
    }

    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(Box::pin(response.bytes_stream()))
    }

    fn absorb(&mut self, frames: Vec<Frame>) -> bool {
        for frame in frames {
            match frame {
                Frame::Event(event) => self.ready.push_back(event),
                Frame::Done => {
                    // Completion frame: end iteration, ignore trailing data.
                    self.chunks = None;
                    return true;
                }
            }
        }
        false
    }

    /// Next event in arrival order, or `None` once the stream has ended.
    pub async fn next_event(&mut self) -> Result<Option<TraceEvent>> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Ok(Some(event));
            }
            let Some(chunks) = self.chunks.as_mut() else {
                return Ok(None);
            };
            match chunks.next().await {
                Some(chunk) => {
                    let frames = self.decoder.push(&chunk?);
                    self.absorb(frames);
                }
                None => {
                    self.chunks = None;
                    let trailing = std::mem::take(&mut self.decoder).finish();
                    if let Some(Frame::Event(event)) = trailing {
                        self.ready.push_back(event);
                    }
                }
            }
        }
    }
}
