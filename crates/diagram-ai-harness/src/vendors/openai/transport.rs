//! Line decoder for the chat-completions server-sent-event stream.

use serde::Deserialize;
use tracing::{debug, trace};

use crate::provider::DeltaEvent;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

/// Incremental `data:` line parser. Chunks may split lines (and multi-byte
/// characters) anywhere; the unterminated tail is kept until the next chunk.
#[derive(Debug, Default)]
pub(crate) struct DeltaFrameParser {
    buf: Vec<u8>,
}

impl DeltaFrameParser {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<DeltaEvent> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(idx) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=idx).collect();
            parse_line(&line[..idx], &mut events);
        }
        events
    }

    /// Parses whatever is left once the upstream closed without a final newline.
    pub fn finish(&mut self) -> Vec<DeltaEvent> {
        let line = std::mem::take(&mut self.buf);
        let mut events = Vec::new();
        parse_line(&line, &mut events);
        events
    }
}

fn parse_line(bytes: &[u8], events: &mut Vec<DeltaEvent>) {
    let text = String::from_utf8_lossy(bytes);
    let line = text.trim_end_matches('\r');
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return;
    };
    let data = data.trim();
    if data.is_empty() || data == DONE_SENTINEL {
        return;
    }
    let chunk: ChatCompletionChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(err) => {
            debug!(error = %err, "skipping unparseable stream line");
            return;
        }
    };
    let Some(delta) = chunk.choices.into_iter().next().and_then(|c| c.delta) else {
        return;
    };
    if let Some(reasoning) = delta.reasoning_content.filter(|s| !s.is_empty()) {
        trace!(len = reasoning.len(), "reasoning delta");
        events.push(DeltaEvent::Reasoning(reasoning));
    }
    if let Some(content) = delta.content.filter(|s| !s.is_empty()) {
        trace!(len = content.len(), "text delta");
        events.push(DeltaEvent::Text(content));
    }
}
