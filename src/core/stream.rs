//! Server-sent completion stream handling.
//!
//! The completion endpoint answers with `data: {json}` lines. Only payloads
//! whose `type` is `completion` carry answer text; everything else is noise
//! for our purposes (pings, message limits, stop markers).

use std::io::Write;

use reqwest::Response;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, UncleError};

/// Prefix of interpreted stream lines.
pub const EVENT_PREFIX: &str = "data: ";
/// Payload type carrying answer text.
pub const COMPLETION_TYPE: &str = "completion";
/// Marker printed per received fragment.
pub const PROGRESS_MARKER: &[u8] = b".";

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    completion: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

/// One interpreted stream line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of the answer.
    Completion(String),
    /// The service reported an error mid-stream.
    Error(String),
    /// Any other payload type.
    Other(String),
}

/// Interpret one line of the stream.
///
/// Returns `None` for lines without the event prefix or with a payload that
/// is not a JSON object with a `type`.
#[must_use]
pub fn parse_line(line: &str) -> Option<StreamEvent> {
    let data = line.strip_prefix(EVENT_PREFIX)?;
    let payload: Payload = match serde_json::from_str(data) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping unparsable stream line");
            return None;
        }
    };
    Some(match payload.kind.as_str() {
        COMPLETION_TYPE => StreamEvent::Completion(payload.completion.unwrap_or_default()),
        "error" => StreamEvent::Error(
            payload
                .error
                .map_or_else(|| "unknown error".to_string(), |e| e.to_string()),
        ),
        _ => StreamEvent::Other(payload.kind),
    })
}

/// Accumulates completion fragments in arrival order.
#[derive(Debug, Default)]
pub struct CompletionBuffer {
    text: String,
    fragments: usize,
}

impl CompletionBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one stream line; returns the fragment if it carried one.
    pub fn push_line(&mut self, line: &str) -> Option<&str> {
        match parse_line(line)? {
            StreamEvent::Completion(fragment) => {
                let start = self.text.len();
                self.text.push_str(&fragment);
                self.fragments += 1;
                Some(&self.text[start..])
            }
            StreamEvent::Error(message) => {
                tracing::warn!(%message, "Service reported an error in the stream");
                None
            }
            StreamEvent::Other(kind) => {
                tracing::trace!(%kind, "Ignoring stream payload");
                None
            }
        }
    }

    /// Number of fragments received so far.
    #[must_use]
    pub const fn fragments(&self) -> usize {
        self.fragments
    }

    /// The accumulated answer.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Splits a byte stream into lines across chunk boundaries.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&line[..line.len() - 1]));
        }
        lines
    }

    /// The unterminated last line, if any.
    #[must_use]
    pub fn finish(self) -> Option<String> {
        (!self.pending.is_empty()).then(|| decode_line(&self.pending))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Consume a completion response, printing one progress marker per fragment.
///
/// # Errors
///
/// Returns error if the stream breaks or progress output fails.
pub async fn read_completion<W: Write>(mut response: Response, progress: &mut W) -> Result<String> {
    let mut splitter = LineSplitter::new();
    let mut buffer = CompletionBuffer::new();

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| UncleError::Network(format!("completion stream interrupted: {e}")))?
    {
        for line in splitter.push(&chunk) {
            feed(&mut buffer, &line, progress)?;
        }
    }
    if let Some(line) = splitter.finish() {
        feed(&mut buffer, &line, progress)?;
    }

    tracing::debug!(
        fragments = buffer.fragments(),
        chars = buffer.text().len(),
        "Completion finished"
    );
    Ok(buffer.into_text())
}

fn feed<W: Write>(buffer: &mut CompletionBuffer, line: &str, progress: &mut W) -> Result<()> {
    if buffer.push_line(line).is_some() {
        progress.write_all(PROGRESS_MARKER)?;
        progress.flush()?;
    }
    Ok(())
}
