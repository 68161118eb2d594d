//! Frame decoding for the NDJSON generation stream.
//!
//! The transport delivers chunks whose boundaries align with neither newline
//! nor UTF-8 character boundaries. The decoder buffers raw bytes and carries
//! the unfinished tail line across `push` calls, so a line is only ever
//! decoded and parsed once its terminating newline (or the end of the body)
//! has arrived. The emitted frame sequence is therefore identical for every
//! chunking of the same body.

use serde::Deserialize;

/// One decoded logical unit of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text fragment to append (`response` field; absent means empty).
    Text(String),
    /// A server-reported failure (`error` field). Ends meaningful processing.
    ServerError(String),
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Splits chunk text into newline-terminated lines and parses each line as a
/// frame. One decoder instance serves exactly one response body.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
    skipped: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next transport chunk; returns the frames it completed, in
    /// order. The final partial line, if any, stays buffered as raw bytes
    /// (a multi-byte character split across chunks is reassembled here).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.pending.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(idx) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=idx).collect();
            if let Some(frame) = self.parse_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// End of body: the remaining buffer, if non-empty, is the final
    /// candidate line. Resets the buffer.
    pub fn finish(&mut self) -> Option<Frame> {
        let tail = std::mem::take(&mut self.pending);
        self.parse_line(&tail)
    }

    /// Lines dropped because they failed to parse as JSON objects.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn parse_line(&mut self, line: &[u8]) -> Option<Frame> {
        // A complete line contains only whole characters, so lossy decoding
        // here can only mangle bytes that were invalid on the wire.
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<RawFrame>(line) {
            Ok(RawFrame {
                error: Some(message),
                ..
            }) => Some(Frame::ServerError(message)),
            Ok(RawFrame { response, .. }) => Some(Frame::Text(response.unwrap_or_default())),
            Err(e) => {
                // Buffering guarantees line atomicity, so this is a genuinely
                // malformed line from the server. Skip it; the stream goes on.
                tracing::warn!(error = %e, line, "skipping unparsable stream line");
                self.skipped += 1;
                None
            }
        }
    }
}
