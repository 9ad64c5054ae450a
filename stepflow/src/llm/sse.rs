//! Incremental parser for `text/event-stream` bodies.
//!
//! Chunks arrive at arbitrary byte boundaries. The parser buffers partial
//! lines and yields one [`SseFrame`] per complete `data:` line.

/// A frame decoded from a server-sent event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Payload of a `data:` line.
    Data(String),
    /// The `[DONE]` sentinel ending the stream.
    Done,
}

/// Line-buffering SSE decoder.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    done: bool,
}

impl SseParser {
    /// Creates an empty parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the `[DONE]` sentinel was seen.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// Feeds a chunk and returns the frames completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(frame) = self.parse_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        self.parse_line(&line)
    }

    fn parse_line(&mut self, raw: &[u8]) -> Option<SseFrame> {
        if self.done {
            return None;
        }
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\r', '\n']);

        // Comments, event names and ids carry nothing we use.
        let payload = line.strip_prefix("data:")?;
        let payload = payload.strip_prefix(' ').unwrap_or(payload);

        if payload == "[DONE]" {
            self.done = true;
            return Some(SseFrame::Done);
        }
        if payload.is_empty() {
            return None;
        }
        Some(SseFrame::Data(payload.to_string()))
    }
}
