//! Incremental server-sent-event frame parser.
//!
//! Reassembles the byte chunks of a streaming response into SSE events and
//! yields each event's `data` payload. Only the `data` field is meaningful
//! to this backend; `event`/`id`/`retry` fields and comment lines are
//! consumed and dropped. Chunk boundaries may fall anywhere, including
//! inside a UTF-8 sequence, so bytes are buffered until a full line exists.

#[derive(Debug, Default)]
pub struct SseParser {
    /// Bytes of the current, not-yet-terminated line
    buffer: Vec<u8>,
    /// `data` lines of the in-progress event
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of response bytes, returning every complete event
    /// payload it finishes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut payloads = Vec::new();

        for &byte in chunk {
            if byte == b'\n' {
                let line = String::from_utf8_lossy(&self.buffer).into_owned();
                self.buffer.clear();
                self.process_line(line.strip_suffix('\r').unwrap_or(&line), &mut payloads);
            } else {
                self.buffer.push(byte);
            }
        }

        payloads
    }

    fn process_line(&mut self, line: &str, payloads: &mut Vec<String>) {
        if line.is_empty() {
            // Blank line terminates the event
            if !self.data.is_empty() {
                payloads.push(self.data.join("\n"));
                self.data.clear();
            }
        } else if let Some(value) = line.strip_prefix("data:") {
            // A single leading space after the colon is part of the framing
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        } else if line.starts_with(':') {
            // Comment / keep-alive line
        } else {
            // event:/id:/retry: — unused by this backend
        }
    }
}
