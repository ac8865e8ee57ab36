//! Incremental SSE (Server-Sent Events) parser.
//!
//! Handles:
//! - Partial frames across TCP chunks
//! - Multi-line data fields
//! - CRLF and LF line endings
//! - Buffer compaction to prevent unbounded growth

use crate::error::Error;
use bytes::{Buf, BytesMut};
use memchr::memchr;

/// A parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Line-based SSE parser.
pub struct SseParser {
    buffer: BytesMut,
    /// Offset of unconsumed data in buffer.
    consumed: usize,
}

impl SseParser {
    /// Create a new parser with default buffer capacity.
    pub fn new() -> Self {
        Self::with_capacity(8192)
    }

    /// Create a new parser with specified initial capacity.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(cap),
            consumed: 0,
        }
    }

    /// Feed bytes into the parser.
    #[inline]
    pub fn feed(&mut self, data: &[u8]) {
        if self.consumed > self.buffer.len() / 2 && self.consumed > 4096 {
            self.compact();
        }
        self.buffer.extend_from_slice(data);
    }

    /// Terminate a trailing event that arrived without its blank line.
    ///
    /// Called once the byte stream has ended.
    pub fn finish(&mut self) {
        if self.buffer_len() == 0 {
            return;
        }
        if !self.buffer.ends_with(b"\n") {
            self.buffer.extend_from_slice(b"\n");
        }
        self.buffer.extend_from_slice(b"\n");
    }

    fn compact(&mut self) {
        if self.consumed > 0 {
            self.buffer.advance(self.consumed);
            self.consumed = 0;
        }
    }

    /// Try to parse the next complete event.
    /// Returns `None` if more data is needed.
    ///
    /// A `data` field that is not valid UTF-8 yields a `Parse` error; the
    /// offending event is consumed.
    pub fn next_event(&mut self) -> Option<Result<SseEvent, Error>> {
        loop {
            let buf = &self.buffer[self.consumed..];
            let mut data = String::new();
            let mut event: Option<String> = None;
            let mut has_data = false;
            let mut invalid = false;
            let mut pos = 0;

            let event_end = loop {
                let line_end = pos + memchr(b'\n', &buf[pos..])?;
                let line = &buf[pos..line_end];
                let line = line.strip_suffix(b"\r").unwrap_or(line);

                if line.is_empty() {
                    break line_end + 1;
                }

                // A line without a colon is a field name with an empty value.
                // Lines starting with ':' are comments and have an empty field name.
                let (field, value) = match memchr(b':', line) {
                    Some(colon) => {
                        let value = &line[colon + 1..];
                        (&line[..colon], value.strip_prefix(b" ").unwrap_or(value))
                    }
                    None => (line, &b""[..]),
                };

                match field {
                    b"data" => match std::str::from_utf8(value) {
                        Ok(value) => {
                            if has_data {
                                data.push('\n');
                            }
                            data.push_str(value);
                            has_data = true;
                        }
                        Err(_) => invalid = true,
                    },
                    b"event" => {
                        if let Ok(value) = std::str::from_utf8(value) {
                            event = Some(value.to_string());
                        }
                    }
                    _ => {}
                }

                pos = line_end + 1;
            };

            self.consumed += event_end;

            if invalid {
                return Some(Err(Error::parse("SSE data field is not valid UTF-8")));
            }
            if has_data {
                return Some(Ok(SseEvent { event, data }));
            }
        }
    }

    /// Check if the data indicates end of stream (e.g., `[DONE]`).
    #[inline]
    pub fn is_done(data: &str) -> bool {
        data.trim() == "[DONE]"
    }

    /// Drop all buffered data.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.consumed = 0;
    }

    /// Current buffer size.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len() - self.consumed
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}
