//! Line-oriented event-stream decoding.
//!
//! A record is an `event: <type>` line, zero or more `data: <payload>` lines
//! and a blank line. Data lines of one record are joined with `\n` before the
//! payload is interpreted. The parser is transport independent: feed it raw
//! byte chunks as they arrive or whole lines.

use serde_json::Value;

use super::error::StreamError;

/// Payload that marks the end of the stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Event type of a terminal record
pub const DONE_EVENT: &str = "done";

/// Event type carrying completion messages
pub const MESSAGE_EVENT: &str = "message";

/// Event type carrying remote errors
pub const ERROR_EVENT: &str = "error";

/// Interpreted payload of one record
#[derive(Debug, Clone, PartialEq)]
pub enum StreamData {
    /// Structured payload
    Json(Value),
    /// The `[DONE]` sentinel
    Done,
    /// Non-JSON text on an event type that does not require structure
    Text(String),
    /// No data lines
    Empty,
}

/// One decoded record
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub event_type: String,
    pub data: StreamData,
}

impl StreamEvent {
    /// No further events follow this one
    pub fn is_terminal(&self) -> bool {
        self.event_type == DONE_EVENT || self.data == StreamData::Done
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.data {
            StreamData::Json(value) => Some(value),
            _ => None,
        }
    }
}

fn requires_json(event_type: &str) -> bool {
    event_type == MESSAGE_EVENT || event_type == ERROR_EVENT
}

/// Incremental event-stream parser; one per request.
#[derive(Debug, Default)]
pub struct EventStreamParser {
    partial_line: Vec<u8>,
    event_type: Option<String>,
    data_lines: Vec<String>,
    records: usize,
    bytes: usize,
}

impl EventStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records emitted so far, including malformed ones
    pub fn records_parsed(&self) -> usize {
        self.records
    }

    /// Bytes handed to `feed` so far
    pub fn bytes_consumed(&self) -> usize {
        self.bytes
    }

    /// Append a chunk of the body. Returns every record completed by it, in
    /// order. A line split across chunks is held until its newline arrives.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent, StreamError>> {
        let mut out = Vec::new();
        let start_offset = self.bytes;
        self.bytes += chunk.len();

        let mut rest = chunk;
        let mut consumed = 0;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.partial_line.extend_from_slice(&rest[..pos]);
            let line_bytes = std::mem::take(&mut self.partial_line);
            let line_offset = start_offset + consumed;
            consumed += pos + 1;
            rest = &rest[pos + 1..];

            match String::from_utf8(line_bytes) {
                Ok(line) => out.extend(self.push_line(&line)),
                Err(e) => out.push(Err(StreamError::InvalidUtf8 {
                    offset: line_offset + e.utf8_error().valid_up_to(),
                })),
            }
        }
        self.partial_line.extend_from_slice(rest);
        out
    }

    /// Process one complete line (without its newline).
    pub fn push_line(&mut self, line: &str) -> Option<Result<StreamEvent, StreamError>> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            return self.take_record();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => {
                // A new event line before the blank separator closes the
                // previous record rather than overwriting it.
                let pending = if self.has_pending() {
                    self.take_record()
                } else {
                    None
                };
                self.event_type = Some(value.trim().to_string());
                pending
            }
            "data" => {
                self.data_lines.push(value.to_string());
                None
            }
            _ => None,
        }
    }

    /// Flush a trailing unterminated line and any pending record at end of input.
    pub fn finish(&mut self) -> Vec<Result<StreamEvent, StreamError>> {
        let mut out = Vec::new();
        if !self.partial_line.is_empty() {
            let line_bytes = std::mem::take(&mut self.partial_line);
            match String::from_utf8(line_bytes) {
                Ok(line) => out.extend(self.push_line(&line)),
                Err(e) => out.push(Err(StreamError::InvalidUtf8 {
                    offset: self.bytes - e.as_bytes().len() + e.utf8_error().valid_up_to(),
                })),
            }
        }
        out.extend(self.take_record());
        out
    }

    fn has_pending(&self) -> bool {
        self.event_type.is_some() || !self.data_lines.is_empty()
    }

    fn take_record(&mut self) -> Option<Result<StreamEvent, StreamError>> {
        if !self.has_pending() {
            return None;
        }
        self.records += 1;
        let record = self.records;
        let data_lines = std::mem::take(&mut self.data_lines);
        let payload = data_lines.join("\n");

        // A bare `data: [DONE]` ends the stream even without an event line.
        if payload.trim() == DONE_SENTINEL {
            let event_type = self
                .event_type
                .take()
                .unwrap_or_else(|| DONE_EVENT.to_string());
            return Some(Ok(StreamEvent {
                event_type,
                data: StreamData::Done,
            }));
        }

        let Some(event_type) = self.event_type.take() else {
            return Some(Err(StreamError::MissingEventType { record }));
        };

        let data = if data_lines.is_empty() {
            StreamData::Empty
        } else {
            match serde_json::from_str::<Value>(&payload) {
                Ok(value) => StreamData::Json(value),
                Err(e) if requires_json(&event_type) => {
                    return Some(Err(StreamError::InvalidPayload {
                        record,
                        event_type,
                        reason: e.to_string(),
                    }));
                }
                Err(_) => StreamData::Text(payload),
            }
        };

        Some(Ok(StreamEvent { event_type, data }))
    }
}

/// Parse a sequence of lines in one go.
pub fn parse_lines<'a, I>(lines: I) -> Vec<Result<StreamEvent, StreamError>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parser = EventStreamParser::new();
    let mut out: Vec<_> = lines
        .into_iter()
        .filter_map(|line| parser.push_line(line))
        .collect();
    out.extend(parser.finish());
    out
}

/// Parse a complete body.
pub fn parse_body(body: &str) -> Vec<Result<StreamEvent, StreamError>> {
    parse_lines(body.lines())
}
