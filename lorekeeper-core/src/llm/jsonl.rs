//! JSON-Lines response reassembly
//!
//! The generation server streams its answer as newline-delimited JSON
//! objects, each carrying a fragment in its `"response"` field. Fragments are
//! concatenated in stream order. A line that fails to parse is logged and
//! skipped; it never aborts the whole response.

use serde_json::Value;

use crate::error::LorekeeperError;

/// Result of reassembling a JSON-Lines body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledResponse {
    /// Concatenated `"response"` fragments
    pub text: String,
    /// Lines that contributed a fragment
    pub fragments: usize,
    /// Lines that could not be parsed
    pub skipped_lines: usize,
}

/// Incremental decoder for a JSON-Lines byte stream.
///
/// Chunks may split lines (or multi-byte characters) anywhere; bytes are
/// buffered until a line terminator (`\n`, `\r\n` or `\r`) is seen.
#[derive(Debug, Default)]
pub struct ResponseAssembler {
    buffer: Vec<u8>,
    skip_next_lf: bool,
    line_number: usize,
    output: AssembledResponse,
}

impl ResponseAssembler {
    /// Create an empty assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of the body
    pub fn push(&mut self, chunk: &[u8]) {
        let mut chunk = chunk;
        if self.skip_next_lf && !chunk.is_empty() {
            self.skip_next_lf = false;
            if chunk[0] == b'\n' {
                chunk = &chunk[1..];
            }
        }

        self.buffer.extend_from_slice(chunk);

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n' || *b == b'\r') {
            let terminator = self.buffer[pos];
            let mut consumed = pos + 1;
            if terminator == b'\r' {
                match self.buffer.get(pos + 1) {
                    Some(b'\n') => consumed += 1,
                    Some(_) => {}
                    None => self.skip_next_lf = true,
                }
            }
            let line: Vec<u8> = self.buffer.drain(..consumed).take(pos).collect();
            self.process_line(&line);
        }
    }

    /// Text assembled so far
    pub fn text(&self) -> &str {
        &self.output.text
    }

    /// Flush any unterminated final line and return the result
    pub fn finish(mut self) -> AssembledResponse {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.process_line(&line);
        }
        self.output
    }

    fn process_line(&mut self, line: &[u8]) {
        self.line_number += 1;

        if line.iter().all(u8::is_ascii_whitespace) {
            return;
        }

        match serde_json::from_slice::<Value>(line) {
            Ok(Value::Object(object)) => {
                if let Some(fragment) = object.get("response") {
                    match fragment {
                        Value::String(text) => self.output.text.push_str(text),
                        other => self.output.text.push_str(&other.to_string()),
                    }
                    self.output.fragments += 1;
                }
            }
            Ok(other) => self.skip(format!("expected a JSON object, found {}", kind_of(&other))),
            Err(e) => self.skip(e.to_string()),
        }
    }

    fn skip(&mut self, reason: String) {
        self.output.skipped_lines += 1;
        let err = LorekeeperError::MalformedResponseLine {
            line_number: self.line_number,
            reason,
        };
        tracing::warn!(error = %err, "Skipping unparseable response line");
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Reassemble a complete JSON-Lines body in one call
pub fn parse_json_lines(body: &str) -> AssembledResponse {
    let mut assembler = ResponseAssembler::new();
    assembler.push(body.as_bytes());
    assembler.finish()
}
