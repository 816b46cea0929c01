// src/stream/parser.rs

//! Tolerant NDJSON line parser.
//!
//! Every non-blank input line produces exactly one [`StreamLine`]: either a
//! decoded JSON object or a `Malformed` marker carrying the raw text and the
//! reason. Blank lines produce nothing. Invalid UTF-8 is replaced lossily.

use std::io::{self, BufRead};

use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

/// One non-blank line of agent stdout.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamLine {
    /// The line decoded to a JSON object.
    Record { raw: String, obj: Map<String, Value> },
    /// The line is not JSON, or is JSON but not an object.
    Malformed { raw: String, reason: String },
}

impl StreamLine {
    /// The line exactly as emitted, without its line terminator.
    pub fn raw(&self) -> &str {
        match self {
            StreamLine::Record { raw, .. } | StreamLine::Malformed { raw, .. } => raw,
        }
    }

    pub fn object(&self) -> Option<&Map<String, Value>> {
        match self {
            StreamLine::Record { obj, .. } => Some(obj),
            StreamLine::Malformed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            StreamLine::Record { .. } => None,
            StreamLine::Malformed { reason, .. } => Some(reason),
        }
    }
}

/// Decode a single line. Returns `None` for blank lines.
pub fn parse_line(line: &str) -> Option<StreamLine> {
    let line = strip_terminator(line);
    if line.trim().is_empty() {
        return None;
    }
    let raw = line.to_string();

    let parsed = match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(obj)) => StreamLine::Record { raw, obj },
        Ok(other) => StreamLine::Malformed {
            raw,
            reason: format!("unexpected_json_type: {}", json_type_name(&other)),
        },
        Err(e) => StreamLine::Malformed {
            raw,
            reason: format!("json_decode_error: {e}"),
        },
    };
    Some(parsed)
}

fn parse_bytes(buf: &[u8]) -> Option<StreamLine> {
    parse_line(&String::from_utf8_lossy(buf))
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Lazy iterator over the line records of a blocking reader.
///
/// The iterator consumes the reader and ends at EOF; a read error is logged
/// and also ends the sequence.
#[derive(Debug)]
pub struct StreamLines<R> {
    reader: R,
    buf: Vec<u8>,
    done: bool,
}

pub fn stream_lines<R: BufRead>(reader: R) -> StreamLines<R> {
    StreamLines {
        reader,
        buf: Vec::new(),
        done: false,
    }
}

impl<R: BufRead> Iterator for StreamLines<R> {
    type Item = StreamLine;

    fn next(&mut self) -> Option<StreamLine> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    if let Some(line) = parse_bytes(&self.buf) {
                        return Some(line);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!(error = %e, "read error on event stream; stopping");
                    self.done = true;
                }
            }
        }
        None
    }
}

/// Async counterpart of [`StreamLines`], used to drain a child's stdout.
#[derive(Debug)]
pub struct AsyncStreamLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> AsyncStreamLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    /// Next non-blank line record, or `Ok(None)` at EOF.
    pub async fn next_line(&mut self) -> io::Result<Option<StreamLine>> {
        loop {
            self.buf.clear();
            let n = self.reader.read_until(b'\n', &mut self.buf).await?;
            if n == 0 {
                return Ok(None);
            }
            if let Some(line) = parse_bytes(&self.buf) {
                return Ok(Some(line));
            }
        }
    }
}
