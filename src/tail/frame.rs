// src/tail/frame.rs

use serde_json::Value;

/// Response headers a server should send with a tail feed.
pub const SSE_HEADERS: [(&str, &str); 3] = [
    ("Content-Type", "text/event-stream"),
    ("Cache-Control", "no-cache"),
    ("X-Accel-Buffering", "no"),
];

pub const STATUS_EVENT: &str = "status";

/// One frame of a tail feed.
#[derive(Debug, Clone, PartialEq)]
pub enum TailFrame {
    /// Comment frame (`: connected`, `: keepalive`); ignored by SSE clients.
    Comment(String),
    /// One raw event line, verbatim.
    Data(String),
    /// The terminal status document; always the last frame.
    Status(Value),
}

impl TailFrame {
    pub fn comment(text: impl Into<String>) -> Self {
        TailFrame::Comment(text.into())
    }

    pub fn is_status(&self) -> bool {
        matches!(self, TailFrame::Status(_))
    }

    /// Server-Sent Events encoding, including the terminating blank line.
    pub fn encode(&self) -> String {
        match self {
            TailFrame::Comment(text) => format!(": {text}\n\n"),
            TailFrame::Data(payload) => {
                let mut out = String::with_capacity(payload.len() + 8);
                for line in payload.split('\n') {
                    out.push_str("data: ");
                    out.push_str(line);
                    out.push('\n');
                }
                out.push('\n');
                out
            }
            TailFrame::Status(doc) => format!("event: {STATUS_EVENT}\ndata: {doc}\n\n"),
        }
    }
}
