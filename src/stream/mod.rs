// src/stream/mod.rs

//! Agent stdout decoding.
//!
//! - [`parser`] splits a byte stream into NDJSON line records, turning
//!   malformed lines into error markers instead of failing.
//! - [`normalize`] classifies decoded records and extracts the fields the
//!   executor cares about (session token, text deltas, result text).
//! - [`walk`] is the depth-first walker shared by the recursive key searches.

pub mod normalize;
pub mod parser;
pub mod walk;

pub use normalize::{EventKind, NormalizedEvent, normalize_event};
pub use parser::{AsyncStreamLines, StreamLine, StreamLines, parse_line, stream_lines};
