// src/tail/mod.rs

//! Live tail of a run's event log for remote subscribers.
//!
//! A subscriber may attach before the first byte is written, while the run
//! is active, or long after it finished; in every case it sees the whole raw
//! log once, in order, followed by a single terminal status frame.

pub mod frame;
pub mod reader;

pub use frame::{SSE_HEADERS, TailFrame};
pub use reader::{LogCursor, TailOptions, read_terminal_status, tail_events, tail_run};
