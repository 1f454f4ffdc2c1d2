// src/exec/mod.rs

//! External tool execution.
//!
//! - `process.rs`: the [`ProcessBackend`] seam and its tokio implementation.
//! - `json_lines.rs`: streamed JSON status-line protocol.
//! - `captured.rs`: exit-code / stderr classification for request/response
//!   tools.
//! - `progress.rs`: progress log throttling.

pub mod captured;
pub mod json_lines;
pub mod process;
pub mod progress;

pub use captured::{FailurePolicy, Verdict};
pub use json_lines::{JsonLinesRunner, LineStatus, StatusLine};
pub use process::{
    CapturedOutput, Invocation, LineSink, ProcessBackend, StreamOutcome, TokioProcessBackend,
};
pub use progress::{ProgressThrottle, PROGRESS_LOG_INTERVAL};
