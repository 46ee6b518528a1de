//! Error taxonomy for checkpoint loading, parsing and recording.

use std::path::PathBuf;

use thiserror::Error;

/// Structural problem in a checkpoint file.
///
/// Line numbers are 1-based and point at the line that could not be read or
/// decoded. Scoring stops at the first parse error and keeps what was earned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: expected integer for count of lines, found end of file")]
    MissingCount { line: usize },
    #[error("line {line}: invalid count of lines {text:?}")]
    BadCount { line: usize, text: String },
    #[error("line {line}: invalid points value {text:?}")]
    BadPoints { line: usize, text: String },
    #[error("line {line}: unexpected end of file, {missing} expected line(s) missing")]
    UnexpectedEof { line: usize, missing: usize },
    #[error("line {line}: invalid timeout marker {text:?}")]
    BadTimeout { line: usize, text: String },
}

/// Failures surfaced by the router and recorder.
///
/// None of these end a session; they are rendered for the user and the
/// read/print loop continues.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("cannot find test file {}: {source}", path.display())]
    CheckpointNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read test file {}: {source}", path.display())]
    CheckpointUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid checkpoint id {id:?}: {reason}")]
    InvalidCheckpointId { id: String, reason: &'static str },
    #[error("recording to {} failed: {source}", path.display())]
    Recorder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
