//! Session recording: mirror live commands and their output into a new
//! checkpoint, in the same line protocol the scorer replays.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::core::compare::output_lines;
use crate::core::protocol::is_marker_line;
use crate::error::HarnessError;
use crate::handler::{CommandHandler, Observer, evaluate_guarded};

/// Input that ends the read/print loop.
pub const QUIT_COMMAND: &str = "quit";

/// An open checkpoint being written from a live session.
#[derive(Debug)]
pub struct RecordingSession {
    path: PathBuf,
    sink: BufWriter<File>,
    commands: usize,
}

impl RecordingSession {
    /// Create (or truncate) the checkpoint file at `path`.
    pub fn create(path: &Path) -> Result<Self, HarnessError> {
        let file = File::create(path).map_err(|source| HarnessError::Recorder {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            sink: BufWriter::new(file),
            commands: 0,
        })
    }

    /// Commands recorded so far.
    pub fn commands(&self) -> usize {
        self.commands
    }

    /// Append one case: the command, the output line count, then the output.
    pub fn record(&mut self, command: &str, output: &str) -> Result<(), HarnessError> {
        let lines = output_lines(output);
        self.write_case(command, &lines)
            .map_err(|source| HarnessError::Recorder {
                path: self.path.clone(),
                source,
            })?;
        self.commands += 1;
        Ok(())
    }

    fn write_case(&mut self, command: &str, lines: &[&str]) -> std::io::Result<()> {
        writeln!(self.sink, "{command}")?;
        writeln!(self.sink, "{}", lines.len())?;
        for line in lines {
            writeln!(self.sink, "{line}")?;
        }
        Ok(())
    }

    /// Flush and close the file.
    pub fn finish(mut self) -> Result<PathBuf, HarnessError> {
        self.sink.flush().map_err(|source| HarnessError::Recorder {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), commands = self.commands, "recording closed");
        Ok(self.path)
    }
}

/// Recording state carried through every routed command.
#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Recording(RecordingSession),
    /// The recorder is inside a handler call on the user's behalf; routing
    /// declines anything that arrives meanwhile.
    Forwarding,
}

impl SessionState {
    pub fn is_recording(&self) -> bool {
        matches!(self, SessionState::Recording(_))
    }

    pub fn is_forwarding(&self) -> bool {
        matches!(self, SessionState::Forwarding)
    }
}

/// Recorder control input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderCommand<'a> {
    /// `test create <id>`
    Begin(&'a str),
    /// `test end`, only recognised while recording.
    End,
}

pub fn parse_recorder_command(input: &str, recording: bool) -> Option<RecorderCommand<'_>> {
    let mut tokens = input.split_whitespace();
    if !tokens.next()?.eq_ignore_ascii_case("test") {
        return None;
    }
    let verb = tokens.next()?;
    if verb.eq_ignore_ascii_case("create") {
        return tokens.next().map(RecorderCommand::Begin);
    }
    if recording && verb.eq_ignore_ascii_case("end") {
        return Some(RecorderCommand::End);
    }
    None
}

/// Start recording to `path`, closing any session already open.
///
/// On failure the state is left idle.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn begin(state: &mut SessionState, path: &Path) -> Result<(), HarnessError> {
    end(state)?;
    let session = RecordingSession::create(path)?;
    info!("recording started");
    *state = SessionState::Recording(session);
    Ok(())
}

/// Stop recording; returns the finished file, if a session was open.
pub fn end(state: &mut SessionState) -> Result<Option<PathBuf>, HarnessError> {
    match std::mem::take(state) {
        SessionState::Recording(session) => session.finish().map(Some),
        other => {
            *state = other;
            Ok(None)
        }
    }
}

/// Record `input` if a session is open. Returns whether the input was consumed.
///
/// The quit command closes the session but is not consumed, so the caller
/// still quits. A command that would read back as a comment or timeout
/// marker is refused. Anything else is forwarded to the handler, written to
/// the checkpoint and its output echoed.
pub fn capture(
    state: &mut SessionState,
    input: &str,
    handler: &dyn CommandHandler,
    observer: &dyn Observer,
) -> Result<bool, HarnessError> {
    if !state.is_recording() {
        return Ok(false);
    }
    if input.trim().eq_ignore_ascii_case(QUIT_COMMAND) {
        end(state)?;
        return Ok(false);
    }
    if is_marker_line(input) {
        warn!(input, "command reads back as a marker, not recorded");
        observer.line(&format!(
            "ERROR: \"{input}\" would replay as a comment or timeout marker (not recorded)"
        ));
        return Ok(true);
    }

    let mut session = match std::mem::replace(state, SessionState::Forwarding) {
        SessionState::Recording(session) => session,
        other => {
            *state = other;
            return Ok(false);
        }
    };
    let evaluated = evaluate_guarded(handler, input);
    let output = match evaluated {
        Ok(output) => output,
        Err(fault) => {
            warn!(message = %fault.message, "handler fault while recording, command not recorded");
            observer.line(&format!("ERROR: {} (not recorded)", fault.message));
            *state = SessionState::Recording(session);
            return Ok(true);
        }
    };

    if let Err(err) = session.record(input, &output) {
        *state = SessionState::Idle;
        return Err(err);
    }
    debug!(commands = session.commands(), "command recorded");
    *state = SessionState::Recording(session);

    if !output.is_empty() {
        observer.line(&output);
    }
    Ok(true)
}
