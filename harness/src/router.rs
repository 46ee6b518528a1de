//! Command routing: recorder control, checkpoint replay, or a plain command
//! for the handler.

use tracing::{debug, info, instrument, warn};

use crate::error::HarnessError;
use crate::handler::{SharedHandler, SharedObserver};
use crate::io::checkpoint::{checkpoint_path, display_path, load_checkpoint};
use crate::io::config::HarnessConfig;
use crate::io::report::write_report;
use crate::recorder::{self, RecorderCommand, SessionState, parse_recorder_command};
use crate::scoring::{RunReport, Scorer};

/// `test <checkpoint> [breakOnFail]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDirective<'a> {
    pub checkpoint: &'a str,
    /// Defaults to `true`: replay stops at the first failing case.
    pub break_on_fail: bool,
}

pub fn parse_run_directive(input: &str) -> Option<RunDirective<'_>> {
    let mut tokens = input.split_whitespace();
    if !tokens.next()?.eq_ignore_ascii_case("test") {
        return None;
    }
    let checkpoint = tokens.next()?;
    let break_on_fail = tokens.next().and_then(parse_bool).unwrap_or(true);
    Some(RunDirective {
        checkpoint,
        break_on_fail,
    })
}

fn parse_bool(token: &str) -> Option<bool> {
    if token.eq_ignore_ascii_case("true") {
        Some(true)
    } else if token.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Whether the router consumed an input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Handled,
    /// The caller should treat the input as an ordinary command.
    NotHandled,
}

impl Routed {
    pub fn is_handled(self) -> bool {
        matches!(self, Routed::Handled)
    }
}

/// Dispatches harness commands typed into a live session.
pub struct Router {
    handler: SharedHandler,
    observer: SharedObserver,
    config: HarnessConfig,
}

impl Router {
    pub fn new(handler: SharedHandler, observer: SharedObserver, config: HarnessConfig) -> Self {
        Self {
            handler,
            observer,
            config,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn handler(&self) -> &SharedHandler {
        &self.handler
    }

    pub fn observer(&self) -> &SharedObserver {
        &self.observer
    }

    /// Route one raw input line.
    ///
    /// Order: recorder control, replay, then recording of the command itself.
    /// Errors are reported through the observer and count as handled.
    pub fn route(&self, session: &mut SessionState, input: &str) -> Routed {
        if session.is_forwarding() {
            debug!(input, "reentrant command declined");
            return Routed::NotHandled;
        }
        if let Some(command) = parse_recorder_command(input, session.is_recording()) {
            self.control_recording(session, command);
            return Routed::Handled;
        }
        if let Some(directive) = parse_run_directive(input) {
            self.replay(directive);
            return Routed::Handled;
        }
        match recorder::capture(session, input, self.handler.as_ref(), self.observer.as_ref()) {
            Ok(true) => Routed::Handled,
            Ok(false) => Routed::NotHandled,
            Err(err) => {
                self.report_error(&err);
                Routed::Handled
            }
        }
    }

    /// Replay checkpoint `id` and return its report.
    #[instrument(skip(self))]
    pub fn run_checkpoint(&self, id: &str, break_on_fail: bool) -> Result<RunReport, HarnessError> {
        let path = checkpoint_path(&self.config, id)?;
        let cursor = load_checkpoint(&path)?;
        let scorer = Scorer::new(self.handler.clone(), self.observer.clone(), break_on_fail);
        let report = scorer.run(cursor.directives());
        info!(
            points = report.points,
            total = report.total,
            cases_run = report.cases_run,
            "checkpoint replayed"
        );
        Ok(report)
    }

    /// Close any open recording before the session ends.
    pub fn shutdown(&self, session: &mut SessionState) {
        if let Err(err) = recorder::end(session) {
            self.report_error(&err);
        }
    }

    fn control_recording(&self, session: &mut SessionState, command: RecorderCommand<'_>) {
        let result = match command {
            RecorderCommand::Begin(id) => {
                checkpoint_path(&self.config, id).and_then(|path| recorder::begin(session, &path))
            }
            RecorderCommand::End => recorder::end(session).map(|_| ()),
        };
        if let Err(err) = result {
            self.report_error(&err);
        }
    }

    fn replay(&self, directive: RunDirective<'_>) {
        let report = match self.run_checkpoint(directive.checkpoint, directive.break_on_fail) {
            Ok(report) => report,
            Err(err) => {
                self.report_error(&err);
                return;
            }
        };

        if report.summary.len() > 1 {
            self.observer.line("Summary Report:");
            for line in report.summary.lines() {
                self.observer.line(line);
            }
        }
        if let Some(path) = &self.config.report_path {
            if let Err(err) = write_report(path, &report) {
                warn!(err = %err, "failed to write run report");
                self.observer.line(&format!("ERROR: {err:#}"));
            }
        }
    }

    fn report_error(&self, err: &HarnessError) {
        warn!(err = %err, "harness command failed");
        match err {
            HarnessError::CheckpointNotFound { path, source } => {
                self.observer.line("Cannot find test file. Here are details:");
                self.observer
                    .line(&format!(" path of file: {}", display_path(path).display()));
                self.observer.line(&source.to_string());
            }
            other => self.observer.line(&format!("ERROR: {other}")),
        }
    }
}
