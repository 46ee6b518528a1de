//! Scoring executor: replays directives against the handler and keeps score.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::core::compare::match_output;
use crate::core::protocol::{Directive, Directives, TestCase};
use crate::core::score::{Section, Summary, Tally};
use crate::handler::{SharedHandler, SharedObserver, evaluate_guarded};
use crate::timeout::run_bounded;

/// Why a scoring pass ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// Every directive was processed.
    Completed,
    /// A case failed with break-on-fail set.
    BrokeOnFail { line: usize },
    /// The checkpoint could not be decoded past some point.
    Malformed { message: String },
    /// A bounded block consumed the rest of the checkpoint.
    Bounded { timed_out: bool },
    /// The pass was asked to stop by its supervisor.
    Cancelled,
}

/// Result of one scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub points: f64,
    pub total: f64,
    /// Cases executed, scored or not (including those inside a bounded block).
    pub cases_run: usize,
    pub cases_passed: usize,
    pub stop: StopReason,
    /// Empty for nested passes, which report only their score.
    pub summary: Summary,
}

impl RunReport {
    pub fn is_perfect(&self) -> bool {
        self.points == self.total
    }
}

/// Replays checkpoint directives against a handler.
#[derive(Clone)]
pub struct Scorer {
    handler: SharedHandler,
    observer: SharedObserver,
    break_on_fail: bool,
}

#[derive(Default)]
struct RunState {
    tally: Tally,
    summary: Option<Summary>,
    cases_run: usize,
    cases_passed: usize,
}

impl RunState {
    fn finish(self, stop: StopReason) -> RunReport {
        RunReport {
            points: self.tally.points,
            total: self.tally.total,
            cases_run: self.cases_run,
            cases_passed: self.cases_passed,
            stop,
            summary: self.summary.unwrap_or_default(),
        }
    }
}

enum CaseFlow {
    Continue,
    Stop,
}

impl Scorer {
    pub fn new(handler: SharedHandler, observer: SharedObserver, break_on_fail: bool) -> Self {
        Self {
            handler,
            observer,
            break_on_fail,
        }
    }

    /// Same handler and break-on-fail setting, reporting to `observer`.
    pub fn with_observer(&self, observer: SharedObserver) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            observer,
            break_on_fail: self.break_on_fail,
        }
    }

    pub fn observer(&self) -> &SharedObserver {
        &self.observer
    }

    /// Top-level pass: collects a summary and appends the final score line.
    #[instrument(skip_all, fields(break_on_fail = self.break_on_fail))]
    pub fn run(&self, directives: Directives) -> RunReport {
        self.score(directives, Some(Summary::default()), None)
    }

    /// Pass inside a bounded block: no summary, and `stop` is checked before
    /// each directive.
    pub fn run_nested(&self, directives: Directives, stop: &AtomicBool) -> RunReport {
        self.score(directives, None, Some(stop))
    }

    fn score(
        &self,
        directives: Directives,
        summary: Option<Summary>,
        stop: Option<&AtomicBool>,
    ) -> RunReport {
        let mut state = RunState {
            summary,
            ..RunState::default()
        };
        let mut timed_out = None;

        for decoded in directives {
            if stop.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                debug!("scoring pass cancelled");
                return state.finish(StopReason::Cancelled);
            }
            let directive = match decoded {
                Ok(directive) => directive,
                Err(err) => {
                    warn!(err = %err, "malformed checkpoint");
                    self.observer.line(&format!("ERROR in test file. {err}"));
                    return state.finish(StopReason::Malformed {
                        message: err.to_string(),
                    });
                }
            };

            match directive {
                Directive::Comment(text) => {
                    if let Some(summary) = state.summary.as_mut() {
                        let line = summary.push_comment(&text);
                        self.observer.line(&format!("\n{line}"));
                    }
                }
                Directive::Subtotal => {
                    if state.summary.is_some() {
                        let section = state.tally.close_section();
                        self.report_section(&mut state, section);
                    }
                }
                Directive::Case(case) => {
                    if let CaseFlow::Stop = self.score_case(&case, &mut state) {
                        return state.finish(StopReason::BrokeOnFail { line: case.line });
                    }
                }
                Directive::Bounded { deadline, rest } => {
                    let block = run_bounded(self, rest, deadline);
                    state.cases_run += block.cases_run;
                    state.cases_passed += block.cases_passed;
                    let section = state.tally.fold_block(block.earned);
                    self.report_section(&mut state, section);
                    timed_out = Some(block.timed_out);
                }
            }
        }

        if let Some(summary) = state.summary.as_mut() {
            if summary.is_empty() {
                self.observer.line(&state.tally.score_line());
            }
            summary.push_score(&state.tally);
        }
        let stop = match timed_out {
            Some(timed_out) => StopReason::Bounded { timed_out },
            None => StopReason::Completed,
        };
        debug!(points = state.tally.points, total = state.tally.total, ?stop, "scoring pass finished");
        state.finish(stop)
    }

    fn report_section(&self, state: &mut RunState, section: Section) {
        self.observer.line(&state.tally.subtotal_line(section));
        if let Some(summary) = state.summary.as_mut() {
            summary.attach_section(section, &state.tally);
        }
    }

    fn score_case(&self, case: &TestCase, state: &mut RunState) -> CaseFlow {
        let header = format!("Running Test [{}]", case.command);
        state.cases_run += 1;

        let actual = match evaluate_guarded(self.handler.as_ref(), &case.command) {
            Ok(actual) => actual,
            Err(fault) => {
                warn!(line = case.line, message = %fault.message, "handler fault");
                state.tally.record_case(case.points_worth, false);
                self.observer.line(&format!(
                    "{header} Failed with exception. Here are details:\n{}",
                    fault.message
                ));
                return self.after_failure();
            }
        };

        let verdict = match_output(&actual, &case.expected_lines);
        let passed = !case.is_scored() || verdict.passed();
        state.tally.record_case(case.points_worth, passed);
        debug!(line = case.line, command = %case.command, passed, "case scored");

        if passed {
            state.cases_passed += 1;
            self.observer
                .line(&format!("{header} passed  (+{:.1} pts)", case.points_worth));
            if !case.is_scored() {
                self.observer.line(&format!("[ {actual} ]"));
            }
            return CaseFlow::Continue;
        }

        self.observer.line(&format!("{header} {verdict}"));
        self.after_failure()
    }

    fn after_failure(&self) -> CaseFlow {
        if self.break_on_fail {
            self.observer.line("Set to break on fail");
            CaseFlow::Stop
        } else {
            CaseFlow::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::LineCursor;
    use crate::test_support::{BufferObserver, echo, scripted, shared_observer};

    fn run_text(text: &str, handler: SharedHandler, break_on_fail: bool) -> (RunReport, Arc<BufferObserver>) {
        let observer = BufferObserver::shared();
        let scorer = Scorer::new(handler, shared_observer(&observer), break_on_fail);
        let report = scorer.run(LineCursor::from_text(text).directives());
        (report, observer)
    }

    #[test]
    fn header_case_and_subtotal_scenario() {
        let handler = scripted(&[("1/2 + 1/2", "1")]);
        let (report, observer) = run_text("// header\n1/2 + 1/2\n1 1\n1\n// subtotal", handler, true);

        assert_eq!(report.points, 1.0);
        assert_eq!(report.total, 1.0);
        assert_eq!(report.stop, StopReason::Completed);
        assert_eq!(
            report.summary.lines(),
            [
                "\t1.0 / 1.0\tTOTAL: 1.0 / 1.0\t\theader".to_string(),
                "SCORE: 1.0 / 1.0".to_string(),
            ]
        );
        assert!(observer.contains("Running Test [1/2 + 1/2] passed  (+1.0 pts)"));
        assert!(observer.contains("Section Sub-Total: 1.0 / 1.0"));
    }

    #[test]
    fn totals_add_up_regardless_of_outcome() {
        let handler = scripted(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let text = "a\n1 2\n1\nb\n1 3\nwrong\nc\n1 0.5\n3";
        let (report, _) = run_text(text, handler, false);
        assert_eq!(report.total, 5.5);
        assert_eq!(report.points, 2.5);
        assert_eq!(report.cases_run, 3);
        assert_eq!(report.cases_passed, 2);
        assert_eq!(report.stop, StopReason::Completed);
    }

    #[test]
    fn break_on_fail_stops_before_next_case() {
        let handler = scripted(&[("bad", "1"), ("good", "2")]);
        let (report, observer) = run_text("bad\n1\n9\ngood\n1\n2", handler, true);
        assert_eq!(report.points, 0.0);
        assert_eq!(report.total, 1.0);
        assert_eq!(report.cases_run, 1);
        assert_eq!(report.stop, StopReason::BrokeOnFail { line: 1 });
        assert!(report.summary.is_empty());
        assert!(observer.contains("Set to break on fail"));
        assert!(!observer.contains("Running Test [good]"));
    }

    #[test]
    fn case_insensitive_match_passes() {
        let handler = scripted(&[("greet", "Hello World")]);
        let (report, _) = run_text("greet\n1\nHELLO world", handler, true);
        assert!(report.is_perfect());
        assert_eq!(report.points, 1.0);
    }

    #[test]
    fn extra_or_missing_lines_fail() {
        let handler = scripted(&[("two", "a\nb"), ("one", "a")]);
        let (report, observer) = run_text("two\n1\na\none\n2\na\nb", handler, false);
        assert_eq!(report.points, 0.0);
        assert_eq!(report.total, 2.0);
        assert!(observer.contains("actual output was too long"));
        assert!(observer.contains("expected more output"));
    }

    #[test]
    fn unscored_case_passes_and_echoes_output() {
        let (report, observer) = run_text("anything\n0", echo(), true);
        assert_eq!(report.points, 0.0);
        assert_eq!(report.total, 0.0);
        assert_eq!(report.cases_passed, 1);
        assert!(observer.contains("[ anything ]"));
    }

    #[test]
    fn handler_panic_is_a_failed_case() {
        let handler: SharedHandler = Arc::new(|input: &str| -> String {
            if input == "explode" {
                panic!("kaboom");
            }
            input.to_string()
        });
        let text = "explode\n1\nx\nfine\n1\nfine";

        let (report, observer) = run_text(text, handler.clone(), false);
        assert_eq!(report.points, 1.0);
        assert_eq!(report.total, 2.0);
        assert!(observer.contains("Failed with exception"));

        let (report, _) = run_text(text, handler, true);
        assert_eq!(report.points, 0.0);
        assert_eq!(report.stop, StopReason::BrokeOnFail { line: 1 });
    }

    #[test]
    fn malformed_file_keeps_partial_score() {
        let (report, observer) = run_text("ok\n1\nok\nbroken\nnot-a-number\nok\n1\nok", echo(), false);
        assert_eq!(report.points, 1.0);
        assert_eq!(report.total, 1.0);
        assert!(matches!(report.stop, StopReason::Malformed { .. }));
        assert!(report.summary.is_empty());
        assert!(observer.contains("ERROR in test file."));
    }

    #[test]
    fn oversized_count_keeps_partial_score() {
        let (report, observer) = run_text("ok\n1\nok\ncmd\n99999999999999999\nx", echo(), false);
        assert_eq!(report.points, 1.0);
        assert_eq!(report.total, 1.0);
        assert!(matches!(report.stop, StopReason::Malformed { .. }));
        assert!(observer.contains("unexpected end of file"));
    }

    #[test]
    fn nested_pass_ignores_comments_and_honours_stop_flag() {
        let observer = BufferObserver::shared();
        let scorer = Scorer::new(echo(), shared_observer(&observer), true);

        let stop = AtomicBool::new(false);
        let report = scorer.run_nested(LineCursor::from_text("// hidden\nx\n1\nx").directives(), &stop);
        assert_eq!(report.points, 1.0);
        assert!(report.summary.is_empty());
        assert!(!observer.contains("hidden"));

        let stop = AtomicBool::new(true);
        let report = scorer.run_nested(LineCursor::from_text("x\n1\nx").directives(), &stop);
        assert_eq!(report.stop, StopReason::Cancelled);
        assert_eq!(report.cases_run, 0);
    }
}
