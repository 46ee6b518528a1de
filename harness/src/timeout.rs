//! Wall-clock bounded scoring of the tail of a checkpoint.
//!
//! The block's lines move into a single worker thread together with a clone
//! of the scorer. The caller blocks until the worker reports or the deadline
//! passes. On expiry the worker's stop flag is raised and the block scores
//! zero; the worker notices the flag before its next directive, and a handler
//! call that never returns simply leaves the detached thread parked.
//!
//! The caller never reads the block's lines again, so there is no read
//! position to recover after a cancelled worker. The worker reports through
//! a gate that goes silent once the flag is raised, so an abandoned worker
//! cannot print into a later run or prompt.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use crate::core::protocol::LineCursor;
use crate::handler::{Observer, SharedObserver};
use crate::scoring::{RunReport, Scorer};

/// Forwards to the run's observer until the block is abandoned.
struct GatedObserver {
    inner: SharedObserver,
    stop: Arc<AtomicBool>,
}

impl GatedObserver {
    fn open(&self) -> bool {
        !self.stop.load(Ordering::SeqCst)
    }
}

impl Observer for GatedObserver {
    fn line(&self, text: &str) {
        if self.open() {
            self.inner.line(text);
        }
    }

    fn prompt(&self, text: &str) {
        if self.open() {
            self.inner.prompt(text);
        }
    }
}

/// Score contributed by a bounded block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockOutcome {
    pub earned: f64,
    pub timed_out: bool,
    pub cases_run: usize,
    pub cases_passed: usize,
}

impl BlockOutcome {
    fn empty(timed_out: bool) -> Self {
        Self {
            earned: 0.0,
            timed_out,
            cases_run: 0,
            cases_passed: 0,
        }
    }

    fn from_report(report: &RunReport) -> Self {
        Self {
            earned: report.points,
            timed_out: false,
            cases_run: report.cases_run,
            cases_passed: report.cases_passed,
        }
    }
}

/// Score `rest` on a worker thread, giving up after `deadline`.
#[instrument(skip_all, fields(deadline_ms = deadline.as_millis() as u64, lines = rest.remaining()))]
pub fn run_bounded(scorer: &Scorer, rest: LineCursor, deadline: Duration) -> BlockOutcome {
    let stop = Arc::new(AtomicBool::new(false));
    let worker_stop = Arc::clone(&stop);
    let worker = scorer.with_observer(Arc::new(GatedObserver {
        inner: Arc::clone(scorer.observer()),
        stop: Arc::clone(&stop),
    }));
    let (tx, rx) = mpsc::channel::<RunReport>();
    let started = Instant::now();

    let spawned = thread::Builder::new()
        .name("bounded-block".to_string())
        .spawn(move || {
            let report = worker.run_nested(rest.directives(), &worker_stop);
            // The receiver is gone once the deadline has passed.
            let _ = tx.send(report);
        });
    if let Err(err) = spawned {
        warn!(err = %err, "failed to spawn bounded block worker");
        return BlockOutcome::empty(false);
    }

    match rx.recv_timeout(deadline) {
        Ok(report) => {
            debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                earned = report.points,
                "bounded block finished"
            );
            BlockOutcome::from_report(&report)
        }
        Err(RecvTimeoutError::Timeout) => {
            stop.store(true, Ordering::SeqCst);
            warn!("bounded block timed out, abandoning worker");
            BlockOutcome::empty(true)
        }
        Err(RecvTimeoutError::Disconnected) => {
            warn!("bounded block worker exited without a result");
            BlockOutcome::empty(false)
        }
    }
}
