//! Record-then-replay tests.
//!
//! Drives a live session through the router, then replays the generated
//! checkpoint against the same handler.

use std::fs;
use std::sync::Arc;

use harness::io::config::HarnessConfig;
use harness::recorder::SessionState;
use harness::router::{Routed, Router};
use harness::scoring::StopReason;
use harness::test_support::{BufferObserver, shared_observer};

fn calculator(input: &str) -> String {
    match input {
        "help" => "usage:\n  <a> <op> <b>\n  quit".to_string(),
        "silent" => String::new(),
        other => other.to_uppercase(),
    }
}

#[test]
fn recorded_session_replays_with_full_score() {
    let temp = tempfile::tempdir().expect("tempdir");
    let observer = BufferObserver::shared();
    let config = HarnessConfig {
        checkpoint_dir: temp.path().to_path_buf(),
        ..HarnessConfig::default()
    };
    let router = Router::new(Arc::new(calculator), shared_observer(&observer), config);
    let commands = ["1/2 + 1/2", "help", "silent", "Mixed Case"];

    let mut session = SessionState::default();
    assert_eq!(router.route(&mut session, "test create rt"), Routed::Handled);
    for command in commands {
        assert_eq!(router.route(&mut session, command), Routed::Handled);
    }
    assert_eq!(router.route(&mut session, "test end"), Routed::Handled);
    assert!(!session.is_recording());

    let recorded = fs::read_to_string(temp.path().join("tests_checkpointrt.txt")).expect("read");
    assert!(recorded.starts_with("1/2 + 1/2\n1\n1/2 + 1/2\nhelp\n3\nusage:\n"));
    assert!(recorded.contains("silent\n0\n"));

    let report = router.run_checkpoint("rt", false).expect("replay");
    assert_eq!(report.cases_run, commands.len());
    assert_eq!(report.cases_passed, commands.len());
    assert!(report.is_perfect());
    // `silent` records zero lines, so it is worth nothing.
    assert_eq!(report.total, 3.0);
    assert_eq!(report.stop, StopReason::Completed);
}

#[test]
fn replay_against_a_changed_handler_loses_points() {
    let temp = tempfile::tempdir().expect("tempdir");
    let observer = BufferObserver::shared();
    let config = HarnessConfig {
        checkpoint_dir: temp.path().to_path_buf(),
        ..HarnessConfig::default()
    };
    let recording = Router::new(Arc::new(calculator), shared_observer(&observer), config.clone());

    let mut session = SessionState::default();
    recording.route(&mut session, "test create drift");
    recording.route(&mut session, "a");
    recording.route(&mut session, "b");
    recording.route(&mut session, "test end");

    let drifted = Router::new(
        Arc::new(|input: &str| if input == "a" { "A".to_string() } else { "changed".to_string() }),
        shared_observer(&observer),
        config,
    );
    let report = drifted.run_checkpoint("drift", false).expect("replay");
    assert_eq!(report.points, 1.0);
    assert_eq!(report.total, 2.0);
    assert_eq!(report.cases_run, 2);
}

#[test]
fn marker_like_command_does_not_desync_replay() {
    let temp = tempfile::tempdir().expect("tempdir");
    let observer = BufferObserver::shared();
    let config = HarnessConfig {
        checkpoint_dir: temp.path().to_path_buf(),
        ..HarnessConfig::default()
    };
    let router = Router::new(Arc::new(calculator), shared_observer(&observer), config);

    let mut session = SessionState::default();
    router.route(&mut session, "test create marks");
    assert_eq!(router.route(&mut session, "// note"), Routed::Handled);
    assert_eq!(router.route(&mut session, "x"), Routed::Handled);
    router.route(&mut session, "test end");
    assert!(observer.contains("not recorded"));

    let report = router.run_checkpoint("marks", false).expect("replay");
    assert_eq!(report.stop, StopReason::Completed);
    assert_eq!(report.cases_run, 1);
    assert!(report.is_perfect());
    assert_eq!(report.total, 1.0);
}
