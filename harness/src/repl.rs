//! Line-based read/print loop around a [`Router`].

use std::io::BufRead;

use anyhow::{Context, Result};
use tracing::debug;

use crate::handler::evaluate_guarded;
use crate::recorder::{QUIT_COMMAND, SessionState};
use crate::router::Router;

/// Read commands from `input` until `quit` or end of input.
///
/// Harness commands are routed; everything else goes to the handler and its
/// output is printed. Any open recording is closed before returning.
pub fn run_repl<R: BufRead>(mut input: R, router: &Router) -> Result<()> {
    let observer = router.observer();
    let mut session = SessionState::default();
    let mut buf = String::new();

    loop {
        observer.prompt(&router.config().prompt);
        buf.clear();
        let read = input.read_line(&mut buf).context("read command")?;
        if read == 0 {
            debug!("end of input");
            observer.line("");
            break;
        }
        let line = buf.trim_end_matches(['\r', '\n']);

        if line.trim().eq_ignore_ascii_case(QUIT_COMMAND) {
            break;
        }
        if router.route(&mut session, line).is_handled() {
            continue;
        }
        match evaluate_guarded(router.handler().as_ref(), line) {
            Ok(output) => observer.line(&output),
            Err(fault) => observer.line(&format!("ERROR: {}", fault.message)),
        }
    }

    router.shutdown(&mut session);
    observer.line("Goodbye!");
    Ok(())
}
