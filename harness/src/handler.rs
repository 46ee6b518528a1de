//! Seams between the harness and the system under test.
//!
//! A [`CommandHandler`] maps one input line to its output text and exposes no
//! other state. An [`Observer`] receives the human-readable progress of the
//! harness (test results, summaries, echoed output).

use std::any::Any;
use std::io::Write;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};

use tracing::warn;

/// Command handler under test.
pub trait CommandHandler: Send + Sync {
    fn evaluate(&self, input: &str) -> String;
}

impl<F> CommandHandler for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn evaluate(&self, input: &str) -> String {
        self(input)
    }
}

/// Handler shared between the router, the recorder and bounded workers.
pub type SharedHandler = Arc<dyn CommandHandler>;

/// A handler invocation that panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFault {
    pub message: String,
}

/// Invoke `handler`, turning a panic into a [`HandlerFault`].
pub fn evaluate_guarded(handler: &dyn CommandHandler, input: &str) -> Result<String, HandlerFault> {
    catch_unwind(AssertUnwindSafe(|| handler.evaluate(input))).map_err(|payload| HandlerFault {
        message: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Sink for harness progress output.
pub trait Observer: Send + Sync {
    /// Emit one or more complete lines.
    fn line(&self, text: &str);

    /// Emit text that waits for input on the same line.
    fn prompt(&self, _text: &str) {}
}

pub type SharedObserver = Arc<dyn Observer>;

/// Observer printing to the process stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutObserver;

impl Observer for StdoutObserver {
    fn line(&self, text: &str) {
        println!("{text}");
    }

    fn prompt(&self, text: &str) {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

/// Observer writing to any writer (a pipe, a file, a buffer).
#[derive(Debug)]
pub struct WriterObserver<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterObserver<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    fn write(&self, text: &str, newline: bool) {
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        let result = if newline {
            writeln!(writer, "{text}")
        } else {
            write!(writer, "{text}")
        };
        if let Err(err) = result.and_then(|()| writer.flush()) {
            warn!(err = %err, "failed to write observer output");
        }
    }
}

impl<W: Write + Send> Observer for WriterObserver<W> {
    fn line(&self, text: &str) {
        self.write(text, true);
    }

    fn prompt(&self, text: &str) {
        self.write(text, false);
    }
}
