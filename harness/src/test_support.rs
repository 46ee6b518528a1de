//! Test-only handlers and observers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::handler::{Observer, SharedHandler, SharedObserver};

/// Observer collecting every emitted line in memory.
#[derive(Debug, Default)]
pub struct BufferObserver {
    lines: Mutex<Vec<String>>,
}

impl BufferObserver {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl Observer for BufferObserver {
    fn line(&self, text: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(text.to_string());
        }
    }
}

/// Coerce a concrete observer for APIs taking a [`SharedObserver`].
pub fn shared_observer(observer: &Arc<BufferObserver>) -> SharedObserver {
    observer.clone()
}

/// Handler answering from a fixed table; unknown inputs answer `"?"`.
pub fn scripted(answers: &[(&str, &str)]) -> SharedHandler {
    let table: HashMap<String, String> = answers
        .iter()
        .map(|(input, output)| (input.to_string(), output.to_string()))
        .collect();
    Arc::new(move |input: &str| table.get(input).cloned().unwrap_or_else(|| "?".to_string()))
}

/// Handler echoing its input back.
pub fn echo() -> SharedHandler {
    Arc::new(|input: &str| input.to_string())
}

/// Handler that never returns for `input`; other inputs are echoed.
pub fn hangs_on(input: &'static str) -> SharedHandler {
    Arc::new(move |received: &str| {
        if received == input {
            loop {
                std::thread::sleep(Duration::from_millis(10));
            }
        }
        received.to_string()
    })
}

/// Handler that sleeps for `delay` before echoing its input.
pub fn slow_echo(delay: Duration) -> SharedHandler {
    Arc::new(move |input: &str| {
        std::thread::sleep(delay);
        input.to_string()
    })
}
