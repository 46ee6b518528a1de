//! Scripted command/response test harness.
//!
//! Drives any text-in/text-out [`handler::CommandHandler`] through checkpoint
//! files: each file is a line protocol of comments, subtotal markers, test
//! cases and an optional wall-clock bounded block. Checkpoints can be replayed
//! and scored, or generated by recording a live session.
//!
//! - **[`core`]**: Pure, deterministic logic (line protocol, output matching,
//!   score bookkeeping). No I/O.
//! - **[`io`]**: Side-effecting helpers (config, checkpoint files, reports).
//!
//! [`scoring`], [`timeout`], [`recorder`] and [`router`] coordinate the two to
//! implement the harness commands; [`repl`] wraps them in a read/print loop.

pub mod core;
pub mod error;
pub mod handler;
pub mod io;
pub mod logging;
pub mod recorder;
pub mod repl;
pub mod router;
pub mod scoring;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod timeout;
