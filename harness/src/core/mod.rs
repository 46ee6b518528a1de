//! Deterministic, pure logic shared by the harness.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! lines and counters and return deterministic outputs suitable for tests.

pub mod compare;
pub mod protocol;
pub mod score;
