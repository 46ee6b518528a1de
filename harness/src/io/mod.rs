//! I/O helpers for harness commands.

pub mod checkpoint;
pub mod config;
pub mod report;
