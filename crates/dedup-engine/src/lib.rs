//! Dedup Engine
//!
//! Tracks per-fingerprint failure streaks and decides which raw probe
//! outcomes are worth emitting as notifications:
//! - first failure of a streak fires immediately
//! - repeat failures inside the dedup window are suppressed
//! - repeat failures past the window fire again, marked as duplicates
//! - the first pass after a streak fires exactly once as a recovery
//!
//! Streak state lives in an external TTL key-value store so that
//! independent pipeline processes share it; the store is injected and
//! the engine fails open when it is unreachable.

mod engine;

pub use engine::{DedupConfig, DedupEngine};
