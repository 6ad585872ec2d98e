//! Check Result Model
//!
//! Provides the immutable record describing one probe outcome, its
//! fingerprint identity, and the JSON wire codec used between all
//! pipeline components.

mod result;
mod wire;

pub use result::{CheckResult, ResultKind};
pub use wire::DecodeError;
