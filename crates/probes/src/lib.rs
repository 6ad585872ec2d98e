//! Protocol Probes
//!
//! Simple request/response checks with no shared state. Each probe
//! implements the [`Probe`] capability trait (run a check, declare
//! its arguments, self-document) and is registered in an explicit
//! startup table.

mod check;
mod dumb;
mod error;
mod pop3;
mod registry;

pub use check::{Check, ProbeOptions};
pub use dumb::DumbProbe;
pub use error::ProbeError;
pub use pop3::Pop3Probe;
pub use registry::{Probe, ProbeRegistry};
