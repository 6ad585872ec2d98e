//! Queue Router
//!
//! Parses `queueKey[filterQuery]` destination specifications into
//! routing rules and fans each incoming result out, verbatim, to
//! every destination whose filter matches.

mod destination;
mod router;

pub use destination::{DestinationRule, RouterConfigError};
pub use router::Router;
