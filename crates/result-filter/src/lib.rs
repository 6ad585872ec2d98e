//! Result Filter Language
//!
//! Compiles compact textual queries into predicates over check results.
//!
//! A query is a comma-separated list of `key=value` clauses; all clauses
//! must match (logical AND). Regex-valued keys (`type`, `tag`, `input`,
//! `target`, `error`) accept a leading `!` to invert the match; boolean
//! keys (`isDedup`, `recovered`) compare for equality. A literal comma
//! inside a value is escaped as `\,`.
//!
//! Examples:
//! - `tag=my-cluster-.*`
//! - `type=k8s-event,error=!Killing`
//! - `isDedup=true,target=10\.0\.123\.111`

mod filter;
mod token;

pub use filter::{Clause, Filter, FilterError, RegexField};
