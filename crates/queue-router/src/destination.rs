//! Destination rule parsing
//!
//! A destination specification is `queueKey` or `queueKey[filterQuery]`.
//! The routing table parses all-or-nothing: one bad specification
//! keeps the process from starting.

use std::sync::OnceLock;

use check_result::CheckResult;
use regex::Regex;
use result_filter::{Filter, FilterError};
use thiserror::Error;

/// Destination configuration errors, fatal at startup.
#[derive(Debug, Error)]
pub enum RouterConfigError {
    /// Specification does not match `queueKey[filterQuery]`
    #[error("invalid destination queue value: {0:?}")]
    InvalidDestination(String),

    /// Bracket body failed to compile as a filter query
    #[error("invalid filter for queue {queue}: {source}")]
    InvalidFilter {
        queue: String,
        #[source]
        source: FilterError,
    },
}

fn destination_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // An empty bracket body cannot match and is rejected.
    RE.get_or_init(|| Regex::new(r"^([\w.-]+)(?:\[(.+)])?$").unwrap())
}

/// A destination queue paired with its optional filter.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct DestinationRule {
    queue_key: String,
    filter: Option<Filter>,
}

impl DestinationRule {
    /// Parse one destination specification.
    pub fn parse(value: &str) -> Result<Self, RouterConfigError> {
        let captures = destination_regex()
            .captures(value)
            .ok_or_else(|| RouterConfigError::InvalidDestination(value.to_string()))?;

        let queue_key = captures[1].to_string();
        let filter = match captures.get(2) {
            Some(body) => Some(Filter::parse(body.as_str()).map_err(|source| {
                RouterConfigError::InvalidFilter {
                    queue: queue_key.clone(),
                    source,
                }
            })?),
            None => None,
        };

        Ok(Self { queue_key, filter })
    }

    /// Parse a whole routing table, all-or-nothing.
    pub fn parse_all<S: AsRef<str>>(values: &[S]) -> Result<Vec<Self>, RouterConfigError> {
        values.iter().map(|v| Self::parse(v.as_ref())).collect()
    }

    /// Whether a result should be forwarded to this destination.
    /// A rule without a filter forwards unconditionally.
    pub fn matches(&self, result: &CheckResult) -> bool {
        self.filter.as_ref().map_or(true, |f| f.matches(result))
    }

    /// The destination queue key.
    pub fn queue_key(&self) -> &str {
        &self.queue_key
    }

    /// The compiled filter, if any.
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }
}
