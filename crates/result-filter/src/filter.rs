//! Compiled filters and clause evaluation

use std::fmt;

use check_result::CheckResult;
use regex::Regex;
use thiserror::Error;

use crate::token::{escape_value, split_clauses, split_key_value};

/// Errors compiling a filter query.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Clause is not of the form `key=value` with a word-only key
    #[error("invalid filter clause: {0:?}")]
    InvalidClause(String),

    /// Key is not one of the recognized result fields
    #[error("unhandled filter key: {0}")]
    UnknownKey(String),

    /// Clause value failed to compile as a regular expression
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}

/// Result fields matchable by regular expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexField {
    Type,
    Tag,
    Input,
    Target,
    Error,
}

impl RegexField {
    fn key(self) -> &'static str {
        match self {
            RegexField::Type => "type",
            RegexField::Tag => "tag",
            RegexField::Input => "input",
            RegexField::Target => "target",
            RegexField::Error => "error",
        }
    }
}

/// One compiled `key=value` unit of a filter query.
#[derive(Debug, Clone)]
pub enum Clause {
    /// Regular-expression match against a string field, optionally inverted
    Regex {
        field: RegexField,
        pattern: Regex,
        negated: bool,
    },
    /// Equality against the `isDedup` flag
    IsDedup(bool),
    /// Equality against the `recovered` flag
    Recovered(bool),
}

impl Clause {
    fn parse(raw: &str) -> Result<Self, FilterError> {
        let (key, value) =
            split_key_value(raw).ok_or_else(|| FilterError::InvalidClause(raw.to_string()))?;

        match key {
            // Boolean keys: the literal `true` or anything else.
            "isDedup" => return Ok(Clause::IsDedup(value == "true")),
            "recovered" => return Ok(Clause::Recovered(value == "true")),
            _ => {}
        }

        let field = match key {
            "type" => RegexField::Type,
            "tag" => RegexField::Tag,
            "input" => RegexField::Input,
            "target" => RegexField::Target,
            "error" => RegexField::Error,
            other => return Err(FilterError::UnknownKey(other.to_string())),
        };

        let (negated, pattern_str) = match value.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, value),
        };

        let pattern = Regex::new(pattern_str).map_err(|source| FilterError::InvalidRegex {
            pattern: pattern_str.to_string(),
            source,
        })?;

        Ok(Clause::Regex {
            field,
            pattern,
            negated,
        })
    }

    fn matches(&self, result: &CheckResult) -> bool {
        match self {
            Clause::IsDedup(expected) => result.is_dedup == *expected,
            Clause::Recovered(expected) => result.recovered == *expected,
            Clause::Regex {
                field,
                pattern,
                negated,
            } => {
                let value = match field {
                    RegexField::Type => Some(result.check_type.as_str()),
                    RegexField::Tag => Some(result.tag.as_str()),
                    RegexField::Input => Some(result.input.as_str()),
                    RegexField::Target => Some(result.target.as_str()),
                    RegexField::Error => result.error.as_deref(),
                };
                match value {
                    // An absent error never matches an error= clause,
                    // negated or not.
                    None => false,
                    Some(value) => pattern.is_match(value) != *negated,
                }
            }
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::IsDedup(v) => write!(f, "isDedup={}", v),
            Clause::Recovered(v) => write!(f, "recovered={}", v),
            Clause::Regex {
                field,
                pattern,
                negated,
            } => write!(
                f,
                "{}={}{}",
                field.key(),
                if *negated { "!" } else { "" },
                escape_value(pattern.as_str())
            ),
        }
    }
}

/// A compiled filter: the conjunction of zero or more clauses.
///
/// Immutable once parsed; safe to share across threads and reuse for
/// every incoming result.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// A filter with no clauses, matching every result.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile a filter query.
    ///
    /// Fails on the first malformed clause, unknown key, or invalid
    /// regular expression; there are no partial filters.
    pub fn parse(query: &str) -> Result<Self, FilterError> {
        let mut clauses = Vec::new();
        for raw in split_clauses(query) {
            clauses.push(Clause::parse(&raw)?);
        }
        Ok(Self { clauses })
    }

    /// Whether every clause matches the result.
    pub fn matches(&self, result: &CheckResult) -> bool {
        self.clauses.iter().all(|clause| clause.matches(result))
    }

    /// The compiled clauses, in query order.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
}

impl fmt::Display for Filter {
    /// Canonical query rendering; re-parsing it yields an equivalent
    /// predicate.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.clauses.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", rendered.join(","))
    }
}
