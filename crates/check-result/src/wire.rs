//! Wire codec for check results
//!
//! The wire unit is a JSON-encoded [`CheckResult`]. Older producers
//! emitted a flat string map instead; decoding falls back to that
//! format for backward compatibility.

use std::collections::HashMap;

use thiserror::Error;

use crate::CheckResult;

/// Errors decoding a queue payload into a result.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload is neither a modern result nor a legacy flat map
    #[error("unrecognized result payload: {0}")]
    Malformed(String),

    /// Legacy map carried an unparseable field
    #[error("invalid legacy field {field}: {value}")]
    InvalidLegacyField { field: &'static str, value: String },

    /// Decoded record violates a result invariant
    #[error("inconsistent result: {0}")]
    Inconsistent(&'static str),
}

impl CheckResult {
    /// Encode to the JSON wire format.
    pub fn to_wire(&self) -> Vec<u8> {
        // A plain struct-to-JSON encode cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decode a queue payload.
    ///
    /// Tries the modern JSON struct first, then the legacy flat
    /// string map (`input`, `target`, `time`, `type`, `tag`,
    /// `result`, `error`), where `result == "failed"` implies a
    /// non-nil error.
    pub fn from_wire(payload: &[u8]) -> Result<Self, DecodeError> {
        let decoded = match serde_json::from_slice::<CheckResult>(payload) {
            Ok(result) => result,
            Err(_) => from_legacy_map(payload)?,
        };
        decoded
            .check_invariants()
            .map_err(DecodeError::Inconsistent)?;
        Ok(decoded)
    }
}

fn from_legacy_map(payload: &[u8]) -> Result<CheckResult, DecodeError> {
    let map: HashMap<String, String> = serde_json::from_slice(payload)
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let field = |name: &str| map.get(name).cloned().unwrap_or_default();

    let time_raw = field("time");
    let time = if time_raw.is_empty() {
        0
    } else {
        time_raw
            .parse::<i64>()
            .map_err(|_| DecodeError::InvalidLegacyField {
                field: "time",
                value: time_raw.clone(),
            })?
    };

    let error = if field("result") == "failed" {
        let text = field("error");
        // A failed legacy result always carries a non-nil error.
        Some(if text.is_empty() {
            "check failed".to_string()
        } else {
            text
        })
    } else {
        None
    };

    let mut result = CheckResult::success(
        &field("input"),
        &field("target"),
        &field("type"),
        &field("tag"),
        time,
    );
    result.error = error;
    Ok(result)
}
