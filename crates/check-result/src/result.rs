//! Check result record and fingerprinting

use serde::{Deserialize, Serialize};

/// Outcome of a single probe execution.
///
/// Immutable after creation; serialized as the wire unit between all
/// pipeline components. Field names follow the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Original human-readable check description
    pub input: String,

    /// Resolved target of the check (host, namespace/object, ...)
    pub target: String,

    /// Unix timestamp of when the check ran
    pub time: i64,

    /// Probe kind (e.g. `ssl`, `pop3`, `k8s-event`)
    #[serde(rename = "type")]
    pub check_type: String,

    /// User-assigned grouping label
    #[serde(default)]
    pub tag: String,

    /// Present and non-empty iff the check failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Free-form supplementary failure text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// True when this failure continues an already-notified streak
    #[serde(rename = "isDedup", default)]
    pub is_dedup: bool,

    /// Unix timestamp of when the current failure streak first fired
    #[serde(
        rename = "firstErrorTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub first_error_time: Option<i64>,

    /// True exactly once per streak, on the failing-to-healthy transition
    #[serde(default)]
    pub recovered: bool,

    /// Overrides the default fingerprint input when set
    #[serde(rename = "uniqueHash", default, skip_serializing_if = "Option::is_none")]
    pub unique_hash: Option<String>,

    /// Display override for notifications
    #[serde(rename = "testLabel", default, skip_serializing_if = "Option::is_none")]
    pub test_label: Option<String>,
}

/// Exactly one of these describes any given result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// First failure of a streak
    NewFailure,
    /// Continuation of an already-notified streak
    DuplicateFailure,
    /// The single failing-to-healthy transition of a streak
    Recovery,
    /// Plain passing check
    Success,
}

impl CheckResult {
    /// Create a passing result.
    pub fn success(input: &str, target: &str, check_type: &str, tag: &str, time: i64) -> Self {
        Self {
            input: input.to_string(),
            target: target.to_string(),
            time,
            check_type: check_type.to_string(),
            tag: tag.to_string(),
            error: None,
            details: None,
            is_dedup: false,
            first_error_time: None,
            recovered: false,
            unique_hash: None,
            test_label: None,
        }
    }

    /// Create a failing result.
    pub fn failure(
        input: &str,
        target: &str,
        check_type: &str,
        tag: &str,
        time: i64,
        error: &str,
    ) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::success(input, target, check_type, tag, time)
        }
    }

    /// Stable identity of the recurring check this result belongs to.
    ///
    /// Derived from `unique_hash` when set, otherwise from the
    /// concatenation of input, target, type, and tag. Computed on
    /// demand, never stored.
    pub fn fingerprint(&self) -> String {
        let content = match &self.unique_hash {
            Some(hash) => hash.clone(),
            None => format!(
                "{}{}{}{}",
                self.input, self.target, self.check_type, self.tag
            ),
        };
        blake3::hash(content.as_bytes()).to_hex().to_string()
    }

    /// Classify this result into its single describing kind.
    pub fn kind(&self) -> ResultKind {
        if self.recovered {
            ResultKind::Recovery
        } else if self.error.is_none() {
            ResultKind::Success
        } else if self.is_dedup {
            ResultKind::DuplicateFailure
        } else {
            ResultKind::NewFailure
        }
    }

    /// Whether this result describes a failed check.
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// Check the cross-field invariants of the record.
    ///
    /// Returns the description of the first violated invariant.
    pub fn check_invariants(&self) -> Result<(), &'static str> {
        if self.error.is_none() && self.is_dedup {
            return Err("isDedup set on a passing result");
        }
        if self.recovered && self.error.is_some() {
            return Err("recovered set on a failing result");
        }
        if self.is_dedup && self.first_error_time.is_none() {
            return Err("isDedup set without firstErrorTime");
        }
        Ok(())
    }

    /// Display name for notifications: the label override when set,
    /// otherwise the raw input line.
    pub fn display_name(&self) -> &str {
        self.test_label.as_deref().unwrap_or(&self.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing() -> CheckResult {
        CheckResult::failure("example.com must run ssl", "example.com", "ssl", "prod", 100, "expired")
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = failing();
        let b = failing();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_changes_with_identity_fields() {
        let a = failing();
        let mut b = failing();
        b.tag = "staging".to_string();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_ignores_outcome_fields() {
        let a = failing();
        let mut b = failing();
        b.error = None;
        b.time = 999;
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_unique_hash_overrides_fingerprint_input() {
        let mut a = failing();
        a.unique_hash = Some("my-identity".to_string());
        let mut b = CheckResult::success("other", "other", "pop3", "", 0);
        b.unique_hash = Some("my-identity".to_string());
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            CheckResult::success("i", "t", "pop3", "", 0).kind(),
            ResultKind::Success
        );
        assert_eq!(failing().kind(), ResultKind::NewFailure);

        let mut dup = failing();
        dup.is_dedup = true;
        dup.first_error_time = Some(50);
        assert_eq!(dup.kind(), ResultKind::DuplicateFailure);

        let mut rec = CheckResult::success("i", "t", "pop3", "", 0);
        rec.recovered = true;
        assert_eq!(rec.kind(), ResultKind::Recovery);
    }

    #[test]
    fn test_invariants() {
        assert!(failing().check_invariants().is_ok());

        let mut bad = CheckResult::success("i", "t", "pop3", "", 0);
        bad.is_dedup = true;
        assert!(bad.check_invariants().is_err());

        let mut bad = failing();
        bad.recovered = true;
        assert!(bad.check_invariants().is_err());

        let mut bad = failing();
        bad.is_dedup = true;
        assert!(bad.check_invariants().is_err());
    }

    #[test]
    fn test_display_name_override() {
        let mut r = failing();
        assert_eq!(r.display_name(), "example.com must run ssl");
        r.test_label = Some("My label".to_string());
        assert_eq!(r.display_name(), "My label");
    }
}
