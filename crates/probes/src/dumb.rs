//! Dumb probe, for internal pipeline testing
//!
//! Performs a test of random duration and random outcome, which makes
//! it useful for exercising the dedup engine and bridges without any
//! real targets.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::{Check, Probe, ProbeError, ProbeOptions};

const DEFAULT_MIN_MS: u64 = 100;
const DEFAULT_MAX_MS: u64 = 500;

pub struct DumbProbe;

impl DumbProbe {
    fn duration_argument(check: &Check, name: &str, default_ms: u64) -> Result<u64, ProbeError> {
        match check.argument(name) {
            Some(value) => value
                .parse::<u64>()
                .map_err(|_| ProbeError::InvalidArgument {
                    name: name.to_string(),
                    value: value.to_string(),
                }),
            None => Ok(default_ms),
        }
    }
}

#[async_trait]
impl Probe for DumbProbe {
    fn arguments(&self) -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("duration-min-ms", "^[0-9]+$"),
            ("duration-max-ms", "^[0-9]+$"),
        ])
    }

    fn example(&self) -> &'static str {
        r#"
Dumb Tester
-----------
Performs a test of random duration and result.

   fake-name must run dumb with duration-min-ms 200 with duration-max-ms 1000
"#
    }

    async fn run(
        &self,
        check: &Check,
        _target: &str,
        _options: &ProbeOptions,
    ) -> Result<(), ProbeError> {
        let min_ms = Self::duration_argument(check, "duration-min-ms", DEFAULT_MIN_MS)?;
        let max_ms = Self::duration_argument(check, "duration-max-ms", DEFAULT_MAX_MS)?;

        if max_ms < min_ms {
            return Err(ProbeError::InvalidArgument {
                name: "duration-max-ms".to_string(),
                value: format!("{} (must be >= duration-min-ms)", max_ms),
            });
        }

        let (wait_ms, fail) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(min_ms..=max_ms), rng.gen_bool(0.5))
        };
        tokio::time::sleep(Duration::from_millis(wait_ms)).await;

        if fail {
            return Err(ProbeError::Failed(format!(
                "dumb test failed (duration {}ms)",
                wait_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inverted_duration_range_rejected() {
        let mut check = Check::new("fake", "dumb");
        check
            .arguments
            .insert("duration-min-ms".to_string(), "100".to_string());
        check
            .arguments
            .insert("duration-max-ms".to_string(), "10".to_string());

        let outcome = DumbProbe.run(&check, "fake", &ProbeOptions::default()).await;
        assert!(matches!(outcome, Err(ProbeError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn test_outcome_is_pass_or_dumb_failure() {
        let mut check = Check::new("fake", "dumb");
        check
            .arguments
            .insert("duration-min-ms".to_string(), "0".to_string());
        check
            .arguments
            .insert("duration-max-ms".to_string(), "1".to_string());

        match DumbProbe.run(&check, "fake", &ProbeOptions::default()).await {
            Ok(()) => {}
            Err(ProbeError::Failed(text)) => assert!(text.contains("dumb test failed")),
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
}
