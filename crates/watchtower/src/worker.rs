//! Check execution worker
//!
//! Parses check definitions, runs them through the probe registry on
//! a fixed sweep interval, feeds every raw outcome to the dedup
//! engine, and publishes whatever the engine emits to the results
//! queue.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context};
use check_result::CheckResult;
use dedup_engine::DedupEngine;
use probes::{Check, ProbeOptions, ProbeRegistry};
use queue_transport::ResultQueue;
use tokio::sync::watch;
use tracing::{info, warn};

/// Parse a check definition line.
///
/// Grammar: `target must run <probe-type> [with <key> <value>]...`
/// Values may be wrapped in single quotes. The `dedup` key is
/// consumed here as a per-check dedup window in seconds rather than
/// passed to the probe.
pub fn parse_check(line: &str, default_tag: &str) -> anyhow::Result<Check> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 4 || tokens[1] != "must" || tokens[2] != "run" {
        bail!("invalid check definition: {:?}", line);
    }

    let mut check = Check::new(tokens[0], tokens[3]);
    check.input = line.to_string();
    check.tag = default_tag.to_string();

    let mut rest = &tokens[4..];
    while !rest.is_empty() {
        let [with, key, value, ..] = rest else {
            bail!("incomplete argument in check definition: {:?}", line);
        };
        if *with != "with" {
            bail!("expected `with`, found {:?} in check definition: {:?}", with, line);
        }
        let value = value.trim_matches('\'');
        check
            .arguments
            .insert((*key).to_string(), value.to_string());
        rest = &rest[3..];
    }

    if let Some(value) = check.arguments.remove("dedup") {
        let seconds: u64 = value
            .parse()
            .with_context(|| format!("invalid dedup value in check definition: {:?}", line))?;
        check.dedup_duration = (seconds > 0).then(|| Duration::from_secs(seconds));
    }

    Ok(check)
}

/// Executes checks and publishes notification-worthy results.
pub struct Worker {
    registry: ProbeRegistry,
    engine: DedupEngine,
    queue: Arc<dyn ResultQueue>,
    results_key: String,
    options: ProbeOptions,
}

impl Worker {
    pub fn new(
        registry: ProbeRegistry,
        engine: DedupEngine,
        queue: Arc<dyn ResultQueue>,
        results_key: &str,
        options: ProbeOptions,
    ) -> Self {
        Self {
            registry,
            engine,
            queue,
            results_key: results_key.to_string(),
            options,
        }
    }

    /// Run one check end to end: probe, dedup, publish.
    pub async fn execute(&self, check: &Check) -> anyhow::Result<()> {
        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let raw = match self.registry.run_check(check, &self.options).await {
            Ok(()) => CheckResult::success(
                &check.input,
                &check.target,
                &check.probe_type,
                &check.tag,
                time,
            ),
            Err(e) => {
                info!(check = %check.sanitize(), error = %e, "check failed");
                CheckResult::failure(
                    &check.input,
                    &check.target,
                    &check.probe_type,
                    &check.tag,
                    time,
                    &e.to_string(),
                )
            }
        };

        if let Some(emitted) = self.engine.observe_with(raw, check.dedup_duration).await {
            self.queue
                .push(&self.results_key, &emitted.to_wire())
                .await
                .context("failed to publish result")?;
        }
        Ok(())
    }

    /// Sweep all checks repeatedly until shutdown.
    pub async fn run(
        &self,
        checks: &[Check],
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(checks = checks.len(), ?interval, "worker started");

        loop {
            for check in checks {
                if *shutdown.borrow() {
                    break;
                }
                if let Err(e) = self.execute(check).await {
                    warn!(check = %check.sanitize(), error = %e, "check execution failed");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() {
                break;
            }
        }

        info!("worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dedup_engine::DedupConfig;
    use queue_transport::{MemoryDedupStore, MemoryQueue};

    #[test]
    fn test_parse_plain_check() {
        let check = parse_check("mail.example.com must run pop3", "").unwrap();
        assert_eq!(check.target, "mail.example.com");
        assert_eq!(check.probe_type, "pop3");
        assert!(check.arguments.is_empty());
    }

    #[test]
    fn test_parse_check_with_arguments() {
        let check = parse_check(
            "mail.example.com must run pop3 with port 995 with password 'hunter2'",
            "prod",
        )
        .unwrap();
        assert_eq!(check.tag, "prod");
        assert_eq!(check.argument("port"), Some("995"));
        assert_eq!(check.argument("password"), Some("hunter2"));
    }

    #[test]
    fn test_parse_dedup_argument_becomes_window_override() {
        let check = parse_check("host must run pop3 with dedup 300", "").unwrap();
        assert_eq!(check.dedup_duration, Some(Duration::from_secs(300)));
        // consumed here, never forwarded to the probe
        assert!(check.argument("dedup").is_none());

        let check = parse_check("host must run pop3 with dedup 0", "").unwrap();
        assert_eq!(check.dedup_duration, None);

        assert!(parse_check("host must run pop3 with dedup soon", "").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(parse_check("mail.example.com", "").is_err());
        assert!(parse_check("a must walk pop3", "").is_err());
        assert!(parse_check("a must run pop3 with port", "").is_err());
        assert!(parse_check("a must run pop3 and port 1", "").is_err());
    }

    #[tokio::test]
    async fn test_execute_publishes_failure() {
        let queue = MemoryQueue::new();
        let engine = DedupEngine::new(Arc::new(MemoryDedupStore::new()), DedupConfig::default());
        let worker = Worker::new(
            ProbeRegistry::with_builtin(),
            engine,
            queue.clone(),
            "results",
            ProbeOptions::default(),
        );

        // unknown probe type: the error becomes a failing result
        let check = Check::new("host", "no-such-probe");
        worker.execute(&check).await.unwrap();

        let published = CheckResult::from_wire(&queue.pop("results").await.unwrap()).unwrap();
        assert!(published.is_failure());
        assert_eq!(published.check_type, "no-such-probe");
    }
}
