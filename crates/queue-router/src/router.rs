//! Fan-out router

use std::sync::Arc;

use async_trait::async_trait;
use check_result::CheckResult;
use queue_transport::{ResultHandler, ResultQueue};
use tracing::{debug, warn};

use crate::DestinationRule;

/// Fans incoming results out to every matching destination queue.
///
/// Each matching destination receives an identical copy of the
/// original serialized payload. Destinations are independent: a
/// failed push is logged and never blocks delivery to the others.
/// Zero matching destinations is a no-op.
pub struct Router {
    rules: Vec<DestinationRule>,
    queue: Arc<dyn ResultQueue>,
}

impl Router {
    pub fn new(rules: Vec<DestinationRule>, queue: Arc<dyn ResultQueue>) -> Self {
        Self { rules, queue }
    }

    /// Number of configured destinations.
    pub fn destination_count(&self) -> usize {
        self.rules.len()
    }

    /// Deliver one result to every matching destination.
    pub async fn route(&self, result: &CheckResult, payload: &[u8]) {
        for rule in &self.rules {
            if !rule.matches(result) {
                continue;
            }
            match self.queue.push(rule.queue_key(), payload).await {
                Ok(()) => {
                    debug!(queue = rule.queue_key(), input = %result.input, "result cloned")
                }
                Err(e) => {
                    warn!(queue = rule.queue_key(), error = %e, "result clone failed")
                }
            }
        }
    }
}

#[async_trait]
impl ResultHandler for Router {
    async fn process(&self, result: &CheckResult, payload: &[u8]) {
        self.route(result, payload).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queue_transport::{run_consumer, MemoryQueue, TransportError};
    use std::time::Duration;
    use tokio::sync::watch;

    fn rules(specs: &[&str]) -> Vec<DestinationRule> {
        DestinationRule::parse_all(specs).unwrap()
    }

    fn tagged(tag: &str) -> CheckResult {
        CheckResult::success("i", "t", "pop3", tag, 0)
    }

    #[tokio::test]
    async fn test_fan_out_respects_filters() {
        let queue = MemoryQueue::new();
        let router = Router::new(
            rules(&["q1[tag=prod.*]", "q2[tag=staging.*]", "q3"]),
            queue.clone(),
        );

        let result = tagged("prod-1");
        let payload = result.to_wire();
        router.route(&result, &payload).await;

        assert_eq!(queue.len("q1").await, 1);
        assert_eq!(queue.len("q2").await, 0);
        assert_eq!(queue.len("q3").await, 1);
    }

    #[tokio::test]
    async fn test_payload_forwarded_verbatim() {
        let queue = MemoryQueue::new();
        let router = Router::new(rules(&["dest"]), queue.clone());

        let result = tagged("x");
        // route the exact bytes, not a re-encoding
        let payload = b"{\"input\":\"i\",\"target\":\"t\",\"time\":0,\"type\":\"pop3\",\"tag\":\"x\"}";
        router.route(&result, payload).await;

        assert_eq!(queue.pop("dest").await.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_zero_matches_is_a_noop() {
        let queue = MemoryQueue::new();
        let router = Router::new(rules(&["q1[tag=prod.*]"]), queue.clone());

        let result = tagged("staging-1");
        router.route(&result, &result.to_wire()).await;
        assert!(queue.is_empty("q1").await);
    }

    struct FailsOn {
        inner: Arc<MemoryQueue>,
        broken_key: &'static str,
    }

    #[async_trait]
    impl ResultQueue for FailsOn {
        async fn push(&self, key: &str, payload: &[u8]) -> Result<(), TransportError> {
            if key == self.broken_key {
                return Err(TransportError::Push {
                    queue: key.to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            self.inner.push(key, payload).await
        }

        async fn pop(&self, key: &str) -> Result<Vec<u8>, TransportError> {
            self.inner.pop(key).await
        }
    }

    #[tokio::test]
    async fn test_failed_destination_does_not_block_others() {
        let inner = MemoryQueue::new();
        let queue = Arc::new(FailsOn {
            inner: inner.clone(),
            broken_key: "q1",
        });
        let router = Router::new(rules(&["q1", "q2"]), queue);

        let result = tagged("x");
        router.route(&result, &result.to_wire()).await;

        assert_eq!(inner.len("q2").await, 1);
    }

    #[tokio::test]
    async fn test_consumer_to_router_pipeline() {
        let queue = MemoryQueue::new();
        let router = Router::new(rules(&["dest[tag=prod.*]"]), queue.clone());

        let result = tagged("prod-7");
        queue.push("src", &result.to_wire()).await.unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                run_consumer(queue.as_ref(), "src", &router, shutdown_rx).await;
            })
        };

        while queue.is_empty("dest").await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown_tx.send(true).unwrap();
        consumer.await.unwrap();

        let forwarded = CheckResult::from_wire(&queue.pop("dest").await.unwrap()).unwrap();
        assert_eq!(forwarded, result);
    }
}
