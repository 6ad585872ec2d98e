//! Single-consumer loop
//!
//! Pops serialized results from a source queue one at a time, decodes
//! each, and hands it to a handler synchronously before blocking
//! again. Sequential processing is what keeps per-fingerprint dedup
//! state transitions ordered.

use std::time::Duration;

use async_trait::async_trait;
use check_result::CheckResult;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::ResultQueue;

/// Processes one decoded result at a time.
///
/// Handlers own their failure reporting; a handler error must never
/// abort the consumer loop.
#[async_trait]
pub trait ResultHandler: Send + Sync {
    /// Handle one decoded result. `payload` is the verbatim wire
    /// bytes, for handlers that forward the original message.
    async fn process(&self, result: &CheckResult, payload: &[u8]);
}

/// Run the consumer loop until the shutdown flag flips to true.
///
/// A malformed payload is fatal to that message only: it is logged,
/// skipped, and the loop continues. Shutdown is cooperative and
/// observed between iterations; a message already dequeued is always
/// processed to completion.
pub async fn run_consumer<Q, H>(
    queue: &Q,
    source_key: &str,
    handler: &H,
    mut shutdown: watch::Receiver<bool>,
) where
    Q: ResultQueue + ?Sized,
    H: ResultHandler + ?Sized,
{
    info!(queue = source_key, "consumer started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let payload = tokio::select! {
            popped = queue.pop(source_key) => match popped {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(queue = source_key, error = %e, "pop failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            },
            _ = shutdown.changed() => continue,
        };

        let result = match CheckResult::from_wire(&payload) {
            Ok(result) => result,
            Err(e) => {
                warn!(queue = source_key, error = %e, "skipping undecodable message");
                continue;
            }
        };

        handler.process(&result, &payload).await;
    }

    info!(queue = source_key, "consumer stopped");
}
