//! FIFO blocking queue abstraction

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::TransportError;

/// A FIFO blocking queue addressed by string key.
///
/// Payloads are opaque bytes; delivery is at-least-once. `pop` blocks
/// until a message is available on the given key.
#[async_trait]
pub trait ResultQueue: Send + Sync {
    /// Append a payload to the tail of the queue.
    async fn push(&self, key: &str, payload: &[u8]) -> Result<(), TransportError>;

    /// Remove and return the head of the queue, waiting when empty.
    async fn pop(&self, key: &str) -> Result<Vec<u8>, TransportError>;
}

/// In-memory queue for single-process deployments and tests.
#[derive(Default)]
pub struct MemoryQueue {
    queues: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
    notify: Notify,
}

impl MemoryQueue {
    /// Create an empty in-memory queue set.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of messages waiting on a key.
    pub async fn len(&self, key: &str) -> usize {
        let queues = self.queues.lock().await;
        queues.get(key).map(|q| q.len()).unwrap_or(0)
    }

    /// Whether a key has no waiting messages.
    pub async fn is_empty(&self, key: &str) -> bool {
        self.len(key).await == 0
    }
}

#[async_trait]
impl ResultQueue for MemoryQueue {
    async fn push(&self, key: &str, payload: &[u8]) -> Result<(), TransportError> {
        let mut queues = self.queues.lock().await;
        queues
            .entry(key.to_string())
            .or_default()
            .push_back(payload.to_vec());
        debug!(queue = key, bytes = payload.len(), "queued message");
        self.notify.notify_waiters();
        Ok(())
    }

    async fn pop(&self, key: &str) -> Result<Vec<u8>, TransportError> {
        loop {
            // Arm the notification before checking, so a push between
            // the check and the wait is not lost.
            let notified = self.notify.notified();
            {
                let mut queues = self.queues.lock().await;
                if let Some(payload) = queues.get_mut(key).and_then(|q| q.pop_front()) {
                    return Ok(payload);
                }
            }
            notified.await;
        }
    }
}
